/*!
Этот крейт — встраиваемая библиотечная поверхность поиска: та же машина,
что стоит за CLI, доступная из кода.

# Краткий обзор

Конфигурация собирается через [`GrepBuilder`]: выражения, пути, диалект и
модификаторы, контекст, разделители, политика каталогов и двоичных файлов,
раскраска. [`Grep::execute`] выполняет поиск и возвращает [`Outcome`] —
упорядоченные сводки по файлам, захваченные записи строк (при
`capture = true`), информационные заметки и ошибки.

Две документированные ошибки конфигурации: не задано ни одного выражения
и не задано ни одного входа, когда поток по умолчанию отключён.

Крейты рабочего пространства реэкспортируются подмодулями, чтобы
зависящим было достаточно одного этого крейта.
*/

#![deny(missing_docs)]

pub use grab_matcher as matcher;
pub use grab_printer as printer;
pub use grab_searcher as searcher;
pub use grab_walk as walk;

pub use crate::scanner::STDIN_PATH;

use std::{io, path::PathBuf};

use grab_matcher::{PatternMatcherBuilder, Span, Syntax};
use grab_printer::{ColorChoice, Palette};
use grab_walk::{DirAction, FileFilter, Glob, Walker};

mod scanner;

/// Политика обработки двоичных источников.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BinaryMode {
    /// Подавить построчный вывод и выдать заметку «binary file matches»,
    /// если совпадение было; счётчик выбранных строк продолжает расти.
    #[default]
    Binary,
    /// Рассматривать источник как обычный текст.
    Text,
    /// Полностью пропускать двоичные источники: ни заметки, ни выбора.
    WithoutMatch,
}

/// Режим вывода результатов.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputMode {
    /// Классический построчный вывод.
    #[default]
    Standard,
    /// Только имена файлов с выбранными строками (`-l`).
    FilesWithMatches,
    /// Только имена файлов без выбранных строк (`-L`).
    FilesWithoutMatch,
    /// Только количество выбранных строк на файл (`-c`).
    Count,
}

/// Роль захваченной записи.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordKind {
    /// Выбранная строка.
    Match,
    /// Контекст перед совпадением.
    BeforeContext,
    /// Контекст после совпадения.
    AfterContext,
    /// Разделитель между группами контекста.
    GroupSeparator,
}

/// Одна захваченная запись вывода.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineRecord {
    /// Путь источника или метка потока по умолчанию.
    pub path: String,
    /// Номер строки, начиная с 1. Ноль для разделителя групп.
    pub line_number: u64,
    /// Смещение первого байта строки в источнике.
    pub byte_offset: u64,
    /// Байты строки без разделителя.
    pub bytes: Vec<u8>,
    /// Диапазоны совпадений внутри строки.
    pub spans: Vec<Span>,
    /// Роль записи.
    pub kind: RecordKind,
}

/// Сводка по одному просканированному источнику.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSummary {
    /// Путь источника или метка потока по умолчанию.
    pub path: String,
    /// Была ли выбрана хотя бы одна строка.
    pub matched: bool,
    /// Количество выбранных строк.
    pub selected: u64,
    /// При захвате — включительные индексы среза этого источника в списке
    /// захваченных записей.
    pub records: Option<(usize, usize)>,
}

/// Ошибка, привязанная к пути.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorNote {
    /// Путь, на котором произошла ошибка.
    pub path: String,
    /// Сообщение об ошибке.
    pub message: String,
}

/// Результат одного выполнения поиска.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    /// Сводки по источникам в порядке обхода.
    pub summaries: Vec<FileSummary>,
    /// Захваченные записи вывода (пусто при `capture = false`).
    pub records: Vec<LineRecord>,
    /// Информационные заметки (двоичные совпадения, каталоги, циклы).
    pub infos: Vec<String>,
    /// Ошибки открытия, чтения и обхода.
    pub errors: Vec<ErrorNote>,
}

impl Outcome {
    /// Была ли выбрана хотя бы одна строка по всем источникам.
    pub fn has_match(&self) -> bool {
        self.summaries.iter().any(|summary| summary.matched)
    }

    /// Возникла ли хотя бы одна ошибка.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Ошибка конфигурации. Фатальна: сообщается до начала сканирования.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Не задано ни одного выражения.
    NoPatterns,
    /// Не задано ни одного входа, а поток по умолчанию отключён.
    NoInputs,
    /// Выражение не скомпилировалось.
    Pattern(grab_matcher::Error),
    /// Глоб не скомпилировался.
    Glob(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::NoPatterns => write!(f, "no expressions provided"),
            Error::NoInputs => write!(f, "no inputs provided"),
            Error::Pattern(ref err) => write!(f, "{}", err),
            Error::Glob(ref msg) => write!(f, "{}", msg),
        }
    }
}

impl From<grab_matcher::Error> for Error {
    fn from(err: grab_matcher::Error) -> Error {
        match err {
            grab_matcher::Error::NoPatterns => Error::NoPatterns,
            err => Error::Pattern(err),
        }
    }
}

/// Значения разделителей вывода. Библиотечная поверхность принимает сырые
/// байты; разбор C-экранирований — дело CLI.
#[derive(Clone, Debug)]
pub struct Separators {
    /// Между заголовком и содержимым совпавшей строки.
    pub result: Vec<u8>,
    /// Между именем файла и номером строки.
    pub name_num: Vec<u8>,
    /// Перед смещением байта.
    pub name_byte: Vec<u8>,
    /// Между группами контекста.
    pub context_group: Vec<u8>,
    /// Между заголовком и содержимым контекстной строки.
    pub context_result: Vec<u8>,
    /// Контекстный вариант разделителя имени и номера.
    pub context_name_num: Vec<u8>,
    /// Контекстный вариант разделителя перед смещением.
    pub context_name_byte: Vec<u8>,
}

impl Default for Separators {
    fn default() -> Separators {
        Separators {
            result: b":".to_vec(),
            name_num: b":".to_vec(),
            name_byte: b":".to_vec(),
            context_group: b"--\n".to_vec(),
            context_result: b"-".to_vec(),
            context_name_num: b"-".to_vec(),
            context_name_byte: b"-".to_vec(),
        }
    }
}

/// Полная конфигурация одного выполнения.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) patterns: Vec<String>,
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) syntax: Syntax,
    pub(crate) ignore_case: bool,
    pub(crate) word_regexp: bool,
    pub(crate) line_regexp: bool,
    pub(crate) invert_match: bool,
    pub(crate) max_count: Option<u64>,
    pub(crate) with_filename: bool,
    pub(crate) line_number: bool,
    pub(crate) byte_offset: bool,
    pub(crate) only_matching: bool,
    pub(crate) line_buffered: bool,
    pub(crate) quiet: bool,
    pub(crate) initial_tab: bool,
    pub(crate) null_after_result: bool,
    pub(crate) separators: Separators,
    pub(crate) before_context: usize,
    pub(crate) after_context: usize,
    pub(crate) binary_mode: BinaryMode,
    pub(crate) dir_action: DirAction,
    pub(crate) include: Vec<String>,
    pub(crate) exclude: Vec<String>,
    pub(crate) exclude_dir: Vec<String>,
    pub(crate) label: String,
    pub(crate) line_term: u8,
    pub(crate) strip_cr: bool,
    pub(crate) color_choice: ColorChoice,
    pub(crate) color_env: Option<String>,
    pub(crate) sink_is_tty: bool,
    pub(crate) output_mode: OutputMode,
    pub(crate) default_stream: bool,
    pub(crate) no_messages: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            patterns: vec![],
            paths: vec![],
            syntax: Syntax::Basic,
            ignore_case: false,
            word_regexp: false,
            line_regexp: false,
            invert_match: false,
            max_count: None,
            with_filename: false,
            line_number: false,
            byte_offset: false,
            only_matching: false,
            line_buffered: false,
            quiet: false,
            initial_tab: false,
            null_after_result: false,
            separators: Separators::default(),
            before_context: 0,
            after_context: 0,
            binary_mode: BinaryMode::Binary,
            dir_action: DirAction::Read,
            include: vec![],
            exclude: vec![],
            exclude_dir: vec![],
            label: "(standard input)".to_string(),
            line_term: b'\n',
            strip_cr: true,
            color_choice: ColorChoice::Auto,
            color_env: None,
            sink_is_tty: false,
            output_mode: OutputMode::Standard,
            default_stream: true,
            no_messages: false,
        }
    }
}

/// Конструктор конфигурации поиска.
#[derive(Clone, Debug, Default)]
pub struct GrepBuilder {
    config: Config,
}

impl GrepBuilder {
    /// Создать новый конструктор с настройками по умолчанию.
    pub fn new() -> GrepBuilder {
        GrepBuilder::default()
    }

    /// Добавить одно выражение.
    pub fn pattern(&mut self, pattern: &str) -> &mut GrepBuilder {
        self.config.patterns.push(pattern.to_string());
        self
    }

    /// Добавить список выражений.
    pub fn patterns<I, P>(&mut self, patterns: I) -> &mut GrepBuilder
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for pattern in patterns {
            self.pattern(pattern.as_ref());
        }
        self
    }

    /// Добавить путь поиска (файл или каталог). Путь `-` обозначает поток
    /// по умолчанию.
    pub fn path<P: Into<PathBuf>>(&mut self, path: P) -> &mut GrepBuilder {
        self.config.paths.push(path.into());
        self
    }

    /// Добавить список путей поиска.
    pub fn paths<I, P>(&mut self, paths: I) -> &mut GrepBuilder
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.path(path);
        }
        self
    }

    /// Диалект выражений. По умолчанию базовый.
    pub fn syntax(&mut self, syntax: Syntax) -> &mut GrepBuilder {
        self.config.syntax = syntax;
        self
    }

    /// Игнорировать регистр.
    pub fn ignore_case(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.ignore_case = yes;
        self
    }

    /// Сопоставлять только целые слова.
    pub fn word_regexp(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.word_regexp = yes;
        self
    }

    /// Сопоставлять только целые строки.
    pub fn line_regexp(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.line_regexp = yes;
        self
    }

    /// Выбирать несовпавшие строки.
    pub fn invert_match(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.invert_match = yes;
        self
    }

    /// Остановиться после данного количества выбранных строк на источник.
    pub fn max_count(&mut self, count: Option<u64>) -> &mut GrepBuilder {
        self.config.max_count = count;
        self
    }

    /// Печатать имя файла перед каждой строкой.
    pub fn with_filename(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.with_filename = yes;
        self
    }

    /// Печатать номер строки.
    pub fn line_number(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.line_number = yes;
        self
    }

    /// Печатать смещение байта.
    pub fn byte_offset(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.byte_offset = yes;
        self
    }

    /// Печатать только совпавшие части строк. Контекст при этом
    /// отключается.
    pub fn only_matching(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.only_matching = yes;
        self
    }

    /// Сбрасывать вывод после каждой записи.
    pub fn line_buffered(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.line_buffered = yes;
        self
    }

    /// Подавить весь обычный вывод; выполнение останавливается на первой
    /// выбранной строке.
    pub fn quiet(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.quiet = yes;
        self
    }

    /// Добавить табуляцию к каждому значению разделителя.
    pub fn initial_tab(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.initial_tab = yes;
        self
    }

    /// Добавить NUL после разделителя результата.
    pub fn null_after_result(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.null_after_result = yes;
        self
    }

    /// Значения разделителей вывода, сырыми байтами.
    pub fn separators(&mut self, separators: Separators) -> &mut GrepBuilder {
        self.config.separators = separators;
        self
    }

    /// Количество контекстных строк перед совпадением.
    pub fn before_context(&mut self, count: usize) -> &mut GrepBuilder {
        self.config.before_context = count;
        self
    }

    /// Количество контекстных строк после совпадения.
    pub fn after_context(&mut self, count: usize) -> &mut GrepBuilder {
        self.config.after_context = count;
        self
    }

    /// Политика двоичных источников.
    pub fn binary_mode(&mut self, mode: BinaryMode) -> &mut GrepBuilder {
        self.config.binary_mode = mode;
        self
    }

    /// Политика каталогов.
    pub fn directories(&mut self, action: DirAction) -> &mut GrepBuilder {
        self.config.dir_action = action;
        self
    }

    /// Добавить include-глоб имён файлов.
    pub fn include(&mut self, glob: &str) -> &mut GrepBuilder {
        self.config.include.push(glob.to_string());
        self
    }

    /// Добавить exclude-глоб имён файлов.
    pub fn exclude(&mut self, glob: &str) -> &mut GrepBuilder {
        self.config.exclude.push(glob.to_string());
        self
    }

    /// Добавить exclude-глоб имён каталогов.
    pub fn exclude_dir(&mut self, glob: &str) -> &mut GrepBuilder {
        self.config.exclude_dir.push(glob.to_string());
        self
    }

    /// Метка потока по умолчанию в заголовках вывода.
    pub fn label(&mut self, label: &str) -> &mut GrepBuilder {
        self.config.label = label.to_string();
        self
    }

    /// Байт-разделитель строк (`0x00` в режиме `--null-data`). Действует и
    /// на вывод.
    pub fn line_terminator(&mut self, line_term: u8) -> &mut GrepBuilder {
        self.config.line_term = line_term;
        self
    }

    /// Удалять ли CR в конце строк. По умолчанию включено.
    pub fn strip_cr(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.strip_cr = yes;
        self
    }

    /// Когда выводить ANSI раскраску.
    pub fn color_choice(&mut self, choice: ColorChoice) -> &mut GrepBuilder {
        self.config.color_choice = choice;
        self
    }

    /// Строка окружения `GREP_COLORS`, если вызывающий её предоставляет.
    pub fn color_env(&mut self, spec: Option<String>) -> &mut GrepBuilder {
        self.config.color_env = spec;
        self
    }

    /// Является ли приёмник вывода терминалом. Влияет только на режим
    /// раскраски `auto`.
    pub fn sink_is_tty(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.sink_is_tty = yes;
        self
    }

    /// Режим вывода. При повторных вызовах последний побеждает.
    pub fn output_mode(&mut self, mode: OutputMode) -> &mut GrepBuilder {
        self.config.output_mode = mode;
        self
    }

    /// Разрешён ли поток по умолчанию при пустом списке путей. Когда
    /// отключено, пустой список путей — ошибка конфигурации.
    pub fn default_stream(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.default_stream = yes;
        self
    }

    /// Не печатать сообщения об ошибках в поток ошибок. Ошибки при этом
    /// всё равно записываются в результат.
    pub fn no_messages(&mut self, yes: bool) -> &mut GrepBuilder {
        self.config.no_messages = yes;
        self
    }

    /// Проверить конфигурацию и построить исполнитель.
    ///
    /// Выражения и глобы компилируются здесь: некорректный шаблон — это
    /// фатальная ошибка конфигурации, сообщаемая до начала сканирования.
    pub fn build(&self) -> Result<Grep, Error> {
        let config = self.config.clone();
        if config.patterns.is_empty() {
            return Err(Error::NoPatterns);
        }
        if config.paths.is_empty()
            && !config.default_stream
            && !config.dir_action.is_recursive()
        {
            return Err(Error::NoInputs);
        }
        let matcher = PatternMatcherBuilder::new()
            .syntax(config.syntax)
            .case_insensitive(config.ignore_case)
            .word(config.word_regexp)
            .whole_line(config.line_regexp)
            .build(&config.patterns)?;
        let compile = |globs: &[String]| -> Result<Vec<Glob>, Error> {
            globs
                .iter()
                .map(|glob| {
                    Glob::new(glob)
                        .map_err(|err| Error::Glob(err.to_string()))
                })
                .collect()
        };
        let filter = FileFilter::new(
            compile(&config.include)?,
            compile(&config.exclude)?,
            compile(&config.exclude_dir)?,
        );
        let walker = Walker::new(config.dir_action, filter);
        Ok(Grep { config, matcher, walker })
    }
}

/// Исполнитель поиска, построенный из проверенной конфигурации.
#[derive(Clone, Debug)]
pub struct Grep {
    pub(crate) config: Config,
    pub(crate) matcher: grab_matcher::PatternMatcher,
    pub(crate) walker: Walker,
}

impl Grep {
    /// Выполнить поиск, печатая в stdout (если не `capture` и не тихий
    /// режим), и вернуть набор результатов.
    ///
    /// При `capture = true` записи вывода собираются в [`Outcome::records`]
    /// вместо печати, а режим раскраски `auto` ведёт себя как `never`.
    pub fn execute(&self, capture: bool) -> io::Result<Outcome> {
        if capture {
            self.execute_to(io::sink(), capture)
        } else {
            let stdout = io::stdout();
            self.execute_to(stdout.lock(), capture)
        }
    }

    /// Как [`Grep::execute`], но с явным писателем вывода.
    pub fn execute_to<W: io::Write>(
        &self,
        wtr: W,
        capture: bool,
    ) -> io::Result<Outcome> {
        scanner::run(self, wtr, capture)
    }

    /// Палитра и признак включённой раскраски для данного выполнения.
    pub(crate) fn colors(&self, capture: bool) -> Option<Palette> {
        let is_tty = self.config.sink_is_tty && !capture;
        if !self.config.color_choice.should_color(is_tty) {
            return None;
        }
        Some(
            self.config
                .color_env
                .as_deref()
                .map(Palette::from_env_spec)
                .unwrap_or_default(),
        )
    }
}
