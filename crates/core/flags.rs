/*!
Разбирает аргументы командной строки в структурированное и типизированное
представление.
*/

use std::{ffi::OsString, io::IsTerminal, path::PathBuf};

use anyhow::Context;
use bstr::ByteVec;

use grab_engine::{
    matcher::Syntax, printer::ColorChoice, walk::DirAction, BinaryMode,
    GrepBuilder, OutputMode, Separators,
};

/// Краткая справка, выводимая по `--help`.
const USAGE: &str = "\
Usage: grab [OPTION]... EXPRESSIONS [FILE]...
Search for EXPRESSIONS in each FILE.
Example: grab -i 'hello world' menu.h main.c
EXPRESSIONS are one or more patterns separated by newline.

Expression interpretation:
  -E, --extended-regexp     EXPRESSIONS are extended regular expressions
  -F, --fixed-strings       EXPRESSIONS are strings
  -G, --basic-regexp        EXPRESSIONS are basic regular expressions (default)
  -P, --perl-regexp         EXPRESSIONS are Perl-like regular expressions
  -e, --regexp=EXPRESSIONS  use EXPRESSIONS for matching
  -f, --file=FILE           take EXPRESSIONS from FILE
  -i, --ignore-case         ignore case in expressions
      --no-ignore-case      do not ignore case (default)
  -w, --word-regexp         match whole words only
  -x, --line-regexp         match whole lines only
      --end=SEP             line separator byte (default: \\n)
  -z, --null-data           same as --end='\\0'

Miscellaneous:
  -s, --no-messages         suppress error messages
  -v, --invert-match        select non-matching lines
  -V, --version             display version information and exit
      --help                display this help text and exit

Output control:
  -m, --max-count=NUM       stop after NUM selected lines
  -b, --byte-offset         print the byte offset with output lines
  -n, --line-number         print line number with output lines
      --line-buffered       flush output on every line
  -H, --with-filename       print file name with output lines
  -h, --no-filename         suppress the file name prefix on output
      --label=LABEL         use LABEL as the standard input file name
  -o, --only-matching       show only nonempty parts of lines that match
  -q, --quiet, --silent     suppress all normal output
      --binary-files=TYPE   assume that binary files are TYPE;
                            TYPE is 'binary', 'text', or 'without-match'
  -a, --text                same as --binary-files=text
  -I                        same as --binary-files=without-match
  -d, --directories=ACTION  how to handle directories;
                            ACTION is 'read', 'recurse', 'recurse_links',
                            or 'skip'
  -r, --recursive           same as --directories=recurse
  -R, --dereference-recursive  same as --directories=recurse_links
      --include=GLOB        search only files that match GLOB
      --exclude=GLOB        skip files that match GLOB
      --exclude-from=FILE   skip files that match any pattern from FILE
      --exclude-dir=GLOB    skip directories that match GLOB
  -L, --files-without-match print only names of FILEs with no selected lines
  -l, --files-with-matches  print only names of FILEs with selected lines
  -c, --count               print only a count of selected lines per FILE
  -T, --initial-tab         add a tab to every separator value
  -Z, --null                print NUL after the result separator
      --result-sep=SEP          --name-num-sep=SEP
      --name-byte-sep=SEP       --context-group-sep=SEP
      --context-result-sep=SEP  --context-name-num-sep=SEP
      --context-name-byte-sep=SEP

Context control:
  -B, --before-context=NUM  print NUM lines of leading context
  -A, --after-context=NUM   print NUM lines of trailing context
  -C, --context=NUM         print NUM lines of output context
      --color[=WHEN], --colour[=WHEN]
                            highlight matches; WHEN is 'always', 'never',
                            or 'auto'
  -U, --binary              do not strip CR characters at EOL (MSDOS/Windows)

Exit status is 0 if any line is selected, 1 otherwise;
if any error occurs, the exit status is 2.";

/// «Специальный» режим, который превалирует над всем остальным.
#[derive(Clone, Copy, Debug)]
pub(crate) enum SpecialMode {
    Help,
    Version,
}

/// Результат разбора аргументов CLI.
#[derive(Debug)]
pub(crate) enum ParseResult {
    Special(SpecialMode),
    Ok(HiArgs),
    Err(anyhow::Error),
}

/// Высокоуровневое представление: готовый к выполнению движок плюс
/// флаги, которые нужны самой точке входа.
#[derive(Debug)]
pub(crate) struct HiArgs {
    pub(crate) grep: grab_engine::Grep,
    pub(crate) quiet: bool,
}

/// Уровень журналирования, выбранный флагами.
#[derive(Clone, Copy, Debug)]
enum LoggingMode {
    Debug,
    Trace,
}

/// Низкоуровневое представление аргументов: максимально близко к флагам.
#[derive(Debug)]
struct LowArgs {
    special: Option<SpecialMode>,
    positional: Vec<OsString>,
    patterns_opt: Vec<String>,
    pattern_files: Vec<PathBuf>,
    syntax: Syntax,
    ignore_case: bool,
    word_regexp: bool,
    line_regexp: bool,
    no_messages: bool,
    invert_match: bool,
    max_count: Option<u64>,
    byte_offset: bool,
    line_number: bool,
    line_buffered: bool,
    with_filename: Option<bool>,
    label: String,
    only_matching: bool,
    quiet: bool,
    binary_mode: BinaryMode,
    dir_action: DirAction,
    include: Vec<String>,
    exclude: Vec<String>,
    exclude_from: Vec<PathBuf>,
    exclude_dir: Vec<String>,
    output_mode: OutputMode,
    initial_tab: bool,
    null: bool,
    separators: Separators,
    before_context: Option<usize>,
    after_context: Option<usize>,
    context: Option<usize>,
    color: ColorChoice,
    strip_cr: bool,
    line_term: u8,
    logging: Option<LoggingMode>,
}

impl Default for LowArgs {
    fn default() -> LowArgs {
        LowArgs {
            special: None,
            positional: vec![],
            patterns_opt: vec![],
            pattern_files: vec![],
            syntax: Syntax::Basic,
            ignore_case: false,
            word_regexp: false,
            line_regexp: false,
            no_messages: false,
            invert_match: false,
            max_count: None,
            byte_offset: false,
            line_number: false,
            line_buffered: false,
            with_filename: None,
            label: "(standard input)".to_string(),
            only_matching: false,
            quiet: false,
            binary_mode: BinaryMode::Binary,
            dir_action: DirAction::Read,
            include: vec![],
            exclude: vec![],
            exclude_from: vec![],
            exclude_dir: vec![],
            output_mode: OutputMode::Standard,
            initial_tab: false,
            null: false,
            separators: Separators::default(),
            before_context: None,
            after_context: None,
            context: None,
            color: ColorChoice::Auto,
            strip_cr: true,
            line_term: b'\n',
            logging: None,
        }
    }
}

/// Разобрать аргументы CLI и преобразовать их в высокоуровневое
/// представление.
pub(crate) fn parse() -> ParseResult {
    if let Err(err) = crate::logger::Logger::init() {
        let err = anyhow::anyhow!("не удалось инициализировать логгер: {err}");
        return ParseResult::Err(err);
    }
    let mut low = LowArgs::default();
    if let Err(err) = parse_low(std::env::args_os().skip(1), &mut low) {
        return ParseResult::Err(err);
    }
    crate::messages::set_messages(!low.no_messages);
    match low.logging {
        Some(LoggingMode::Trace) => log::set_max_level(log::LevelFilter::Trace),
        Some(LoggingMode::Debug) => log::set_max_level(log::LevelFilter::Debug),
        None => log::set_max_level(log::LevelFilter::Warn),
    }
    if let Some(special) = low.special.take() {
        return ParseResult::Special(special);
    }
    match HiArgs::from_low_args(low) {
        Ok(hi) => ParseResult::Ok(hi),
        Err(err) => ParseResult::Err(err),
    }
}

/// Краткая справка для `--help`.
pub(crate) fn generate_help() -> String {
    USAGE.to_string()
}

/// Строка версии для `-V/--version`.
pub(crate) fn generate_version() -> String {
    format!("grab {}", env!("CARGO_PKG_VERSION"))
}

fn parse_low<I>(rawargs: I, low: &mut LowArgs) -> anyhow::Result<()>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::Arg;

    let mut p = lexopt::Parser::from_args(rawargs);
    while let Some(arg) = p.next().context("invalid CLI arguments")? {
        match arg {
            Arg::Value(value) => low.positional.push(value),
            Arg::Short('E') | Arg::Long("extended-regexp") => {
                low.syntax = Syntax::Extended;
            }
            Arg::Short('F') | Arg::Long("fixed-strings") => {
                low.syntax = Syntax::Fixed;
            }
            Arg::Short('G') | Arg::Long("basic-regexp") => {
                low.syntax = Syntax::Basic;
            }
            Arg::Short('P') | Arg::Long("perl-regexp") => {
                low.syntax = Syntax::Perl;
            }
            Arg::Short('e') | Arg::Long("regexp") => {
                let value = string_value(&mut p, "-e/--regexp")?;
                low.patterns_opt.extend(split_expressions(&value));
            }
            Arg::Short('f') | Arg::Long("file") => {
                let value = p.value().context("-f/--file needs a value")?;
                low.pattern_files.push(PathBuf::from(value));
            }
            Arg::Short('i') | Arg::Long("ignore-case") => {
                low.ignore_case = true;
            }
            Arg::Long("no-ignore-case") => low.ignore_case = false,
            Arg::Short('w') | Arg::Long("word-regexp") => {
                low.word_regexp = true;
            }
            Arg::Short('x') | Arg::Long("line-regexp") => {
                low.line_regexp = true;
            }
            Arg::Long("end") => {
                let value = string_value(&mut p, "--end")?;
                let bytes = Vec::unescape_bytes(&value);
                anyhow::ensure!(
                    bytes.len() == 1,
                    "--end must name exactly one byte"
                );
                low.line_term = bytes[0];
            }
            Arg::Short('z') | Arg::Long("null-data") => {
                low.line_term = b'\x00';
            }
            Arg::Short('s') | Arg::Long("no-messages") => {
                low.no_messages = true;
            }
            Arg::Short('v') | Arg::Long("invert-match") => {
                low.invert_match = true;
            }
            Arg::Short('V') | Arg::Long("version") => {
                low.special = Some(SpecialMode::Version);
            }
            Arg::Long("help") => low.special = Some(SpecialMode::Help),
            Arg::Short('m') | Arg::Long("max-count") => {
                let value = string_value(&mut p, "-m/--max-count")?;
                let count = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid -m value: {value}"))?;
                low.max_count = Some(count);
            }
            Arg::Short('b') | Arg::Long("byte-offset") => {
                low.byte_offset = true;
            }
            Arg::Short('n') | Arg::Long("line-number") => {
                low.line_number = true;
            }
            Arg::Long("line-buffered") => low.line_buffered = true,
            Arg::Short('H') | Arg::Long("with-filename") => {
                low.with_filename = Some(true);
            }
            Arg::Short('h') | Arg::Long("no-filename") => {
                low.with_filename = Some(false);
            }
            Arg::Long("label") => {
                low.label = string_value(&mut p, "--label")?;
            }
            Arg::Short('o') | Arg::Long("only-matching") => {
                low.only_matching = true;
            }
            Arg::Short('q') | Arg::Long("quiet") | Arg::Long("silent") => {
                low.quiet = true;
            }
            Arg::Long("binary-files") => {
                let value = string_value(&mut p, "--binary-files")?;
                low.binary_mode = match value.as_str() {
                    "binary" => BinaryMode::Binary,
                    "text" => BinaryMode::Text,
                    "without-match" => BinaryMode::WithoutMatch,
                    unknown => anyhow::bail!(
                        "unknown --binary-files type: {unknown}"
                    ),
                };
            }
            Arg::Short('a') | Arg::Long("text") => {
                low.binary_mode = BinaryMode::Text;
            }
            Arg::Short('I') => low.binary_mode = BinaryMode::WithoutMatch,
            Arg::Short('d') | Arg::Long("directories") => {
                let value = string_value(&mut p, "-d/--directories")?;
                low.dir_action = match value.as_str() {
                    "read" => DirAction::Read,
                    "skip" => DirAction::Skip,
                    "recurse" => DirAction::Recurse,
                    "recurse_links" => DirAction::RecurseFollow,
                    unknown => {
                        anyhow::bail!("unknown directory action: {unknown}")
                    }
                };
            }
            Arg::Short('r') | Arg::Long("recursive") => {
                low.dir_action = DirAction::Recurse;
            }
            Arg::Short('R') | Arg::Long("dereference-recursive") => {
                low.dir_action = DirAction::RecurseFollow;
            }
            Arg::Long("include") => {
                low.include.push(string_value(&mut p, "--include")?);
            }
            Arg::Long("exclude") => {
                low.exclude.push(string_value(&mut p, "--exclude")?);
            }
            Arg::Long("exclude-from") => {
                let value =
                    p.value().context("--exclude-from needs a value")?;
                low.exclude_from.push(PathBuf::from(value));
            }
            Arg::Long("exclude-dir") => {
                low.exclude_dir.push(string_value(&mut p, "--exclude-dir")?);
            }
            Arg::Short('L') | Arg::Long("files-without-match") => {
                low.output_mode = OutputMode::FilesWithoutMatch;
            }
            Arg::Short('l') | Arg::Long("files-with-matches") => {
                low.output_mode = OutputMode::FilesWithMatches;
            }
            Arg::Short('c') | Arg::Long("count") => {
                low.output_mode = OutputMode::Count;
            }
            Arg::Short('T') | Arg::Long("initial-tab") => {
                low.initial_tab = true;
            }
            Arg::Short('Z') | Arg::Long("null") => low.null = true,
            Arg::Long("result-sep") => {
                low.separators.result = sep_value(&mut p, "--result-sep")?;
            }
            Arg::Long("name-num-sep") => {
                low.separators.name_num =
                    sep_value(&mut p, "--name-num-sep")?;
            }
            Arg::Long("name-byte-sep") => {
                low.separators.name_byte =
                    sep_value(&mut p, "--name-byte-sep")?;
            }
            Arg::Long("context-group-sep") => {
                low.separators.context_group =
                    sep_value(&mut p, "--context-group-sep")?;
            }
            Arg::Long("context-result-sep") => {
                low.separators.context_result =
                    sep_value(&mut p, "--context-result-sep")?;
            }
            Arg::Long("context-name-num-sep") => {
                low.separators.context_name_num =
                    sep_value(&mut p, "--context-name-num-sep")?;
            }
            Arg::Long("context-name-byte-sep") => {
                low.separators.context_name_byte =
                    sep_value(&mut p, "--context-name-byte-sep")?;
            }
            Arg::Short('B') | Arg::Long("before-context") => {
                low.before_context =
                    Some(count_value(&mut p, "-B/--before-context")?);
            }
            Arg::Short('A') | Arg::Long("after-context") => {
                low.after_context =
                    Some(count_value(&mut p, "-A/--after-context")?);
            }
            Arg::Short('C') | Arg::Long("context") => {
                low.context = Some(count_value(&mut p, "-C/--context")?);
            }
            Arg::Long("color") | Arg::Long("colour") => {
                let value = p
                    .optional_value()
                    .map(|v| v.to_string_lossy().into_owned());
                low.color = match value.as_deref() {
                    None | Some("auto") => ColorChoice::Auto,
                    Some("always") => ColorChoice::Always,
                    Some("never") => ColorChoice::Never,
                    Some(unknown) => {
                        anyhow::bail!("unknown --color value: {unknown}")
                    }
                };
            }
            Arg::Short('U') | Arg::Long("binary") => low.strip_cr = false,
            Arg::Long("debug") => low.logging = Some(LoggingMode::Debug),
            Arg::Long("trace") => low.logging = Some(LoggingMode::Trace),
            arg => {
                return Err(anyhow::Error::from(arg.unexpected())
                    .context("invalid CLI arguments"));
            }
        }
    }
    Ok(())
}

fn string_value(
    p: &mut lexopt::Parser,
    flag: &'static str,
) -> anyhow::Result<String> {
    let value = p.value().with_context(|| format!("{flag} needs a value"))?;
    value
        .into_string()
        .map_err(|_| anyhow::anyhow!("{flag} value must be valid UTF-8"))
}

/// Значение разделителя: C-экранирования декодируются один раз здесь.
fn sep_value(
    p: &mut lexopt::Parser,
    flag: &'static str,
) -> anyhow::Result<Vec<u8>> {
    Ok(Vec::unescape_bytes(&string_value(p, flag)?))
}

fn count_value(
    p: &mut lexopt::Parser,
    flag: &'static str,
) -> anyhow::Result<usize> {
    let value = string_value(p, flag)?;
    value
        .parse::<usize>()
        .with_context(|| format!("invalid {flag} value: {value}"))
}

/// Разбить значение опции выражений на отдельные шаблоны: и `\r\n`, и
/// `\n` разделяют; последний пустой элемент отбрасывается.
fn split_expressions(value: &str) -> Vec<String> {
    let mut expressions: Vec<String> = value
        .split("\r\n")
        .flat_map(|chunk| chunk.split('\n'))
        .map(|s| s.to_string())
        .collect();
    if expressions.last().is_some_and(|last| last.is_empty()) {
        expressions.pop();
    }
    expressions
}

impl HiArgs {
    /// Преобразовать низкоуровневые аргументы в готовый к выполнению
    /// движок.
    fn from_low_args(low: LowArgs) -> anyhow::Result<HiArgs> {
        let mut positional = low.positional.into_iter();

        // Источник выражений: -e, затем -f, затем первый позиционный.
        let mut patterns = vec![];
        if !low.patterns_opt.is_empty() {
            patterns = low.patterns_opt;
        } else if !low.pattern_files.is_empty() {
            for path in &low.pattern_files {
                match std::fs::read_to_string(path) {
                    Ok(contents) => {
                        patterns.extend(split_expressions(&contents))
                    }
                    Err(err) => {
                        err_message!("{}: {}", path.display(), err);
                    }
                }
            }
        } else if let Some(first) = positional.next() {
            let first = first
                .into_string()
                .map_err(|_| anyhow::anyhow!("EXPRESSIONS must be valid UTF-8"))?;
            patterns = split_expressions(&first);
        }
        anyhow::ensure!(
            !patterns.is_empty(),
            "no expressions provided; try --help for more information"
        );

        let paths: Vec<PathBuf> =
            positional.map(PathBuf::from).collect();

        let with_filename = match low.with_filename {
            Some(explicit) => explicit,
            None => low.dir_action.is_recursive(),
        };

        let mut exclude = low.exclude;
        for path in &low.exclude_from {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    for line in contents.lines() {
                        let line = line.strip_suffix('\r').unwrap_or(line);
                        if !line.is_empty() {
                            exclude.push(line.to_string());
                        }
                    }
                }
                Err(err) => {
                    err_message!("{}: {}", path.display(), err);
                }
            }
        }

        let (before, after) = match low.context {
            Some(n) => (n, n),
            None => (
                low.before_context.unwrap_or(0),
                low.after_context.unwrap_or(0),
            ),
        };

        let mut builder = GrepBuilder::new();
        builder
            .patterns(&patterns)
            .paths(paths)
            .syntax(low.syntax)
            .ignore_case(low.ignore_case)
            .word_regexp(low.word_regexp)
            .line_regexp(low.line_regexp)
            .invert_match(low.invert_match)
            .max_count(low.max_count)
            .with_filename(with_filename)
            .line_number(low.line_number)
            .byte_offset(low.byte_offset)
            .only_matching(low.only_matching)
            .line_buffered(low.line_buffered)
            .quiet(low.quiet)
            .initial_tab(low.initial_tab)
            .null_after_result(low.null)
            .separators(low.separators)
            .before_context(before)
            .after_context(after)
            .binary_mode(low.binary_mode)
            .directories(low.dir_action)
            .label(&low.label)
            .line_terminator(low.line_term)
            .strip_cr(low.strip_cr)
            .color_choice(low.color)
            .color_env(std::env::var("GREP_COLORS").ok())
            .sink_is_tty(std::io::stdout().is_terminal())
            .output_mode(low.output_mode)
            .no_messages(low.no_messages);
        for glob in &low.include {
            builder.include(glob);
        }
        for glob in &exclude {
            builder.exclude(glob);
        }
        for glob in &low.exclude_dir {
            builder.exclude_dir(glob);
        }
        let grep = builder.build().map_err(|err| anyhow::anyhow!("{err}"))?;
        Ok(HiArgs { grep, quiet: low.quiet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low(args: &[&str]) -> LowArgs {
        let mut low = LowArgs::default();
        parse_low(
            args.iter().map(|arg| OsString::from(*arg)).collect::<Vec<_>>(),
            &mut low,
        )
        .unwrap();
        low
    }

    #[test]
    fn split_expressions_drops_trailing_empty() {
        assert_eq!(split_expressions("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_expressions("a\r\nb"), vec!["a", "b"]);
        assert_eq!(split_expressions(""), Vec::<String>::new());
    }

    #[test]
    fn last_dialect_wins() {
        let args = low(&["-E", "-F", "pat"]);
        assert!(matches!(args.syntax, Syntax::Fixed));
    }

    #[test]
    fn last_output_mode_wins() {
        let args = low(&["-l", "-c", "pat"]);
        assert!(matches!(args.output_mode, OutputMode::Count));
    }

    #[test]
    fn context_flags() {
        let args = low(&["-B", "2", "-A", "3", "pat"]);
        assert_eq!(args.before_context, Some(2));
        assert_eq!(args.after_context, Some(3));
        let args = low(&["-C", "4", "pat"]);
        assert_eq!(args.context, Some(4));
    }

    #[test]
    fn separators_are_unescaped() {
        let args = low(&["--result-sep", r"\t", "pat"]);
        assert_eq!(args.separators.result, b"\t");
    }

    #[test]
    fn null_data_sets_line_term() {
        let args = low(&["-z", "pat"]);
        assert_eq!(args.line_term, b'\x00');
    }

    #[test]
    fn bundled_shorts() {
        let args = low(&["-Hnb", "pat"]);
        assert_eq!(args.with_filename, Some(true));
        assert!(args.line_number);
        assert!(args.byte_offset);
    }

    #[test]
    fn expressions_from_option_frees_positionals() {
        let low_args = low(&["-e", "a\nb", "file1", "file2"]);
        // Не должно упасть: оба позиционных — файлы.
        HiArgs::from_low_args(low_args).unwrap();
    }

    #[test]
    fn no_expressions_is_an_error() {
        let mut low_args = LowArgs::default();
        parse_low(Vec::<OsString>::new(), &mut low_args).unwrap();
        assert!(HiArgs::from_low_args(low_args).is_err());
    }
}
