/*!
Этот крейт компилирует список пользовательских шаблонов в единый матчер
построчного поиска.

Четыре диалекта (basic, extended, fixed, perl) нормализуются во время
компиляции в один синтаксис, который понимает крейт
[`regex`](https://crates.io/crates/regex). Модификаторы слова/строки/регистра
также сворачиваются во время компиляции, поэтому во время сопоставления
остаётся ровно один скомпилированный автомат.

Инвертирование совпадения сюда намеренно не входит: оно применяется выше,
оконным автоматом, чтобы диапазоны совпадений оставались доступными для
раскраски вывода.
*/

#![deny(missing_docs)]

use std::fmt::Write;

/// Полуоткрытый байтовый интервал `[start, end)` внутри одной строки.
///
/// Диапазоны, выдаваемые матчером, не пересекаются, отсортированы по началу
/// и лежат в пределах строки.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span {
    /// Смещение первого байта совпадения.
    pub start: usize,
    /// Смещение сразу за последним байтом совпадения.
    pub end: usize,
}

impl Span {
    /// Создать новый диапазон. `start` должен быть не больше `end`.
    pub fn new(start: usize, end: usize) -> Span {
        assert!(start <= end);
        Span { start, end }
    }

    /// Количество байтов в диапазоне.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Возвращает true тогда и только тогда, когда диапазон пуст.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Диалект, в котором записаны шаблоны.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Syntax {
    /// «Базовые» регулярные выражения: символы `? + { } | ( )` буквальны,
    /// если не экранированы обратной косой чертой.
    #[default]
    Basic,
    /// «Расширенные» регулярные выражения, передаются движку без изменений.
    Extended,
    /// Каждый шаблон — буквальная строка.
    Fixed,
    /// Perl-подобные выражения. Семантика совпадает с семантикой движка
    /// regex; различия с PCRE задокументированы как отличия.
    Perl,
}

/// Ошибка, которая может возникнуть при компиляции шаблонов.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Не было предоставлено ни одного шаблона.
    NoPatterns,
    /// Один из шаблонов не удалось скомпилировать.
    Regex(regex::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::NoPatterns => write!(f, "no expressions provided"),
            Error::Regex(ref err) => write!(f, "invalid expression: {}", err),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::Regex(err)
    }
}

/// Конструктор для настройки компиляции шаблонов.
#[derive(Clone, Debug, Default)]
pub struct PatternMatcherBuilder {
    syntax: Syntax,
    case_insensitive: bool,
    word: bool,
    line: bool,
}

impl PatternMatcherBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию
    /// (базовый диалект, без модификаторов).
    pub fn new() -> PatternMatcherBuilder {
        PatternMatcherBuilder::default()
    }

    /// Установить диалект шаблонов.
    pub fn syntax(&mut self, syntax: Syntax) -> &mut PatternMatcherBuilder {
        self.syntax = syntax;
        self
    }

    /// Игнорировать ли регистр при сопоставлении.
    pub fn case_insensitive(
        &mut self,
        yes: bool,
    ) -> &mut PatternMatcherBuilder {
        self.case_insensitive = yes;
        self
    }

    /// Сопоставлять только целые слова: каждый дизъюнкт оборачивается в
    /// `\b(?:…)\b`.
    ///
    /// Имеет приоритет над [`PatternMatcherBuilder::whole_line`], если
    /// установлены оба.
    pub fn word(&mut self, yes: bool) -> &mut PatternMatcherBuilder {
        self.word = yes;
        self
    }

    /// Сопоставлять только целые строки: каждый дизъюнкт оборачивается в
    /// `\A(?:…)\z`.
    pub fn whole_line(&mut self, yes: bool) -> &mut PatternMatcherBuilder {
        self.line = yes;
        self
    }

    /// Скомпилировать данные шаблоны в единый матчер.
    ///
    /// Пустой список шаблонов — это ошибка конфигурации. Пустой шаблон —
    /// особый случай: он совпадает с любой строкой и не порождает диапазонов.
    pub fn build(&self, patterns: &[String]) -> Result<PatternMatcher, Error> {
        if patterns.is_empty() {
            return Err(Error::NoPatterns);
        }
        let mut always_match = false;
        let mut disjuncts = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.is_empty() {
                always_match = true;
                continue;
            }
            disjuncts.push(self.translate(pattern));
        }
        let re = if disjuncts.is_empty() {
            None
        } else {
            let mut joined = String::new();
            for (i, d) in disjuncts.iter().enumerate() {
                if i > 0 {
                    joined.push('|');
                }
                // write! в String не может завершиться ошибкой
                write!(joined, "(?:{})", d).unwrap();
            }
            log::trace!("скомпилированное выражение: {}", joined);
            let re = regex::bytes::RegexBuilder::new(&joined)
                .case_insensitive(self.case_insensitive)
                .unicode(false)
                .build()?;
            Some(re)
        };
        Ok(PatternMatcher { re, always_match })
    }

    /// Перевести один шаблон в синтаксис движка regex с уже свёрнутыми
    /// модификаторами слова/строки.
    fn translate(&self, pattern: &str) -> String {
        let mut pat = match self.syntax {
            Syntax::Fixed => regex::escape(pattern),
            Syntax::Basic => invert_escapes(pattern, "?+{}|()"),
            Syntax::Extended | Syntax::Perl => pattern.to_string(),
        };
        if self.word {
            pat = format!(r"\b(?:{})\b", pat);
        } else if self.line {
            pat = format!(r"\A(?:{})\z", pat);
        }
        pat
    }
}

/// Скомпилированный матчер: чистая функция из строки байтов в упорядоченный
/// список диапазонов совпадений.
#[derive(Clone, Debug)]
pub struct PatternMatcher {
    re: Option<regex::bytes::Regex>,
    always_match: bool,
}

impl PatternMatcher {
    /// Удобный способ скомпилировать один шаблон с настройками по умолчанию.
    pub fn new(pattern: &str) -> Result<PatternMatcher, Error> {
        PatternMatcherBuilder::new().build(&[pattern.to_string()])
    }

    /// Возвращает true тогда и только тогда, когда строка содержит хотя бы
    /// одно совпадение.
    pub fn is_match(&self, line: &[u8]) -> bool {
        if self.always_match {
            return true;
        }
        self.re.as_ref().map_or(false, |re| re.is_match(line))
    }

    /// Найти все диапазоны совпадений в строке.
    ///
    /// Диапазоны не пересекаются и отсортированы по началу. Для строки,
    /// совпавшей только за счёт пустого шаблона, список пуст.
    pub fn find_iter(&self, line: &[u8]) -> Vec<Span> {
        let Some(ref re) = self.re else { return vec![] };
        re.find_iter(line).map(|m| Span::new(m.start(), m.end())).collect()
    }
}

/// Инвертирует экранирование данных символов: `\(` становится `(`, а `(`
/// становится `\(`. Так базовый диалект приводится к расширенному.
fn invert_escapes(pattern: &str, chars: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut iter = pattern.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\\' {
            match iter.peek() {
                Some(&next) if chars.contains(next) => {
                    // Экранированный спецсимвол становится голым.
                    iter.next();
                    out.push(next);
                }
                Some(&next) => {
                    iter.next();
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else if chars.contains(ch) {
            out.push('\\');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out
}
