use std::fmt::Write;

/// Ошибка компиляции глоба.
#[derive(Clone, Debug)]
pub struct Error {
    glob: String,
    message: String,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid glob {:?}: {}", self.glob, self.message)
    }
}

/// Скомпилированный shell-глоб, сопоставляемый с базовым именем пути.
///
/// Поддерживаются `*` (любая последовательность), `?` (один символ) и
/// классы `[...]` с диапазонами и отрицанием `[!...]`. Незакрытый класс
/// трактуется буквально, как это делают POSIX-реализации fnmatch.
#[derive(Clone, Debug)]
pub struct Glob {
    re: regex::bytes::Regex,
    original: String,
}

impl Glob {
    /// Скомпилировать глоб.
    pub fn new(glob: &str) -> Result<Glob, Error> {
        let translated = translate(glob);
        log::trace!("глоб {:?} переведён в {:?}", glob, translated);
        let re = regex::bytes::RegexBuilder::new(&translated)
            .unicode(false)
            .build()
            .map_err(|err| Error {
                glob: glob.to_string(),
                message: err.to_string(),
            })?;
        Ok(Glob { re, original: glob.to_string() })
    }

    /// Исходный текст глоба.
    pub fn glob(&self) -> &str {
        &self.original
    }

    /// Возвращает true тогда и только тогда, когда имя соответствует глобу.
    pub fn is_match(&self, name: &str) -> bool {
        self.re.is_match(name.as_bytes())
    }
}

/// Перевести глоб в закреплённое регулярное выражение.
fn translate(glob: &str) -> String {
    let mut out = String::from(r"\A");
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(next) => push_literal(&mut out, next),
                None => push_literal(&mut out, '\\'),
            },
            '[' => {
                let mut class = String::new();
                let mut raw = String::new();
                let mut closed = false;
                if let Some(&c) = chars.peek() {
                    if c == '!' || c == '^' {
                        chars.next();
                        raw.push(c);
                        class.push('^');
                    }
                }
                // ']' первым символом класса — буквальный.
                if let Some(&']') = chars.peek() {
                    chars.next();
                    raw.push(']');
                    class.push_str(r"\]");
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    raw.push(c);
                    if c == '\\' || c == '[' || c == '&' || c == '~' {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed {
                    write!(out, "[{}]", class).unwrap();
                } else {
                    // Незакрытый класс: вся последовательность буквальна.
                    push_literal(&mut out, '[');
                    for c in raw.chars() {
                        push_literal(&mut out, c);
                    }
                }
            }
            c => push_literal(&mut out, c),
        }
    }
    out.push_str(r"\z");
    out
}

fn push_literal(out: &mut String, ch: char) {
    if ch.is_ascii_alphanumeric() || ch == '_' {
        out.push(ch);
    } else {
        let mut buf = [0u8; 4];
        out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
    }
}

#[cfg(test)]
mod tests {
    use super::Glob;

    fn matches(glob: &str, name: &str) -> bool {
        Glob::new(glob).unwrap().is_match(name)
    }

    #[test]
    fn literal() {
        assert!(matches("a.log", "a.log"));
        assert!(!matches("a.log", "xa.log"));
        assert!(!matches("a.log", "a.logx"));
    }

    #[test]
    fn star() {
        assert!(matches("*.log", "a.log"));
        assert!(matches("*.log", ".log"));
        assert!(!matches("*.log", "a.tmp"));
        assert!(matches("a*", "abc"));
    }

    #[test]
    fn question() {
        assert!(matches("a?c", "abc"));
        assert!(!matches("a?c", "ac"));
        assert!(!matches("a?c", "abbc"));
    }

    #[test]
    fn class() {
        assert!(matches("a[bc]d", "abd"));
        assert!(matches("a[bc]d", "acd"));
        assert!(!matches("a[bc]d", "aed"));
        assert!(matches("a[0-9]", "a7"));
        assert!(!matches("a[0-9]", "ax"));
    }

    #[test]
    fn negated_class() {
        assert!(matches("a[!bc]d", "aed"));
        assert!(!matches("a[!bc]d", "abd"));
    }

    #[test]
    fn dot_is_literal() {
        assert!(!matches("a.log", "aXlog"));
    }

    #[test]
    fn escaped_star() {
        assert!(matches(r"a\*b", "a*b"));
        assert!(!matches(r"a\*b", "axb"));
    }

    #[test]
    fn unclosed_class_is_literal() {
        assert!(matches("a[bc", "a[bc"));
        assert!(!matches("a[bc", "ab"));
    }
}
