/// Когда выводить ANSI коды раскраски.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorChoice {
    /// Выводить коды только когда приёмник — терминал.
    #[default]
    Auto,
    /// Выводить коды независимо от приёмника.
    Always,
    /// Никогда не выводить коды.
    Never,
}

impl ColorChoice {
    /// Разрешить выбор против способности приёмника. Для `Auto` раскраска
    /// включается тогда и только тогда, когда приёмник — терминал; буфер
    /// захвата терминалом не считается.
    pub fn should_color(self, sink_is_tty: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => sink_is_tty,
        }
    }
}

/// Разрешённая палитра ролей раскраски в стиле `GREP_COLORS`.
///
/// Каждое строковое значение — это список SGR параметров, разделённых
/// точкой с запятой (например, `01;31`), вставляемый в управляющую
/// последовательность `ESC[<params>m`. Пустое значение означает отсутствие
/// раскраски для данной роли.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    /// `mt`: если задано, поставляет одновременно `ms` и `mc`.
    pub matched_text: Option<String>,
    /// `ms`: совпавший текст в выбранной строке.
    pub matched_selected: String,
    /// `mc`: совпавший текст в контекстной строке.
    pub matched_context: String,
    /// `sl`: вся выбранная строка.
    pub selected_line: String,
    /// `cx`: вся контекстная строка.
    pub context_line: String,
    /// `rv`: при инвертированном поиске поменять роли `sl`/`cx` местами.
    pub reverse_video: bool,
    /// `fn`: имя файла.
    pub filename: String,
    /// `ln`: номер строки.
    pub line_number: String,
    /// `bn`: смещение байта.
    pub byte_offset: String,
    /// `se`: разделители.
    pub separator: String,
    /// `ne`: не выводить сброс в конце строки.
    pub no_end_reset: bool,
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            matched_text: None,
            matched_selected: "01;31".to_string(),
            matched_context: "01;31".to_string(),
            selected_line: String::new(),
            context_line: String::new(),
            reverse_video: false,
            filename: "35".to_string(),
            line_number: "32".to_string(),
            byte_offset: "32".to_string(),
            separator: "36".to_string(),
            no_end_reset: false,
        }
    }
}

impl Palette {
    /// Построить палитру из строки окружения `GREP_COLORS`.
    ///
    /// Формат — пары `ключ=значение`, разделённые `:`. Неизвестные ключи
    /// игнорируются; некорректные значения игнорируются молча. Булевы ключи
    /// (`rv`, `ne`) включаются самим фактом упоминания.
    pub fn from_env_spec(spec: &str) -> Palette {
        let mut palette = Palette::default();
        for item in spec.split(':') {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (item, None),
            };
            match key {
                "rv" => palette.reverse_video = true,
                "ne" => palette.no_end_reset = true,
                "mt" | "ms" | "mc" | "sl" | "cx" | "fn" | "ln" | "bn"
                | "se" => {
                    let Some(value) = value else { continue };
                    if !is_valid_sgr(value) {
                        log::debug!(
                            "GREP_COLORS: игнорируем некорректное значение {}={}",
                            key,
                            value
                        );
                        continue;
                    }
                    let value = value.to_string();
                    match key {
                        "mt" => palette.matched_text = Some(value),
                        "ms" => palette.matched_selected = value,
                        "mc" => palette.matched_context = value,
                        "sl" => palette.selected_line = value,
                        "cx" => palette.context_line = value,
                        "fn" => palette.filename = value,
                        "ln" => palette.line_number = value,
                        "bn" => palette.byte_offset = value,
                        "se" => palette.separator = value,
                        _ => unreachable!(),
                    }
                }
                _ => {}
            }
        }
        palette
    }

    /// Цвет совпавшего текста в выбранной строке, с учётом `mt`.
    pub fn match_in_selected(&self) -> &str {
        self.matched_text.as_deref().unwrap_or(&self.matched_selected)
    }

    /// Цвет совпавшего текста в контекстной строке, с учётом `mt`.
    pub fn match_in_context(&self) -> &str {
        self.matched_text.as_deref().unwrap_or(&self.matched_context)
    }

    /// Цвет тела выбранной строки с учётом `rv` при инвертировании.
    pub fn selected_body(&self, invert_match: bool) -> &str {
        if self.reverse_video && invert_match {
            &self.context_line
        } else {
            &self.selected_line
        }
    }

    /// Цвет тела контекстной строки с учётом `rv` при инвертировании.
    pub fn context_body(&self, invert_match: bool) -> &str {
        if self.reverse_video && invert_match {
            &self.selected_line
        } else {
            &self.context_line
        }
    }
}

/// Значение допустимо, когда оно состоит из целых чисел, разделённых
/// точкой с запятой. Пустое значение допустимо и снимает раскраску роли.
fn is_valid_sgr(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    value.split(';').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_values() {
        let palette = Palette::default();
        assert_eq!(palette.matched_text, None);
        assert_eq!(palette.matched_selected, "01;31");
        assert_eq!(palette.matched_context, "01;31");
        assert_eq!(palette.selected_line, "");
        assert_eq!(palette.context_line, "");
        assert!(!palette.reverse_video);
        assert_eq!(palette.filename, "35");
        assert_eq!(palette.line_number, "32");
        assert_eq!(palette.byte_offset, "32");
        assert_eq!(palette.separator, "36");
        assert!(!palette.no_end_reset);
    }

    #[test]
    fn parse_env_spec() {
        let palette = Palette::from_env_spec(
            "ms=03;33:mc=04;34:sl=35:cx=41:rv:fn=42:ln=43:bn=44:se=45:ne",
        );
        assert_eq!(palette.matched_selected, "03;33");
        assert_eq!(palette.matched_context, "04;34");
        assert_eq!(palette.selected_line, "35");
        assert_eq!(palette.context_line, "41");
        assert!(palette.reverse_video);
        assert_eq!(palette.filename, "42");
        assert_eq!(palette.line_number, "43");
        assert_eq!(palette.byte_offset, "44");
        assert_eq!(palette.separator, "45");
        assert!(palette.no_end_reset);
    }

    #[test]
    fn unknown_keys_are_ignored(){
        let palette = Palette::from_env_spec("zz=01:ms=07");
        assert_eq!(palette.matched_selected, "07");
    }

    #[test]
    fn malformed_values_are_ignored() {
        let palette = Palette::from_env_spec("ms=bold:ln=1;x");
        assert_eq!(palette.matched_selected, "01;31");
        assert_eq!(palette.line_number, "32");
    }

    #[test]
    fn mt_supplies_both_match_colors() {
        let palette = Palette::from_env_spec("mt=03;33");
        assert_eq!(palette.match_in_selected(), "03;33");
        assert_eq!(palette.match_in_context(), "03;33");
    }

    #[test]
    fn rv_swaps_roles_only_when_inverted() {
        let palette = Palette::from_env_spec("sl=35:cx=41:rv");
        assert_eq!(palette.selected_body(false), "35");
        assert_eq!(palette.context_body(false), "41");
        assert_eq!(palette.selected_body(true), "41");
        assert_eq!(palette.context_body(true), "35");
    }

    #[test]
    fn auto_color_requires_tty() {
        assert!(ColorChoice::Auto.should_color(true));
        assert!(!ColorChoice::Auto.should_color(false));
        assert!(ColorChoice::Always.should_color(false));
        assert!(!ColorChoice::Never.should_color(true));
    }
}
