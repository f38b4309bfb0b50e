use std::io::{self, Write};

use grab_matcher::Span;
use grab_searcher::{Sink, SinkContext, SinkFinish, SinkMatch};

use crate::color::Palette;

/// Роль выводимой записи: от неё зависит семейство разделителей и роли
/// палитры.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Role {
    Matched,
    Context,
}

/// Конфигурация принтера. Фиксируется после сборки.
#[derive(Clone, Debug)]
struct Config {
    line_number: bool,
    byte_offset: bool,
    only_matching: bool,
    line_buffered: bool,
    invert_match: bool,
    line_term: u8,
    colors: Option<Palette>,
    initial_tab: bool,
    null_after_result: bool,
    sep_result: Vec<u8>,
    sep_name_num: Vec<u8>,
    sep_name_byte: Vec<u8>,
    sep_context_group: Vec<u8>,
    sep_context_result: Vec<u8>,
    sep_context_name_num: Vec<u8>,
    sep_context_name_byte: Vec<u8>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            line_number: false,
            byte_offset: false,
            only_matching: false,
            line_buffered: false,
            invert_match: false,
            line_term: b'\n',
            colors: None,
            initial_tab: false,
            null_after_result: false,
            sep_result: b":".to_vec(),
            sep_name_num: b":".to_vec(),
            sep_name_byte: b":".to_vec(),
            sep_context_group: b"--\n".to_vec(),
            sep_context_result: b"-".to_vec(),
            sep_context_name_num: b"-".to_vec(),
            sep_context_name_byte: b"-".to_vec(),
        }
    }
}

/// Конструктор для настройки классического принтера.
#[derive(Clone, Debug, Default)]
pub struct StandardBuilder {
    config: Config,
}

impl StandardBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию.
    pub fn new() -> StandardBuilder {
        StandardBuilder::default()
    }

    /// Построить принтер, пишущий в данный писатель.
    ///
    /// Декорации `-T`/`-Z` применяются к значениям разделителей здесь,
    /// один раз: табуляция добавляется к каждому разделителю, NUL — к
    /// разделителю результата обоих семейств.
    pub fn build<W: Write>(&self, wtr: W) -> Standard<W> {
        let mut config = self.config.clone();
        if config.initial_tab {
            for sep in [
                &mut config.sep_result,
                &mut config.sep_name_num,
                &mut config.sep_name_byte,
                &mut config.sep_context_result,
                &mut config.sep_context_name_num,
                &mut config.sep_context_name_byte,
            ] {
                sep.push(b'\t');
            }
        }
        if config.null_after_result {
            config.sep_result.push(b'\x00');
            config.sep_context_result.push(b'\x00');
        }
        Standard { config, wtr }
    }

    /// Печатать ли номер строки перед каждой строкой.
    pub fn line_number(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.line_number = yes;
        self
    }

    /// Печатать ли смещение байта перед каждой строкой.
    pub fn byte_offset(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.byte_offset = yes;
        self
    }

    /// Печатать только совпавшие части строки, каждую отдельной записью со
    /// смещением самого совпадения.
    pub fn only_matching(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.only_matching = yes;
        self
    }

    /// Сбрасывать ли писатель после каждой записи.
    pub fn line_buffered(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.line_buffered = yes;
        self
    }

    /// Был ли поиск инвертирован. Нужно только для роли `rv` палитры.
    pub fn invert_match(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.invert_match = yes;
        self
    }

    /// Байт-разделитель, завершающий каждую выводимую запись.
    pub fn line_terminator(&mut self, line_term: u8) -> &mut StandardBuilder {
        self.config.line_term = line_term;
        self
    }

    /// Палитра раскраски; `None` полностью отключает ANSI коды.
    pub fn colors(&mut self, colors: Option<Palette>) -> &mut StandardBuilder {
        self.config.colors = colors;
        self
    }

    /// Добавить табуляцию к каждому значению разделителя (`-T`).
    pub fn initial_tab(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.initial_tab = yes;
        self
    }

    /// Добавить NUL после разделителя результата (`-Z`).
    pub fn null_after_result(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.null_after_result = yes;
        self
    }

    /// Разделитель между заголовком и содержимым совпавшей строки.
    pub fn separator_result(&mut self, sep: Vec<u8>) -> &mut StandardBuilder {
        self.config.sep_result = sep;
        self
    }

    /// Разделитель между именем файла и номером строки.
    pub fn separator_name_num(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_name_num = sep;
        self
    }

    /// Разделитель перед смещением байта.
    pub fn separator_name_byte(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_name_byte = sep;
        self
    }

    /// Разделитель между группами контекста, выводится отдельной записью.
    pub fn separator_context_group(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_context_group = sep;
        self
    }

    /// Разделитель между заголовком и содержимым контекстной строки.
    pub fn separator_context_result(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_context_result = sep;
        self
    }

    /// Контекстный вариант разделителя имени файла и номера строки.
    pub fn separator_context_name_num(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_context_name_num = sep;
        self
    }

    /// Контекстный вариант разделителя перед смещением байта.
    pub fn separator_context_name_byte(
        &mut self,
        sep: Vec<u8>,
    ) -> &mut StandardBuilder {
        self.config.sep_context_name_byte = sep;
        self
    }
}

/// Классический построчный принтер в стиле grep.
#[derive(Debug)]
pub struct Standard<W> {
    config: Config,
    wtr: W,
}

impl<W: Write> Standard<W> {
    /// Создать sink для поиска по одному источнику. `path` — имя файла
    /// (или метка потока) для заголовков; `None` подавляет поле имени.
    pub fn sink_with_path<'p, 's>(
        &'s mut self,
        path: Option<&'p str>,
    ) -> StandardSink<'p, 's, W> {
        StandardSink { printer: self, path, has_match: false, selected: 0 }
    }

    /// Вернуть изменяемую ссылку на базовый писатель.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Забрать базовый писатель.
    pub fn into_inner(self) -> W {
        self.wtr
    }

    fn color_enabled(&self) -> bool {
        self.config.colors.is_some()
    }

    /// Записать `bytes`, обёрнутые в SGR последовательность данной роли.
    fn write_colored(&mut self, bytes: &[u8], sgr: &str) -> io::Result<()> {
        if self.color_enabled() && !sgr.is_empty() {
            write!(self.wtr, "\x1b[{}m", sgr)?;
            self.wtr.write_all(bytes)?;
            self.wtr.write_all(b"\x1b[m")?;
        } else {
            self.wtr.write_all(bytes)?;
        }
        Ok(())
    }

    fn write_separator(&mut self, which: Separator, role: Role) -> io::Result<()> {
        let sep = match (which, role) {
            (Separator::Result, Role::Matched) => &self.config.sep_result,
            (Separator::Result, Role::Context) => {
                &self.config.sep_context_result
            }
            (Separator::NameNum, Role::Matched) => &self.config.sep_name_num,
            (Separator::NameNum, Role::Context) => {
                &self.config.sep_context_name_num
            }
            (Separator::NameByte, Role::Matched) => {
                &self.config.sep_name_byte
            }
            (Separator::NameByte, Role::Context) => {
                &self.config.sep_context_name_byte
            }
        }
        .clone();
        let se = self
            .config
            .colors
            .as_ref()
            .map(|palette| palette.separator.clone())
            .unwrap_or_default();
        self.write_colored(&sep, &se)
    }

    /// Записать одну запись: заголовки, полезную нагрузку и разделитель
    /// строк, поле за полем в фиксированном порядке.
    fn write_record(
        &mut self,
        role: Role,
        path: Option<&str>,
        line_number: u64,
        byte_offset: u64,
        bytes: &[u8],
        spans: &[Span],
    ) -> io::Result<()> {
        let palette = self.config.colors.clone();
        if let Some(path) = path {
            let color = palette
                .as_ref()
                .map(|p| p.filename.clone())
                .unwrap_or_default();
            self.write_colored(path.as_bytes(), &color)?;
            if self.config.line_number {
                self.write_separator(Separator::NameNum, role)?;
            } else if self.config.byte_offset {
                self.write_separator(Separator::NameByte, role)?;
            } else {
                self.write_separator(Separator::Result, role)?;
            }
        }
        if self.config.line_number {
            let color = palette
                .as_ref()
                .map(|p| p.line_number.clone())
                .unwrap_or_default();
            self.write_colored(line_number.to_string().as_bytes(), &color)?;
            if self.config.byte_offset {
                self.write_separator(Separator::NameByte, role)?;
            } else {
                self.write_separator(Separator::Result, role)?;
            }
        }
        if self.config.byte_offset {
            let color = palette
                .as_ref()
                .map(|p| p.byte_offset.clone())
                .unwrap_or_default();
            self.write_colored(byte_offset.to_string().as_bytes(), &color)?;
            self.write_separator(Separator::Result, role)?;
        }
        self.write_payload(role, bytes, spans)?;
        self.wtr.write_all(&[self.config.line_term])?;
        if self.config.line_buffered {
            self.wtr.flush()?;
        }
        Ok(())
    }

    /// Полезная нагрузка: тело строки в цвете роли, совпавшие диапазоны в
    /// цвете совпадения, возврат к цвету тела после каждого диапазона.
    fn write_payload(
        &mut self,
        role: Role,
        bytes: &[u8],
        spans: &[Span],
    ) -> io::Result<()> {
        let Some(palette) = self.config.colors.clone() else {
            return self.wtr.write_all(bytes);
        };
        let invert = self.config.invert_match;
        let (body, mat) = match role {
            Role::Matched => (
                palette.selected_body(invert).to_string(),
                palette.match_in_selected().to_string(),
            ),
            Role::Context => (
                palette.context_body(invert).to_string(),
                palette.match_in_context().to_string(),
            ),
        };
        if !body.is_empty() {
            write!(self.wtr, "\x1b[{}m", body)?;
        }
        let mut last = 0;
        for span in spans {
            if span.is_empty() {
                continue;
            }
            self.wtr.write_all(&bytes[last..span.start])?;
            if mat.is_empty() {
                self.wtr.write_all(&bytes[span.start..span.end])?;
            } else {
                write!(self.wtr, "\x1b[{}m", mat)?;
                self.wtr.write_all(&bytes[span.start..span.end])?;
                self.wtr.write_all(b"\x1b[m")?;
                if !body.is_empty() {
                    write!(self.wtr, "\x1b[{}m", body)?;
                }
            }
            last = span.end;
        }
        self.wtr.write_all(&bytes[last..])?;
        if !body.is_empty() && !palette.no_end_reset {
            self.wtr.write_all(b"\x1b[m")?;
        }
        Ok(())
    }

    fn write_context_break(&mut self) -> io::Result<()> {
        let sep = self.config.sep_context_group.clone();
        let se = self
            .config
            .colors
            .as_ref()
            .map(|palette| palette.separator.clone())
            .unwrap_or_default();
        self.write_colored(&sep, &se)?;
        if self.config.line_buffered {
            self.wtr.flush()?;
        }
        Ok(())
    }
}

/// Sink одного поиска, созданный принтером [`Standard`].
#[derive(Debug)]
pub struct StandardSink<'p, 's, W> {
    printer: &'s mut Standard<W>,
    path: Option<&'p str>,
    has_match: bool,
    selected: u64,
}

impl<'p, 's, W: Write> StandardSink<'p, 's, W> {
    /// Было ли в этом поиске хотя бы одно совпадение.
    pub fn has_match(&self) -> bool {
        self.has_match
    }

    /// Количество выбранных строк, сообщённое поисковиком в конце.
    pub fn selected(&self) -> u64 {
        self.selected
    }
}

impl<'p, 's, W: Write> Sink for StandardSink<'p, 's, W> {
    type Error = io::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, io::Error> {
        self.has_match = true;
        if self.printer.config.only_matching {
            for span in mat.spans {
                if span.is_empty() {
                    continue;
                }
                let piece = &mat.bytes[span.start..span.end];
                let rel = [Span::new(0, piece.len())];
                self.printer.write_record(
                    Role::Matched,
                    self.path,
                    mat.line_number,
                    mat.absolute_byte_offset + span.start as u64,
                    piece,
                    &rel,
                )?;
            }
            return Ok(true);
        }
        self.printer.write_record(
            Role::Matched,
            self.path,
            mat.line_number,
            mat.absolute_byte_offset,
            mat.bytes,
            mat.spans,
        )?;
        Ok(true)
    }

    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, io::Error> {
        self.printer.write_record(
            Role::Context,
            self.path,
            ctx.line_number,
            ctx.absolute_byte_offset,
            ctx.bytes,
            ctx.spans,
        )?;
        Ok(true)
    }

    fn context_break(&mut self) -> Result<bool, io::Error> {
        self.printer.write_context_break()?;
        Ok(true)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), io::Error> {
        self.selected = finish.selected;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Separator {
    Result,
    NameNum,
    NameByte,
}
