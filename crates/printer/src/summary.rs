use std::io::{self, Write};

use crate::color::Palette;

/// Вид сводного вывода.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SummaryKind {
    /// Печатать только имена файлов с выбранными строками (`-l`).
    PathWithMatch,
    /// Печатать только имена файлов без выбранных строк (`-L`).
    PathWithoutMatch,
    /// Печатать количество выбранных строк на файл (`-c`).
    Count,
}

/// Конфигурация сводного принтера.
#[derive(Clone, Debug)]
struct Config {
    kind: SummaryKind,
    with_filename: bool,
    line_buffered: bool,
    line_term: u8,
    colors: Option<Palette>,
    sep_result: Vec<u8>,
}

/// Конструктор для настройки сводного принтера.
#[derive(Clone, Debug)]
pub struct SummaryBuilder {
    config: Config,
}

impl SummaryBuilder {
    /// Создать новый конструктор данного вида.
    pub fn new(kind: SummaryKind) -> SummaryBuilder {
        SummaryBuilder {
            config: Config {
                kind,
                with_filename: false,
                line_buffered: false,
                line_term: b'\n',
                colors: None,
                sep_result: b":".to_vec(),
            },
        }
    }

    /// Построить принтер, пишущий в данный писатель.
    pub fn build<W: Write>(&self, wtr: W) -> Summary<W> {
        Summary { config: self.config.clone(), wtr }
    }

    /// Печатать ли имя файла перед счётчиком (`-c` с несколькими файлами).
    pub fn with_filename(&mut self, yes: bool) -> &mut SummaryBuilder {
        self.config.with_filename = yes;
        self
    }

    /// Сбрасывать ли писатель после каждой записи.
    pub fn line_buffered(&mut self, yes: bool) -> &mut SummaryBuilder {
        self.config.line_buffered = yes;
        self
    }

    /// Байт-разделитель, завершающий каждую запись.
    pub fn line_terminator(&mut self, line_term: u8) -> &mut SummaryBuilder {
        self.config.line_term = line_term;
        self
    }

    /// Палитра раскраски; `None` отключает ANSI коды.
    pub fn colors(&mut self, colors: Option<Palette>) -> &mut SummaryBuilder {
        self.config.colors = colors;
        self
    }

    /// Разделитель между именем файла и счётчиком.
    pub fn separator_result(&mut self, sep: Vec<u8>) -> &mut SummaryBuilder {
        self.config.sep_result = sep;
        self
    }
}

/// Сводный принтер: имена файлов или счётчики, по одной записи на источник.
#[derive(Debug)]
pub struct Summary<W> {
    config: Config,
    wtr: W,
}

impl<W: Write> Summary<W> {
    /// Вид вывода этого принтера.
    pub fn kind(&self) -> SummaryKind {
        self.config.kind
    }

    /// Сообщить результат одного источника. Печатает запись, уместную для
    /// настроенного вида, либо ничего.
    pub fn report(
        &mut self,
        path: &str,
        has_match: bool,
        selected: u64,
    ) -> io::Result<()> {
        match self.config.kind {
            SummaryKind::PathWithMatch => {
                if has_match {
                    self.write_path(path)?;
                }
            }
            SummaryKind::PathWithoutMatch => {
                if !has_match {
                    self.write_path(path)?;
                }
            }
            SummaryKind::Count => {
                if self.config.with_filename {
                    self.write_colored_path(path)?;
                    let sep = self.config.sep_result.clone();
                    self.write_colored(&sep, RoleColor::Separator)?;
                }
                self.wtr.write_all(selected.to_string().as_bytes())?;
                self.wtr.write_all(&[self.config.line_term])?;
            }
        }
        if self.config.line_buffered {
            self.wtr.flush()?;
        }
        Ok(())
    }

    /// Вернуть изменяемую ссылку на базовый писатель.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Забрать базовый писатель.
    pub fn into_inner(self) -> W {
        self.wtr
    }

    fn write_path(&mut self, path: &str) -> io::Result<()> {
        self.write_colored_path(path)?;
        self.wtr.write_all(&[self.config.line_term])
    }

    fn write_colored_path(&mut self, path: &str) -> io::Result<()> {
        self.write_colored(path.as_bytes(), RoleColor::Filename)
    }

    fn write_colored(
        &mut self,
        bytes: &[u8],
        role: RoleColor,
    ) -> io::Result<()> {
        let sgr = match self.config.colors {
            None => String::new(),
            Some(ref palette) => match role {
                RoleColor::Filename => palette.filename.clone(),
                RoleColor::Separator => palette.separator.clone(),
            },
        };
        if sgr.is_empty() {
            self.wtr.write_all(bytes)
        } else {
            write!(self.wtr, "\x1b[{}m", sgr)?;
            self.wtr.write_all(bytes)?;
            self.wtr.write_all(b"\x1b[m")
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum RoleColor {
    Filename,
    Separator,
}
