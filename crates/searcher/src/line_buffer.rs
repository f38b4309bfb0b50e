use std::io;

use bstr::ByteSlice;

/// Ёмкость буфера по умолчанию.
pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 8 * (1 << 10); // 8 КБ

/// Одна строка, выданная читателем строк.
///
/// Байты не включают разделитель. Смещение и номер строки всегда относятся
/// к немодифицированному источнику. Время жизни `'b` относится к внутреннему
/// буферу читателя.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineRef<'b> {
    /// Номер строки, начиная с 1, относительно настроенного разделителя.
    pub number: u64,
    /// Абсолютное смещение первого байта строки в источнике.
    pub offset: u64,
    /// Сырые байты строки без разделителя.
    pub bytes: &'b [u8],
    /// Был ли разделитель в источнике. Ложь только для последней строки
    /// файла без завершающего разделителя.
    pub has_terminator: bool,
}

/// Потоковый читатель строк поверх произвольного `io::Read`.
///
/// Читает блоками и никогда не буферизует больше одной незавершённой строки:
/// буфер растёт только тогда, когда одна строка не помещается целиком.
/// Выданная строка остаётся заимствованной из внутреннего буфера до
/// следующего вызова `next_line`.
#[derive(Debug)]
pub struct LineReader<R> {
    rdr: R,
    buf: Vec<u8>,
    /// Начало непотреблённых данных в `buf`.
    pos: usize,
    /// Конец валидных данных в `buf`.
    end: usize,
    eof: bool,
    line_term: u8,
    /// Номер следующей выдаваемой строки.
    next_number: u64,
    /// Абсолютное смещение начала следующей выдаваемой строки.
    next_offset: u64,
}

impl<R: io::Read> LineReader<R> {
    /// Создать новый читатель строк с данным разделителем.
    pub fn new(rdr: R, line_term: u8) -> LineReader<R> {
        LineReader::with_capacity(rdr, line_term, DEFAULT_BUFFER_CAPACITY)
    }

    /// Как `new`, но с явной начальной ёмкостью буфера. Ёмкость, равная
    /// нулю, допустима и полезна в тестах.
    pub fn with_capacity(
        rdr: R,
        line_term: u8,
        capacity: usize,
    ) -> LineReader<R> {
        LineReader {
            rdr,
            buf: vec![0; capacity],
            pos: 0,
            end: 0,
            eof: false,
            line_term,
            next_number: 1,
            next_offset: 0,
        }
    }

    /// Общее количество байтов, потреблённых из источника на данный момент,
    /// включая разделители.
    pub fn byte_count(&self) -> u64 {
        self.next_offset
    }

    /// Выдать следующую строку или `None` в конце источника.
    ///
    /// Завершающие байты без разделителя выдаются последней строкой с
    /// `has_terminator == false`.
    pub fn next_line(&mut self) -> io::Result<Option<LineRef<'_>>> {
        loop {
            if let Some(i) =
                self.buf[self.pos..self.end].find_byte(self.line_term)
            {
                let (start, end) = (self.pos, self.pos + i);
                let (number, offset) = (self.next_number, self.next_offset);
                self.pos = end + 1;
                self.next_number += 1;
                self.next_offset += (i + 1) as u64;
                return Ok(Some(LineRef {
                    number,
                    offset,
                    bytes: &self.buf[start..end],
                    has_terminator: true,
                }));
            }
            if self.eof {
                if self.pos == self.end {
                    return Ok(None);
                }
                let (start, end) = (self.pos, self.end);
                let (number, offset) = (self.next_number, self.next_offset);
                self.pos = end;
                self.next_number += 1;
                self.next_offset += (end - start) as u64;
                return Ok(Some(LineRef {
                    number,
                    offset,
                    bytes: &self.buf[start..end],
                    has_terminator: false,
                }));
            }
            self.fill()?;
        }
    }

    /// Прокрутить непотреблённый хвост в начало буфера и дочитать новый
    /// блок. Если непотреблённая строка занимает весь буфер, буфер
    /// удваивается, чтобы хотя бы следующая строка помещалась в памяти.
    fn fill(&mut self) -> io::Result<()> {
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }
        if self.end == self.buf.len() {
            let newlen = std::cmp::max(1, self.buf.len()) * 2;
            self.buf.resize(newlen, 0);
        }
        let readlen = self.rdr.read(&mut self.buf[self.end..])?;
        if readlen == 0 {
            self.eof = true;
        }
        self.end += readlen;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8], term: u8) -> Vec<(u64, u64, String, bool)> {
        let mut rdr = LineReader::with_capacity(bytes, term, 4);
        let mut got = vec![];
        while let Some(line) = rdr.next_line().unwrap() {
            got.push((
                line.number,
                line.offset,
                String::from_utf8_lossy(line.bytes).into_owned(),
                line.has_terminator,
            ));
        }
        got
    }

    fn s(string: &str) -> String {
        string.to_string()
    }

    #[test]
    fn lines_basic() {
        assert_eq!(
            collect(b"homer\nlisa\nmaggie\n", b'\n'),
            vec![
                (1, 0, s("homer"), true),
                (2, 6, s("lisa"), true),
                (3, 11, s("maggie"), true),
            ]
        );
    }

    #[test]
    fn lines_no_trailing_terminator() {
        assert_eq!(
            collect(b"homer\nlisa\nmaggie", b'\n'),
            vec![
                (1, 0, s("homer"), true),
                (2, 6, s("lisa"), true),
                (3, 11, s("maggie"), false),
            ]
        );
    }

    #[test]
    fn lines_empty_input() {
        assert_eq!(collect(b"", b'\n'), vec![]);
    }

    #[test]
    fn lines_only_terminators() {
        assert_eq!(
            collect(b"\n\n", b'\n'),
            vec![(1, 0, s(""), true), (2, 1, s(""), true)]
        );
    }

    #[test]
    fn lines_nul_terminated() {
        assert_eq!(
            collect(b"abc\x00de\x00", b'\x00'),
            vec![(1, 0, s("abc"), true), (2, 4, s("de"), true)]
        );
    }

    #[test]
    fn long_line_grows_buffer() {
        let long = "x".repeat(100);
        let input = format!("{}\na\n", long);
        assert_eq!(
            collect(input.as_bytes(), b'\n'),
            vec![(1, 0, long.clone(), true), (2, 101, s("a"), true)]
        );
    }

    #[test]
    fn byte_count_includes_terminators() {
        let bytes = b"ab\ncd\nef";
        let mut rdr = LineReader::with_capacity(&bytes[..], b'\n', 2);
        while rdr.next_line().unwrap().is_some() {}
        assert_eq!(rdr.byte_count(), bytes.len() as u64);
    }

    #[test]
    fn offsets_address_first_byte_of_line() {
        let bytes = b"alpha\nbeta\ngamma\n";
        let mut rdr = LineReader::new(&bytes[..], b'\n');
        while let Some(line) = rdr.next_line().unwrap() {
            let off = line.offset as usize;
            assert_eq!(bytes[off], line.bytes[0]);
        }
    }
}
