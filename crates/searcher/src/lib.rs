/*!
Этот крейт предоставляет реализацию построчного поиска по потоку байтов.

# Краткий обзор

Основной тип в этом крейте — [`Searcher`], который настраивается и
создаётся с помощью [`SearcherBuilder`]. `Searcher` отвечает за чтение
байтов из источника (например, файла), разбиение их на строки по
настроенному разделителю, применение матчера к каждой строке и передачу
результатов в [`Sink`]. Сам `Searcher` также владеет оконным автоматом
контекста: именно он решает, какие строки выдаются как совпадения, какие —
как контекст до/после, и где между группами появляется разделитель.

Инвертирование совпадения применяется здесь, а не в матчере, поэтому
диапазоны совпадений остаются доступными для раскраски вывода.

`Sink` описывает, как вызывающий код получает результаты: процедуры
вызываются для совпавших строк, контекстных строк, разрывов между группами
контекста и в конце поиска. Реализации могут быть тривиально простыми
(счётчик) или сложными (принтер в стиле grep).
*/

#![deny(missing_docs)]

pub use crate::{
    line_buffer::{LineReader, LineRef},
    searcher::{Searcher, SearcherBuilder},
    sink::{
        Sink, SinkContext, SinkContextKind, SinkError, SinkFinish, SinkMatch,
    },
};

mod line_buffer;
mod searcher;
mod sink;

/// Возвращает true тогда и только тогда, когда данный префикс источника
/// выглядит двоичным.
///
/// Эвристика — наличие байта NUL; она отключена, когда сам разделитель
/// строк равен NUL (режим `--null-data`).
pub fn is_binary_prefix(prefix: &[u8], line_term: u8) -> bool {
    use bstr::ByteSlice;

    if line_term == b'\x00' {
        return false;
    }
    prefix.find_byte(b'\x00').is_some()
}

#[cfg(test)]
mod tests {
    use super::is_binary_prefix;

    #[test]
    fn binary_prefix() {
        assert!(is_binary_prefix(b"hi\x00there", b'\n'));
        assert!(!is_binary_prefix(b"hi there", b'\n'));
        assert!(!is_binary_prefix(b"hi\x00there", b'\x00'));
        assert!(!is_binary_prefix(b"", b'\n'));
    }
}
