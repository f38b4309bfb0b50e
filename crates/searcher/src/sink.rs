use std::io;

use grab_matcher::Span;

/// Трейт, описывающий ошибки, которые может сообщать реализация `Sink`.
///
/// Поисковик передаёт вверх как ошибки ввода-вывода источника, так и
/// ошибки, возникшие в самой реализации `Sink`; этот трейт позволяет
/// использовать для обеих один тип.
pub trait SinkError: Sized {
    /// Построить ошибку из ошибки ввода-вывода.
    fn error_io(err: io::Error) -> Self;
}

impl SinkError for io::Error {
    fn error_io(err: io::Error) -> io::Error {
        err
    }
}

/// Вид контекстной строки.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SinkContextKind {
    /// Строка перед совпадением.
    Before,
    /// Строка после совпадения.
    After,
}

/// Совпавшая строка, передаваемая в `Sink`.
#[derive(Clone, Debug)]
pub struct SinkMatch<'b> {
    /// Номер строки, начиная с 1.
    pub line_number: u64,
    /// Абсолютное смещение первого байта строки в источнике.
    pub absolute_byte_offset: u64,
    /// Байты строки без разделителя (и без CR, если настроено его
    /// удаление).
    pub bytes: &'b [u8],
    /// Диапазоны совпадений внутри строки: без пересечений, по возрастанию.
    /// Пусты для строк, выбранных инвертированием.
    pub spans: &'b [Span],
}

/// Контекстная строка, передаваемая в `Sink`.
#[derive(Clone, Debug)]
pub struct SinkContext<'b> {
    /// Номер строки, начиная с 1.
    pub line_number: u64,
    /// Абсолютное смещение первого байта строки в источнике.
    pub absolute_byte_offset: u64,
    /// Байты строки без разделителя.
    pub bytes: &'b [u8],
    /// Диапазоны совпадений внутри строки. Непусты только при
    /// инвертированном поиске, когда контекстные строки и есть совпавшие.
    pub spans: &'b [Span],
    /// До или после совпадения.
    pub kind: SinkContextKind,
}

/// Сводка одного поиска, передаваемая в конце.
#[derive(Clone, Debug)]
pub struct SinkFinish {
    /// Общее количество просмотренных байтов источника.
    pub byte_count: u64,
    /// Количество выбранных строк (с учётом инвертирования и max_count).
    pub selected: u64,
}

/// Трейт, определяющий, как вызывающий код получает результаты поиска.
///
/// Каждая процедура, кроме `finish`, возвращает `Ok(true)` для продолжения
/// поиска и `Ok(false)` для его досрочного прекращения (например, в тихом
/// режиме после первого совпадения).
pub trait Sink {
    /// Тип ошибки этой реализации.
    type Error: SinkError;

    /// Вызывается для каждой выбранной строки.
    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, Self::Error>;

    /// Вызывается для каждой контекстной строки.
    fn context(
        &mut self,
        _ctx: &SinkContext<'_>,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Вызывается между несмежными группами контекста.
    fn context_break(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Вызывается ровно один раз в конце поиска, независимо от того, было
    /// ли совпадение.
    fn finish(&mut self, _finish: &SinkFinish) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<'a, S: Sink> Sink for &'a mut S {
    type Error = S::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        (**self).matched(mat)
    }

    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, Self::Error> {
        (**self).context(ctx)
    }

    fn context_break(&mut self) -> Result<bool, Self::Error> {
        (**self).context_break()
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), Self::Error> {
        (**self).finish(finish)
    }
}
