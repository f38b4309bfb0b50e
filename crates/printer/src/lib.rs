/*!
Этот крейт предоставляет принтеры, взаимодействующие с крейтом
`grab-searcher`.

Принтер [`Standard`] показывает результаты в человекочитаемом формате,
смоделированном по классическим grep-подобным инструментам: настраиваемые
разделители, заголовки из имени файла, номера строки и смещения байта,
ANSI раскраска по палитре `GREP_COLORS`.

Принтер [`Summary`] показывает агрегированные результаты одного поиска:
только имена файлов с совпадениями (или без них) либо количество
выбранных строк на файл.

Раскраска управляется [`ColorChoice`] и [`Palette`]: палитра — чистая
функция от строки окружения, никакого процессного глобального состояния.
*/

#![deny(missing_docs)]

pub use crate::{
    color::{ColorChoice, Palette},
    standard::{Standard, StandardBuilder, StandardSink},
    summary::{Summary, SummaryBuilder, SummaryKind},
};

mod color;
mod standard;
mod summary;
