/*!
Этот крейт предоставляет сопоставление shell-глобов и обход
пользовательских корней поиска.

Глоб компилируется переводом в закреплённое регулярное выражение — тем же
приёмом, которым пользуются полноценные библиотеки наборов глобов. Здесь
достаточно семантики fnmatch по базовому имени: `*`, `?` и классы символов
`[...]` (включая отрицание `[!...]`).

Обходчик превращает упорядоченный список путей в упорядоченный поток
источников, применяя политику каталогов, фильтры include/exclude и
контроль символических ссылок. Циклы символических ссылок обнаруживаются
и сообщаются информационной заметкой, после чего ветвь обхода
останавливается.
*/

#![deny(missing_docs)]

pub use crate::{
    glob::Glob,
    walker::{DirAction, FileFilter, WalkEvent, Walker},
};

mod glob;
mod walker;
