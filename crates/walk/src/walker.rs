use std::path::{Path, PathBuf};

use crate::glob::Glob;

/// Политика обработки каталога, встреченного в списке путей.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DirAction {
    /// Попытаться прочитать каталог как обычный источник: это даёт
    /// информационную заметку «Is a directory» вместо содержимого.
    #[default]
    Read,
    /// Молча пропускать каталоги.
    Skip,
    /// Рекурсивно обходить, не следуя символическим ссылкам.
    Recurse,
    /// Рекурсивно обходить, следуя символическим ссылкам.
    RecurseFollow,
}

impl DirAction {
    /// Включена ли какая-либо рекурсия.
    pub fn is_recursive(self) -> bool {
        matches!(self, DirAction::Recurse | DirAction::RecurseFollow)
    }
}

/// Фильтр имён файлов и каталогов по глобам.
///
/// Пустой список include означает «включать всё» — как в наборах
/// override-глобов. Исключение всегда побеждает включение.
#[derive(Clone, Debug, Default)]
pub struct FileFilter {
    include: Vec<Glob>,
    exclude: Vec<Glob>,
    exclude_dir: Vec<Glob>,
}

impl FileFilter {
    /// Создать фильтр из списков глобов.
    pub fn new(
        include: Vec<Glob>,
        exclude: Vec<Glob>,
        exclude_dir: Vec<Glob>,
    ) -> FileFilter {
        FileFilter { include, exclude, exclude_dir }
    }

    /// Возвращает true тогда и только тогда, когда файл с данным базовым
    /// именем проходит фильтр.
    pub fn file_passes(&self, name: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|glob| glob.is_match(name));
        let excluded = self.exclude.iter().any(|glob| glob.is_match(name));
        included && !excluded
    }

    /// Возвращает true тогда и только тогда, когда каталог с данным
    /// базовым именем исключён из обхода.
    pub fn dir_excluded(&self, name: &str) -> bool {
        self.exclude_dir.iter().any(|glob| glob.is_match(name))
    }
}

/// Событие обхода, в порядке выдачи.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalkEvent {
    /// Очередной файл-источник, прошедший фильтры.
    File(PathBuf),
    /// Информационная заметка (каталог при политике `read`, цикл
    /// символических ссылок).
    Info(String),
    /// Ошибка обхода: путь и сообщение.
    Error(PathBuf, String),
}

/// Обходчик: превращает список путей в упорядоченный поток событий.
#[derive(Clone, Debug, Default)]
pub struct Walker {
    action: DirAction,
    filter: FileFilter,
}

impl Walker {
    /// Создать обходчик с данной политикой каталогов и фильтром.
    pub fn new(action: DirAction, filter: FileFilter) -> Walker {
        Walker { action, filter }
    }

    /// Обойти данные пути по порядку, передавая события в `emit`.
    ///
    /// Дети каталогов перечисляются в лексикографическом порядке. Ошибка
    /// на одном пути не прерывает обход остальных.
    pub fn walk<F: FnMut(WalkEvent)>(&self, paths: &[PathBuf], mut emit: F) {
        for path in paths {
            if path.is_dir() {
                self.walk_dir(path, &mut emit);
            } else {
                // Несуществующие пути тоже выдаются: ошибка открытия
                // принадлежит сканеру источника.
                if self.filter.file_passes(&basename(path)) {
                    emit(WalkEvent::File(path.clone()));
                }
            }
        }
    }

    fn walk_dir<F: FnMut(WalkEvent)>(&self, path: &Path, emit: &mut F) {
        match self.action {
            DirAction::Skip => {
                log::debug!("{}: каталог пропущен", path.display());
            }
            DirAction::Read => {
                emit(WalkEvent::Info(format!(
                    "{}: Is a directory",
                    path.display()
                )));
            }
            DirAction::Recurse | DirAction::RecurseFollow => {
                self.recurse(path, emit);
            }
        }
    }

    fn recurse<F: FnMut(WalkEvent)>(&self, root: &Path, emit: &mut F) {
        let follow = self.action == DirAction::RecurseFollow;
        let walker = walkdir::WalkDir::new(root)
            .follow_links(follow)
            .sort_by_file_name();
        let mut it = walker.into_iter();
        while let Some(result) = it.next() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    if err.loop_ancestor().is_some() {
                        let path = err
                            .path()
                            .unwrap_or(Path::new("<unknown>"))
                            .display();
                        emit(WalkEvent::Info(format!(
                            "{}: recursive directory loop",
                            path
                        )));
                    } else {
                        let path = err
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_default();
                        let message = err
                            .io_error()
                            .map(|io| io.to_string())
                            .unwrap_or_else(|| err.to_string());
                        emit(WalkEvent::Error(path, message));
                    }
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                let name = basename(entry.path());
                if entry.depth() > 0 && self.filter.dir_excluded(&name) {
                    log::debug!(
                        "{}: каталог исключён глобом",
                        entry.path().display()
                    );
                    it.skip_current_dir();
                }
                continue;
            }
            if !follow && entry.file_type().is_symlink() {
                continue;
            }
            if self.filter.file_passes(&basename(entry.path())) {
                emit(WalkEvent::File(entry.path().to_path_buf()));
            }
        }
    }
}

/// Базовое имя пути в виде строки с потерями.
fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
