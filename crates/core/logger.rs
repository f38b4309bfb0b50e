/*!
Логгер grab поверх крейта `log`: одна строка stderr на запись, без
дополнительных зависимостей.
*/

use log::Log;

/// Пишет записи журнала в stderr в формате `уровень|цель: сообщение`.
///
/// На уровнях debug и trace к записи добавляется суффикс `(файл:строка)`:
/// там важно, откуда именно пришла запись. Фильтрация по уровню идёт
/// через глобальную настройку max_level крейта `log`, которую
/// устанавливает разбор флагов `--debug`/`--trace`.
#[derive(Debug)]
pub(crate) struct Logger(());

/// Одиночка, используемый как цель для реализации трейта `Log`.
const LOGGER: &'static Logger = &Logger(());

impl Logger {
    /// Установить логгер глобальным. Ошибка возможна только при повторной
    /// установке.
    pub(crate) fn init() -> Result<(), log::SetLoggerError> {
        log::set_logger(LOGGER)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let location = match (record.file(), record.line()) {
            (Some(file), Some(line))
                if record.level() >= log::Level::Debug =>
            {
                format!(" ({}:{})", file, line)
            }
            _ => String::new(),
        };
        eprintln_locked!(
            "{}|{}: {}{}",
            record.level(),
            record.target(),
            record.args(),
            location
        );
    }

    fn flush(&self) {
        // eprintln_locked! сбрасывается при каждом вызове.
    }
}
