/*!
Точка входа в grab.
*/

use std::{io::Write, process::ExitCode};

#[macro_use]
mod messages;

mod flags;
mod logger;

fn main() -> ExitCode {
    match run(flags::parse()) {
        Ok(code) => code,
        Err(err) => {
            // Разрыв канала означает грациозное завершение с кодом успеха,
            // по существующему соглашению Unix. Среда выполнения Rust не
            // запрашивает сигналы PIPE, поэтому вместо сигнала мы получаем
            // ошибку ввода-вывода.
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            eprintln_locked!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Основная точка входа: выполняет поиск по разобранным аргументам и
/// выбирает код выхода.
fn run(result: flags::ParseResult) -> anyhow::Result<ExitCode> {
    let args = match result {
        flags::ParseResult::Err(err) => return Err(err),
        flags::ParseResult::Special(mode) => return special(mode),
        flags::ParseResult::Ok(args) => args,
    };
    let outcome = {
        let stdout = std::io::stdout();
        args.grep.execute_to(stdout.lock(), false)?
    };
    // 0 — выбрана хотя бы одна строка; 2 — была ошибка; иначе 1. Тихий
    // режим с совпадением всегда выходит успешно. Ошибки приходят из двух
    // мест: набора результатов движка и флага errored, взведённого
    // err_message! ещё при разборе аргументов.
    let errored = outcome.has_errors() || messages::errored();
    Ok(if outcome.has_match() && (args.quiet || !errored) {
        ExitCode::from(0)
    } else if errored {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    })
}

/// Реализует «специальные» режимы: справку и версию.
fn special(mode: flags::SpecialMode) -> anyhow::Result<ExitCode> {
    let output = match mode {
        flags::SpecialMode::Help => flags::generate_help(),
        flags::SpecialMode::Version => flags::generate_version(),
    };
    writeln!(std::io::stdout(), "{}", output.trim_end())?;
    Ok(ExitCode::from(0))
}
