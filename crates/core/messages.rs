/*!
Этот модуль определяет макросы вывода сообщений и общее изменяемое
состояние.

Подавление устанавливается один раз при разборе аргументов CLI (`-s`
отключает сообщения) и далее не меняется. Кроме того, здесь
отслеживается, столкнулся ли grab с ошибкой: `err_message!` взводит
глобальный флаг, и при завершении по этому флагу выбирается код выхода.
Подавление сообщений флаг не снимает — ошибка влияет на код выхода и
тогда, когда печать отключена.
*/

use std::sync::atomic::{AtomicBool, Ordering};

/// Когда false, «сообщения» не выводятся.
static MESSAGES: AtomicBool = AtomicBool::new(true);

/// Взводится в true, когда была выведена (или подавлена) ошибка.
static ERRORED: AtomicBool = AtomicBool::new(false);

/// Как eprintln, но блокирует stdout для предотвращения перемешивания строк.
#[macro_export]
macro_rules! eprintln_locked {
    ($($tt:tt)*) => {{
        {
            use std::io::Write;

            let stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();
            // Ошибки записи в stderr игнорировать нельзя молча: разрыв
            // канала означает грациозный выход, остальное — код 2.
            if let Err(err) = write!(stderr, "grab: ") {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            if let Err(err) = writeln!(stderr, $($tt)*) {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            drop(stdout);
        }
    }}
}

/// Выводит сообщение, если только сообщения не были отключены (`-s`).
#[macro_export]
macro_rules! message {
    ($($tt:tt)*) => {
        if crate::messages::messages() {
            eprintln_locked!($($tt)*);
        }
    }
}

/// Как message, но взводит флаг «errored», который управляет кодом
/// выхода.
#[macro_export]
macro_rules! err_message {
    ($($tt:tt)*) => {
        crate::messages::set_errored();
        message!($($tt)*);
    }
}

/// Возвращает true тогда и только тогда, когда сообщения должны
/// отображаться.
pub(crate) fn messages() -> bool {
    MESSAGES.load(Ordering::Relaxed)
}

/// Установить, должны ли сообщения отображаться.
pub(crate) fn set_messages(yes: bool) {
    MESSAGES.store(yes, Ordering::Relaxed)
}

/// Возвращает true тогда и только тогда, когда grab столкнулся с
/// ошибкой.
pub(crate) fn errored() -> bool {
    ERRORED.load(Ordering::Relaxed)
}

/// Отметить, что grab столкнулся с ошибкой.
///
/// Вызывающие не должны использовать это напрямую: флаг взводится
/// автоматически макросом `err_message!`.
pub(crate) fn set_errored() {
    ERRORED.store(true, Ordering::Relaxed);
}
