/*!
Этот модуль определяет макросы диагностики и общее изменяемое состояние.

Состояние отвечает за то, должны ли выводиться сообщения об ошибках
(`-s/--no-messages` их отключает), и за флаг «ошибка уже случалась».
Помимо невалидных аргументов командной строки, ggrep не прерывается при
ошибке (например, если не удалось открыть файл), но каждая такая ошибка
меняет статус выхода на 2. Поэтому вывод через `err_message!` взводит
глобальный флаг, который проверяется при завершении процесса.

Ошибки записи в стандартный вывод — особый случай: они сообщаются не
более одного раза на процесс, потому что после первой неудачи откажут и
все последующие записи.
*/

use std::sync::{
    OnceLock,
    atomic::{AtomicBool, Ordering},
};

/// Когда false, «сообщения» не будут выводиться.
static MESSAGES: AtomicBool = AtomicBool::new(true);
/// Переключается на true, когда выводится сообщение об ошибке.
static ERRORED: AtomicBool = AtomicBool::new(false);
/// Переключается на true после первого сообщения об ошибке записи.
static WRITE_ERRORED: AtomicBool = AtomicBool::new(false);
/// Имя программы для префикса диагностики.
static PROG: OnceLock<String> = OnceLock::new();

/// Как eprintln, но блокирует stdout для предотвращения перемешивания строк
/// и добавляет префикс с именем программы.
#[macro_export]
macro_rules! eprintln_locked {
    ($($tt:tt)*) => {{
        {
            use std::io::Write;

            let stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();
            // Ошибки здесь намеренно игнорируются с завершением процесса:
            // наиболее вероятная из них — разрыв канала, а это штатный
            // способ завершить grep.
            if let Err(err) = write!(stderr, "{}: ", crate::messages::prog())
            {
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

/// Выводит неустранимое сообщение, если только сообщения не были отключены.
#[macro_export]
macro_rules! message {
    ($($tt:tt)*) => {
        if crate::messages::messages() {
            eprintln_locked!($($tt)*);
        }
    }
}

/// Как message, но устанавливает флаг «ошибка случалась», который управляет
/// статусом выхода.
#[macro_export]
macro_rules! err_message {
    ($($tt:tt)*) => {
        crate::messages::set_errored();
        message!($($tt)*);
    }
}

/// Имя программы для префикса диагностики.
pub(crate) fn prog() -> &'static str {
    PROG.get().map(|s| s.as_str()).unwrap_or("ggrep")
}

/// Установить имя программы из нулевого аргумента командной строки.
pub(crate) fn set_prog(name: String) {
    let _ = PROG.set(name);
}

/// Возвращает true тогда и только тогда, когда сообщения должны
/// отображаться.
pub(crate) fn messages() -> bool {
    MESSAGES.load(Ordering::Relaxed)
}

/// Установить, должны ли сообщения отображаться.
///
/// По умолчанию они отображаются; `-s` отключает.
pub(crate) fn set_messages(yes: bool) {
    MESSAGES.store(yes, Ordering::Relaxed)
}

/// Возвращает true тогда и только тогда, когда случалась хотя бы одна
/// ошибка.
pub(crate) fn errored() -> bool {
    ERRORED.load(Ordering::Relaxed)
}

/// Указать, что случилась ошибка.
///
/// Вызывается автоматически через макрос `err_message!`.
pub(crate) fn set_errored() {
    ERRORED.store(true, Ordering::Relaxed);
}

/// Сообщить об ошибке записи в стандартный вывод.
///
/// Сообщение выводится не более одного раза на процесс; флаг ошибки
/// взводится в любом случае.
pub(crate) fn write_error(err: &std::io::Error) {
    set_errored();
    if !WRITE_ERRORED.swap(true, Ordering::Relaxed) {
        message!("writing output: {err}");
    }
}
