/*!
Мост между крейтом `log` и stderr.

Сообщение собирается в одну строку вида `УРОВЕНЬ (цель, файл:строка)
текст` и уходит через `eprintln_locked!`. Отсечение по уровню целиком
лежит на глобальной настройке `log::set_max_level`, так что самому мосту
состояние не нужно.
*/

use std::fmt::Write;

use log::{Log, Metadata, Record};

/// Бэкенд без состояния; существует только ради реализации трейта `Log`.
#[derive(Debug)]
struct StderrLog;

static LOG: StderrLog = StderrLog;

/// Установить глобальный логгер, пишущий в stderr.
///
/// Ошибка возможна лишь при повторной установке и отдаётся вызывающему.
pub(crate) fn init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOG)
}

impl Log for StderrLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let mut origin = record.target().to_string();
        if let Some(file) = record.file() {
            origin.push_str(", ");
            origin.push_str(file);
            if let Some(line) = record.line() {
                let _ = write!(origin, ":{line}");
            }
        }
        eprintln_locked!(
            "{} ({}) {}",
            record.level(),
            origin,
            record.args()
        );
    }

    fn flush(&self) {
        // eprintln_locked! не буферизует, сбрасывать нечего.
    }
}
