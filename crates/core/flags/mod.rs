/*!
Разбор командной строки и окружения в типизированную конфигурацию.

Модуль устроен в два слоя. [`lowargs::LowArgs`] — «низкоуровневые»
аргументы, максимально близкие к самим флагам: их заполняет парсер через
метод `update` соответствующей реализации трейта [`Flag`]. Затем
[`hiargs::HiArgs`] переводит их в представление, которым пользуется
остальная программа: склеенные шаблоны, имя движка, развёрнутые значения
контекста, правило показа имён файлов.

Перед разбором к аргументам приписываются токены из переменной окружения
`GREP_OPTIONS` (см. [`grep_options`]).
*/

use std::ffi::OsString;

pub(crate) use crate::flags::{
    hiargs::{DirMode, HiArgs, OutMode},
    lowargs::SpecialMode,
    parse::{ParseResult, UsageError, parse},
};

#[cfg(test)]
pub(crate) use crate::flags::parse::parse_low_raw;

mod defs;
mod grep_options;
pub(crate) mod help;
mod hiargs;
mod lowargs;
mod parse;

/// Значение, извлечённое для флага из командной строки.
#[derive(Debug)]
pub(crate) enum FlagValue {
    /// Переключатель без аргумента.
    Switch(bool),
    /// Аргумент флага.
    Value(OsString),
}

impl FlagValue {
    /// Вернуть значение аргумента.
    ///
    /// Вызывает панику для переключателя; парсер гарантирует, что флаги с
    /// аргументами получают именно `Value`.
    pub(crate) fn unwrap_value(self) -> OsString {
        match self {
            FlagValue::Switch(_) => unreachable!("switch flag has no value"),
            FlagValue::Value(v) => v,
        }
    }
}

/// Один логический флаг командной строки.
///
/// Реализация описывает все проявления флага: короткое и длинное имена и
/// псевдонимы. Метод `update` переносит извлечённое значение в
/// низкоуровневые аргументы; ошибки разбора значений возвращаются отсюда
/// и становятся фатальными.
pub(crate) trait Flag: std::fmt::Debug + Send + Sync + 'static {
    /// Является ли флаг переключателем без аргумента.
    fn is_switch(&self) -> bool;

    /// Короткое однобуквенное имя, если есть.
    fn name_short(&self) -> Option<u8> {
        None
    }

    /// Длинное имя флага.
    fn name_long(&self) -> &'static str;

    /// Дополнительные длинные имена.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Применить значение флага к низкоуровневым аргументам.
    fn update(
        &self,
        value: FlagValue,
        args: &mut lowargs::LowArgs,
    ) -> anyhow::Result<()>;
}
