/*!
Разбирает аргументы командной строки в структурированное представление.
*/

use std::ffi::OsString;

use crate::flags::{
    Flag, FlagValue, defs,
    defs::FLAGS,
    grep_options,
    hiargs::HiArgs,
    lowargs::{LowArgs, SpecialMode},
};

/// Ошибка использования: нераспознанный флаг, пропущенный аргумент или
/// отсутствующий шаблон.
///
/// Такие ошибки завершаются кратким напоминанием синтаксиса вместо
/// диагностики с префиксом программы; точка входа распознаёт этот тип
/// через downcast.
#[derive(Debug)]
pub(crate) struct UsageError {
    pub(crate) message: Option<String>,
}

impl UsageError {
    pub(crate) fn new(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(UsageError { message: Some(message.into()) })
    }

    pub(crate) fn bare() -> anyhow::Error {
        anyhow::Error::new(UsageError { message: None })
    }
}

impl std::error::Error for UsageError {}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message {
            Some(ref msg) => f.write_str(msg),
            None => f.write_str("invalid usage"),
        }
    }
}

/// Результат разбора аргументов CLI.
///
/// Это `anyhow::Result<T>` с дополнительным вариантом для «специальных»
/// режимов (`--help`, `-V`), которые коротко замыкают обычный поток:
/// им не нужны ни шаблон, ни склейка аргументов более высокого уровня.
#[derive(Debug)]
pub(crate) enum ParseResult<T> {
    Special(SpecialMode),
    Ok(T),
    Err(anyhow::Error),
}

impl<T> ParseResult<T> {
    /// Если результат — `Ok`, применить к нему `then`.
    fn and_then<U>(
        self,
        mut then: impl FnMut(T) -> ParseResult<U>,
    ) -> ParseResult<U> {
        match self {
            ParseResult::Special(mode) => ParseResult::Special(mode),
            ParseResult::Ok(t) => then(t),
            ParseResult::Err(err) => ParseResult::Err(err),
        }
    }
}

/// Разобрать аргументы CLI и окружение в высокоуровневое представление.
pub(crate) fn parse() -> ParseResult<HiArgs> {
    parse_low().and_then(|low| match HiArgs::from_low_args(low) {
        Ok(hi) => ParseResult::Ok(hi),
        Err(err) => ParseResult::Err(err),
    })
}

/// Разобрать аргументы CLI только в низкоуровневое представление.
///
/// Учитывает `GREP_OPTIONS`: токены из окружения приписываются перед
/// настоящими аргументами. Здесь же настраиваются глобальные флаги
/// диагностики и уровень журнала.
fn parse_low() -> ParseResult<LowArgs> {
    if let Err(err) = crate::logger::init() {
        let err = anyhow::anyhow!("failed to initialize logger: {err}");
        return ParseResult::Err(err);
    }
    // У grep нет флага отладки; внутренняя трассировка включается
    // переменной окружения.
    let level = match std::env::var_os("GREP_VERBOSE") {
        Some(v) if v == "1" => log::LevelFilter::Debug,
        _ => log::LevelFilter::Warn,
    };
    log::set_max_level(level);

    let mut final_args = grep_options::from_env();
    if !final_args.is_empty() {
        log::debug!(
            "{} аргументов приписано из GREP_OPTIONS",
            final_args.len()
        );
    }
    final_args.extend(std::env::args_os().skip(1));

    let mut low = LowArgs::default();
    if let Err(err) = Parser::new().parse(final_args, &mut low) {
        return ParseResult::Err(err);
    }
    crate::messages::set_messages(!low.no_messages);
    if low.show_version {
        return ParseResult::Special(SpecialMode::Version);
    }
    if low.show_help {
        return ParseResult::Special(SpecialMode::Help);
    }
    ParseResult::Ok(low)
}

/// Разобрать последовательность аргументов в низкоуровневое представление.
///
/// Открыто для тестов; не настраивает журнал и не читает окружение.
/// Итератор *не* должен начинаться с имени бинарного файла.
#[cfg(test)]
pub(crate) fn parse_low_raw(
    rawargs: impl IntoIterator<Item = impl Into<OsString>>,
) -> anyhow::Result<LowArgs> {
    let mut args = LowArgs::default();
    Parser::new().parse(rawargs, &mut args)?;
    Ok(args)
}

/// Предел накопления цифровых опций до диагностики.
const MAX_CONTEXT_DIGITS: usize = 64;

/// Парсер, превращающий аргументы командной строки в типизированный набор.
#[derive(Debug)]
struct Parser {
    /// Карта всех имён флагов — коротких, длинных и псевдонимов — в
    /// индексы `info`.
    map: FlagMap,
    /// Метаданные флагов по индексам из `map`.
    info: Vec<FlagInfo>,
}

impl Parser {
    /// Вернуть парсер, построив его при первом обращении.
    ///
    /// Состояние неизменяемо и целиком определяется `FLAGS`, поэтому
    /// строится ровно один раз.
    fn new() -> &'static Parser {
        use std::sync::OnceLock;

        static P: OnceLock<Parser> = OnceLock::new();
        P.get_or_init(|| {
            let mut infos = vec![];
            for &flag in FLAGS.iter() {
                infos.push(FlagInfo {
                    flag,
                    name: Ok(flag.name_long()),
                });
                for alias in flag.aliases() {
                    infos.push(FlagInfo { flag, name: Ok(alias) });
                }
                if let Some(byte) = flag.name_short() {
                    infos.push(FlagInfo { flag, name: Err(byte) });
                }
            }
            let map = FlagMap::new(&infos);
            Parser { map, info: infos }
        })
    }

    /// Разобрать данные аргументы CLI в низкоуровневое представление.
    ///
    /// Итератор *не* должен начинаться с имени бинарного файла.
    fn parse<I, O>(&self, rawargs: I, args: &mut LowArgs) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = O>,
        O: Into<OsString>,
    {
        let mut p = lexopt::Parser::from_args(rawargs);
        // Цифровые опции склеиваются в одно десятичное число контекста и
        // применяются на границе со следующей нецифровой опцией.
        let mut digits = String::new();
        let mut digit_overflow = false;
        loop {
            let arg = match p.next() {
                Ok(None) => break,
                Ok(Some(arg)) => arg,
                Err(err) => return Err(UsageError::new(err.to_string())),
            };
            let mat = match arg {
                lexopt::Arg::Value(value) => {
                    args.positional.push(value);
                    continue;
                }
                lexopt::Arg::Short(ch) if ch.is_ascii_digit() => {
                    // Сворачивание незначащего ведущего нуля, чтобы цепочка
                    // нулей не раздувала число.
                    if digits == "0" {
                        digits.clear();
                    }
                    if digits.len() >= MAX_CONTEXT_DIGITS {
                        digit_overflow = true;
                    } else {
                        digits.push(ch);
                    }
                    continue;
                }
                // Синоним для старожилов.
                lexopt::Arg::Short('y') => {
                    self.find_short(b'i').expect("flag -i is registered")
                }
                // У -I нет длинного имени; это чистый эквивалент
                // --binary-files=without-match.
                lexopt::Arg::Short('I') => {
                    flush_digits(&mut digits, &mut digit_overflow, args)?;
                    defs::update_binary_without_match(args)?;
                    continue;
                }
                lexopt::Arg::Short(ch) => {
                    match u8::try_from(ch).ok().and_then(|b| {
                        self.find_short(b)
                    }) {
                        Some(info) => info,
                        None => {
                            return Err(UsageError::new(format!(
                                "invalid option -- {ch}"
                            )));
                        }
                    }
                }
                lexopt::Arg::Long(name) => match self.find_long(name) {
                    Some(info) => info,
                    None => {
                        return Err(UsageError::new(format!(
                            "unrecognized option '--{name}'"
                        )));
                    }
                },
            };
            flush_digits(&mut digits, &mut digit_overflow, args)?;
            let value = if mat.flag.is_switch() {
                FlagValue::Switch(true)
            } else {
                match p.value() {
                    Ok(v) => FlagValue::Value(v),
                    Err(_) => {
                        return Err(UsageError::new(format!(
                            "option '{mat}' requires an argument"
                        )));
                    }
                }
            };
            mat.flag.update(value, args)?;
        }
        flush_digits(&mut digits, &mut digit_overflow, args)?;
        Ok(())
    }

    /// Найти флаг по короткому имени.
    fn find_short(&self, byte: u8) -> Option<&FlagInfo> {
        self.map.find(&[byte]).map(|i| &self.info[i])
    }

    /// Найти флаг по длинному имени или псевдониму.
    fn find_long(&self, name: &str) -> Option<&FlagInfo> {
        self.map.find(name.as_bytes()).map(|i| &self.info[i])
    }
}

/// Применить накопленные цифровые опции, если они были.
fn flush_digits(
    digits: &mut String,
    overflow: &mut bool,
    args: &mut LowArgs,
) -> anyhow::Result<()> {
    if digits.is_empty() {
        return Ok(());
    }
    if *overflow {
        // Диагностика должна показать «X...», где X — увиденные цифры.
        digits.push_str("...");
        *overflow = false;
    }
    defs::update_digit_context(digits, args)?;
    digits.clear();
    Ok(())
}

/// Информация о флаге, связанная с его именем в карте.
#[derive(Debug)]
struct FlagInfo {
    flag: &'static dyn Flag,
    /// Длинное имя либо байт короткого.
    name: Result<&'static str, u8>,
}

impl std::fmt::Display for FlagInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.name {
            Ok(long) => write!(f, "--{long}"),
            Err(short) => write!(f, "-{short}", short = char::from(short)),
        }
    }
}

/// Карта от имён флагов (коротких, длинных и псевдонимов) к их индексам.
#[derive(Debug)]
struct FlagMap {
    map: std::collections::HashMap<Vec<u8>, usize>,
}

impl FlagMap {
    /// Создать карту для данной информации о флагах.
    fn new(infos: &[FlagInfo]) -> FlagMap {
        let mut map = std::collections::HashMap::with_capacity(infos.len());
        for (i, info) in infos.iter().enumerate() {
            match info.name {
                Ok(name) => {
                    assert_eq!(None, map.insert(name.as_bytes().to_vec(), i));
                }
                Err(byte) => {
                    assert_eq!(None, map.insert(vec![byte], i));
                }
            }
        }
        FlagMap { map }
    }

    fn find(&self, name: &[u8]) -> Option<usize> {
        self.map.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    fn parse(args: &[&str]) -> LowArgs {
        parse_low_raw(args.iter().map(OsString::from)).unwrap()
    }

    fn parse_err(args: &[&str]) -> anyhow::Error {
        parse_low_raw(args.iter().map(OsString::from)).unwrap_err()
    }

    #[test]
    fn digit_options_accumulate() {
        assert_eq!(parse(&["-5"]).default_context, 5);
        assert_eq!(parse(&["-12"]).default_context, 12);
        // Цифры копятся и через границы аргументов.
        assert_eq!(parse(&["-1", "-2"]).default_context, 12);
    }

    #[test]
    fn digit_options_fold_leading_zeros() {
        assert_eq!(parse(&["-0"]).default_context, 0);
        assert_eq!(parse(&["-00"]).default_context, 0);
        assert_eq!(parse(&["-010"]).default_context, 10);
        assert_eq!(parse(&["-100"]).default_context, 100);
    }

    #[test]
    fn digit_options_flush_at_option_boundary() {
        // Каждая серия цифр применяется на границе нецифровой опции;
        // последняя серия побеждает.
        let args = parse(&["-1", "-n", "-2"]);
        assert_eq!(args.default_context, 2);
        assert!(args.line_number);
    }

    #[test]
    fn digit_options_overflow() {
        let huge: String =
            std::iter::repeat('9').take(80).collect();
        let arg = format!("-{huge}");
        let err = parse_err(&[&arg]).to_string();
        assert!(err.contains("invalid context length argument"), "{err}");
        assert!(err.contains("..."), "{err}");
    }

    #[test]
    fn unrecognized_flags_are_usage_errors() {
        let err = parse_err(&["--frobnicate"]);
        assert!(err.downcast_ref::<UsageError>().is_some());
        assert!(err.to_string().contains("unrecognized option"));

        let err = parse_err(&["-Q"]);
        assert!(err.downcast_ref::<UsageError>().is_some());
        assert!(err.to_string().contains("invalid option"));
    }

    #[test]
    fn missing_value_is_usage_error() {
        let err = parse_err(&["-e"]);
        assert!(err.downcast_ref::<UsageError>().is_some());
    }

    #[test]
    fn option_value_styles() {
        assert_eq!(
            parse(&["--regexp=foo"]).patterns.len(),
            parse(&["-efoo"]).patterns.len()
        );
        assert_eq!(parse(&["-A1"]).after_context, Some(1));
        assert_eq!(parse(&["--after-context", "1"]).after_context, Some(1));
    }

    #[test]
    fn positionals_preserved_in_order() {
        let args = parse(&["pat", "a", "b"]);
        assert_eq!(
            args.positional,
            vec![
                OsString::from("pat"),
                OsString::from("a"),
                OsString::from("b")
            ]
        );
    }
}
