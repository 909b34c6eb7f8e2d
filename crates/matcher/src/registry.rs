/*!
Реестр движков и точка компиляции шаблонов.

Движок выбирается по историческому имени (`grep`, `egrep`, `fgrep`);
неизвестное имя молча откатывается к записи `default` — так поступает и
установщик матчеров классического grep, благодаря чему, например,
запрос perl-движка в сборке без него деградирует до движка по умолчанию.
*/

use crate::{Error, Matcher, fixed::FixedEngine, regex::RegexEngine};

/// Настройки, общие для всех движков.
///
/// Сворачивание регистра и ограничения слова/строки — обязанность движка,
/// а не сканера (см. контракт [`Matcher`]); байт конца строки нужен движкам
/// для якорей и проверок границ строк.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Не различать регистр ASCII-букв (`-i`).
    pub case_insensitive: bool,
    /// Совпадение должно быть целым словом (`-w`).
    pub word: bool,
    /// Совпадение должно быть целой строкой (`-x`).
    pub line: bool,
    /// Байт, завершающий строку: `\n` или `\0` при `-z`.
    pub eol_byte: u8,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            case_insensitive: false,
            word: false,
            line: false,
            eol_byte: b'\n',
        }
    }
}

/// Конструктор движка в таблице реестра.
type EngineBuilder = fn(&[u8], &Options) -> Result<Box<dyn Matcher>, Error>;

fn build_basic(
    keys: &[u8],
    opts: &Options,
) -> Result<Box<dyn Matcher>, Error> {
    Ok(Box::new(RegexEngine::basic(keys, opts)?))
}

fn build_extended(
    keys: &[u8],
    opts: &Options,
) -> Result<Box<dyn Matcher>, Error> {
    Ok(Box::new(RegexEngine::extended(keys, opts)?))
}

fn build_fixed(
    keys: &[u8],
    opts: &Options,
) -> Result<Box<dyn Matcher>, Error> {
    Ok(Box::new(FixedEngine::new(keys, opts)?))
}

/// Все зарегистрированные движки.
///
/// Имя `default` обязано присутствовать: на него откатывается любое
/// нераспознанное имя.
const ENGINES: &[(&str, EngineBuilder)] = &[
    ("grep", build_basic),
    ("egrep", build_extended),
    ("fgrep", build_fixed),
    ("default", build_basic),
];

/// Скомпилировать набор ключей движком с указанным именем.
///
/// Ключи — это исходные байты шаблонов, разделённые `\n`. Компиляция
/// выполняется один раз на процесс; ошибка фатальна для вызывающего кода.
pub fn compile(
    name: &str,
    keys: &[u8],
    opts: &Options,
) -> Result<Box<dyn Matcher>, Error> {
    let builder = lookup(name).or_else(|| {
        log::debug!("движок {name:?} не найден, откат к \"default\"");
        lookup("default")
    });
    match builder {
        Some(builder) => builder(keys, opts),
        None => Err(Error::new("no default matcher registered")),
    }
}

fn lookup(name: &str) -> Option<EngineBuilder> {
    ENGINES
        .iter()
        .find(|&&(candidate, _)| candidate == name)
        .map(|&(_, builder)| builder)
}
