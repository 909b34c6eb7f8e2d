/*!
Предоставляет определение низкоуровневых аргументов из флагов CLI.
*/

use std::ffi::OsString;

/// «Специальный» режим, который превалирует над всем остальным.
///
/// Вывод помощи или версии не требует ни шаблона, ни файлов, поэтому
/// обработка коротко замыкается сразу после разбора. Версия сильнее
/// помощи независимо от порядка флагов.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SpecialMode {
    /// Показать текст помощи и выйти со статусом 0.
    Help,
    /// Показать версию и выйти со статусом 0.
    Version,
}

/// Источник шаблонов в порядке появления в командной строке.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum PatternSource {
    /// Шаблон из `-e/--regexp`.
    Regexp(OsString),
    /// Файл шаблонов из `-f/--file`; `-` означает стандартный ввод.
    File(OsString),
}

/// Режим списка файлов.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ListMode {
    /// `-l`: файлы хотя бы с одним совпадением.
    WithMatches,
    /// `-L`: файлы без совпадений.
    WithoutMatch,
}

/// Как обрабатывать двоичные файлы.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum BinaryFilesMode {
    /// Сообщать «Binary file NAME matches» (по умолчанию).
    #[default]
    Binary,
    /// Сканировать как текст (`-a`).
    Text,
    /// Пропускать целиком (`-I`).
    WithoutMatch,
}

/// Как обрабатывать каталоги.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum DirectoriesMode {
    /// Читать как обычный файл; ошибка чтения скажет сама за себя.
    #[default]
    Read,
    /// Молча пропускать.
    Skip,
    /// Рекурсивно обходить.
    Recurse,
}

/// Коллекция «низкоуровневых» аргументов.
///
/// Поля соответствуют флагам почти один в один; всё, что требует
/// вычислений или чтения файлов (склейка шаблонов, выбор движка по имени
/// программы), откладывается до построения высокоуровневых аргументов.
#[derive(Debug, Default)]
pub(crate) struct LowArgs {
    pub(crate) show_help: bool,
    pub(crate) show_version: bool,
    pub(crate) positional: Vec<OsString>,
    pub(crate) patterns: Vec<PatternSource>,
    /// Имя движка; конфликтующие выборы — фатальная ошибка разбора.
    pub(crate) matcher: Option<String>,
    pub(crate) after_context: Option<usize>,
    pub(crate) before_context: Option<usize>,
    /// Контекст по умолчанию: `-C N` и цифровые опции `-NUM`.
    pub(crate) default_context: usize,
    pub(crate) binary_files: BinaryFilesMode,
    pub(crate) byte_offset: bool,
    pub(crate) case_insensitive: bool,
    pub(crate) count: bool,
    pub(crate) directories: DirectoriesMode,
    pub(crate) invert_match: bool,
    pub(crate) line_number: bool,
    pub(crate) line_regexp: bool,
    pub(crate) list: Option<ListMode>,
    pub(crate) max_count: Option<u64>,
    pub(crate) mmap: bool,
    pub(crate) no_filename: bool,
    pub(crate) no_messages: bool,
    pub(crate) null_data: bool,
    pub(crate) null_filename: bool,
    pub(crate) quiet: bool,
    pub(crate) with_filename: bool,
    pub(crate) word_regexp: bool,
}
