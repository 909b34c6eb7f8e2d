/*!
Преобразует низкоуровневые аргументы в представление более высокого уровня.
*/

use std::{ffi::OsString, io::Read, path::PathBuf};

use bstr::ByteVec;

use ggrep_matcher::{Matcher, Options};
use ggrep_printer::{
    Standard, StandardBuilder, Summary, SummaryBuilder, SummaryKind,
};
use ggrep_searcher::{BinaryDetection, Scanner, ScannerBuilder};

use crate::flags::{
    lowargs::{
        BinaryFilesMode, DirectoriesMode, ListMode, LowArgs, PatternSource,
    },
    parse::UsageError,
};

/// Режим вывода.
///
/// Режимы взаимно исключены: `-q` сильнее списков, списки сильнее
/// подсчёта.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum OutMode {
    /// Печатать совпавшие (и контекстные) строки.
    Normal,
    /// `-c`: печатать количество совпавших строк на вход.
    Count,
    /// `-l`: печатать имена входов со совпадениями.
    FilesWithMatches,
    /// `-L`: печатать имена входов без совпадений.
    FilesWithoutMatch,
    /// `-q`: не печатать ничего, выйти при первом совпадении.
    Quiet,
}

/// Как обрабатывать каталоги.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DirMode {
    /// Читать как обычный файл.
    Read,
    /// Молча пропускать.
    Skip,
    /// Рекурсивно обходить.
    Recurse,
}

/// Высокоуровневые аргументы: всё, что нужно остальной программе.
#[derive(Debug)]
pub(crate) struct HiArgs {
    keys: Vec<u8>,
    matcher_name: String,
    matcher_options: Options,
    invert_match: bool,
    out_mode: OutMode,
    max_count: Option<u64>,
    before_context: usize,
    after_context: usize,
    byte_offset: bool,
    line_number: bool,
    with_filename: bool,
    no_filename: bool,
    null_filename: bool,
    binary_files: BinaryFilesMode,
    directories: DirMode,
    mmap: bool,
    eol_byte: u8,
    paths: Vec<OsString>,
}

impl HiArgs {
    /// Построить высокоуровневые аргументы из низкоуровневых.
    ///
    /// Здесь происходит вся работа, требующая окружения: чтение файлов
    /// шаблонов, выбор движка по имени программы, проверка наличия
    /// шаблона вообще.
    pub(crate) fn from_low_args(low: LowArgs) -> anyhow::Result<HiArgs> {
        let mut invert_match = low.invert_match;
        let mut word_regexp = low.word_regexp;
        let mut line_regexp = low.line_regexp;
        let mut positional = low.positional.into_iter();

        let keys = match assemble_patterns(&low.patterns)? {
            Some(keys) => {
                if keys.is_empty() {
                    // Ключи заданы, но пусты (например, -f /dev/null):
                    // пустой шаблон совпадает со всем, инверсия
                    // переворачивается, ограничения слова и строки
                    // теряют смысл.
                    invert_match = !invert_match;
                    word_regexp = false;
                    line_regexp = false;
                }
                keys
            }
            None => match positional.next() {
                Some(pattern) => {
                    Vec::from_os_string(pattern).unwrap_or_else(|os| {
                        Vec::from(os.to_string_lossy().into_owned())
                    })
                }
                None => return Err(UsageError::bare()),
            },
        };

        let matcher_name = match low.matcher {
            Some(name) => name,
            None => matcher_from_prog_name(crate::messages::prog()),
        };

        let out_mode = if low.quiet {
            OutMode::Quiet
        } else if let Some(list) = low.list {
            match list {
                ListMode::WithMatches => OutMode::FilesWithMatches,
                ListMode::WithoutMatch => OutMode::FilesWithoutMatch,
            }
        } else if low.count {
            OutMode::Count
        } else {
            OutMode::Normal
        };

        let eol_byte = if low.null_data { b'\0' } else { b'\n' };
        let paths: Vec<OsString> = positional.collect();

        Ok(HiArgs {
            matcher_options: Options {
                case_insensitive: low.case_insensitive,
                word: word_regexp,
                line: line_regexp,
                eol_byte,
            },
            keys,
            matcher_name,
            invert_match,
            out_mode,
            max_count: low.max_count,
            before_context: low
                .before_context
                .unwrap_or(low.default_context),
            after_context: low.after_context.unwrap_or(low.default_context),
            byte_offset: low.byte_offset,
            line_number: low.line_number,
            with_filename: low.with_filename,
            no_filename: low.no_filename,
            null_filename: low.null_filename,
            binary_files: low.binary_files,
            directories: match low.directories {
                DirectoriesMode::Read => DirMode::Read,
                DirectoriesMode::Skip => DirMode::Skip,
                DirectoriesMode::Recurse => DirMode::Recurse,
            },
            mmap: low.mmap,
            eol_byte,
            paths,
        })
    }

    /// Скомпилировать движок для этих аргументов.
    ///
    /// Вызывается один раз на процесс; ошибка компиляции фатальна.
    pub(crate) fn build_matcher(
        &self,
    ) -> anyhow::Result<Box<dyn Matcher>> {
        ggrep_matcher::compile(
            &self.matcher_name,
            &self.keys,
            &self.matcher_options,
        )
        .map_err(|err| anyhow::anyhow!("{err}"))
    }

    /// Построить сканер для этих аргументов.
    pub(crate) fn build_scanner(&self) -> Scanner {
        // Классификация двоичных данных выполняется только когда возможен
        // обычный построчный вывод; в сводных режимах вход сканируется как
        // текст, если не запрошен пропуск целиком.
        let detection = match self.binary_files {
            BinaryFilesMode::Text => BinaryDetection::none(),
            BinaryFilesMode::WithoutMatch => {
                BinaryDetection::without_match()
            }
            BinaryFilesMode::Binary => {
                if self.out_mode == OutMode::Normal {
                    BinaryDetection::report()
                } else {
                    BinaryDetection::none()
                }
            }
        };
        ScannerBuilder::new()
            .eol_byte(self.eol_byte)
            .invert_match(self.invert_match)
            .before_context(self.before_context)
            .after_context(self.after_context)
            .line_number(self.line_number)
            .max_count(self.max_count)
            .binary_detection(detection)
            .memory_map(self.mmap)
            .stop_on_first_match(matches!(
                self.out_mode,
                OutMode::FilesWithMatches
                    | OutMode::FilesWithoutMatch
                    | OutMode::Quiet
            ))
            .build()
    }

    /// Построить стандартный принтер.
    pub(crate) fn build_standard_printer<W: std::io::Write>(
        &self,
        wtr: W,
    ) -> Standard<W> {
        StandardBuilder::new()
            .null_filename(self.null_filename)
            .byte_offset(self.byte_offset)
            .any_context(self.before_context > 0 || self.after_context > 0)
            .build(wtr)
    }

    /// Построить сводный принтер для текущего режима вывода.
    ///
    /// Вызывает панику в режиме `Normal`: там используется стандартный
    /// принтер.
    pub(crate) fn build_summary_printer<W: std::io::Write>(
        &self,
        wtr: W,
    ) -> Summary<W> {
        let kind = match self.out_mode {
            OutMode::Count => SummaryKind::Count,
            OutMode::FilesWithMatches => SummaryKind::PathWithMatch,
            OutMode::FilesWithoutMatch => SummaryKind::PathWithoutMatch,
            OutMode::Quiet => SummaryKind::Quiet,
            OutMode::Normal => unreachable!("normal mode is not a summary"),
        };
        SummaryBuilder::new(kind).null_filename(self.null_filename).build(wtr)
    }

    /// Режим вывода.
    pub(crate) fn out_mode(&self) -> OutMode {
        self.out_mode
    }

    /// Аргументы FILE командной строки; пусто — читать стандартный ввод.
    pub(crate) fn paths(&self) -> &[OsString] {
        &self.paths
    }

    /// Политика обработки каталогов.
    pub(crate) fn directories(&self) -> DirMode {
        self.directories
    }

    /// Предел `-m`, если задан.
    pub(crate) fn max_count(&self) -> Option<u64> {
        self.max_count
    }

    /// Завершать ли процесс при первом совпадении.
    pub(crate) fn quit_after_match(&self) -> bool {
        self.out_mode == OutMode::Quiet
    }

    /// Работает ли процесс в тихом режиме.
    pub(crate) fn quiet(&self) -> bool {
        self.out_mode == OutMode::Quiet
    }

    /// Показывать ли имена для входов, названных в командной строке.
    ///
    /// Имена появляются при двух и более FILE, `-H` принуждает,
    /// `-h` подавляет.
    pub(crate) fn show_filename_default(&self) -> bool {
        self.with_filename
            || (self.paths.len() > 1 && !self.no_filename)
    }

    /// Показывать ли имена для входов, найденных рекурсивным обходом.
    ///
    /// Обход навязывает имена даже единственному аргументу-каталогу,
    /// если они не подавлены явно.
    pub(crate) fn show_filename_in_walk(&self) -> bool {
        self.with_filename || !self.no_filename
    }
}

/// Склеить источники `-e`/`-f` в один набор ключей.
///
/// Возвращает `None`, когда источников не было вовсе (тогда шаблон берётся
/// из позиционного аргумента). Каждый источник завершается `\n`; один
/// завершающий `\n` снимается в конце.
fn assemble_patterns(
    sources: &[PatternSource],
) -> anyhow::Result<Option<Vec<u8>>> {
    if sources.is_empty() {
        return Ok(None);
    }
    let mut keys: Vec<u8> = vec![];
    for source in sources {
        match source {
            PatternSource::Regexp(pattern) => {
                keys.extend_from_slice(&os_bytes(pattern));
                keys.push(b'\n');
            }
            PatternSource::File(path) => {
                let data = if std::path::Path::new(path)
                    == std::path::Path::new("-")
                {
                    let mut buf = vec![];
                    std::io::stdin().lock().read_to_end(&mut buf).map_err(
                        |err| anyhow::anyhow!("(standard input): {err}"),
                    )?;
                    buf
                } else {
                    let path = PathBuf::from(path);
                    std::fs::read(&path).map_err(|err| {
                        anyhow::anyhow!("{}: {err}", path.display())
                    })?
                };
                if !data.is_empty() {
                    keys.extend_from_slice(&data);
                    if data.last() != Some(&b'\n') {
                        keys.push(b'\n');
                    }
                }
            }
        }
    }
    if !keys.is_empty() {
        // Снять один завершающий перевод строки.
        keys.pop();
    }
    Ok(Some(keys))
}

fn os_bytes(os: &std::ffi::OsStr) -> Vec<u8> {
    Vec::from_os_string(os.to_os_string())
        .unwrap_or_else(|os| Vec::from(os.to_string_lossy().into_owned()))
}

/// Выбрать движок по имени, под которым программа была запущена.
///
/// Имя, оканчивающееся на `egrep` или `fgrep`, включает соответствующий
/// движок; иначе — базовый.
fn matcher_from_prog_name(prog: &str) -> String {
    if prog.ends_with("egrep") {
        "egrep".to_string()
    } else if prog.ends_with("fgrep") {
        "fgrep".to_string()
    } else {
        "grep".to_string()
    }
}
