/*!
Сканер: цикл «дозаполнить окно — разбить на строки — применить матчер».

[`Scanner`] владеет единственным на процесс [`PageBuffer`](crate::page_buffer)
и для каждого входа прогоняет через него цикл из `core`: найденные строки
уходят в [`Sink`], а учёт смещений, номеров строк, контекстных окон и
квоты `max_count` ведётся внутри. Результат сканирования — [`ScanReport`]
с тем, что нужно вызывающему коду для статуса выхода, строки счётчика и
восстановления позиции стандартного ввода.
*/

use std::{cell::RefCell, fs::File, io};

use ggrep_matcher::Matcher;

use crate::{page_buffer::PageBuffer, sink::Sink};

use self::core::{Core, Step};

mod core;

/// Поведение обнаружения двоичных данных при сканировании.
///
/// Классификация выполняется эвристически по первому окну входа: байт NUL
/// (или байт `0x80`, когда строки завершаются NUL) выдаёт двоичное
/// содержимое. Что делать с таким входом — решает выбранный режим.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BinaryDetection(pub(crate) BinaryKind);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum BinaryKind {
    #[default]
    None,
    Report,
    WithoutMatch,
}

impl BinaryDetection {
    /// Не выполнять обнаружение: любой вход сканируется как текст.
    pub fn none() -> BinaryDetection {
        BinaryDetection(BinaryKind::None)
    }

    /// Двоичный вход сканируется с подавленным построчным выводом и
    /// останавливается на первом совпадении; итог сообщается одной строкой
    /// «Binary file NAME matches» на стороне потребителя.
    pub fn report() -> BinaryDetection {
        BinaryDetection(BinaryKind::Report)
    }

    /// Двоичный вход пропускается целиком, как не содержащий совпадений.
    pub fn without_match() -> BinaryDetection {
        BinaryDetection(BinaryKind::WithoutMatch)
    }
}

/// Внутренняя конфигурация сканера.
///
/// Записывается только конструктором; сам сканер и ядро читают её по
/// разделяемой ссылке.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    /// Байт, завершающий строку.
    pub(crate) eol_byte: u8,
    /// Сообщать несовпадающие строки вместо совпадающих.
    pub(crate) invert_match: bool,
    /// Количество строк опережающего контекста.
    pub(crate) before_context: usize,
    /// Количество строк завершающего контекста.
    pub(crate) after_context: usize,
    /// Считать ли номера строк.
    pub(crate) line_number: bool,
    /// Предел выводимых строк на вход; `None` — без предела.
    pub(crate) max_count: Option<u64>,
    /// Стратегия обнаружения двоичных данных.
    pub(crate) binary: BinaryDetection,
    /// Пытаться ли отображать регулярные файлы в память.
    pub(crate) mmap: bool,
    /// Прекращать сканирование входа после первой сообщённой строки.
    ///
    /// Используется режимами, которым важен только факт совпадения
    /// (`-l`, `-L`, `-q`). Как и в классическом grep, действует только при
    /// прямом, неинвертированном поиске.
    pub(crate) stop_on_first_match: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            eol_byte: b'\n',
            invert_match: false,
            before_context: 0,
            after_context: 0,
            line_number: false,
            max_count: None,
            binary: BinaryDetection::default(),
            mmap: false,
            stop_on_first_match: false,
        }
    }
}

/// Конструктор для настройки сканера.
#[derive(Clone, Debug, Default)]
pub struct ScannerBuilder {
    config: Config,
}

impl ScannerBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию.
    pub fn new() -> ScannerBuilder {
        ScannerBuilder { config: Config::default() }
    }

    /// Построить сканер.
    pub fn build(&self) -> Scanner {
        Scanner {
            config: self.config.clone(),
            buffer: RefCell::new(PageBuffer::new()),
        }
    }

    /// Установить байт, завершающий строку.
    ///
    /// По умолчанию `b'\n'`; при `--null-data` это `b'\0'`.
    pub fn eol_byte(&mut self, eol_byte: u8) -> &mut ScannerBuilder {
        self.config.eol_byte = eol_byte;
        self
    }

    /// Инвертировать ли сопоставление.
    pub fn invert_match(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.config.invert_match = yes;
        self
    }

    /// Количество строк опережающего контекста для каждой выводимой строки.
    pub fn before_context(&mut self, count: usize) -> &mut ScannerBuilder {
        self.config.before_context = count;
        self
    }

    /// Количество строк завершающего контекста для каждой выводимой строки.
    pub fn after_context(&mut self, count: usize) -> &mut ScannerBuilder {
        self.config.after_context = count;
        self
    }

    /// Подсчитывать ли номера строк.
    ///
    /// Подсчёт ведётся лениво: отбрасываемые области сканируются на
    /// терминаторы один раз, и только когда номера действительно нужны.
    pub fn line_number(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.config.line_number = yes;
        self
    }

    /// Предел выводимых строк на один вход.
    ///
    /// `Some(0)` допустимо: сканирование завершается, ничего не сообщив.
    pub fn max_count(&mut self, limit: Option<u64>) -> &mut ScannerBuilder {
        self.config.max_count = limit;
        self
    }

    /// Установить стратегию обнаружения двоичных данных.
    pub fn binary_detection(
        &mut self,
        detection: BinaryDetection,
    ) -> &mut ScannerBuilder {
        self.config.binary = detection;
        self
    }

    /// Пытаться ли отображать регулярные файлы в память.
    ///
    /// Отображение используется только когда позиция чтения выровнена по
    /// странице; любая неудача прозрачно откатывается на `read`.
    pub fn memory_map(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.config.mmap = yes;
        self
    }

    /// Прекращать ли сканирование входа после первой сообщённой строки.
    pub fn stop_on_first_match(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.config.stop_on_first_match = yes;
        self
    }
}

/// Итог сканирования одного входа.
///
/// Ошибки чтения не прерывают сканирование с точки зрения вызывающего:
/// частичный результат возвращается вместе с ошибкой, чтобы счётчики и
/// статус совпадений не пропадали.
#[derive(Debug)]
pub struct ScanReport {
    pub(crate) matched_lines: u64,
    pub(crate) hit_limit: bool,
    pub(crate) after_last_match: u64,
    pub(crate) file_offset: u64,
    pub(crate) mmap_active: bool,
    pub(crate) is_regular: bool,
    pub(crate) binary: bool,
    pub(crate) error: Option<io::Error>,
}

impl ScanReport {
    /// Количество сообщённых (или подсчитанных при подавлении) строк.
    pub fn matched_lines(&self) -> u64 {
        self.matched_lines
    }

    /// Возвращает true, если хоть одна строка была сообщена.
    pub fn has_match(&self) -> bool {
        self.matched_lines > 0
    }

    /// Исчерпана ли квота `max_count`.
    pub fn hit_limit(&self) -> bool {
        self.hit_limit
    }

    /// Абсолютное смещение за последней строкой, исчерпавшей квоту.
    pub fn after_last_match(&self) -> u64 {
        self.after_last_match
    }

    /// Смещение файла после последнего сырого чтения.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Было ли на этом входе активно отображение в память.
    pub fn mmap_active(&self) -> bool {
        self.mmap_active
    }

    /// Является ли вход регулярным файлом.
    pub fn is_regular(&self) -> bool {
        self.is_regular
    }

    /// Был ли вход классифицирован как двоичный.
    pub fn binary(&self) -> bool {
        self.binary
    }

    /// Ошибка чтения, если она оборвала сканирование.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }
}

/// Сканер выполняет поиск по входу и передаёт результаты в `Sink`.
///
/// Буфер чтения переиспользуется между входами, поэтому сканер стоит
/// создавать один раз и использовать для всех файлов процесса.
#[derive(Debug)]
pub struct Scanner {
    config: Config,
    buffer: RefCell<PageBuffer>,
}

impl Scanner {
    /// Создать сканер с конфигурацией по умолчанию.
    pub fn new() -> Scanner {
        ScannerBuilder::new().build()
    }

    /// Просканировать только что открытый файл.
    pub fn search_file<M, S>(
        &mut self,
        matcher: M,
        file: &File,
        sink: S,
    ) -> Result<ScanReport, S::Error>
    where
        M: Matcher,
        S: Sink,
    {
        self.search_imp(matcher, file, false, sink)
    }

    /// Просканировать стандартный ввод, обёрнутый в `File`.
    ///
    /// Отличие от `search_file` в том, что дескриптор мог быть уже
    /// продвинут: для регулярного файла текущая позиция запоминается,
    /// чтобы вызывающий код мог восстановить её при раннем выходе.
    pub fn search_stdin<M, S>(
        &mut self,
        matcher: M,
        file: &File,
        sink: S,
    ) -> Result<ScanReport, S::Error>
    where
        M: Matcher,
        S: Sink,
    {
        self.search_imp(matcher, file, true, sink)
    }

    fn search_imp<M, S>(
        &mut self,
        matcher: M,
        file: &File,
        at_current_offset: bool,
        sink: S,
    ) -> Result<ScanReport, S::Error>
    where
        M: Matcher,
        S: Sink,
    {
        let mut buffer = self.buffer.borrow_mut();
        let mut core = Core::new(&self.config, matcher, sink);

        if let Err(err) =
            buffer.reset(file, at_current_offset, self.config.mmap)
        {
            return Ok(core.into_report(&buffer, Some(err)));
        }
        if !core.begin()? {
            return Ok(core.into_report(&buffer, None));
        }
        if let Err(err) = buffer.fill(file, 0) {
            core.finish(&buffer)?;
            return Ok(core.into_report(&buffer, Some(err)));
        }

        if core.classify(buffer.window()) {
            log::debug!("двоичный вход пропущен политикой without-match");
            core.finish(&buffer)?;
            return Ok(core.into_report(&buffer, None));
        }

        let mut read_error = None;
        let mut stopped = false;
        loop {
            let step = core.scan_window(buffer.window())?;
            match step {
                Step::Eof => break,
                Step::Stop => {
                    stopped = true;
                    break;
                }
                Step::Refill { save } => {
                    if let Err(err) = buffer.fill(file, save) {
                        read_error = Some(err);
                        stopped = true;
                        break;
                    }
                }
            }
        }
        if !stopped && core.has_residue() {
            buffer.push_sentinel(self.config.eol_byte);
            core.scan_residue(buffer.window())?;
        }
        core.finish(&buffer)?;
        Ok(core.into_report(&buffer, read_error))
    }
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner::new()
    }
}
