/*!
Трейт `Sink` и записи, которые сканер передаёт потребителю результатов.

Сканер ничего не знает о формате вывода: найдя строку, он отдаёт её
реализации `Sink` вместе с учётными данными (абсолютное смещение байта,
номер строки). Принтеры из крейта `ggrep-printer` реализуют этот трейт;
в тестах его реализует простой накопитель.
*/

use std::io;

/// Трейт для ошибок, которые может возвращать `Sink`.
///
/// Сканеру нужно уметь заворачивать собственные ошибки ввода-вывода и
/// сообщения в тип ошибки потребителя.
pub trait SinkError: Sized {
    /// Ошибка из произвольного сообщения.
    fn error_message<T: std::fmt::Display>(message: T) -> Self;

    /// Ошибка из ошибки ввода-вывода.
    fn error_io(err: io::Error) -> Self {
        Self::error_message(err)
    }
}

impl SinkError for io::Error {
    fn error_message<T: std::fmt::Display>(message: T) -> io::Error {
        io::Error::new(io::ErrorKind::Other, message.to_string())
    }

    fn error_io(err: io::Error) -> io::Error {
        err
    }
}

/// Совпавшая строка, переданная потребителю.
///
/// Байты включают завершающий байт конца строки; для последней строки без
/// терминатора он синтезирован сентинелом, поэтому вывод всегда завершён.
#[derive(Clone, Debug)]
pub struct SinkMatch<'b> {
    pub(crate) bytes: &'b [u8],
    pub(crate) absolute_byte_offset: u64,
    pub(crate) line_number: Option<u64>,
}

impl<'b> SinkMatch<'b> {
    /// Байты строки вместе с терминатором.
    #[inline]
    pub fn bytes(&self) -> &'b [u8] {
        self.bytes
    }

    /// Абсолютное смещение первого байта строки от начала входа.
    #[inline]
    pub fn absolute_byte_offset(&self) -> u64 {
        self.absolute_byte_offset
    }

    /// Номер строки, если сканер настроен их считать.
    #[inline]
    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }
}

/// Вид контекстной строки.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SinkContextKind {
    /// Строка опережающего контекста (`-B`).
    Before,
    /// Строка завершающего контекста (`-A`).
    After,
}

/// Контекстная строка, переданная потребителю.
#[derive(Clone, Debug)]
pub struct SinkContext<'b> {
    pub(crate) bytes: &'b [u8],
    pub(crate) kind: SinkContextKind,
    pub(crate) absolute_byte_offset: u64,
    pub(crate) line_number: Option<u64>,
}

impl<'b> SinkContext<'b> {
    /// Байты строки вместе с терминатором.
    #[inline]
    pub fn bytes(&self) -> &'b [u8] {
        self.bytes
    }

    /// Вид контекста.
    #[inline]
    pub fn kind(&self) -> &SinkContextKind {
        &self.kind
    }

    /// Абсолютное смещение первого байта строки от начала входа.
    #[inline]
    pub fn absolute_byte_offset(&self) -> u64 {
        self.absolute_byte_offset
    }

    /// Номер строки, если сканер настроен их считать.
    #[inline]
    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }
}

/// Итог сканирования одного входа.
#[derive(Clone, Debug)]
pub struct SinkFinish {
    pub(crate) byte_count: u64,
    pub(crate) match_count: u64,
    pub(crate) binary: bool,
}

impl SinkFinish {
    /// Всего байтов, прошедших через сканер.
    #[inline]
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Количество выведенных (или подсчитанных) строк.
    ///
    /// При подавленном выводе — например, для двоичного файла — счётчик
    /// всё равно ведётся, поэтому он может быть больше числа вызовов
    /// `matched`.
    #[inline]
    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// Был ли вход классифицирован как двоичный.
    #[inline]
    pub fn binary(&self) -> bool {
        self.binary
    }
}

/// Потребитель результатов сканирования.
///
/// Все методы возвращают `true`, чтобы продолжить сканирование; `false`
/// останавливает его досрочно без ошибки. `finish` вызывается на всех
/// путях завершения, кроме ошибки самого потребителя.
pub trait Sink {
    /// Тип ошибки потребителя.
    type Error: SinkError;

    /// Вызывается перед началом сканирования входа.
    #[inline]
    fn begin(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Вызывается для каждой выводимой строки.
    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, Self::Error>;

    /// Вызывается для каждой контекстной строки.
    #[inline]
    fn context(
        &mut self,
        _ctx: &SinkContext<'_>,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Вызывается между несмежными группами вывода.
    ///
    /// Сканер обращается сюда только когда запрошен хоть какой-то контекст;
    /// печатать ли разделитель — решает потребитель (например, не раньше
    /// первого фактического вывода).
    #[inline]
    fn context_break(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Вызывается по завершении сканирования входа.
    #[inline]
    fn finish(&mut self, _finish: &SinkFinish) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<'a, S: Sink> Sink for &'a mut S {
    type Error = S::Error;

    #[inline]
    fn begin(&mut self) -> Result<bool, S::Error> {
        (**self).begin()
    }

    #[inline]
    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, S::Error> {
        (**self).matched(mat)
    }

    #[inline]
    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, S::Error> {
        (**self).context(ctx)
    }

    #[inline]
    fn context_break(&mut self) -> Result<bool, S::Error> {
        (**self).context_break()
    }

    #[inline]
    fn finish(&mut self, finish: &SinkFinish) -> Result<(), S::Error> {
        (**self).finish(finish)
    }
}
