/*!
Этот крейт предоставляет интерфейс низкоуровневого поиска шаблонов и реестр
движков, используемые в ggrep.

# Краткий обзор

Центральными здесь являются два типа. [`Match`] — это полуоткрытый диапазон
байтов `[start, end)`, описывающий положение совпадения в просмотренном
срезе. [`Matcher`] — трейт, через который сканер запрашивает у движка
следующее совпадение; сам сканер ничего не знает о синтаксисе шаблонов и
лишь требует, чтобы совпадение целиком лежало внутри одной строки.

Движки создаются один раз на процесс через [`compile`], которая ищет
конструктор по имени в статическом реестре. Имена соответствуют
историческим вариантам: `grep` (базовые регулярные выражения), `egrep`
(расширенные), `fgrep` (наборы фиксированных строк). Имя `default`
зарегистрировано как запасной вариант: если запрошенное имя не найдено,
используется он.
*/

#![deny(missing_docs)]

pub use crate::registry::{Options, compile};

mod fixed;
mod registry;
mod regex;
mod syntax;

/// Диапазон байтов совпадения в просмотренном срезе.
///
/// Диапазон полуоткрытый: байт по смещению `start` входит в совпадение,
/// байт по смещению `end` — уже нет. Инвариант `start <= end` проверяется
/// при создании.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Match {
    start: usize,
    end: usize,
}

impl Match {
    /// Создать новое совпадение.
    ///
    /// Вызывает панику, если `start > end`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Match {
        assert!(start <= end);
        Match { start, end }
    }

    /// Создать пустое совпадение в указанной позиции.
    #[inline]
    pub fn zero(offset: usize) -> Match {
        Match { start: offset, end: offset }
    }

    /// Начальное смещение совпадения.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Конечное смещение совпадения.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Вернуть это совпадение с новым начальным смещением.
    ///
    /// Вызывает панику, если `start > self.end()`.
    #[inline]
    pub fn with_start(&self, start: usize) -> Match {
        assert!(start <= self.end);
        Match { start, ..*self }
    }

    /// Вернуть это совпадение с новым конечным смещением.
    ///
    /// Вызывает панику, если `end < self.start()`.
    #[inline]
    pub fn with_end(&self, end: usize) -> Match {
        assert!(self.start <= end);
        Match { end, ..*self }
    }

    /// Количество байтов в этом совпадении.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Возвращает true тогда и только тогда, когда совпадение пусто.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl std::ops::Index<Match> for [u8] {
    type Output = [u8];

    #[inline]
    fn index(&self, index: Match) -> &[u8] {
        &self[index.start..index.end]
    }
}

impl std::ops::Index<Match> for Vec<u8> {
    type Output = [u8];

    #[inline]
    fn index(&self, index: Match) -> &[u8] {
        &self[index.start..index.end]
    }
}

/// Трейт, описывающий движок поиска шаблонов для сканера.
///
/// Реализации компилируются один раз на процесс (через [`compile`]) и затем
/// переиспользуются для всех входов. Они обязаны быть повторно входимыми
/// между вызовами с разными срезами, но не обязаны быть потокобезопасными.
///
/// Семантический контракт: возвращаемое совпадение целиком лежит внутри
/// одной строки просмотренного среза, а ограничения слова (`-w`), строки
/// (`-x`) и регистра (`-i`) уже учтены движком. Сканер сам расширяет
/// совпадение до границ содержащей его строки.
pub trait Matcher {
    /// Найти первое совпадение в `haystack`, начиная с позиции `at`.
    ///
    /// Возвращает `None`, когда совпадений больше нет. Совпадение с
    /// `start == haystack.len()` зарезервировано под "совпадение на
    /// сентинеле" и трактуется вызывающим кодом как отсутствие совпадения.
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match>;

    /// Найти первое совпадение в `haystack`.
    ///
    /// Это удобная обёртка над `find_at` с `at == 0`.
    #[inline]
    fn find(&self, haystack: &[u8]) -> Option<Match> {
        self.find_at(haystack, 0)
    }
}

impl<'a, M: Matcher + ?Sized> Matcher for &'a M {
    #[inline]
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match> {
        (**self).find_at(haystack, at)
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    #[inline]
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match> {
        (**self).find_at(haystack, at)
    }
}

/// Ошибка, возникающая при компиляции набора шаблонов.
///
/// Компиляция фатальна для процесса: вызывающий код печатает диагностику и
/// завершается со статусом 2. Поэтому здесь хранится только готовое
/// сообщение.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    message: String,
}

impl Error {
    pub(crate) fn new(message: impl Into<String>) -> Error {
        Error { message: message.into() }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Возвращает true тогда и только тогда, когда байт входит в слово.
///
/// Как и grep в локали C: буквы ASCII, цифры и подчёркивание.
#[inline]
pub(crate) fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Проверяет, что совпадение не продолжается словесными байтами ни слева,
/// ни справа.
#[inline]
pub(crate) fn word_bounded(haystack: &[u8], m: Match) -> bool {
    let left_ok =
        m.start() == 0 || !is_word_byte(haystack[m.start() - 1]);
    let right_ok =
        m.end() == haystack.len() || !is_word_byte(haystack[m.end()]);
    left_ok && right_ok
}

/// Найти совпадение, удовлетворяющее ограничению целого слова.
///
/// Кандидаты запрашиваются через `search`; не прошедший проверку границ
/// кандидат отбрасывается, и поиск повторяется со следующей позиции. Это
/// та же петля перепроверки, что и в историческом grep: она может
/// пропустить более длинную альтернативу с тем же началом, но для
/// практических шаблонов этого достаточно.
pub(crate) fn find_word_bounded(
    haystack: &[u8],
    mut at: usize,
    search: impl Fn(&[u8], usize) -> Option<Match>,
) -> Option<Match> {
    while at <= haystack.len() {
        let m = search(haystack, at)?;
        if word_bounded(haystack, m) {
            return Some(m);
        }
        at = m.start() + 1;
    }
    None
}
