/*!
Набор процедур для выполнения операций над строками.
*/

use bstr::ByteSlice;

use ggrep_matcher::Match;

/// Явный итератор по строкам в конкретном срезе байтов.
///
/// Этот итератор не заимствует сами байты: вызывающие явно предоставляют
/// срез при каждом продвижении. Терминаторы строк считаются частью строки,
/// которую они завершают; все выдаваемые диапазоны непусты.
#[derive(Debug)]
pub struct LineStep {
    line_term: u8,
    pos: usize,
    end: usize,
}

impl LineStep {
    /// Создать новый итератор строк по указанному диапазону байтов с
    /// использованием указанного терминатора строки.
    ///
    /// Вызывающие должны предоставлять точно один и тот же срез байтов для
    /// каждого вызова `next`.
    pub fn new(line_term: u8, start: usize, end: usize) -> LineStep {
        assert!(start <= end);
        LineStep { line_term, pos: start, end }
    }

    /// Вернуть границы следующей строки в указанных байтах.
    ///
    /// Возвращаемый диапазон включает терминатор строки, если он есть.
    #[inline(always)]
    pub fn next(&mut self, bytes: &[u8]) -> Option<Match> {
        let bytes = &bytes[..self.end];
        match bytes[self.pos..].find_byte(self.line_term) {
            None => {
                if self.pos < bytes.len() {
                    let m = Match::new(self.pos, bytes.len());
                    self.pos = m.end();
                    Some(m)
                } else {
                    None
                }
            }
            Some(line_end) => {
                let m = Match::new(self.pos, self.pos + line_end + 1);
                self.pos = m.end();
                Some(m)
            }
        }
    }
}

/// Подсчитать количество вхождений `line_term` в `bytes`.
pub(crate) fn count(bytes: &[u8], line_term: u8) -> u64 {
    memchr::memchr_iter(line_term, bytes).count() as u64
}

/// Возвращает минимальное начальное смещение строки, которая находится на
/// `count` строк перед строкой, содержащей `pos`, но не раньше `floor`.
///
/// Если `count` равен нулю, возвращается начало строки, содержащей `pos`.
/// Если `pos` указывает сразу за терминатором строки, терминатор считается
/// частью завершённой им строки. `floor` ограничивает откат: уже выведенные
/// строки не попадают в резерв опережающего контекста.
pub(crate) fn preceding(
    bytes: &[u8],
    mut pos: usize,
    floor: usize,
    line_term: u8,
    mut count: usize,
) -> usize {
    if pos <= floor {
        return floor;
    }
    if bytes[pos - 1] == line_term {
        pos -= 1;
    }
    loop {
        match bytes[floor..pos].rfind_byte(line_term) {
            None => return floor,
            Some(i) => {
                let i = floor + i;
                if count == 0 {
                    return i + 1;
                } else if i == floor {
                    return floor;
                }
                count -= 1;
                pos = i;
            }
        }
    }
}
