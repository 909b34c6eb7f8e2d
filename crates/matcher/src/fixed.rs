/*!
Движок фиксированных строк (`fgrep`).

Каждая строка набора ключей — это литерал; совпадение ищется автоматом
Ахо-Корасик в режиме leftmost-longest, как kwset в классическом fgrep.
В отличие от движков регулярных выражений, этот работает с произвольными
байтами в шаблонах.
*/

use aho_corasick::{AhoCorasick, Input, MatchKind};

use crate::{
    Error, Match, Matcher, find_word_bounded, registry::Options,
    syntax::split_keys,
};

/// Матчер для набора литеральных строк.
#[derive(Debug)]
pub(crate) struct FixedEngine {
    ac: AhoCorasick,
    /// Пустой литерал совпадает в любой позиции; автомат для этого не нужен.
    has_empty: bool,
    word: bool,
    line: bool,
    eol_byte: u8,
}

impl FixedEngine {
    /// Построить движок из набора ключей.
    pub(crate) fn new(
        keys: &[u8],
        opts: &Options,
    ) -> Result<FixedEngine, Error> {
        let literals = split_keys(keys);
        let has_empty = literals.iter().any(|lit| lit.is_empty());
        // Пустой литерал в автомат не попадает: он перекрывает всё сам.
        let ac = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .ascii_case_insensitive(opts.case_insensitive)
            .build(literals.iter().filter(|lit| !lit.is_empty()))
            .map_err(|err| Error::new(err.to_string()))?;
        Ok(FixedEngine {
            ac,
            has_empty,
            word: opts.word,
            line: opts.line,
            eol_byte: opts.eol_byte,
        })
    }

    #[inline]
    fn search(&self, haystack: &[u8], at: usize) -> Option<Match> {
        if at > haystack.len() {
            return None;
        }
        if self.has_empty {
            return Some(Match::zero(at));
        }
        self.ac
            .find(Input::new(haystack).range(at..))
            .map(|m| Match::new(m.start(), m.end()))
    }

    /// Поиск с ограничением целой строки.
    ///
    /// Кандидат, не начинающийся на границе строки, не может стать целой
    /// строкой, как и любой более поздний кандидат той же строки, поэтому
    /// после неудачи поиск продолжается со следующей строки.
    fn find_line(&self, haystack: &[u8], mut at: usize) -> Option<Match> {
        loop {
            let m = self.search(haystack, at)?;
            let starts_line =
                m.start() == 0 || haystack[m.start() - 1] == self.eol_byte;
            let ends_line = m.end() == haystack.len()
                || haystack[m.end()] == self.eol_byte;
            if starts_line && ends_line {
                return Some(m);
            }
            at = match memchr::memchr(
                self.eol_byte,
                &haystack[m.start()..],
            ) {
                None => return None,
                Some(i) => m.start() + i + 1,
            };
        }
    }
}

impl Matcher for FixedEngine {
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match> {
        if self.line {
            self.find_line(haystack, at)
        } else if self.word {
            find_word_bounded(haystack, at, |hay, at| self.search(hay, at))
        } else {
            self.search(haystack, at)
        }
    }
}
