/*!
Движки регулярных выражений: базовый (`grep`) и расширенный (`egrep`).

Оба работают поверх одного и того же мета-движка `regex-automata`;
различие — только в предварительной обработке синтаксиса. Режим Unicode
выключен: как и grep в локали C, движок оперирует байтами, а сворачивание
регистра для `-i` — только ASCII.
*/

use regex_automata::{Input, meta, util::syntax};

use crate::{
    Error, Match, Matcher, find_word_bounded,
    registry::Options,
    syntax::{basic_to_modern, join_alternates, pattern_str, split_keys},
};

/// Матчер поверх скомпилированной альтернации всех шаблонов.
#[derive(Debug)]
pub(crate) struct RegexEngine {
    re: meta::Regex,
    word: bool,
}

impl RegexEngine {
    /// Скомпилировать набор ключей как базовые регулярные выражения.
    pub(crate) fn basic(
        keys: &[u8],
        opts: &Options,
    ) -> Result<RegexEngine, Error> {
        let mut branches = Vec::new();
        for key in split_keys(keys) {
            branches.push(basic_to_modern(pattern_str(key)?));
        }
        RegexEngine::compile(&branches, opts)
    }

    /// Скомпилировать набор ключей как расширенные регулярные выражения.
    pub(crate) fn extended(
        keys: &[u8],
        opts: &Options,
    ) -> Result<RegexEngine, Error> {
        let mut branches = Vec::new();
        for key in split_keys(keys) {
            branches.push(pattern_str(key)?.to_string());
        }
        RegexEngine::compile(&branches, opts)
    }

    fn compile(
        branches: &[String],
        opts: &Options,
    ) -> Result<RegexEngine, Error> {
        let mut pattern = join_alternates(branches);
        // Ограничение целой строки выражается якорями на этапе компиляции:
        // так движок сам доводит совпадение до конца строки и более длинная
        // альтернатива не теряется. Ограничение слова так выразить нельзя,
        // не захватив соседний байт, поэтому оно проверяется после поиска.
        if opts.line {
            pattern = format!("^(?:{})$", pattern);
        }
        let re = meta::Regex::builder()
            .configure(meta::Regex::config().utf8_empty(false))
            .syntax(
                syntax::Config::new()
                    .case_insensitive(opts.case_insensitive)
                    .multi_line(true)
                    .unicode(false)
                    .utf8(false)
                    .line_terminator(opts.eol_byte),
            )
            .build(&pattern)
            .map_err(|err| Error::new(err.to_string()))?;
        let word = opts.word && !opts.line;
        Ok(RegexEngine { re, word })
    }

    #[inline]
    fn search(&self, haystack: &[u8], at: usize) -> Option<Match> {
        self.re
            .find(Input::new(haystack).range(at..))
            .map(|m| Match::new(m.start(), m.end()))
    }
}

impl Matcher for RegexEngine {
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match> {
        if self.word {
            find_word_bounded(haystack, at, |hay, at| self.search(hay, at))
        } else {
            self.search(haystack, at)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Options {
        Options::default()
    }

    fn find(engine: &RegexEngine, hay: &[u8]) -> Option<(usize, usize)> {
        engine.find(hay).map(|m| (m.start(), m.end()))
    }

    #[test]
    fn extended_simple() {
        let e = RegexEngine::extended(b"b(ar|az)", &opts()).unwrap();
        assert_eq!(find(&e, b"foo bar\n"), Some((4, 7)));
        assert_eq!(find(&e, b"baz\n"), Some((0, 3)));
        assert_eq!(find(&e, b"quux\n"), None);
    }

    #[test]
    fn basic_groups_are_literal() {
        let e = RegexEngine::basic(b"a(b)", &opts()).unwrap();
        assert_eq!(find(&e, b"xa(b)y\n"), Some((1, 5)));
        assert_eq!(find(&e, b"ab\n"), None);

        let e = RegexEngine::basic(br"\(ab\)\+", &opts()).unwrap();
        assert_eq!(find(&e, b"abab\n"), Some((0, 4)));
    }

    #[test]
    fn alternates_from_key_lines() {
        let e = RegexEngine::extended(b"foo\nbar", &opts()).unwrap();
        assert_eq!(find(&e, b"a bar b\n"), Some((2, 5)));
        assert_eq!(find(&e, b"a foo b\n"), Some((2, 5)));
    }

    #[test]
    fn case_insensitive() {
        let mut o = opts();
        o.case_insensitive = true;
        let e = RegexEngine::extended(b"foo", &o).unwrap();
        assert_eq!(find(&e, b"FOO\n"), Some((0, 3)));
        assert_eq!(find(&e, b"FoO\n"), Some((0, 3)));
    }

    #[test]
    fn word_constraint() {
        let mut o = opts();
        o.word = true;
        let e = RegexEngine::extended(b"foo", &o).unwrap();
        assert_eq!(find(&e, b"a foo b\n"), Some((2, 5)));
        assert_eq!(find(&e, b"foobar\n"), None);
        assert_eq!(find(&e, b"barfoo\n"), None);
        assert_eq!(find(&e, b"foo-bar\n"), Some((0, 3)));
    }

    #[test]
    fn line_constraint() {
        let mut o = opts();
        o.line = true;
        let e = RegexEngine::extended(b"foo", &o).unwrap();
        assert_eq!(find(&e, b"foo\nbar\n"), Some((0, 3)));
        assert_eq!(find(&e, b"xfoo\nfoo\n"), Some((5, 8)));
        assert_eq!(find(&e, b"foox\n"), None);
    }

    #[test]
    fn line_constraint_prefers_longer_alternate() {
        let mut o = opts();
        o.line = true;
        let e = RegexEngine::extended(b"foo\nfoofoo", &o).unwrap();
        assert_eq!(find(&e, b"foofoo\n"), Some((0, 6)));
    }

    #[test]
    fn empty_pattern_matches_everywhere() {
        let e = RegexEngine::extended(b"", &opts()).unwrap();
        assert_eq!(find(&e, b"abc\n"), Some((0, 0)));
        assert_eq!(find(&e, b""), Some((0, 0)));
    }

    #[test]
    fn anchors_respect_null_data_terminator() {
        let mut o = opts();
        o.line = true;
        o.eol_byte = b'\x00';
        let e = RegexEngine::extended(b"y", &o).unwrap();
        assert_eq!(find(&e, b"x\x00y\x00z\x00"), Some((2, 3)));
    }

    #[test]
    fn non_utf8_haystack() {
        let e = RegexEngine::extended(b"b.d", &opts()).unwrap();
        assert_eq!(find(&e, b"a b\xFFd c\n"), Some((2, 5)));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(RegexEngine::extended(b"a(b", &opts()).is_err());
        assert!(RegexEngine::extended(b"\xFF", &opts()).is_err());
    }
}
