/*!
Вспомогательные типы для тестов сканера.
*/

use regex_automata::{Input, meta::Regex, util::syntax};

use ggrep_matcher::{Match, Matcher};

use crate::sink::{Sink, SinkContext, SinkFinish, SinkMatch};

/// Простой матчер поверх `regex-automata` для тестов.
///
/// Боевые движки живут в крейте `ggrep-matcher`; здесь достаточно прямого
/// побайтового поиска без ограничений слова и строки.
#[derive(Debug)]
pub(crate) struct RegexMatcher {
    re: Regex,
}

impl RegexMatcher {
    pub(crate) fn new(pattern: &str) -> RegexMatcher {
        let re = Regex::builder()
            .configure(Regex::config().utf8_empty(false))
            .syntax(
                syntax::Config::new()
                    .multi_line(true)
                    .unicode(false)
                    .utf8(false),
            )
            .build(pattern)
            .unwrap();
        RegexMatcher { re }
    }
}

impl Matcher for RegexMatcher {
    fn find_at(&self, haystack: &[u8], at: usize) -> Option<Match> {
        self.re
            .find(Input::new(haystack).range(at..))
            .map(|m| Match::new(m.start(), m.end()))
    }
}

/// Накопитель всего, что сканер отдаёт потребителю.
///
/// Совпавшие строки записываются как `[номер:]смещение:байты`, контекстные —
/// с разделителем `-`, разрыв групп — строкой `--`. Итог дописывается в
/// конце, чтобы тесты могли проверить и его.
#[derive(Debug)]
pub(crate) struct KitchenSink(Vec<u8>);

impl KitchenSink {
    pub(crate) fn new() -> KitchenSink {
        KitchenSink(vec![])
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Sink for KitchenSink {
    type Error = std::io::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        use std::io::Write;

        if let Some(line_number) = mat.line_number() {
            write!(self.0, "{}:", line_number)?;
        }
        write!(self.0, "{}:", mat.absolute_byte_offset())?;
        self.0.extend_from_slice(mat.bytes());
        Ok(true)
    }

    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, Self::Error> {
        use std::io::Write;

        if let Some(line_number) = ctx.line_number() {
            write!(self.0, "{}-", line_number)?;
        }
        write!(self.0, "{}-", ctx.absolute_byte_offset())?;
        self.0.extend_from_slice(ctx.bytes());
        Ok(true)
    }

    fn context_break(&mut self) -> Result<bool, Self::Error> {
        // Как и настоящий принтер: не раньше первого фактического вывода.
        if !self.0.is_empty() {
            self.0.extend_from_slice(b"--\n");
        }
        Ok(true)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), Self::Error> {
        use std::io::Write;

        write!(self.0, "byte count:{}\n", finish.byte_count())?;
        write!(self.0, "match count:{}\n", finish.match_count())?;
        if finish.binary() {
            write!(self.0, "binary\n")?;
        }
        Ok(())
    }
}
