use bstr::ByteSlice;

use ggrep_matcher::{Match, Matcher};

use crate::{
    lines,
    page_buffer::PageBuffer,
    scanner::{BinaryKind, Config, ScanReport},
    sink::{Sink, SinkContext, SinkContextKind, SinkFinish, SinkMatch},
};

/// Что делать с циклом сканирования после обработки окна.
pub(crate) enum Step {
    /// Данных больше нет: окно состоит из одного сохранённого хвоста.
    Eof,
    /// Досрочный выход: квота и хвост контекста исчерпаны, либо найден
    /// первый результат в режиме остановки на совпадении.
    Stop,
    /// Дозаполнить буфер, сохранив указанное количество байтов хвоста.
    Refill { save: usize },
}

/// Ядро сканирования одного входа.
///
/// Держит всё состояние построчного учёта: абсолютное смещение начала
/// окна, ленивый счётчик номеров строк, остаток квоты, долг завершающего
/// контекста и конец последнего вывода для решения о разделителе групп.
/// Координаты хранятся относительно текущего окна и пересчитываются при
/// каждом дозаполнении.
#[derive(Debug)]
pub(crate) struct Core<'s, M, S> {
    config: &'s Config,
    matcher: M,
    sink: S,
    /// Сколько байтов хвоста было сохранено последним дозаполнением.
    save: usize,
    /// Длина незавершённой последней строки текущего окна.
    residue: usize,
    /// Абсолютное смещение первого байта окна.
    total_before_window: u64,
    /// Позиция, до которой терминаторы уже подсчитаны.
    lastnl: usize,
    /// Количество терминаторов до `lastnl`.
    line_no: u64,
    /// Остаток квоты выводимых строк.
    outleft: u64,
    /// Долг строк завершающего контекста.
    pending: usize,
    /// Конец последнего вывода в координатах окна; `None`, когда вывода не
    /// было или он несмежен с предстоящим.
    last_emitted_end: Option<usize>,
    /// Абсолютное смещение за строкой, исчерпавшей квоту.
    after_last_match: u64,
    /// Всего сообщённых (или подсчитанных при подавлении) строк.
    count: u64,
    /// Вход классифицирован как двоичный.
    binary: bool,
    /// Подавить построчный вывод, продолжая подсчёт.
    suppress: bool,
    /// Остановиться после первой сообщённой строки.
    stop_on_match: bool,
}

impl<'s, M: Matcher, S: Sink> Core<'s, M, S> {
    pub(crate) fn new(config: &'s Config, matcher: M, sink: S) -> Core<'s, M, S> {
        Core {
            config,
            matcher,
            sink,
            save: 0,
            residue: 0,
            total_before_window: 0,
            lastnl: 0,
            line_no: 0,
            outleft: config.max_count.unwrap_or(u64::MAX),
            pending: 0,
            last_emitted_end: None,
            after_last_match: 0,
            count: 0,
            binary: false,
            suppress: false,
            stop_on_match: config.stop_on_first_match,
        }
    }

    pub(crate) fn begin(&mut self) -> Result<bool, S::Error> {
        self.sink.begin()
    }

    /// Классифицировать первое окно входа.
    ///
    /// Возвращает true, когда вход двоичный и политика предписывает
    /// пропустить его целиком.
    pub(crate) fn classify(&mut self, buf: &[u8]) -> bool {
        let kind = self.config.binary.0;
        if kind == BinaryKind::None {
            return false;
        }
        let probe =
            if self.config.eol_byte != b'\0' { b'\0' } else { b'\x80' };
        if memchr::memchr(probe, buf).is_none() {
            return false;
        }
        self.binary = true;
        match kind {
            BinaryKind::WithoutMatch => true,
            _ => {
                // Вывод подавляется, но подсчёт продолжается: файл будет
                // описан одной итоговой строкой, и для неё достаточно
                // первого совпадения.
                self.suppress = true;
                self.stop_on_match = true;
                false
            }
        }
    }

    pub(crate) fn has_residue(&self) -> bool {
        self.residue > 0
    }

    /// Обработать текущее окно буфера.
    pub(crate) fn scan_window(
        &mut self,
        buf: &[u8],
    ) -> Result<Step, S::Error> {
        self.lastnl = 0;
        if self.last_emitted_end.is_some() {
            // Предыдущий вывод закончился ровно на границе сохранённого
            // хвоста, который теперь лежит в начале окна.
            self.last_emitted_end = Some(0);
        }
        if buf.len() == self.save {
            return Ok(Step::Eof);
        }
        let eol = self.config.eol_byte;
        let scan_begin = self.save - self.residue;
        let scan_end = match buf[scan_begin..].rfind_byte(eol) {
            None => scan_begin,
            Some(i) => scan_begin + i + 1,
        };
        self.residue = buf.len() - scan_end;

        if scan_begin < scan_end {
            if self.outleft > 0 {
                if !self.grepbuf(buf, scan_begin, scan_end)? {
                    return Ok(Step::Stop);
                }
            }
            if self.pending > 0 {
                if !self.drain_pending(buf, scan_end)? {
                    return Ok(Step::Stop);
                }
            }
            if (self.outleft == 0 && self.pending == 0)
                || (self.count > 0
                    && self.stop_on_match
                    && !self.config.invert_match)
            {
                return Ok(Step::Stop);
            }
        }

        // Последние before_context строк перед scan_end понадобятся как
        // опережающий контекст, если совпадение найдётся в начале новых
        // данных; уже выведенные строки заново не резервируются.
        let floor = self.last_emitted_end.unwrap_or(0);
        let reserved = match self.config.before_context {
            0 => scan_end,
            n => lines::preceding(buf, scan_end, floor, eol, n - 1),
        };
        if self.last_emitted_end != Some(reserved) {
            // Резерв несмежен с последним выводом: перед следующей группой
            // потребуется разделитель.
            self.last_emitted_end = None;
        }
        self.count_lines_upto(buf, reserved);
        let save = self.residue + (scan_end - reserved);
        self.total_before_window += (buf.len() - save) as u64;
        self.save = save;
        Ok(Step::Refill { save })
    }

    /// Досканировать синтетически завершённый остаток.
    ///
    /// Вызывается после конца файла, когда у последней строки не было
    /// терминатора: буфер уже дописал сентинел, и окно стало на байт
    /// длиннее.
    pub(crate) fn scan_residue(
        &mut self,
        buf: &[u8],
    ) -> Result<(), S::Error> {
        let beg = self.save - self.residue;
        if self.outleft > 0 {
            if !self.grepbuf(buf, beg, buf.len())? {
                return Ok(());
            }
        }
        if self.pending > 0 {
            self.drain_pending(buf, buf.len())?;
        }
        Ok(())
    }

    pub(crate) fn finish(
        &mut self,
        buffer: &PageBuffer,
    ) -> Result<(), S::Error> {
        self.sink.finish(&SinkFinish {
            byte_count: buffer.bytes_consumed(),
            match_count: self.count,
            binary: self.binary,
        })
    }

    pub(crate) fn into_report(
        self,
        buffer: &PageBuffer,
        error: Option<std::io::Error>,
    ) -> ScanReport {
        ScanReport {
            matched_lines: self.count,
            hit_limit: self.outleft == 0,
            after_last_match: self.after_last_match,
            file_offset: buffer.file_offset(),
            mmap_active: buffer.mmap_active(),
            is_regular: buffer.is_regular(),
            binary: self.binary,
            error,
        }
    }

    /// Просканировать область завершённых строк `[beg, lim)`.
    ///
    /// Возвращает false, если потребитель попросил остановиться. Выход по
    /// квоте или первому совпадению различается снаружи по `outleft` и
    /// `count`.
    fn grepbuf(
        &mut self,
        buf: &[u8],
        beg: usize,
        lim: usize,
    ) -> Result<bool, S::Error> {
        let eol = self.config.eol_byte;
        let hay = &buf[..lim];
        let mut pos = beg;
        loop {
            let m = match self.matcher.find_at(hay, pos) {
                None => break,
                Some(m) => m,
            };
            // Совпадение на синтетическом терминаторе не считается.
            if m.start() == lim {
                break;
            }
            let line = line_bounds(hay, eol, m);
            if !self.config.invert_match {
                if !self.emit_text(buf, line.start(), line.end(), false)? {
                    return Ok(false);
                }
                self.count += 1;
                self.outleft -= 1;
                if self.outleft == 0 || self.stop_on_match {
                    self.after_last_match =
                        self.total_before_window + line.end() as u64;
                    return Ok(true);
                }
            } else if pos < line.start() {
                if !self.emit_text(buf, pos, line.start(), true)? {
                    return Ok(false);
                }
                if self.outleft == 0 {
                    return Ok(true);
                }
            }
            pos = line.end();
        }
        if self.config.invert_match && pos < lim {
            if !self.emit_text(buf, pos, lim, true)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Вывести строки `[beg, lim)` вместе с причитающимся контекстом.
    ///
    /// При `counted` область — это серия несовпавших строк инвертированного
    /// поиска: каждая строка сообщается отдельно и списывается с квоты.
    /// Иначе область — одна совпавшая строка, и учёт ведёт вызывающий.
    fn emit_text(
        &mut self,
        buf: &[u8],
        beg: usize,
        lim: usize,
        counted: bool,
    ) -> Result<bool, S::Error> {
        let eol = self.config.eol_byte;
        if !self.suppress && self.pending > 0 {
            if !self.drain_pending(buf, beg)? {
                return Ok(false);
            }
        }

        if !self.suppress {
            let floor = self.last_emitted_end.unwrap_or(0);
            let context_begin = match self.config.before_context {
                0 => beg,
                n => lines::preceding(buf, beg, floor, eol, n - 1),
            };
            // Разделитель печатается, только если вывод несмежен с
            // предыдущим; был ли вывод вообще — помнит потребитель.
            if (self.config.before_context > 0
                || self.config.after_context > 0)
                && self.last_emitted_end != Some(context_begin)
            {
                if !self.sink.context_break()? {
                    return Ok(false);
                }
            }
            let mut p = context_begin;
            while p < beg {
                let nl =
                    buf[p..beg].find_byte(eol).map_or(beg, |i| p + i + 1);
                let line = Match::new(p, nl);
                if !self.emit_context(buf, line, SinkContextKind::Before)? {
                    return Ok(false);
                }
                p = nl;
            }
        }

        if counted {
            let mut p = beg;
            let mut n = 0u64;
            while p < lim && n < self.outleft {
                let nl =
                    buf[p..lim].find_byte(eol).map_or(lim, |i| p + i + 1);
                if !self.suppress {
                    if !self.emit_match(buf, Match::new(p, nl))? {
                        return Ok(false);
                    }
                }
                p = nl;
                n += 1;
            }
            self.count += n;
            self.outleft -= n;
            self.after_last_match = self.total_before_window + p as u64;
        } else if !self.suppress {
            if !self.emit_match(buf, Match::new(beg, lim))? {
                return Ok(false);
            }
        }

        self.pending =
            if self.suppress { 0 } else { self.config.after_context };
        Ok(true)
    }

    /// Выдать долг завершающего контекста до позиции `upto`.
    ///
    /// Когда квота исчерпана, хвост заканчивается на следующей строке,
    /// которая сама была бы сообщена: для этого каждая строка долга заново
    /// проверяется матчером.
    fn drain_pending(
        &mut self,
        buf: &[u8],
        upto: usize,
    ) -> Result<bool, S::Error> {
        if self.last_emitted_end.is_none() {
            self.last_emitted_end = Some(0);
        }
        let eol = self.config.eol_byte;
        while self.pending > 0 {
            let start = self.last_emitted_end.unwrap();
            if start >= upto {
                break;
            }
            let nl =
                buf[start..upto].find_byte(eol).map_or(upto, |i| start + i + 1);
            self.pending -= 1;
            let keep = self.outleft > 0 || {
                let body_end = if nl > start && buf[nl - 1] == eol {
                    nl - 1
                } else {
                    nl
                };
                let is_match =
                    self.matcher.find(&buf[start..body_end]).is_some();
                is_match == self.config.invert_match
            };
            if !keep {
                self.pending = 0;
                break;
            }
            let line = Match::new(start, nl);
            if !self.emit_context(buf, line, SinkContextKind::After)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn emit_match(&mut self, buf: &[u8], line: Match) -> Result<bool, S::Error> {
        let (absolute_byte_offset, line_number) =
            self.line_accounting(buf, line);
        let keepgoing = self.sink.matched(&SinkMatch {
            bytes: &buf[line],
            absolute_byte_offset,
            line_number,
        })?;
        self.last_emitted_end = Some(line.end());
        Ok(keepgoing)
    }

    fn emit_context(
        &mut self,
        buf: &[u8],
        line: Match,
        kind: SinkContextKind,
    ) -> Result<bool, S::Error> {
        let (absolute_byte_offset, line_number) =
            self.line_accounting(buf, line);
        let keepgoing = self.sink.context(&SinkContext {
            bytes: &buf[line],
            kind,
            absolute_byte_offset,
            line_number,
        })?;
        self.last_emitted_end = Some(line.end());
        Ok(keepgoing)
    }

    fn line_accounting(
        &mut self,
        buf: &[u8],
        line: Match,
    ) -> (u64, Option<u64>) {
        self.count_lines_upto(buf, line.start());
        let line_number = if self.config.line_number {
            self.line_no += 1;
            self.lastnl = line.end();
            Some(self.line_no)
        } else {
            None
        };
        (self.total_before_window + line.start() as u64, line_number)
    }

    fn count_lines_upto(&mut self, buf: &[u8], upto: usize) {
        if !self.config.line_number || self.lastnl >= upto {
            return;
        }
        self.line_no +=
            lines::count(&buf[self.lastnl..upto], self.config.eol_byte);
        self.lastnl = upto;
    }
}

/// Расширить диапазон совпадения до границ содержащей его строки.
///
/// Начало — сразу за ближайшим терминатором слева (или начало буфера);
/// конец продлевается до терминатора включительно, если совпадение им ещё
/// не заканчивается. По контракту движка совпадение не пересекает строк,
/// так что оба поиска остаются в пределах одной строки.
fn line_bounds(hay: &[u8], eol: u8, m: Match) -> Match {
    let start = match hay[..m.start()].rfind_byte(eol) {
        None => 0,
        Some(i) => i + 1,
    };
    let mut end = m.end();
    if end == start || hay[end - 1] != eol {
        end = match hay[end..].find_byte(eol) {
            None => hay.len(),
            Some(i) => end + i + 1,
        };
    }
    Match::new(start, end)
}
