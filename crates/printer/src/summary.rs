use std::io::{self, Write};

use ggrep_searcher::{Sink, SinkFinish, SinkMatch};

use crate::{counter::CounterWriter, util::Decimal};

/// Вид сводного вывода.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SummaryKind {
    /// После каждого входа печатать количество совпавших строк
    /// (`[ИМЯ<разделитель>]ЧИСЛО`).
    Count,
    /// Печатать имя входа, если в нём нашлось хотя бы одно совпадение.
    PathWithMatch,
    /// Печатать имя входа, если совпадений в нём не нашлось.
    PathWithoutMatch,
    /// Не печатать ничего; важен только факт совпадения.
    Quiet,
}

/// Конфигурация для сводного принтера.
#[derive(Clone, Debug)]
struct Config {
    kind: SummaryKind,
    null_filename: bool,
}

/// Конструктор для сводного принтера.
#[derive(Clone, Debug)]
pub struct SummaryBuilder {
    config: Config,
}

impl SummaryBuilder {
    /// Создать новый конструктор для указанного вида сводки.
    pub fn new(kind: SummaryKind) -> SummaryBuilder {
        SummaryBuilder { config: Config { kind, null_filename: false } }
    }

    /// Создать принтер, пишущий в указанный записыватель.
    pub fn build<W: Write>(&self, wtr: W) -> Summary<W> {
        Summary { config: self.config.clone(), wtr: CounterWriter::new(wtr) }
    }

    /// Завершать ли имя входа байтом NUL вместо обычного разделителя.
    ///
    /// В списках файлов NUL замещает перевод строки целиком.
    pub fn null_filename(&mut self, yes: bool) -> &mut SummaryBuilder {
        self.config.null_filename = yes;
        self
    }
}

/// Сводный принтер: счётчики и списки файлов.
#[derive(Clone, Debug)]
pub struct Summary<W> {
    config: Config,
    wtr: CounterWriter<W>,
}

impl<W: Write> Summary<W> {
    /// Создать `Sink` для сканирования одного входа с указанным именем.
    ///
    /// `show_path` управляет печатью имени перед счётчиком и решается на
    /// каждый вход отдельно; списки файлов печатают имя всегда.
    pub fn sink<'p, 's>(
        &'s mut self,
        label: &'p [u8],
        show_path: bool,
    ) -> SummarySink<'p, 's, W> {
        SummarySink { summary: self, label, show_path, match_count: 0 }
    }

    /// Был ли какой-либо вывод за время жизни принтера.
    pub fn has_written(&self) -> bool {
        self.wtr.count() > 0
    }

    /// Вернуть ссылку на нижележащий записыватель.
    pub fn get_mut(&mut self) -> &mut W {
        self.wtr.get_mut()
    }

    /// Потребить принтер и вернуть нижележащий записыватель.
    pub fn into_inner(self) -> W {
        self.wtr.into_inner()
    }
}

/// Реализация `Sink` для сводного принтера, привязанная к одному входу.
#[derive(Debug)]
pub struct SummarySink<'p, 's, W> {
    summary: &'s mut Summary<W>,
    label: &'p [u8],
    show_path: bool,
    match_count: u64,
}

impl<'p, 's, W: Write> SummarySink<'p, 's, W> {
    /// Возвращает true, если этому sink была сообщена хотя бы одна строка.
    pub fn has_match(&self) -> bool {
        self.match_count > 0
    }

    /// Напечатать имя входа с указанным завершителем.
    fn write_label(&mut self, terminator: u8) -> io::Result<()> {
        self.summary.wtr.write_all(self.label)?;
        self.summary.wtr.write_all(&[terminator])?;
        Ok(())
    }
}

impl<'p, 's, W: Write> Sink for SummarySink<'p, 's, W> {
    type Error = io::Error;

    fn matched(&mut self, _mat: &SinkMatch<'_>) -> Result<bool, io::Error> {
        self.match_count += 1;
        Ok(true)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), io::Error> {
        // Подсчёт ведёт сканер: при подавленном выводе (двоичный вход)
        // собственные вызовы matched не видят всех строк.
        self.match_count = finish.match_count();
        let null = self.summary.config.null_filename;
        match self.summary.config.kind {
            SummaryKind::Count => {
                if self.show_path {
                    self.write_label(if null { b'\0' } else { b':' })?;
                }
                self.summary
                    .wtr
                    .write_all(Decimal::new(finish.match_count()).as_bytes())?;
                self.summary.wtr.write_all(b"\n")?;
            }
            SummaryKind::PathWithMatch => {
                if finish.match_count() > 0 {
                    self.write_label(if null { b'\0' } else { b'\n' })?;
                }
            }
            SummaryKind::PathWithoutMatch => {
                if finish.match_count() == 0 {
                    self.write_label(if null { b'\0' } else { b'\n' })?;
                }
            }
            SummaryKind::Quiet => {}
        }
        Ok(())
    }
}
