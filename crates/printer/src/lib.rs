/*!
Этот крейт предоставляет принтеры, которые взаимодействуют с крейтом
`ggrep-searcher` и воспроизводят форматы вывода классического grep.

# Краткий обзор

Принтер [`Standard`] показывает совпавшие и контекстные строки: перед
строкой при необходимости печатаются имя входа, номер строки и смещение
байта, разделённые `:` для совпадений и `-` для контекста; несмежные
группы вывода разделяются строкой `--`. Совпавший двоичный вход
описывается одной строкой `Binary file NAME matches`.

Принтер [`Summary`] показывает агрегированный итог входа: количество
совпавших строк (`-c`), имя файла со совпадением или без него
(`-l`/`-L`) либо ничего (`-q`).

Оба принтера создаются один раз на процесс и выдают по [`Sink`] на каждый
вход через свой метод `sink`.

[`Sink`]: ggrep_searcher::Sink
*/

#![deny(missing_docs)]

pub use crate::{
    standard::{Standard, StandardBuilder, StandardSink},
    summary::{Summary, SummaryBuilder, SummaryKind, SummarySink},
    util::path_bytes,
};

mod counter;
mod standard;
mod summary;
mod util;
