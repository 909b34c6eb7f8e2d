/*!
Этот крейт предоставляет ядро потокового построчного поиска ggrep.

# Краткий обзор

Основной тип здесь — [`Scanner`], настраиваемый через [`ScannerBuilder`].
`Scanner` отвечает за чтение байтов из источника (файла или стандартного
ввода) через выровненный по страницам скользящий буфер, разбиение данных
на завершённые строки, применение `Matcher` (см. крейт `ggrep-matcher`) и
передачу результатов в [`Sink`] — например, принтер из крейта
`ggrep-printer`. Сканер также ведёт учёт абсолютных смещений и номеров
строк через дозаполнения буфера, окна опережающего и завершающего
контекста, квоту `max_count` и эвристическое обнаружение двоичных данных.

Буферизация устроена как в историческом grep: передняя область буфера
сохраняет байты, переносимые между дозаполнениями (незавершённую последнюю
строку и строки контекста), а остальное заполняется либо отображением
файла в память прямо в выровненное окно, либо обычным `read` с прозрачным
откатом. Последняя строка без терминатора завершается синтетическим байтом
конца строки, так что для потребителя все строки выглядят одинаково.

# Пример

Поиск по файлу с выводом найденных строк через собственный `Sink`:

```no_run
use ggrep_matcher::{Options, compile};
use ggrep_searcher::{Scanner, Sink, SinkMatch};

struct Collect(Vec<Vec<u8>>);

impl Sink for Collect {
    type Error = std::io::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        self.0.push(mat.bytes().to_vec());
        Ok(true)
    }
}

let matcher = compile("egrep", b"Watson", &Options::default())?;
let file = std::fs::File::open("sherlock.txt")?;
let mut sink = Collect(vec![]);
let report = Scanner::new().search_file(&matcher, &file, &mut sink)?;
assert_eq!(report.matched_lines() as usize, sink.0.len());
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

#![deny(missing_docs)]

pub use crate::{
    lines::LineStep,
    scanner::{
        BinaryDetection, ScanReport, Scanner, ScannerBuilder,
    },
    sink::{
        Sink, SinkContext, SinkContextKind, SinkError, SinkFinish, SinkMatch,
    },
};

mod lines;
mod page_buffer;
mod scanner;
mod sink;
#[cfg(test)]
mod testutil;
