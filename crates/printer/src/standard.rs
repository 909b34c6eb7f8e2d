use std::io::{self, Write};

use ggrep_searcher::{
    Sink, SinkContext, SinkFinish, SinkMatch,
};

use crate::{counter::CounterWriter, util::Decimal};

/// Конфигурация для стандартного принтера.
///
/// Управляется через [`StandardBuilder`] и замораживается после создания
/// принтера.
#[derive(Clone, Debug)]
struct Config {
    /// Заменять ли разделитель после имени на NUL (`-Z`).
    null_filename: bool,
    /// Печатать ли абсолютное смещение байта начала строки.
    byte_offset: bool,
    /// Запрошен ли хоть какой-то контекст.
    ///
    /// Разделитель групп `--` существует только когда контекст запрошен;
    /// сканер сообщает о разрывах, а это поле страхует от лишнего вывода
    /// при пустой конфигурации.
    any_context: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            null_filename: false,
            byte_offset: false,
            any_context: false,
        }
    }
}

/// Конструктор для стандартного принтера.
#[derive(Clone, Debug, Default)]
pub struct StandardBuilder {
    config: Config,
}

impl StandardBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию.
    pub fn new() -> StandardBuilder {
        StandardBuilder { config: Config::default() }
    }

    /// Создать принтер, пишущий в указанный записыватель.
    pub fn build<W: Write>(&self, wtr: W) -> Standard<W> {
        Standard {
            config: self.config.clone(),
            wtr: CounterWriter::new(wtr),
        }
    }

    /// Завершать ли имя входа байтом NUL вместо обычного разделителя.
    pub fn null_filename(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.null_filename = yes;
        self
    }

    /// Печатать ли смещение байта начала каждой строки.
    pub fn byte_offset(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.byte_offset = yes;
        self
    }

    /// Сообщить принтеру, что запрошен контекст.
    ///
    /// Включает печать разделителя `--` между несмежными группами вывода.
    pub fn any_context(&mut self, yes: bool) -> &mut StandardBuilder {
        self.config.any_context = yes;
        self
    }
}

/// Стандартный принтер: построчный вывод в формате классического grep.
///
/// Живёт столько же, сколько процесс, и обслуживает все входы по очереди:
/// счётчик записанных байтов заодно помнит, был ли уже какой-то вывод,
/// и эта память (для разделителя групп) намеренно не сбрасывается между
/// входами.
#[derive(Clone, Debug)]
pub struct Standard<W> {
    config: Config,
    wtr: CounterWriter<W>,
}

impl<W: Write> Standard<W> {
    /// Создать принтер с конфигурацией по умолчанию.
    pub fn new(wtr: W) -> Standard<W> {
        StandardBuilder::new().build(wtr)
    }

    /// Создать `Sink` для сканирования одного входа с указанным именем.
    ///
    /// Имя — это байты, как их следует показать пользователю: путь или
    /// метка `(standard input)`. `show_path` управляет печатью имени перед
    /// каждой строкой; оно решается на каждый вход отдельно, потому что
    /// рекурсивный обход навязывает имена даже единственному аргументу.
    /// Для строки о двоичном файле имя используется в любом случае.
    pub fn sink<'p, 's>(
        &'s mut self,
        label: &'p [u8],
        show_path: bool,
    ) -> StandardSink<'p, 's, W> {
        StandardSink { standard: self, label, show_path, match_count: 0 }
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

/// Реализация `Sink` для стандартного принтера, привязанная к одному входу.
#[derive(Debug)]
pub struct StandardSink<'p, 's, W> {
    standard: &'s mut Standard<W>,
    label: &'p [u8],
    show_path: bool,
    match_count: u64,
}

impl<'p, 's, W: Write> StandardSink<'p, 's, W> {
    /// Возвращает true, если этому sink была сообщена хотя бы одна строка.
    pub fn has_match(&self) -> bool {
        self.match_count > 0
    }

    /// Количество сообщённых этому sink строк.
    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// Записать префикс строки: имя, номер строки, смещение.
    ///
    /// Роль разделителя несёт `sep`: `:` для совпадений, `-` для контекста.
    /// При `-Z` только разделитель после имени заменяется на NUL; остальные
    /// остаются как есть.
    fn write_prelude(
        &mut self,
        sep: u8,
        line_number: Option<u64>,
        absolute_byte_offset: u64,
    ) -> io::Result<()> {
        let config = &self.standard.config;
        let name_sep =
            if config.null_filename { b'\0' } else { sep };
        if self.show_path {
            self.standard.wtr.write_all(self.label)?;
            self.standard.wtr.write_all(&[name_sep])?;
        }
        if let Some(n) = line_number {
            self.standard.wtr.write_all(Decimal::new(n).as_bytes())?;
            self.standard.wtr.write_all(&[sep])?;
        }
        if config.byte_offset {
            self.standard
                .wtr
                .write_all(Decimal::new(absolute_byte_offset).as_bytes())?;
            self.standard.wtr.write_all(&[sep])?;
        }
        Ok(())
    }

    fn write_line(
        &mut self,
        sep: u8,
        bytes: &[u8],
        line_number: Option<u64>,
        absolute_byte_offset: u64,
    ) -> io::Result<()> {
        self.write_prelude(sep, line_number, absolute_byte_offset)?;
        self.standard.wtr.write_all(bytes)?;
        Ok(())
    }
}

impl<'p, 's, W: Write> Sink for StandardSink<'p, 's, W> {
    type Error = io::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, io::Error> {
        self.match_count += 1;
        self.write_line(
            b':',
            mat.bytes(),
            mat.line_number(),
            mat.absolute_byte_offset(),
        )?;
        Ok(true)
    }

    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, io::Error> {
        self.write_line(
            b'-',
            ctx.bytes(),
            ctx.line_number(),
            ctx.absolute_byte_offset(),
        )?;
        Ok(true)
    }

    fn context_break(&mut self) -> Result<bool, io::Error> {
        // Разделитель появляется только между группами: не раньше первого
        // вывода и не без запрошенного контекста.
        if self.standard.config.any_context && self.standard.has_written() {
            self.standard.wtr.write_all(b"--\n")?;
        }
        Ok(true)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), io::Error> {
        // Для двоичного входа построчный вывод был подавлен сканером;
        // совпавший файл описывается одной канонической строкой.
        if finish.binary() && finish.match_count() > 0 {
            log::debug!(
                "двоичный вход: {} совпавших строк подавлено",
                finish.match_count()
            );
            self.standard.wtr.write_all(b"Binary file ")?;
            self.standard.wtr.write_all(self.label)?;
            self.standard.wtr.write_all(b" matches\n")?;
            self.match_count = finish.match_count();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ggrep_matcher::{Options, compile};
    use ggrep_searcher::{BinaryDetection, Scanner, ScannerBuilder};

    use super::*;

    fn tmpfile(contents: &[u8]) -> std::fs::File {
        use std::io::{Seek, SeekFrom, Write};

        let mut f = tempfile::tempfile().unwrap();
        f.write_all(contents).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        f
    }

    fn run_files(
        pattern: &str,
        inputs: &[(&str, &[u8])],
        show_path: bool,
        configure_scanner: impl Fn(&mut ScannerBuilder),
        configure_printer: impl Fn(&mut StandardBuilder),
    ) -> String {
        let matcher =
            compile("egrep", pattern.as_bytes(), &Options::default())
                .unwrap();
        let mut sbuilder = ScannerBuilder::new();
        configure_scanner(&mut sbuilder);
        let mut scanner = sbuilder.build();
        let mut pbuilder = StandardBuilder::new();
        configure_printer(&mut pbuilder);
        let mut printer = pbuilder.build(vec![]);
        for (label, contents) in inputs {
            let file = tmpfile(contents);
            let mut sink = printer.sink(label.as_bytes(), show_path);
            scanner.search_file(&matcher, &file, &mut sink).unwrap();
        }
        String::from_utf8(printer.into_inner()).unwrap()
    }

    fn run(
        pattern: &str,
        contents: &[u8],
        configure_scanner: impl Fn(&mut ScannerBuilder),
        configure_printer: impl Fn(&mut StandardBuilder),
    ) -> String {
        run_files(
            pattern,
            &[("input", contents)],
            false,
            configure_scanner,
            configure_printer,
        )
    }

    #[test]
    fn matches_plain() {
        let got = run("foo", b"foo\nbar\nfoo\n", |_| (), |_| ());
        assert_eq!(got, "foo\nfoo\n");
    }

    #[test]
    fn matches_multi_file_with_names() {
        // Сценарий из двух файлов: имена печатаются перед каждой строкой.
        let got = run_files(
            "foo",
            &[("a.txt", b"foo\nbar\nfoo\n"), ("b.txt", b"baz\n")],
            true,
            |_| (),
            |_| (),
        );
        assert_eq!(got, "a.txt:foo\na.txt:foo\n");
    }

    #[test]
    fn line_numbers_and_offsets() {
        let got = run(
            "foo",
            b"bar\nfoo\n",
            |s| {
                s.line_number(true);
            },
            |p| {
                p.byte_offset(true);
            },
        );
        assert_eq!(got, "2:4:foo\n");
    }

    #[test]
    fn context_separator_bytes() {
        let input = b"1\n2\n3\nHIT\n5\n6\n7\nHIT\n9\n";
        let got = run(
            "HIT",
            input,
            |s| {
                s.before_context(1);
                s.after_context(1);
            },
            |p| {
                p.any_context(true);
            },
        );
        assert_eq!(got, "3\nHIT\n5\n--\n7\nHIT\n9\n");
    }

    #[test]
    fn context_separator_between_files() {
        // Память «был ли вывод» живёт столько же, сколько принтер, поэтому
        // между группами разных файлов разделитель тоже печатается.
        let got = run_files(
            "x",
            &[("a", b"x\ny\n"), ("b", b"x\ny\n")],
            false,
            |s| {
                s.after_context(1);
            },
            |p| {
                p.any_context(true);
            },
        );
        assert_eq!(got, "x\ny\n--\nx\ny\n");
    }

    #[test]
    fn context_lines_use_dash_separator() {
        let got = run_files(
            "HIT",
            &[("input", b"a\nHIT\nb\n")],
            true,
            |s| {
                s.before_context(1);
                s.after_context(1);
                s.line_number(true);
            },
            |p| {
                p.any_context(true);
            },
        );
        assert_eq!(got, "input-1-a\ninput:2:HIT\ninput-3-b\n");
    }

    #[test]
    fn null_filename_replaces_only_name_separator() {
        let got = run_files(
            "foo",
            &[("input", b"foo\n")],
            true,
            |s| {
                s.line_number(true);
            },
            |p| {
                p.null_filename(true);
            },
        );
        assert_eq!(got, "input\u{0}1:foo\n");
    }

    #[test]
    fn binary_file_message() {
        let got = run(
            "hello",
            b"hello\x00world\n",
            |s| {
                s.binary_detection(BinaryDetection::report());
            },
            |_| (),
        );
        assert_eq!(got, "Binary file input matches\n");
    }

    #[test]
    fn binary_file_as_text() {
        let got = run("hello", b"hello\x00world\n", |_| (), |_| ());
        assert_eq!(got, "hello\x00world\n");
    }

    #[test]
    fn binary_file_without_matches_prints_nothing() {
        let got = run(
            "quux",
            b"hello\x00world\n",
            |s| {
                s.binary_detection(BinaryDetection::report());
            },
            |_| (),
        );
        assert_eq!(got, "");
    }

    #[test]
    fn null_data_records() {
        let got = run(
            "y",
            b"x\x00y\x00z\x00",
            |s| {
                s.eol_byte(b'\x00');
            },
            |_| (),
        );
        assert_eq!(got, "y\x00");
    }

    #[test]
    fn sink_reports_match_status() {
        let matcher =
            compile("egrep", b"foo", &Options::default()).unwrap();
        let mut scanner = Scanner::new();
        let mut printer = Standard::new(vec![]);

        let file = tmpfile(b"foo\n");
        let mut sink = printer.sink(b"a", false);
        scanner.search_file(&matcher, &file, &mut sink).unwrap();
        assert!(sink.has_match());
        assert_eq!(sink.match_count(), 1);

        let file = tmpfile(b"bar\n");
        let mut sink = printer.sink(b"b", false);
        scanner.search_file(&matcher, &file, &mut sink).unwrap();
        assert!(!sink.has_match());
    }
}
