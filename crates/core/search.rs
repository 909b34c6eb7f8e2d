/*!
Драйвер поиска: открытие входов, выбор принтера, обработка ошибок на
файл и восстановление позиции стандартного ввода.
*/

use std::{
    fs::File,
    io::{self, IsTerminal, Seek, Write},
    mem::ManuallyDrop,
    path::Path,
};

use ggrep_matcher::Matcher;
use ggrep_printer::{Standard, Summary, path_bytes};
use ggrep_searcher::{ScanReport, Scanner};

use crate::{
    flags::{DirMode, HiArgs, OutMode},
    walk::{self, Ancestry},
};

/// Возможно буферизированный записыватель в стандартный вывод.
///
/// При выводе в терминал строки должны появляться по мере готовности, в
/// файл или канал выгоднее писать блоками.
#[derive(Debug)]
pub(crate) enum StdoutWriter {
    Line(io::Stdout),
    Block(io::BufWriter<io::Stdout>),
}

/// Вернуть записыватель в stdout с буферизацией по назначению.
pub(crate) fn stdout() -> StdoutWriter {
    if io::stdout().is_terminal() {
        StdoutWriter::Line(io::stdout())
    } else {
        StdoutWriter::Block(io::BufWriter::new(io::stdout()))
    }
}

impl Write for StdoutWriter {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            StdoutWriter::Line(ref mut w) => w.write(buf),
            StdoutWriter::Block(ref mut w) => w.write(buf),
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            StdoutWriter::Line(ref mut w) => w.flush(),
            StdoutWriter::Block(ref mut w) => w.flush(),
        }
    }
}

/// Принтер, выбранный по режиму вывода.
#[derive(Debug)]
enum Printer<W> {
    Standard(Standard<W>),
    Summary(Summary<W>),
}

/// Исполнитель поиска: компилированный движок, переиспользуемый сканер и
/// принтер, обслуживающие все входы процесса по очереди.
pub(crate) struct Worker<'a, W> {
    args: &'a HiArgs,
    matcher: Box<dyn Matcher>,
    scanner: Scanner,
    printer: Printer<W>,
}

impl<'a, W: Write> Worker<'a, W> {
    /// Собрать исполнителя: скомпилировать движок и настроить конвейер.
    ///
    /// Ошибка компиляции шаблонов фатальна.
    pub(crate) fn new(
        args: &'a HiArgs,
        wtr: W,
    ) -> anyhow::Result<Worker<'a, W>> {
        let matcher = args.build_matcher()?;
        let scanner = args.build_scanner();
        let printer = match args.out_mode() {
            OutMode::Normal => {
                Printer::Standard(args.build_standard_printer(wtr))
            }
            _ => Printer::Summary(args.build_summary_printer(wtr)),
        };
        Ok(Worker { args, matcher, scanner, printer })
    }

    /// Сбросить буферизированный вывод.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        match self.printer {
            Printer::Standard(ref mut p) => p.get_mut().flush(),
            Printer::Summary(ref mut p) => p.get_mut().flush(),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        match self.printer {
            Printer::Standard(p) => p.into_inner(),
            Printer::Summary(p) => p.into_inner(),
        }
    }

    /// Обработать один аргумент командной строки.
    ///
    /// `None` означает стандартный ввод. Возвращает, нашлось ли хоть одно
    /// совпадение; ошибки на файл сообщаются здесь же и не прерывают
    /// обработку остальных входов.
    pub(crate) fn search_arg(
        &mut self,
        path: Option<&Path>,
    ) -> anyhow::Result<bool> {
        match path {
            None => self.search_stdin(),
            Some(path) => self.search_path(path, None),
        }
    }

    fn search_stdin(&mut self) -> anyhow::Result<bool> {
        let show = self.args.show_filename_default();
        let file = stdin_as_file();
        let report =
            match self.scan(&file, b"(standard input)", show, true)? {
                None => return Ok(false),
                Some(report) => report,
            };
        // Если стандартный ввод — регулярный файл, оставить его позицию
        // там, где следующему потребителю имеет смысл продолжить: на конце
        // прочитанного или сразу за строкой, исчерпавшей квоту. В тихом
        // режиме позиция не трогается.
        if report.is_regular() && !self.args.quiet() {
            let required = if !report.hit_limit() {
                report.file_offset()
            } else {
                report.after_last_match()
            };
            if report.mmap_active() || required != report.file_offset() {
                if let Err(err) =
                    (&*file).seek(io::SeekFrom::Start(required))
                {
                    err_message!("(standard input): {err}");
                }
            }
        }
        Ok(report.has_match())
    }

    /// Обработать именованный путь: файл либо каталог.
    ///
    /// `parent` не пуст, когда путь найден рекурсивным обходом: тогда
    /// включается принудительный показ имён и продолжается цепочка
    /// предков для обнаружения петель.
    pub(crate) fn search_path(
        &mut self,
        path: &Path,
        parent: Option<&Ancestry<'_>>,
    ) -> anyhow::Result<bool> {
        let file = match open_with_retry(path) {
            Ok(file) => file,
            Err(err) => return self.open_error(path, parent, err),
        };
        let md = match file.metadata() {
            Ok(md) => md,
            Err(err) => {
                err_message!("{}: {}", path.display(), err);
                return Ok(false);
            }
        };
        if md.is_dir() {
            match self.args.directories() {
                DirMode::Skip => return Ok(false),
                DirMode::Recurse => {
                    // Закрыть дескриптор до спуска, чтобы глубокая
                    // рекурсия не копила открытые каталоги.
                    drop(file);
                    return walk::walk_dir(self, path, parent);
                }
                // Ошибка чтения каталога скажет сама за себя.
                DirMode::Read => {}
            }
        }

        let label = path_bytes(path).into_owned();
        let show = if parent.is_some() {
            self.args.show_filename_in_walk()
        } else {
            self.args.show_filename_default()
        };
        let report = self.scan(&file, &label, show, false)?;
        Ok(report.map_or(false, |r| r.has_match()))
    }

    /// Обработать неудачу открытия согласно политике каталогов.
    fn open_error(
        &mut self,
        path: &Path,
        parent: Option<&Ancestry<'_>>,
        err: io::Error,
    ) -> anyhow::Result<bool> {
        let is_dir = std::fs::metadata(path)
            .map(|md| md.is_dir())
            .unwrap_or(false);
        if is_dir {
            match self.args.directories() {
                DirMode::Recurse => {
                    return walk::walk_dir(self, path, parent);
                }
                // Каталоги, которые нельзя открыть, при пропуске не
                // заслуживают и диагностики.
                DirMode::Skip => return Ok(false),
                DirMode::Read => {}
            }
        }
        err_message!("{}: {}", path.display(), err);
        Ok(false)
    }

    /// Прогнать один вход через сканер и принтер.
    ///
    /// Ошибка записи в вывод сообщается один раз на процесс и обрывает
    /// только текущий вход (`None`); разрыв канала поднимается наверх как
    /// сигнал к грациозному завершению.
    fn scan(
        &mut self,
        file: &File,
        label: &[u8],
        show_path: bool,
        stdin: bool,
    ) -> anyhow::Result<Option<ScanReport>> {
        let Worker {
            ref matcher,
            ref mut scanner,
            ref mut printer,
            ..
        } = *self;
        let result = match printer {
            Printer::Standard(standard) => {
                let mut sink = standard.sink(label, show_path);
                if stdin {
                    scanner.search_stdin(matcher, file, &mut sink)
                } else {
                    scanner.search_file(matcher, file, &mut sink)
                }
            }
            Printer::Summary(summary) => {
                let mut sink = summary.sink(label, show_path);
                if stdin {
                    scanner.search_stdin(matcher, file, &mut sink)
                } else {
                    scanner.search_file(matcher, file, &mut sink)
                }
            }
        };
        match result {
            Ok(report) => {
                if let Some(err) = report.error() {
                    // Исчерпание памяти фатально: продолжать с остальными
                    // входами бессмысленно.
                    if err.kind() == io::ErrorKind::OutOfMemory {
                        anyhow::bail!("{err}");
                    }
                    err_message!(
                        "{}: {}",
                        String::from_utf8_lossy(label),
                        err
                    );
                }
                Ok(Some(report))
            }
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                Err(err.into())
            }
            Err(err) => {
                crate::messages::write_error(&err);
                Ok(None)
            }
        }
    }
}

/// Открыть файл, прозрачно повторяя прерванные системные вызовы.
fn open_with_retry(path: &Path) -> io::Result<File> {
    loop {
        match File::open(path) {
            Ok(file) => return Ok(file),
            Err(ref err)
                if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

/// Представить стандартный ввод как `File`, не присваивая дескриптор.
///
/// Сканеру нужен настоящий дескриптор — для fstat, mmap и lseek, — а не
/// абстрактный `Read`. `ManuallyDrop` не даёт закрыть дескриптор 0 при
/// выходе из области видимости.
#[cfg(unix)]
fn stdin_as_file() -> ManuallyDrop<File> {
    use std::os::unix::io::FromRawFd;

    // SAFETY: дескриптор 0 живёт столько же, сколько процесс, и владение
    // им не передаётся.
    unsafe { ManuallyDrop::new(File::from_raw_fd(0)) }
}

#[cfg(windows)]
fn stdin_as_file() -> ManuallyDrop<File> {
    use std::os::windows::io::{AsRawHandle, FromRawHandle};

    // SAFETY: дескриптор стандартного ввода живёт столько же, сколько
    // процесс, и владение им не передаётся.
    unsafe {
        ManuallyDrop::new(File::from_raw_handle(
            io::stdin().as_raw_handle(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use crate::flags::{HiArgs, parse_low_raw};

    use super::*;

    fn hiargs(cli: &[&str]) -> HiArgs {
        let low = parse_low_raw(cli.iter().map(OsString::from)).unwrap();
        HiArgs::from_low_args(low).unwrap()
    }

    /// Прогнать полный конвейер по аргументам CLI, собрав вывод в память.
    fn run_cli(cli: &[&str]) -> (String, bool) {
        let args = hiargs(cli);
        let mut worker = Worker::new(&args, vec![]).unwrap();
        let mut matched = false;
        for path in args.paths() {
            matched |= worker
                .search_arg(Some(Path::new(path)))
                .unwrap();
        }
        let out = worker.into_inner();
        (String::from_utf8_lossy(&out).into_owned(), matched)
    }

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn fixed_string_multi_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", b"foo\nbar\nfoo\n");
        let b = write_file(dir.path(), "b.txt", b"baz\n");

        let (out, matched) = run_cli(&["foo", &a, &b]);
        assert_eq!(out, format!("{a}:foo\n{a}:foo\n"));
        assert!(matched);
    }

    #[test]
    fn single_file_has_no_filename_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", b"foo\n");

        let (out, matched) = run_cli(&["foo", &a]);
        assert_eq!(out, "foo\n");
        assert!(matched);

        // -H принуждает имя даже для единственного файла.
        let (out, _) = run_cli(&["-H", "foo", &a]);
        assert_eq!(out, format!("{a}:foo\n"));
    }

    #[test]
    fn context_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(
            dir.path(),
            "ctx.txt",
            b"1\n2\n3\nHIT\n5\n6\n7\nHIT\n9\n",
        );
        let (out, _) = run_cli(&["-A1", "-B1", "HIT", &a]);
        assert_eq!(out, "3\nHIT\n5\n--\n7\nHIT\n9\n");
    }

    #[test]
    fn invert_count_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "vc.txt", b"a\nb\na\n");
        let (out, matched) = run_cli(&["-vc", "a", &a]);
        assert_eq!(out, "1\n");
        assert!(matched);
    }

    #[test]
    fn binary_detection_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "bin", b"hello\x00world\n");

        let (out, matched) = run_cli(&["hello", &a]);
        assert_eq!(out, format!("Binary file {a} matches\n"));
        assert!(matched);

        let (out, _) = run_cli(&["-a", "hello", &a]);
        assert_eq!(out, "hello\x00world\n");

        let (out, matched) = run_cli(&["-I", "hello", &a]);
        assert_eq!(out, "");
        assert!(!matched);
    }

    #[test]
    fn null_data_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "z", b"x\x00y\x00z\x00");
        let (out, matched) = run_cli(&["-z", "y", &a]);
        assert_eq!(out, "y\x00");
        assert!(matched);
    }

    #[test]
    fn list_modes() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"foo\n");
        let b = write_file(dir.path(), "b", b"bar\n");

        let (out, matched) = run_cli(&["-l", "foo", &a, &b]);
        assert_eq!(out, format!("{a}\n"));
        assert!(matched);

        let (out, matched) = run_cli(&["-L", "foo", &a, &b]);
        assert_eq!(out, format!("{b}\n"));
        assert!(matched);

        let (out, _) = run_cli(&["-lZ", "foo", &a]);
        assert_eq!(out, format!("{a}\u{0}"));
    }

    #[test]
    fn count_mode_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"foo\nfoo\n");
        let b = write_file(dir.path(), "b", b"bar\n");

        let (out, _) = run_cli(&["-c", "foo", &a, &b]);
        assert_eq!(out, format!("{a}:2\n{b}:0\n"));
    }

    #[test]
    fn quiet_mode_prints_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"foo\n");
        let (out, matched) = run_cli(&["-q", "foo", &a]);
        assert_eq!(out, "");
        assert!(matched);
    }

    #[test]
    fn max_count_across_modes() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"m\nm\nm\n");
        let (out, _) = run_cli(&["-m2", "m", &a]);
        assert_eq!(out, "m\nm\n");
    }

    #[test]
    fn directories_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"foo\n");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let sub = sub.to_string_lossy().into_owned();

        let (out, matched) = run_cli(&["-d", "skip", "foo", &sub, &a]);
        assert_eq!(out, format!("{a}:foo\n"));
        assert!(matched);
    }

    #[test]
    fn missing_file_contributes_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"foo\n");
        let missing =
            dir.path().join("missing").to_string_lossy().into_owned();

        let (out, matched) = run_cli(&["foo", &missing, &a]);
        assert_eq!(out, format!("{a}:foo\n"));
        assert!(matched);
    }

    #[test]
    fn word_and_line_constraints_through_cli() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "w", b"foobar\nfoo\nxfoo\n");

        let (out, _) = run_cli(&["-w", "foo", &a]);
        assert_eq!(out, "foo\n");

        let (out, _) = run_cli(&["-x", "foo", &a]);
        assert_eq!(out, "foo\n");
    }

    #[test]
    fn line_numbers_and_offsets_through_cli() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "n", b"bar\nfoo\n");
        let (out, _) = run_cli(&["-nb", "foo", &a]);
        assert_eq!(out, "2:4:foo\n");
    }
}
