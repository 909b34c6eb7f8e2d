/*!
Рекурсивный обход каталогов с обнаружением петель.

Петли ловятся цепочкой предков: перед спуском в каталог его пара
(устройство, инод) сравнивается со всеми кадрами выше по стеку. Цепочка
живёт прямо в стеке вызовов — кадр заимствует родительский, так что ни
выделений, ни очистки не требуется.
*/

use std::{io::Write, path::Path};

use crate::search::Worker;

/// Кадр цепочки предков текущего каталога.
#[derive(Debug)]
pub(crate) struct Ancestry<'a> {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    parent: Option<&'a Ancestry<'a>>,
}

impl<'a> Ancestry<'a> {
    fn new(
        md: &std::fs::Metadata,
        parent: Option<&'a Ancestry<'a>>,
    ) -> Ancestry<'a> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Ancestry { dev: md.dev(), ino: md.ino(), parent }
        }
        #[cfg(not(unix))]
        {
            let _ = md;
            Ancestry { parent }
        }
    }

    /// Есть ли среди предков каталог с теми же устройством и инодом.
    #[cfg(unix)]
    fn creates_loop(&self) -> bool {
        let mut ancestor = self.parent;
        while let Some(frame) = ancestor {
            if frame.dev == self.dev && frame.ino == self.ino {
                return true;
            }
            ancestor = frame.parent;
        }
        false
    }

    #[cfg(not(unix))]
    fn creates_loop(&self) -> bool {
        false
    }
}

/// Рекурсивно обойти каталог, прогнав каждый вход через исполнителя.
///
/// Возвращает, нашлось ли совпадение хоть в одном потомке. Дети
/// перечисляются в порядке, который выдаёт операционная система.
pub(crate) fn walk_dir<W: Write>(
    worker: &mut Worker<'_, W>,
    dir: &Path,
    parent: Option<&Ancestry<'_>>,
) -> anyhow::Result<bool> {
    let md = match std::fs::metadata(dir) {
        Ok(md) => md,
        Err(err) => {
            err_message!("{}: {}", dir.display(), err);
            return Ok(false);
        }
    };
    let frame = Ancestry::new(&md, parent);
    if frame.creates_loop() {
        // Петля — не ошибка операционной системы, но и она подчиняется
        // подавлению сообщений: без диагностики не меняется и статус.
        if crate::messages::messages() {
            err_message!(
                "warning: {}: recursive directory loop",
                dir.display()
            );
        }
        return Ok(false);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            err_message!("{}: {}", dir.display(), err);
            return Ok(false);
        }
    };
    let mut matched = false;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                err_message!("{}: {}", dir.display(), err);
                continue;
            }
        };
        matched |= worker.search_path(&entry.path(), Some(&frame))?;
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::Path;

    use crate::flags::{HiArgs, parse_low_raw};
    use crate::search::Worker;

    fn run_cli(cli: &[&str]) -> (String, bool) {
        let low = parse_low_raw(cli.iter().map(OsString::from)).unwrap();
        let args = HiArgs::from_low_args(low).unwrap();
        let mut worker = Worker::new(&args, vec![]).unwrap();
        let mut matched = false;
        for path in args.paths() {
            matched |=
                worker.search_arg(Some(Path::new(path))).unwrap();
        }
        let out = worker.into_inner();
        (String::from_utf8_lossy(&out).into_owned(), matched)
    }

    #[test]
    fn recursive_walk_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"needle\n").unwrap();
        std::fs::write(sub.join("deep.txt"), b"no\nneedle\n").unwrap();
        std::fs::write(sub.join("other.txt"), b"nothing\n").unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let (out, matched) = run_cli(&["-rn", "needle", &root]);
        assert!(matched);

        // Порядок обхода принадлежит операционной системе: сравниваем
        // множества строк.
        let mut got: Vec<&str> = out.lines().collect();
        got.sort_unstable();
        let top = format!("{root}/top.txt:1:needle");
        let deep = format!("{root}/sub/deep.txt:2:needle");
        let mut expected = vec![top.as_str(), deep.as_str()];
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn recursion_forces_filenames_for_single_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), b"needle\n").unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let (out, _) = run_cli(&["-r", "needle", &root]);
        assert_eq!(out, format!("{root}/f:needle\n"));

        // ...если имена не подавлены явно.
        let (out, _) = run_cli(&["-rh", "needle", &root]);
        assert_eq!(out, "needle\n");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_terminates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), b"needle\n").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop"))
            .unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        // Обход обязан завершиться, найдя файл ровно по разу на уровень
        // до обнаружения петли.
        let (out, matched) = run_cli(&["-r", "needle", &root]);
        assert!(matched);
        assert!(out.contains("/f:needle\n"));
    }

    #[cfg(unix)]
    #[test]
    fn directory_read_policy_reports_error() {
        // Политика по умолчанию читает каталог как файл; на Unix это
        // заканчивается ошибкой чтения и нулём совпадений.
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let (out, matched) = run_cli(&["needle", &root]);
        assert_eq!(out, "");
        assert!(!matched);
    }
}
