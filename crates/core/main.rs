/*!
Точка входа в ggrep.
*/

use std::{io::Write, path::Path, process::ExitCode};

use crate::flags::{HiArgs, ParseResult, SpecialMode, UsageError};

#[macro_use]
mod messages;

mod flags;
mod logger;
mod search;
mod walk;

fn main() -> ExitCode {
    messages::set_prog(prog_name());
    match run(flags::parse()) {
        Ok(code) => code,
        Err(err) => {
            // Ищем ошибку разрыва канала: в этом случае принято выходить
            // «грациозно» с кодом успеха, по соглашению Unix. Среда
            // выполнения Rust не запрашивает сигналы PIPE, поэтому вместо
            // сигнала мы получаем ошибку ввода-вывода.
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            // Ошибки использования завершаются кратким напоминанием
            // синтаксиса, без префикса с именем программы.
            if let Some(usage) = err.downcast_ref::<UsageError>() {
                if let Some(ref msg) = usage.message {
                    eprintln_locked!("{msg}");
                }
                let mut stderr = std::io::stderr().lock();
                let _ = writeln!(stderr, "{}", flags::help::generate_usage());
                return ExitCode::from(2);
            }
            eprintln_locked!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Основная точка входа после разбора аргументов.
///
/// Компоненты соединяются здесь: скомпилированный движок и сканер с
/// принтером собираются в исполнителя, который прогоняет по очереди все
/// входы из командной строки (или стандартный ввод), а итоговый статус
/// складывается из фактов совпадений и накопленных ошибок.
fn run(result: ParseResult<HiArgs>) -> anyhow::Result<ExitCode> {
    let args = match result {
        ParseResult::Err(err) => return Err(err),
        ParseResult::Special(mode) => return special(mode),
        ParseResult::Ok(args) => args,
    };
    // Нулевая квота означает немедленный выход без сканирования.
    if args.max_count() == Some(0) {
        return Ok(ExitCode::from(1));
    }

    let mut worker = search::Worker::new(&args, search::stdout())?;
    let mut matched = false;
    let search_result = (|| -> anyhow::Result<()> {
        if args.paths().is_empty() {
            matched = worker.search_arg(None)?;
        } else {
            for path in args.paths() {
                // FILE со значением «-» — это стандартный ввод.
                let path = Path::new(path);
                let target =
                    if path == Path::new("-") { None } else { Some(path) };
                let file_matched = worker.search_arg(target)?;
                matched = matched || file_matched;
                if matched && args.quit_after_match() {
                    break;
                }
            }
        }
        Ok(())
    })();
    // Разрыв канала завершает перебор, но статус вычисляется как обычно.
    if let Err(err) = search_result {
        let broken_pipe = err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .map_or(false, |e| e.kind() == std::io::ErrorKind::BrokenPipe)
        });
        if !broken_pipe {
            return Err(err);
        }
    }
    if let Err(err) = worker.flush() {
        if err.kind() != std::io::ErrorKind::BrokenPipe {
            messages::write_error(&err);
        }
    }

    Ok(if matched && (args.quiet() || !messages::errored()) {
        ExitCode::from(0)
    } else if messages::errored() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    })
}

/// Реализует «специальные» режимы: помощь и версию.
///
/// Они коротко замыкают всю остальную инициализацию, чтобы справка была
/// доступна даже в окружении, где обычный запуск невозможен.
fn special(mode: SpecialMode) -> anyhow::Result<ExitCode> {
    let output = match mode {
        SpecialMode::Help => flags::help::generate_help(),
        SpecialMode::Version => flags::help::generate_version(),
    };
    writeln!(std::io::stdout(), "{}", output.trim_end())?;
    Ok(ExitCode::from(0))
}

/// Имя, под которым программа была запущена.
///
/// Используется как префикс диагностики и для выбора движка по умолчанию:
/// имя, оканчивающееся на `egrep` или `fgrep`, включает соответствующий
/// режим. На DOS-подобных системах регистр сворачивается и суффикс `.exe`
/// отбрасывается.
fn prog_name() -> String {
    let Some(arg0) = std::env::args_os().next() else {
        return "ggrep".to_string();
    };
    let path = std::path::PathBuf::from(arg0);
    let Some(name) = path.file_name() else {
        return "ggrep".to_string();
    };
    let name = name.to_string_lossy().into_owned();
    #[cfg(windows)]
    let name = {
        let mut name = name.to_ascii_lowercase();
        if name.ends_with(".exe") {
            name.truncate(name.len() - 4);
        }
        name
    };
    name
}
