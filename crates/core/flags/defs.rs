/*!
Определяет все флаги, доступные в ggrep.

Каждый флаг соответствует unit-структуре с реализацией `Flag`. Одна
реализация может иметь несколько проявлений для конечного пользователя:
длинное имя, короткое имя и псевдонимы — но внутри это один логический
флаг. Например, `-q`, `--quiet` и `--silent` управляют одним и тем же
полем.
*/

use std::ffi::OsStr;

use crate::flags::{
    Flag, FlagValue,
    lowargs::{
        BinaryFilesMode, DirectoriesMode, ListMode, LowArgs, PatternSource,
    },
};

/// Список всех флагов через реализации `Flag`.
///
/// Порядок определяет только порядок в справочных текстах.
pub(super) const FLAGS: &[&dyn Flag] = &[
    &Regexp,
    &File,
    &AfterContext,
    &BeforeContext,
    &BasicRegexp,
    &Binary,
    &BinaryFiles,
    &ByteOffset,
    &Context,
    &Count,
    &Directories,
    &Engine,
    &ExtendedRegexp,
    &FilesWithMatches,
    &FilesWithoutMatch,
    &FixedStrings,
    &Help,
    &IgnoreCase,
    &InvertMatch,
    &LineNumber,
    &LineRegexp,
    &MaxCount,
    &Mmap,
    &NoFilename,
    &NoMessages,
    &Null,
    &NullData,
    &PerlRegexp,
    &Quiet,
    &Recursive,
    &Text,
    &UnixByteOffsets,
    &Version,
    &WithFilename,
    &WordRegexp,
];

/// Вспомогательные преобразования значений флагов.
mod convert {
    use std::ffi::OsStr;

    /// Число строк контекста.
    ///
    /// Любая невалидность, включая переполнение, фатальна.
    pub(super) fn context_count(v: &OsStr) -> anyhow::Result<usize> {
        let Some(s) = v.to_str() else {
            anyhow::bail!(
                "{}: invalid context length argument",
                v.to_string_lossy()
            )
        };
        match s.parse::<usize>() {
            Ok(n) => Ok(n),
            Err(_) => {
                anyhow::bail!("{}: invalid context length argument", s)
            }
        }
    }

    /// Значение `-m`: переполнение означает «без предела», прочая
    /// невалидность фатальна.
    pub(super) fn max_count(v: &OsStr) -> anyhow::Result<u64> {
        let Some(s) = v.to_str() else {
            anyhow::bail!("invalid max count")
        };
        match s.parse::<u64>() {
            Ok(n) => Ok(n),
            Err(err)
                if *err.kind()
                    == std::num::IntErrorKind::PosOverflow =>
            {
                Ok(u64::MAX)
            }
            Err(_) => anyhow::bail!("invalid max count"),
        }
    }
}

/// Выбрать движок, сообщая о конфликте.
fn set_matcher(args: &mut LowArgs, name: &str) -> anyhow::Result<()> {
    match args.matcher {
        Some(ref current) if current != name => {
            anyhow::bail!("conflicting matchers specified")
        }
        _ => {
            args.matcher = Some(name.to_string());
            Ok(())
        }
    }
}

/// -A/--after-context
#[derive(Debug)]
struct AfterContext;

impl Flag for AfterContext {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'A')
    }
    fn name_long(&self) -> &'static str {
        "after-context"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.after_context =
            Some(convert::context_count(&v.unwrap_value())?);
        Ok(())
    }
}

/// -B/--before-context
#[derive(Debug)]
struct BeforeContext;

impl Flag for BeforeContext {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'B')
    }
    fn name_long(&self) -> &'static str {
        "before-context"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.before_context =
            Some(convert::context_count(&v.unwrap_value())?);
        Ok(())
    }
}

/// -C/--context
///
/// Устанавливает обе стороны контекста, но явные `-A`/`-B` сильнее.
#[derive(Debug)]
struct Context;

impl Flag for Context {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'C')
    }
    fn name_long(&self) -> &'static str {
        "context"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.default_context = convert::context_count(&v.unwrap_value())?;
        Ok(())
    }
}

/// -G/--basic-regexp
#[derive(Debug)]
struct BasicRegexp;

impl Flag for BasicRegexp {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'G')
    }
    fn name_long(&self) -> &'static str {
        "basic-regexp"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        set_matcher(args, "grep")
    }
}

/// -E/--extended-regexp
#[derive(Debug)]
struct ExtendedRegexp;

impl Flag for ExtendedRegexp {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'E')
    }
    fn name_long(&self) -> &'static str {
        "extended-regexp"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        set_matcher(args, "egrep")
    }
}

/// -F/--fixed-strings
#[derive(Debug)]
struct FixedStrings;

impl Flag for FixedStrings {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'F')
    }
    fn name_long(&self) -> &'static str {
        "fixed-strings"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["fixed-regexp"]
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        set_matcher(args, "fgrep")
    }
}

/// -P/--perl-regexp
///
/// В этой сборке perl-движок не зарегистрирован, и выбор деградирует до
/// движка по умолчанию при установке матчера.
#[derive(Debug)]
struct PerlRegexp;

impl Flag for PerlRegexp {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'P')
    }
    fn name_long(&self) -> &'static str {
        "perl-regexp"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        set_matcher(args, "perl")
    }
}

/// -X NAME
///
/// Внутренний флаг: выбрать движок по имени.
#[derive(Debug)]
struct Engine;

impl Flag for Engine {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'X')
    }
    fn name_long(&self) -> &'static str {
        "engine"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        let value = v.unwrap_value();
        let Some(name) = value.to_str() else {
            anyhow::bail!("invalid matcher name")
        };
        set_matcher(args, name)
    }
}

/// -e/--regexp=PATTERN
#[derive(Debug)]
struct Regexp;

impl Flag for Regexp {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'e')
    }
    fn name_long(&self) -> &'static str {
        "regexp"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.patterns.push(PatternSource::Regexp(v.unwrap_value()));
        Ok(())
    }
}

/// -f/--file=FILE
#[derive(Debug)]
struct File;

impl Flag for File {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'f')
    }
    fn name_long(&self) -> &'static str {
        "file"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.patterns.push(PatternSource::File(v.unwrap_value()));
        Ok(())
    }
}

/// -i/--ignore-case
#[derive(Debug)]
struct IgnoreCase;

impl Flag for IgnoreCase {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'i')
    }
    fn name_long(&self) -> &'static str {
        "ignore-case"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.case_insensitive = true;
        Ok(())
    }
}

/// -w/--word-regexp
#[derive(Debug)]
struct WordRegexp;

impl Flag for WordRegexp {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'w')
    }
    fn name_long(&self) -> &'static str {
        "word-regexp"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.word_regexp = true;
        Ok(())
    }
}

/// -x/--line-regexp
#[derive(Debug)]
struct LineRegexp;

impl Flag for LineRegexp {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'x')
    }
    fn name_long(&self) -> &'static str {
        "line-regexp"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.line_regexp = true;
        Ok(())
    }
}

/// -z/--null-data
#[derive(Debug)]
struct NullData;

impl Flag for NullData {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'z')
    }
    fn name_long(&self) -> &'static str {
        "null-data"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.null_data = true;
        Ok(())
    }
}

/// -v/--invert-match
#[derive(Debug)]
struct InvertMatch;

impl Flag for InvertMatch {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'v')
    }
    fn name_long(&self) -> &'static str {
        "invert-match"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.invert_match = true;
        Ok(())
    }
}

/// -m/--max-count=NUM
#[derive(Debug)]
struct MaxCount;

impl Flag for MaxCount {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'm')
    }
    fn name_long(&self) -> &'static str {
        "max-count"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.max_count = Some(convert::max_count(&v.unwrap_value())?);
        Ok(())
    }
}

/// -b/--byte-offset
#[derive(Debug)]
struct ByteOffset;

impl Flag for ByteOffset {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'b')
    }
    fn name_long(&self) -> &'static str {
        "byte-offset"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.byte_offset = true;
        Ok(())
    }
}

/// -n/--line-number
#[derive(Debug)]
struct LineNumber;

impl Flag for LineNumber {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'n')
    }
    fn name_long(&self) -> &'static str {
        "line-number"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.line_number = true;
        Ok(())
    }
}

/// -H/--with-filename
#[derive(Debug)]
struct WithFilename;

impl Flag for WithFilename {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'H')
    }
    fn name_long(&self) -> &'static str {
        "with-filename"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.with_filename = true;
        Ok(())
    }
}

/// -h/--no-filename
#[derive(Debug)]
struct NoFilename;

impl Flag for NoFilename {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'h')
    }
    fn name_long(&self) -> &'static str {
        "no-filename"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.no_filename = true;
        Ok(())
    }
}

/// -q/--quiet/--silent
#[derive(Debug)]
struct Quiet;

impl Flag for Quiet {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'q')
    }
    fn name_long(&self) -> &'static str {
        "quiet"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["silent"]
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.quiet = true;
        Ok(())
    }
}

/// --binary-files=TYPE
#[derive(Debug)]
struct BinaryFiles;

impl Flag for BinaryFiles {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_long(&self) -> &'static str {
        "binary-files"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        let value = v.unwrap_value();
        args.binary_files = match value.to_str() {
            Some("binary") => BinaryFilesMode::Binary,
            Some("text") => BinaryFilesMode::Text,
            Some("without-match") => BinaryFilesMode::WithoutMatch,
            _ => anyhow::bail!("unknown binary-files type"),
        };
        Ok(())
    }
}

/// -a/--text
#[derive(Debug)]
struct Text;

impl Flag for Text {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'a')
    }
    fn name_long(&self) -> &'static str {
        "text"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.binary_files = BinaryFilesMode::Text;
        Ok(())
    }
}

/// -d/--directories=ACTION
#[derive(Debug)]
struct Directories;

impl Flag for Directories {
    fn is_switch(&self) -> bool {
        false
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'd')
    }
    fn name_long(&self) -> &'static str {
        "directories"
    }
    fn update(&self, v: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        let value = v.unwrap_value();
        args.directories = match value.to_str() {
            Some("read") => DirectoriesMode::Read,
            Some("skip") => DirectoriesMode::Skip,
            Some("recurse") => DirectoriesMode::Recurse,
            _ => anyhow::bail!("unknown directories method"),
        };
        Ok(())
    }
}

/// -r/--recursive
#[derive(Debug)]
struct Recursive;

impl Flag for Recursive {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'r')
    }
    fn name_long(&self) -> &'static str {
        "recursive"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.directories = DirectoriesMode::Recurse;
        Ok(())
    }
}

/// -L/--files-without-match
#[derive(Debug)]
struct FilesWithoutMatch;

impl Flag for FilesWithoutMatch {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'L')
    }
    fn name_long(&self) -> &'static str {
        "files-without-match"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.list = Some(ListMode::WithoutMatch);
        Ok(())
    }
}

/// -l/--files-with-matches
#[derive(Debug)]
struct FilesWithMatches;

impl Flag for FilesWithMatches {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'l')
    }
    fn name_long(&self) -> &'static str {
        "files-with-matches"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.list = Some(ListMode::WithMatches);
        Ok(())
    }
}

/// -c/--count
#[derive(Debug)]
struct Count;

impl Flag for Count {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'c')
    }
    fn name_long(&self) -> &'static str {
        "count"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.count = true;
        Ok(())
    }
}

/// -Z/--null
#[derive(Debug)]
struct Null;

impl Flag for Null {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'Z')
    }
    fn name_long(&self) -> &'static str {
        "null"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.null_filename = true;
        Ok(())
    }
}

/// -s/--no-messages
#[derive(Debug)]
struct NoMessages;

impl Flag for NoMessages {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b's')
    }
    fn name_long(&self) -> &'static str {
        "no-messages"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.no_messages = true;
        Ok(())
    }
}

/// --mmap
#[derive(Debug)]
struct Mmap;

impl Flag for Mmap {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_long(&self) -> &'static str {
        "mmap"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.mmap = true;
        Ok(())
    }
}

/// -U/--binary
///
/// Подавление обрезки CR имеет смысл только на DOS-подобных системах; на
/// остальных флаг принимается и игнорируется, как у классического grep.
#[derive(Debug)]
struct Binary;

impl Flag for Binary {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'U')
    }
    fn name_long(&self) -> &'static str {
        "binary"
    }
    fn update(&self, _: FlagValue, _: &mut LowArgs) -> anyhow::Result<()> {
        Ok(())
    }
}

/// -u/--unix-byte-offsets
///
/// Парный к `-U` DOS-флаг; вне DOS смещения и так юниксовые.
#[derive(Debug)]
struct UnixByteOffsets;

impl Flag for UnixByteOffsets {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'u')
    }
    fn name_long(&self) -> &'static str {
        "unix-byte-offsets"
    }
    fn update(&self, _: FlagValue, _: &mut LowArgs) -> anyhow::Result<()> {
        Ok(())
    }
}

/// -V/--version
#[derive(Debug)]
struct Version;

impl Flag for Version {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_short(&self) -> Option<u8> {
        Some(b'V')
    }
    fn name_long(&self) -> &'static str {
        "version"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.show_version = true;
        Ok(())
    }
}

/// --help
#[derive(Debug)]
struct Help;

impl Flag for Help {
    fn is_switch(&self) -> bool {
        true
    }
    fn name_long(&self) -> &'static str {
        "help"
    }
    fn update(&self, _: FlagValue, args: &mut LowArgs) -> anyhow::Result<()> {
        args.show_help = true;
        Ok(())
    }
}

/// Применить `-I` (эквивалент `--binary-files=without-match`).
///
/// У `-I` нет длинного имени, поэтому парсер обрабатывает его отдельно.
pub(super) fn update_binary_without_match(
    args: &mut LowArgs,
) -> anyhow::Result<()> {
    args.binary_files = BinaryFilesMode::WithoutMatch;
    Ok(())
}

/// Разобрать накопленные цифровые опции как длину контекста.
pub(super) fn update_digit_context(
    digits: &str,
    args: &mut LowArgs,
) -> anyhow::Result<()> {
    args.default_context =
        convert::context_count(OsStr::new(digits))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use crate::flags::parse::parse_low_raw;

    use super::*;

    fn parse(args: &[&str]) -> LowArgs {
        parse_low_raw(args.iter().map(OsString::from)).unwrap()
    }

    fn parse_err(args: &[&str]) -> String {
        parse_low_raw(args.iter().map(OsString::from))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn contexts() {
        let args = parse(&["-A", "3", "-B2"]);
        assert_eq!(args.after_context, Some(3));
        assert_eq!(args.before_context, Some(2));
        assert_eq!(args.default_context, 0);

        let args = parse(&["--context=5"]);
        assert_eq!(args.default_context, 5);
        assert_eq!(args.after_context, None);
        assert_eq!(args.before_context, None);
    }

    #[test]
    fn context_invalid() {
        let err = parse_err(&["-A", "x"]);
        assert!(err.contains("invalid context length argument"), "{err}");
        let err = parse_err(&["-C", "99999999999999999999999999"]);
        assert!(err.contains("invalid context length argument"), "{err}");
    }

    #[test]
    fn matchers() {
        assert_eq!(parse(&["-E"]).matcher.as_deref(), Some("egrep"));
        assert_eq!(parse(&["-F"]).matcher.as_deref(), Some("fgrep"));
        assert_eq!(parse(&["-G"]).matcher.as_deref(), Some("grep"));
        assert_eq!(parse(&["-P"]).matcher.as_deref(), Some("perl"));
        assert_eq!(parse(&["-X", "foo"]).matcher.as_deref(), Some("foo"));
        assert_eq!(
            parse(&["--fixed-regexp"]).matcher.as_deref(),
            Some("fgrep")
        );
    }

    #[test]
    fn matcher_conflicts() {
        let err = parse_err(&["-E", "-F"]);
        assert!(err.contains("conflicting matchers specified"), "{err}");
        // Повтор одного и того же имени конфликтом не считается.
        let args = parse(&["-E", "-E"]);
        assert_eq!(args.matcher.as_deref(), Some("egrep"));
    }

    #[test]
    fn patterns_accumulate_in_order() {
        let args = parse(&["-e", "a", "-f", "pats", "-eb"]);
        assert_eq!(
            args.patterns,
            vec![
                PatternSource::Regexp(OsString::from("a")),
                PatternSource::File(OsString::from("pats")),
                PatternSource::Regexp(OsString::from("b")),
            ]
        );
    }

    #[test]
    fn binary_files_modes() {
        assert_eq!(
            parse(&["--binary-files=text"]).binary_files,
            BinaryFilesMode::Text
        );
        assert_eq!(
            parse(&["--binary-files=without-match"]).binary_files,
            BinaryFilesMode::WithoutMatch
        );
        assert_eq!(parse(&["-a"]).binary_files, BinaryFilesMode::Text);
        assert_eq!(
            parse(&["-I"]).binary_files,
            BinaryFilesMode::WithoutMatch
        );
        let err = parse_err(&["--binary-files=bogus"]);
        assert!(err.contains("unknown binary-files type"), "{err}");
    }

    #[test]
    fn directories_modes() {
        assert_eq!(parse(&[]).directories, DirectoriesMode::Read);
        assert_eq!(
            parse(&["-d", "skip"]).directories,
            DirectoriesMode::Skip
        );
        assert_eq!(parse(&["-r"]).directories, DirectoriesMode::Recurse);
        let err = parse_err(&["-d", "bogus"]);
        assert!(err.contains("unknown directories method"), "{err}");
    }

    #[test]
    fn directories_last_flag_wins() {
        assert_eq!(
            parse(&["-r", "-d", "read"]).directories,
            DirectoriesMode::Read
        );
        assert_eq!(
            parse(&["-d", "read", "-r"]).directories,
            DirectoriesMode::Recurse
        );
    }

    #[test]
    fn max_count() {
        assert_eq!(parse(&["-m", "7"]).max_count, Some(7));
        assert_eq!(parse(&["-m0"]).max_count, Some(0));
        // Переполнение означает «без предела».
        assert_eq!(
            parse(&["-m", "99999999999999999999999999"]).max_count,
            Some(u64::MAX)
        );
        let err = parse_err(&["-m", "x"]);
        assert!(err.contains("invalid max count"), "{err}");
    }

    #[test]
    fn list_modes() {
        assert_eq!(parse(&["-l"]).list, Some(ListMode::WithMatches));
        assert_eq!(parse(&["-L"]).list, Some(ListMode::WithoutMatch));
        assert_eq!(parse(&["-l", "-L"]).list, Some(ListMode::WithoutMatch));
    }

    #[test]
    fn switches() {
        let args = parse(&["-b", "-n", "-H", "-s", "-v", "-w", "-x", "-Z"]);
        assert!(args.byte_offset);
        assert!(args.line_number);
        assert!(args.with_filename);
        assert!(args.no_messages);
        assert!(args.invert_match);
        assert!(args.word_regexp);
        assert!(args.line_regexp);
        assert!(args.null_filename);

        let args = parse(&["-i", "-q", "-c", "-h", "-z", "--mmap"]);
        assert!(args.case_insensitive);
        assert!(args.quiet);
        assert!(args.count);
        assert!(args.no_filename);
        assert!(args.null_data);
        assert!(args.mmap);
    }

    #[test]
    fn old_timers_y_is_ignore_case() {
        assert!(parse(&["-y"]).case_insensitive);
    }

    #[test]
    fn dos_flags_are_accepted() {
        let args = parse(&["-U", "-u"]);
        assert!(!args.case_insensitive);
    }

    #[test]
    fn combined_shorts() {
        let args = parse(&["-inH", "pattern"]);
        assert!(args.case_insensitive);
        assert!(args.line_number);
        assert!(args.with_filename);
        assert_eq!(args.positional, vec![OsString::from("pattern")]);
    }

    #[test]
    fn special_modes() {
        assert!(parse(&["--help"]).show_help);
        assert!(parse(&["-V"]).show_version);
        assert!(parse(&["--version"]).show_version);
        assert!(parse(&["--silent"]).quiet);
    }
}
