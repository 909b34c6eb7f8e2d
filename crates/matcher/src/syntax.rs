/*!
Подготовка исходного текста шаблонов к компиляции.

Набор ключей приходит одним байтовым срезом, в котором отдельные шаблоны
разделены `\n` (так их склеивает разбор `-e`/`-f`). Для движков регулярных
выражений каждый шаблон становится ветвью одной альтернации; базовый
диалект перед этим переписывается в современный синтаксис.
*/

use crate::Error;

/// Разбивает склеенные ключи на отдельные шаблоны.
pub(crate) fn split_keys(keys: &[u8]) -> Vec<&[u8]> {
    keys.split(|&b| b == b'\n').collect()
}

/// Склеивает переведённые ветви в одну альтернацию `(?:a)|(?:b)`.
///
/// Пустая ветвь даёт `(?:)`, которая совпадает с пустой строкой в любой
/// позиции — ровно то, что делает пустой шаблон в grep.
pub(crate) fn join_alternates(branches: &[String]) -> String {
    let mut out = String::new();
    for (i, branch) in branches.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        out.push_str("(?:");
        out.push_str(branch);
        out.push(')');
    }
    out
}

/// Проверяет, что шаблон — валидный UTF-8, и возвращает его как `&str`.
///
/// Движки регулярных выражений принимают только текстовые шаблоны;
/// произвольные байты остаются уделом фиксированных строк.
pub(crate) fn pattern_str(pattern: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(pattern).map_err(|err| {
        Error::new(format!(
            "невалидный UTF-8 в шаблоне по смещению байта {}",
            err.valid_up_to()
        ))
    })
}

/// Переписывает один шаблон из базового диалекта (BRE) в современный.
///
/// Правила обратны привычным: в BRE `( ) { } + ? |` — литералы, а их
/// экранированные формы `\( \) \{ \}` (и GNU-расширения `\| \+ \?`) несут
/// специальный смысл. `^` является якорем только в начале шаблона, `$` —
/// только в конце. Классы символов копируются без изменений.
pub(crate) fn basic_to_modern(pattern: &str) -> String {
    let bytes = pattern.as_bytes();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\\' if i + 1 < bytes.len() => {
                let next = bytes[i + 1];
                match next {
                    b'(' | b')' | b'{' | b'}' | b'|' | b'+' | b'?' => {
                        out.push(char::from(next));
                    }
                    _ => {
                        out.push('\\');
                        out.push(char::from(next));
                    }
                }
                i += 2;
                continue;
            }
            b'(' | b')' | b'{' | b'}' | b'|' | b'+' | b'?' => {
                out.push('\\');
                out.push(char::from(b));
            }
            b'*' if i == 0 => {
                // Звёздочка в начале шаблона в BRE — обычный символ.
                out.push_str("\\*");
            }
            b'^' if i != 0 => {
                out.push_str("\\^");
            }
            b'$' if i != bytes.len() - 1 => {
                out.push_str("\\$");
            }
            b'[' => {
                let end = copy_class(&mut out, bytes, i);
                i = end;
                continue;
            }
            _ => {
                // Шаблон — валидный UTF-8, поэтому побайтовое копирование
                // не начинается посреди многобайтового символа: все
                // специальные байты выше — это ASCII.
                let ch_len = utf8_len(b);
                out.push_str(&pattern[i..i + ch_len]);
                i += ch_len;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// Копирует класс символов `[...]` дословно, возвращая позицию за `]`.
///
/// `]` сразу после `[` (или после `[^`) — литерал, поэтому закрывающая
/// скобка ищется со сдвигом. Незакрытый класс копируется как есть: ошибку
/// синтаксиса сообщит компиляция.
fn copy_class(out: &mut String, bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() && bytes[i] != b']' {
        // POSIX-классы вида [:alpha:] содержат собственные скобки.
        if bytes[i] == b'[' && matches!(bytes.get(i + 1), Some(&b':')) {
            if let Some(close) =
                bytes[i..].windows(2).position(|w| w == b":]")
            {
                i += close + 2;
                continue;
            }
        }
        i += 1;
    }
    let end = if i < bytes.len() { i + 1 } else { i };
    out.push_str(std::str::from_utf8(&bytes[start..end]).unwrap());
    end
}

#[inline]
fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b < 0xE0 => 2,
        b if b < 0xF0 => 3,
        _ => 4,
    }
}
