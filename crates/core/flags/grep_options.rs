/*!
Разбор переменной окружения `GREP_OPTIONS`.

Её содержимое разбивается по пробельным символам и приписывается перед
настоящими аргументами командной строки. Обратная косая черта экранирует
следующий символ, позволяя включать пробелы и сами косые черты в один
токен.
*/

use std::ffi::OsString;

/// Вернуть токены из `GREP_OPTIONS`, если переменная установлена.
pub(crate) fn from_env() -> Vec<OsString> {
    match std::env::var_os("GREP_OPTIONS") {
        None => vec![],
        Some(v) => split(&v.to_string_lossy()),
    }
}

/// Разбить строку опций на токены.
fn split(options: &str) -> Vec<OsString> {
    let mut tokens = vec![];
    let mut chars = options.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return tokens;
        }
        let mut token = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '\\' {
                match chars.next() {
                    Some(escaped) => token.push(escaped),
                    None => token.push('\\'),
                }
            } else {
                token.push(c);
            }
        }
        tokens.push(OsString::from(token));
    }
}
