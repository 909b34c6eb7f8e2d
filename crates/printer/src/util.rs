use std::{borrow::Cow, path::Path};

/// Десятичная запись числа в стековом буфере.
///
/// Смещения и номера строк печатаются на каждой выводимой строке, и
/// обходиться без выделений из кучи здесь заметно дешевле `format!`.
/// Цифры набираются младшими разрядами вперёд и разворачиваются на месте.
#[derive(Debug)]
pub(crate) struct Decimal {
    /// Хватает на любое значение `u64`.
    buf: [u8; 20],
    len: usize,
}

impl Decimal {
    pub(crate) fn new(mut n: u64) -> Decimal {
        let mut buf = [0u8; 20];
        let mut len = 0;
        loop {
            buf[len] = b'0' + (n % 10) as u8;
            len += 1;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        buf[..len].reverse();
        Decimal { buf, len }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Представить путь в виде байтов для вывода.
///
/// На Unix это точные байты пути; на остальных платформах — его строковое
/// представление с заменой невалидных последовательностей.
pub fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(path.as_os_str().as_bytes())
    }
    #[cfg(not(unix))]
    {
        match path.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(n: u64) -> String {
        String::from_utf8(Decimal::new(n).as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn decimal() {
        assert_eq!(fmt(0), "0");
        assert_eq!(fmt(7), "7");
        assert_eq!(fmt(10), "10");
        assert_eq!(fmt(909), "909");
        assert_eq!(fmt(12345678901234567890), "12345678901234567890");
        assert_eq!(fmt(u64::MAX), u64::MAX.to_string());
    }
}
