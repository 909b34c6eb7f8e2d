/*!
Выровненный по страницам скользящий буфер чтения.

Замысел буферизации: держать все чтения выровненными на границу страницы и
кратными её размеру. Передняя часть буфера — область сохранения — принимает
байты, переносимые между дозаполнениями: незавершённую последнюю строку
(остаток) и строки опережающего контекста. Остальная часть заполняется из
файла либо отображением в память прямо в выровненное окно (нулевое
копирование), либо обычным `read`.
*/

use std::{
    fs::File,
    io::{self, Read, Seek},
};

/// Предпочитаемое отношение полного размера буфера к области сохранения.
const PREFERRED_SAVE_FACTOR: usize = 5;

/// Нижняя граница области сохранения до выравнивания по странице.
const MIN_SAVE_REGION: usize = 8 * (1 << 10); // 8 КБ

/// Вернуть `val`, округлённое вверх до кратного `alignment`.
#[inline]
fn align_to(val: usize, alignment: usize) -> usize {
    match val % alignment {
        0 => val,
        rem => val + (alignment - rem),
    }
}

fn out_of_memory() -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, "memory exhausted")
}

/// Непрерывная выровненная по страницам область памяти.
///
/// На Unix это анонимное приватное отображение: адрес выровнен по странице
/// самой системой, и поверх него можно класть файловые страницы через
/// `MAP_FIXED`. На остальных платформах — выровненное выделение из кучи,
/// и путь отображения файлов отключён.
#[derive(Debug)]
struct Region {
    base: *mut u8,
    /// Размер области в байтах; всегда кратен размеру страницы и хотя бы
    /// на один байт больше запрошенного: последний байт зарезервирован под
    /// сентинел (см. `PageBuffer::push_sentinel`).
    len: usize,
}

impl Region {
    #[cfg(unix)]
    fn alloc(size: usize, page_size: usize) -> io::Result<Region> {
        let len = align_to(size.checked_add(1).ok_or_else(out_of_memory)?,
            page_size);
        // SAFETY: анонимное отображение с выбранным системой адресом; при
        // неудаче возвращается MAP_FAILED, а не мусорный указатель.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(out_of_memory());
        }
        Ok(Region { base: ptr as *mut u8, len })
    }

    #[cfg(not(unix))]
    fn alloc(size: usize, page_size: usize) -> io::Result<Region> {
        let len = align_to(size.checked_add(1).ok_or_else(out_of_memory)?,
            page_size);
        let layout = std::alloc::Layout::from_size_align(len, page_size)
            .map_err(|_| out_of_memory())?;
        // SAFETY: len ненулевой, layout валиден.
        let ptr = unsafe { std::alloc::alloc(layout) };
        if ptr.is_null() {
            return Err(out_of_memory());
        }
        Ok(Region { base: ptr, len })
    }

    fn release(self, page_size: usize) {
        #[cfg(unix)]
        {
            let _ = page_size;
            // SAFETY: область была получена из mmap с этими же адресом и
            // длиной; один munmap снимает и анонимные, и наложенные
            // MAP_FIXED файловые страницы.
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, self.len);
            }
        }
        #[cfg(not(unix))]
        {
            let layout =
                std::alloc::Layout::from_size_align(self.len, page_size)
                    .unwrap();
            // SAFETY: парный вызов к alloc выше.
            unsafe { std::alloc::dealloc(self.base, layout) }
        }
    }

    #[inline]
    fn slice(&self, start: usize, end: usize) -> &[u8] {
        debug_assert!(start <= end && end <= self.len);
        // SAFETY: диапазон лежит внутри области.
        unsafe {
            std::slice::from_raw_parts(self.base.add(start), end - start)
        }
    }

    #[inline]
    fn slice_mut(&mut self, start: usize, end: usize) -> &mut [u8] {
        debug_assert!(start <= end && end <= self.len);
        // SAFETY: диапазон лежит внутри области; эксклюзивное заимствование.
        unsafe {
            std::slice::from_raw_parts_mut(self.base.add(start), end - start)
        }
    }
}

/// Скользящий буфер чтения с выровненным по страницам окном.
///
/// Буфер создаётся один раз на процесс и переиспользуется для всех файлов;
/// выделение живёт до конца процесса. Видимое окно `[begin, end)` всегда
/// удовлетворяет `begin <= end <= total_size`, а `begin` после каждого
/// дозаполнения указывает на начало сохранённого хвоста.
#[derive(Debug)]
pub(crate) struct PageBuffer {
    /// Размер страницы; узнаётся при первом `reset`.
    page_size: usize,
    /// Размер области сохранения; кратен размеру страницы.
    save_size: usize,
    /// Полный размер буфера; стремится к `PREFERRED_SAVE_FACTOR * save_size`.
    total_size: usize,
    region: Option<Region>,
    /// Смещение начала видимого окна от базы.
    begin: usize,
    /// Смещение конца видимого окна от базы.
    end: usize,
    /// Смещение файла, по которому случится следующее сырое чтение.
    file_offset: u64,
    /// Значение `file_offset` на момент `reset`; нужно, чтобы понять,
    /// дрейфовала ли позиция дескриптора при откате с mmap на read.
    initial_offset: u64,
    /// Использовать ли отображение в память для текущего файла.
    mmapped: bool,
    is_regular: bool,
    file_size: u64,
}

impl PageBuffer {
    pub(crate) fn new() -> PageBuffer {
        PageBuffer {
            page_size: 0,
            save_size: 0,
            total_size: 0,
            region: None,
            begin: 0,
            end: 0,
            file_offset: 0,
            initial_offset: 0,
            mmapped: false,
            is_regular: false,
            file_size: 0,
        }
    }

    /// Подготовить буфер к чтению нового файла.
    ///
    /// При первом вызове узнаёт размер страницы и выделяет область; при
    /// последующих переиспользует её, заново выводя размер области
    /// сохранения из полного размера. `at_current_offset` указывает, что
    /// дескриптор не был только что открыт (стандартный ввод): для
    /// регулярного файла тогда запоминается текущая позиция, чтобы её можно
    /// было восстановить при раннем выходе.
    pub(crate) fn reset(
        &mut self,
        file: &File,
        at_current_offset: bool,
        mmap_requested: bool,
    ) -> io::Result<()> {
        if self.region.is_none() {
            self.page_size = discover_page_size();
            self.save_size = align_to(
                std::cmp::max(MIN_SAVE_REGION, self.page_size),
                self.page_size,
            );
            self.total_size = self
                .save_size
                .checked_mul(PREFERRED_SAVE_FACTOR)
                .ok_or_else(out_of_memory)?;
            self.region =
                Some(Region::alloc(self.total_size, self.page_size)?);
        } else {
            self.save_size = align_to(
                self.total_size / PREFERRED_SAVE_FACTOR,
                self.page_size,
            );
        }
        self.begin = 0;
        self.end = 0;

        let md = file.metadata()?;
        self.is_regular = md.is_file();
        self.file_size = md.len();
        self.file_offset = 0;
        self.mmapped = false;
        if self.is_regular {
            if at_current_offset {
                self.file_offset = (&*file).stream_position()?;
            }
            self.initial_offset = self.file_offset;
            self.mmapped = cfg!(unix)
                && mmap_requested
                && self.file_offset % self.page_size as u64 == 0;
        }
        Ok(())
    }

    /// Видимое окно буфера.
    #[inline]
    pub(crate) fn window(&self) -> &[u8] {
        match self.region {
            None => &[],
            Some(ref r) => r.slice(self.begin, self.end),
        }
    }

    /// Смещение файла, по которому случится следующее чтение.
    ///
    /// По достижении конца файла это полное количество прочитанных байтов.
    #[inline]
    pub(crate) fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Возвращает true, если текущий файл читается отображением в память.
    #[inline]
    pub(crate) fn mmap_active(&self) -> bool {
        self.mmapped
    }

    /// Является ли текущий вход регулярным файлом.
    #[inline]
    pub(crate) fn is_regular(&self) -> bool {
        self.is_regular
    }

    /// Сколько байтов прошло через буфер с момента `reset`.
    #[inline]
    pub(crate) fn bytes_consumed(&self) -> u64 {
        self.file_offset - self.initial_offset
    }

    /// Дописать байт-сентинел сразу за концом окна.
    ///
    /// Область всегда резервирует хотя бы один адресуемый байт за
    /// `total_size`, поэтому место гарантировано. Используется один раз на
    /// файл, чтобы завершить неполную последнюю строку.
    pub(crate) fn push_sentinel(&mut self, eol_byte: u8) {
        let end = self.end;
        let region = self.region.as_mut().expect("buffer is allocated");
        assert!(end < region.len);
        region.slice_mut(end, end + 1)[0] = eol_byte;
        self.end += 1;
    }

    /// Дозаполнить буфер, сохранив последние `save` байтов окна в передней
    /// части.
    ///
    /// После возврата `begin` указывает на начало сохранённого хвоста, а
    /// `end` — за последний свежепрочитанный байт. Конец файла различим по
    /// тому, что длина окна равна `save`.
    pub(crate) fn fill(
        &mut self,
        file: &File,
        save: usize,
    ) -> io::Result<()> {
        assert!(save <= self.end - self.begin);
        if self.save_size < save {
            self.grow(save)?;
        }

        // Подтянуть сохраняемый хвост к границе области сохранения.
        let save_start = self.end - save;
        let dst = self.save_size - save;
        if save > 0 && save_start != dst {
            let region = self.region.as_mut().expect("buffer is allocated");
            let total = region.len;
            region
                .slice_mut(0, total)
                .copy_within(save_start..save_start + save, dst);
        }

        let readsize = self.total_size - self.save_size;
        let mut fillsize = 0;
        if self.mmapped {
            fillsize = self.fill_mmap(file, readsize)?;
        }
        if fillsize == 0 {
            fillsize = self.fill_read(file, readsize)?;
        }

        self.file_offset += fillsize as u64;
        self.begin = self.save_size - save;
        self.end = self.save_size + fillsize;
        Ok(())
    }

    /// Попытаться отобразить очередной кусок файла прямо в окно чтения.
    ///
    /// Возвращает число полученных байтов; `0` означает «возьмите `read`».
    /// Любая неудача отключает mmap для файла до конца сканирования и
    /// синхронизирует позицию дескриптора, если она разъехалась. О неудачах
    /// не предупреждаем: на некоторых системах mmap отказывает из-за чужой
    /// рекомендательной блокировки файла.
    #[cfg(unix)]
    fn fill_mmap(&mut self, file: &File, readsize: usize) -> io::Result<usize> {
        use std::os::unix::io::AsRawFd;

        let mut mmapsize = readsize;
        let left = self.file_size.saturating_sub(self.file_offset);
        // Не отображать за концом файла; последнюю неполную страницу
        // дочитает read.
        if left < mmapsize as u64 {
            mmapsize = left as usize;
            mmapsize -= mmapsize % self.page_size;
        }
        if mmapsize > 0 {
            let region = self.region.as_ref().expect("buffer is allocated");
            // SAFETY: адрес назначения выровнен по странице (база выровнена,
            // save_size кратен странице), диапазон лежит внутри нашей же
            // области, так что MAP_FIXED замещает только собственные
            // страницы.
            let ptr = unsafe {
                libc::mmap(
                    region.base.add(self.save_size) as *mut libc::c_void,
                    mmapsize,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_FIXED,
                    file.as_raw_fd(),
                    self.file_offset as libc::off_t,
                )
            };
            if ptr != libc::MAP_FAILED {
                return Ok(mmapsize);
            }
        }
        self.mmapped = false;
        if self.file_offset != self.initial_offset {
            (&*file).seek(io::SeekFrom::Start(self.file_offset))?;
        }
        Ok(0)
    }

    #[cfg(not(unix))]
    fn fill_mmap(
        &mut self,
        _file: &File,
        _readsize: usize,
    ) -> io::Result<usize> {
        self.mmapped = false;
        Ok(0)
    }

    fn fill_read(&mut self, file: &File, readsize: usize) -> io::Result<usize> {
        let start = self.save_size;
        let region = self.region.as_mut().expect("buffer is allocated");
        let buf = region.slice_mut(start, start + readsize);
        loop {
            match (&*file).read(buf) {
                Ok(n) => return Ok(n),
                Err(ref err)
                    if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Увеличить область сохранения так, чтобы в неё поместился `save`.
    ///
    /// Область удваивается до достаточного размера, а полный буфер
    /// поддерживается в `PREFERRED_SAVE_FACTOR` раз больше неё, но для
    /// регулярных файлов не больше, чем выровненный остаток файла плюс
    /// область сохранения: нет смысла раздувать буфер сильно за размер
    /// файла.
    fn grow(&mut self, save: usize) -> io::Result<()> {
        let aligned_save = align_to(save, self.page_size);
        let mut maxalloc = usize::MAX;
        if self.is_regular {
            let to_be_read =
                self.file_size.saturating_sub(self.file_offset);
            let aligned_to_be_read =
                align_to_u64(to_be_read, self.page_size as u64);
            maxalloc = usize::try_from(aligned_to_be_read)
                .ok()
                .and_then(|n| n.checked_add(aligned_save))
                .unwrap_or(usize::MAX);
        }

        let mut new_save = self.save_size;
        while new_save < save {
            match new_save.checked_mul(2) {
                Some(doubled) => new_save = doubled,
                None => {
                    new_save = aligned_save;
                    break;
                }
            }
        }
        let mut newalloc = new_save
            .checked_mul(PREFERRED_SAVE_FACTOR)
            .unwrap_or(usize::MAX);
        if maxalloc < newalloc {
            newalloc = maxalloc;
            new_save = aligned_save;
        }
        if new_save < save || newalloc < save {
            return Err(out_of_memory());
        }
        self.save_size = new_save;

        if self.total_size < newalloc {
            let mut new_region = Region::alloc(newalloc, self.page_size)?;
            let old_region =
                self.region.take().expect("buffer is allocated");
            // Хвост ещё лежит по старым смещениям; перенести до
            // освобождения старой области.
            let save_start = self.end - save;
            new_region
                .slice_mut(0, save)
                .copy_from_slice(old_region.slice(save_start, self.end));
            self.begin = 0;
            self.end = save;
            old_region.release(self.page_size);
            self.region = Some(new_region);
            self.total_size = newalloc;
        }
        Ok(())
    }
}

#[inline]
fn align_to_u64(val: u64, alignment: u64) -> u64 {
    match val % alignment {
        0 => val,
        rem => val.saturating_add(alignment - rem),
    }
}

#[cfg(unix)]
fn discover_page_size() -> usize {
    // SAFETY: sysconf с валидным именем параметра.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if n <= 0 { 4096 } else { n as usize }
}

#[cfg(not(unix))]
fn discover_page_size() -> usize {
    4096
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use bstr::ByteSlice;

    use super::*;

    fn tmpfile(contents: &[u8]) -> File {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        (&f).seek(io::SeekFrom::Start(0)).unwrap();
        f
    }

    /// Прочитать файл целиком через буфер, перенося между дозаполнениями
    /// `save` последних байтов, и вернуть конкатенацию свежих кусков.
    fn drain(buf: &mut PageBuffer, file: &File, mmap: bool) -> Vec<u8> {
        buf.reset(file, false, mmap).unwrap();
        let mut out = vec![];
        let mut save = 0;
        loop {
            buf.fill(file, save).unwrap();
            let window = buf.window();
            if window.len() == save {
                break;
            }
            out.extend_from_slice(&window[save..]);
            save = 0;
        }
        out
    }

    #[test]
    fn read_small() {
        let file = tmpfile(b"homer\nlisa\nmaggie\n");
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &file, false), b"homer\nlisa\nmaggie\n");
        assert_eq!(buf.file_offset(), 18);
    }

    #[test]
    fn read_empty() {
        let file = tmpfile(b"");
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &file, false), b"");
        assert_eq!(buf.file_offset(), 0);
    }

    #[test]
    fn read_large_multiple_fills() {
        let mut contents = vec![];
        for i in 0..20_000 {
            contents.extend_from_slice(format!("line {}\n", i).as_bytes());
        }
        let file = tmpfile(&contents);
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &file, false), contents);
    }

    #[cfg(unix)]
    #[test]
    fn mmap_equivalent_to_read() {
        let mut contents = vec![];
        for i in 0..20_000 {
            contents.extend_from_slice(format!("line {}\n", i).as_bytes());
        }
        let file = tmpfile(&contents);
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &file, true), contents);
    }

    #[cfg(unix)]
    #[test]
    fn mmap_page_multiple_file() {
        // Размер ровно в страницу: отображение покрывает весь файл, а
        // следующий fill должен увидеть конец файла через read.
        let contents = vec![b'x'; 4096];
        let file = tmpfile(&contents);
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &file, true), contents);
    }

    #[test]
    fn save_region_carries_tail() {
        let file = tmpfile(b"abc\ndef\ng");
        let mut buf = PageBuffer::new();
        buf.reset(&file, false, false).unwrap();
        buf.fill(&file, 0).unwrap();
        assert_eq!(buf.window().as_bstr(), b"abc\ndef\ng".as_bstr());

        // Перенести остаток "g" и дочитать: файл уже пуст, окно — один
        // лишь сохранённый хвост.
        buf.fill(&file, 1).unwrap();
        assert_eq!(buf.window().as_bstr(), b"g".as_bstr());
    }

    #[test]
    fn sentinel_append() {
        let file = tmpfile(b"no newline at end");
        let mut buf = PageBuffer::new();
        buf.reset(&file, false, false).unwrap();
        buf.fill(&file, 0).unwrap();
        let len = buf.window().len();
        buf.push_sentinel(b'\n');
        assert_eq!(buf.window().len(), len + 1);
        assert_eq!(buf.window().last(), Some(&b'\n'));
    }

    #[test]
    fn grow_for_long_line() {
        // Одна строка заметно больше стартовой области сохранения: fill с
        // большим save обязан расширить буфер, сохранив хвост байт в байт.
        let mut contents = vec![b'a'; 100_000];
        contents.push(b'\n');
        let file = tmpfile(&contents);
        let mut buf = PageBuffer::new();
        buf.reset(&file, false, false).unwrap();

        buf.fill(&file, 0).unwrap();
        let mut save = buf.window().len();
        loop {
            buf.fill(&file, save).unwrap();
            if buf.window().len() == save {
                break;
            }
            save = buf.window().len();
        }
        assert_eq!(buf.window(), &contents[..]);
    }

    #[test]
    fn reuse_across_files() {
        let first = tmpfile(b"first\n");
        let second = tmpfile(b"second\n");
        let mut buf = PageBuffer::new();
        assert_eq!(drain(&mut buf, &first, false), b"first\n");
        assert_eq!(drain(&mut buf, &second, false), b"second\n");
    }

    #[test]
    fn stdin_like_records_current_offset() {
        let file = tmpfile(b"0123456789");
        (&file).seek(io::SeekFrom::Start(4)).unwrap();
        let mut buf = PageBuffer::new();
        buf.reset(&file, true, false).unwrap();
        assert_eq!(buf.file_offset(), 4);
        buf.fill(&file, 0).unwrap();
        assert_eq!(buf.window(), b"456789");
        assert_eq!(buf.file_offset(), 10);
    }
}
