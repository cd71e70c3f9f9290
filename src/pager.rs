use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;

use log::debug;

use crate::error::StorageError;

pub const PAGE_SIZE: usize = 4096;
pub const MAX_PAGES: usize = 100;

/// Owns the backing file and a write-through cache of up to `MAX_PAGES`
/// pages. Page buffers are populated lazily on first access and kept
/// resident until [`Pager::shutdown`] flushes and drops them.
pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: Vec<Option<Box<[u8; PAGE_SIZE]>>>,
}

impl Pager {
    pub fn open(filename: &str) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(filename)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::CorruptFile);
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        debug!("opened {filename} ({num_pages} page(s), {file_length} bytes)");

        let mut pages = Vec::with_capacity(MAX_PAGES);
        pages.resize_with(MAX_PAGES, || None);

        Ok(Self {
            file,
            file_length,
            num_pages,
            pages,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    fn validate_page_num(page_num: u32) -> Result<(), StorageError> {
        if page_num as usize >= MAX_PAGES {
            return Err(StorageError::PageOutOfBounds(page_num));
        }
        Ok(())
    }

    /// Returns the buffer for `page_num`, reading it from disk on first
    /// access. A short read (page allocated in-memory beyond EOF) leaves
    /// the remainder of the buffer zeroed.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut [u8; PAGE_SIZE], StorageError> {
        Self::validate_page_num(page_num)?;

        if self.pages[page_num as usize].is_none() {
            let mut buffer = Box::new([0u8; PAGE_SIZE]);

            let pages_on_disk = self.file_length.div_ceil(PAGE_SIZE as u64);
            if (page_num as u64) < pages_on_disk {
                debug!("page {page_num} missing from cache, reading from disk");
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read(buffer.as_mut_slice())?;
            }

            self.pages[page_num as usize] = Some(buffer);

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(self.pages[page_num as usize]
            .as_mut()
            .expect("just populated"))
    }

    /// Writes exactly `PAGE_SIZE` bytes of `page_num` to its offset in the
    /// file. Fatal if the slot was never populated.
    pub fn flush(&mut self, page_num: u32) -> Result<(), StorageError> {
        Self::validate_page_num(page_num)?;

        let Some(page) = &self.pages[page_num as usize] else {
            return Err(StorageError::FlushUnpopulatedPage(page_num));
        };

        debug!("flushing page {page_num}");
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    /// The page number the next [`Pager::get_page`] call will materialize
    /// as a fresh, zeroed page. Pages are never recycled.
    pub fn allocate_new_page(&self) -> u32 {
        self.num_pages
    }

    /// Flushes every populated page and releases its buffer, then
    /// durably closes the file. After this call the pager must not be
    /// used again.
    pub fn shutdown(&mut self) -> Result<(), StorageError> {
        let num_pages = self.num_pages;
        for page_num in 0..num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
                self.pages[page_num as usize] = None;
            }
        }
        self.file.sync_all()?;
        debug!("pager shutdown complete ({num_pages} page(s) flushed)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_has_zero_pages() {
        let file = NamedTempFile::new().unwrap();
        let pager = Pager::open(file.path().to_str().unwrap()).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn get_page_materializes_and_counts_new_pages() {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path().to_str().unwrap()).unwrap();

        let page = pager.get_page(0).unwrap();
        page[0] = 42;
        assert_eq!(pager.num_pages(), 1);

        let page = pager.get_page(0).unwrap();
        assert_eq!(page[0], 42, "second fetch returns the same cached buffer");
    }

    #[test]
    fn flush_then_reopen_persists_bytes() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        {
            let mut pager = Pager::open(&path).unwrap();
            let page = pager.get_page(0).unwrap();
            page[3] = 0xAB;
            pager.flush(0).unwrap();
        }

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.get_page(0).unwrap();
        assert_eq!(page[3], 0xAB);
    }

    #[test]
    fn rejects_page_number_at_max_pages() {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(
            pager.get_page(MAX_PAGES as u32),
            Err(StorageError::PageOutOfBounds(_))
        ));
    }

    #[test]
    fn rejects_file_length_not_a_multiple_of_page_size() {
        use std::io::Write as _;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; PAGE_SIZE + 10]).unwrap();
        let err = Pager::open(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::CorruptFile));
    }
}
