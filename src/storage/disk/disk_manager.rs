use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{Result, TarnError};

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a single heap file: a flat run of `page_size` pages with no
/// header, so the page count is always file length / page size.
pub struct DiskManager {
    /// The backing file
    file: Mutex<File>,
    /// Path to the backing file
    path: PathBuf,
    /// Size of every page in the file
    page_size: usize,
    /// Number of pages currently in the file
    num_pages: AtomicU32,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it if it doesn't exist.
    /// A trailing partial page is ignored.
    pub fn new<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(TarnError::InvalidArgument("page size must be positive".into()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / page_size as u64) as u32;

        Ok(Self {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            page_size,
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads page `page_no` into `data`, which must be exactly one page long.
    pub fn read_page(&self, page_no: u32, data: &mut [u8]) -> Result<()> {
        self.check_len(data.len())?;

        let num_pages = self.num_pages();
        if page_no >= num_pages {
            return Err(TarnError::InvalidPageNumber { page_no, num_pages });
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data` as page `page_no`. Writing at or past the end grows the
    /// page count to `page_no + 1`.
    pub fn write_page(&self, page_no: u32, data: &[u8]) -> Result<()> {
        self.check_len(data.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_pages.fetch_max(page_no + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of pages currently in the file.
    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    /// Returns the page size this file was opened with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of disk reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }

    fn offset(&self, page_no: u32) -> u64 {
        page_no as u64 * self.page_size as u64
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.page_size {
            return Err(TarnError::InvalidArgument(format!(
                "page buffer is {} bytes, expected {}",
                len, self.page_size
            )));
        }
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        // Ensure all data is flushed to disk
        let file = self.file.get_mut();
        let _ = file.sync_all();
    }
}
