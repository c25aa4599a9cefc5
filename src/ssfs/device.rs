//! The block device port.
//!
//! This is the thin contract the core consumes: a fixed-size array of
//! 1024-byte sectors that can be opened, read, written and synced.
//! [`FileBlockDevice`] is the concrete implementation backing that contract
//! with a regular file and plain `Seek`/`Read`/`Write`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::BLOCK_SIZE;

/// A fixed-size array of 1024-byte sectors.
///
/// Implementations are free to back this however they like; the only
/// requirement the core relies on is that `read_block`/`write_block` are
/// atomic at block granularity from its perspective, and that
/// `sector_count()` does not change for the lifetime of the handle.
pub trait BlockDevice {
    /// Number of 1024-byte sectors on the device.
    fn sector_count(&self) -> u32;

    /// Reads sector `index` into `buf`.
    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes `buf` into sector `index`.
    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()>;

    /// Forces durability of everything written so far.
    fn sync(&mut self) -> Result<()>;
}

/// A [`BlockDevice`] backed by a regular file, whose length in 1024-byte
/// units defines the device's block count.
pub struct FileBlockDevice {
    file: File,
    path: PathBuf,
    sector_count: u32,
}

impl FileBlockDevice {
    /// Creates a new backing file of exactly `num_blocks` sectors, all
    /// zeroed, and opens it.
    pub fn create(path: impl AsRef<Path>, num_blocks: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(num_blocks as u64 * BLOCK_SIZE as u64)?;
        file.flush()?;
        Ok(Self {
            file,
            path,
            sector_count: num_blocks,
        })
    }

    /// Opens an existing backing file; its block count is derived from its
    /// length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        let sector_count = (len / BLOCK_SIZE as u64) as u32;
        Ok(Self {
            file,
            path,
            sector_count,
        })
    }

    /// The path this device was opened or created from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileBlockDevice {
    fn sector_count(&self) -> u32 {
        self.sector_count
    }

    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::temp_path;

    #[test]
    fn create_then_read_write() {
        let path = temp_path("device");
        let mut dev = FileBlockDevice::create(&path, 8).unwrap();
        assert_eq!(dev.sector_count(), 8);

        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        dev.write_block(3, &block).unwrap();
        dev.sync().unwrap();

        let mut read_back = [0u8; BLOCK_SIZE];
        dev.read_block(3, &mut read_back).unwrap();
        assert_eq!(read_back[0], 0xAB);

        // Untouched blocks are zeroed by `create`.
        let mut other = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut other).unwrap();
        assert_eq!(other, [0u8; BLOCK_SIZE]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_derives_sector_count_from_length() {
        let path = temp_path("reopen");
        {
            FileBlockDevice::create(&path, 5).unwrap();
        }
        let dev = FileBlockDevice::open(&path).unwrap();
        assert_eq!(dev.sector_count(), 5);
        let _ = std::fs::remove_file(&path);
    }
}
