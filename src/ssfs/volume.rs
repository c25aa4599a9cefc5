//! `Volume<D>`: the mounted-filesystem façade over a [`BlockDevice`]. This is
//! the explicit, testable value the process-wide `session` module wraps;
//! kept separate so the core logic can be exercised directly in tests
//! without going through global state.

use crate::bitmap::Bitmap;
use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::inode::{self, Inode};
use crate::superblock::Superblock;
use crate::{tree, BLOCK_SIZE};

/// Per-file metadata returned by [`Volume::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub size: u32,
}

/// A mounted SSFS volume over a concrete [`BlockDevice`].
pub struct Volume<D: BlockDevice> {
    dev: D,
    sb: Superblock,
    bitmap: Bitmap,
}

impl<D: BlockDevice> Volume<D> {
    /// Writes a fresh superblock and a zeroed inode table across `dev`,
    /// discarding any data already on it. `requested_inodes` is clamped to at
    /// least 1 and rounded up to whole inode blocks; the device must already
    /// be sized to the volume's intended capacity — this opens it, it does
    /// not create or resize it. `dev` is consumed and not returned: callers
    /// mount the freshly formatted device afterward.
    pub fn format(mut dev: D, requested_inodes: u32) -> Result<()> {
        let requested_inodes = requested_inodes.max(1);
        let num_inode_blocks =
            (requested_inodes + crate::INODES_PER_BLOCK as u32 - 1) / crate::INODES_PER_BLOCK as u32;
        let num_blocks = dev.sector_count();
        if num_inode_blocks + 1 >= num_blocks {
            return Err(Error::OutOfSpace);
        }

        let sb = Superblock {
            num_blocks,
            num_inode_blocks,
            block_size: BLOCK_SIZE as u32,
        };
        dev.write_block(0, &sb.encode())?;

        let zero_block = [0u8; BLOCK_SIZE];
        for b in 1..=num_inode_blocks {
            dev.write_block(b, &zero_block)?;
        }
        dev.sync()
    }

    /// Mounts `dev`: reads and validates the superblock, then rebuilds the
    /// free-space bitmap by walking every valid inode.
    pub fn mount(mut dev: D) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut buf)?;
        let sb = Superblock::decode(&buf)?;
        let bitmap = Bitmap::reconstruct(&mut dev, &sb)?;
        Ok(Self { dev, sb, bitmap })
    }

    /// Flushes pending writes and releases the device.
    pub fn unmount(mut self) -> Result<D> {
        self.dev.sync()?;
        Ok(self.dev)
    }

    fn data_start(&self) -> u32 {
        1 + self.sb.num_inode_blocks
    }

    /// Allocates the first free inode slot, marking it valid with size `0`
    /// and no blocks.
    pub fn create(&mut self) -> Result<u32> {
        let capacity = inode::capacity(&self.sb);
        for i in 0..capacity {
            let node = inode::read(&mut self.dev, &self.sb, i)?;
            if !node.valid {
                let fresh = Inode {
                    valid: true,
                    size: 0,
                    direct: [0; 4],
                    indirect: 0,
                    double_indirect: 0,
                };
                inode::write(&mut self.dev, &self.sb, i, &fresh)?;
                return Ok(i);
            }
        }
        Err(Error::OutOfInodes)
    }

    /// Frees inode `i` and returns every block it owned to the free map.
    /// The inode's pointer blocks are freed too, not just its leaves.
    pub fn delete(&mut self, i: u32) -> Result<()> {
        let node = self.load_valid(i)?;

        for &ptr in &node.direct {
            if ptr != 0 {
                self.bitmap.mark_free(ptr);
            }
        }
        if node.indirect != 0 {
            let ptrs = crate::bitmap::read_pointer_block(&mut self.dev, node.indirect)?;
            for ptr in ptrs {
                if ptr != 0 {
                    self.bitmap.mark_free(ptr);
                }
            }
            self.bitmap.mark_free(node.indirect);
        }
        if node.double_indirect != 0 {
            let outer = crate::bitmap::read_pointer_block(&mut self.dev, node.double_indirect)?;
            for indirect in outer {
                if indirect == 0 {
                    continue;
                }
                let inner = crate::bitmap::read_pointer_block(&mut self.dev, indirect)?;
                for ptr in inner {
                    if ptr != 0 {
                        self.bitmap.mark_free(ptr);
                    }
                }
                self.bitmap.mark_free(indirect);
            }
            self.bitmap.mark_free(node.double_indirect);
        }

        inode::write(&mut self.dev, &self.sb, i, &Inode::default())
    }

    /// Reports inode `i`'s length.
    pub fn stat(&mut self, i: u32) -> Result<Stat> {
        let node = self.load_valid(i)?;
        Ok(Stat { size: node.size })
    }

    /// Reads up to `buf.len()` bytes of inode `i` starting at `offset`,
    /// returning the number actually read. Reading stops early, without
    /// error, the first time a logical block turns out to be a hole — a
    /// hole mid-file is not zero-filled on read. A device failure mid-stream
    /// returns whatever was already copied instead of an error, provided at
    /// least one byte moved.
    pub fn read(&mut self, i: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut node = self.load_valid(i)?;
        let available = (node.size as u64).saturating_sub(offset);
        let effective = available.min(buf.len() as u64) as usize;
        if effective == 0 {
            return Ok(0);
        }

        let mut done = 0;
        while done < effective {
            let file_pos = offset + done as u64;
            let logical_block = file_pos / BLOCK_SIZE as u64;
            let in_block_off = (file_pos % BLOCK_SIZE as u64) as usize;

            let physical = match tree::resolve(
                &mut self.dev,
                &mut self.bitmap,
                &mut node,
                logical_block,
                false,
                self.data_start(),
            ) {
                Ok(p) => p,
                Err(e) => return if done > 0 { Ok(done) } else { Err(e) },
            };
            if physical == 0 {
                break;
            }

            let mut block = [0u8; BLOCK_SIZE];
            if let Err(e) = self.dev.read_block(physical, &mut block) {
                return if done > 0 { Ok(done) } else { Err(e) };
            }
            let chunk = (BLOCK_SIZE - in_block_off).min(effective - done);
            buf[done..done + chunk].copy_from_slice(&block[in_block_off..in_block_off + chunk]);
            done += chunk;
        }
        Ok(done)
    }

    /// Writes `data` into inode `i` starting at `offset`. If `offset` is past
    /// the current size, a sparse-fill phase first allocates and zero-fills
    /// every block in between and persists the grown size; the data phase
    /// then writes `data`, read-modify-write for any block it only partially
    /// covers. A failure in either phase persists whatever size was reached
    /// before returning — the sparse-fill phase returns the error directly
    /// (there's nothing to report as "written" in that phase), the data
    /// phase returns bytes-written-so-far if any moved, else the error.
    pub fn write(&mut self, i: u32, offset: u64, data: &[u8]) -> Result<usize> {
        if offset > tree::MAX_LOGICAL_BLOCK * BLOCK_SIZE as u64 {
            return Err(Error::InvalidOffset);
        }
        let mut node = self.load_valid(i)?;

        if offset > node.size as u64 {
            let mut pos = node.size as u64;
            while pos < offset {
                let logical_block = pos / BLOCK_SIZE as u64;
                if let Err(e) = tree::resolve(
                    &mut self.dev,
                    &mut self.bitmap,
                    &mut node,
                    logical_block,
                    true,
                    self.data_start(),
                ) {
                    node.size = pos as u32;
                    let _ = inode::write(&mut self.dev, &self.sb, i, &node);
                    return Err(e);
                }
                pos = (logical_block + 1) * BLOCK_SIZE as u64;
            }
            node.size = offset as u32;
            inode::write(&mut self.dev, &self.sb, i, &node)?;
        }

        let mut done = 0usize;
        while done < data.len() {
            let file_pos = offset + done as u64;
            let logical_block = file_pos / BLOCK_SIZE as u64;
            let in_block_off = (file_pos % BLOCK_SIZE as u64) as usize;

            let physical = match tree::resolve(
                &mut self.dev,
                &mut self.bitmap,
                &mut node,
                logical_block,
                true,
                self.data_start(),
            ) {
                Ok(p) => p,
                Err(e) => return self.bail_mid_write(&mut node, i, offset, done, e),
            };

            let chunk = (BLOCK_SIZE - in_block_off).min(data.len() - done);
            let write_result = if in_block_off == 0 && chunk == BLOCK_SIZE {
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(&data[done..done + chunk]);
                self.dev.write_block(physical, &block)
            } else {
                let mut block = [0u8; BLOCK_SIZE];
                self.dev.read_block(physical, &mut block).and_then(|()| {
                    block[in_block_off..in_block_off + chunk].copy_from_slice(&data[done..done + chunk]);
                    self.dev.write_block(physical, &block)
                })
            };

            if let Err(e) = write_result {
                return self.bail_mid_write(&mut node, i, offset, done, e);
            }
            done += chunk;
        }

        node.size = node.size.max((offset + done as u64) as u32);
        inode::write(&mut self.dev, &self.sb, i, &node)?;
        Ok(done)
    }

    /// Shared mid-write failure path: persist whatever size was reached, then
    /// report bytes-written-so-far if any moved, else the error itself.
    fn bail_mid_write(&mut self, node: &mut Inode, i: u32, offset: u64, done: usize, e: Error) -> Result<usize> {
        if done > 0 {
            node.size = node.size.max((offset + done as u64) as u32);
            let _ = inode::write(&mut self.dev, &self.sb, i, node);
            Ok(done)
        } else {
            Err(e)
        }
    }

    fn load_valid(&mut self, i: u32) -> Result<Inode> {
        let node = inode::read(&mut self.dev, &self.sb, i)?;
        if !node.valid {
            return Err(Error::InvalidInode);
        }
        Ok(node)
    }

    /// The volume's superblock, for diagnostics.
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }
}
