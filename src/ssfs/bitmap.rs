//! The in-memory free-space map. Never persisted; rebuilt fresh on every
//! mount by walking every valid inode's block-pointer tree.

use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::inode::{self, Inode};
use crate::superblock::Superblock;
use crate::{BLOCK_SIZE, POINTERS_PER_BLOCK};

/// Tracks which blocks are in use, indexed by block number.
pub struct Bitmap {
    used: Vec<bool>,
}

impl Bitmap {
    /// Marks block `b` as used.
    pub fn mark_used(&mut self, b: u32) {
        self.used[b as usize] = true;
    }

    /// Marks block `b` as free.
    pub fn mark_free(&mut self, b: u32) {
        self.used[b as usize] = false;
    }

    /// Whether block `b` is currently in use.
    pub fn is_used(&self, b: u32) -> bool {
        self.used[b as usize]
    }

    /// Scans from `start` upward for the first free block.
    pub fn find_first_free_from(&self, start: u32) -> Result<u32> {
        (start as usize..self.used.len())
            .find(|&i| !self.used[i])
            .map(|i| i as u32)
            .ok_or(Error::OutOfSpace)
    }

    /// Rebuilds the bitmap by marking the superblock and inode table blocks
    /// used, then walking every valid inode's direct, single- and
    /// double-indirect pointers. Any read failure aborts the reconstruction
    /// and propagates the error, leaving no partial bitmap behind.
    pub fn reconstruct<D: BlockDevice>(dev: &mut D, sb: &Superblock) -> Result<Self> {
        let mut bitmap = Bitmap {
            used: vec![false; sb.num_blocks as usize],
        };
        for b in 0..=sb.num_inode_blocks {
            bitmap.mark_used(b);
        }

        let capacity = inode::capacity(sb);
        for i in 0..capacity {
            let node = inode::read(dev, sb, i)?;
            if !node.valid {
                continue;
            }
            bitmap.mark_inode_tree(dev, &node)?;
        }

        Ok(bitmap)
    }

    fn mark_inode_tree<D: BlockDevice>(&mut self, dev: &mut D, node: &Inode) -> Result<()> {
        for &ptr in &node.direct {
            if ptr != 0 {
                self.mark_used(ptr);
            }
        }

        if node.indirect != 0 {
            self.mark_used(node.indirect);
            let ptrs = read_pointer_block(dev, node.indirect)?;
            for ptr in ptrs {
                if ptr != 0 {
                    self.mark_used(ptr);
                }
            }
        }

        if node.double_indirect != 0 {
            self.mark_used(node.double_indirect);
            let outer = read_pointer_block(dev, node.double_indirect)?;
            for indirect in outer {
                if indirect == 0 {
                    continue;
                }
                self.mark_used(indirect);
                let inner = read_pointer_block(dev, indirect)?;
                for ptr in inner {
                    if ptr != 0 {
                        self.mark_used(ptr);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reads a block and reinterprets it as 256 little-endian `u32` pointers.
pub fn read_pointer_block<D: BlockDevice>(dev: &mut D, block: u32) -> Result<[u32; POINTERS_PER_BLOCK]> {
    let mut buf = [0u8; BLOCK_SIZE];
    dev.read_block(block, &mut buf)?;
    let mut ptrs = [0u32; POINTERS_PER_BLOCK];
    for (i, ptr) in ptrs.iter_mut().enumerate() {
        *ptr = u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
    }
    Ok(ptrs)
}

/// Encodes 256 pointers back into a block.
pub fn write_pointer_block(ptrs: &[u32; POINTERS_PER_BLOCK]) -> [u8; BLOCK_SIZE] {
    let mut buf = [0u8; BLOCK_SIZE];
    for (i, ptr) in ptrs.iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&ptr.to_le_bytes());
    }
    buf
}
