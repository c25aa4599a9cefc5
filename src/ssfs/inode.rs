//! The fixed 32-byte inode record, and its placement in the inode table.

use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::superblock::Superblock;
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, INODE_SIZE};

/// A file's metadata and block-pointer tree. Inode 0 is a legal,
/// user-visible inode; there is no reserved slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inode {
    /// Whether this slot is allocated to a file.
    pub valid: bool,
    /// File length in bytes.
    pub size: u32,
    /// Direct block pointers, `0` meaning unallocated.
    pub direct: [u32; 4],
    /// Pointer to the single-indirect block, `0` meaning none.
    pub indirect: u32,
    /// Pointer to the double-indirect block, `0` meaning none.
    pub double_indirect: u32,
}

impl Inode {
    /// Encodes the inode into its on-disk 32-byte record: `valid`, `size` LE,
    /// four direct pointers LE, indirect LE, double-indirect LE, then 3
    /// zero padding bytes.
    pub fn encode(&self) -> [u8; INODE_SIZE] {
        let mut buf = [0u8; INODE_SIZE];
        buf[0] = if self.valid { 1 } else { 0 };
        buf[1..5].copy_from_slice(&self.size.to_le_bytes());
        for (i, ptr) in self.direct.iter().enumerate() {
            let off = 5 + i * 4;
            buf[off..off + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        buf[21..25].copy_from_slice(&self.indirect.to_le_bytes());
        buf[25..29].copy_from_slice(&self.double_indirect.to_le_bytes());
        // buf[29..32] stays zero: structural padding.
        buf
    }

    /// Decodes an inode from its on-disk record. A `valid` byte outside
    /// `{0, 1}` is tolerated and treated as free.
    pub fn decode(buf: &[u8; INODE_SIZE]) -> Self {
        let mut direct = [0u32; 4];
        for (i, ptr) in direct.iter_mut().enumerate() {
            let off = 5 + i * 4;
            *ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        }
        Self {
            valid: buf[0] == 1,
            size: u32::from_le_bytes(buf[1..5].try_into().unwrap()),
            direct,
            indirect: u32::from_le_bytes(buf[21..25].try_into().unwrap()),
            double_indirect: u32::from_le_bytes(buf[25..29].try_into().unwrap()),
        }
    }
}

/// Total number of inode slots the table can hold.
pub fn capacity(sb: &Superblock) -> u32 {
    sb.num_inode_blocks * INODES_PER_BLOCK as u32
}

/// Block number and in-block byte offset of inode `i`.
fn location(i: u32) -> (u32, usize) {
    (1 + i / INODES_PER_BLOCK as u32, (i % INODES_PER_BLOCK as u32) as usize * INODE_SIZE)
}

/// Reads inode `i`, validating it is within the table's capacity.
pub fn read<D: BlockDevice>(dev: &mut D, sb: &Superblock, i: u32) -> Result<Inode> {
    if i >= capacity(sb) {
        return Err(Error::InvalidInode);
    }
    let (block, off) = location(i);
    let mut buf = [0u8; BLOCK_SIZE];
    dev.read_block(block, &mut buf)?;
    let mut record = [0u8; INODE_SIZE];
    record.copy_from_slice(&buf[off..off + INODE_SIZE]);
    Ok(Inode::decode(&record))
}

/// Writes inode `i` back to its slot, preserving the rest of its block.
pub fn write<D: BlockDevice>(dev: &mut D, sb: &Superblock, i: u32, inode: &Inode) -> Result<()> {
    if i >= capacity(sb) {
        return Err(Error::InvalidInode);
    }
    let (block, off) = location(i);
    let mut buf = [0u8; BLOCK_SIZE];
    dev.read_block(block, &mut buf)?;
    buf[off..off + INODE_SIZE].copy_from_slice(&inode.encode());
    dev.write_block(block, &buf)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let inode = Inode {
            valid: true,
            size: 12345,
            direct: [1, 2, 3, 4],
            indirect: 5,
            double_indirect: 6,
        };
        let buf = inode.encode();
        let decoded = Inode::decode(&buf);
        assert!(decoded.valid);
        assert_eq!(decoded.size, 12345);
        assert_eq!(decoded.direct, [1, 2, 3, 4]);
        assert_eq!(decoded.indirect, 5);
        assert_eq!(decoded.double_indirect, 6);
        assert_eq!(&buf[29..32], &[0, 0, 0]);
    }

    #[test]
    fn tolerates_garbage_valid_byte_as_free() {
        let mut buf = [0u8; INODE_SIZE];
        buf[0] = 42;
        assert!(!Inode::decode(&buf).valid);
    }

    #[test]
    fn location_packing() {
        assert_eq!(location(0), (1, 0));
        assert_eq!(location(1), (1, 32));
        assert_eq!(location(31), (1, 31 * 32));
        assert_eq!(location(32), (2, 0));
    }
}
