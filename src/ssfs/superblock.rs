//! Encoding and decoding of the volume's block-0 superblock.

use crate::error::{Error, Result};
use crate::BLOCK_SIZE;

/// 16-byte constant prefix identifying an SSFS superblock.
pub const MAGIC: [u8; 16] = [
    0xF0, 0x55, 0x4C, 0x49, 0x45, 0x47, 0x45, 0x49, 0x4E, 0x46, 0x4F, 0x30, 0x39, 0x34, 0x30, 0x0F,
];

/// The metadata record stored in block 0.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    /// Total number of blocks on the device.
    pub num_blocks: u32,
    /// Number of blocks occupied by the inode table (blocks `1..=num_inode_blocks`).
    pub num_inode_blocks: u32,
    /// Block size in bytes. Always 1024 for a volume this crate can mount.
    pub block_size: u32,
}

impl Superblock {
    /// Encodes the superblock into a full, zero-padded block.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..16].copy_from_slice(&MAGIC);
        buf[16..20].copy_from_slice(&self.num_blocks.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_inode_blocks.to_le_bytes());
        buf[24..28].copy_from_slice(&self.block_size.to_le_bytes());
        buf
    }

    /// Decodes a superblock from a full block, rejecting anything that isn't
    /// a valid SSFS superblock.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if buf[0..16] != MAGIC {
            return Err(Error::CorruptDisk("bad magic"));
        }
        let num_blocks = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let num_inode_blocks = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        let block_size = u32::from_le_bytes(buf[24..28].try_into().unwrap());
        if block_size != BLOCK_SIZE as u32 {
            return Err(Error::CorruptDisk("unexpected block size"));
        }
        Ok(Self {
            num_blocks,
            num_inode_blocks,
            block_size,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let sb = Superblock {
            num_blocks: 1024,
            num_inode_blocks: 3,
            block_size: BLOCK_SIZE as u32,
        };
        let buf = sb.encode();
        let sb2 = Superblock::decode(&buf).unwrap();
        assert_eq!(sb2.num_blocks, 1024);
        assert_eq!(sb2.num_inode_blocks, 3);
        assert_eq!(sb2.block_size, BLOCK_SIZE as u32);
        // Padding after the three fields must be zero.
        assert!(buf[28..].iter().all(|&b| b == 0));
    }

    #[test]
    fn bad_magic() {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0] = 0x00;
        assert!(matches!(
            Superblock::decode(&buf),
            Err(Error::CorruptDisk(_))
        ));
    }

    #[test]
    fn bad_block_size() {
        let sb = Superblock {
            num_blocks: 10,
            num_inode_blocks: 1,
            block_size: 4096,
        };
        let buf = sb.encode();
        assert!(matches!(
            Superblock::decode(&buf),
            Err(Error::CorruptDisk(_))
        ));
    }
}
