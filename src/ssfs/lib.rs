//! Simple Static File System: a self-contained single-volume file store over
//! a fixed-size block device, with a flat inode-numbered namespace.
//!
//! The crate is split the way the on-disk structures layer on each other:
//! [`device`] is the block-device port, [`superblock`] and [`inode`] are the
//! two on-disk record codecs, [`bitmap`] is the rebuilt-on-mount free-space
//! map, [`tree`] is the block-pointer tree navigator shared by inodes'
//! indirect and double-indirect levels, [`volume`] is the operations façade
//! tying all of it together, and [`session`] exposes a process-wide
//! single-mounted-volume surface on top of it.

pub mod bitmap;
pub mod device;
pub mod error;
pub mod inode;
pub mod session;
pub mod superblock;
#[cfg(test)]
mod testutil;
pub mod tree;
pub mod volume;

pub use device::{BlockDevice, FileBlockDevice};
pub use error::{Coded, Error, Result};
pub use superblock::Superblock;
pub use volume::{Stat, Volume};

/// Size in bytes of every block on the device, including block 0.
pub const BLOCK_SIZE: usize = 1024;

/// Size in bytes of one on-disk inode record.
pub const INODE_SIZE: usize = 32;

/// Number of inode records packed into one block.
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// Number of 4-byte block pointers packed into one pointer block.
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;

/// Number of direct block pointers carried inline in an inode.
pub const DIRECT_BLOCKS: usize = 4;
