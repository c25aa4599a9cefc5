//! Process-wide mounted-volume session.
//!
//! Exactly one volume can be mounted at a time in a process, and several
//! commands only make sense against a volume a previous command already
//! mounted — so this exposes `format`/`mount`/`unmount`/`create`/`delete`/
//! `stat`/`read`/`write` as free functions sharing a single
//! `Mutex<Option<Volume<FileBlockDevice>>>` behind a `OnceLock`, while the
//! actual mounted state is the ordinary, independently testable
//! [`crate::volume::Volume`].

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::device::FileBlockDevice;
use crate::error::{Error, Result};
use crate::volume::{Stat, Volume};

fn slot() -> &'static Mutex<Option<Volume<FileBlockDevice>>> {
    static SLOT: OnceLock<Mutex<Option<Volume<FileBlockDevice>>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

/// Formats the already-sized image at `path` to hold at least
/// `requested_inodes` inodes. Refuses while a volume is already mounted in
/// this process. The image itself must already exist at its intended size;
/// this only opens it, it does not create or resize it.
pub fn format(path: impl AsRef<Path>, requested_inodes: u32) -> Result<()> {
    let guard = slot().lock().unwrap();
    if guard.is_some() {
        return Err(Error::DiskAlreadyMounted);
    }
    drop(guard);
    let dev = FileBlockDevice::open(path)?;
    Volume::format(dev, requested_inodes)
}

/// Mounts `path` as the process's active volume.
pub fn mount(path: impl AsRef<Path>) -> Result<()> {
    let mut guard = slot().lock().unwrap();
    if guard.is_some() {
        return Err(Error::DiskAlreadyMounted);
    }
    let dev = FileBlockDevice::open(path)?;
    *guard = Some(Volume::mount(dev)?);
    Ok(())
}

/// Unmounts the active volume, flushing it first.
pub fn unmount() -> Result<()> {
    let mut guard = slot().lock().unwrap();
    let vol = guard.take().ok_or(Error::DiskNotMounted)?;
    vol.unmount()?;
    Ok(())
}

/// Runs `f` against the active volume, or `Err(DiskNotMounted)` if none is.
fn with_active<R>(f: impl FnOnce(&mut Volume<FileBlockDevice>) -> Result<R>) -> Result<R> {
    let mut guard = slot().lock().unwrap();
    let vol = guard.as_mut().ok_or(Error::DiskNotMounted)?;
    f(vol)
}

/// Creates a new, empty file and returns its inode number.
pub fn create() -> Result<u32> {
    with_active(|v| v.create())
}

/// Deletes inode `i` and reclaims its blocks.
pub fn delete(i: u32) -> Result<()> {
    with_active(|v| v.delete(i))
}

/// Reports inode `i`'s size.
pub fn stat(i: u32) -> Result<Stat> {
    with_active(|v| v.stat(i))
}

/// Reads into `buf` starting at `offset`, returning bytes actually read.
pub fn read(i: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
    with_active(|v| v.read(i, offset, buf))
}

/// Writes `data` starting at `offset`, returning bytes actually written.
pub fn write(i: u32, offset: u64, data: &[u8]) -> Result<usize> {
    with_active(|v| v.write(i, offset, data))
}

/// Whether a volume is currently mounted in this process.
pub fn is_mounted() -> bool {
    slot().lock().unwrap().is_some()
}

#[cfg(test)]
mod test {
    // These run serially against the single process-wide slot; `temp_path`'s
    // per-call uniqueness keeps the backing files from colliding, but the
    // mount slot itself is shared, so each test cleans up its own mount
    // before returning.
    use super::*;
    use crate::testutil::temp_path;
    use std::sync::Mutex as StdMutex;

    static SERIAL: StdMutex<()> = StdMutex::new(());

    fn make_image(path: &std::path::Path, num_blocks: u32) {
        FileBlockDevice::create(path, num_blocks).unwrap();
    }

    #[test]
    fn full_lifecycle_through_the_session_api() {
        let _g = SERIAL.lock().unwrap();
        let path = temp_path("session");
        make_image(&path, 32);

        format(&path, 32).unwrap();
        mount(&path).unwrap();
        assert!(is_mounted());

        let i = create().unwrap();
        write(i, 0, b"payload").unwrap();
        let mut out = [0u8; 16];
        let n = read(i, 0, &mut out).unwrap();
        assert_eq!(&out[..n], b"payload");
        assert_eq!(stat(i).unwrap().size, 7);

        delete(i).unwrap();
        unmount().unwrap();
        assert!(!is_mounted());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn double_mount_is_rejected() {
        let _g = SERIAL.lock().unwrap();
        let path = temp_path("session_double");
        make_image(&path, 16);
        format(&path, 16).unwrap();
        mount(&path).unwrap();
        assert!(matches!(mount(&path), Err(Error::DiskAlreadyMounted)));
        unmount().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn operating_without_a_mount_is_rejected() {
        let _g = SERIAL.lock().unwrap();
        assert!(matches!(create(), Err(Error::DiskNotMounted)));
        assert!(matches!(unmount(), Err(Error::DiskNotMounted)));
    }
}
