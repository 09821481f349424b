//! Portable shared-memory region backing (spec §9's "POSIX shared memory...
//! portability boundary" REDESIGN FLAG).
//!
//! The core algorithm is agnostic to how a page reaches physical memory; this
//! module supplies a single [`SharedRegion`] trait backed by `memmap2`-mapped
//! files rather than a direct `shm_open` binding. On Linux, POSIX
//! shared-memory objects already live under `/dev/shm` (a `tmpfs` mount), so
//! mapping plain files there reproduces the native layout byte-for-byte; on
//! other platforms the same trait would back onto a memory-mapped file in any
//! writable directory.

use memmap2::{Mmap, MmapMut};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Directory POSIX `shm_open` objects resolve to on Linux.
const SHM_DIR: &str = "/dev/shm";

fn backing_path(name: &str) -> PathBuf {
    let trimmed = name.trim_start_matches('/');
    Path::new(SHM_DIR).join(trimmed)
}

/// A fixed-size shared-memory page, created once by the owning process
/// (read-write) and opened read-only by observers (spec §3 "Ownership and
/// lifecycle", §6). Implementors are `#[repr(C)]` structs whose first fields
/// are `magic`/`version`.
pub trait SharedRegion: Sized {
    /// Byte size of the page; must match `size_of::<Self>()`.
    const SIZE: usize;

    /// Create (or reuse) the backing page and map it read-write. The page's
    /// bytes are zero-initialized by the filesystem on first creation; the
    /// caller is responsible for calling the page type's own `init()` before
    /// publishing the region to other processes.
    fn create(name: &str) -> io::Result<MmapMut> {
        let path = backing_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.set_len(Self::SIZE as u64)?;
        // SAFETY: `file` is a regular file we just sized to `Self::SIZE`
        // bytes and exclusively control for the lifetime of this mapping.
        unsafe { MmapMut::map_mut(&file) }
    }

    /// Map an existing page read-write, for a co-owning writer process (e.g.
    /// the tuner updating `SharedSymbolConfigs`, or the dashboard flipping
    /// `SharedConfig::trading_enabled`).
    fn open_rw(name: &str) -> io::Result<MmapMut> {
        let path = backing_path(name);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        // SAFETY: the file is assumed to already hold a page of this type,
        // validated by the caller via the magic/version check after mapping.
        unsafe { MmapMut::map_mut(&file) }
    }

    /// Map an existing page read-only, for observer processes.
    fn open_ro(name: &str) -> io::Result<Mmap> {
        let path = backing_path(name);
        let file = File::open(&path)?;
        // SAFETY: see `open_rw`.
        unsafe { Mmap::map(&file) }
    }

    /// Remove the backing page. Only the creating/owning process should call
    /// this, at shutdown (spec §3 "On shutdown the creator unlinks the
    /// page").
    fn unlink(name: &str) -> io::Result<()> {
        std::fs::remove_file(backing_path(name))
    }
}

/// Reinterpret a read-only mapping as `&T`.
///
/// # Safety
/// `mmap` must hold at least `size_of::<T>()` bytes laid out as `T`
/// (`#[repr(C)]`, page-aligned — any `tmpfs`/filesystem mapping exceeds the
/// alignment any page type here requires).
#[must_use]
pub unsafe fn as_page<T>(mmap: &Mmap) -> &T {
    debug_assert!(mmap.len() >= std::mem::size_of::<T>());
    unsafe { &*mmap.as_ptr().cast::<T>() }
}

/// Reinterpret a read-write mapping as `&mut T`. See [`as_page`] for safety.
///
/// # Safety
/// Same preconditions as [`as_page`], plus: no other live reference into this
/// mapping may exist for the duration of the returned borrow.
#[must_use]
pub unsafe fn as_page_mut<T>(mmap: &mut MmapMut) -> &mut T {
    debug_assert!(mmap.len() >= std::mem::size_of::<T>());
    unsafe { &mut *mmap.as_mut_ptr().cast::<T>() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[repr(C)]
    struct Dummy {
        magic: u64,
        counter: AtomicU64,
    }

    impl SharedRegion for Dummy {
        const SIZE: usize = std::mem::size_of::<Dummy>();
    }

    #[test]
    fn create_then_reopen_round_trips_through_the_filesystem() {
        let name = format!("/ipc_region_test_{}", std::process::id());
        let mut rw = Dummy::create(&name).expect("create");
        // SAFETY: page sized and owned exclusively by this test.
        let page = unsafe { as_page_mut::<Dummy>(&mut rw) };
        page.magic = 0xABCD;
        page.counter.store(7, Ordering::Relaxed);

        let ro = Dummy::open_ro(&name).expect("open_ro");
        // SAFETY: page was just initialized above and matches `Dummy`'s layout.
        let observed = unsafe { as_page::<Dummy>(&ro) };
        assert_eq!(observed.magic, 0xABCD);
        assert_eq!(observed.counter.load(Ordering::Relaxed), 7);

        Dummy::unlink(&name).expect("unlink");
    }
}
