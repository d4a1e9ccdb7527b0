//! Shared element buffer behind every matrix view.
//!
//! A `MemoryBlock` is always held through an `Arc`; every `Matrix` sharing the
//! block keeps it alive, and the block is freed when the last holder drops.
//! Locking never blocks: contention is reported as `BufferLocked`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Result, StridedError};

/// Reference-counted, fixed-capacity buffer of elements.
///
/// The `device_stale` flag is owned by whichever collaborator mirrors the block
/// on an accelerator: it marks the host copy as out of date, and host reads or
/// writes fail with [`StridedError::DeviceStale`] until
/// [`sync_host`](Self::sync_host) refreshes it.
pub struct MemoryBlock<T> {
    data: RwLock<Vec<T>>,
    len: AtomicUsize,
    device_stale: AtomicBool,
}

impl<T> std::fmt::Debug for MemoryBlock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("len", &self.len())
            .field("device_stale", &self.needs_host_sync())
            .finish()
    }
}

impl<T> MemoryBlock<T> {
    /// Wrap an existing vector. Capacity is the vector length.
    pub fn from_vec(data: Vec<T>) -> Self {
        log::trace!("memory block wraps {} elements", data.len());
        Self {
            len: AtomicUsize::new(data.len()),
            data: RwLock::new(data),
            device_stale: AtomicBool::new(false),
        }
    }

    /// Number of addressable elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire the buffer for reading.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>> {
        if self.needs_host_sync() {
            return Err(StridedError::DeviceStale);
        }
        self.data.try_read().ok_or(StridedError::BufferLocked)
    }

    /// Acquire the buffer for reading and writing.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>> {
        if self.needs_host_sync() {
            return Err(StridedError::DeviceStale);
        }
        self.data.try_write().ok_or(StridedError::BufferLocked)
    }

    /// Mark the host copy as stale (the device holds newer data).
    pub fn mark_device_dirty(&self) {
        self.device_stale.store(true, Ordering::Release);
    }

    /// True if the host copy must be refreshed before any host access.
    #[inline]
    pub fn needs_host_sync(&self) -> bool {
        self.device_stale.load(Ordering::Acquire)
    }

    /// Refresh the host copy and clear the stale flag.
    ///
    /// `refresh` receives the whole host buffer; it is the device
    /// collaborator's download step.
    pub fn sync_host<F>(&self, refresh: F) -> Result<()>
    where
        F: FnOnce(&mut [T]),
    {
        let mut guard = self.data.try_write().ok_or(StridedError::BufferLocked)?;
        refresh(guard.as_mut_slice());
        self.device_stale.store(false, Ordering::Release);
        Ok(())
    }
}

impl<T: Clone + Default> MemoryBlock<T> {
    /// Allocate `len` default-initialized elements.
    pub fn allocate(len: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| StridedError::AllocationFailure(len))?;
        data.resize(len, T::default());
        Ok(Self::from_vec(data))
    }

    /// Grow the buffer to `new_len` elements. Shrinking is rejected because
    /// existing views may address the tail.
    pub fn reallocate(&self, new_len: usize) -> Result<()> {
        let mut guard = self.write()?;
        let old_len = guard.len();
        if new_len < old_len {
            return Err(StridedError::Unsupported("memory blocks never shrink"));
        }
        guard
            .try_reserve_exact(new_len - old_len)
            .map_err(|_| StridedError::AllocationFailure(new_len))?;
        guard.resize(new_len, T::default());
        self.len.store(new_len, Ordering::Release);
        log::trace!("memory block grew from {} to {} elements", old_len, new_len);
        Ok(())
    }
}
