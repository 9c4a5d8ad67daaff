use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// 全局 Buffer ID 生成器
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

const NEVER_UPLOADED: u64 = u64::MAX;

/// Versioned CPU-side copy of a GPU buffer.
///
/// The draw-batch code writes here every frame; the rendering front end owns
/// the actual `wgpu::Buffer` and calls [`CpuBuffer::upload`] to copy the data
/// over. Every write bumps the version, so an upload is skipped when nothing
/// changed since the previous one.
#[derive(Debug)]
pub struct CpuBuffer<T: Pod> {
    id: u64,
    label: String,
    usage: wgpu::BufferUsages,
    version: AtomicU64,
    uploaded_version: AtomicU64,
    data: RwLock<Vec<T>>,
}

impl<T: Pod> CpuBuffer<T> {
    pub fn new(data: Vec<T>, usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.unwrap_or("Buffer").to_string(),
            usage,
            version: AtomicU64::new(0),
            uploaded_version: AtomicU64::new(NEVER_UPLOADED),
            data: RwLock::new(data),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    /// 无锁获取版本号
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Size of the current contents in bytes.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        (self.len() * std::mem::size_of::<T>()) as u64
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read()
    }

    /// Mutable access. The version is bumped when the guard is dropped.
    pub fn write(&self) -> BufferWriteGuard<'_, T> {
        BufferWriteGuard {
            data: self.data.write(),
            version: &self.version,
        }
    }

    /// Returns `true` if the contents changed since the last upload.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.uploaded_version.load(Ordering::Relaxed) != self.version()
    }

    /// Copies the contents into `target` if they changed since the last upload.
    ///
    /// Returns `true` when data was written. `target` must be at least
    /// [`CpuBuffer::byte_size`] bytes; a smaller buffer is left untouched and
    /// reported as an error in the log.
    pub fn upload(&self, queue: &wgpu::Queue, target: &wgpu::Buffer) -> bool {
        if !self.needs_upload() {
            return false;
        }
        let data = self.data.read();
        let bytes: &[u8] = bytemuck::cast_slice(data.as_slice());
        if bytes.len() as u64 > target.size() {
            log::error!(
                "{}: GPU buffer too small ({} bytes, need {})",
                self.label,
                target.size(),
                bytes.len()
            );
            return false;
        }
        if !bytes.is_empty() {
            queue.write_buffer(target, 0, bytes);
        }
        self.uploaded_version.store(self.version(), Ordering::Relaxed);
        true
    }
}

/// Write guard that bumps the owning buffer's version when dropped.
pub struct BufferWriteGuard<'a, T> {
    data: RwLockWriteGuard<'a, Vec<T>>,
    version: &'a AtomicU64,
}

impl<T> std::ops::Deref for BufferWriteGuard<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> std::ops::DerefMut for BufferWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T> Drop for BufferWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }
}
