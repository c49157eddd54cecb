//! Device buffer allocation and kernel-side views.
//!
//! A `DeviceBuffer<T>` is a ref-counted allocation in device-visible memory.
//! Handles are cheap clones of the same storage, so two handles may alias;
//! this is how an in-place sort (`keys_output` same storage as `keys_input`)
//! is expressed. Kernels access storage through `DeviceView<T>`, an unchecked
//! raw view that plays the role of a device pointer.

use std::alloc::{alloc, dealloc, Layout};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::queue::DeviceError;

/// Allocation granule. Buffer sizes are rounded up to this, and every
/// allocation is at least this large, so a zero-length buffer still has a
/// valid, nonzero backing allocation.
pub const ALLOC_ALIGN: usize = 64;

/// Round up to the nearest allocation granule.
pub(crate) fn granule_align(size: usize) -> usize {
    (size + ALLOC_ALIGN - 1) & !(ALLOC_ALIGN - 1)
}

struct Storage {
    ptr: NonNull<u8>,
    layout: Layout,
}

// Storage is raw bytes handed out through unchecked views; disjoint-access
// discipline is the kernels' responsibility, as on a real device.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

impl Storage {
    fn alloc(bytes: usize) -> Result<Self, DeviceError> {
        let size = granule_align(bytes).max(ALLOC_ALIGN);
        let layout = Layout::from_size_align(size, ALLOC_ALIGN)
            .map_err(|_| DeviceError::OutOfMemory { bytes })?;
        // SAFETY: layout has nonzero size.
        let raw = unsafe { alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(DeviceError::OutOfMemory { bytes })?;
        Ok(Self { ptr, layout })
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        // SAFETY: allocated with this exact layout in Storage::alloc.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// A fixed-size device allocation holding `len` elements of `T`.
///
/// Created via [`DeviceContext::alloc_buffer`](crate::DeviceContext::alloc_buffer).
/// Cloning produces another handle to the same storage.
pub struct DeviceBuffer<T: Copy> {
    storage: Arc<Storage>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> Clone for DeviceBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy + Send + Sync + 'static> DeviceBuffer<T> {
    pub(crate) fn new(len: usize) -> Result<Self, DeviceError> {
        assert!(
            std::mem::align_of::<T>() <= ALLOC_ALIGN,
            "element alignment exceeds the allocation granule"
        );
        let storage = Storage::alloc(len * std::mem::size_of::<T>())?;
        Ok(Self {
            storage: Arc::new(storage),
            len,
            _marker: PhantomData,
        })
    }

    /// Number of elements in this buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing allocation size in bytes (rounded to the allocation granule).
    pub fn size_bytes(&self) -> usize {
        self.storage.layout.size()
    }

    /// Whether two handles refer to the same storage.
    pub fn aliases(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Read the buffer contents as a slice.
    ///
    /// Must not be called while a dispatch writing this buffer is in flight;
    /// dispatches on a [`CommandQueue`](crate::CommandQueue) are synchronous,
    /// so host access between dispatches is always safe.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: storage holds at least len * size_of::<T>() bytes at
        // ALLOC_ALIGN alignment.
        unsafe { std::slice::from_raw_parts(self.storage.ptr.as_ptr() as *const T, self.len) }
    }

    /// Write access to the buffer contents from the host side.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as for as_slice; host-side mutation between dispatches.
        unsafe { std::slice::from_raw_parts_mut(self.storage.ptr.as_ptr() as *mut T, self.len) }
    }

    /// Copy data from a host slice into the buffer.
    pub fn copy_from_slice(&mut self, data: &[T]) {
        assert!(
            data.len() <= self.len,
            "data len {} exceeds buffer len {}",
            data.len(),
            self.len
        );
        self.as_mut_slice()[..data.len()].copy_from_slice(data);
    }

    /// Copy buffer contents out to a host slice.
    pub fn copy_to_slice(&self, dest: &mut [T]) {
        let n = self.len.min(dest.len());
        dest[..n].copy_from_slice(&self.as_slice()[..n]);
    }

    /// Unchecked kernel-side view of the whole buffer.
    pub fn view(&self) -> DeviceView<T> {
        DeviceView {
            ptr: self.storage.ptr.as_ptr() as *mut T,
            len: self.len,
        }
    }

    /// Unchecked kernel-side view of `len` elements of `U` starting at
    /// `byte_offset` into this buffer's storage.
    ///
    /// Used to carve typed regions out of an opaque scratch byte buffer.
    ///
    /// # Panics
    /// Panics if the region is misaligned for `U` or extends past the
    /// backing allocation.
    pub fn typed_view<U: Copy>(&self, byte_offset: usize, len: usize) -> DeviceView<U> {
        let bytes = len * std::mem::size_of::<U>();
        assert!(
            byte_offset + bytes <= self.storage.layout.size(),
            "typed view [{}..{}) exceeds allocation of {} bytes",
            byte_offset,
            byte_offset + bytes,
            self.storage.layout.size()
        );
        let ptr = unsafe { self.storage.ptr.as_ptr().add(byte_offset) };
        assert_eq!(
            ptr as usize % std::mem::align_of::<U>(),
            0,
            "typed view misaligned for element type"
        );
        DeviceView {
            ptr: ptr as *mut U,
            len,
        }
    }
}

/// Unchecked view of a device buffer region, the analog of a device pointer.
///
/// Copyable and sendable into kernel closures. All access is unsafe: bounds
/// are debug-asserted only, and callers must uphold the disjoint-write
/// discipline of the dispatch they run in.
pub struct DeviceView<T> {
    ptr: *mut T,
    len: usize,
}

impl<T> Clone for DeviceView<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DeviceView<T> {}

// Views are handed to kernels running on the pool.
unsafe impl<T: Send> Send for DeviceView<T> {}
unsafe impl<T: Sync> Sync for DeviceView<T> {}

impl<T: Copy> DeviceView<T> {
    /// Number of elements visible through this view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read element `i`.
    ///
    /// # Safety
    /// `i` must be in bounds and no other group may be writing element `i`
    /// during the same dispatch.
    #[inline]
    pub unsafe fn get(&self, i: usize) -> T {
        debug_assert!(i < self.len);
        *self.ptr.add(i)
    }

    /// Write element `i`.
    ///
    /// # Safety
    /// `i` must be in bounds and owned exclusively by the calling group for
    /// the duration of the dispatch.
    #[inline]
    pub unsafe fn set(&self, i: usize, value: T) {
        debug_assert!(i < self.len);
        *self.ptr.add(i) = value;
    }

    /// Borrow a sub-range as a slice.
    ///
    /// # Safety
    /// The range must be in bounds and no group may write it while the
    /// slice is live.
    #[inline]
    pub unsafe fn slice(&self, start: usize, end: usize) -> &[T] {
        debug_assert!(start <= end && end <= self.len);
        std::slice::from_raw_parts(self.ptr.add(start), end - start)
    }
}
