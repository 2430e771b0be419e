use core::mem::{align_of, size_of};
use core::ptr::NonNull;

/// Size of the pages managed by [`PageAllocator`](crate::PageAllocator).
pub const PAGE_SIZE: usize = 4096;

/// Owning handle to one page-aligned, page-sized block of kernel memory.
///
/// Dropping a `Page` leaks it; return it with
/// [`PageAllocator::free`](crate::PageAllocator::free) instead.
#[derive(Debug)]
pub struct Page {
    ptr: NonNull<[u8; PAGE_SIZE]>,
}

// SAFETY: a `Page` is the unique owner of its block.
unsafe impl Send for Page {}

impl Page {
    /// Take ownership of the block at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be page aligned, point to `PAGE_SIZE` writable bytes that
    /// stay valid for the rest of the kernel's life, and not be owned by
    /// anything else.
    #[must_use]
    pub const unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Self { ptr: ptr.cast() }
    }

    /// Give up ownership without freeing.
    #[must_use]
    pub const fn into_raw(self) -> NonNull<u8> {
        self.ptr.cast()
    }

    /// Kernel-virtual address of the first byte.
    #[must_use]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr().cast()
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        // SAFETY: we own the block.
        unsafe { self.ptr.as_ref() }
    }

    pub const fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        // SAFETY: we own the block exclusively.
        unsafe { self.ptr.as_mut() }
    }

    pub fn zero(&mut self) {
        self.as_bytes_mut().fill(0);
    }

    /// Move `value` into the page and keep it there forever.
    ///
    /// Used for per-processor records that are created once at boot and
    /// never freed.
    pub fn leak_as<T>(self, value: T) -> &'static mut T {
        const {
            assert!(size_of::<T>() <= PAGE_SIZE);
            assert!(align_of::<T>() <= PAGE_SIZE);
        };
        let slot = self.ptr.cast::<T>();
        // SAFETY: the block is large and aligned enough for `T` (checked
        // above), we own it, and ownership is never given back.
        unsafe {
            slot.as_ptr().write(value);
            &mut *slot.as_ptr()
        }
    }
}
