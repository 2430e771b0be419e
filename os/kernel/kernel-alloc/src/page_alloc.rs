use crate::{PAGE_SIZE, Page};
use core::ptr::{self, NonNull};
use kernel_sync::SpinLock;
use log::debug;

/// Reasons a region cannot be handed to [`PageAllocator::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("page pool base or length is not page aligned")]
    Misaligned,
    #[error("page pool is empty")]
    Empty,
}

/// The link word at the start of every free page.
#[repr(C)]
struct FreePage {
    next: *mut FreePage,
}

/// Head of the intrusive chain.
struct FreeList {
    head: *mut FreePage,
}

// SAFETY: the pages reachable from `head` belong to the allocator, not to
// whichever processor last touched the list.
unsafe impl Send for FreeList {}

/// A concurrent LIFO allocator over one region of 4 KiB pages.
///
/// All processors share one instance; every operation is a minimal critical
/// section under a single [`SpinLock`].
pub struct PageAllocator {
    free: SpinLock<FreeList>,
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAllocator {
    /// An allocator with nothing to hand out until [`init`](Self::init).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            free: SpinLock::new(FreeList {
                head: ptr::null_mut(),
            }),
        }
    }

    /// Thread the pages of `[base, base + len)` into the free list.
    ///
    /// Every page except the topmost one is linked: the lowest page carries
    /// the null terminator and the head ends up on the highest linked page.
    /// Returns the number of pages that became allocatable
    /// (`len / PAGE_SIZE - 1`).
    ///
    /// # Errors
    /// [`PoolError::Misaligned`] if `base` or `len` is not a multiple of
    /// [`PAGE_SIZE`], [`PoolError::Empty`] if `len` is zero.
    ///
    /// # Safety
    /// The region must be valid, writable kernel memory that nothing else
    /// uses for the rest of the kernel's life. Must run once, before any
    /// other processor can reach this allocator.
    #[allow(clippy::cast_ptr_alignment)]
    pub unsafe fn init(&self, base: NonNull<u8>, len: usize) -> Result<usize, PoolError> {
        if !(base.as_ptr() as usize).is_multiple_of(PAGE_SIZE) || !len.is_multiple_of(PAGE_SIZE) {
            return Err(PoolError::Misaligned);
        }
        if len == 0 {
            return Err(PoolError::Empty);
        }

        let linked = len / PAGE_SIZE - 1;
        let mut next: *mut FreePage = ptr::null_mut();
        for index in 0..linked {
            // SAFETY: index < len / PAGE_SIZE, so the page lies in the region.
            let page = unsafe { base.as_ptr().add(index * PAGE_SIZE) }.cast::<FreePage>();
            // SAFETY: caller hands the region over to us.
            unsafe { page.write(FreePage { next }) };
            next = page;
        }

        self.free.lock().head = next;
        debug!("page pool at {:p}: {linked} pages", base.as_ptr());
        Ok(linked)
    }

    /// Pop one page, or `None` when the pool is exhausted.
    pub fn allocate(&self) -> Option<Page> {
        let page = {
            let mut free = self.free.lock();
            let page = NonNull::new(free.head)?;
            // SAFETY: every page on the chain is owned by the allocator and
            // starts with a valid link word.
            free.head = unsafe { page.as_ptr().read().next };
            page
        };
        // SAFETY: the page just left the chain, so we are its only owner.
        Some(unsafe { Page::from_raw(page.cast()) })
    }

    /// [`allocate`](Self::allocate), with the page filled with zeros.
    pub fn zallocate(&self) -> Option<Page> {
        let mut page = self.allocate()?;
        page.zero();
        Some(page)
    }

    /// Push `page` back onto the free list.
    ///
    /// The page must have come from this allocator.
    pub fn free(&self, page: Page) {
        let page = page.into_raw().cast::<FreePage>();
        let mut free = self.free.lock();
        // SAFETY: ownership of the page moved back to the allocator.
        unsafe { page.as_ptr().write(FreePage { next: free.head }) };
        free.head = page.as_ptr();
    }

    /// Raw counterpart to [`free`](Self::free); a null pointer is ignored.
    ///
    /// # Safety
    /// A non-null `page` must have come from this allocator and must not be
    /// freed again until it is allocated again.
    pub unsafe fn free_ptr(&self, page: *mut u8) {
        if let Some(page) = NonNull::new(page) {
            // SAFETY: forwarded from the caller.
            self.free(unsafe { Page::from_raw(page) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4096))]
    struct Pool<const N: usize>([[u8; PAGE_SIZE]; N]);

    fn pool<const N: usize>() -> (NonNull<u8>, usize) {
        let pool = Box::leak(Box::new(Pool([[0u8; PAGE_SIZE]; N])));
        (NonNull::from(pool).cast(), N * PAGE_SIZE)
    }

    #[test]
    fn misaligned_region_is_rejected() {
        let (base, len) = pool::<2>();
        let alloc = PageAllocator::new();
        let shifted = unsafe { base.add(8) };
        assert_eq!(unsafe { alloc.init(shifted, len) }, Err(PoolError::Misaligned));
        assert_eq!(unsafe { alloc.init(base, len - 1) }, Err(PoolError::Misaligned));
        assert_eq!(unsafe { alloc.init(base, 0) }, Err(PoolError::Empty));
    }

    #[test]
    fn head_is_highest_linked_page() {
        let (base, len) = pool::<4>();
        let alloc = PageAllocator::new();
        assert_eq!(unsafe { alloc.init(base, len) }, Ok(3));

        let first = alloc.allocate().unwrap();
        assert_eq!(first.addr(), base.as_ptr() as usize + 2 * PAGE_SIZE);
    }

    #[test]
    fn single_page_region_has_nothing_to_allocate() {
        let (base, len) = pool::<1>();
        let alloc = PageAllocator::new();
        assert_eq!(unsafe { alloc.init(base, len) }, Ok(0));
        assert!(alloc.allocate().is_none());
    }

    #[test]
    fn zallocate_clears_link_word() {
        let (base, len) = pool::<3>();
        let alloc = PageAllocator::new();
        unsafe { alloc.init(base, len) }.unwrap();

        let page = alloc.zallocate().unwrap();
        assert!(page.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn free_ptr_ignores_null() {
        let (base, len) = pool::<2>();
        let alloc = PageAllocator::new();
        unsafe { alloc.init(base, len) }.unwrap();

        unsafe { alloc.free_ptr(ptr::null_mut()) };
        assert!(alloc.allocate().is_some());
        assert!(alloc.allocate().is_none());
    }
}
