/// Register state saved by the entry stubs, lowest address first.
///
/// The stubs push the caller-saved registers, then the vector number and an
/// error code (zero where the CPU supplies none), on top of the frame the CPU
/// pushed itself. The layout must match the stubs exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptContext {
    pub rax: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,

    pub vector: u64,
    pub error_code: u64,

    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

const _: () = assert!(size_of::<InterruptContext>() == 16 * 8);

impl InterruptContext {
    /// Whether the interrupted code ran at ring 0.
    #[must_use]
    pub const fn is_kernel_mode(&self) -> bool {
        self.cs & 3 == 0
    }
}
