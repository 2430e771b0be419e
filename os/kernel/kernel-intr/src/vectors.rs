//! Interrupt vector numbers.

/// The spurious-interrupt vector programmed into the local APIC.
pub const SPURIOUS_VECTOR: u8 = 32;

/// The local APIC timer vector.
pub const TIMER_VECTOR: u8 = 33;

/// First vector handed to routing-chip lines; line `n` arrives on `IRQ_BASE_VECTOR + n`.
pub const IRQ_BASE_VECTOR: u8 = 0x30;

/// Every vector the dispatcher knows about.
///
/// All hardware lines share one entry stub, which reports itself as
/// [`InterruptVector::Irq`]; the concrete line is recovered from the local
/// APIC's in-service registers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptVector {
    DivideError = 0,
    Debug = 1,
    Breakpoint = 3,
    InvalidOpcode = 6,
    DeviceNotAvailable = 7,
    DoubleFault = 8,
    InvalidTss = 10,
    SegmentNotPresent = 11,
    StackFault = 12,
    GeneralProtection = 13,
    PageFault = 14,
    X87Fpu = 16,
    AlignmentCheck = 17,
    MachineCheck = 18,
    Simd = 19,
    Spurious = SPURIOUS_VECTOR,
    Timer = TIMER_VECTOR,
    Irq = IRQ_BASE_VECTOR,
}

/// How the dispatcher treats a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorClass {
    /// Halts no matter which privilege level raised it.
    AlwaysFatal,
    /// Halts when raised by the kernel, otherwise belongs to the faulting thread.
    UserException,
    PageFault,
    DeviceNotAvailable,
    Spurious,
    Timer,
    Irq,
}

impl InterruptVector {
    /// The exceptions that have their own entry stub.
    pub const EXCEPTIONS: [Self; 15] = [
        Self::DivideError,
        Self::Debug,
        Self::Breakpoint,
        Self::InvalidOpcode,
        Self::DeviceNotAvailable,
        Self::DoubleFault,
        Self::InvalidTss,
        Self::SegmentNotPresent,
        Self::StackFault,
        Self::GeneralProtection,
        Self::PageFault,
        Self::X87Fpu,
        Self::AlignmentCheck,
        Self::MachineCheck,
        Self::Simd,
    ];

    /// Map the number pushed by an entry stub back to a vector.
    #[must_use]
    pub const fn from_number(number: u64) -> Option<Self> {
        Some(match number {
            0 => Self::DivideError,
            1 => Self::Debug,
            3 => Self::Breakpoint,
            6 => Self::InvalidOpcode,
            7 => Self::DeviceNotAvailable,
            8 => Self::DoubleFault,
            10 => Self::InvalidTss,
            11 => Self::SegmentNotPresent,
            12 => Self::StackFault,
            13 => Self::GeneralProtection,
            14 => Self::PageFault,
            16 => Self::X87Fpu,
            17 => Self::AlignmentCheck,
            18 => Self::MachineCheck,
            19 => Self::Simd,
            32 => Self::Spurious,
            33 => Self::Timer,
            48 => Self::Irq,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn class(self) -> VectorClass {
        match self {
            Self::Debug | Self::DoubleFault | Self::InvalidTss | Self::MachineCheck => {
                VectorClass::AlwaysFatal
            }
            Self::DivideError
            | Self::Breakpoint
            | Self::InvalidOpcode
            | Self::SegmentNotPresent
            | Self::StackFault
            | Self::GeneralProtection
            | Self::X87Fpu
            | Self::AlignmentCheck
            | Self::Simd => VectorClass::UserException,
            Self::PageFault => VectorClass::PageFault,
            Self::DeviceNotAvailable => VectorClass::DeviceNotAvailable,
            Self::Spurious => VectorClass::Spurious,
            Self::Timer => VectorClass::Timer,
            Self::Irq => VectorClass::Irq,
        }
    }

    /// Text printed when this vector takes the machine down.
    #[must_use]
    pub const fn diagnostic(self) -> &'static str {
        match self {
            Self::DivideError => "Divide Error",
            Self::Debug => "Debug Exception",
            Self::Breakpoint => "Breakpoint",
            Self::InvalidOpcode => "Invalid Opcode",
            Self::DeviceNotAvailable => "Device Not Available",
            Self::DoubleFault => "Double Fault",
            Self::InvalidTss => "Invalid TSS",
            Self::SegmentNotPresent => "Segment Not Present",
            Self::StackFault => "Stack Fault",
            Self::GeneralProtection => "General Protection Fault",
            Self::PageFault => "Page Fault",
            Self::X87Fpu => "x87 FPU Exception",
            Self::AlignmentCheck => "Alignment Check",
            Self::MachineCheck => "Machine Check",
            Self::Simd => "SIMD Exception",
            Self::Spurious => "Spurious Interrupt",
            Self::Timer => "Timer",
            Self::Irq => "Hardware Interrupt",
        }
    }
}
