use std::collections::HashMap;
use std::sync::Mutex;

use kernel_intr::hw::Mmio32;
use kernel_intr::{InterruptContext, InterruptPolicy, InterruptVector, LocalApic, handle};

const EOI: usize = 0x0B0;
const ISR: usize = 0x100;

#[derive(Default)]
struct Regs {
    values: Mutex<HashMap<usize, u32>>,
    eois: Mutex<usize>,
}

impl Regs {
    fn with_id(apic_id: u8) -> Self {
        let regs = Self::default();
        regs.values
            .lock()
            .unwrap()
            .insert(0x020, u32::from(apic_id) << 24);
        regs
    }

    fn set_in_service(&self, vector: u8) {
        let reg = ISR + usize::from(vector / 32) * 0x10;
        *self.values.lock().unwrap().entry(reg).or_default() |= 1 << (vector % 32);
    }

    fn eois(&self) -> usize {
        *self.eois.lock().unwrap()
    }
}

impl Mmio32 for Regs {
    fn read32(&self, offset: usize) -> u32 {
        self.values.lock().unwrap().get(&offset).copied().unwrap_or(0)
    }

    fn write32(&self, offset: usize, value: u32) {
        if offset == EOI {
            *self.eois.lock().unwrap() += 1;
        } else {
            self.values.lock().unwrap().insert(offset, value);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Call {
    UserException(InterruptVector, u64),
    PageFault(u64),
    DeviceNotAvailable,
    TimerTick(u8),
    Irq(u8),
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Call>>);

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl InterruptPolicy for Recorder {
    fn user_exception(&self, vector: InterruptVector, ctx: &InterruptContext) {
        self.0
            .lock()
            .unwrap()
            .push(Call::UserException(vector, ctx.rip));
    }

    fn page_fault(&self, ctx: &InterruptContext) {
        self.0.lock().unwrap().push(Call::PageFault(ctx.error_code));
    }

    fn device_not_available(&self, _ctx: &InterruptContext) {
        self.0.lock().unwrap().push(Call::DeviceNotAvailable);
    }

    fn timer_tick(&self, apic_id: u8) {
        self.0.lock().unwrap().push(Call::TimerTick(apic_id));
    }

    fn irq(&self, line: u8) {
        self.0.lock().unwrap().push(Call::Irq(line));
    }
}

fn kernel(vector: u64) -> InterruptContext {
    InterruptContext {
        vector,
        cs: 0x08,
        rip: 0xFFFF_8000_0010_0000,
        ..InterruptContext::default()
    }
}

fn user(vector: u64) -> InterruptContext {
    InterruptContext {
        vector,
        cs: 0x23,
        rip: 0x40_1000,
        ..InterruptContext::default()
    }
}

fn dispatch(ctx: &InterruptContext) {
    let regs = Regs::default();
    handle(ctx, &LocalApic::new(&regs), &Recorder::default());
}

#[test]
#[should_panic(expected = "Double Fault")]
fn double_fault_halts() {
    dispatch(&user(8));
}

#[test]
#[should_panic(expected = "Machine Check")]
fn machine_check_halts() {
    dispatch(&user(18));
}

#[test]
#[should_panic(expected = "Invalid TSS")]
fn invalid_tss_halts() {
    dispatch(&kernel(10));
}

#[test]
#[should_panic(expected = "Debug Exception")]
fn debug_halts_even_from_user_mode() {
    dispatch(&user(1));
}

#[test]
#[should_panic(expected = "General Protection Fault")]
fn kernel_general_protection_halts() {
    dispatch(&kernel(13));
}

#[test]
#[should_panic(expected = "Page Fault")]
fn kernel_page_fault_halts() {
    dispatch(&kernel(14));
}

#[test]
#[should_panic(expected = "Invalid interrupt number")]
fn unknown_vector_halts() {
    dispatch(&kernel(2));
}

#[test]
fn user_exceptions_reach_the_policy() {
    let regs = Regs::default();
    let lapic = LocalApic::new(&regs);
    let policy = Recorder::default();

    for number in [0, 3, 6, 11, 12, 13, 16, 17, 19] {
        handle(&user(number), &lapic, &policy);
    }

    let vectors: Vec<u64> = policy
        .calls()
        .into_iter()
        .map(|call| match call {
            Call::UserException(v, rip) => {
                assert_eq!(rip, 0x40_1000);
                u64::from(v.number())
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(vectors, [0, 3, 6, 11, 12, 13, 16, 17, 19]);
    assert_eq!(regs.eois(), 0);
}

#[test]
fn user_page_fault_reaches_the_policy() {
    let regs = Regs::default();
    let policy = Recorder::default();
    let mut ctx = user(14);
    ctx.error_code = 0b110;

    handle(&ctx, &LocalApic::new(&regs), &policy);

    assert_eq!(policy.calls(), [Call::PageFault(0b110)]);
}

#[test]
fn device_not_available_is_handled_in_either_mode() {
    let regs = Regs::default();
    let lapic = LocalApic::new(&regs);
    let policy = Recorder::default();

    handle(&kernel(7), &lapic, &policy);
    handle(&user(7), &lapic, &policy);

    assert_eq!(
        policy.calls(),
        [Call::DeviceNotAvailable, Call::DeviceNotAvailable]
    );
}

#[test]
fn spurious_is_never_acknowledged() {
    let regs = Regs::default();
    let policy = Recorder::default();

    handle(&kernel(32), &LocalApic::new(&regs), &policy);

    assert!(policy.calls().is_empty());
    assert_eq!(regs.eois(), 0);
}

#[test]
fn timer_ticks_the_current_processor_then_acknowledges() {
    let regs = Regs::with_id(5);
    let policy = Recorder::default();

    handle(&user(33), &LocalApic::new(&regs), &policy);

    assert_eq!(policy.calls(), [Call::TimerTick(5)]);
    assert_eq!(regs.eois(), 1);
}

#[test]
fn irq_line_comes_from_the_in_service_register() {
    let regs = Regs::default();
    regs.set_in_service(0x31);
    let policy = Recorder::default();

    handle(&kernel(0x30), &LocalApic::new(&regs), &policy);

    assert_eq!(policy.calls(), [Call::Irq(1)]);
    assert_eq!(regs.eois(), 1);
}

#[test]
fn highest_in_service_line_wins() {
    let regs = Regs::default();
    regs.set_in_service(0x31);
    regs.set_in_service(0x4A);
    let policy = Recorder::default();

    handle(&kernel(0x30), &LocalApic::new(&regs), &policy);

    assert_eq!(policy.calls(), [Call::Irq(0x1A)]);
}

#[test]
fn irq_with_nothing_in_service_is_only_acknowledged() {
    let regs = Regs::default();
    let policy = Recorder::default();

    handle(&kernel(0x30), &LocalApic::new(&regs), &policy);

    assert!(policy.calls().is_empty());
    assert_eq!(regs.eois(), 1);
}
