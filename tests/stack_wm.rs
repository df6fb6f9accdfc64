//! Stack water-mark: the guard-byte estimator sees at least the bytes a
//! thread demonstrably touched, never more than the region, and never
//! shrinks over the thread's lifetime.

mod common;

use std::sync::Mutex;

use common::VirtualClock;
use tandem::kernel;

static CLOCK: VirtualClock = VirtualClock::new();
static MARKS: Mutex<Vec<(usize, usize, usize)>> = Mutex::new(Vec::new());

fn prober(arg: *mut ()) {
    let stack_sz = arg as usize;

    let mut buf = [0u8; 512];
    for (i, b) in buf.iter_mut().enumerate() {
        unsafe { core::ptr::write_volatile(b, i as u8) };
    }

    let first = kernel::stack_watermark();
    kernel::yield_now();
    let second = kernel::stack_watermark();
    core::hint::black_box(&buf);

    MARKS.lock().unwrap().push((stack_sz, first, second));
}

#[test]
fn watermark_bounds_and_monotonicity() {
    let _guard = common::serial();
    CLOCK.install();
    MARKS.lock().unwrap().clear();

    for stack_sz in [8192usize, 16384] {
        kernel::spawn(prober, None, stack_sz, stack_sz as *mut ()).unwrap();
    }
    kernel::service();

    let marks = MARKS.lock().unwrap();
    assert_eq!(marks.len(), 2);
    for &(stack_sz, first, second) in marks.iter() {
        // The 512-byte buffer alone guarantees this much usage.
        assert!(first >= 512, "watermark {} below touched bytes", first);
        assert!(first <= stack_sz);
        assert!(second <= stack_sz);
        // Guard bytes never come back.
        assert!(second >= first, "watermark shrank: {} -> {}", first, second);
    }
}
