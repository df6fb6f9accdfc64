//! yield_after: a hot loop yields only once its time budget has passed,
//! and the deadline advances only when a switch actually happened.

mod common;

use std::sync::Mutex;

use common::VirtualClock;
use tandem::kernel;
use tandem::tick::Tick;

static CLOCK: VirtualClock = VirtualClock::new();
static OUTCOME: Mutex<Option<(u32, Tick)>> = Mutex::new(None);

const STACK: usize = 8192;

fn churner(_: *mut ()) {
    let mut after = CLOCK.now() + 100;
    let mut yields = 0u32;

    for _ in 0..10 {
        // A chunk of work costing 30 ticks.
        CLOCK.advance(30);

        let deadline_before = after;
        kernel::yield_after(&mut after, 100);
        if after != deadline_before {
            yields += 1;
        }
    }
    *OUTCOME.lock().unwrap() = Some((yields, after));
}

#[test]
fn yields_only_past_the_deadline() {
    let _guard = common::serial();
    CLOCK.install();
    *OUTCOME.lock().unwrap() = None;

    kernel::spawn(churner, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    // Work reaches ticks 30..300 in steps of 30; the 100-tick budget is
    // crossed at 120 (deadline moves to 220) and at 240 (deadline moves
    // to 340). 270 and 300 stay under the new budget.
    assert_eq!(*OUTCOME.lock().unwrap(), Some((2, 340)));
}
