//! # Tandem Hosted Demo
//!
//! Runs the scheduler on the host using the built-in monotonic-clock
//! platform. Three threads exercise the cooperative primitives:
//!
//! | Thread     | Behavior                                            |
//! |------------|-----------------------------------------------------|
//! | `ticker`   | Prints a heartbeat every 200 ms, five times          |
//! | `producer` | Sleeps 150 ms, then posts an item and notifies       |
//! | `consumer` | Waits on the item semaphore with a 1 s timeout       |
//!
//! Expected output interleaves heartbeats with the produce/consume
//! handshake, then the service returns once all three threads are done.

use std::sync::atomic::{AtomicU32, Ordering};

use tandem::kernel;

const ITEM_SEM: i32 = 1;

static ITEMS: AtomicU32 = AtomicU32::new(0);

fn ticker(_: *mut ()) {
    for beat in 1..=5 {
        println!("[{}] beat {}", kernel::thread_name().unwrap(), beat);
        kernel::idle(200);
    }
    println!("[{}] done", kernel::thread_name().unwrap());
}

fn producer(_: *mut ()) {
    for _ in 0..3 {
        kernel::idle(150);
        ITEMS.fetch_add(1, Ordering::Relaxed);
        println!("[{}] item posted", kernel::thread_name().unwrap());
        kernel::notify(ITEM_SEM);
    }
}

fn consumer(_: *mut ()) {
    loop {
        match kernel::wait(ITEM_SEM, 1000) {
            Ok(()) => {
                let n = ITEMS.load(Ordering::Relaxed);
                println!("[{}] consumed (total {})", kernel::thread_name().unwrap(), n);
                if n >= 3 {
                    break;
                }
            }
            Err(_) => {
                println!("[{}] timed out, giving up", kernel::thread_name().unwrap());
                break;
            }
        }
    }
}

fn main() {
    let null = core::ptr::null_mut();
    kernel::spawn(ticker, Some("ticker"), 16384, null).unwrap();
    kernel::spawn(producer, Some("producer"), 16384, null).unwrap();
    kernel::spawn(consumer, Some("consumer"), 16384, null).unwrap();

    kernel::service();
    println!("all threads terminated");
}
