//! # Architecture Ports
//!
//! The saved-context primitive the scheduler is built on: capture the
//! execution state of the running code and later resume exactly at the
//! capture site.
//!
//! Each port supplies three operations over a [`Context`]:
//!
//! - `switch(save, resume)` — store the callee-saved register set and
//!   stack pointer of the caller into `*save`, then resume `*resume`.
//!   The call "returns" when some later `switch`/`resume_only` resumes
//!   `*save`.
//! - `resume_only(resume)` — resume `*resume` without saving anything;
//!   the current context is abandoned. Used when a terminating thread
//!   leaves its stack for good.
//! - `prepare(stack_top, entry)` — fabricate a context on a fresh stack
//!   region whose first resumption enters `entry`.
//!
//! Only the stack pointer lives in the [`Context`]; the registers
//! themselves are parked on the owning stack, so a `Context` stays valid
//! as long as the bytes of its stack region do.

/// A saved execution context: the stack pointer of a parked register
/// frame. The frame layout is private to each port.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Context {
    sp: *mut u8,
}

impl Context {
    /// A context that has never been captured. Resuming it is undefined;
    /// the scheduler guarantees it never does.
    pub const fn null() -> Self {
        Self {
            sp: core::ptr::null_mut(),
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[path = "x86_64.rs"]
mod port;

#[cfg(target_arch = "aarch64")]
#[path = "aarch64.rs"]
mod port;

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[path = "arm.rs"]
mod port;

#[cfg(target_arch = "riscv64")]
#[path = "riscv64.rs"]
mod port;

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    all(target_arch = "arm", target_os = "none"),
    target_arch = "riscv64",
)))]
compile_error!("no context-switch port for this target architecture");

pub use port::{prepare, resume_only, switch};
