//! # x86_64 Port
//!
//! System V AMD64 calling convention. A parked frame holds the six
//! callee-saved general registers plus the resume address:
//!
//! ```text
//! sp ──► r15            (lowest address)
//!        r14
//!        r13
//!        r12
//!        rbx
//!        rbp
//!        resume address (highest address)
//! ```
//!
//! `switch` is entered by `call`, so the return address is already on
//! the caller's stack; pushing the six registers below it produces
//! exactly this frame. A fabricated frame zeroes the registers and
//! plants the entry routine as the resume address, placed so that the
//! entry observes the ABI stack alignment (`rsp % 16 == 8` on entry).

use super::Context;
use core::arch::naked_asm;

/// Park the caller's context in `*save` and resume `*resume`.
///
/// # Safety
///
/// `*resume` must hold a context previously produced by [`switch`] or
/// [`prepare`] whose stack region is still intact.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(save: *mut Context, resume: *const Context) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, [rsi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

/// Resume `*resume`, abandoning the current context.
///
/// # Safety
///
/// As for [`switch`]; additionally the current stack must never be
/// resumed again.
#[unsafe(naked)]
pub unsafe extern "C" fn resume_only(resume: *const Context) -> ! {
    naked_asm!(
        "mov rsp, [rdi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

/// Fabricate a context on a fresh stack whose resumption enters `entry`.
///
/// # Safety
///
/// `stack_top` must be the exclusive top of a writable region large
/// enough for the initial frame.
pub unsafe fn prepare(stack_top: *mut u8, entry: extern "C" fn() -> !) -> Context {
    // 16-align the frame base; the resume address then sits at an
    // address congruent 0 mod 16, giving `entry` the rsp % 16 == 8
    // the ABI promises at function entry.
    let sp = ((stack_top as usize & !15) - 64) as *mut u64;
    for i in 0..6 {
        sp.add(i).write(0); // r15, r14, r13, r12, rbx, rbp
    }
    sp.add(6).write(entry as usize as u64);
    Context { sp: sp as *mut u8 }
}
