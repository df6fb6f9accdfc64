//! # ARMv7-M Port
//!
//! Bare-metal Cortex-M. Unlike a preemptive kernel, which switches in a
//! PendSV handler on the process-stack/main-stack split, a cooperative
//! switch happens at a plain function-call boundary in Thread mode: park
//! r4–r11 plus the return address, swap stack pointers, restore.
//!
//! r12 is stacked as well purely to keep the 40-byte frame 8-aligned per
//! AAPCS. FPU registers s16–s31 are not preserved; builds with a
//! hard-float ABI must not hold live FP state across a yield.

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
        "stmdb sp!, {{r4-r12, lr}}",
        "mov r2, sp",
        "str r2, [r0]",
        "ldr r2, [r1]",
        "mov sp, r2",
        "ldmia sp!, {{r4-r12, pc}}",
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
        "ldr r2, [r0]",
        "mov sp, r2",
        "ldmia sp!, {{r4-r12, pc}}",
    )
}

/// Fabricate a context on a fresh stack whose resumption enters `entry`.
///
/// # Safety
///
/// `stack_top` must be the exclusive top of a writable region large
/// enough for the initial frame.
pub unsafe fn prepare(stack_top: *mut u8, entry: extern "C" fn() -> !) -> Context {
    let sp = ((stack_top as usize & !7) - 40) as *mut u32;
    for i in 0..9 {
        sp.add(i).write(0); // r4-r12
    }
    // Function pointers carry the Thumb bit, as `pop {pc}` requires.
    sp.add(9).write(entry as usize as u32);
    Context { sp: sp as *mut u8 }
}
