//! # RISC-V 64 Port
//!
//! Standard RV64 calling convention. A parked frame is 112 bytes: the
//! return address and s0–s11, padded to keep sp 16-aligned. The
//! callee-saved FP registers fs0–fs11 are not preserved; tasks must not
//! hold live FP state across a yield on this port.

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
        "addi sp, sp, -112",
        "sd ra, 0(sp)",
        "sd s0, 8(sp)",
        "sd s1, 16(sp)",
        "sd s2, 24(sp)",
        "sd s3, 32(sp)",
        "sd s4, 40(sp)",
        "sd s5, 48(sp)",
        "sd s6, 56(sp)",
        "sd s7, 64(sp)",
        "sd s8, 72(sp)",
        "sd s9, 80(sp)",
        "sd s10, 88(sp)",
        "sd s11, 96(sp)",
        "sd sp, 0(a0)",
        "ld sp, 0(a1)",
        "ld ra, 0(sp)",
        "ld s0, 8(sp)",
        "ld s1, 16(sp)",
        "ld s2, 24(sp)",
        "ld s3, 32(sp)",
        "ld s4, 40(sp)",
        "ld s5, 48(sp)",
        "ld s6, 56(sp)",
        "ld s7, 64(sp)",
        "ld s8, 72(sp)",
        "ld s9, 80(sp)",
        "ld s10, 88(sp)",
        "ld s11, 96(sp)",
        "addi sp, sp, 112",
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
        "ld sp, 0(a0)",
        "ld ra, 0(sp)",
        "ld s0, 8(sp)",
        "ld s1, 16(sp)",
        "ld s2, 24(sp)",
        "ld s3, 32(sp)",
        "ld s4, 40(sp)",
        "ld s5, 48(sp)",
        "ld s6, 56(sp)",
        "ld s7, 64(sp)",
        "ld s8, 72(sp)",
        "ld s9, 80(sp)",
        "ld s10, 88(sp)",
        "ld s11, 96(sp)",
        "addi sp, sp, 112",
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
    let sp = ((stack_top as usize & !15) - 112) as *mut u64;
    for i in 0..14 {
        sp.add(i).write(0);
    }
    sp.write(entry as usize as u64); // ra slot
    Context { sp: sp as *mut u8 }
}
