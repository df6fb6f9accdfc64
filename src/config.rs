//! # Tandem Configuration
//!
//! Compile-time constants governing the thread pool and the stack arena.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of threads the pool can hold simultaneously.
/// This bounds the static thread-context array. NEW, running, idle,
/// waiting and hole slots all count against it.
pub const MAX_THREADS: usize = 10;

/// Stack size in bytes used when a thread is scheduled with a requested
/// size of 0.
pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Smallest stack a thread may request. A region must at least hold the
/// fabricated switch frame plus headroom for the entry trampoline.
pub const MIN_STACK_SIZE: usize = 256;

/// Total size of the stack arena all thread stacks are carved from.
/// Sized generously for hosted development and test runs; shrink this
/// for RAM-constrained deployments.
pub const STACK_ARENA_SIZE: usize = 128 * 1024;
