//! Node identity allocation.
//!
//! One allocator instance is shared by every builder participating in a
//! build, so IDs are globally unique and assigned in traversal order. The
//! allocator is an explicit context object, never a process global.

use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonically increasing 64-bit node ID source. Thread-safe; never resets
/// during one build.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicI64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(0),
        }
    }

    /// Allocate the next ID. Strictly increasing, starting at 0.
    pub fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The ID the next allocation would return. Diagnostic use only.
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}
