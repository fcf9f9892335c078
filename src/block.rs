//! An allocated view into a heap.
//!
//! A `Block` never caches a byte-slice view across calls — it re-derives one from the
//! heap's current backing storage every time, because the region's identity is the
//! heap's problem, not the block's.

use std::sync::Arc;

use crate::heap::Heap;

/// An opaque handle to `[start, start + payload_size)` within some `Heap`.
#[derive(Clone)]
pub struct Block {
    heap: Arc<Heap>,
    start: u32,
    payload_size: u32,
}

impl Block {
    pub(crate) fn new(heap: Arc<Heap>, start: u32, payload_size: u32) -> Self {
        Self {
            heap,
            start,
            payload_size,
        }
    }

    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    pub(crate) fn set_payload_size(&mut self, new_size: u32) {
        self.payload_size = new_size;
    }

    /// A read-only view over the block's whole payload.
    pub fn as_slice(&self) -> &[u8] {
        self.heap.bytes(self.start, self.payload_size)
    }

    /// A read-only view over `[offset, offset+len)` within the block's payload.
    pub fn slice(&self, offset: u32, len: u32) -> &[u8] {
        assert!(offset + len <= self.payload_size, "slice out of block bounds");
        self.heap.bytes(self.start + offset, len)
    }

    /// A mutable view over `[offset, offset+len)` within the block's payload.
    ///
    /// # Safety
    /// The caller must ensure no other thread concurrently accesses the same bytes
    /// through a different `Block`/`slice_mut` call without external synchronization
    /// (the filter engine's result-writing guarantees this by construction: every
    /// worker writes to a disjoint, atomically-reserved row slot).
    pub unsafe fn slice_mut(&self, offset: u32, len: u32) -> &mut [u8] {
        assert!(offset + len <= self.payload_size, "slice out of block bounds");
        // SAFETY: delegated to caller.
        unsafe { self.heap.bytes_mut(self.start + offset, len) }
    }

    /// An atomic view over a 4-byte-aligned word at `offset` within the block's payload.
    ///
    /// # Safety
    /// `offset` must be 4-byte aligned and `offset + 4 <= self.payload_size`.
    pub(crate) unsafe fn atomic_u32_at(&self, offset: u32) -> &std::sync::atomic::AtomicU32 {
        // SAFETY: delegated to caller; `self.start + offset` stays within the heap because
        // the block itself was carved from a valid heap range.
        unsafe { self.heap.tag_word(self.start + offset) }
    }

    pub fn free(self) -> crate::error::Result<()> {
        self.heap.free(&self)
    }

    pub fn shrink(&mut self, new_size: u32) -> crate::error::Result<()> {
        let heap = Arc::clone(&self.heap);
        heap.shrink(self, new_size)
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("start", &self.start)
            .field("payload_size", &self.payload_size)
            .finish()
    }
}
