//! Event pools: tiered fixed-block allocation with reference counting.
//!
//! Pools are registered once at startup, in strictly ascending block size.
//! Allocation scans the pools in order and takes the first whose block fits,
//! so every event comes from the tightest tier available. Free blocks form
//! a singly linked list threaded through the blocks themselves by index.
//!
//! A dynamic event is recycled by [`gc`] when its reference count drops to
//! zero; every posted or published handle is balanced by exactly one `gc`
//! on the consuming side, which the framework performs automatically on
//! queue consumption and publish completion.

use orbit_core::{require, Evt, Signal, NO_MARGIN};
use orbit_trace::records::evt;

use crate::fw::{self, Framework};

const MODULE: &str = "pool";

pub(crate) struct Block {
    pub(crate) sig: Signal,
    pub(crate) ref_count: u8,
    pub(crate) next_free: Option<u16>,
    pub(crate) data: alloc::vec::Vec<u8>,
    /// Payload bytes in use; at most `block_size`.
    pub(crate) len: u16,
}

pub(crate) struct EvtPool {
    pub(crate) block_size: u16,
    pub(crate) blocks: alloc::vec::Vec<Block>,
    pub(crate) free_head: Option<u16>,
    pub(crate) n_free: u16,
    pub(crate) n_min: u16,
}

impl EvtPool {
    fn new(block_size: u16, count: u16) -> Self {
        let mut blocks = alloc::vec::Vec::with_capacity(count as usize);
        for i in 0..count {
            blocks.push(Block {
                sig: Signal::EMPTY,
                ref_count: 0,
                next_free: if i + 1 < count { Some(i + 1) } else { None },
                data: alloc::vec![0; block_size as usize],
                len: 0,
            });
        }
        EvtPool {
            block_size,
            blocks,
            free_head: Some(0),
            n_free: count,
            n_min: count,
        }
    }

    fn take_free(&mut self) -> u16 {
        // the free count said a block is available
        require!(MODULE, 311, self.free_head.is_some());
        let slot = self.free_head.unwrap();
        self.free_head = self.blocks[slot as usize].next_free;
        self.n_free -= 1;
        if self.n_min > self.n_free {
            self.n_min = self.n_free;
        }
        slot
    }

    fn put_back(&mut self, slot: u16) {
        // double recycling would overflow the free count
        require!(MODULE, 420, self.n_free < self.blocks.len() as u16);
        self.blocks[slot as usize].next_free = self.free_head;
        self.free_head = Some(slot);
        self.n_free += 1;
    }
}

impl Framework {
    /// Locate the block behind a dynamic event handle, faulting on a handle
    /// that names no registered pool or block.
    pub(crate) fn block_mut(&mut self, e: &Evt) -> &mut Block {
        let idx = e.pool_id as usize - 1;
        require!(MODULE, 410, idx < self.pools.len());
        let pool = &mut self.pools[idx];
        require!(MODULE, 411, (e.slot as usize) < pool.blocks.len());
        &mut pool.blocks[e.slot as usize]
    }

    /// Take one more reference on a dynamic event. Callers hold the
    /// critical section.
    pub(crate) fn evt_ref_inc(&mut self, e: &Evt) {
        let block = self.block_mut(e);
        require!(MODULE, 412, block.ref_count < u8::MAX);
        block.ref_count += 1;
    }
}

/// Register one event pool. Pools must be registered in strictly ascending
/// order of `block_size`, before any allocation.
pub fn pool_init(block_size: u16, count: u16) {
    require!(MODULE, 202, block_size > 0 && count > 0);
    let hook = fw::with(|fw| {
        // cannot exceed the number of available pools
        require!(MODULE, 200, !fw.pools.is_full());
        // register pools in ascending order of block size
        require!(
            MODULE,
            201,
            fw.pools.last().map_or(true, |p| p.block_size < block_size)
        );
        let _ = fw.pools.push(EvtPool::new(block_size, count));
        fw.trace.clone()
    });
    fw::emit(
        &hook,
        evt::POOL_INIT,
        &[block_size as u8, (block_size >> 8) as u8, count as u8],
    );
}

/// Allocate a dynamic event with `size` payload bytes from the tightest
/// fitting pool.
///
/// With `margin == NO_MARGIN` the allocation must succeed: exhaustion is a
/// fatal fault (the usual cause is an event leak). With any other margin,
/// `None` comes back when the pool cannot keep `margin` blocks free, and
/// the caller decides.
pub fn new_evt(size: u16, margin: u16, sig: Signal) -> Option<Evt> {
    let (allocated, hook) = fw::with(|fw| {
        let idx = fw.pools.iter().position(|p| p.block_size >= size);
        // an event must fit in some registered pool
        require!(MODULE, 310, idx.is_some());
        let idx = idx.unwrap();
        let pool = &mut fw.pools[idx];

        let needed = if margin == NO_MARGIN { 0 } else { margin };
        let allocated = if pool.n_free > needed {
            let slot = pool.take_free();
            let block = &mut pool.blocks[slot as usize];
            block.sig = sig;
            block.ref_count = 0;
            block.len = size;
            Some(Evt::from_pool(sig, (idx + 1) as u8, slot))
        } else {
            None
        };
        (allocated, fw.trace.clone())
    });

    match allocated {
        Some(e) => {
            fw::emit(&hook, evt::NEW, &[e.pool_id, sig.raw() as u8]);
            Some(e)
        }
        None => {
            // allocation failure cannot be tolerated without a margin
            require!(MODULE, 320, margin != NO_MARGIN);
            fw::emit(&hook, evt::NEW_ATTEMPT, &[sig.raw() as u8]);
            None
        }
    }
}

/// Allocate a dynamic event carrying a copy of `data` as its payload.
pub fn new_evt_with(sig: Signal, margin: u16, data: &[u8]) -> Option<Evt> {
    let e = new_evt(data.len() as u16, margin, sig)?;
    fw::with(|fw| {
        let block = fw.block_mut(&e);
        block.data[..data.len()].copy_from_slice(data);
    });
    Some(e)
}

/// Read the payload of a dynamic event under the critical section. Keep the
/// closure short.
pub fn with_payload<R>(e: &Evt, f: impl FnOnce(&[u8]) -> R) -> R {
    require!(MODULE, 430, e.is_dynamic());
    fw::with(|fw| {
        let block = fw.block_mut(e);
        let len = block.len as usize;
        f(&block.data[..len])
    })
}

/// Garbage-collect an event: decrement its reference count and recycle the
/// block when no references remain. A no-op for static events.
pub fn gc(e: Evt) {
    if !e.is_dynamic() {
        return;
    }
    let (recycled, hook) = fw::with(|fw| {
        let block = fw.block_mut(&e);
        let recycled = if block.ref_count > 1 {
            block.ref_count -= 1;
            false
        } else {
            block.ref_count = 0;
            let idx = e.pool_id as usize - 1;
            fw.pools[idx].put_back(e.slot);
            true
        };
        (recycled, fw.trace.clone())
    });
    let record = if recycled { evt::GC } else { evt::GC_ATTEMPT };
    fw::emit(&hook, record, &[e.pool_id, e.sig.raw() as u8]);
}

/// Take an additional reference on a dynamic event, for keeping it beyond
/// the current run-to-completion step. Balance with [`delete_ref`].
pub fn new_ref(e: Evt) -> Evt {
    // only pool events are counted
    require!(MODULE, 500, e.is_dynamic());
    let hook = fw::with(|fw| {
        fw.evt_ref_inc(&e);
        fw.trace.clone()
    });
    fw::emit(&hook, evt::NEW_REF, &[e.pool_id, e.sig.raw() as u8]);
    e
}

/// Drop a reference obtained with [`new_ref`].
pub fn delete_ref(e: Evt) {
    let hook = fw::with(|fw| fw.trace.clone());
    fw::emit(&hook, evt::DELETE_REF, &[e.pool_id, e.sig.raw() as u8]);
    gc(e);
}

/// Lowest number of free blocks ever observed in the given pool
/// (1-based pool id).
pub fn pool_min(pool_id: u8) -> u16 {
    fw::with(|fw| {
        require!(
            MODULE,
            600,
            pool_id > 0 && (pool_id as usize) <= fw.pools.len()
        );
        fw.pools[pool_id as usize - 1].n_min
    })
}

/// Current number of free blocks in the given pool (1-based pool id).
pub fn pool_free(pool_id: u8) -> u16 {
    fw::with(|fw| {
        require!(
            MODULE,
            610,
            pool_id > 0 && (pool_id as usize) <= fw.pools.len()
        );
        fw.pools[pool_id as usize - 1].n_free
    })
}

/// The largest event payload any registered pool can serve.
pub fn pool_max_block_size() -> u16 {
    fw::with(|fw| fw.pools.last().map_or(0, |p| p.block_size))
}
