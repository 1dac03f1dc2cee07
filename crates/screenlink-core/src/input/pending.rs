//! Pending input for one endpoint, awaiting the next drain.
//!
//! # Layout
//!
//! ```text
//! pointer slot : Option<T>          (rank 0, at most one, replaced on push)
//! wheel        : VecDeque<T>        (rank 1, bounded FIFO)
//! button       : VecDeque<T>        (rank 2, bounded FIFO)
//! keyboard     : VecDeque<T>        (rank 3, bounded FIFO)
//! ```
//!
//! A drain empties the slot and then each queue in rank order, so the
//! output is ordered by ascending rank and FIFO within a class without ever
//! sorting.

use std::collections::VecDeque;

use super::event::EventClass;

/// What happened to an item handed to [`PendingEvents::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended to its class queue (or placed in the empty pointer slot).
    Queued,
    /// Replaced an older, not yet drained pointer move.
    Coalesced,
    /// The class queue was full; the item was discarded.
    Overflow,
}

/// Per-class bounded queues with a single coalescing slot for pointer moves.
#[derive(Debug)]
pub struct PendingEvents<T> {
    pointer: Option<T>,
    queues: [VecDeque<T>; 3],
    capacity: usize,
}

impl<T> PendingEvents<T> {
    /// Creates an empty set of queues, each holding at most `capacity`
    /// items.  A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            pointer: None,
            queues: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            capacity: capacity.max(1),
        }
    }

    /// Buffers `item` under `class`.
    pub fn push(&mut self, class: EventClass, item: T) -> PushOutcome {
        match class {
            EventClass::PointerMove => match self.pointer.replace(item) {
                Some(_) => PushOutcome::Coalesced,
                None => PushOutcome::Queued,
            },
            other => {
                let queue = &mut self.queues[other.rank() - 1];
                if queue.len() >= self.capacity {
                    return PushOutcome::Overflow;
                }
                queue.push_back(item);
                PushOutcome::Queued
            }
        }
    }

    /// The pointer move waiting in the slot, if any.
    ///
    /// Lets a caller merge an incoming move with the pending one before
    /// [`push`](Self::push) replaces it.
    pub fn pointer(&self) -> Option<&T> {
        self.pointer.as_ref()
    }

    /// Removes and returns everything pending, lowest rank first.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.pointer.take());
        for queue in &mut self.queues {
            out.extend(queue.drain(..));
        }
        out
    }

    /// Total number of pending items.
    pub fn len(&self) -> usize {
        usize::from(self.pointer.is_some()) + self.queues.iter().map(VecDeque::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards everything pending.
    pub fn clear(&mut self) {
        self.pointer = None;
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
