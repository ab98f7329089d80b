//! The admission controller: promotes pending threads to running once per
//! tick, evicting lower-priority actives when the host is saturated.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::state::HostState;
use tagvm_types::{ExecState, Priority, ThreadId};
use tracing::{debug, trace};

impl<E: ExecState> HostState<E> {
    /// Run one admission round over the pending queue.
    ///
    /// Phase 1 fills spare active capacity in arrival order. When the host
    /// is saturated, phase 2 pits each remaining pending thread (still in
    /// arrival order) against the lowest-priority evictable active thread:
    /// strictly higher priority evicts, anything else loses. Ties favour
    /// the incumbent. Phase 3 drops whatever is left. Rejected ids wait on
    /// the rejected list until end-of-tick reaping.
    pub(crate) fn admit_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        // Phase 1: spare capacity, in order of arrival.
        while self.active.len() < self.config.max_active_threads {
            let Some(id) = self.pending.pop_front() else {
                return;
            };
            self.activate(id);
        }

        if self.pending.is_empty() {
            return;
        }

        // Saturated. Without priorities, the remaining arrivals all lose.
        if self.config.use_thread_priority {
            self.admit_by_priority();
        }

        // Phase 3: leftovers lack the priority to displace anyone.
        while let Some(id) = self.pending.pop_front() {
            trace!(thread = %id, priority = %self.thread(id).priority(), "pending thread rejected");
            self.reject(id);
        }

        debug_assert!(self.active.len() <= self.config.max_active_threads);
        self.debug_assert_invariants();
    }

    /// Phase 2: priority eviction.
    fn admit_by_priority(&mut self) {
        // Actives at or above the highest pending priority can never be
        // displaced this round; keep them out of the heap.
        let max_pending_priority = self
            .pending
            .iter()
            .map(|&id| self.thread(id).priority())
            .max()
            .expect("phase 2 runs with a non-empty pending queue");

        // Min-heap of evictable actives, lowest (priority, id) on top.
        let mut evictable: BinaryHeap<Reverse<(Priority, ThreadId)>> = self
            .active
            .iter()
            .filter(|&&id| self.thread(id).priority() < max_pending_priority)
            .map(|&id| Reverse((self.thread(id).priority(), id)))
            .collect();

        loop {
            let Some(&Reverse((active_priority, active_id))) = evictable.peek() else {
                break;
            };
            let Some(&pending_id) = self.pending.front() else {
                break;
            };
            if self.thread(pending_id).priority() > active_priority {
                evictable.pop();
                self.kill(active_id);
                self.pending.pop_front();
                self.activate(pending_id);
                debug!(
                    evicted = %active_id,
                    evicted_priority = %active_priority,
                    admitted = %pending_id,
                    admitted_priority = %self.thread(pending_id).priority(),
                    "evicting active thread for higher-priority pending thread"
                );
            } else {
                // Not enough priority to displace the cheapest incumbent.
                self.pending.pop_front();
                trace!(thread = %pending_id, "pending thread rejected");
                self.reject(pending_id);
            }
        }
    }
}
