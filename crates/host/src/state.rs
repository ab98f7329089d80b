//! Host scheduling state: the thread pool arena and its index views.
//!
//! The pool exclusively owns every thread record. The views — active set,
//! pending queue, unused stack, execution order, rejected transit list —
//! hold only [`ThreadId`]s. A thread id appears in exactly one of the
//! active set (running), pending queue (pending), or unused stack (dead),
//! except that dead ids may sit in the execution order or the rejected list
//! until end-of-tick reaping returns them to the unused stack.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use tagvm_core::Event;
use tagvm_types::{ExecState, HostConfig, RunState, Thread, ThreadId};
use tracing::trace;

pub(crate) struct HostState<E> {
    pub(crate) config: HostConfig,

    /// The arena. Grow-only, up to `config.max_thread_space` slots.
    pub(crate) threads: Vec<Thread<E>>,

    /// Order in which running threads are stepped within a tick. May carry
    /// ids of threads that died mid-tick; reaping removes them.
    pub(crate) exec_order: Vec<ThreadId>,

    /// Ids of running threads.
    pub(crate) active: HashSet<ThreadId>,

    /// LIFO of dead thread ids available for reuse. Populated in
    /// reverse-index order so the lowest ids are handed out first.
    pub(crate) unused: Vec<ThreadId>,

    /// FIFO of pending thread ids, in spawn-arrival order.
    pub(crate) pending: VecDeque<ThreadId>,

    /// Dead ids rejected by admission, held here until reaping returns them
    /// to the unused stack.
    pub(crate) rejected: Vec<ThreadId>,

    /// Events queued for the next tick.
    pub(crate) event_queue: VecDeque<Box<dyn Event>>,

    /// Thread currently being stepped. Valid only while `is_executing`.
    pub(crate) cur_thread: Option<ThreadId>,

    /// Set for the duration of a tick's execution phase.
    pub(crate) is_executing: bool,
}

impl<E: ExecState> HostState<E> {
    pub(crate) fn new(config: HostConfig) -> Self {
        let initial = config.initial_pool_size();
        let mut state = Self {
            config,
            threads: (0..initial).map(|_| Thread::new()).collect(),
            exec_order: Vec::new(),
            active: HashSet::new(),
            unused: Vec::with_capacity(initial),
            pending: VecDeque::new(),
            rejected: Vec::new(),
            event_queue: VecDeque::new(),
            cur_thread: None,
            is_executing: false,
        };
        state.fill_unused_stack();
        state
    }

    /// Rebuild the unused stack over the whole pool, lowest ids on top.
    fn fill_unused_stack(&mut self) {
        self.unused.clear();
        self.unused
            .extend((0..self.threads.len()).rev().map(ThreadId::from_index));
    }

    pub(crate) fn thread(&self, id: ThreadId) -> &Thread<E> {
        assert!(id.index() < self.threads.len(), "invalid thread id {id}");
        &self.threads[id.index()]
    }

    pub(crate) fn thread_mut(&mut self, id: ThreadId) -> &mut Thread<E> {
        assert!(id.index() < self.threads.len(), "invalid thread id {id}");
        &mut self.threads[id.index()]
    }

    /// Promote a pending thread to running: into the active set, onto the
    /// execution order.
    ///
    /// Panics if the thread is not pending.
    pub(crate) fn activate(&mut self, id: ThreadId) {
        assert!(
            self.thread(id).is_pending(),
            "cannot activate {id}: thread is {:?}",
            self.thread(id).run_state()
        );
        debug_assert!(
            !self.exec_order.contains(&id),
            "thread {id} is already scheduled"
        );
        self.active.insert(id);
        self.exec_order.push(id);
        self.thread_mut(id).set_running();
        trace!(thread = %id, "thread activated");
    }

    /// Mark a thread dead and drop it from the active set. Leaves the
    /// execution order untouched so in-flight iteration stays stable; the
    /// id returns to the unused stack at reaping. Idempotent on dead
    /// threads. A pending target is dropped from the pending queue and held
    /// on the rejected list until reaping.
    pub(crate) fn kill(&mut self, id: ThreadId) {
        if self.thread(id).is_dead() {
            return;
        }
        let was_pending = self.thread(id).is_pending();
        self.thread_mut(id).set_dead();
        self.active.remove(&id);
        if was_pending {
            self.pending.retain(|&pending_id| pending_id != id);
            self.rejected.push(id);
        }
        trace!(thread = %id, "thread killed");
    }

    /// Return a dead thread's id to the unused stack.
    pub(crate) fn release(&mut self, id: ThreadId) {
        debug_assert!(self.thread(id).is_dead(), "releasing live thread {id}");
        self.unused.push(id);
    }

    /// Claim a dead slot for a new spawn: pop the unused stack, or extend
    /// the pool while it is below `max_thread_space`. `None` means thread
    /// space is exhausted.
    pub(crate) fn alloc_slot(&mut self) -> Option<ThreadId> {
        if let Some(id) = self.unused.pop() {
            return Some(id);
        }
        if self.threads.len() < self.config.max_thread_space {
            let id = ThreadId::from_index(self.threads.len());
            self.threads.push(Thread::new());
            return Some(id);
        }
        None
    }

    /// Queue a freshly-initialized thread for the next admission round.
    pub(crate) fn mark_pending(&mut self, id: ThreadId) {
        self.thread_mut(id).set_pending();
        self.pending.push_back(id);
    }

    /// Reject a pending thread: it loses admission and waits on the
    /// rejected list for reaping.
    pub(crate) fn reject(&mut self, id: ThreadId) {
        debug_assert!(self.thread(id).is_pending(), "rejecting non-pending {id}");
        self.thread_mut(id).set_dead();
        self.rejected.push(id);
    }

    /// End-of-tick cleanup: compact the execution order down to running
    /// threads and return every dead id — mid-tick deaths and admission
    /// rejects alike — to the unused stack.
    pub(crate) fn reap(&mut self) {
        let order = std::mem::take(&mut self.exec_order);
        for id in order {
            if self.thread(id).is_running() {
                self.exec_order.push(id);
            } else {
                self.release(id);
            }
        }
        let rejected = std::mem::take(&mut self.rejected);
        for id in rejected {
            self.release(id);
        }
    }

    /// Tear the scheduling state back down to freshly-constructed: every
    /// slot reset, all views emptied, the whole pool on the unused stack.
    pub(crate) fn reset_base_state(&mut self) {
        assert!(!self.is_executing, "cannot reset hardware while executing");
        self.event_queue.clear();
        for thread in &mut self.threads {
            thread.reset();
        }
        self.exec_order.clear();
        self.active.clear();
        self.pending.clear();
        self.rejected.clear();
        self.fill_unused_stack();
        self.cur_thread = None;
    }

    /// Check every cross-container invariant, panicking on violation.
    pub(crate) fn assert_invariants(&self) {
        assert!(
            self.active.len() <= self.config.max_active_threads,
            "active set exceeds max_active_threads"
        );
        assert!(
            self.threads.len() <= self.config.max_thread_space,
            "pool exceeds max_thread_space"
        );

        let pending: HashSet<ThreadId> = self.pending.iter().copied().collect();
        let unused: HashSet<ThreadId> = self.unused.iter().copied().collect();
        let rejected: HashSet<ThreadId> = self.rejected.iter().copied().collect();
        let scheduled: HashSet<ThreadId> = self.exec_order.iter().copied().collect();
        assert_eq!(pending.len(), self.pending.len(), "duplicate pending ids");
        assert_eq!(unused.len(), self.unused.len(), "duplicate unused ids");
        assert_eq!(
            scheduled.len(),
            self.exec_order.len(),
            "duplicate execution order ids"
        );

        assert!(self.active.is_disjoint(&pending), "active ∩ pending");
        assert!(self.active.is_disjoint(&unused), "active ∩ unused");
        assert!(self.active.is_disjoint(&rejected), "active ∩ rejected");
        assert!(pending.is_disjoint(&unused), "pending ∩ unused");
        assert!(pending.is_disjoint(&rejected), "pending ∩ rejected");
        assert!(unused.is_disjoint(&rejected), "unused ∩ rejected");

        for (index, thread) in self.threads.iter().enumerate() {
            let id = ThreadId::from_index(index);
            match thread.run_state() {
                RunState::Running => {
                    assert!(self.active.contains(&id), "running {id} not in active set");
                }
                RunState::Pending => {
                    assert!(pending.contains(&id), "pending {id} not in pending queue");
                }
                RunState::Dead => {
                    assert!(
                        unused.contains(&id) || rejected.contains(&id) || scheduled.contains(&id),
                        "dead {id} is unaccounted for"
                    );
                }
            }
        }
        for &id in &self.active {
            assert!(self.thread(id).is_running(), "active set holds stale {id}");
        }
        for &id in &unused {
            assert!(self.thread(id).is_dead(), "unused stack holds live {id}");
        }
    }

    /// Invariant check compiled only into debug builds; sprinkled after the
    /// state-changing phases of a tick.
    pub(crate) fn debug_assert_invariants(&self) {
        if cfg!(debug_assertions) {
            self.assert_invariants();
        }
    }
}

impl<E> fmt::Debug for HostState<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostState")
            .field("threads", &self.threads.len())
            .field("active", &self.active.len())
            .field("pending", &self.pending.len())
            .field("unused", &self.unused.len())
            .field("exec_order", &self.exec_order.len())
            .field("queued_events", &self.event_queue.len())
            .field("cur_thread", &self.cur_thread)
            .field("is_executing", &self.is_executing)
            .finish()
    }
}
