//! End-to-end scheduling scenarios for the hardware host.
//!
//! These drive the host through the reference stepper and pin down the
//! admission policy, the frozen execution roster, capacity behavior, and
//! error propagation.

use std::sync::Arc;

use tagvm_core::EventLibrary;
use tagvm_host::Hardware;
use tagvm_stepper::{Op, ScriptedModule, ScriptedStepper, StepError};
use tagvm_types::{HostConfig, ModuleId, Priority, ThreadId};

type Host = Hardware<ScriptedStepper>;

fn host(max_active: usize, max_space: usize, program: Vec<ScriptedModule>) -> Host {
    Hardware::with_config(
        Arc::new(EventLibrary::new()),
        ScriptedStepper::new(program),
        HostConfig {
            max_active_threads: max_active,
            max_thread_space: max_space,
            use_thread_priority: true,
        },
    )
    .expect("test config is valid")
}

/// One long-running module, tag 0.
fn busy_program() -> Vec<ScriptedModule> {
    vec![ScriptedModule::busy(0, 100)]
}

const BUSY: ModuleId = ModuleId(0);

fn active_sorted(host: &Host) -> Vec<ThreadId> {
    let mut ids: Vec<ThreadId> = host.active_thread_ids().iter().copied().collect();
    ids.sort();
    ids
}

#[test]
fn test_fast_path_spawns_run_unharmed() {
    let mut host = host(4, 512, busy_program());
    let ids: Vec<ThreadId> = (0..3)
        .map(|_| {
            host.spawn_with_module(BUSY, Priority(1.0))
                .expect("thread space available")
        })
        .collect();

    host.tick().expect("tick succeeds");

    assert_eq!(active_sorted(&host), ids);
    assert_eq!(host.num_pending_threads(), 0);
    assert_eq!(host.stepper().steps_total(), 3, "each admitted thread stepped once");
    host.assert_invariants();
}

#[test]
fn test_saturated_host_admits_by_eviction() {
    let mut host = host(2, 512, busy_program());
    host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn a");
    host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn b");
    host.tick().expect("tick succeeds");

    let c = host
        .spawn_with_module(BUSY, Priority(5.0))
        .expect("spawn c");
    host.tick().expect("tick succeeds");

    assert_eq!(host.num_active_threads(), 2);
    assert!(host.active_thread_ids().contains(&c));
    host.assert_invariants();
}

#[test]
fn test_equal_priority_does_not_evict() {
    let mut host = host(1, 512, busy_program());
    let a = host
        .spawn_with_module(BUSY, Priority(2.0))
        .expect("spawn a");
    host.tick().expect("tick succeeds");

    let b = host
        .spawn_with_module(BUSY, Priority(2.0))
        .expect("spawn b");
    host.tick().expect("tick succeeds");

    assert_eq!(active_sorted(&host), vec![a]);
    assert!(host.thread(b).is_dead());
    host.assert_invariants();
}

#[test]
fn test_priority_bound_protects_strong_actives() {
    let mut host = host(2, 512, busy_program());
    let a = host
        .spawn_with_module(BUSY, Priority(1.0))
        .expect("spawn a");
    let b = host
        .spawn_with_module(BUSY, Priority(3.0))
        .expect("spawn b");
    host.tick().expect("tick succeeds");

    let c = host
        .spawn_with_module(BUSY, Priority(2.0))
        .expect("spawn c");
    host.tick().expect("tick succeeds");

    // B (3.0) outranks the admission bound; only A (1.0) was evictable.
    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(active_sorted(&host), expected);
    assert!(host.thread(a).is_dead());
    host.assert_invariants();
}

#[test]
fn test_arrival_order_spends_the_eviction_budget() {
    let mut host = host(1, 512, busy_program());
    let a = host
        .spawn_with_module(BUSY, Priority(5.0))
        .expect("spawn a");
    host.tick().expect("tick succeeds");

    let b = host
        .spawn_with_module(BUSY, Priority(6.0))
        .expect("spawn b");
    let c = host
        .spawn_with_module(BUSY, Priority(7.0))
        .expect("spawn c");
    host.tick().expect("tick succeeds");

    // B arrived first and evicted A; nothing was left for C to evict.
    assert_eq!(active_sorted(&host), vec![b]);
    assert!(host.thread(a).is_dead());
    assert!(host.thread(c).is_dead());
    host.assert_invariants();
}

#[test]
fn test_thread_space_exhaustion_is_a_soft_drop() {
    let mut host = host(3, 3, busy_program());
    for _ in 0..3 {
        host.spawn_with_module(BUSY, Priority(1.0))
            .expect("within thread space");
    }

    assert_eq!(host.spawn_with_module(BUSY, Priority(1.0)), None);
    assert_eq!(host.thread_count(), 3, "failed spawn must not grow the pool");
    assert_eq!(host.num_pending_threads(), 3, "failed spawn changes nothing");
    host.assert_invariants();
}

#[test]
fn test_admission_monotonicity() {
    // No pending thread outranks any active thread: nobody dies.
    let mut host = host(2, 512, busy_program());
    let a = host
        .spawn_with_module(BUSY, Priority(2.0))
        .expect("spawn a");
    let b = host
        .spawn_with_module(BUSY, Priority(2.0))
        .expect("spawn b");
    host.tick().expect("tick succeeds");

    host.spawn_with_module(BUSY, Priority(2.0)).expect("spawn c");
    host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn d");
    host.tick().expect("tick succeeds");

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(active_sorted(&host), expected);
    host.assert_invariants();
}

#[test]
fn test_mid_tick_spawns_wait_for_next_tick() {
    // Module 0 spawns another copy of itself on its first step.
    let program = vec![ScriptedModule::new(
        0,
        vec![
            Op::SpawnModule {
                module: ModuleId(0),
                priority: Priority(1.0),
            },
            Op::Work,
            Op::Work,
        ],
    )];
    let mut host = host(4, 512, program);
    host.spawn_with_module(ModuleId(0), Priority(1.0))
        .expect("spawn root");

    host.tick().expect("tick succeeds");
    assert_eq!(
        host.stepper().steps_total(),
        1,
        "the mid-tick child must not run this tick"
    );
    assert_eq!(host.num_pending_threads(), 1);

    host.tick().expect("tick succeeds");
    // Root works, child spawns a grandchild.
    assert_eq!(host.stepper().steps_total(), 3);
    assert_eq!(host.num_pending_threads(), 1);
    host.assert_invariants();
}

#[test]
fn test_mid_tick_kill_skips_the_victim() {
    let program = vec![
        ScriptedModule::new(0, vec![Op::Kill(ThreadId(1)), Op::Work]),
        ScriptedModule::busy(1, 100),
    ];
    let mut host = host(2, 512, program);
    let killer = host
        .spawn_with_module(ModuleId(0), Priority(1.0))
        .expect("spawn killer");
    let victim = host
        .spawn_with_module(ModuleId(1), Priority(1.0))
        .expect("spawn victim");

    host.tick().expect("tick succeeds");

    assert_eq!(
        host.stepper().steps_total(),
        1,
        "a thread killed earlier in the roster is skipped"
    );
    assert!(host.thread(victim).is_dead());
    assert_eq!(active_sorted(&host), vec![killer]);
    assert!(
        host.unused_thread_ids().contains(&victim),
        "the victim was reaped back onto the unused stack"
    );
    host.assert_invariants();
}

#[test]
fn test_halted_threads_free_their_slots_for_reuse() {
    let program = vec![ScriptedModule::new(0, vec![Op::Work])];
    let mut host = host(4, 512, program);
    let a = host
        .spawn_with_module(ModuleId(0), Priority(1.0))
        .expect("spawn");

    // Tick 1: the single op runs. Tick 2: past the end, the thread halts.
    host.run(2).expect("ticks succeed");

    assert_eq!(host.num_active_threads(), 0);
    assert!(host.thread(a).is_dead());

    // The freed slot is the next one handed out.
    let b = host
        .spawn_with_module(ModuleId(0), Priority(1.0))
        .expect("spawn reuses slot");
    assert_eq!(b, a);
    host.assert_invariants();
}

#[test]
fn test_stepper_error_propagates_with_invariants_intact() {
    let program = vec![
        ScriptedModule::new(0, vec![Op::Fail("broken wire")]),
        ScriptedModule::busy(1, 100),
    ];
    let mut host = host(4, 512, program);
    host.spawn_with_module(ModuleId(0), Priority(1.0))
        .expect("spawn failing thread");
    host.spawn_with_module(ModuleId(1), Priority(1.0))
        .expect("spawn bystander");

    let err = host.tick().expect_err("stepper failure surfaces");
    assert_eq!(err, StepError("broken wire"));

    assert!(!host.is_executing(), "executing flag cleared after an error");
    assert_eq!(host.cur_thread_id(), None);
    assert_eq!(
        host.stepper().steps_total(),
        1,
        "execution aborts at the failing step"
    );
    host.assert_invariants();

    // The host remains usable; the failing thread is still scheduled and
    // fails again next tick.
    let err = host.tick().expect_err("still failing");
    assert_eq!(err, StepError("broken wire"));
}

#[test]
fn test_spawn_with_tag_picks_closest_module() {
    let program = vec![
        ScriptedModule::busy(0b0000, 4),
        ScriptedModule::busy(0b1111, 4),
    ];
    let mut host = host(4, 512, program);

    let id = host
        .spawn_with_tag(&0b1110, Priority(1.0))
        .expect("a module matches");
    assert_eq!(host.thread(id).exec_state().module(), Some(ModuleId(1)));

    // No modules at all: no match, no spawn.
    host.reset_program();
    assert_eq!(host.spawn_with_tag(&0b1110, Priority(1.0)), None);
    host.assert_invariants();
}

#[test]
fn test_spawn_many_collects_partial_success() {
    let program = vec![
        ScriptedModule::busy(0b0000, 4),
        ScriptedModule::busy(0b0001, 4),
        ScriptedModule::busy(0b0011, 4),
    ];

    // Plenty of room: one thread per match, best match first.
    let mut roomy = host(4, 512, program.clone());
    let ids = roomy.spawn_many(&0b0000, 2, Priority(1.0));
    assert_eq!(ids.len(), 2);
    assert_eq!(
        roomy.thread(ids[0]).exec_state().module(),
        Some(ModuleId(0))
    );
    assert_eq!(
        roomy.thread(ids[1]).exec_state().module(),
        Some(ModuleId(1))
    );

    // Thread space for only one: partial success.
    let mut cramped = host(1, 1, program);
    let ids = cramped.spawn_many(&0b0000, 3, Priority(1.0));
    assert_eq!(ids.len(), 1, "exhaustion truncates the spawn batch");
    cramped.assert_invariants();
}

#[test]
fn test_pool_grows_on_demand_up_to_the_cap() {
    let mut host = host(2, 8, busy_program());
    assert_eq!(host.thread_count(), 4, "initial pool is twice max_active");

    for _ in 0..6 {
        host.spawn_with_module(BUSY, Priority(1.0))
            .expect("within thread space");
    }
    assert_eq!(host.thread_count(), 6, "pool grew on demand");
    assert!(host.thread_count() <= host.max_thread_space());
    host.assert_invariants();
}

#[test]
fn test_reset_base_state_restores_a_fresh_host() {
    let mut host = host(2, 512, busy_program());
    for _ in 0..5 {
        host.spawn_with_module(BUSY, Priority(3.0))
            .expect("within thread space");
    }
    host.run(3).expect("ticks succeed");

    host.reset_base_state();

    assert_eq!(host.num_active_threads(), 0);
    assert_eq!(host.num_pending_threads(), 0);
    assert_eq!(host.num_queued_events(), 0);
    assert_eq!(host.thread_exec_order().len(), 0);
    assert_eq!(host.num_unused_threads(), host.thread_count());
    assert_eq!(host.cur_thread_id(), None);
    host.assert_invariants();

    // Slots hand out from the lowest id again, like a new host.
    let first = host
        .spawn_with_module(BUSY, Priority(1.0))
        .expect("spawn on fresh state");
    assert_eq!(first, ThreadId(0));
}

#[test]
#[should_panic(expected = "no current thread")]
fn test_cur_thread_requires_execution() {
    let host = host(2, 512, busy_program());
    host.cur_thread();
}

#[test]
fn test_fifo_admission_when_priority_disabled() {
    let mut host: Host = Hardware::with_config(
        Arc::new(EventLibrary::new()),
        ScriptedStepper::new(busy_program()),
        HostConfig {
            max_active_threads: 1,
            max_thread_space: 512,
            use_thread_priority: false,
        },
    )
    .expect("test config is valid");

    let a = host
        .spawn_with_module(BUSY, Priority(1.0))
        .expect("spawn a");
    host.tick().expect("tick succeeds");

    let b = host
        .spawn_with_module(BUSY, Priority(100.0))
        .expect("spawn b");
    host.tick().expect("tick succeeds");

    assert_eq!(active_sorted(&host), vec![a], "FIFO mode never evicts");
    assert!(host.thread(b).is_dead());
    host.assert_invariants();
}

#[test]
#[tracing_test::traced_test]
fn test_eviction_is_logged() {
    let mut host = host(1, 512, busy_program());
    host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn a");
    host.tick().expect("tick succeeds");

    host.spawn_with_module(BUSY, Priority(2.0)).expect("spawn b");
    host.tick().expect("tick succeeds");

    assert!(logs_contain("evicting active thread"));
}

#[test]
fn test_thread_usage_snapshot() {
    let mut host = host(2, 512, busy_program());
    let a = host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn a");
    host.tick().expect("tick succeeds");
    host.spawn_with_module(BUSY, Priority(1.0)).expect("spawn b");

    let usage = host.thread_usage();
    assert_eq!(usage.active, vec![a]);
    assert_eq!(usage.pending.len(), 1);
    assert_eq!(
        usage.active.len() + usage.pending.len() + usage.unused.len(),
        host.thread_count()
    );

    let rendered = usage.to_string();
    assert!(rendered.contains("active (1): [t0]"), "got: {rendered}");
    assert!(rendered.contains("pending (1)"), "got: {rendered}");
}
