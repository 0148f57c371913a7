#![allow(missing_docs)]
//! Composite constructs: scopes, ranges, repeats, and their ordering
//! barriers.

mod common;

use common::*;
use proptest::prelude::*;
use reroutine::{Routine, Time, TimeSource};
use std::cell::{Cell, RefCell};
use std::time::Duration;

#[test]
fn test_for_range_runs_each_index_once() {
    init_test("test_for_range_runs_each_index_once");
    let mut routine = Routine::new();
    let seen = RefCell::new(Vec::new());

    let polls = drive(&mut routine, |r| {
        r.start();
        r.for_range(0, 3, |r, i| {
            r.step(|| seen.borrow_mut().push(i));
        });
        r.end();
    })
    .expect("completes");

    assert_eq!(polls, 1);
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
}

#[test]
fn test_for_range_interleaves_waits_per_iteration() {
    init_test("test_for_range_interleaves_waits_per_iteration");
    let (clock, mut routine) = test_routine();
    let log = RefCell::new(Vec::new());

    let polls = drive(&mut routine, |r| {
        r.start();
        r.for_range(0, 3, |r, i| {
            r.step(|| log.borrow_mut().push(("work", i)));
            r.wait_for(Duration::from_millis(10));
        });
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    // One iteration per 10ms tick: the next index never starts early.
    assert_eq!(*log.borrow(), vec![("work", 0), ("work", 1), ("work", 2)]);
    assert_with_log!(polls == 4, "completion poll", 4, polls);
    test_complete!("test_for_range_interleaves_waits_per_iteration", polls = polls);
}

#[test]
fn test_empty_range_completes_in_order() {
    init_test("test_empty_range_completes_in_order");
    let mut routine = Routine::new();
    let after = Cell::new(0);
    let body_ran = Cell::new(false);

    let polls = drive(&mut routine, |r| {
        r.start();
        r.for_range(5, 5, |_, _| body_ran.set(true));
        r.for_range(3, 0, |_, _| body_ran.set(true));
        r.step(|| after.set(after.get() + 1));
        r.end();
    })
    .expect("completes");

    assert_eq!(polls, 1);
    assert!(!body_ran.get());
    assert_eq!(after.get(), 1);
}

#[test]
fn test_negative_bounds_iterate_in_order() {
    init_test("test_negative_bounds_iterate_in_order");
    let mut routine = Routine::new();
    let seen = RefCell::new(Vec::new());

    drive(&mut routine, |r| {
        r.start();
        r.for_range(-2, 1, |r, i| r.step(|| seen.borrow_mut().push(i)));
        r.end();
    })
    .expect("completes");

    assert_eq!(*seen.borrow(), vec![-2, -1, 0]);
}

#[test]
fn test_repeat_runs_the_body_n_times() {
    init_test("test_repeat_runs_the_body_n_times");
    let mut routine = Routine::new();
    let hits = Cell::new(0);

    drive(&mut routine, |r| {
        r.start();
        r.repeat(4, |r| r.step(|| hits.set(hits.get() + 1)));
        r.end();
    })
    .expect("completes");

    assert_eq!(hits.get(), 4);
}

#[test]
fn test_repeat_iterations_form_an_ordering_barrier() {
    init_test("test_repeat_iterations_form_an_ordering_barrier");
    let (clock, mut routine) = test_routine();
    let log = RefCell::new(Vec::new());
    let tail = Cell::new(0);

    let polls = drive(&mut routine, |r| {
        r.start();
        r.repeat(2, |r| {
            r.step(|| log.borrow_mut().push("a"));
            r.wait_for(Duration::from_millis(10));
            r.step(|| log.borrow_mut().push("b"));
        });
        r.step(|| tail.set(tail.get() + 1));
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    // Both iterations run to completion in order, and the step after the
    // repeat waits for the whole block.
    assert_eq!(*log.borrow(), vec!["a", "b", "a", "b"]);
    assert_eq!(tail.get(), 1);
    assert_eq!(polls, 3);
    test_complete!("test_repeat_iterations_form_an_ordering_barrier", polls = polls);
}

#[test]
fn test_composite_body_waits_for_preceding_work() {
    init_test("test_composite_body_waits_for_preceding_work");
    let (clock, mut routine) = test_routine();
    let entered = Cell::new(0);
    let mut body = |r: &mut Routine| {
        r.start();
        r.wait_for(Duration::from_millis(10));
        r.repeat(1, |r| {
            entered.set(entered.get() + 1);
            r.step(|| ());
        });
        r.end();
    };

    drive_n(&mut routine, 1, &mut body);
    // The block is not even entered while the wait before it is pending.
    assert_eq!(entered.get(), 0);

    clock.advance(ms(10));
    drive_n(&mut routine, 1, &mut body);
    assert_eq!(entered.get(), 1);
    assert!(routine.is_completed());
}

#[test]
fn test_scope_groups_nested_work_and_reenters() {
    init_test("test_scope_groups_nested_work_and_reenters");
    let (clock, mut routine) = test_routine();
    let entries = Cell::new(0);
    let order = RefCell::new(Vec::new());

    let polls = drive(&mut routine, |r| {
        r.start();
        r.scope(|r| {
            entries.set(entries.get() + 1);
            r.step(|| order.borrow_mut().push("inner start"));
            r.wait_for(Duration::from_millis(20));
            r.step(|| order.borrow_mut().push("inner finish"));
        });
        r.step(|| order.borrow_mut().push("after scope"));
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    assert_eq!(polls, 3);
    // The body re-enters on every pending poll; its steps still run once.
    assert_eq!(entries.get(), 3);
    assert_eq!(
        *order.borrow(),
        vec!["inner start", "inner finish", "after scope"]
    );
}

#[test]
fn test_sequential_scopes_finalize_in_order() {
    init_test("test_sequential_scopes_finalize_in_order");
    let (clock, mut routine) = test_routine();
    let order = RefCell::new(Vec::new());

    let polls = drive(&mut routine, |r| {
        r.start();
        r.scope(|r| {
            r.wait_for(Duration::from_millis(10));
            r.step(|| order.borrow_mut().push("first block"));
        });
        r.scope(|r| {
            r.step(|| order.borrow_mut().push("second block"));
        });
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    assert_eq!(*order.borrow(), vec!["first block", "second block"]);
    assert_eq!(polls, 2);
}

#[test]
fn test_one_helper_under_two_scopes_runs_twice() {
    init_test("test_one_helper_under_two_scopes_runs_twice");
    let (clock, mut routine) = test_routine();
    let first = Cell::new(0);
    let second = Cell::new(0);

    // One helper, two enclosing scopes: the scope frames keep the helper's
    // internal call sites from colliding across the two invocations.
    let helper = |r: &mut Routine| {
        r.step(|| first.set(first.get() + 1));
        r.wait_for(Duration::from_millis(10));
        r.step(|| second.set(second.get() + 1));
    };

    let polls = drive(&mut routine, |r| {
        r.start();
        r.scope(|r| helper(r));
        r.scope(|r| helper(r));
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    assert_eq!(first.get(), 2);
    assert_eq!(second.get(), 2);
    assert_eq!(polls, 3);
}

#[test]
fn test_nested_loops_visit_disjoint_paths() {
    init_test("test_nested_loops_visit_disjoint_paths");
    let mut routine = Routine::new();
    let cells = RefCell::new(Vec::new());

    drive(&mut routine, |r| {
        r.start();
        r.for_range(0, 3, |r, i| {
            r.for_range(0, 2, |r, j| {
                r.step(|| cells.borrow_mut().push((i, j)));
            });
        });
        r.end();
    })
    .expect("completes");

    assert_eq!(
        *cells.borrow(),
        vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]
    );
}

#[test]
fn test_nested_loops_with_waits_converge() {
    init_test("test_nested_loops_with_waits_converge");
    let (clock, mut routine) = test_routine();
    let outer_work = Cell::new(0);
    let inner_work = RefCell::new(vec![0; 3]);

    drive(&mut routine, |r| {
        r.start();
        r.for_range(0, 3, |r, i| {
            r.step(|| outer_work.set(outer_work.get() + 1));
            r.wait_for(Duration::from_millis(10));
            r.for_range(0, 2, |r, _| {
                r.step(|| inner_work.borrow_mut()[i as usize] += 1);
                r.wait_for(Duration::from_millis(10));
            });
        });
        r.end();
        clock.advance(ms(10));
    })
    .expect("completes");

    assert_eq!(outer_work.get(), 3);
    assert_eq!(*inner_work.borrow(), vec![2, 2, 2]);
}

#[test]
fn test_repeat_within_repeat_accumulates() {
    init_test("test_repeat_within_repeat_accumulates");
    let mut routine = Routine::new();
    let outer_before = Cell::new(0);
    let inner_hits = Cell::new(0);
    let outer_after = Cell::new(0);

    drive(&mut routine, |r| {
        r.start();
        r.repeat(2, |r| {
            r.step(|| outer_before.set(outer_before.get() + 1));
            r.repeat(3, |r| {
                r.step(|| inner_hits.set(inner_hits.get() + 1));
            });
            r.step(|| outer_after.set(outer_after.get() + 1));
        });
        r.end();
    })
    .expect("completes");

    assert_eq!(outer_before.get(), 2);
    assert_eq!(inner_hits.get(), 6);
    assert_eq!(outer_after.get(), 2);
}

#[test]
fn test_panicking_step_is_retried_and_stack_stays_balanced() {
    init_test("test_panicking_step_is_retried_and_stack_stays_balanced");
    let mut routine = Routine::new();
    let boom = Cell::new(true);
    let recovered = Cell::new(0);
    let body = |r: &mut Routine| {
        r.start();
        r.scope(|r| {
            r.step(|| {
                if boom.get() {
                    panic!("transient failure");
                }
                recovered.set(recovered.get() + 1);
            });
        });
        r.end();
    };

    let outcome =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| body(&mut routine)));
    assert!(outcome.is_err());
    assert!(!routine.is_completed());

    // The failed step was never finalized; the next poll retries it.
    boom.set(false);
    body(&mut routine);
    assert!(routine.is_completed());
    assert_eq!(recovered.get(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The poll schedule decides when steps happen, never what happens or
    /// in which order.
    #[test]
    fn outcome_is_schedule_independent(
        advances in proptest::collection::vec(0u64..ms(30), 0..40),
    ) {
        let (clock, mut routine) = test_routine();
        let log = RefCell::new(Vec::new());
        let mut body = |r: &mut Routine| {
            r.start();
            r.step(|| log.borrow_mut().push('a'));
            r.wait_for(Duration::from_millis(25));
            r.step(|| log.borrow_mut().push('b'));
            r.wait_until_or_for(|| false, Duration::from_millis(25));
            r.step(|| log.borrow_mut().push('c'));
            r.end();
        };

        for nanos in advances {
            if routine.is_completed() {
                break;
            }
            body(&mut routine);
            clock.advance(nanos);
        }
        if !routine.is_completed() {
            let mut finish = |r: &mut Routine| {
                body(r);
                clock.advance(ms(5));
            };
            drive(&mut routine, &mut finish).expect("completes under steady polling");
        }

        prop_assert_eq!(log.borrow().clone(), vec!['a', 'b', 'c']);
        prop_assert!(clock.now() >= Time::from_millis(50));

        drive_n(&mut routine, 5, &mut body);
        prop_assert_eq!(log.borrow().len(), 3);
    }

    /// A repeat block runs its body exactly `times` times under any
    /// polling schedule, zero included.
    #[test]
    fn repeat_counts_survive_any_schedule(
        times in 0u64..5,
        advances in proptest::collection::vec(0u64..ms(12), 0..30),
    ) {
        let (clock, mut routine) = test_routine();
        let hits = Cell::new(0u64);
        let body = |r: &mut Routine| {
            r.start();
            r.repeat(times, |r| {
                r.step(|| hits.set(hits.get() + 1));
                r.wait_for(Duration::from_millis(5));
            });
            r.end();
        };

        for nanos in advances {
            if routine.is_completed() {
                break;
            }
            body(&mut routine);
            clock.advance(nanos);
        }
        if !routine.is_completed() {
            let mut finish = |r: &mut Routine| {
                body(r);
                clock.advance(ms(5));
            };
            drive(&mut routine, &mut finish).expect("completes under steady polling");
        }

        prop_assert_eq!(hits.get(), times);
    }
}
