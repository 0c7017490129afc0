//! Property-based tests for the transition algorithm.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use nestate::{Machine, Outcome, Source, State, Transition};
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A machine with `n` states, each reachable from anywhere by `to_<k>`.
fn ring(queue: bool, n: usize) -> (Machine, Vec<State>, Vec<Transition>) {
    let machine = Machine::builder("ring")
        .queue(queue)
        .history_limit(64)
        .build();
    let states: Vec<State> = (0..n)
        .map(|k| machine.state(format!("s{k}")).unwrap())
        .collect();
    let transitions = states
        .iter()
        .enumerate()
        .map(|(k, state)| {
            machine
                .transition(format!("to_{k}"), Source::Any, state)
                .unwrap()
        })
        .collect();
    machine.initialize(&states[0]).unwrap();
    (machine, states, transitions)
}

proptest! {
    #[test]
    fn guard_conjunction(verdicts in prop::collection::vec(any::<bool>(), 0..8)) {
        let machine = Machine::new("m");
        let a = machine.state("a").unwrap();
        let b = machine.state("b").unwrap();
        let go = machine.transition("go", &a, &b).unwrap();
        for verdict in verdicts.clone() {
            go.guard(move |_| verdict);
        }
        machine.initialize(&a).unwrap();
        machine.start().unwrap();

        let expected = verdicts.iter().all(|v| *v);
        prop_assert_eq!(go.fire(), expected);
        prop_assert_eq!(b.is_active(), expected);
        prop_assert_eq!(a.is_active(), !expected);
    }

    #[test]
    fn queued_attempts_replay_in_order(attempts in prop::collection::vec(0..4usize, 0..12)) {
        let (machine, states, transitions) = ring(true, 4);
        for k in &attempts {
            prop_assert_eq!(transitions[*k].attempt(()), Outcome::Queued);
        }
        prop_assert_eq!(machine.pending(), attempts.len());

        machine.start().unwrap();

        prop_assert_eq!(machine.pending(), 0);
        let last = attempts.last().copied().unwrap_or(0);
        prop_assert!(states[last].is_active());

        let history = machine.history();
        let mut expected = vec!["None".to_string(), "s0".to_string()];
        expected.extend(attempts.iter().map(|k| format!("s{k}")));
        let path: Vec<String> = history.path().iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(path, expected);
    }

    #[test]
    fn unqueued_attempts_are_dropped(attempts in prop::collection::vec(0..4usize, 0..12)) {
        let (machine, states, transitions) = ring(false, 4);
        for k in &attempts {
            prop_assert_eq!(transitions[*k].attempt(()), Outcome::Discarded);
        }

        machine.start().unwrap();

        prop_assert_eq!(machine.pending(), 0);
        prop_assert!(states[0].is_active());
        prop_assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn rejected_attempts_have_no_effect(presses in prop::collection::vec(any::<bool>(), 1..20)) {
        let machine = Machine::new("switch");
        let off = machine.state("off").unwrap();
        let on = machine.state("on").unwrap();
        let turn_on = machine.transition("turnOn", &off, &on).unwrap();
        let turn_off = machine.transition("turnOff", &on, &off).unwrap();
        machine.initialize(&off).unwrap();
        machine.start().unwrap();

        let events = Rc::new(Cell::new(0));
        for state in [&off, &on] {
            let enters = Rc::clone(&events);
            let _ = state.on_enter(move |_| enters.set(enters.get() + 1));
            let exits = Rc::clone(&events);
            let _ = state.on_exit(move || exits.set(exits.get() + 1));
        }
        let changes = Rc::clone(&events);
        let _ = machine.on_change(move |_| changes.set(changes.get() + 1));

        let mut lit = false;
        for press_on in presses {
            let before = events.get();
            let applied = if press_on { turn_on.fire() } else { turn_off.fire() };

            prop_assert_eq!(applied, press_on != lit);
            if applied {
                lit = press_on;
                prop_assert_eq!(events.get(), before + 3);
            } else {
                prop_assert_eq!(events.get(), before);
            }
            prop_assert_eq!(on.is_active(), lit);
            prop_assert_eq!(off.is_active(), !lit);
        }
    }

    #[test]
    fn payload_tracks_latest_entry(payloads in prop::collection::vec(any::<u32>(), 1..10)) {
        let machine = Machine::new("m");
        let idle = machine.state("idle").unwrap();
        let holding = machine.pstate::<u32>("holding").unwrap();
        let hold = machine.ptransition("hold", Source::Any, &holding).unwrap();
        let release = machine.transition("release", &holding, &idle).unwrap();
        machine.initialize(&idle).unwrap();
        machine.start().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _ = holding.on_enter(move |n| sink.borrow_mut().push(*n));

        for payload in &payloads {
            prop_assert!(hold.fire_with(*payload));
            prop_assert_eq!(holding.data(), Ok(*payload));
        }
        prop_assert_eq!(&*seen.borrow(), &payloads);

        prop_assert!(release.fire());
        prop_assert!(holding.data().is_err());
    }
}
