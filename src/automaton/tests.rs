use std::collections::BTreeMap;

use super::*;

/// Two-state automaton accepting exactly the byte `label`.
fn single_byte(label: u8, start: StateId, stop: StateId) -> ScratchNfa {
    ScratchNfa::new(
        BTreeMap::from([
            (start, EdgeTable::with_edges([(label, stop)])),
            (stop, EdgeTable::new()),
        ]),
        start,
        stop,
    )
}

#[test]
fn test_add_edge_creates_missing_state() {
    let mut nfa = single_byte(b'a', 0, 1);
    nfa.add_edge(b'z', 7, 1);
    assert_eq!(nfa.targets(7, b'z'), &[1]);
    assert_eq!(nfa.state_count(), 3);
}

#[test]
fn test_merge_state_concatenates_per_label() {
    let mut nfa = single_byte(b'a', 0, 1);
    nfa.merge_state(0, EdgeTable::with_edges([(b'a', 5), (b'b', 6)]));
    assert_eq!(nfa.targets(0, b'a'), &[1, 5]);
    assert_eq!(nfa.targets(0, b'b'), &[6]);
}

#[test]
fn test_rename_state_rewrites_incoming_edges() {
    // 0 --a--> 1 --b--> 2, with a self-loop on 1.
    let mut nfa = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(b'a', 1)])),
            (1, EdgeTable::with_edges([(b'b', 2), (b'c', 1)])),
            (2, EdgeTable::new()),
        ]),
        0,
        2,
    );
    nfa.rename_state(1, 9);
    assert_eq!(nfa.targets(0, b'a'), &[9]);
    assert_eq!(nfa.targets(9, b'b'), &[2]);
    // The self-loop follows the rename too.
    assert_eq!(nfa.targets(9, b'c'), &[9]);
    assert!(nfa.targets(1, b'b').is_empty());
}

#[test]
fn test_rename_state_merges_into_existing() {
    let mut nfa = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(b'a', 1)])),
            (1, EdgeTable::with_edges([(b'b', 0)])),
        ]),
        0,
        1,
    );
    nfa.rename_state(1, 0);
    // 1's edges land on 0, after 0's own, and the automaton's final state
    // follows.
    assert_eq!(nfa.targets(0, b'a'), &[0]);
    assert_eq!(nfa.targets(0, b'b'), &[0]);
    assert_eq!(nfa.final_state(), 0);
    assert_eq!(nfa.state_count(), 1);
}

#[test]
fn test_rename_all_states_uses_counter() {
    let mut nfa = single_byte(b'a', 0, 1);
    let mut next_state = 10;
    nfa.rename_all_states(&mut next_state);
    assert_eq!(next_state, 12);
    assert_eq!(nfa.initial_state(), 10);
    assert_eq!(nfa.final_state(), 11);
    assert_eq!(nfa.targets(10, b'a'), &[11]);
}

#[test]
fn test_chain_fuses_final_and_initial() {
    let mut left = single_byte(b'a', 0, 1);
    let right = single_byte(b'b', 2, 3);
    left.chain(right);
    assert_eq!(left.initial_state(), 0);
    assert_eq!(left.final_state(), 3);
    assert_eq!(left.state_count(), 3);
    assert_eq!(left.targets(0, b'a'), &[2]);
    assert_eq!(left.targets(2, b'b'), &[3]);
}

#[test]
fn test_merge_builds_epsilon_diamond() {
    let mut left = single_byte(b'a', 0, 1);
    let right = single_byte(b'b', 2, 3);
    left.merge(right, 4, 5);
    assert_eq!(left.initial_state(), 4);
    assert_eq!(left.final_state(), 5);
    assert_eq!(left.targets(4, EPSILON), &[0, 2]);
    assert_eq!(left.targets(1, EPSILON), &[5]);
    assert_eq!(left.targets(3, EPSILON), &[5]);
}

#[test]
fn test_is_deterministic() {
    let deterministic = single_byte(b'a', 0, 1);
    assert!(deterministic.is_deterministic());

    // Two destinations on one label.
    let mut forked = single_byte(b'a', 0, 1);
    forked.add_edge(b'a', 0, 1);
    assert!(!forked.is_deterministic());

    // Epsilon alongside a byte edge.
    let mut mixed = single_byte(b'a', 0, 1);
    mixed.add_edge(EPSILON, 0, 1);
    assert!(!mixed.is_deterministic());

    // A lone epsilon move is fine; two are not.
    let mut lone = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(EPSILON, 1)])),
            (1, EdgeTable::new()),
        ]),
        0,
        1,
    );
    assert!(lone.is_deterministic());
    lone.add_edge(EPSILON, 0, 1);
    assert!(!lone.is_deterministic());
}

#[test]
fn test_collapse_folds_epsilon_chain() {
    // 0 -eps-> 1 -eps-> 2 --a--> 3
    let mut nfa = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(EPSILON, 1)])),
            (1, EdgeTable::with_edges([(EPSILON, 2)])),
            (2, EdgeTable::with_edges([(b'a', 3)])),
            (3, EdgeTable::new()),
        ]),
        0,
        3,
    );
    nfa.collapse_epsilon_moves();
    assert_eq!(nfa.state_count(), 2);
    assert_eq!(nfa.targets(nfa.initial_state(), b'a'), &[nfa.final_state()]);
    assert!(nfa.is_deterministic());
}

#[test]
fn test_collapse_clears_epsilon_self_loop() {
    let mut nfa = ScratchNfa::new(
        BTreeMap::from([(0, EdgeTable::with_edges([(EPSILON, 0)]))]),
        0,
        0,
    );
    nfa.collapse_epsilon_moves();
    assert!(nfa.targets(0, EPSILON).is_empty());
    assert_eq!(nfa.state_count(), 1);
}

#[test]
fn test_collapse_spares_the_final_state() {
    // The final state's residual epsilon must survive: it becomes the DFA's
    // slot-0 entry.
    let mut nfa = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(b'a', 1)])),
            (1, EdgeTable::with_edges([(EPSILON, 0)])),
        ]),
        0,
        1,
    );
    nfa.collapse_epsilon_moves();
    assert_eq!(nfa.state_count(), 2);
    assert_eq!(nfa.targets(1, EPSILON), &[0]);
}

#[test]
fn test_finalize_dispatches_on_determinism() {
    let deterministic = single_byte(b'a', 0, 1);
    assert!(matches!(deterministic.finalize(), Automaton::Dfa(_)));

    let mut forked = single_byte(b'a', 0, 1);
    forked.add_edge(b'a', 0, 2);
    forked.add_edge(b'b', 2, 1);
    assert!(matches!(forked.finalize(), Automaton::Nfa(_)));
}

#[test]
fn test_finalize_renumbers_sparse_identifiers() {
    // Identifiers with gaps must land on dense indices without changing the
    // language.
    let automaton = single_byte(b'q', 100, 2000).finalize();
    assert_eq!(automaton.state_count(), 2);
    assert!(automaton.run(b"q"));
    assert!(!automaton.run(b""));
    assert!(!automaton.run(b"qq"));
}

#[test]
fn test_dfa_residual_epsilon_tail() {
    // 0 --a--> 1 -eps-> 2(final): the epsilon chase after input exhaustion
    // has to reach the final state.
    let automaton = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(b'a', 1)])),
            (1, EdgeTable::with_edges([(EPSILON, 2)])),
            (2, EdgeTable::with_edges([(b'b', 0)])),
        ]),
        0,
        2,
    )
    .finalize();
    // State 1 is epsilon-only and non-final, so collapse folds it away, but
    // the acceptance is what matters.
    assert!(automaton.run(b"a"));
    assert!(automaton.run(b"aba"));
    assert!(!automaton.run(b"ab"));
    assert!(!automaton.run(b""));
}

#[test]
fn test_nfa_run_survives_epsilon_cycle() {
    // 0 and 1 form an epsilon cycle; both can step on 'a' back to 0.
    let nfa = ScratchNfa::new(
        BTreeMap::from([
            (0, EdgeTable::with_edges([(EPSILON, 1), (b'a', 1)])),
            (1, EdgeTable::with_edges([(EPSILON, 0), (b'a', 0)])),
        ]),
        0,
        1,
    )
    .finalize_forcing_nfa();
    assert!(nfa.run(b""));
    assert!(nfa.run(b"a"));
    assert!(nfa.run(b"aaaa"));
    assert!(!nfa.run(b"b"));
}

#[test]
fn test_executors_reject_input_byte_zero() {
    let scratch = single_byte(b'a', 0, 1);
    let dfa = scratch.clone().finalize();
    let nfa = scratch.finalize_forcing_nfa();
    assert!(!dfa.run(&[0]));
    assert!(!nfa.run(&[0]));
    assert!(!dfa.run(b"a\0"));
    assert!(!nfa.run(b"a\0"));
}
