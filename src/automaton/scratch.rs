//! Mutable automaton under construction.
//!
//! `ScratchNfa` is the intermediate form the parser composes: states are
//! keyed by identifier rather than dense index, so pieces built at different
//! times can be renamed, chained, and merged without renumbering anything
//! until finalization. Identifiers come from a single counter owned by the
//! parser, which is what keeps composed pieces disjoint.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::dfa::{Dfa, DfaState, NO_TRANSITION};
use super::edge_table::{EdgeTable, StateId, EPSILON};
use super::nfa::Nfa;
use super::Automaton;

/// An automaton being assembled, with one declared initial and one declared
/// final state.
///
/// States are stored in identifier order; finalization relies on that to
/// renumber them deterministically. Self-loops, duplicate edges on one
/// label, and epsilon cycles are all legal here.
#[derive(Clone, Debug)]
pub struct ScratchNfa {
    states: BTreeMap<StateId, EdgeTable>,
    initial_state: StateId,
    final_state: StateId,
}

impl ScratchNfa {
    pub fn new(
        states: BTreeMap<StateId, EdgeTable>,
        initial_state: StateId,
        final_state: StateId,
    ) -> Self {
        Self {
            states,
            initial_state,
            final_state,
        }
    }

    #[inline]
    pub fn initial_state(&self) -> StateId {
        self.initial_state
    }

    #[inline]
    pub fn final_state(&self) -> StateId {
        self.final_state
    }

    /// Number of live states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The destinations reachable from `from` on `label`; empty if `from` is
    /// not a live state.
    #[cfg(test)]
    pub(crate) fn targets(&self, from: StateId, label: u8) -> &[StateId] {
        match self.states.get(&from) {
            Some(table) => table.targets(label),
            None => &[],
        }
    }

    /// Append an edge, creating `from` if it is not a state yet.
    pub fn add_edge(&mut self, label: u8, from: StateId, to: StateId) {
        self.states.entry(from).or_default().push(label, to);
    }

    /// Insert a state, or if `id` already exists concatenate the incoming
    /// destination lists onto the existing ones, label by label.
    pub fn merge_state(&mut self, id: StateId, edges: EdgeTable) {
        match self.states.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(edges);
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().absorb(edges);
            }
        }
    }

    /// Remove state `old_name` and fold its edges into `new_name`, then
    /// rewrite every transition that referenced `old_name`. The declared
    /// initial/final states follow the rename.
    pub fn rename_state(&mut self, old_name: StateId, new_name: StateId) {
        if old_name == new_name {
            return;
        }
        if let Some(edges) = self.states.remove(&old_name) {
            self.merge_state(new_name, edges);
        }
        for table in self.states.values_mut() {
            table.remap_targets(|to| if to == old_name { new_name } else { to });
        }
        if self.initial_state == old_name {
            self.initial_state = new_name;
        }
        if self.final_state == old_name {
            self.final_state = new_name;
        }
    }

    /// Give every state a fresh identifier drawn from `next_state`, keeping
    /// the relative identifier order. Used to make a copied piece disjoint
    /// from everything else before chaining it.
    pub fn rename_all_states(&mut self, next_state: &mut StateId) {
        let mut state_map = FxHashMap::default();
        for &id in self.states.keys() {
            state_map.insert(id, *next_state);
            *next_state += 1;
        }

        let old_states = std::mem::take(&mut self.states);
        for (id, mut table) in old_states {
            table.remap_targets(|to| state_map[&to]);
            self.states.insert(state_map[&id], table);
        }
        self.initial_state = state_map[&self.initial_state];
        self.final_state = state_map[&self.final_state];
    }

    /// Concatenate `other` onto this automaton: this one's final state is
    /// renamed to `other`'s initial state, merging their edges, and `other`'s
    /// final state becomes the final state of the whole.
    ///
    /// The two identifier spaces must be disjoint; the caller renumbers
    /// copies when necessary.
    pub fn chain(&mut self, other: ScratchNfa) {
        self.rename_state(self.final_state, other.initial_state);
        for (id, edges) in other.states {
            self.merge_state(id, edges);
        }
        self.final_state = other.final_state;
    }

    /// Alternation-merge `other` into this automaton. `initial_state` and
    /// `final_state` are fresh identifiers supplied by the caller: the new
    /// initial fans out to both old initials over epsilon, and both old
    /// finals feed the new final over epsilon.
    ///
    /// Identifier spaces must be disjoint, as for [`ScratchNfa::chain`].
    pub fn merge(&mut self, other: ScratchNfa, initial_state: StateId, final_state: StateId) {
        let old_final = self.final_state;
        let other_initial = other.initial_state;
        let other_final = other.final_state;
        for (id, edges) in other.states {
            self.merge_state(id, edges);
        }
        self.states.insert(
            initial_state,
            EdgeTable::with_edges([(EPSILON, self.initial_state), (EPSILON, other_initial)]),
        );
        self.states.entry(final_state).or_default();
        self.add_edge(EPSILON, old_final, final_state);
        self.add_edge(EPSILON, other_final, final_state);
        self.initial_state = initial_state;
        self.final_state = final_state;
    }

    /// Structural determinism test: every state has at most one destination
    /// per non-epsilon label, at most one epsilon destination, and never both
    /// an epsilon and a non-epsilon edge.
    pub fn is_deterministic(&self) -> bool {
        for table in self.states.values() {
            let epsilon_edge = table.targets(EPSILON);
            if epsilon_edge.len() > 1 {
                return false;
            }
            let has_epsilon = !epsilon_edge.is_empty();
            for (label, edge) in table.iter() {
                if label == EPSILON {
                    continue;
                }
                if edge.len() > 1 || (!edge.is_empty() && has_epsilon) {
                    return false;
                }
            }
        }
        true
    }

    /// If `table` consists of exactly one epsilon edge and nothing else,
    /// return its destination.
    fn single_epsilon_target(table: &EdgeTable) -> Option<StateId> {
        let epsilon_edge = table.targets(EPSILON);
        if epsilon_edge.len() != 1 {
            return None;
        }
        for (label, edge) in table.iter() {
            if label != EPSILON && !edge.is_empty() {
                return None;
            }
        }
        Some(epsilon_edge[0])
    }

    /// Fold away states whose only outgoing edge is a single epsilon move.
    ///
    /// Each round clears the epsilon and renames its destination onto the
    /// collapsed state; trivial epsilon self-loops are simply cleared. The
    /// final state is exempt (its residual epsilon survives into the DFA's
    /// slot 0). Every round removes one epsilon-only state, so the loop
    /// terminates.
    pub fn collapse_epsilon_moves(&mut self) {
        loop {
            let found = self.states.iter().find_map(|(&id, table)| {
                let destination = Self::single_epsilon_target(table)?;
                (id == destination || id != self.final_state).then_some((id, destination))
            });
            let Some((id, destination)) = found else {
                break;
            };
            if let Some(table) = self.states.get_mut(&id) {
                table.clear_label(EPSILON);
            }
            self.rename_state(destination, id);
        }
    }

    /// Finalize into a runnable automaton: collapse epsilon moves, then build
    /// a dense DFA table if the result is deterministic, a sparse NFA if not.
    /// Consumes the scratch automaton.
    pub fn finalize(self) -> Automaton {
        self.into_automaton(false)
    }

    /// Finalization that skips the determinism test and always produces an
    /// NFA, so tests can run every pattern through both executors.
    #[cfg(test)]
    pub(crate) fn finalize_forcing_nfa(self) -> Automaton {
        self.into_automaton(true)
    }

    /// Direct conversion without collapsing, for tests that compare the
    /// accepted language before and after [`ScratchNfa::collapse_epsilon_moves`].
    #[cfg(test)]
    pub(crate) fn into_nfa_uncollapsed(self) -> Nfa {
        self.into_nfa()
    }

    fn into_automaton(mut self, force_nfa: bool) -> Automaton {
        self.collapse_epsilon_moves();
        if !force_nfa && self.is_deterministic() {
            Automaton::Dfa(self.into_dfa())
        } else {
            Automaton::Nfa(self.into_nfa())
        }
    }

    /// Map each identifier to its dense index, in identifier order.
    fn state_index_map(&self) -> FxHashMap<StateId, StateId> {
        let mut state_map = FxHashMap::default();
        for (index, &id) in self.states.keys().enumerate() {
            state_map.insert(id, index as StateId);
        }
        debug_assert!(state_map.contains_key(&self.initial_state));
        debug_assert!(state_map.contains_key(&self.final_state));
        state_map
    }

    fn into_dfa(self) -> Dfa {
        let state_map = self.state_index_map();
        let mut states = Vec::with_capacity(self.state_count());
        for table in self.states.values() {
            let mut row: DfaState = [NO_TRANSITION; 256];
            for (label, edge) in table.iter() {
                if let Some(&to) = edge.first() {
                    row[label as usize] = state_map[&to];
                }
            }
            states.push(row);
        }
        Dfa::new(
            states,
            state_map[&self.initial_state],
            state_map[&self.final_state],
        )
    }

    fn into_nfa(mut self) -> Nfa {
        let state_map = self.state_index_map();
        let old_states = std::mem::take(&mut self.states);
        let mut states = Vec::with_capacity(old_states.len());
        for (_, mut table) in old_states {
            table.remap_targets(|to| state_map[&to]);
            states.push(table);
        }
        Nfa::new(
            states,
            state_map[&self.initial_state],
            state_map[&self.final_state],
        )
    }
}
