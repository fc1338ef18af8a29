//! The on-the-fly arena construction algorithm (spec.md §4.4), grounded on
//! `original_source`'s `PGame::constructArena`.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::{Arena, NodeIndex, SysEdge, NODE_BOTTOM, NODE_NONE, NODE_TOP};
use crate::dpa::{Color, DpaStateIndex, IoLetter, TotalDpa};
use crate::error::InvalidLetterError;
use crate::queue::{BfsQueue, ExplorationQueue, OrderedScore, ScoreOrder, ScoredQueue};
use crate::sym_model::{SymModel, SymbolicState};

const RESERVE: usize = 4096;

/// How far the builder is allowed to grow the arena before giving up.
///
/// When the cap is hit, every vertex still awaiting exploration is instead
/// treated as an unconditional environment win ([`NODE_BOTTOM`]) and
/// [`Arena::is_complete`] returns `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationLimit {
    Unbounded,
    MaxEnvNodes(usize),
}

/// The order in which newly discovered vertices are explored.
///
/// Spec.md §9 leaves the scoring heuristic an open question; [`Fifo`] (the
/// default) reproduces `original_source`'s `score = -(ref_count)`, which is
/// breadth-first in effect. [`Custom`] lets a caller supply their own
/// priority function over the vertex's discovery-order reference count.
///
/// [`Fifo`]: ExplorationScore::Fifo
/// [`Custom`]: ExplorationScore::Custom
#[derive(Clone, Copy)]
pub enum ExplorationScore {
    Fifo,
    Custom(fn(usize) -> f64),
}

/// Configuration for [`build`].
#[derive(Clone, Copy)]
pub struct ArenaOptions {
    pub limit: ExplorationLimit,
    pub score: ExplorationScore,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            limit: ExplorationLimit::Unbounded,
            score: ExplorationScore::Fifo,
        }
    }
}

/// A not-yet-materialized environment vertex: a DPA state, a symbolic-model
/// state, and the control input that routed here from the predecessor
/// system vertex — the full triple spec.md §3 defines as the product state.
type ProductState = (DpaStateIndex, SymbolicState, usize);

/// Builds the parity-game arena for `dpa` composed with `model`, using
/// `letter` to combine a symbolic state and control into the DPA's input
/// alphabet (the composition [`crate::spec_adapter::SpecAdapter`] provides).
///
/// The game starts at the DUMMY vertex, whose successor system vertices are
/// built from every state in [`SymModel::initial_states`] — so a model
/// reporting several candidate initial states gets them all, with the
/// environment choosing among them exactly like any other nondeterministic
/// step, rather than the caller picking one up front.
///
/// # Errors
///
/// Returns [`InvalidLetterError`] if a letter composed from `letter` ever
/// falls outside `dpa`'s alphabet.
pub fn build<M, L>(dpa: &TotalDpa, model: &M, letter: L, options: &ArenaOptions) -> Result<Arena, InvalidLetterError>
where
    M: SymModel,
    L: Fn(usize, usize) -> IoLetter,
{
    let n_colors = dpa.max_color() + 1;
    let n_controls = model.n_controls();

    // `raw_states[ref]` is the product state a not-yet-materialized
    // reference stands for; `ref_to_env_node[ref]` is NODE_NONE until the
    // builder dequeues and expands it.
    let mut raw_states: Vec<ProductState> = Vec::with_capacity(RESERVE);
    let mut ref_to_env_node: Vec<NodeIndex> = Vec::with_capacity(RESERVE);
    let mut seen: HashMap<ProductState, NodeIndex> = HashMap::with_capacity(RESERVE);

    let mut sys_succs_begin: Vec<u32> = vec![0];
    let mut sys_succs: Vec<SysEdge> = Vec::with_capacity(RESERVE);
    let mut sys_output: Vec<Vec<usize>> = Vec::with_capacity(RESERVE);

    let mut env_succs_begin: Vec<u32> = vec![0];
    let mut env_succs: Vec<NodeIndex> = Vec::with_capacity(RESERVE);
    let mut env_input: Vec<Vec<usize>> = Vec::with_capacity(RESERVE);

    // a byte-identical-edges index for system-vertex canonicalization
    let mut sys_node_index: HashMap<(Vec<SysEdge>, Vec<Vec<usize>>), NodeIndex> =
        HashMap::with_capacity(RESERVE);

    let mut queue: Box<dyn ExplorationQueue<NodeIndex, OrderedScore>> = match options.score {
        ExplorationScore::Fifo => Box::new(BfsQueue::with_capacity(RESERVE)),
        ExplorationScore::Custom(_) => {
            Box::new(ScoredQueue::with_capacity(RESERVE, ScoreOrder::Max))
        }
    };
    let score_fn = |ref_count: usize| -> f64 {
        match options.score {
            ExplorationScore::Fifo => -(ref_count as f64),
            ExplorationScore::Custom(f) => f(ref_count),
        }
    };

    // the TOP vertex is materialized up front at ref 0; it never expands
    let top_ref: NodeIndex = 0;
    raw_states.push((dpa.initial_state(), SymbolicState::Dummy, 0));
    ref_to_env_node.push(NODE_TOP);

    // the initial vertex is itself tagged DUMMY: its sole successor set is
    // `model.initial_states()`, not a single pre-chosen symbolic state.
    let initial_ref: NodeIndex = 1;
    raw_states.push((dpa.initial_state(), SymbolicState::Dummy, 0));
    ref_to_env_node.push(NODE_NONE);
    seen.insert(raw_states[initial_ref as usize], initial_ref);
    queue.push_scored(initial_ref, OrderedScore(score_fn(ref_to_env_node.len())));

    let mut n_env_nodes: NodeIndex = 0;
    let limit_reached = |n_env_nodes: NodeIndex| match options.limit {
        ExplorationLimit::Unbounded => false,
        ExplorationLimit::MaxEnvNodes(max) => n_env_nodes as usize >= max,
    };

    let mut complete = true;
    while let Some(r) = queue.pop() {
        if ref_to_env_node[r as usize] != NODE_NONE {
            continue; // already materialized via a duplicate queue entry
        }
        if limit_reached(n_env_nodes) {
            complete = false;
            break;
        }

        let env_node = n_env_nodes;
        ref_to_env_node[r as usize] = env_node;
        let (dpa_state, sym_state, incoming_control) = raw_states[r as usize];

        // the set of environment choices `x'` this vertex's tuple admits:
        // DUMMY fans out to every candidate initial state, an ordinary
        // state to its posts under the control that routed here. OVERFLOW
        // never reaches this dispatch: its sole successor resolves straight
        // to the top sentinel in the per-choice loop below and so is never
        // queued for expansion.
        let choices: Vec<SymbolicState> = match sym_state {
            SymbolicState::Dummy => model.initial_states().into_iter().map(SymbolicState::Normal).collect(),
            SymbolicState::Normal(v) => model.posts(v, incoming_control),
            SymbolicState::Overflow => {
                unreachable!("OVERFLOW choices resolve directly to the top sentinel and are never queued")
            }
        };

        // one candidate system vertex per environment choice `x'`, merged
        // by target once canonicalized (spec.md §4.4's "Insert/merge s ->
        // {x'} into e's outgoing map").
        let mut env_targets: Vec<NodeIndex> = Vec::new();

        for choice in choices {
            let (edges, outputs): (Vec<SysEdge>, Vec<Vec<usize>>) = match choice {
                SymbolicState::Overflow => {
                    // the system has run out of representable states; every
                    // control still leads to this unconditional environment
                    // win, so one edge suffices.
                    (vec![SysEdge { successor: top_ref, color: 0 }], vec![(0..n_controls).collect()])
                }
                SymbolicState::Dummy => unreachable!("posts()/initial_states() never yield DUMMY"),
                SymbolicState::Normal(x_prime) => {
                    let mut edges: Vec<SysEdge> = Vec::new();
                    let mut outputs: Vec<Vec<usize>> = Vec::new();

                    for control in 0..n_controls {
                        let joint_letter = letter(x_prime, control);
                        let (dpa_succ, color, _score) = dpa.successor(dpa_state, joint_letter)?;

                        if dpa.is_bottom(dpa_succ) {
                            continue;
                        }

                        let succ_ref = if dpa.is_top(dpa_succ) {
                            top_ref
                        } else {
                            let key = (dpa_succ, SymbolicState::Normal(x_prime), control);
                            *seen.entry(key).or_insert_with(|| {
                                let new_ref = ref_to_env_node.len() as NodeIndex;
                                ref_to_env_node.push(NODE_NONE);
                                raw_states.push(key);
                                queue.push_scored(new_ref, OrderedScore(score_fn(ref_to_env_node.len())));
                                new_ref
                            })
                        };

                        let succ_materialized = ref_to_env_node[succ_ref as usize];
                        if succ_materialized == NODE_BOTTOM {
                            continue;
                        }

                        let edge = SysEdge {
                            successor: succ_ref,
                            color,
                        };
                        match edges.iter().position(|e| *e == edge) {
                            Some(pos) => outputs[pos].push(control),
                            None => {
                                edges.push(edge);
                                outputs.push(vec![control]);
                            }
                        }
                    }

                    (edges, outputs)
                }
            };

            let sys_node = *sys_node_index
                .entry((edges.clone(), outputs.clone()))
                .or_insert_with(|| {
                    let new_sys_node = (sys_succs_begin.len() - 1) as NodeIndex;
                    sys_succs.extend(edges.iter().copied());
                    sys_output.extend(outputs.iter().cloned());
                    sys_succs_begin.push(sys_succs.len() as u32);
                    new_sys_node
                });

            if !env_targets.contains(&sys_node) {
                env_targets.push(sys_node);
            }
        }

        for sys_node in env_targets {
            env_succs.push(sys_node);
            env_input.push(vec![incoming_control]);
        }
        env_succs_begin.push(env_succs.len() as u32);

        n_env_nodes += 1;
    }

    for node in ref_to_env_node.iter_mut() {
        if *node == NODE_NONE {
            *node = NODE_BOTTOM;
        }
    }

    // resolve every stored edge's reference-indirected successor to its
    // final materialized env-node index (or TOP/BOTTOM)
    for edge in sys_succs.iter_mut() {
        if edge.successor != NODE_TOP && edge.successor != NODE_BOTTOM {
            edge.successor = ref_to_env_node[edge.successor as usize];
        }
    }

    debug!(
        "constructed arena with {} env nodes, {} sys nodes, {} env edges, {} sys edges",
        env_succs_begin.len() - 1,
        sys_succs_begin.len() - 1,
        env_succs.len(),
        sys_succs.len()
    );
    if !complete {
        warn!("arena construction stopped early by exploration limit; treating remaining vertices as env-losing");
    }
    info!("finished constructing arena");

    let initial_node = ref_to_env_node[initial_ref as usize];

    Arena {
        initial_node,
        n_colors: n_colors as Color,
        parity: dpa.parity(),
        sys_succs_begin,
        sys_succs,
        sys_output,
        env_succs_begin,
        env_succs,
        env_input,
        complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpa::{Acceptance, DpaFactory, Parity, VariableStatus};
    use crate::sym_model::VecSymModel;

    /// A DPA accepting `G a` (one AP, color 0 on `a`, color 1 otherwise).
    struct SafetyDpa;
    impl DpaFactory for SafetyDpa {
        type State = u8;
        fn initial_product_state(&self) -> Self::State {
            0
        }
        fn successor(&self, _state: &Self::State, letter: IoLetter) -> (Self::State, Color, f64) {
            if letter & 1 == 1 {
                (0, 0, 1.0)
            } else {
                (0, 1, 1.0)
            }
        }
        fn is_top(&self, _: &Self::State) -> bool {
            false
        }
        fn is_bottom(&self, _: &Self::State) -> bool {
            false
        }
        fn acceptance(&self) -> Acceptance {
            Acceptance::Safety
        }
        fn max_color(&self) -> Color {
            1
        }
        fn parity(&self) -> Parity {
            Parity::Even
        }
        fn variable_status(&self, _: usize) -> VariableStatus {
            VariableStatus::Used
        }
        fn num_ap(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_build_small_arena() {
        let dpa = TotalDpa::build(&SafetyDpa, &["a".to_owned()], &[], "G a", false).unwrap();
        // two model states, one control bit; state_ap(state) = state's own
        // bit, so the joint letter is just (state | (control << 1)).
        let model = VecSymModel::new(
            vec![0],
            vec![
                vec![vec![SymbolicState::Normal(0)], vec![SymbolicState::Normal(1)]],
                vec![vec![SymbolicState::Normal(1)], vec![SymbolicState::Normal(0)]],
            ],
        );
        let letter = |state: usize, control: usize| -> IoLetter { (state as u64) | ((control as u64) << 1) };
        let arena = build(&dpa, &model, letter, &ArenaOptions::default()).unwrap();

        assert!(arena.is_complete());
        assert!(arena.n_env_nodes() >= 1);
        assert!(arena.n_sys_nodes() >= 1);
        let initial = arena.initial_node();
        assert!(initial != NODE_TOP && initial != NODE_BOTTOM);
    }

    #[test]
    fn test_exploration_limit_marks_incomplete() {
        let dpa = TotalDpa::build(&SafetyDpa, &["a".to_owned()], &[], "G a", false).unwrap();
        let model = VecSymModel::new(
            vec![0],
            vec![
                vec![vec![SymbolicState::Normal(1)], vec![SymbolicState::Normal(1)]],
                vec![vec![SymbolicState::Normal(0)], vec![SymbolicState::Normal(0)]],
            ],
        );
        let letter = |state: usize, control: usize| -> IoLetter { (state as u64) | ((control as u64) << 1) };
        let options = ArenaOptions {
            limit: ExplorationLimit::MaxEnvNodes(1),
            score: ExplorationScore::Fifo,
        };
        let arena = build(&dpa, &model, letter, &options).unwrap();
        assert!(!arena.is_complete());
    }
}
