//! Parity-game synthesis core: builds the product arena of a total DPA and a
//! symbolic transition system, then solves it by strategy iteration.
//!
//! This crate covers exactly the three subsystems of the core (total DPA,
//! arena builder, solver) — the LTL-to-DPA translator, the symbolic-model
//! generator, and machine extraction/code generation are external
//! collaborators, consumed only through the traits in [`dpa`], [`sym_model`]
//! and [`spec_adapter`].

pub mod arena;
pub mod dpa;
pub mod error;
pub mod queue;
pub mod solver;
pub mod spec_adapter;
pub mod sym_model;

use log::info;

use arena::{Arena, ArenaOptions};
use dpa::{DpaFactory, IoLetter, TotalDpa};
use error::SynthesisError;
use solver::{ParityGameSolver, SiSolver, SolveResult, SolverOptions};
use spec_adapter::{ControlLabelling, SpecAdapter, StateLabelling};
use sym_model::SymModel;

/// The outcome of building and solving a parity game end to end.
pub struct GameResult {
    pub dpa: TotalDpa,
    pub arena: Arena,
    pub solved: SolveResult,
}

/// Builds the total DPA for `factory`, constructs the product arena against
/// `model` (via `states`/`controls`' atomic-proposition labellings), and
/// solves it.
///
/// The game starts at the DUMMY vertex, which fans out over every state
/// `model.initial_states()` reports, so the environment chooses among them
/// exactly like any other nondeterministic step.
///
/// # Errors
///
/// Returns [`SynthesisError`] if `factory`'s acceptance condition cannot be
/// translated to a total parity automaton, if the translated DPA reports a
/// color outside its own declared range, or if a composed letter falls
/// outside the DPA's alphabet.
pub fn synthesize_game<F, M, X, U>(
    factory: &F,
    in_vars: &[String],
    out_vars: &[String],
    ltl_formula: &str,
    simplified_ltl: bool,
    model: &M,
    states: &X,
    controls: &U,
    arena_options: &ArenaOptions,
    solver_options: &SolverOptions,
) -> Result<GameResult, SynthesisError>
where
    F: DpaFactory,
    M: SymModel,
    X: StateLabelling,
    U: ControlLabelling,
{
    info!("building total dpa");
    let dpa = TotalDpa::build(factory, in_vars, out_vars, ltl_formula, simplified_ltl)?;

    let adapter = SpecAdapter::new(states, controls);
    let letter = |state: usize, control: usize| -> IoLetter {
        adapter
            .letter(state, control)
            .expect("model and labellings agree on the range of states and controls")
    };

    info!("constructing product arena");
    let arena = arena::build(&dpa, model, letter, arena_options)?;

    info!("solving parity game");
    let solved = SiSolver.solve(&arena, solver_options);

    Ok(GameResult { dpa, arena, solved })
}
