//! Total deterministic parity automata.
//!
//! A [`TotalDpa`] holds a fully enumerated DPA: every `(state, letter)` pair
//! has a cached successor, color and score, so the arena builder never calls
//! back into the upstream LTL-to-DPA translator during exploration.

mod persist;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use log::{debug, info};

use crate::error::{DpaBuildError, DpaInvariantViolation, InvalidLetterError, UnsupportedAcceptanceError};

pub use persist::{load, write};

/// A color attached to a DPA edge, in `[0, max_color]`.
pub type Color = u32;

/// A construction-time heuristic score attached to a DPA edge, in `[0,1]`.
///
/// Used only to order the arena builder's exploration queue; it never
/// affects the winner or the shape of the constructed game.
pub type Score = f64;

/// A bit-packed IO letter: the low `|X_AP|` bits encode state atomic
/// propositions, the next `|U_AP|` bits encode control atomic propositions.
pub type IoLetter = u64;

/// The index of a state in a [`TotalDpa`], assigned in BFS discovery order.
pub type DpaStateIndex = u32;

/// The parity of a parity game or automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Returns whether `color` is winning for the system under this parity.
    pub fn is_system_winning(self, color: Color) -> bool {
        (color % 2 == 0) == matches!(self, Parity::Even)
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Parity::Even { "even" } else { "odd" })
    }
}

/// The status of an atomic proposition index, as reported by the DPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStatus {
    Used,
    Unused,
    ConstantTrue,
    ConstantFalse,
}

/// The acceptance condition reported by an upstream DPA factory.
///
/// Only [`Acceptance::Parity`], [`Acceptance::Buchi`], [`Acceptance::CoBuchi`],
/// [`Acceptance::Safety`] and [`Acceptance::CoSafety`] can be translated to a
/// total parity automaton by this crate; any other value is reported through
/// [`UnsupportedAcceptanceError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Parity,
    Buchi,
    CoBuchi,
    Safety,
    CoSafety,
    /// An acceptance condition this core does not recognize, named for
    /// diagnostics.
    Other(String),
}

impl Acceptance {
    fn is_supported(&self) -> bool {
        matches!(
            self,
            Acceptance::Parity
                | Acceptance::Buchi
                | Acceptance::CoBuchi
                | Acceptance::Safety
                | Acceptance::CoSafety
        )
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acceptance::Parity => write!(f, "parity"),
            Acceptance::Buchi => write!(f, "buchi"),
            Acceptance::CoBuchi => write!(f, "co-buchi"),
            Acceptance::Safety => write!(f, "safety"),
            Acceptance::CoSafety => write!(f, "co-safety"),
            Acceptance::Other(s) => write!(f, "{}", s),
        }
    }
}

/// The upstream LTL-to-DPA translator's consumed contract (§6).
///
/// Implementations are expected to be pure and total for any `letter` in
/// `[0, 2^num_ap())`; [`TotalDpa::build`] enumerates exactly this range.
pub trait DpaFactory {
    /// The translator's own product-state representation. Must support
    /// equality and hashing componentwise (spec.md §3).
    type State: Clone + Eq + Hash;

    fn initial_product_state(&self) -> Self::State;
    fn successor(&self, state: &Self::State, letter: IoLetter) -> (Self::State, Color, Score);
    fn is_top(&self, state: &Self::State) -> bool;
    fn is_bottom(&self, state: &Self::State) -> bool;
    fn acceptance(&self) -> Acceptance;
    fn max_color(&self) -> Color;
    fn parity(&self) -> Parity;
    fn variable_status(&self, i: usize) -> VariableStatus;
    /// The number of atomic propositions, `|X_AP| + |U_AP|`.
    fn num_ap(&self) -> usize;
}

/// A fully enumerated total deterministic parity automaton.
#[derive(Debug, Clone)]
pub struct TotalDpa {
    pub(crate) in_vars: Vec<String>,
    pub(crate) out_vars: Vec<String>,
    pub(crate) ltl_formula: String,
    pub(crate) simplified_ltl: bool,
    pub(crate) parity: Parity,
    pub(crate) max_color: Color,
    pub(crate) statuses: Vec<VariableStatus>,
    pub(crate) product_state_size: usize,
    pub(crate) is_top: Vec<bool>,
    pub(crate) is_bottom: Vec<bool>,
    /// `edges[state][letter] = (successor, color, score)`.
    pub(crate) edges: Vec<Vec<(DpaStateIndex, Color, Score)>>,
}

impl TotalDpa {
    /// Enumerates a total DPA from an upstream factory by breadth-first
    /// search over all `(state, letter)` pairs, following spec.md §4.1.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedAcceptanceError`] if the factory's acceptance
    /// condition is not one this core can translate to parity, or
    /// [`DpaInvariantViolation`] if `factory` ever reports a color outside
    /// `[0, max_color()]`.
    pub fn build<F: DpaFactory>(
        factory: &F,
        in_vars: &[String],
        out_vars: &[String],
        ltl_formula: &str,
        simplified_ltl: bool,
    ) -> Result<Self, DpaBuildError> {
        let acceptance = factory.acceptance();
        if !acceptance.is_supported() {
            return Err(UnsupportedAcceptanceError::new(acceptance.to_string()).into());
        }
        let max_color = factory.max_color();

        let alphabet_size = factory.num_ap();
        let n_letters = 1usize << alphabet_size;
        let statuses = (0..alphabet_size).map(|i| factory.variable_status(i)).collect();

        let mut raw_states: Vec<F::State> = Vec::with_capacity(4096);
        let mut seen: HashMap<F::State, DpaStateIndex> = HashMap::with_capacity(4096);
        let mut is_top = Vec::with_capacity(4096);
        let mut is_bottom = Vec::with_capacity(4096);
        let mut edges: Vec<Vec<(DpaStateIndex, Color, Score)>> = Vec::with_capacity(4096);
        let mut to_explore: VecDeque<DpaStateIndex> = VecDeque::with_capacity(4096);

        let initial = factory.initial_product_state();
        seen.insert(initial.clone(), 0);
        is_top.push(factory.is_top(&initial));
        is_bottom.push(factory.is_bottom(&initial));
        raw_states.push(initial);
        edges.push(Vec::with_capacity(n_letters));
        to_explore.push_back(0);

        while let Some(cur) = to_explore.pop_front() {
            let cur_state = raw_states[cur as usize].clone();
            for letter in 0..n_letters as IoLetter {
                let (next_state, color, score) = factory.successor(&cur_state, letter);
                if color > max_color {
                    return Err(DpaInvariantViolation::new(color, max_color).into());
                }
                let next_index = match seen.entry(next_state.clone()) {
                    Entry::Occupied(e) => *e.get(),
                    Entry::Vacant(e) => {
                        let index = raw_states.len() as DpaStateIndex;
                        e.insert(index);
                        is_top.push(factory.is_top(&next_state));
                        is_bottom.push(factory.is_bottom(&next_state));
                        raw_states.push(next_state);
                        edges.push(Vec::with_capacity(n_letters));
                        to_explore.push_back(index);
                        index
                    }
                };
                edges[cur as usize].push((next_index, color, score));
            }
        }
        debug!(
            "enumerated total dpa with {} states over alphabet of size {}",
            raw_states.len(),
            alphabet_size
        );
        info!("finished constructing total dpa");

        Ok(Self {
            in_vars: in_vars.to_vec(),
            out_vars: out_vars.to_vec(),
            ltl_formula: ltl_formula.to_owned(),
            simplified_ltl,
            parity: factory.parity(),
            max_color: factory.max_color(),
            statuses,
            product_state_size: alphabet_size,
            is_top,
            is_bottom,
            edges,
        })
    }

    pub fn initial_state(&self) -> DpaStateIndex {
        0
    }

    /// Looks up the successor of `state` under `letter`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLetterError`] if `letter` is outside
    /// `[0, 2^alphabet_size)`.
    pub fn successor(
        &self,
        state: DpaStateIndex,
        letter: IoLetter,
    ) -> Result<(DpaStateIndex, Color, Score), InvalidLetterError> {
        let alphabet_size = self.alphabet_size() as u32;
        if letter >= (1u64 << alphabet_size) {
            return Err(InvalidLetterError::new(letter, alphabet_size));
        }
        Ok(self.edges[state as usize][letter as usize])
    }

    pub fn is_top(&self, state: DpaStateIndex) -> bool {
        self.is_top[state as usize]
    }

    pub fn is_bottom(&self, state: DpaStateIndex) -> bool {
        self.is_bottom[state as usize]
    }

    pub fn max_color(&self) -> Color {
        self.max_color
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn variable_status(&self, i: usize) -> VariableStatus {
        self.statuses[i]
    }

    pub fn state_count(&self) -> usize {
        self.edges.len()
    }

    /// The number of input atomic propositions, `|X_AP|`.
    pub fn num_inputs(&self) -> usize {
        self.in_vars.len()
    }

    /// The number of output atomic propositions, `|U_AP|`.
    pub fn num_outputs(&self) -> usize {
        self.out_vars.len()
    }

    /// The combined alphabet size `|X_AP| + |U_AP|`.
    pub fn alphabet_size(&self) -> usize {
        self.product_state_size
    }
}
