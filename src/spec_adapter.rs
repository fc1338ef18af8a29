//! Composes state and control atomic-proposition labellings into the
//! bit-packed IO letters a [`TotalDpa`](crate::dpa::TotalDpa) consumes.

use crate::dpa::IoLetter;
use crate::error::DomainError;

/// Labels a symbolic state with the truth values of the state atomic
/// propositions `X_AP`.
pub trait StateLabelling {
    /// The number of state atomic propositions, `|X_AP|`.
    fn num_state_ap(&self) -> usize;

    /// Returns whether atomic proposition `i` holds at `state`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if `i >= num_state_ap()`.
    fn state_ap(&self, state: usize, i: usize) -> Result<bool, DomainError>;
}

/// Labels a control input with the truth values of the control atomic
/// propositions `U_AP`.
pub trait ControlLabelling {
    /// The number of control atomic propositions, `|U_AP|`.
    fn num_control_ap(&self) -> usize;

    /// Returns whether atomic proposition `i` holds at `control`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if `i >= num_control_ap()`.
    fn control_ap(&self, control: usize, i: usize) -> Result<bool, DomainError>;
}

/// Composes a [`StateLabelling`] and a [`ControlLabelling`] into the letter
/// function the DPA expects: `letter(x,u) = L_x(x) | (L_u(u) << |X_AP|)`.
pub struct SpecAdapter<'a, X, U> {
    states: &'a X,
    controls: &'a U,
}

impl<'a, X: StateLabelling, U: ControlLabelling> SpecAdapter<'a, X, U> {
    pub fn new(states: &'a X, controls: &'a U) -> Self {
        Self { states, controls }
    }

    /// The combined alphabet size, `|X_AP| + |U_AP|`.
    pub fn alphabet_size(&self) -> usize {
        self.states.num_state_ap() + self.controls.num_control_ap()
    }

    /// Computes the IO letter for `state` paired with `control`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if `state` or `control` index an atomic
    /// proposition out of range.
    pub fn letter(&self, state: usize, control: usize) -> Result<IoLetter, DomainError> {
        let mut bits: IoLetter = 0;
        for i in 0..self.states.num_state_ap() {
            if self.states.state_ap(state, i)? {
                bits |= 1 << i;
            }
        }
        let offset = self.states.num_state_ap();
        for i in 0..self.controls.num_control_ap() {
            if self.controls.control_ap(control, i)? {
                bits |= 1 << (offset + i);
            }
        }
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoBitStates;
    impl StateLabelling for TwoBitStates {
        fn num_state_ap(&self) -> usize {
            2
        }
        fn state_ap(&self, state: usize, i: usize) -> Result<bool, DomainError> {
            if i >= 2 {
                return Err(DomainError::new("state ap", i, 2));
            }
            Ok((state >> i) & 1 == 1)
        }
    }

    struct OneBitControls;
    impl ControlLabelling for OneBitControls {
        fn num_control_ap(&self) -> usize {
            1
        }
        fn control_ap(&self, control: usize, i: usize) -> Result<bool, DomainError> {
            if i >= 1 {
                return Err(DomainError::new("control ap", i, 1));
            }
            Ok((control >> i) & 1 == 1)
        }
    }

    #[test]
    fn test_letter_composition() {
        let states = TwoBitStates;
        let controls = OneBitControls;
        let adapter = SpecAdapter::new(&states, &controls);
        assert_eq!(adapter.alphabet_size(), 3);
        assert_eq!(adapter.letter(0b01, 0b1).unwrap(), 0b101);
        assert_eq!(adapter.letter(0b10, 0b0).unwrap(), 0b010);
    }

    #[test]
    fn test_letter_reads_only_declared_ap_bits() {
        let states = TwoBitStates;
        let controls = OneBitControls;
        let adapter = SpecAdapter::new(&states, &controls);
        // `control` is a configuration index, not an ap index; bits beyond
        // `num_control_ap()` are simply not consulted.
        assert!(adapter.letter(0, 5).is_ok());
    }
}
