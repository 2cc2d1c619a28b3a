/// Reject code for transactions that violate consensus or policy rules.
pub const REJECT_INVALID: u8 = 16;

/// Outcome of a transaction validity check.
///
/// Starts out valid; the first `invalidate` call wins and later calls
/// are ignored, so validators can report the earliest failure they hit.
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    invalid: bool,
    reject_code: u8,
    reject_reason: String,
}

impl ValidationState {
    pub fn new() -> Self {
        ValidationState::default()
    }

    /// Mark the state invalid with a reject code and a short reason.
    /// Returns `false` so validators can `return state.invalidate(..)`.
    pub fn invalidate(&mut self, code: u8, reason: impl Into<String>) -> bool {
        if !self.invalid {
            self.invalid = true;
            self.reject_code = code;
            self.reject_reason = reason.into();
        }
        false
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// The reject code, or 0 while the state is valid.
    pub fn reject_code(&self) -> u8 {
        self.reject_code
    }

    pub fn reject_reason(&self) -> &str {
        &self.reject_reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_valid() {
        let state = ValidationState::new();
        assert!(state.is_valid());
        assert_eq!(state.reject_code(), 0);
        assert_eq!(state.reject_reason(), "");
    }

    #[test]
    fn test_invalidate_returns_false() {
        let mut state = ValidationState::new();
        assert!(!state.invalidate(REJECT_INVALID, "bad amount"));
        assert!(!state.is_valid());
        assert_eq!(state.reject_code(), REJECT_INVALID);
        assert_eq!(state.reject_reason(), "bad amount");
    }

    #[test]
    fn test_first_failure_wins() {
        let mut state = ValidationState::new();
        state.invalidate(REJECT_INVALID, "first");
        state.invalidate(42, "second");
        assert_eq!(state.reject_code(), REJECT_INVALID);
        assert_eq!(state.reject_reason(), "first");
    }
}
