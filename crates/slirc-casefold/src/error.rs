//! Casefolding error types.

use thiserror::Error;

/// Reasons a name has no canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CasefoldError {
    /// The name was empty, before or after folding.
    #[error("string is empty")]
    EmptyInput,

    /// The name contains a character that is not allowed in its position.
    #[error("invalid character")]
    InvalidCharacter,

    /// Repeated folding never reached a fixed point.
    #[error("casefolding did not stabilize")]
    NotStabilizing,
}
