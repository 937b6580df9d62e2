//! # Arrival-index sequence validation.
//!
//! Candidate indices must form a strict, gapless, zero-based sequence:
//! the first decided index is 0, and each subsequent index is exactly the
//! previous one plus one. [`validate_sequence`] enforces this against the
//! ledger's last index; duplicates and jumps both fail the same way.
//!
//! Stateless given its two inputs; no side effects.

use crate::error::StepError;

/// Validates the incoming candidate index against the last decided one.
///
/// - `last_index = None` (empty ledger): succeeds only for `incoming = 0`.
/// - `last_index = Some(i)`: succeeds only for `incoming = i + 1`.
///
/// Any other incoming index fails with [`StepError::OutOfSequence`],
/// covering both resubmitted (duplicate) and skipped (gap) indices.
///
/// # Example
/// ```
/// use doorman::validate_sequence;
///
/// assert!(validate_sequence(None, 0).is_ok());
/// assert!(validate_sequence(Some(4), 5).is_ok());
/// assert!(validate_sequence(Some(4), 4).is_err()); // duplicate
/// assert!(validate_sequence(Some(4), 7).is_err()); // gap
/// ```
pub fn validate_sequence(last_index: Option<u64>, incoming: u64) -> Result<(), StepError> {
    let expected = match last_index {
        None => 0,
        Some(i) => i + 1,
    };
    if incoming != expected {
        return Err(StepError::OutOfSequence {
            expected,
            got: incoming,
        });
    }
    Ok(())
}
