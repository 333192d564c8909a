//! The core folding pass and its fixed-point driver.
//!
//! A single pass maps fullwidth and halfwidth compatibility characters to
//! their ordinary forms, lowercases the result and recomposes it to NFC.
//! Some inputs only settle after a second or third pass, so [`casefold`]
//! repeats the pass until the output stops changing.

use unicode_normalization::UnicodeNormalization;

use crate::CasefoldError;

/// Upper bound on folding passes before giving up with
/// [`CasefoldError::NotStabilizing`].
pub const MAX_STABILIZE_PASSES: usize = 4;

const CASEMAPPING: &str = "rfc8265";

/// The value advertised as `CASEMAPPING` in `RPL_ISUPPORT`.
pub fn casemapping_name() -> &'static str {
    CASEMAPPING
}

/// Fold `input` to its canonical comparison key.
///
/// The result is idempotent: folding an already-folded string returns it
/// unchanged. Control characters and whitespace other than U+0020 are
/// rejected; callers apply their own rules for plain spaces.
///
/// ```rust
/// use slirc_casefold::casefold;
///
/// assert_eq!(casefold("HeLLo").unwrap(), "hello");
/// assert_eq!(casefold("\u{FF21}\u{FF22}").unwrap(), "ab");
/// ```
pub fn casefold(input: &str) -> Result<String, CasefoldError> {
    let folded = stabilize(input, fold_pass)?;
    if folded.chars().any(is_disallowed) {
        return Err(CasefoldError::InvalidCharacter);
    }
    Ok(folded)
}

/// Apply `pass` repeatedly until its output equals its input.
///
/// At most [`MAX_STABILIZE_PASSES`] passes run. An input that is still
/// changing on the last pass fails with [`CasefoldError::NotStabilizing`].
pub fn stabilize<F>(input: &str, mut pass: F) -> Result<String, CasefoldError>
where
    F: FnMut(&str) -> String,
{
    let mut current = input.to_owned();
    for _ in 0..MAX_STABILIZE_PASSES {
        let next = pass(&current);
        if next == current {
            return Ok(current);
        }
        current = next;
    }
    Err(CasefoldError::NotStabilizing)
}

fn fold_pass(input: &str) -> String {
    let mut widened = String::with_capacity(input.len());
    for c in input.chars() {
        if is_width_variant(c) {
            widened.extend(std::iter::once(c).nfkc());
        } else {
            widened.push(c);
        }
    }

    let lowered: String = widened.chars().flat_map(char::to_lowercase).collect();
    lowered.nfc().collect()
}

/// Ideographic space plus the Halfwidth and Fullwidth Forms block.
#[inline]
fn is_width_variant(c: char) -> bool {
    matches!(c, '\u{3000}' | '\u{FF01}'..='\u{FFEE}')
}

#[inline]
fn is_disallowed(c: char) -> bool {
    c.is_control() || (c.is_whitespace() && c != ' ')
}
