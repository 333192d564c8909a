//! Channel name folding.

use crate::{casefold, CasefoldError};

/// The only prefix accepted on channel names.
pub const CHANNEL_SIGIL: char = '#';

/// Characters that may never appear in the body of a channel name.
const FORBIDDEN: [char; 4] = [' ', ',', '*', '?'];

/// Fold a channel name to its canonical key.
///
/// The leading run of `#` sigils is kept verbatim and the remainder is
/// folded with [`casefold`]. A name without a sigil, or whose body holds a
/// space, comma or wildcard, is rejected.
///
/// ```rust
/// use slirc_casefold::{casefold_channel, CasefoldError};
///
/// assert_eq!(casefold_channel("#Rust").unwrap(), "#rust");
/// assert_eq!(casefold_channel("##Off-Topic").unwrap(), "##off-topic");
/// assert_eq!(casefold_channel("rust"), Err(CasefoldError::InvalidCharacter));
/// ```
pub fn casefold_channel(name: &str) -> Result<String, CasefoldError> {
    if name.is_empty() {
        return Err(CasefoldError::EmptyInput);
    }

    let sigils = name.len() - name.trim_start_matches(CHANNEL_SIGIL).len();
    if sigils == 0 {
        return Err(CasefoldError::InvalidCharacter);
    }

    let (prefix, body) = name.split_at(sigils);
    let body = casefold(body)?;
    if body.contains(FORBIDDEN) {
        return Err(CasefoldError::InvalidCharacter);
    }

    Ok(format!("{prefix}{body}"))
}
