//! Nickname and account name folding.

use crate::{casefold, CasefoldError};

/// Characters that would make a name ambiguous in a prefix, mask or list.
const FORBIDDEN: [char; 8] = [' ', ',', '*', '?', '.', '!', '@', ':'];

/// Characters that collide with channel sigils and membership prefixes.
const FORBIDDEN_LEADING: [char; 7] = ['#', '~', '&', '@', '%', '+', '-'];

/// Fold a nickname or account name to its canonical key.
///
/// ```rust
/// use slirc_casefold::{casefold_identity, CasefoldError};
///
/// assert_eq!(casefold_identity("Nick_Name").unwrap(), "nick_name");
/// assert_eq!(casefold_identity("nick!user"), Err(CasefoldError::InvalidCharacter));
/// assert_eq!(casefold_identity(""), Err(CasefoldError::EmptyInput));
/// ```
pub fn casefold_identity(name: &str) -> Result<String, CasefoldError> {
    let folded = casefold(name)?;

    let Some(first) = folded.chars().next() else {
        return Err(CasefoldError::EmptyInput);
    };
    if FORBIDDEN_LEADING.contains(&first) || folded.contains(FORBIDDEN) {
        return Err(CasefoldError::InvalidCharacter);
    }

    Ok(folded)
}
