//! The key codec: escapes [`FIELD_SEPARATOR`] so composite keys and
//! multi-valued cells can be joined unambiguously.
//!
//! `encode` replaces every occurrence of the field separator in a string
//! with the reserved invalid token; `decode` reverses it. Because the
//! invalid token itself may never appear in a user string (enforced here by
//! rejecting it at encode time), and because `encode` removes every
//! separator occurrence, splitting an encoded, joined string by the
//! separator is always unambiguous.

use entityspace_core::{contains_invalid_token, Error, Result, FIELD_SEPARATOR, INVALID_TOKEN};

/// Escape `s` for storage: every [`FIELD_SEPARATOR`] becomes [`INVALID_TOKEN`].
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `s` already contains the invalid
/// token — users may not embed the sentinel.
pub fn encode(s: &str) -> Result<String> {
    if contains_invalid_token(s) {
        return Err(Error::invalid_input(
            "string contains the reserved invalid token",
        ));
    }
    Ok(s.replace(FIELD_SEPARATOR, INVALID_TOKEN))
}

/// Reverse [`encode`]: every [`INVALID_TOKEN`] becomes [`FIELD_SEPARATOR`].
///
/// Never fails: anything reaching `decode` passed through `encode` first,
/// so it is well-formed by construction.
pub fn decode(s: &str) -> String {
    s.replace(INVALID_TOKEN, FIELD_SEPARATOR)
}

/// Encode every component and join them with the field separator, forming a
/// composite key or a multi-valued cell.
///
/// # Errors
///
/// Propagates [`encode`]'s error if any component contains the invalid
/// token.
pub fn encode_join<I, S>(parts: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let encoded: Result<Vec<String>> = parts.into_iter().map(|p| encode(p.as_ref())).collect();
    Ok(encoded?.join(FIELD_SEPARATOR))
}

/// Split a joined, encoded string back into its decoded components.
///
/// Splitting by [`FIELD_SEPARATOR`] is unambiguous because `encode` strips
/// every raw separator occurrence from each component before joining.
pub fn split_decode(joined: &str) -> Vec<String> {
    joined.split(FIELD_SEPARATOR).map(decode).collect()
}
