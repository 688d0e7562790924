//! Link canonicalization.
//!
//! The canonical form is the dedup and storage key: it always has a scheme
//! (`http://` when none was given), an ASCII (punycode) lower-case host and a
//! normalized path. Canonicalizing a canonical link returns it unchanged.

use url::Url;

/// Canonicalizes `raw`, or returns `None` if it is not a usable link.
pub fn canonicalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = if has_scheme(raw) {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("http://{raw}")).ok()?
    };
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url.into())
}

/// Host of a canonical link.
pub fn host_of(link: &str) -> Option<String> {
    Url::parse(link).ok()?.host_str().map(str::to_string)
}

fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
