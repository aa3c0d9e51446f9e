//! Lookup of individual cookie values inside `Cookie` and `Set-Cookie` header
//! strings.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes that cannot appear raw in a cookie value.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Find the value of the cookie named `name` in a `Cookie` header string like
/// `a=1; csrftoken=abc123; b=2`, reversing any percent-encoding.
///
/// Matching is a literal prefix match on `name=` against each trimmed pair, so
/// `csrf` does not match `csrftoken=...`. When the same name appears more than
/// once, the first occurrence wins. The header is re-parsed on every call.
pub fn read_cookie(header: Option<&str>, name: &str) -> Option<String> {
    let header = match header {
        Some(header) if !header.is_empty() => header,
        _ => return None,
    };

    // An empty name never matches, not even stray "=value" fragments.
    if name.is_empty() {
        return None;
    }

    let prefix = format!("{}=", name);

    header
        .split(';')
        .map(str::trim)
        .find(|pair| pair.starts_with(&prefix))
        .map(|pair| decode_value(&pair[prefix.len()..]))
}

/// Find the value a single `Set-Cookie` header assigns to `name`, ignoring its
/// attributes (`Path`, `expires` and friends).
pub fn read_set_cookie(set_cookie: &str, name: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?;
    read_cookie(Some(pair), name)
}

/// Produce a `Cookie` header with the cookie `name` set to `value`. Existing
/// pairs for `name` are dropped and the new pair goes last; other pairs are
/// kept in order.
pub fn with_cookie(header: Option<&str>, name: &str, value: &str) -> String {
    let prefix = format!("{}=", name);
    let mut pairs: Vec<String> = header
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty() && !pair.starts_with(&prefix))
        .map(str::to_owned)
        .collect();

    pairs.push(format!("{}{}", prefix, utf8_percent_encode(value, COOKIE_VALUE)));
    pairs.join("; ")
}

fn decode_value(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
