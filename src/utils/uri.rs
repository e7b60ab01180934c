// ! URL query helpers
// !
// ! Module provides the small set of query-string operations the capture store
// ! and the probe engine share: lookup, in-place replacement and removal.

use url::Url;

use crate::core::error::{ProbeError, ProbeResult};

/// Parse an absolute URL presented at a crate boundary
///
/// Surrounding whitespace is rejected rather than trimmed: callers key on the
/// exact string, which must be the one that parsed.
pub fn parse_absolute(raw: &str) -> ProbeResult<Url> {
    if raw.trim().is_empty() {
        return Err(ProbeError::malformed("URL cannot be empty"));
    }
    if raw.trim() != raw {
        return Err(ProbeError::malformed(format!(
            "URL '{}' has surrounding whitespace",
            raw.escape_debug()
        )));
    }

    let url = Url::parse(raw)
        .map_err(|e| ProbeError::malformed(format!("Invalid URL '{raw}': {e}")))?;

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ProbeError::malformed(format!(
            "URL '{raw}' has no host component"
        )));
    }

    Ok(url)
}

/// Whether the query string carries `name` (with any value, including empty)
pub fn has_query_param(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(key, _)| key == name)
}

/// First decoded value of `name` in the query string
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Copy of `url` with `name` set to `value`
///
/// The first occurrence is replaced in place and later duplicates are dropped;
/// an absent parameter is appended. Every other pair keeps its position.
pub fn with_query_param(url: &Url, name: &str, value: &str) -> Url {
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, current) in url.query_pairs() {
        if key == name {
            if !replaced {
                pairs.push((key.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((key.into_owned(), current.into_owned()));
        }
    }

    if !replaced {
        pairs.push((name.to_string(), value.to_string()));
    }

    rebuild_query(url, &pairs)
}

/// Copy of `url` with every occurrence of `name` removed
pub fn without_query_param(url: &Url, name: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    rebuild_query(url, &pairs)
}

/// Serialized origin (`scheme://host[:port]`)
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Host followed by `:port` when the URL spells out a non-default port
pub fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn rebuild_query(url: &Url, pairs: &[(String, String)]) -> Url {
    let mut rebuilt = url.clone();
    if pairs.is_empty() {
        rebuilt.set_query(None);
    } else {
        rebuilt.query_pairs_mut().clear().extend_pairs(pairs);
    }
    rebuilt
}
