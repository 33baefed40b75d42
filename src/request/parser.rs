//! Request list parsing
//!
//! `REQUESTS` holds whitespace-separated absolute URLs such as
//! `https://server:443/files/a.bin`. URLs are grouped by host and first path
//! segment; the remaining path of each URL is what the browser asks for.

/// Request tails grouped by `"<host>/<firstSegment>"`, in first-seen order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMap {
    entries: Vec<(String, Vec<String>)>,
}

impl RequestMap {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, tails)| tails.as_slice())
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, tails)| (k.as_str(), tails.as_slice()))
    }

    /// Path tails of the first key seen, or nothing for an empty map
    pub fn primary_tails(&self) -> Vec<String> {
        self.entries
            .first()
            .map(|(_, tails)| tails.clone())
            .unwrap_or_default()
    }

    fn entry(&mut self, key: String) -> &mut Vec<String> {
        let idx = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }
}

/// Parse a whitespace-separated URL list into a [`RequestMap`].
///
/// Only URLs with a path beyond the first segment contribute; a bare
/// `https://host/files` adds no key of its own.
pub fn parse_requests(requests: &str) -> RequestMap {
    let mut map = RequestMap::default();
    for url in requests.split_whitespace() {
        let (host, path) = split_url(url);
        let (first, rest) = split_first_segment(path);
        if !rest.is_empty() {
            map.entry(format!("{host}/{first}")).push(rest.to_string());
        }
    }
    map
}

/// First path segment of the first URL, if it has one
pub fn resolve_endpoint(requests: &str) -> Option<String> {
    let url = requests.split_whitespace().next()?;
    let (_, path) = split_url(url);
    let (first, _) = split_first_segment(path);
    (!first.is_empty()).then(|| first.to_string())
}

/// Split `/first/rest/of/path` into `("first", "rest/of/path")`
fn split_first_segment(path: &str) -> (&str, &str) {
    let path = path.trim_start_matches('/');
    path.split_once('/').unwrap_or((path, ""))
}

/// Split a URL into `(host, path)` without validating it.
///
/// Without a `//authority` part the host is empty and everything up to the
/// query or fragment counts as path.
fn split_url(url: &str) -> (&str, &str) {
    let url = url.split(['#', '?']).next().unwrap_or_default();
    let rest = strip_scheme(url);

    match rest.strip_prefix("//") {
        Some(authority_and_path) => match authority_and_path.find('/') {
            Some(idx) => authority_and_path.split_at(idx),
            None => (authority_and_path, ""),
        },
        None => ("", rest),
    }
}

fn strip_scheme(url: &str) -> &str {
    let Some((scheme, rest)) = url.split_once(':') else {
        return url;
    };
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        rest
    } else {
        url
    }
}
