//! URI 分段：前缀树的键
//!
//! 第一段为 `scheme://authority`，其后是非空的路径段

use url::Url;

pub fn uri_segments(uri: &Url) -> Vec<String> {
    let mut segments = Vec::new();
    segments.push(format!("{}://{}", uri.scheme(), uri.authority()));
    if let Some(path) = uri.path_segments() {
        segments.extend(path.filter(|s| !s.is_empty()).map(str::to_string));
    }
    segments
}

/// Every proper ancestor of `uri`, nearest first, ending at the root path.
pub fn ancestor_uris(uri: &Url) -> Vec<Url> {
    let segments: Vec<&str> = match uri.path_segments() {
        Some(path) => path.filter(|s| !s.is_empty()).collect(),
        None => return Vec::new(),
    };
    (0..segments.len())
        .rev()
        .map(|depth| {
            let mut ancestor = uri.clone();
            ancestor.set_path(&format!("/{}", segments[..depth].join("/")));
            ancestor.set_query(None);
            ancestor.set_fragment(None);
            ancestor
        })
        .collect()
}

pub fn is_ancestor_uri(ancestor: &Url, descendant: &Url) -> bool {
    let a = uri_segments(ancestor);
    let d = uri_segments(descendant);
    a.len() < d.len() && d.starts_with(&a)
}

#[cfg(test)]
#[path = "../../tests/unit/core/uri.rs"]
mod tests;
