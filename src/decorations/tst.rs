//! URI 三叉搜索树
//!
//! 以 URI 分段为键（见 `core::uri::uri_segments`），节点存放在 slotmap
//! 中。支持最长前缀、祖先与后代查询。

use crate::core::uri::uri_segments;
use slotmap::{new_key_type, SlotMap};
use std::cmp::Ordering;
use url::Url;

new_key_type! { struct TstKey; }

#[derive(Clone, Copy, Debug)]
enum Link {
    Left,
    Mid,
    Right,
}

struct TstNode<V> {
    segment: String,
    entry: Option<(Url, V)>,
    left: Option<TstKey>,
    mid: Option<TstKey>,
    right: Option<TstKey>,
}

impl<V> TstNode<V> {
    fn new(segment: String) -> Self {
        Self {
            segment,
            entry: None,
            left: None,
            mid: None,
            right: None,
        }
    }

    fn link(&self, link: Link) -> Option<TstKey> {
        match link {
            Link::Left => self.left,
            Link::Mid => self.mid,
            Link::Right => self.right,
        }
    }
}

pub struct TernarySearchTree<V> {
    arena: SlotMap<TstKey, TstNode<V>>,
    root: Option<TstKey>,
    len: usize,
}

impl<V> Default for TernarySearchTree<V> {
    fn default() -> Self {
        Self {
            arena: SlotMap::with_key(),
            root: None,
            len: 0,
        }
    }
}

impl<V> TernarySearchTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
    }

    fn set_link(&mut self, parent: Option<(TstKey, Link)>, child: Option<TstKey>) {
        let Some((parent, link)) = parent else {
            self.root = child;
            return;
        };
        if let Some(node) = self.arena.get_mut(parent) {
            match link {
                Link::Left => node.left = child,
                Link::Mid => node.mid = child,
                Link::Right => node.right = child,
            }
        }
    }

    /// Walk `segments` and return the path of links taken plus the node for
    /// the last segment, if the key is present.
    fn locate(&self, segments: &[String]) -> (Vec<(TstKey, Link)>, Option<TstKey>) {
        let mut path = Vec::new();
        let mut current = self.root;
        let mut index = 0;
        while let Some(key) = current {
            let Some(segment) = segments.get(index) else {
                break;
            };
            let node = &self.arena[key];
            let link = match segment.as_str().cmp(node.segment.as_str()) {
                Ordering::Less => Link::Left,
                Ordering::Greater => Link::Right,
                Ordering::Equal => {
                    if index + 1 == segments.len() {
                        return (path, Some(key));
                    }
                    index += 1;
                    Link::Mid
                }
            };
            path.push((key, link));
            current = node.link(link);
        }
        (path, None)
    }

    /// Store `value` for `uri`, returning the value it replaces.
    pub fn set(&mut self, uri: &Url, value: V) -> Option<V> {
        let segments = uri_segments(uri);
        let mut parent: Option<(TstKey, Link)> = None;
        let mut current = self.root;
        let mut index = 0;
        loop {
            let key = match current {
                Some(key) => key,
                None => {
                    let key = self.arena.insert(TstNode::new(segments[index].clone()));
                    self.set_link(parent, Some(key));
                    key
                }
            };
            let node = &self.arena[key];
            let link = match segments[index].as_str().cmp(node.segment.as_str()) {
                Ordering::Less => Link::Left,
                Ordering::Greater => Link::Right,
                Ordering::Equal => {
                    if index + 1 == segments.len() {
                        let old = self.arena[key].entry.replace((uri.clone(), value));
                        if old.is_none() {
                            self.len += 1;
                        }
                        return old.map(|(_, value)| value);
                    }
                    index += 1;
                    Link::Mid
                }
            };
            current = node.link(link);
            parent = Some((key, link));
        }
    }

    pub fn get(&self, uri: &Url) -> Option<&V> {
        let (_, key) = self.locate(&uri_segments(uri));
        self.arena[key?].entry.as_ref().map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, uri: &Url) -> Option<&mut V> {
        let (_, key) = self.locate(&uri_segments(uri));
        self.arena[key?].entry.as_mut().map(|(_, value)| value)
    }

    /// Remove the value for `uri`, pruning nodes that no longer lead anywhere.
    pub fn delete(&mut self, uri: &Url) -> Option<V> {
        let (mut path, key) = self.locate(&uri_segments(uri));
        let mut key = key?;
        let (_, value) = self.arena[key].entry.take()?;
        self.len -= 1;

        loop {
            let node = &self.arena[key];
            if node.entry.is_some() || node.mid.is_some() {
                break;
            }
            let replacement = match (node.left, node.right) {
                (None, None) => None,
                (Some(only), None) | (None, Some(only)) => Some(only),
                (Some(_), Some(_)) => break,
            };
            self.arena.remove(key);
            let parent = path.pop();
            self.set_link(parent, replacement);
            match parent {
                Some((parent, _)) => key = parent,
                None => break,
            }
        }
        Some(value)
    }

    /// The value stored for the longest prefix of `uri`, `uri` included.
    pub fn find_substr(&self, uri: &Url) -> Option<&V> {
        let segments = uri_segments(uri);
        let (path, key) = self.locate(&segments);
        key.into_iter()
            .chain(
                path.iter()
                    .rev()
                    .filter(|(_, link)| matches!(link, Link::Mid))
                    .map(|(key, _)| *key),
            )
            .find_map(|key| self.arena[key].entry.as_ref().map(|(_, value)| value))
    }

    /// Values stored for strict prefixes of `uri`, nearest last.
    pub fn ancestors(&self, uri: &Url) -> Vec<(&Url, &V)> {
        let segments = uri_segments(uri);
        let mut found = Vec::new();
        let mut current = self.root;
        let mut index = 0;
        while let Some(key) = current {
            if index + 1 >= segments.len() {
                break;
            }
            let node = &self.arena[key];
            current = match segments[index].as_str().cmp(node.segment.as_str()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => {
                    if let Some((uri, value)) = &node.entry {
                        found.push((uri, value));
                    }
                    index += 1;
                    node.mid
                }
            };
        }
        found
    }

    /// Values stored strictly below `uri`.
    pub fn find_superstr(&self, uri: &Url) -> Vec<(&Url, &V)> {
        let (_, key) = self.locate(&uri_segments(uri));
        match key {
            Some(key) => self.collect(self.arena[key].mid),
            None => Vec::new(),
        }
    }

    pub fn entries(&self) -> Vec<(&Url, &V)> {
        self.collect(self.root)
    }

    fn collect(&self, start: Option<TstKey>) -> Vec<(&Url, &V)> {
        let mut found = Vec::new();
        let mut stack: Vec<TstKey> = start.into_iter().collect();
        while let Some(key) = stack.pop() {
            let node = &self.arena[key];
            if let Some((uri, value)) = &node.entry {
                found.push((uri, value));
            }
            stack.extend([node.right, node.mid, node.left].into_iter().flatten());
        }
        found
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decorations/tst.rs"]
mod tests;
