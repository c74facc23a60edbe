//! # Names — Bidirectional Name ↔ Handle Maps
//!
//! Every registry in the runtime (components, entities, recipes, systems,
//! easings) is the same shape: a human-readable name on one side, an opaque
//! handle on the other, and lookups in both directions. [`NameMap`] is that
//! one shape, and it owns the invariant that the two directions never
//! disagree.
//!
//! ## Canonical Names
//!
//! Keys are normalized with [`canonical`] before they touch the map, so
//! `WorldTransform`, `world_transform`, `world transform` and
//! `world-transform` all name the same thing. Reverse lookups return the
//! canonical form.
//!
//! ## Overwrite Semantics
//!
//! ```text
//! insert("body", A)    body → A          A → body
//! insert("body", B)    body → B          B → body     (A loses its name)
//! insert("hull", B)    hull → B          B → hull     ("body" is freed)
//! ```
//!
//! Iteration follows first-registration order, so diagnostics that list
//! names are stable from run to run.

use std::collections::HashMap;
use std::hash::Hash;

/// Normalize a name to lower kebab-case.
///
/// Lowercase-to-uppercase transitions start a new word, and `_`, spaces and
/// runs of `-` collapse into a single `-`. Leading/trailing separators are
/// dropped.
pub fn canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.trim().chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// A 1:1 map between canonical names and handles.
#[derive(Debug, Clone)]
pub struct NameMap<H> {
    by_name: HashMap<String, H>,
    by_handle: HashMap<H, String>,
    /// Canonical names in first-registration order.
    order: Vec<String>,
}

impl<H: Copy + Eq + Hash> NameMap<H> {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_handle: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Bind `name` to `handle`, evicting whatever either side was bound to
    /// before.
    ///
    /// Returns the handle that previously held this name, if it was a
    /// different one. Re-inserting an identical pair is a no-op.
    pub fn insert(&mut self, name: &str, handle: H) -> Option<H> {
        let key = canonical(name);

        let previous = match self.by_name.get(&key) {
            Some(&existing) if existing == handle => return None,
            Some(&existing) => {
                self.by_handle.remove(&existing);
                Some(existing)
            }
            None => None,
        };

        // The handle is being renamed: free its old name.
        if let Some(old_name) = self.by_handle.remove(&handle) {
            self.by_name.remove(&old_name);
            self.order.retain(|n| *n != old_name);
        }

        if !self.by_name.contains_key(&key) && !self.order.contains(&key) {
            self.order.push(key.clone());
        }
        self.by_name.insert(key.clone(), handle);
        self.by_handle.insert(handle, key);
        previous
    }

    /// Look up a handle by name. `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<H> {
        self.by_name.get(&canonical(name)).copied()
    }

    /// The canonical name bound to `handle`, if any.
    pub fn name_of(&self, handle: H) -> Option<&str> {
        self.by_handle.get(&handle).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&canonical(name))
    }

    /// Unbind a handle. Returns the name it held.
    pub fn remove_handle(&mut self, handle: H) -> Option<String> {
        let name = self.by_handle.remove(&handle)?;
        self.by_name.remove(&name);
        self.order.retain(|n| *n != name);
        Some(name)
    }

    /// Unbind a name. Returns the handle it pointed at.
    pub fn remove_name(&mut self, name: &str) -> Option<H> {
        let key = canonical(name);
        let handle = self.by_name.remove(&key)?;
        self.by_handle.remove(&handle);
        self.order.retain(|n| *n != key);
        Some(handle)
    }

    /// Iterate `(name, handle)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, H)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.by_name.get(name).map(|&h| (name.as_str(), h)))
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_handle.clear();
        self.order.clear();
    }
}

impl<H: Copy + Eq + Hash> Default for NameMap<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms_agree() {
        assert_eq!(canonical("WorldTransform"), "world-transform");
        assert_eq!(canonical("world_transform"), "world-transform");
        assert_eq!(canonical("  world  transform "), "world-transform");
        assert_eq!(canonical("world--transform"), "world-transform");
        assert_eq!(canonical("posX"), "pos-x");
        assert_eq!(canonical("player1"), "player1");
        assert_eq!(canonical("HTTP"), "http");
    }

    #[test]
    fn get_and_name_of_round_trip() {
        let mut map = NameMap::new();
        map.insert("RigidBody", 1u32);
        map.insert("transform", 2u32);

        for (name, handle) in [("RigidBody", 1u32), ("transform", 2u32)] {
            assert_eq!(map.get(name), Some(handle));
            assert_eq!(map.name_of(handle), Some(canonical(name).as_str()));
        }
    }

    #[test]
    fn rebinding_name_evicts_stale_reverse() {
        let mut map = NameMap::new();
        map.insert("body", 1u32);
        let previous = map.insert("body", 2u32);

        assert_eq!(previous, Some(1));
        assert_eq!(map.get("body"), Some(2));
        assert_eq!(map.name_of(1), None);
        assert_eq!(map.name_of(2), Some("body"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn renaming_handle_evicts_old_name() {
        let mut map = NameMap::new();
        map.insert("body", 7u32);
        map.insert("hull", 7u32);

        assert_eq!(map.get("body"), None);
        assert_eq!(map.get("hull"), Some(7));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["hull"]);
    }

    #[test]
    fn identical_insert_is_noop() {
        let mut map = NameMap::new();
        map.insert("a", 1u32);
        assert_eq!(map.insert("A", 1u32), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unknown_name_is_absent() {
        let map: NameMap<u32> = NameMap::new();
        assert_eq!(map.get("missing"), None);
        assert!(!map.contains("missing"));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut map = NameMap::new();
        map.insert("zeta", 1u32);
        map.insert("alpha", 2u32);
        map.insert("mid", 3u32);
        // Overwriting keeps the original slot.
        map.insert("zeta", 4u32);

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("zeta", 4), ("alpha", 2), ("mid", 3)]);
    }

    #[test]
    fn remove_both_directions() {
        let mut map = NameMap::new();
        map.insert("a", 1u32);
        map.insert("b", 2u32);

        assert_eq!(map.remove_handle(1), Some("a".to_string()));
        assert_eq!(map.remove_name("B"), Some(2));
        assert!(map.is_empty());
        assert_eq!(map.names().count(), 0);
    }
}
