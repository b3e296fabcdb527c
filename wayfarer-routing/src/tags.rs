//! Tag dictionary
//!
//! Interns key/value tag sets into compact integer handles. Keys and values
//! are interned as strings, each distinct set is stored once as a sorted
//! array of string ids.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

/// Handle of an interned tag set, stable for the lifetime of one dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagHandle(pub u32);

impl TagHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct TagDictionary {
    strings: Vec<Box<str>>,
    string_ids: FxHashMap<Box<str>, u32>,
    /// (key id, value id), sorted by key id, one entry per key
    sets: Vec<Box<[(u32, u32)]>>,
    set_ids: FxHashMap<Box<[(u32, u32)]>, TagHandle>,
}

impl TagDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a tag set. Input order is irrelevant; a repeated key keeps its
    /// first value.
    pub fn intern<'t, I>(&mut self, tags: I) -> TagHandle
    where
        I: IntoIterator<Item = (&'t str, &'t str)>,
    {
        let mut pairs: Vec<(u32, u32)> = tags
            .into_iter()
            .map(|(k, v)| (self.intern_str(k), self.intern_str(v)))
            .collect();

        // Stable sort so dedup keeps the first occurrence of each key
        pairs.sort_by_key(|&(k, _)| k);
        pairs.dedup_by_key(|&mut (k, _)| k);

        let pairs = pairs.into_boxed_slice();
        if let Some(&handle) = self.set_ids.get(&pairs) {
            return handle;
        }

        let handle = TagHandle(self.sets.len() as u32);
        self.sets.push(pairs.clone());
        self.set_ids.insert(pairs, handle);
        handle
    }

    /// Borrowed view of an interned set. Unknown handles resolve to the
    /// empty set.
    pub fn resolve(&self, handle: TagHandle) -> TagSet<'_> {
        TagSet {
            dict: self,
            pairs: self.sets.get(handle.index()).map(|s| &s[..]).unwrap_or(&[]),
        }
    }

    /// Number of distinct tag sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of distinct key and value strings
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// All handles in interning order
    pub fn handles(&self) -> impl Iterator<Item = TagHandle> + '_ {
        (0..self.sets.len() as u32).map(TagHandle)
    }

    fn intern_str(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.string_ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.into());
        self.string_ids.insert(s.into(), id);
        id
    }

    fn string(&self, id: u32) -> &str {
        self.strings.get(id as usize).map(|s| &**s).unwrap_or("")
    }
}

/// Read-only view of one interned tag set
#[derive(Clone, Copy)]
pub struct TagSet<'a> {
    dict: &'a TagDictionary,
    pairs: &'a [(u32, u32)],
}

impl<'a> TagSet<'a> {
    pub fn get(&self, key: &str) -> Option<&'a str> {
        let key_id = *self.dict.string_ids.get(key)?;
        let idx = self.pairs.binary_search_by_key(&key_id, |&(k, _)| k).ok()?;
        Some(self.dict.string(self.pairs[idx].1))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let dict = self.dict;
        self.pairs
            .iter()
            .map(move |&(k, v)| (dict.string(k), dict.string(v)))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl std::fmt::Debug for TagSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_sets_share_handle() {
        let mut dict = TagDictionary::new();
        let a = dict.intern([("highway", "residential"), ("name", "Elm Street")]);
        let b = dict.intern([("name", "Elm Street"), ("highway", "residential")]);
        let c = dict.intern([("highway", "primary")]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(dict.len(), 2);
        // highway, residential, name, Elm Street, primary
        assert_eq!(dict.string_count(), 5);
    }

    #[test]
    fn test_resolve_lookup() {
        let mut dict = TagDictionary::new();
        let h = dict.intern([("highway", "footway"), ("surface", "gravel")]);
        let tags = dict.resolve(h);

        assert_eq!(tags.get("highway"), Some("footway"));
        assert_eq!(tags.get("surface"), Some("gravel"));
        assert_eq!(tags.get("name"), None);
        assert!(tags.has("surface"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        let mut dict = TagDictionary::new();
        let h = dict.intern([("maxspeed", "30"), ("highway", "service"), ("maxspeed", "50")]);
        assert_eq!(dict.resolve(h).get("maxspeed"), Some("30"));
        assert_eq!(dict.resolve(h).len(), 2);
    }

    #[test]
    fn test_empty_set_and_unknown_handle() {
        let mut dict = TagDictionary::new();
        let empty = dict.intern(std::iter::empty());
        assert!(dict.resolve(empty).is_empty());
        assert!(dict.resolve(TagHandle(42)).is_empty());
    }

    #[test]
    fn test_to_map_is_ordered() {
        let mut dict = TagDictionary::new();
        let h = dict.intern([("oneway", "yes"), ("highway", "primary")]);
        let map = dict.resolve(h).to_map();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["highway".to_string(), "oneway".to_string()]);
    }
}
