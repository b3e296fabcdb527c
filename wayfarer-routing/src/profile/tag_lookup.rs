//! Tag lookup utility for profiles
//!
//! Profiles read tags either from an interned set (cost tables) or straight
//! from a raw record (way filtering during the build, before interning).

use crate::tags::TagSet;

#[derive(Clone, Copy)]
pub enum TagLookup<'a> {
    Interned(TagSet<'a>),
    Raw(&'a [(String, String)]),
}

impl<'a> TagLookup<'a> {
    pub fn interned(tags: TagSet<'a>) -> Self {
        TagLookup::Interned(tags)
    }

    pub fn raw(tags: &'a [(String, String)]) -> Self {
        TagLookup::Raw(tags)
    }

    /// Get a tag value by key name. Raw tags with a repeated key resolve to
    /// the first value, matching the dictionary.
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        match *self {
            TagLookup::Interned(tags) => tags.get(key),
            TagLookup::Raw(tags) => tags
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// True when `key` has one of `values`
    pub fn is_any(&self, key: &str, values: &[&str]) -> bool {
        self.get_str(key).is_some_and(|v| values.contains(&v))
    }
}
