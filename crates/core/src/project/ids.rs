//! Object identifiers
//!
//! Xcode identifies every object by 24 upper-case hex digits. New ids are
//! derived from an md5 digest of a seed, so the same run over the same input
//! always produces the same file.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `text` has the shape of an Xcode object id.
    pub fn is_well_formed(text: &str) -> bool {
        text.len() == 24 && text.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Generates ids that are stable for a given seed and never collide with ids
/// already present in the project.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    taken: HashSet<String>,
}

impl IdGenerator {
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a ObjectId>) -> Self {
        Self {
            taken: existing.into_iter().map(|id| id.0.clone()).collect(),
        }
    }

    pub fn generate(&mut self, seed: &str) -> ObjectId {
        let mut attempt = 0u32;
        loop {
            let digest = md5::compute(format!("{seed}#{attempt}").as_bytes());
            let mut id = format!("{:X}", digest);
            id.truncate(24);
            if self.taken.insert(id.clone()) {
                return ObjectId(id);
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_well_formed() {
        let mut ids = IdGenerator::default();
        let id = ids.generate("HomeWidget/target");
        assert!(ObjectId::is_well_formed(id.as_str()));
        assert!(id.as_str().chars().all(|c| !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = IdGenerator::default().generate("seed");
        let b = IdGenerator::default().generate("seed");
        assert_eq!(a, b);
    }

    #[test]
    fn test_generation_skips_taken_ids() {
        let first = IdGenerator::default().generate("seed");
        let mut ids = IdGenerator::new([&first]);
        let second = ids.generate("seed");
        assert_ne!(first, second);
    }
}
