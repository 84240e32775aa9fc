//! Library-reference extraction and injection.
//!
//! Unity regenerates its C# project descriptors with the full set of
//! `<Reference Include="..."><HintPath>...</HintPath></Reference>` entries the
//! host compiles against. [`extractor`] mirrors that set into a classified
//! [`ReferenceContainer`]; [`writer`] injects the container into an F# project
//! descriptor, replacing whatever fsbridge wrote on earlier runs.

pub mod extractor;
pub mod writer;

pub use extractor::{extract, ExtractPolicy};
pub use writer::{write_references, WritePolicy, OWNERSHIP_LABEL};

use std::hash::{Hash, Hasher};

/// One library reference: logical name plus the path of its binary.
///
/// Equality and hashing are defined on the name alone, so a set of references
/// deduplicates by name regardless of where each descriptor says the binary
/// lives.
#[derive(Debug, Clone)]
pub struct Reference {
    pub include: String,
    pub hint_path: String,
}

impl Reference {
    pub fn new(include: impl Into<String>, hint_path: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            hint_path: hint_path.into(),
        }
    }

    /// Probe value for name-keyed set lookups.
    fn named(include: &str) -> Self {
        Self::new(include, "")
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.include == other.include
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.include.hash(state);
    }
}

/// Classified result of reference extraction.
///
/// `unity_engine` and `unity_editor` are always present; extraction fails
/// outright when either is missing from the host descriptors. `additional`
/// is sorted by name and never contains the mandatory or C# entries.
#[derive(Debug, Clone)]
pub struct ReferenceContainer {
    pub unity_engine: Reference,
    pub unity_editor: Reference,
    pub csharp_dll: Option<Reference>,
    pub additional: Vec<Reference>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_hint_path() {
        let a = Reference::new("UnityEngine", "/a/UnityEngine.dll");
        let b = Reference::new("UnityEngine", "/b/UnityEngine.dll");
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_replaces_by_name() {
        let mut set = HashSet::new();
        set.insert(Reference::new("Newtonsoft.Json", "/old/path.dll"));
        set.replace(Reference::new("Newtonsoft.Json", "/new/path.dll"));

        assert_eq!(set.len(), 1);
        let entry = set.take(&Reference::named("Newtonsoft.Json")).unwrap();
        assert_eq!(entry.hint_path, "/new/path.dll");
    }
}
