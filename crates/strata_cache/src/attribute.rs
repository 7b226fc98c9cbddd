//! Boolean attribute families backed by one [`MemoCell`] each.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::CacheError;
use crate::memo::MemoCell;

/// A group of mutually exclusive boolean attributes decided together, such as
/// the four visibilities of a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AttributeFamily {
    /// Family name used for lookups.
    pub name: &'static str,
    /// Every attribute of the family.
    pub members: &'static [&'static str],
}

impl AttributeFamily {
    /// Declares a family.
    pub const fn new(name: &'static str, members: &'static [&'static str]) -> Self {
        Self { name, members }
    }

    /// Returns `true` if `attribute` belongs to this family.
    pub fn contains(&self, attribute: &str) -> bool {
        self.members.contains(&attribute)
    }
}

/// Effective visibility of a declaration.
pub const VISIBILITY: AttributeFamily =
    AttributeFamily::new("visibility", &["public", "internal", "protected", "private"]);

/// Effective modality of a declaration.
pub const MODALITY: AttributeFamily =
    AttributeFamily::new("modality", &["final", "open", "abstract", "sealed"]);

struct FamilyCell {
    family: AttributeFamily,
    cell: MemoCell<String, bool>,
}

/// Yes/no facts about one declaration, computed lazily per family.
///
/// Asking for any attribute of a family runs the family's filler once, which
/// is expected to answer for every member of the family in one batch.
pub struct AttributeCache {
    families: FxHashMap<&'static str, FamilyCell>,
}

impl AttributeCache {
    /// Creates a cache with no families.
    pub fn new() -> Self {
        Self {
            families: FxHashMap::default(),
        }
    }

    /// Registers a family with the attributes already known without
    /// computation and a filler for the rest.
    pub fn with_family<I, F>(mut self, family: AttributeFamily, known: I, filler: F) -> Self
    where
        I: IntoIterator<Item = (&'static str, bool)>,
        F: Fn(&str) -> Result<Option<FxHashMap<String, bool>>, String> + Send + Sync + 'static,
    {
        let initial: FxHashMap<String, bool> = known
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let cell = MemoCell::try_new(initial, move |key: &String| filler(key.as_str()));
        self.families.insert(family.name, FamilyCell { family, cell });
        self
    }

    /// Returns whether `attribute` of `family` holds.
    pub fn has_attribute(&self, family: &str, attribute: &str) -> Result<bool, CacheError> {
        let entry = self.family_cell(family)?;
        if !entry.family.contains(attribute) {
            return Err(CacheError::UnknownAttribute {
                family: family.to_string(),
                name: attribute.to_string(),
            });
        }
        entry.cell.get(&attribute.to_string())
    }

    /// Returns the first member of `family` that holds, if any.
    pub fn value_of(&self, family: &str) -> Result<Option<&'static str>, CacheError> {
        let entry = self.family_cell(family)?;
        for &member in entry.family.members {
            if entry.cell.get(&member.to_string())? {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// Returns the names of the registered families.
    pub fn families(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.families.keys().copied()
    }

    fn family_cell(&self, family: &str) -> Result<&FamilyCell, CacheError> {
        self.families
            .get(family)
            .ok_or_else(|| CacheError::UnknownFamily(family.to_string()))
    }
}

impl Default for AttributeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttributeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.families.iter().map(|(name, entry)| (name, &entry.cell)))
            .finish()
    }
}

/// Builds a batch answering every member of `family`, with only `winner` set.
pub fn exclusive_batch(family: AttributeFamily, winner: &str) -> FxHashMap<String, bool> {
    family
        .members
        .iter()
        .map(|&member| (member.to_string(), member == winner))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_cache(calls: Arc<AtomicUsize>) -> AttributeCache {
        AttributeCache::new().with_family(VISIBILITY, [], move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(exclusive_batch(VISIBILITY, "internal")))
        })
    }

    #[test]
    fn one_filler_call_answers_whole_family() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Arc::clone(&calls));
        assert!(!cache.has_attribute("visibility", "public").unwrap());
        assert!(cache.has_attribute("visibility", "internal").unwrap());
        assert!(!cache.has_attribute("visibility", "protected").unwrap());
        assert!(!cache.has_attribute("visibility", "private").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn known_attributes_skip_filler() {
        let cache = AttributeCache::new().with_family(
            MODALITY,
            [("final", false), ("open", false), ("abstract", true), ("sealed", false)],
            |_| Err("filler must not run".to_string()),
        );
        assert!(cache.has_attribute("modality", "abstract").unwrap());
        assert_eq!(cache.value_of("modality").unwrap(), Some("abstract"));
    }

    #[test]
    fn unknown_family_and_attribute() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)));
        assert_eq!(
            cache.has_attribute("color", "red").unwrap_err(),
            CacheError::UnknownFamily("color".into())
        );
        assert!(matches!(
            cache.has_attribute("visibility", "abstract"),
            Err(CacheError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn value_of_reports_winner() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)));
        assert_eq!(cache.value_of("visibility").unwrap(), Some("internal"));
        assert_eq!(cache.families().collect::<Vec<_>>(), vec!["visibility"]);
    }
}
