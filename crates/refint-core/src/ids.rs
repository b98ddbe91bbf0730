//! Module: ids
//! Responsibility: primitive 64-bit identifier newtypes plus dense
//! primitive-integer set/map containers over them (§9 "Dense ID maps").
//! Does not own: any notion of existence or resolvability — membership in
//! an `IdSet` says nothing about whether the identifier is still active.

use derive_more::{Display, From};
use std::fmt;

///
/// ConceptId
///
/// Stable 64-bit SNOMED concept identifier.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConceptId(pub u64);

///
/// RelationshipId
///
/// Stable 64-bit relationship identifier.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct RelationshipId(pub u64);

///
/// AxiomMemberId
///
/// Reference-set member identity for an OWL axiom row.
///
/// Per §9's open question: the source conflated `memberId` and `axiom.getId()`
/// in places. Here axiom identity is a single stable string end to end —
/// there is no second identifier to split it into.
///

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AxiomMemberId(pub String);

impl fmt::Display for AxiomMemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AxiomMemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AxiomMemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

///
/// IdSet
///
/// Canonical dense set of `ConceptId` values.
///
/// - Ordering is canonical (ascending) and does not reflect insertion order.
/// - Uniqueness enforced on insert via binary search — no separate hash
///   container is needed for identifier universes of this shape.
/// - Backed by a single sorted `Vec`, kept intentionally boxed-free: the
///   working set for a single invocation is bounded by `|A|` (§5), and a
///   flat sorted vector stays far denser than a boxed hash set at that
///   cardinality.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdSet(Vec<ConceptId>);

impl IdSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_ids<I: IntoIterator<Item = ConceptId>>(ids: I) -> Self {
        let mut set = Self::new();
        for id in ids {
            set.insert(id);
        }
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConceptId> {
        self.0.iter()
    }

    /// Insert a concept id, returning `true` if it was newly inserted.
    pub fn insert(&mut self, id: ConceptId) -> bool {
        match self.0.binary_search(&id) {
            Ok(_) => false,
            Err(index) => {
                self.0.insert(index, id);
                true
            }
        }
    }

    #[must_use]
    pub fn contains(&self, id: ConceptId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Identifiers present in `self` but absent from `other` — the
    /// workhorse of every "referenced ∉ active" check in this crate.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|id| !other.contains(*id))
                .collect(),
        )
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for id in &other.0 {
            out.insert(*id);
        }
        out
    }
}

impl FromIterator<ConceptId> for IdSet {
    fn from_iter<I: IntoIterator<Item = ConceptId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = &'a ConceptId;
    type IntoIter = std::slice::Iter<'a, ConceptId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

///
/// IdMap
///
/// Dense map keyed by `ConceptId`, storing small per-invocation value sets
/// (e.g. the relationship/axiom ids that reference a given concept). Same
/// sorted-`Vec` shape as `IdSet`, traded for simplicity over a hash map at
/// the cardinalities a single changed-only pass ever holds (§5: "|D| or |R|,
/// typically orders smaller" than the active-concept universe).
///

#[derive(Clone, Debug, Default)]
pub struct IdMap<V>(Vec<(ConceptId, V)>);

impl<V> IdMap<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.0.iter().map(|(k, _)| *k)
    }

    pub fn get(&self, key: ConceptId) -> Option<&V> {
        self.0
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|i| &self.0[i].1)
    }

    pub fn get_mut_or_insert_with(&mut self, key: ConceptId, default: impl FnOnce() -> V) -> &mut V {
        match self.0.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(index) => &mut self.0[index].1,
            Err(index) => {
                self.0.insert(index, (key, default()));
                &mut self.0[index].1
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, &V)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedups_and_stays_sorted() {
        let mut set = IdSet::new();
        assert!(set.insert(ConceptId(5)));
        assert!(set.insert(ConceptId(1)));
        assert!(!set.insert(ConceptId(5)));
        let ids: Vec<_> = set.iter().map(|i| i.0).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn difference_excludes_members_of_other() {
        let a = IdSet::from_ids([ConceptId(1), ConceptId(2), ConceptId(3)]);
        let b = IdSet::from_ids([ConceptId(2)]);
        let diff = a.difference(&b);
        assert_eq!(diff.len(), 2);
        assert!(diff.contains(ConceptId(1)));
        assert!(diff.contains(ConceptId(3)));
        assert!(!diff.contains(ConceptId(2)));
    }

    #[test]
    fn id_map_get_mut_or_insert_with_accumulates() {
        let mut map: IdMap<Vec<RelationshipId>> = IdMap::new();
        map.get_mut_or_insert_with(ConceptId(1), Vec::new)
            .push(RelationshipId(100));
        map.get_mut_or_insert_with(ConceptId(1), Vec::new)
            .push(RelationshipId(101));
        assert_eq!(map.get(ConceptId(1)).unwrap().len(), 2);
        assert!(map.get(ConceptId(2)).is_none());
    }
}
