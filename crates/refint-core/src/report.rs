//! Module: report
//! Responsibility: `IntegrityReport` — the four keyed maps every check
//! assembles into (§3, §6 "Report JSON shape").
//! Does not own: serialization framing beyond `serde::Serialize` itself —
//! the REST layer that turns this into the documented JSON shape is out of
//! scope (§1).

use crate::{
    ids::{AxiomMemberId, ConceptId, RelationshipId},
    model::ConceptMiniDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// IntegrityReport
///
/// Invariant: every key in a relationship map names a currently active,
/// non-inferred relationship on the checked branch (inferred-mode runs
/// substitute "non-inferred" with "inferred"); every axiom key names a
/// currently active OWL axiom member. All four maps are omitted from the
/// serialized form when empty, so "absent" and "empty" are indistinguishable
/// to a client (§7) — callers should use [`IntegrityReport::is_empty`]
/// rather than inspecting individual maps for "no issues".
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub axioms_with_missing_or_inactive_referenced_concept: BTreeMap<String, ConceptMiniDescriptor>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub relationships_with_missing_or_inactive_source: BTreeMap<u64, u64>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub relationships_with_missing_or_inactive_type: BTreeMap<u64, u64>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub relationships_with_missing_or_inactive_destination: BTreeMap<u64, u64>,
}

impl IntegrityReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axioms_with_missing_or_inactive_referenced_concept.is_empty()
            && self.relationships_with_missing_or_inactive_source.is_empty()
            && self.relationships_with_missing_or_inactive_type.is_empty()
            && self
                .relationships_with_missing_or_inactive_destination
                .is_empty()
    }

    pub fn record_bad_source(&mut self, relationship_id: RelationshipId, offending: ConceptId) {
        self.relationships_with_missing_or_inactive_source
            .insert(relationship_id.0, offending.0);
    }

    pub fn record_bad_type(&mut self, relationship_id: RelationshipId, offending: ConceptId) {
        self.relationships_with_missing_or_inactive_type
            .insert(relationship_id.0, offending.0);
    }

    pub fn record_bad_destination(&mut self, relationship_id: RelationshipId, offending: ConceptId) {
        self.relationships_with_missing_or_inactive_destination
            .insert(relationship_id.0, offending.0);
    }

    pub fn record_axiom(&mut self, member_id: AxiomMemberId, descriptor: ConceptMiniDescriptor) {
        self.axioms_with_missing_or_inactive_referenced_concept
            .insert(member_id.0, descriptor);
    }

    /// Every relationship id referenced in any of the three relationship
    /// maps — used by the task-differential check (§4.6 step 2) to key a
    /// baseline bad set.
    #[must_use]
    pub fn all_relationship_ids(&self) -> Vec<RelationshipId> {
        let mut ids: Vec<u64> = self
            .relationships_with_missing_or_inactive_source
            .keys()
            .chain(self.relationships_with_missing_or_inactive_type.keys())
            .chain(self.relationships_with_missing_or_inactive_destination.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(RelationshipId).collect()
    }

    #[must_use]
    pub fn all_axiom_ids(&self) -> Vec<AxiomMemberId> {
        self.axioms_with_missing_or_inactive_referenced_concept
            .keys()
            .cloned()
            .map(AxiomMemberId)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_keys_anywhere() {
        let report = IntegrityReport::new();
        assert!(report.is_empty());
        assert!(report.all_relationship_ids().is_empty());
        assert!(report.all_axiom_ids().is_empty());
    }

    #[test]
    fn all_relationship_ids_unions_across_maps() {
        let mut report = IntegrityReport::new();
        report.record_bad_destination(RelationshipId(1), ConceptId(100));
        report.record_bad_source(RelationshipId(2), ConceptId(200));
        assert_eq!(report.all_relationship_ids().len(), 2);
    }

    #[test]
    fn serialization_omits_empty_maps() {
        let mut report = IntegrityReport::new();
        report.record_bad_destination(RelationshipId(5), ConceptId(9999));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("axioms_with_missing_or_inactive_referenced_concept").is_none());
        assert!(json
            .get("relationships_with_missing_or_inactive_destination")
            .is_some());
    }
}
