//! Module: semantic_probe
//! Responsibility: `findExtraConceptsInSemanticIndex` — detects orphan
//! semantic-index entries referencing concepts that are not active (§4.8).
//! Does not own: repairing or rebuilding the semantic index; purely
//! diagnostic, never mutates.

use crate::{
    branch::{Branch, BranchCriteriaProvider},
    error::RefIntError,
    ids::ConceptId,
    store::{ComponentStore, ConceptQuery, QueryConceptQuery},
};
use tracing::instrument;

///
/// SemanticIndexOrphans
///
/// Partitioned result of [`SemanticProbe::find_extra_concepts_in_semantic_index`]:
/// concept ids present in the stated slice and/or the inferred slice of the
/// semantic index but absent from the active-concept set.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SemanticIndexOrphans {
    pub stated: Vec<ConceptId>,
    pub inferred: Vec<ConceptId>,
}

impl SemanticIndexOrphans {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stated.is_empty() && self.inferred.is_empty()
    }
}

///
/// SemanticProbe
///

pub struct SemanticProbe<'a, S, P> {
    store: &'a S,
    criteria: &'a P,
}

impl<'a, S, P> SemanticProbe<'a, S, P>
where
    S: ComponentStore,
    P: BranchCriteriaProvider,
{
    #[must_use]
    pub const fn new(store: &'a S, criteria: &'a P) -> Self {
        Self { store, criteria }
    }

    #[instrument(skip(self, branch), fields(branch = %branch.path))]
    pub fn find_extra_concepts_in_semantic_index(
        &self,
        branch: &Branch,
    ) -> Result<SemanticIndexOrphans, RefIntError> {
        let visible = self.criteria.visible(branch);

        let mut active = crate::ids::IdSet::new();
        for concept in self.store.stream_concepts(&visible, ConceptQuery::AllActive)? {
            active.insert(concept?.id);
        }

        let mut orphans = SemanticIndexOrphans::default();
        for row in self
            .store
            .stream_query_concepts(&visible, QueryConceptQuery::OrphansAgainst { active })?
        {
            let row = row?;
            if row.stated {
                orphans.stated.push(row.concept_id);
            } else {
                orphans.inferred.push(row.concept_id);
            }
        }

        Ok(orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn finds_orphans_in_both_slices() {
        let fixtures = FakeFixtures::semantic_probe_orphans();
        let probe = SemanticProbe::new(&fixtures.store, &fixtures.criteria_provider);
        let orphans = probe.find_extra_concepts_in_semantic_index(&fixtures.main).unwrap();
        assert!(!orphans.stated.is_empty());
        assert!(!orphans.inferred.is_empty());
    }
}
