//! Module: model
//! Responsibility: the graph component shapes the checker reasons about
//! (§3 DATA MODEL) — runtime-only descriptors, decoupled from whatever
//! on-disk/indexed representation a concrete `ComponentStore` uses.
//! Does not own: storage encoding, index layout, or RF2 field mapping.

use crate::ids::{AxiomMemberId, ConceptId, IdSet, RelationshipId};
use serde::{Deserialize, Serialize};

///
/// Concept
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Concept {
    pub id: ConceptId,
    pub active: bool,
    pub module_id: ConceptId,
    pub effective_time: i64,
    pub released: bool,
}

///
/// Characteristic
///
/// Relationship characteristic type (§3). `Additional` is carried for
/// completeness but, like `Inferred`, never participates in a stated-mode
/// check and is not itself checked here — only `Stated` and `Inferred` are
/// the two parallel views §4.4 alternates between.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Characteristic {
    Stated,
    Inferred,
    Additional,
}

///
/// Relationship
///
/// Invariant (§3): an active non-inferred relationship requires its source,
/// type, and (if non-concrete) destination to each be an active concept on
/// the same branch.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_id: ConceptId,
    pub type_id: ConceptId,
    pub destination_id: Option<ConceptId>,
    pub characteristic_type: Characteristic,
    pub concrete: bool,
    pub active: bool,
}

impl Relationship {
    /// `characteristic_type` matches the mode under check: excludes
    /// `Inferred` in stated mode, requires it otherwise (§4.4).
    #[must_use]
    pub fn matches_mode(&self, stated: bool) -> bool {
        if stated {
            self.characteristic_type != Characteristic::Inferred
        } else {
            self.characteristic_type == Characteristic::Inferred
        }
    }
}

///
/// ReferenceSetMember
///
/// An OWL axiom row: `referenced_component_id` is the subject concept,
/// `owl_expression` the class-expression string parsed by
/// [`crate::axiom::AxiomExpressionParser`]. Invariant (§3): an active OWL
/// axiom member's expression may only reference active concepts on the
/// same branch.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceSetMember {
    pub member_id: AxiomMemberId,
    pub referenced_component_id: ConceptId,
    pub refset_id: ConceptId,
    pub active: bool,
    pub owl_expression: String,
}

///
/// QueryConcept
///
/// Semantic-index entry: a precomputed projection of the transitive/
/// attribute closure, used purely as a coarse prefilter (§3, §9). Must be
/// treated as potentially stale — a hit here is a *candidate*, never a
/// conclusion.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryConcept {
    pub concept_id: ConceptId,
    pub stated: bool,
    /// Flattened attribute *values* (the destination side of the closure);
    /// the checker only needs to test membership in the active set, never
    /// which attribute type produced a value.
    pub attribute_values: IdSet,
}

///
/// ConceptMiniDescriptor
///
/// The report's per-axiom subject-concept descriptor (§3): the offending
/// referenced concept IDs, plus (after §4.9's description join) display
/// fields. Display fields start empty and are populated exactly once, by
/// `DescriptionService::join_active_descriptions`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConceptMiniDescriptor {
    pub concept_id: u64,
    pub offending_referenced_concepts: Vec<u64>,
    pub fsn: Option<String>,
    pub preferred_term: Option<String>,
}

impl ConceptMiniDescriptor {
    #[must_use]
    pub fn new(concept_id: ConceptId, offending: IdSet) -> Self {
        Self {
            concept_id: concept_id.0,
            offending_referenced_concepts: offending.iter().map(|id| id.0).collect(),
            fsn: None,
            preferred_term: None,
        }
    }
}

///
/// FixedIdentifiers
///
/// Server-side filter constants (§6): wired in at construction, never
/// hard-coded language constants, since these are data values specific to
/// a given edition's concept model.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedIdentifiers {
    pub inferred_characteristic_type_id: ConceptId,
    pub owl_axiom_refset_id: ConceptId,
    pub root_concept_id: ConceptId,
}

impl FixedIdentifiers {
    #[must_use]
    pub const fn new(
        inferred_characteristic_type_id: ConceptId,
        owl_axiom_refset_id: ConceptId,
        root_concept_id: ConceptId,
    ) -> Self {
        Self {
            inferred_characteristic_type_id,
            owl_axiom_refset_id,
            root_concept_id,
        }
    }
}
