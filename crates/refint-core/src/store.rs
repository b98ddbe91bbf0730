//! Module: store
//! Responsibility: the `ComponentStore` streaming-query surface the checker
//! consumes (§4.2, §6). The concrete search-index client is out of scope
//! (§1) — this module only specifies the interface the core depends on.
//! Does not own: index layout, paging internals, or server-side predicate
//! translation; a real adapter turns a `BranchCriteria` + entity query into
//! whatever the backing search engine needs.

use crate::{
    branch::BranchCriteria,
    error::RefIntError,
    ids::{AxiomMemberId, ConceptId, IdSet, RelationshipId},
    model::{Concept, QueryConcept, ReferenceSetMember, Relationship},
};

/// A lazily-evaluated, scoped result stream.
///
/// Rust's ownership model gives the "release on every exit path" guarantee
/// §4.2/§9 ask for without an explicit close call: `Drop` on the boxed
/// iterator runs whether the caller consumes it fully, breaks early, or the
/// stack unwinds through a `?`. A real adapter's iterator `Drop` impl
/// releases its cursor/connection there; the fake in `test_support` simply
/// drops a `Vec`'s storage.
pub type ComponentStream<'a, T> = Box<dyn Iterator<Item = Result<T, RefIntError>> + 'a>;

/// What the full/changed-only/semantic-probe passes need from a concept
/// scan. `AllActive` underlies step 1 of the full check (§4.4); `ByIds` is
/// the task-differential re-resolution step (§4.6 step 4).
#[derive(Clone, Debug)]
pub enum ConceptQuery {
    AllActive,
    ByIds(Vec<ConceptId>),
}

/// §4.4 step 2 and §4.5(a)/(b): relationships matching a mode, restricted
/// to those that are dangling against a caller-supplied active set, or
/// referencing a caller-supplied set of concept ids, or simply every
/// unpromoted relationship on the branch.
#[derive(Clone, Debug)]
pub enum RelationshipQuery {
    /// Active relationships in the given characteristic mode whose source,
    /// type, or (non-concrete) destination is missing from `active`.
    DanglingAgainstActive { stated: bool, active: IdSet },
    /// Active, mode-filtered relationships referencing any id in `targets`
    /// as source, type, or destination (§4.5(a), keyed on `D`).
    ReferencingAny { targets: IdSet },
    /// Every relationship created/modified on the branch and not yet
    /// promoted, any characteristic type (§4.5(b)).
    Unpromoted,
    /// Re-resolve specific relationships by id (§4.6 step 4).
    ByIds(Vec<RelationshipId>),
}

/// §4.4 step 3(b), §4.5, §4.6: active OWL-axiom reference-set members.
#[derive(Clone, Debug)]
pub enum AxiomQuery {
    /// Active axiom members whose `referenced_component_id` is in `subjects`
    /// — stage (b) of the two-stage axiom filter.
    ActiveWithSubjectIn { subjects: IdSet },
    /// Every axiom member created/modified on the branch and not yet
    /// promoted (§4.5(b)).
    Unpromoted,
    /// Re-resolve specific axiom members by id (§4.6 step 4).
    ByIds(Vec<AxiomMemberId>),
}

/// §4.4 step 3(a), §4.8: `QueryConcept` rows used as a coarse prefilter.
#[derive(Clone, Debug)]
pub enum QueryConceptQuery {
    /// Rows in the given slice (`stated` true/false) whose attribute
    /// values intersect the complement of `active` — the broad form used
    /// by the full check (§4.4 step 3a).
    WithAttributeNotIn { stated: bool, active: IdSet },
    /// Rows in the given slice whose attribute values intersect `targets`
    /// directly — the targeted form used by the changed-only check's pass
    /// (a), keyed on the small per-branch set `D` rather than scanning
    /// against the whole active universe (§4.5(a), §9).
    WithAttributeIn { stated: bool, targets: IdSet },
    /// Every row whose `concept_id` is not in `active`, both slices
    /// (semantic probe, §4.8).
    OrphansAgainst { active: IdSet },
}

///
/// ComponentStore
///
/// Streaming reader over Concept, Relationship, QueryConcept, and
/// ReferenceSetMember. Every method pages internally (`LARGE_PAGE`, §4.2)
/// and must be safe to call concurrently from multiple invocations against
/// different branches (§5).
///

pub trait ComponentStore {
    fn stream_concepts<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: ConceptQuery,
    ) -> Result<ComponentStream<'a, Concept>, RefIntError>;

    fn stream_relationships<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: RelationshipQuery,
    ) -> Result<ComponentStream<'a, Relationship>, RefIntError>;

    fn stream_query_concepts<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: QueryConceptQuery,
    ) -> Result<ComponentStream<'a, QueryConcept>, RefIntError>;

    fn stream_reference_set_members<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: AxiomQuery,
    ) -> Result<ComponentStream<'a, ReferenceSetMember>, RefIntError>;
}
