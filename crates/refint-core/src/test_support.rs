//! Module: test_support
//! Responsibility: an in-memory fake of `ComponentStore` + `BranchService`,
//! plus the §8 end-to-end scenario fixtures (S1–S6). Test-only; mirrors the
//! teacher crate's own `test_fixtures`/`test_support` split.
//! Does not own: anything resembling production storage semantics beyond
//! what the scenarios in this crate's tests actually exercise.

use crate::{
    branch::{Branch, BranchCriteria, BranchPath, BranchService, DefaultBranchCriteriaProvider, ROOT_BRANCH},
    checker::IntegrityChecker,
    description::NoopDescriptionService,
    error::RefIntError,
    ids::{AxiomMemberId, ConceptId, IdSet, RelationshipId},
    model::{Characteristic, Concept, FixedIdentifiers, QueryConcept, ReferenceSetMember, Relationship},
    store::{AxiomQuery, ComponentStore, ComponentStream, ConceptQuery, QueryConceptQuery, RelationshipQuery},
};
use std::{cell::RefCell, collections::HashMap};

const ISA: u64 = 116_680_003;
const INFERRED_CHARACTERISTIC_TYPE: u64 = 900_000_000_000_011_006;
const OWL_AXIOM_REFSET: u64 = 733_073_007;
const ROOT_CONCEPT: u64 = 138_875_005;

#[derive(Clone, Debug)]
struct Rec<T> {
    origin: BranchPath,
    deleted: bool,
    value: T,
}

///
/// FakeComponentStore
///

#[derive(Default)]
pub struct FakeComponentStore {
    concepts: Vec<Rec<Concept>>,
    relationships: Vec<Rec<Relationship>>,
    axioms: Vec<Rec<ReferenceSetMember>>,
    query_concepts: Vec<QueryConcept>,
}

impl FakeComponentStore {
    fn push_concept(&mut self, origin: &str, concept: Concept) {
        self.concepts.push(Rec {
            origin: BranchPath::new(origin),
            deleted: false,
            value: concept,
        });
    }

    fn delete_concept(&mut self, origin: &str, id: ConceptId) {
        self.concepts.push(Rec {
            origin: BranchPath::new(origin),
            deleted: true,
            value: Concept {
                id,
                active: false,
                module_id: ConceptId(0),
                effective_time: 0,
                released: false,
            },
        });
    }

    fn push_relationship(&mut self, origin: &str, relationship: Relationship) {
        self.relationships.push(Rec {
            origin: BranchPath::new(origin),
            deleted: false,
            value: relationship,
        });
    }

    fn push_axiom(&mut self, origin: &str, axiom: ReferenceSetMember) {
        self.axioms.push(Rec {
            origin: BranchPath::new(origin),
            deleted: false,
            value: axiom,
        });
    }

    fn resolve_branch<'a, T: Clone>(
        records: &'a [Rec<T>],
        chain: &[BranchPath],
        id_of: impl Fn(&T) -> u64,
    ) -> Vec<T> {
        let mut by_id: HashMap<u64, &Rec<T>> = HashMap::new();
        // chain is most-specific first; only the first (most specific) hit
        // per id wins, simulating a branch-local version shadowing its
        // ancestor's.
        for branch in chain {
            for rec in records.iter().filter(|r| &r.origin == branch) {
                by_id.entry(id_of(&rec.value)).or_insert(rec);
            }
        }
        by_id
            .into_values()
            .filter(|rec| !rec.deleted)
            .map(|rec| rec.value.clone())
            .collect()
    }

    fn own_branch<'a, T: Clone>(
        records: &'a [Rec<T>],
        branch: &BranchPath,
        include_deletions: bool,
    ) -> Vec<T> {
        records
            .iter()
            .filter(|r| &r.origin == branch && (include_deletions || !r.deleted))
            .map(|r| r.value.clone())
            .collect()
    }

    fn branch_path_of(criteria: &BranchCriteria) -> BranchPath {
        match criteria {
            BranchCriteria::Visible { branch, .. } | BranchCriteria::UnpromotedChanges { branch } => {
                branch.clone()
            }
            BranchCriteria::UnpromotedChangesAndDeletions { branch } => branch.clone(),
            BranchCriteria::VisibleIncludingOpenCommit { commit, .. } => commit.branch_path.clone(),
            BranchCriteria::And(a, _) | BranchCriteria::Or(a, _) => Self::branch_path_of(a),
        }
    }

    fn chain_for(criteria: &BranchCriteria) -> Vec<BranchPath> {
        let mut chain = vec![Self::branch_path_of(criteria)];
        while let Some(parent) = chain.last().unwrap().parent() {
            chain.push(parent);
        }
        chain
    }

    fn is_unpromoted_only(criteria: &BranchCriteria) -> Option<(BranchPath, bool)> {
        match criteria {
            BranchCriteria::UnpromotedChanges { branch } => Some((branch.clone(), false)),
            BranchCriteria::UnpromotedChangesAndDeletions { branch } => Some((branch.clone(), true)),
            _ => None,
        }
    }
}

impl ComponentStore for FakeComponentStore {
    fn stream_concepts<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: ConceptQuery,
    ) -> Result<ComponentStream<'a, Concept>, RefIntError> {
        let values: Vec<Concept> = if let Some((branch, include_deletions)) = Self::is_unpromoted_only(criteria) {
            Self::own_branch(&self.concepts, &branch, include_deletions)
        } else {
            let chain = Self::chain_for(criteria);
            Self::resolve_branch(&self.concepts, &chain, |c| c.id.0)
        };

        let filtered = match query {
            ConceptQuery::AllActive => values,
            ConceptQuery::ByIds(ids) => values
                .into_iter()
                .filter(|c| ids.contains(&c.id))
                .collect(),
        };

        Ok(Box::new(filtered.into_iter().map(Ok)))
    }

    fn stream_relationships<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: RelationshipQuery,
    ) -> Result<ComponentStream<'a, Relationship>, RefIntError> {
        let base: Vec<Relationship> = if let Some((branch, include_deletions)) = Self::is_unpromoted_only(criteria) {
            Self::own_branch(&self.relationships, &branch, include_deletions)
        } else {
            let chain = Self::chain_for(criteria);
            Self::resolve_branch(&self.relationships, &chain, |r| r.id.0)
        };

        let filtered: Vec<Relationship> = match query {
            RelationshipQuery::DanglingAgainstActive { stated, active } => base
                .into_iter()
                .filter(|r| r.active && r.matches_mode(stated))
                .filter(|r| is_dangling(r, &active))
                .collect(),
            RelationshipQuery::ReferencingAny { targets } => base
                .into_iter()
                .filter(|r| r.active && r.characteristic_type != Characteristic::Inferred)
                .filter(|r| references_any(r, &targets))
                .collect(),
            RelationshipQuery::Unpromoted => base,
            RelationshipQuery::ByIds(ids) => base.into_iter().filter(|r| ids.contains(&r.id)).collect(),
        };

        Ok(Box::new(filtered.into_iter().map(Ok)))
    }

    fn stream_query_concepts<'a>(
        &'a self,
        _criteria: &BranchCriteria,
        query: QueryConceptQuery,
    ) -> Result<ComponentStream<'a, QueryConcept>, RefIntError> {
        let filtered: Vec<QueryConcept> = match query {
            QueryConceptQuery::WithAttributeNotIn { stated, active } => self
                .query_concepts
                .iter()
                .filter(|q| q.stated == stated)
                .filter(|q| q.attribute_values.iter().any(|a| !active.contains(*a)))
                .cloned()
                .collect(),
            QueryConceptQuery::WithAttributeIn { stated, targets } => self
                .query_concepts
                .iter()
                .filter(|q| q.stated == stated)
                .filter(|q| q.attribute_values.iter().any(|a| targets.contains(*a)))
                .cloned()
                .collect(),
            QueryConceptQuery::OrphansAgainst { active } => self
                .query_concepts
                .iter()
                .filter(|q| !active.contains(q.concept_id))
                .cloned()
                .collect(),
        };

        Ok(Box::new(filtered.into_iter().map(Ok)))
    }

    fn stream_reference_set_members<'a>(
        &'a self,
        criteria: &BranchCriteria,
        query: AxiomQuery,
    ) -> Result<ComponentStream<'a, ReferenceSetMember>, RefIntError> {
        let base: Vec<ReferenceSetMember> = if let Some((branch, include_deletions)) = Self::is_unpromoted_only(criteria) {
            Self::own_branch(&self.axioms, &branch, include_deletions)
        } else {
            let chain = Self::chain_for(criteria);
            Self::resolve_branch(&self.axioms, &chain, |a| {
                // member ids are strings; hash to a stable u64 key for the
                // generic resolver, which only needs per-id uniqueness.
                a.member_id.0.bytes().fold(0u64, |acc, b| acc.wrapping_mul(131).wrapping_add(u64::from(b)))
            })
        };

        let filtered: Vec<ReferenceSetMember> = match query {
            AxiomQuery::ActiveWithSubjectIn { subjects } => base
                .into_iter()
                .filter(|a| a.active && a.refset_id == ConceptId(OWL_AXIOM_REFSET))
                .filter(|a| subjects.contains(a.referenced_component_id))
                .collect(),
            AxiomQuery::Unpromoted => base,
            AxiomQuery::ByIds(ids) => base.into_iter().filter(|a| ids.contains(&a.member_id)).collect(),
        };

        Ok(Box::new(filtered.into_iter().map(Ok)))
    }
}

fn is_dangling(r: &Relationship, active: &IdSet) -> bool {
    if !active.contains(r.source_id) || !active.contains(r.type_id) {
        return true;
    }
    if !r.concrete {
        if let Some(dest) = r.destination_id {
            if !active.contains(dest) {
                return true;
            }
        }
    }
    false
}

fn references_any(r: &Relationship, targets: &IdSet) -> bool {
    if targets.contains(r.source_id) || targets.contains(r.type_id) {
        return true;
    }
    if !r.concrete {
        if let Some(dest) = r.destination_id {
            if targets.contains(dest) {
                return true;
            }
        }
    }
    false
}

///
/// FakeBranchService
///

#[derive(Clone, Default)]
pub struct FakeBranchService {
    branches: std::rc::Rc<RefCell<HashMap<String, Branch>>>,
}

impl FakeBranchService {
    pub fn upsert(&self, branch: Branch) {
        self.branches
            .borrow_mut()
            .insert(branch.path.as_str().to_string(), branch);
    }
}

impl BranchService for FakeBranchService {
    fn find_branch_or_throw(&self, path: &BranchPath) -> Result<Branch, RefIntError> {
        self.branches
            .borrow()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| {
                RefIntError::upstream_store(
                    crate::error::ErrorOrigin::ComponentStore,
                    format!("branch not found: {path}"),
                )
            })
    }

    fn update_metadata(&self, branch: &Branch) -> Result<(), RefIntError> {
        self.upsert(branch.clone());
        Ok(())
    }
}

///
/// FakeFixtures
///
/// Builds the §8 scenario fixtures (S1–S6) plus the semantic-probe and
/// commit-hook fixtures used across this crate's test modules.
///

pub struct FakeFixtures {
    pub store: FakeComponentStore,
    pub criteria_provider: DefaultBranchCriteriaProvider,
    pub descriptions: NoopDescriptionService,
    pub branch_service: FakeBranchService,
    pub main: Branch,
    pub project_a: Branch,
    pub task_b: Branch,
}

impl FakeFixtures {
    fn base(main_head: i64) -> Self {
        let main = Branch::new(BranchPath::new(ROOT_BRANCH), 0, main_head);
        let project_a = Branch::new(BranchPath::new("MAIN/projectA"), main_head, main_head);
        let task_b = Branch::new(BranchPath::new("MAIN/projectA/taskB"), main_head, main_head);

        let branch_service = FakeBranchService::default();
        branch_service.upsert(main.clone());
        branch_service.upsert(project_a.clone());
        branch_service.upsert(task_b.clone());

        Self {
            store: FakeComponentStore::default(),
            criteria_provider: DefaultBranchCriteriaProvider,
            descriptions: NoopDescriptionService,
            branch_service,
            main,
            project_a,
            task_b,
        }
    }

    pub fn fixed_identifiers(&self) -> FixedIdentifiers {
        FixedIdentifiers::new(
            ConceptId(INFERRED_CHARACTERISTIC_TYPE),
            ConceptId(OWL_AXIOM_REFSET),
            ConceptId(ROOT_CONCEPT),
        )
    }

    pub fn checker(&self) -> IntegrityChecker<'_, FakeComponentStore, DefaultBranchCriteriaProvider, NoopDescriptionService> {
        IntegrityChecker::new(
            &self.store,
            &self.criteria_provider,
            &self.descriptions,
            self.fixed_identifiers(),
        )
    }

    fn active_concept(id: u64) -> Concept {
        Concept {
            id: ConceptId(id),
            active: true,
            module_id: ConceptId(900_000_000),
            effective_time: 20_240_101,
            released: true,
        }
    }

    fn stated_relationship(id: u64, source: u64, type_: u64, destination: u64) -> Relationship {
        Relationship {
            id: RelationshipId(id),
            source_id: ConceptId(source),
            type_id: ConceptId(type_),
            destination_id: Some(ConceptId(destination)),
            characteristic_type: Characteristic::Stated,
            concrete: false,
            active: true,
        }
    }

    /// S1: `MAIN/projectA` starts clean; `C1` is inactivated there. Pre-
    /// existing active relationship `R1: C2 -ISA-> C1` becomes dangling.
    pub fn s1_inactivate_c1() -> Self {
        let mut f = Self::base(1_000);

        for id in [2_u64, 3] {
            f.store.push_concept(ROOT_BRANCH, Self::active_concept(id));
        }
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));
        f.store
            .push_concept(ROOT_BRANCH, Self::active_concept(1)); // C1, active on MAIN

        f.store
            .push_relationship(ROOT_BRANCH, Self::stated_relationship(1, 2, ISA, 1));

        // C1 inactivated on projectA.
        f.store.push_concept(
            "MAIN/projectA",
            Concept {
                id: ConceptId(1),
                active: false,
                module_id: ConceptId(900_000_000),
                effective_time: 20_240_102,
                released: false,
            },
        );

        f
    }

    /// S2: on `MAIN/projectA`, add `R2: C3 -ISA-> C9999` where `C9999`
    /// never existed.
    pub fn s2_new_relationship_to_missing_concept() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(3));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));

        f.store.push_relationship(
            "MAIN/projectA",
            Self::stated_relationship(2, 3, ISA, 9999),
        );

        f
    }

    /// S3: `C4` inactivated; active OWL axiom `A1` on subject `C5`
    /// references `{C4, C6}`, `C6` active.
    pub fn s3_axiom_referencing_inactive_concept() -> Self {
        let mut f = Self::base(1_000);

        for id in [5_u64, 6] {
            f.store.push_concept(ROOT_BRANCH, Self::active_concept(id));
        }
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(4));

        f.store.push_concept(
            "MAIN/projectA",
            Concept {
                id: ConceptId(4),
                active: false,
                module_id: ConceptId(900_000_000),
                effective_time: 20_240_102,
                released: false,
            },
        );

        f.store.push_axiom(
            "MAIN/projectA",
            ReferenceSetMember {
                member_id: AxiomMemberId::from("A1"),
                referenced_component_id: ConceptId(5),
                refset_id: ConceptId(OWL_AXIOM_REFSET),
                active: true,
                owl_expression: "SubClassOf(:5 ObjectIntersectionOf(:4 :6))".to_string(),
            },
        );

        f.store.push_query_concept_for_subject(5, true, [4, 6]);

        f
    }

    /// S4: `MAIN/projectA/taskB` fixes R1 from S1 by inactivating it.
    pub fn s4_task_fixes_r1() -> Self {
        let mut f = Self::s1_inactivate_c1();
        f.store.push_relationship(
            "MAIN/projectA/taskB",
            Relationship {
                active: false,
                ..Self::stated_relationship(1, 2, ISA, 1)
            },
        );
        // taskB must be rebased past projectA's head for the topology check.
        f.task_b.base_timestamp = f.project_a.head_timestamp;
        f
    }

    /// S5: full stated-mode check on MAIN never flags a concrete
    /// relationship with a literal destination.
    pub fn s5_concrete_relationship() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(7));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));
        f.store.push_relationship(
            ROOT_BRANCH,
            Relationship {
                id: RelationshipId(3),
                source_id: ConceptId(7),
                type_id: ConceptId(ISA),
                destination_id: None,
                characteristic_type: Characteristic::Stated,
                concrete: true,
                active: true,
            },
        );
        f
    }

    /// S6: an inferred relationship with an inactive source is reported in
    /// inferred mode but not in stated mode, and vice versa for its stated
    /// counterpart.
    pub fn s6_inferred_vs_stated() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(8));
        // source 404 never exists -> inactive/missing either way.
        f.store.push_relationship(
            ROOT_BRANCH,
            Relationship {
                id: RelationshipId(50),
                source_id: ConceptId(404),
                type_id: ConceptId(ISA),
                destination_id: Some(ConceptId(8)),
                characteristic_type: Characteristic::Inferred,
                concrete: false,
                active: true,
            },
        );
        f.store.push_relationship(
            ROOT_BRANCH,
            Relationship {
                id: RelationshipId(51),
                source_id: ConceptId(8),
                type_id: ConceptId(ISA),
                destination_id: Some(ConceptId(8)),
                characteristic_type: Characteristic::Stated,
                concrete: false,
                active: true,
            },
        );
        f
    }

    /// S7: `MAIN/projectA` adds an unpromoted *inferred* relationship
    /// pointing at a concept that never existed. The changed-only check is
    /// implicitly stated-mode and must not flag it.
    pub fn s7_unpromoted_inferred_relationship_not_flagged() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(10));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));
        f.store.push_relationship(
            "MAIN/projectA",
            Relationship {
                id: RelationshipId(7),
                source_id: ConceptId(10),
                type_id: ConceptId(ISA),
                destination_id: Some(ConceptId(11)), // 11 never existed
                characteristic_type: Characteristic::Inferred,
                concrete: false,
                active: true,
            },
        );
        f
    }

    /// S8: a grandchild task topology (`project/subProject/task`), used to
    /// test that the intermediate project's rebase state is verified
    /// alongside the task's own (§4.6 step 1, §7). Returns the fixture plus
    /// the intermediate project and task branches.
    pub fn s8_grandchild_topology(project_rebased_past_extension_main: bool) -> (Self, Branch, Branch) {
        let f = Self::base(1_000);
        let extension_main_head = f.project_a.head_timestamp;

        let sub_project_base = if project_rebased_past_extension_main {
            extension_main_head
        } else {
            0
        };
        let sub_project = Branch::new(
            BranchPath::new("MAIN/projectA/subProjectB"),
            sub_project_base,
            extension_main_head,
        );
        let task_c = Branch::new(
            BranchPath::new("MAIN/projectA/subProjectB/taskC"),
            sub_project.head_timestamp,
            sub_project.head_timestamp,
        );

        f.branch_service.upsert(sub_project.clone());
        f.branch_service.upsert(task_c.clone());

        (f, sub_project, task_c)
    }

    /// S9: `MAIN/projectA` adds two unpromoted relationships that both
    /// source from the same never-existed concept `C12`. The changed-only
    /// check must flag both relationship ids against the single shared
    /// offending concept.
    pub fn s9_two_relationships_share_missing_source() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(ISA));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(13));
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(14));

        f.store.push_relationship(
            "MAIN/projectA",
            Self::stated_relationship(20, 12, ISA, 13),
        );
        f.store.push_relationship(
            "MAIN/projectA",
            Self::stated_relationship(21, 12, ISA, 14),
        );

        f
    }

    pub fn semantic_probe_orphans() -> Self {
        let mut f = Self::base(1_000);
        f.store.push_concept(ROOT_BRANCH, Self::active_concept(1));
        f.store.query_concepts.push(QueryConcept {
            concept_id: ConceptId(1),
            stated: true,
            attribute_values: IdSet::new(),
        });
        f.store.query_concepts.push(QueryConcept {
            concept_id: ConceptId(9999),
            stated: true,
            attribute_values: IdSet::new(),
        });
        f.store.query_concepts.push(QueryConcept {
            concept_id: ConceptId(8888),
            stated: false,
            attribute_values: IdSet::new(),
        });
        f
    }

    /// Deactivate the relationship with the given id wherever it lives, so
    /// a subsequent changed-only run on `project_a` comes back clean.
    pub fn deactivate_relationship(&mut self, id: u64) {
        for rec in &mut self.store.relationships {
            if rec.value.id.0 == id {
                rec.value.active = false;
            }
        }
    }
}

impl FakeComponentStore {
    fn push_query_concept_for_subject(&mut self, concept_id: u64, stated: bool, attributes: impl IntoIterator<Item = u64>) {
        self.query_concepts.push(QueryConcept {
            concept_id: ConceptId(concept_id),
            stated,
            attribute_values: IdSet::from_ids(attributes.into_iter().map(ConceptId)),
        });
    }
}
