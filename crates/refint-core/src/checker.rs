//! Module: checker
//! Responsibility: the three integrity-check algorithms — full (§4.4),
//! changed-only (§4.5), and task+extension differential (§4.6).
//! Does not own: repairing violations, or validating inferred relationships
//! except on explicit request (§1 Non-goals).

use crate::{
    axiom::AxiomExpressionParser,
    branch::{Branch, BranchCriteriaProvider, BranchService},
    description::DescriptionService,
    error::{ErrorOrigin, RefIntError},
    ids::{ConceptId, IdMap, IdSet, RelationshipId},
    model::{Characteristic, ConceptMiniDescriptor, FixedIdentifiers, ReferenceSetMember, Relationship},
    report::IntegrityReport,
    store::{AxiomQuery, ComponentStore, ConceptQuery, QueryConceptQuery, RelationshipQuery},
};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

///
/// IntegrityChecker
///
/// Holds its collaborators by borrowed reference, never by ownership (§9
/// "No cyclic ownership") — a single invocation's transient id sets are the
/// only thing it owns.
///

pub struct IntegrityChecker<'a, S, P, D> {
    store: &'a S,
    criteria: &'a P,
    descriptions: &'a D,
    fixed: FixedIdentifiers,
}

impl<'a, S, P, D> IntegrityChecker<'a, S, P, D>
where
    S: ComponentStore,
    P: BranchCriteriaProvider,
    D: DescriptionService,
{
    #[must_use]
    pub const fn new(store: &'a S, criteria: &'a P, descriptions: &'a D, fixed: FixedIdentifiers) -> Self {
        Self {
            store,
            criteria,
            descriptions,
            fixed,
        }
    }

    #[must_use]
    pub const fn criteria_provider(&self) -> &'a P {
        self.criteria
    }

    /// §4.4 `findAllComponentsWithBadIntegrity(branch, stated)`.
    #[instrument(skip(self, branch), fields(branch = %branch.path, stated))]
    pub fn find_all_components_with_bad_integrity(
        &self,
        branch: &Branch,
        stated: bool,
    ) -> Result<IntegrityReport, RefIntError> {
        let visible = self.criteria.visible(branch);

        let active = self.active_concept_set(&visible)?;
        debug!(active_count = active.len(), "resolved active concept set");

        let mut report = IntegrityReport::new();

        self.check_relationships(
            &mut report,
            RelationshipQuery::DanglingAgainstActive {
                stated,
                active: active.clone(),
            },
            &visible,
            &active,
        )?;

        self.check_axioms_via_prefilter(
            &mut report,
            QueryConceptQuery::WithAttributeNotIn {
                stated,
                active: active.clone(),
            },
            &visible,
            &active,
        )?;

        self.join_descriptions(branch, &mut report)?;
        Ok(report)
    }

    /// §4.5 `findChangedComponentsWithBadIntegrity(branch)`. Rejects the
    /// root branch — the full check must be used there.
    #[instrument(skip(self, branch), fields(branch = %branch.path))]
    pub fn find_changed_components_with_bad_integrity(
        &self,
        branch: &Branch,
    ) -> Result<IntegrityReport, RefIntError> {
        let visible = self.criteria.visible(branch);
        self.changed_only_against(branch, visible)
    }

    /// Same algorithm as [`Self::find_changed_components_with_bad_integrity`]
    /// but evaluated against a caller-supplied visibility criteria. Used by
    /// `CommitHook`, which must substitute `visible_including_open_commit`
    /// for the plain `visible` criteria so the in-flight commit's own
    /// writes are part of the snapshot (§4.7, §9).
    pub fn changed_only_against(
        &self,
        branch: &Branch,
        visible: crate::branch::BranchCriteria,
    ) -> Result<IntegrityReport, RefIntError> {
        if branch.path.is_root() {
            return Err(RefIntError::misuse(
                ErrorOrigin::Checker,
                "changed-only check cannot run on the root branch; use the full check",
            ));
        }

        let active = self.active_concept_set(&visible)?;

        let mut report = IntegrityReport::new();
        self.changed_only_pass_a(&mut report, branch, &visible, &active)?;
        self.changed_only_pass_b(&mut report, branch, &active)?;

        self.join_descriptions(branch, &mut report)?;
        Ok(report)
    }

    /// §4.6 `findChangedComponentsWithBadIntegrity(taskBranch, extensionMainPath)`.
    ///
    /// `task` is mutated in place when the resulting report is empty
    /// (`internal.integrityIssue` set to the literal string `"false"`, per
    /// step 5) and persisted through `branch_service`.
    #[instrument(skip(self, task, extension_main, branch_service), fields(task = %task.path, extension_main = %extension_main.path))]
    pub fn find_changed_components_with_bad_integrity_for_task<B: BranchService>(
        &self,
        task: &mut Branch,
        extension_main: &Branch,
        branch_service: &B,
    ) -> Result<IntegrityReport, RefIntError> {
        self.verify_task_topology(task, extension_main, branch_service)?;

        let baseline = self.find_changed_components_with_bad_integrity(extension_main)?;

        if baseline.is_empty() {
            debug!("baseline on extension main is clean; falling through to plain changed-only check");
            return self.find_changed_components_with_bad_integrity(task);
        }

        let report = self.reresolve_on_task(task, &baseline)?;

        if report.is_empty() {
            task.internal.set_integrity_issue(false);
            branch_service.update_metadata(task)?;
        }

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Full check internals
    // ------------------------------------------------------------------

    fn active_concept_set(
        &self,
        criteria: &crate::branch::BranchCriteria,
    ) -> Result<IdSet, RefIntError> {
        let started = std::time::Instant::now();
        let stream = self.store.stream_concepts(criteria, ConceptQuery::AllActive)?;
        let mut set = IdSet::new();
        for concept in stream {
            let concept = concept?;
            if concept.active {
                set.insert(concept.id);
            }
        }
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "active concept scan checkpoint");
        Ok(set)
    }

    fn check_relationships(
        &self,
        report: &mut IntegrityReport,
        query: RelationshipQuery,
        criteria: &crate::branch::BranchCriteria,
        active: &IdSet,
    ) -> Result<(), RefIntError> {
        let stream = self.store.stream_relationships(criteria, query)?;
        for relationship in stream {
            let relationship = relationship?;
            record_relationship_if_dangling(report, &relationship, active);
        }
        Ok(())
    }

    fn check_axioms_via_prefilter(
        &self,
        report: &mut IntegrityReport,
        prefilter: QueryConceptQuery,
        criteria: &crate::branch::BranchCriteria,
        active: &IdSet,
    ) -> Result<(), RefIntError> {
        // Stage (a): collect candidate subject concepts from the semantic
        // index prefilter. Scanning every axiom directly is infeasible
        // (§9) — this two-stage layering must survive even when axiom
        // counts look small in tests.
        let mut candidates = IdSet::new();
        for row in self.store.stream_query_concepts(criteria, prefilter)? {
            let row = row?;
            candidates.insert(row.concept_id);
        }
        debug!(candidate_count = candidates.len(), "axiom prefilter candidates");

        if candidates.is_empty() {
            return Ok(());
        }

        // Stage (b): parse only the axioms whose subject survived stage (a).
        let axiom_query = AxiomQuery::ActiveWithSubjectIn {
            subjects: candidates,
        };
        for member in self.store.stream_reference_set_members(criteria, axiom_query)? {
            let member = member?;
            self.check_one_axiom(report, &member, active)?;
        }
        Ok(())
    }

    fn check_one_axiom(
        &self,
        report: &mut IntegrityReport,
        member: &ReferenceSetMember,
        active: &IdSet,
    ) -> Result<(), RefIntError> {
        if !member.active || member.refset_id != self.fixed.owl_axiom_refset_id {
            return Ok(());
        }

        let referenced = AxiomExpressionParser::referenced_concepts(&member.owl_expression)
            .map_err(|message| RefIntError::axiom_parse(member.member_id.to_string(), message))?;

        let offending = referenced.difference(active);
        if !offending.is_empty() {
            warn!(axiom = %member.member_id, offending_count = offending.len(), "axiom references inactive concept(s)");
            let descriptor = ConceptMiniDescriptor::new(member.referenced_component_id, offending);
            report.record_axiom(member.member_id.clone(), descriptor);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Changed-only internals
    // ------------------------------------------------------------------

    /// (a): the branch just invalidated references to concepts it changed
    /// or deleted. `D` = changed-or-deleted minus currently active.
    fn changed_only_pass_a(
        &self,
        report: &mut IntegrityReport,
        branch: &Branch,
        visible: &crate::branch::BranchCriteria,
        active: &IdSet,
    ) -> Result<(), RefIntError> {
        let touched_criteria = self.criteria.unpromoted_changes_and_deletions(branch);
        let mut touched = IdSet::new();
        for concept in self.store.stream_concepts(&touched_criteria, ConceptQuery::AllActive)? {
            touched.insert(concept?.id);
        }

        let d = touched.difference(active);
        debug!(d_count = d.len(), "changed-or-deleted concept set (D)");
        if d.is_empty() {
            return Ok(());
        }

        self.check_relationships(
            report,
            RelationshipQuery::ReferencingAny { targets: d.clone() },
            visible,
            active,
        )?;

        self.check_axioms_via_prefilter(
            report,
            QueryConceptQuery::WithAttributeIn {
                stated: true,
                targets: d,
            },
            visible,
            active,
        )?;

        Ok(())
    }

    /// (b): the branch added or modified relationships/axioms that now
    /// point at concepts inactive in the visible view. Per §4.5(b): build
    /// the three source/type/destination maps, union their keys to `R`,
    /// and emit every relationship keyed by a concept in `R \ active`.
    /// Dedup is automatic through the map keys — a concept referenced by
    /// several relationships is looked up once.
    fn changed_only_pass_b(
        &self,
        report: &mut IntegrityReport,
        branch: &Branch,
        active: &IdSet,
    ) -> Result<(), RefIntError> {
        let unpromoted = self.criteria.unpromoted_changes(branch);

        let mut by_source: IdMap<Vec<RelationshipId>> = IdMap::new();
        let mut by_type: IdMap<Vec<RelationshipId>> = IdMap::new();
        let mut by_destination: IdMap<Vec<RelationshipId>> = IdMap::new();
        let mut referenced = IdSet::new();

        for relationship in self
            .store
            .stream_relationships(&unpromoted, RelationshipQuery::Unpromoted)?
        {
            let relationship = relationship?;
            if !relationship.active || relationship.characteristic_type == Characteristic::Inferred {
                continue;
            }

            by_source
                .get_mut_or_insert_with(relationship.source_id, Vec::new)
                .push(relationship.id);
            referenced.insert(relationship.source_id);

            by_type
                .get_mut_or_insert_with(relationship.type_id, Vec::new)
                .push(relationship.id);
            referenced.insert(relationship.type_id);

            if !relationship.concrete {
                if let Some(destination) = relationship.destination_id {
                    by_destination
                        .get_mut_or_insert_with(destination, Vec::new)
                        .push(relationship.id);
                    referenced.insert(destination);
                }
            }
        }

        for &concept in referenced.difference(active).iter() {
            record_map_entries(report, &by_source, concept, IntegrityReport::record_bad_source);
            record_map_entries(report, &by_type, concept, IntegrityReport::record_bad_type);
            record_map_entries(report, &by_destination, concept, IntegrityReport::record_bad_destination);
        }

        for member in self
            .store
            .stream_reference_set_members(&unpromoted, AxiomQuery::Unpromoted)?
        {
            let member = member?;
            self.check_one_axiom(report, &member, active)?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Task+extension differential internals
    // ------------------------------------------------------------------

    /// §4.6 step 1: `task` must be a child or grandchild of `extension_main`,
    /// and every branch on that path — `task` itself, plus the intermediate
    /// project when `task` is a grandchild — must be rebased past
    /// `extension_main`'s head (§7: "task or project not rebased past the
    /// extension parent's head" is a `MisuseError`).
    fn verify_task_topology<B: BranchService>(
        &self,
        task: &Branch,
        extension_main: &Branch,
        branch_service: &B,
    ) -> Result<(), RefIntError> {
        let parent = task.path.parent();
        let grandparent = task.path.grandparent();

        let intermediate_project = match (parent, grandparent) {
            (Some(parent), _) if parent == extension_main.path => None,
            (Some(parent), Some(grandparent)) if grandparent == extension_main.path => Some(parent),
            _ => {
                return Err(RefIntError::misuse(
                    ErrorOrigin::Checker,
                    format!(
                        "task branch {} is not a child/grandchild of extension main {}",
                        task.path, extension_main.path
                    ),
                ));
            }
        };

        if !task.rebased_past(extension_main.head_timestamp) {
            return Err(RefIntError::misuse(
                ErrorOrigin::Checker,
                format!("task branch {} has not been rebased past extension main's head", task.path),
            ));
        }

        if let Some(project_path) = intermediate_project {
            let project = branch_service.find_branch_or_throw(&project_path)?;
            if !project.rebased_past(extension_main.head_timestamp) {
                return Err(RefIntError::misuse(
                    ErrorOrigin::Checker,
                    format!(
                        "project branch {} has not been rebased past extension main's head",
                        project.path
                    ),
                ));
            }
        }

        Ok(())
    }

    /// §4.6 step 4: re-resolve the baseline's relationship/axiom ids on the
    /// task branch, re-emitting only entries whose dependencies are still
    /// inactive there.
    fn reresolve_on_task(
        &self,
        task: &Branch,
        baseline: &IntegrityReport,
    ) -> Result<IntegrityReport, RefIntError> {
        let visible = self.criteria.visible(task);
        let active = self.active_concept_set(&visible)?;

        let mut report = IntegrityReport::new();

        let relationship_ids = baseline.all_relationship_ids();
        if !relationship_ids.is_empty() {
            for relationship in self
                .store
                .stream_relationships(&visible, RelationshipQuery::ByIds(relationship_ids))?
            {
                let relationship = relationship?;
                if relationship.active {
                    record_relationship_if_dangling(&mut report, &relationship, &active);
                }
            }
        }

        let axiom_ids = baseline.all_axiom_ids();
        if !axiom_ids.is_empty() {
            for member in self
                .store
                .stream_reference_set_members(&visible, AxiomQuery::ByIds(axiom_ids))?
            {
                let member = member?;
                self.check_one_axiom(&mut report, &member, &active)?;
            }
        }

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Description join (§4.9)
    // ------------------------------------------------------------------

    fn join_descriptions(&self, branch: &Branch, report: &mut IntegrityReport) -> Result<(), RefIntError> {
        if report.axioms_with_missing_or_inactive_referenced_concept.is_empty() {
            return Ok(());
        }

        let mut by_concept: BTreeMap<u64, ConceptMiniDescriptor> = BTreeMap::new();
        for descriptor in report.axioms_with_missing_or_inactive_referenced_concept.values() {
            by_concept
                .entry(descriptor.concept_id)
                .or_insert_with(|| descriptor.clone());
        }

        self.descriptions.join_active_descriptions(&branch.path, &mut by_concept)?;

        for descriptor in report.axioms_with_missing_or_inactive_referenced_concept.values_mut() {
            if let Some(enriched) = by_concept.get(&descriptor.concept_id) {
                descriptor.fsn = enriched.fsn.clone();
                descriptor.preferred_term = enriched.preferred_term.clone();
            }
        }

        Ok(())
    }
}

/// Shared by the full check, both changed-only passes, and the
/// task-differential re-resolution: test one relationship's three
/// directions against the active set and record whichever are dangling.
/// Concrete relationships are never checked on the destination side (§4.4
/// tie-break, §8 invariant 4).
fn record_relationship_if_dangling(report: &mut IntegrityReport, relationship: &Relationship, active: &IdSet) {
    if !relationship.active {
        return;
    }

    if !active.contains(relationship.source_id) {
        report.record_bad_source(relationship.id, relationship.source_id);
    }
    if !active.contains(relationship.type_id) {
        report.record_bad_type(relationship.id, relationship.type_id);
    }
    if !relationship.concrete {
        if let Some(destination) = relationship.destination_id {
            if !active.contains(destination) {
                report.record_bad_destination(relationship.id, destination);
            }
        }
    }
}

/// Emit one report entry per relationship id that `map` has recorded
/// against `offending_concept`, via `record` (one of `IntegrityReport`'s
/// three `record_bad_*` methods).
fn record_map_entries(
    report: &mut IntegrityReport,
    map: &IdMap<Vec<RelationshipId>>,
    offending_concept: ConceptId,
    record: fn(&mut IntegrityReport, RelationshipId, ConceptId),
) {
    if let Some(relationship_ids) = map.get(offending_concept) {
        for &relationship_id in relationship_ids {
            record(report, relationship_id, offending_concept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ConceptId, RelationshipId};
    use crate::test_support::*;

    #[test]
    fn concrete_relationship_never_flags_destination() {
        let mut active = IdSet::new();
        active.insert(ConceptId(1));
        active.insert(ConceptId(2));

        let relationship = Relationship {
            id: RelationshipId(10),
            source_id: ConceptId(1),
            type_id: ConceptId(2),
            destination_id: Some(ConceptId(999)),
            characteristic_type: crate::model::Characteristic::Stated,
            concrete: true,
            active: true,
        };

        let mut report = IntegrityReport::new();
        record_relationship_if_dangling(&mut report, &relationship, &active);
        assert!(report.relationships_with_missing_or_inactive_destination.is_empty());
    }

    #[test]
    fn full_check_s1_flags_dangling_destination_after_inactivation() {
        let fixtures = FakeFixtures::s1_inactivate_c1();
        let checker = fixtures.checker();
        let report = checker
            .find_all_components_with_bad_integrity(&fixtures.project_a, true)
            .unwrap();
        assert_eq!(
            report
                .relationships_with_missing_or_inactive_destination
                .get(&1)
                .copied(),
            Some(1) // R1 -> C1 (id 1)
        );
    }

    #[test]
    fn changed_only_rejects_root_branch() {
        let fixtures = FakeFixtures::s1_inactivate_c1();
        let checker = fixtures.checker();
        let err = checker
            .find_changed_components_with_bad_integrity(&fixtures.main)
            .unwrap_err();
        assert!(err.is_misuse());
    }

    #[test]
    fn changed_only_s1_flags_dangling_destination() {
        let fixtures = FakeFixtures::s1_inactivate_c1();
        let checker = fixtures.checker();
        let report = checker
            .find_changed_components_with_bad_integrity(&fixtures.project_a)
            .unwrap();
        assert_eq!(
            report
                .relationships_with_missing_or_inactive_destination
                .get(&1)
                .copied(),
            Some(1)
        );
    }

    #[test]
    fn changed_only_s2_flags_new_relationship_to_missing_concept() {
        let fixtures = FakeFixtures::s2_new_relationship_to_missing_concept();
        let checker = fixtures.checker();
        let report = checker
            .find_changed_components_with_bad_integrity(&fixtures.project_a)
            .unwrap();
        assert_eq!(
            report
                .relationships_with_missing_or_inactive_destination
                .get(&2)
                .copied(),
            Some(9999)
        );
    }

    #[test]
    fn changed_only_s9_flags_both_relationships_sharing_missing_source() {
        let fixtures = FakeFixtures::s9_two_relationships_share_missing_source();
        let checker = fixtures.checker();
        let report = checker
            .find_changed_components_with_bad_integrity(&fixtures.project_a)
            .unwrap();
        assert_eq!(
            report.relationships_with_missing_or_inactive_source.get(&20).copied(),
            Some(12)
        );
        assert_eq!(
            report.relationships_with_missing_or_inactive_source.get(&21).copied(),
            Some(12)
        );
    }

    #[test]
    fn full_check_s3_flags_axiom_referencing_inactive_concept() {
        let fixtures = FakeFixtures::s3_axiom_referencing_inactive_concept();
        let checker = fixtures.checker();
        let report = checker
            .find_all_components_with_bad_integrity(&fixtures.project_a, true)
            .unwrap();
        let descriptor = report
            .axioms_with_missing_or_inactive_referenced_concept
            .get("A1")
            .expect("axiom A1 flagged");
        assert_eq!(descriptor.concept_id, 5);
        assert_eq!(descriptor.offending_referenced_concepts, vec![4]);
    }

    #[test]
    fn full_check_s5_never_flags_concrete_relationship() {
        let fixtures = FakeFixtures::s5_concrete_relationship();
        let checker = fixtures.checker();
        let report = checker
            .find_all_components_with_bad_integrity(&fixtures.main, true)
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn full_check_s6_inferred_and_stated_are_exclusive() {
        let fixtures = FakeFixtures::s6_inferred_vs_stated();
        let checker = fixtures.checker();

        let stated_report = checker
            .find_all_components_with_bad_integrity(&fixtures.main, true)
            .unwrap();
        assert!(stated_report.relationships_with_missing_or_inactive_source.is_empty());

        let inferred_report = checker
            .find_all_components_with_bad_integrity(&fixtures.main, false)
            .unwrap();
        assert!(!inferred_report.relationships_with_missing_or_inactive_source.is_empty());
    }

    #[test]
    fn changed_only_s7_excludes_unpromoted_inferred_relationship() {
        let fixtures = FakeFixtures::s7_unpromoted_inferred_relationship_not_flagged();
        let checker = fixtures.checker();
        let report = checker
            .find_changed_components_with_bad_integrity(&fixtures.project_a)
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn task_differential_rejects_grandchild_when_intermediate_project_not_rebased() {
        let (fixtures, _sub_project, mut task) = FakeFixtures::s8_grandchild_topology(false);
        let checker = fixtures.checker();
        let branch_service = fixtures.branch_service.clone();

        let err = checker
            .find_changed_components_with_bad_integrity_for_task(&mut task, &fixtures.project_a, &branch_service)
            .unwrap_err();
        assert!(err.is_misuse());
    }

    #[test]
    fn task_differential_accepts_grandchild_when_intermediate_project_rebased() {
        let (fixtures, _sub_project, mut task) = FakeFixtures::s8_grandchild_topology(true);
        let checker = fixtures.checker();
        let branch_service = fixtures.branch_service.clone();

        let report = checker
            .find_changed_components_with_bad_integrity_for_task(&mut task, &fixtures.project_a, &branch_service)
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn task_differential_s4_clears_flag_once_fixed() {
        let mut fixtures = FakeFixtures::s4_task_fixes_r1();
        let checker = fixtures.checker();
        let branch_service = fixtures.branch_service.clone();

        let mut task = fixtures.task_b.clone();
        let report = checker
            .find_changed_components_with_bad_integrity_for_task(
                &mut task,
                &fixtures.project_a,
                &branch_service,
            )
            .unwrap();

        assert!(report.is_empty());
        assert!(task.internal.integrity_issue_is_true() == false);
        let persisted = branch_service.find_branch_or_throw(&task.path).unwrap();
        assert!(!persisted.internal.integrity_issue_is_true());
    }
}
