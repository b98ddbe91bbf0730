//! Module: commit_hook
//! Responsibility: the pre-commit listener that re-runs the changed-only
//! check against the in-flight commit and clears the persisted integrity
//! flag on a clean result (§4.7).
//! Does not own: the commit-completion transaction itself — this listener
//! runs inside it and must never block or fail it (§5, §7).

use crate::{
    branch::{Branch, BranchCriteriaProvider, BranchService, OpenCommit},
    checker::IntegrityChecker,
    description::DescriptionService,
    error::RefIntError,
    store::ComponentStore,
};
use tracing::{error, info};

///
/// CommitHook
///
/// Invoked synchronously before a commit completes. Store errors are
/// logged and swallowed here — and only here — so a failing integrity
/// probe never blocks a legitimate commit (§7 CommitHookError).
///

pub struct CommitHook<'a, S, P, D> {
    checker: &'a IntegrityChecker<'a, S, P, D>,
}

impl<'a, S, P, D> CommitHook<'a, S, P, D>
where
    S: ComponentStore,
    P: BranchCriteriaProvider,
    D: DescriptionService,
{
    #[must_use]
    pub const fn new(checker: &'a IntegrityChecker<'a, S, P, D>) -> Self {
        Self { checker }
    }

    /// Run the pre-commit probe. Never returns an error to the caller: a
    /// store failure is logged and treated as "leave the flag as-is".
    pub fn on_pre_commit<B: BranchService>(&self, branch: &Branch, commit: OpenCommit, branch_service: &B) {
        if commit.is_rebase {
            return;
        }
        if branch.path.is_root() {
            // Defensive only: in practice this hook is never invoked for
            // root-branch commits, since root commits have no branch-local
            // content to check (§4.7).
            return;
        }
        if !branch.internal.integrity_issue_is_true() {
            return;
        }

        match self.run_probe(branch, commit) {
            Ok(true) => {
                let mut updated = branch.clone();
                updated.internal.clear_integrity_issue();
                if let Err(err) = branch_service.update_metadata(&updated) {
                    error!(branch = %branch.path, error = %err, "failed to persist cleared integrity flag");
                }
            }
            Ok(false) => {
                info!(branch = %branch.path, "integrity issue persists; leaving flag set");
            }
            Err(err) => {
                let wrapped = RefIntError::CommitHook {
                    message: err.to_string(),
                };
                error!(branch = %branch.path, error = %wrapped, "commit hook integrity probe failed; commit proceeds");
            }
        }
    }

    /// Returns `Ok(true)` when the probe found a clean report.
    ///
    /// Uses `visible_including_open_commit`, never the plain `visible`
    /// criteria — the latter would miss the commit's own in-flight writes
    /// and spuriously preserve the flag (§9).
    fn run_probe(&self, branch: &Branch, commit: OpenCommit) -> Result<bool, RefIntError> {
        let provider = self.checker.criteria_provider();
        let criteria = provider.visible_including_open_commit(branch, commit);
        let report = self.checker.changed_only_against(branch, criteria)?;
        Ok(report.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn idempotent_on_clean_branch_removes_key_then_is_a_noop() {
        let mut fixtures = FakeFixtures::s1_inactivate_c1();
        fixtures.project_a.internal.set_integrity_issue(true);
        // Fix the dangling relationship so the probe comes back clean.
        fixtures.deactivate_relationship(1);
        fixtures
            .branch_service
            .upsert(fixtures.project_a.clone());

        let checker = fixtures.checker();
        let hook = CommitHook::new(&checker);
        let commit = OpenCommit {
            branch_path: fixtures.project_a.path.clone(),
            is_rebase: false,
        };

        hook.on_pre_commit(&fixtures.project_a, commit.clone(), &fixtures.branch_service);
        let after_first = fixtures.branch_service.find_branch_or_throw(&fixtures.project_a.path).unwrap();
        assert!(!after_first.internal.integrity_issue_is_true());

        // Second run: flag already absent, hook returns immediately.
        hook.on_pre_commit(&after_first, commit, &fixtures.branch_service);
        let after_second = fixtures.branch_service.find_branch_or_throw(&fixtures.project_a.path).unwrap();
        assert!(!after_second.internal.integrity_issue_is_true());
    }

    #[test]
    fn ignores_rebase_commits() {
        let mut fixtures = FakeFixtures::s1_inactivate_c1();
        fixtures.project_a.internal.set_integrity_issue(true);
        fixtures.branch_service.upsert(fixtures.project_a.clone());

        let checker = fixtures.checker();
        let hook = CommitHook::new(&checker);
        let commit = OpenCommit {
            branch_path: fixtures.project_a.path.clone(),
            is_rebase: true,
        };

        hook.on_pre_commit(&fixtures.project_a, commit, &fixtures.branch_service);
        let after = fixtures.branch_service.find_branch_or_throw(&fixtures.project_a.path).unwrap();
        assert!(after.internal.integrity_issue_is_true());
    }
}
