//! Module: branch
//! Responsibility: branch identity, metadata, and the `BranchCriteria`
//! provider (§4.1, §6 BranchService surface).
//! Does not own: how a criteria value is evaluated against the store — that
//! is `ComponentStore`'s job; this module only builds the opaque predicate.

use std::fmt;

pub const ROOT_BRANCH: &str = "MAIN";

///
/// BranchPath
///
/// Slash-delimited branch path. `MAIN` is root.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BranchPath(String);

impl BranchPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_BRANCH
    }

    /// `PathUtil.getParentPath` — split on `/`, dropping the last segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|index| Self(self.0[..index].to_string()))
    }

    /// Grandparent, i.e. `parent().parent()`.
    #[must_use]
    pub fn grandparent(&self) -> Option<Self> {
        self.parent().and_then(|p| p.parent())
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// InternalMetadata
///
/// The `internal` submap of branch metadata. The only key this crate ever
/// reads or writes is `integrityIssue`, and the only legal values are the
/// literal strings `"true"` / `"false"` or absent (§6, §5 shared-resource
/// policy).
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InternalMetadata {
    integrity_issue: Option<String>,
}

impl InternalMetadata {
    #[must_use]
    pub fn integrity_issue_is_true(&self) -> bool {
        self.integrity_issue.as_deref() == Some("true")
    }

    pub fn set_integrity_issue(&mut self, value: bool) {
        self.integrity_issue = Some(if value { "true" } else { "false" }.to_string());
    }

    /// Removes the key entirely, as distinct from setting it to `"false"`.
    pub fn clear_integrity_issue(&mut self) {
        self.integrity_issue = None;
    }
}

///
/// Branch
///

#[derive(Clone, Debug)]
pub struct Branch {
    pub path: BranchPath,
    pub base_timestamp: i64,
    pub head_timestamp: i64,
    pub internal: InternalMetadata,
}

impl Branch {
    #[must_use]
    pub const fn new(path: BranchPath, base_timestamp: i64, head_timestamp: i64) -> Self {
        Self {
            path,
            base_timestamp,
            head_timestamp,
            internal: InternalMetadata {
                integrity_issue: None,
            },
        }
    }

    /// Whether this branch has been rebased past `parent_head`, i.e. its
    /// base has caught up to (or passed) the parent's head timestamp.
    #[must_use]
    pub const fn rebased_past(&self, parent_head: i64) -> bool {
        self.base_timestamp >= parent_head
    }
}

///
/// OpenCommit
///
/// The in-flight commit a `CommitHook` is invoked with: identifies the
/// branch being committed to and whether this is a rebase commit.
///

#[derive(Clone, Debug)]
pub struct OpenCommit {
    pub branch_path: BranchPath,
    pub is_rebase: bool,
}

///
/// BranchCriteria
///
/// Opaque predicate value produced by the provider (§4.1). The checker
/// never inspects variants directly — it only passes the value to
/// `ComponentStore` and composes with `and`/`or`.
///

#[derive(Clone, Debug)]
pub enum BranchCriteria {
    Visible { branch: BranchPath, timepoint: i64 },
    UnpromotedChanges { branch: BranchPath },
    UnpromotedChangesAndDeletions { branch: BranchPath },
    VisibleIncludingOpenCommit { commit: OpenCommit, timepoint: i64 },
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
}

impl BranchCriteria {
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

///
/// BranchCriteriaProvider
///
/// Builds the four visibility predicates listed in §4.1 over a `Branch`.
/// A thin trait so tests can supply a fake that matches the in-memory
/// `test_support` store without touching real branch storage.
///

pub trait BranchCriteriaProvider {
    fn visible(&self, branch: &Branch) -> BranchCriteria {
        BranchCriteria::Visible {
            branch: branch.path.clone(),
            timepoint: branch.head_timestamp,
        }
    }

    fn unpromoted_changes(&self, branch: &Branch) -> BranchCriteria {
        BranchCriteria::UnpromotedChanges {
            branch: branch.path.clone(),
        }
    }

    fn unpromoted_changes_and_deletions(&self, branch: &Branch) -> BranchCriteria {
        BranchCriteria::UnpromotedChangesAndDeletions {
            branch: branch.path.clone(),
        }
    }

    fn visible_including_open_commit(&self, branch: &Branch, commit: OpenCommit) -> BranchCriteria {
        BranchCriteria::VisibleIncludingOpenCommit {
            commit,
            timepoint: branch.head_timestamp,
        }
    }
}

/// The production provider — stateless, since every criteria value here is
/// built purely from the branch/commit passed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBranchCriteriaProvider;

impl BranchCriteriaProvider for DefaultBranchCriteriaProvider {}

///
/// BranchService
///
/// §6 BranchService surface: `findBranchOrThrow` / `updateMetadata`. The
/// core only ever reads branch state through this trait and writes back
/// the single `internal.integrityIssue` key (§5 shared-resource policy).
///

pub trait BranchService {
    fn find_branch_or_throw(&self, path: &BranchPath) -> Result<Branch, crate::error::RefIntError>;

    fn update_metadata(&self, branch: &Branch) -> Result<(), crate::error::RefIntError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_grandparent_split_on_slash() {
        let task = BranchPath::new("MAIN/SNOMEDCT-EXT/TASK-1");
        assert_eq!(task.parent().unwrap().as_str(), "MAIN/SNOMEDCT-EXT");
        assert_eq!(task.grandparent().unwrap().as_str(), "MAIN");
    }

    #[test]
    fn root_has_no_parent() {
        assert!(BranchPath::new(ROOT_BRANCH).parent().is_none());
    }

    #[test]
    fn integrity_issue_round_trips() {
        let mut meta = InternalMetadata::default();
        assert!(!meta.integrity_issue_is_true());
        meta.set_integrity_issue(true);
        assert!(meta.integrity_issue_is_true());
        meta.clear_integrity_issue();
        assert!(!meta.integrity_issue_is_true());
    }
}
