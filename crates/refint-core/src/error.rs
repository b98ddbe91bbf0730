//! Module: error
//! Responsibility: the crate's public error taxonomy (§7 of the design).
//! Does not own: retry policy — callers decide whether to retry a whole
//! invocation; this crate never retries internally.

use std::fmt;
use thiserror::Error as ThisError;

///
/// ErrorOrigin
///
/// Tags which component raised a `RefIntError`. Carried in `Display` output
/// and attached as a `tracing` field wherever the error is logged.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    BranchCriteria,
    ComponentStore,
    AxiomParser,
    Checker,
    CommitHook,
    DescriptionService,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BranchCriteria => "branch_criteria",
            Self::ComponentStore => "component_store",
            Self::AxiomParser => "axiom_parser",
            Self::Checker => "checker",
            Self::CommitHook => "commit_hook",
            Self::DescriptionService => "description_service",
        };
        write!(f, "{label}")
    }
}

///
/// RefIntError
///
/// Structured runtime error. `Misuse` and `UpstreamStore` are always
/// propagated to the caller; `CommitHook` is the sole variant this crate
/// ever catches and swallows itself (§4.7, §7).
///

#[derive(Debug, ThisError)]
pub enum RefIntError {
    /// Invalid call topology: changed-only check on the root branch, or a
    /// task/extension branch pairing that violates the parent/grandparent
    /// rebase contract (§7 MisuseError).
    #[error("{origin}: {message}")]
    Misuse {
        origin: ErrorOrigin,
        message: String,
    },

    /// Any failure surfaced by the `ComponentStore` (§7 UpstreamStoreError).
    /// Never retried inside this crate.
    #[error("{origin}: store error: {message}")]
    UpstreamStore {
        origin: ErrorOrigin,
        message: String,
    },

    /// An OWL class expression failed to parse (§7 AxiomParseError), naming
    /// the offending axiom member.
    #[error("axiom {member_id} failed to parse: {message}")]
    AxiomParse { member_id: String, message: String },

    /// Only ever constructed and caught within `CommitHook::on_pre_commit`;
    /// logged at error level and swallowed there. Never escapes the hook.
    #[error("commit hook probe failed: {message}")]
    CommitHook { message: String },
}

impl RefIntError {
    #[must_use]
    pub fn misuse(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::Misuse {
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn upstream_store(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::UpstreamStore {
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn axiom_parse(member_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AxiomParse {
            member_id: member_id.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse { .. })
    }
}

pub type Result<T> = std::result::Result<T, RefIntError>;
