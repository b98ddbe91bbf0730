//! Module: description
//! Responsibility: the collaborator boundary for enriching axiom subject
//! concepts with display fields (§4.9, §6 DescriptionService surface).
//! Does not own: description storage or term ranking — out of scope (§1).

use crate::{branch::BranchPath, error::RefIntError, model::ConceptMiniDescriptor};
use std::collections::BTreeMap;

///
/// DescriptionService
///
/// The only write this crate ever makes into a concept descriptor happens
/// through this trait, called once after a report's axiom map is fully
/// assembled (§4.9). `mini_map` is keyed by concept id so the
/// implementation can batch-fetch descriptions in one call rather than one
/// per concept.
///

pub trait DescriptionService {
    fn join_active_descriptions(
        &self,
        branch: &BranchPath,
        mini_map: &mut BTreeMap<u64, ConceptMiniDescriptor>,
    ) -> Result<(), RefIntError>;
}

/// A service that performs no enrichment — useful for callers that only
/// need ids and offending-concept sets, and for tests that don't exercise
/// §4.9 directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDescriptionService;

impl DescriptionService for NoopDescriptionService {
    fn join_active_descriptions(
        &self,
        _branch: &BranchPath,
        _mini_map: &mut BTreeMap<u64, ConceptMiniDescriptor>,
    ) -> Result<(), RefIntError> {
        Ok(())
    }
}
