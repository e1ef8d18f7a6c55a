// ABOUTME: Migration utilities module
// ABOUTME: Handles silo dump/restore and organization mapping rewrites

pub mod mappings;
pub mod split;

pub use mappings::{
    revise_organization_mappings, MappingRevision, OrganizationMappingStore,
    PostgresMappingStore,
};
pub use split::{SiloSplitter, SplitReport, SplitStep, StepResult};
