//! Work paper audit: attribute definitions, rule evaluation, scoring and CPA conclusions.
//!
//! The evaluation core (`evaluation`, `conclusion`) is pure and deterministic. The service
//! composes it with the storage seams declared in `repository` and `uploads`, and the router
//! exposes the service over HTTP.

pub mod conclusion;
pub mod domain;
pub mod evaluation;
pub mod identity;
pub mod repository;
pub mod router;
pub mod service;
pub mod uploads;

#[cfg(test)]
mod tests;

pub use conclusion::{ComplianceTier, ConclusionDraft, ConclusionGenerator};
pub use domain::{
    Attribute, AttributeDefinition, AttributeId, AttributeKind, AttributeTypeName,
    AttributeUpdate, ComplianceSummary, Conclusion, ConclusionId, Finding, FindingStatus,
    FormData, RuleType, UserId, WorkPaper, WorkPaperId, WorkPaperStatus, WorkPaperSubmission,
};
pub use evaluation::{AuditResults, AuditRunError, AuditRunner, RuleEvaluator};
pub use identity::{ServiceIdentity, UserRole};
pub use repository::{
    AttributeRepository, ConclusionRepository, RepositoryError, WorkPaperRepository,
};
pub use router::audit_router;
pub use service::{AuditOutcome, AuditService, AuditServiceError, Pagination};
pub use uploads::{
    DocumentStorage, LocalDocumentStorage, UploadError, UploadPolicy, UploadedDocument,
};
