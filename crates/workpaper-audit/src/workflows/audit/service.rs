use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::conclusion::ConclusionGenerator;
use super::domain::{
    Attribute, AttributeDefinition, AttributeId, AttributeUpdate, Conclusion, ConclusionId,
    WorkPaper, WorkPaperId, WorkPaperStatus, WorkPaperSubmission,
};
use super::evaluation::{AuditRunError, AuditRunner};
use super::identity::ServiceIdentity;
use super::repository::{
    AttributeRepository, ConclusionRepository, RepositoryError, WorkPaperRepository,
};
use super::uploads::{DocumentStorage, UploadError, UploadPolicy, UploadedDocument};

/// Offset/limit window for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

/// Result of a completed audit trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditOutcome {
    pub work_paper: WorkPaper,
    pub conclusion: Conclusion,
}

struct IdSequence(AtomicU64);

impl IdSequence {
    fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Service composing the stores, document storage, audit runner and conclusion generator.
pub struct AuditService {
    attributes: Arc<dyn AttributeRepository>,
    work_papers: Arc<dyn WorkPaperRepository>,
    conclusions: Arc<dyn ConclusionRepository>,
    documents: Arc<dyn DocumentStorage>,
    identity: ServiceIdentity,
    attribute_ids: IdSequence,
    work_paper_ids: IdSequence,
    conclusion_ids: IdSequence,
}

impl AuditService {
    pub fn new(
        attributes: Arc<dyn AttributeRepository>,
        work_papers: Arc<dyn WorkPaperRepository>,
        conclusions: Arc<dyn ConclusionRepository>,
        documents: Arc<dyn DocumentStorage>,
        identity: ServiceIdentity,
    ) -> Self {
        Self {
            attributes,
            work_papers,
            conclusions,
            documents,
            identity,
            attribute_ids: IdSequence::new(),
            work_paper_ids: IdSequence::new(),
            conclusion_ids: IdSequence::new(),
        }
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        self.documents.policy()
    }

    pub fn list_attributes(&self, page: Pagination) -> Result<Vec<Attribute>, AuditServiceError> {
        Ok(page.apply(self.attributes.list_all()?))
    }

    pub fn get_attribute(&self, id: AttributeId) -> Result<Attribute, AuditServiceError> {
        self.attributes
            .fetch(id)?
            .ok_or(AuditServiceError::AttributeNotFound(id))
    }

    pub fn create_attribute(
        &self,
        definition: AttributeDefinition,
    ) -> Result<Attribute, AuditServiceError> {
        self.require_manager("create attributes")?;
        if definition.name.trim().is_empty() {
            return Err(AuditServiceError::InvalidInput(
                "attribute name is required".to_string(),
            ));
        }

        let attribute = Attribute {
            id: AttributeId(self.attribute_ids.next()),
            name: definition.name,
            description: definition.description,
            kind: definition.kind,
            created_by: self.identity.user_id,
            created_at: Utc::now(),
        };

        let stored = self.attributes.insert(attribute)?;
        info!(attribute_id = %stored.id, kind = stored.kind.label(), "attribute created");
        Ok(stored)
    }

    pub fn update_attribute(
        &self,
        id: AttributeId,
        update: AttributeUpdate,
    ) -> Result<Attribute, AuditServiceError> {
        self.require_manager("update attributes")?;
        let mut attribute = self.get_attribute(id)?;
        attribute.apply(update);
        self.attributes.update(attribute.clone())?;
        info!(attribute_id = %id, "attribute updated");
        Ok(attribute)
    }

    pub fn delete_attribute(&self, id: AttributeId) -> Result<(), AuditServiceError> {
        self.require_manager("delete attributes")?;
        match self.attributes.delete(id) {
            Ok(()) => {
                info!(attribute_id = %id, "attribute deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(AuditServiceError::AttributeNotFound(id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Create a pending work paper and store its documents. Every document is checked
    /// against the upload policy before anything is written.
    pub fn submit_work_paper(
        &self,
        submission: WorkPaperSubmission,
        documents: Vec<UploadedDocument>,
    ) -> Result<WorkPaper, AuditServiceError> {
        if submission.title.trim().is_empty() {
            return Err(AuditServiceError::InvalidInput(
                "work paper title is required".to_string(),
            ));
        }

        let documents: Vec<UploadedDocument> = documents
            .into_iter()
            .filter(|document| !document.file_name.is_empty())
            .collect();
        for document in &documents {
            self.documents.policy().check(document)?;
        }

        let work_paper = WorkPaper {
            id: WorkPaperId(self.work_paper_ids.next()),
            title: submission.title,
            description: submission.description,
            form_data: submission.form_data,
            file_paths: Vec::new(),
            status: WorkPaperStatus::Pending,
            submitted_by: self.identity.user_id,
            submitted_at: Utc::now(),
        };
        let mut work_paper = self.work_papers.insert(work_paper)?;

        if !documents.is_empty() {
            for document in &documents {
                let path = self.documents.store(work_paper.id, document)?;
                work_paper.file_paths.push(path);
            }
            self.work_papers.update(work_paper.clone())?;
        }

        info!(
            work_paper_id = %work_paper.id,
            files = work_paper.file_paths.len(),
            "work paper submitted"
        );
        Ok(work_paper)
    }

    pub fn list_work_papers(&self, page: Pagination) -> Result<Vec<WorkPaper>, AuditServiceError> {
        Ok(page.apply(self.work_papers.list()?))
    }

    pub fn get_work_paper(&self, id: WorkPaperId) -> Result<WorkPaper, AuditServiceError> {
        self.work_papers
            .fetch(id)?
            .ok_or(AuditServiceError::WorkPaperNotFound(id))
    }

    /// Run the audit for a work paper, replacing any earlier conclusion.
    ///
    /// The prior conclusion is deleted before the new one is inserted. A failure between
    /// the two steps leaves the work paper without a conclusion until the next trigger.
    pub fn trigger_audit(&self, id: WorkPaperId) -> Result<AuditOutcome, AuditServiceError> {
        let mut work_paper = self.get_work_paper(id)?;

        if self.conclusions.fetch_by_work_paper(id)?.is_some() {
            info!(work_paper_id = %id, "replacing existing conclusion");
        }
        self.conclusions.delete_by_work_paper(id)?;

        let results = AuditRunner::new(&*self.work_papers, &*self.attributes).run(id)?;
        let draft = ConclusionGenerator::new(&*self.attributes).generate(&results)?;
        let conclusion = draft.into_conclusion(ConclusionId(self.conclusion_ids.next()), Utc::now());
        let conclusion = self.conclusions.insert(conclusion)?;

        work_paper.status = WorkPaperStatus::Audited;
        self.work_papers.update(work_paper.clone())?;

        if results.failed > 0 {
            warn!(work_paper_id = %id, failed = results.failed, "audit recorded failed attributes");
        }
        info!(
            work_paper_id = %id,
            checked = results.attributes_checked,
            passed = results.passed,
            failed = results.failed,
            warnings = results.warnings,
            score = conclusion.overall_score,
            status = work_paper.status.label(),
            "audit completed"
        );

        Ok(AuditOutcome {
            work_paper,
            conclusion,
        })
    }

    pub fn get_conclusion(&self, id: ConclusionId) -> Result<Conclusion, AuditServiceError> {
        self.conclusions
            .fetch(id)?
            .ok_or(AuditServiceError::ConclusionNotFound(id))
    }

    pub fn get_conclusion_for_work_paper(
        &self,
        work_paper_id: WorkPaperId,
    ) -> Result<Conclusion, AuditServiceError> {
        self.conclusions
            .fetch_by_work_paper(work_paper_id)?
            .ok_or(AuditServiceError::NoConclusionForWorkPaper(work_paper_id))
    }

    fn require_manager(&self, action: &'static str) -> Result<(), AuditServiceError> {
        if self.identity.can_manage_attributes() {
            Ok(())
        } else {
            Err(AuditServiceError::Forbidden {
                action,
                role: self.identity.role.label(),
            })
        }
    }
}

/// Error raised by the audit service.
#[derive(Debug, thiserror::Error)]
pub enum AuditServiceError {
    #[error("Work paper not found")]
    WorkPaperNotFound(WorkPaperId),
    #[error("Attribute not found")]
    AttributeNotFound(AttributeId),
    #[error("Conclusion not found")]
    ConclusionNotFound(ConclusionId),
    #[error("Conclusion not found for this work paper")]
    NoConclusionForWorkPaper(WorkPaperId),
    #[error("role '{role}' may not {action}")]
    Forbidden {
        action: &'static str,
        role: &'static str,
    },
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AuditRunError> for AuditServiceError {
    fn from(value: AuditRunError) -> Self {
        match value {
            AuditRunError::WorkPaperNotFound(id) => Self::WorkPaperNotFound(id),
            AuditRunError::Repository(err) => Self::Repository(err),
        }
    }
}
