use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};

use crate::workflows::audit::domain::{
    Attribute, AttributeId, AttributeKind, Conclusion, ConclusionId, RuleType, UserId, WorkPaper,
    WorkPaperId, WorkPaperStatus,
};
use crate::workflows::audit::identity::ServiceIdentity;
use crate::workflows::audit::repository::{
    AttributeRepository, ConclusionRepository, RepositoryError, WorkPaperRepository,
};
use crate::workflows::audit::service::AuditService;
use crate::workflows::audit::uploads::{
    DocumentStorage, UploadError, UploadPolicy, UploadedDocument,
};

#[derive(Default)]
struct Tables {
    attributes: BTreeMap<AttributeId, Attribute>,
    work_papers: BTreeMap<WorkPaperId, WorkPaper>,
    conclusions: BTreeMap<ConclusionId, Conclusion>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    pub(super) fn seed_attribute(&self, attribute: Attribute) {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .attributes
            .insert(attribute.id, attribute);
    }

    pub(super) fn seed_work_paper(&self, work_paper: WorkPaper) {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .work_papers
            .insert(work_paper.id, work_paper);
    }

    pub(super) fn conclusions(&self) -> Vec<Conclusion> {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .conclusions
            .values()
            .cloned()
            .collect()
    }
}

impl AttributeRepository for MemoryRepository {
    fn list_all(&self) -> Result<Vec<Attribute>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.attributes.values().cloned().collect())
    }

    fn fetch(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.attributes.get(&id).cloned())
    }

    fn insert(&self, attribute: Attribute) -> Result<Attribute, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if guard.attributes.contains_key(&attribute.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.attributes.insert(attribute.id, attribute.clone());
        Ok(attribute)
    }

    fn update(&self, attribute: Attribute) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        match guard.attributes.get_mut(&attribute.id) {
            Some(slot) => {
                *slot = attribute;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: AttributeId) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard
            .attributes
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl WorkPaperRepository for MemoryRepository {
    fn fetch(&self, id: WorkPaperId) -> Result<Option<WorkPaper>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.work_papers.get(&id).cloned())
    }

    fn insert(&self, work_paper: WorkPaper) -> Result<WorkPaper, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if guard.work_papers.contains_key(&work_paper.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.work_papers.insert(work_paper.id, work_paper.clone());
        Ok(work_paper)
    }

    fn update(&self, work_paper: WorkPaper) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        match guard.work_papers.get_mut(&work_paper.id) {
            Some(slot) => {
                *slot = work_paper;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn list(&self) -> Result<Vec<WorkPaper>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.work_papers.values().cloned().collect())
    }
}

impl ConclusionRepository for MemoryRepository {
    fn delete_by_work_paper(&self, work_paper_id: WorkPaperId) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard
            .conclusions
            .retain(|_, conclusion| conclusion.work_paper_id != work_paper_id);
        Ok(())
    }

    fn insert(&self, conclusion: Conclusion) -> Result<Conclusion, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if guard
            .conclusions
            .values()
            .any(|existing| existing.work_paper_id == conclusion.work_paper_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.conclusions.insert(conclusion.id, conclusion.clone());
        Ok(conclusion)
    }

    fn fetch(&self, id: ConclusionId) -> Result<Option<Conclusion>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.conclusions.get(&id).cloned())
    }

    fn fetch_by_work_paper(
        &self,
        work_paper_id: WorkPaperId,
    ) -> Result<Option<Conclusion>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard
            .conclusions
            .values()
            .find(|conclusion| conclusion.work_paper_id == work_paper_id)
            .cloned())
    }
}

/// Records stored documents without touching the filesystem.
#[derive(Default)]
pub(super) struct MemoryDocuments {
    policy: UploadPolicy,
    stored: Mutex<Vec<(WorkPaperId, UploadedDocument)>>,
}

impl MemoryDocuments {
    pub(super) fn stored(&self) -> Vec<(WorkPaperId, UploadedDocument)> {
        self.stored.lock().expect("documents mutex poisoned").clone()
    }
}

impl DocumentStorage for MemoryDocuments {
    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn store(
        &self,
        work_paper_id: WorkPaperId,
        document: &UploadedDocument,
    ) -> Result<String, UploadError> {
        self.policy.check(document)?;
        let mut stored = self.stored.lock().expect("documents mutex poisoned");
        stored.push((work_paper_id, document.clone()));
        Ok(format!(
            "{work_paper_id}/doc-{}{}",
            stored.len(),
            document.extension()
        ))
    }
}

/// Repository whose every call fails, for error-path coverage.
pub(super) struct UnavailableRepository;

impl WorkPaperRepository for UnavailableRepository {
    fn fetch(&self, _id: WorkPaperId) -> Result<Option<WorkPaper>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _work_paper: WorkPaper) -> Result<WorkPaper, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _work_paper: WorkPaper) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<WorkPaper>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn manager() -> ServiceIdentity {
    ServiceIdentity::manager(UserId(1), "manager@example.com")
}

pub(super) fn build_service_as(
    identity: ServiceIdentity,
) -> (Arc<AuditService>, Arc<MemoryRepository>, Arc<MemoryDocuments>) {
    let repository = Arc::new(MemoryRepository::default());
    let documents = Arc::new(MemoryDocuments::default());
    let service = AuditService::new(
        repository.clone(),
        repository.clone(),
        repository.clone(),
        documents.clone(),
        identity,
    );
    (Arc::new(service), repository, documents)
}

pub(super) fn build_service() -> (Arc<AuditService>, Arc<MemoryRepository>, Arc<MemoryDocuments>)
{
    build_service_as(manager())
}

fn created_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("json object")
}

pub(super) fn rule_attribute(id: u64, name: &str, rule_type: RuleType, params: Value) -> Attribute {
    Attribute {
        id: AttributeId(id),
        name: name.to_string(),
        description: None,
        kind: AttributeKind::ValidationRule {
            rule_type: Some(rule_type),
            rule_parameters: Some(object(params)),
        },
        created_by: UserId(1),
        created_at: created_at(),
    }
}

pub(super) fn unconfigured_rule(id: u64, name: &str) -> Attribute {
    Attribute {
        id: AttributeId(id),
        name: name.to_string(),
        description: None,
        kind: AttributeKind::ValidationRule {
            rule_type: None,
            rule_parameters: None,
        },
        created_by: UserId(1),
        created_at: created_at(),
    }
}

pub(super) fn checklist_attribute(
    id: u64,
    name: &str,
    criteria_text: &str,
    is_required: bool,
) -> Attribute {
    Attribute {
        id: AttributeId(id),
        name: name.to_string(),
        description: Some("Supporting documentation".to_string()),
        kind: AttributeKind::ChecklistCriteria {
            criteria_text: criteria_text.to_string(),
            is_required,
        },
        created_by: UserId(1),
        created_at: created_at(),
    }
}

pub(super) fn work_paper(id: u64, form_data: Value, files: &[&str]) -> WorkPaper {
    WorkPaper {
        id: WorkPaperId(id),
        title: format!("Work paper {id}"),
        description: None,
        form_data: form_data.as_object().cloned(),
        file_paths: files.iter().map(|path| path.to_string()).collect(),
        status: WorkPaperStatus::Pending,
        submitted_by: UserId(2),
        submitted_at: created_at(),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
