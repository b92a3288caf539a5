use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use workpaper_audit::workflows::audit::{
    Attribute, AttributeId, AttributeRepository, Conclusion, ConclusionId, ConclusionRepository,
    DocumentStorage, RepositoryError, UploadError, UploadPolicy, UploadedDocument, WorkPaper,
    WorkPaperId, WorkPaperRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Tables {
    attributes: BTreeMap<AttributeId, Attribute>,
    work_papers: BTreeMap<WorkPaperId, WorkPaper>,
    conclusions: BTreeMap<ConclusionId, Conclusion>,
}

/// Process-local store backing all three repositories. Rows are listed in id order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditRepository {
    tables: Arc<Mutex<Tables>>,
}

impl AttributeRepository for InMemoryAuditRepository {
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
        if guard.attributes.contains_key(&attribute.id) {
            guard.attributes.insert(attribute.id, attribute);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: AttributeId) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        match guard.attributes.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl WorkPaperRepository for InMemoryAuditRepository {
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
        if guard.work_papers.contains_key(&work_paper.id) {
            guard.work_papers.insert(work_paper.id, work_paper);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn list(&self) -> Result<Vec<WorkPaper>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.work_papers.values().cloned().collect())
    }
}

impl ConclusionRepository for InMemoryAuditRepository {
    fn delete_by_work_paper(&self, work_paper_id: WorkPaperId) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard
            .conclusions
            .retain(|_, conclusion| conclusion.work_paper_id != work_paper_id);
        Ok(())
    }

    fn insert(&self, conclusion: Conclusion) -> Result<Conclusion, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        // One conclusion per work paper.
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

/// Document storage for offline audits: applies the upload policy and records the
/// file name as the stored reference without writing any bytes.
#[derive(Debug, Default)]
pub(crate) struct ManifestDocumentStorage {
    policy: UploadPolicy,
}

impl DocumentStorage for ManifestDocumentStorage {
    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn store(
        &self,
        work_paper_id: WorkPaperId,
        document: &UploadedDocument,
    ) -> Result<String, UploadError> {
        self.policy.check(document)?;
        Ok(format!("{work_paper_id}/{}", document.file_name))
    }
}
