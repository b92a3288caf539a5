use super::domain::{Attribute, AttributeId, Conclusion, ConclusionId, WorkPaper, WorkPaperId};

/// Storage abstraction for attribute definitions.
pub trait AttributeRepository: Send + Sync {
    /// Every attribute in store order. Callers must not rely on a particular ordering.
    fn list_all(&self) -> Result<Vec<Attribute>, RepositoryError>;
    fn fetch(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError>;
    fn insert(&self, attribute: Attribute) -> Result<Attribute, RepositoryError>;
    fn update(&self, attribute: Attribute) -> Result<(), RepositoryError>;
    fn delete(&self, id: AttributeId) -> Result<(), RepositoryError>;
}

/// Storage abstraction for submitted work papers.
pub trait WorkPaperRepository: Send + Sync {
    fn fetch(&self, id: WorkPaperId) -> Result<Option<WorkPaper>, RepositoryError>;
    fn insert(&self, work_paper: WorkPaper) -> Result<WorkPaper, RepositoryError>;
    fn update(&self, work_paper: WorkPaper) -> Result<(), RepositoryError>;
    fn list(&self) -> Result<Vec<WorkPaper>, RepositoryError>;
}

/// Storage abstraction for generated conclusions, unique per work paper.
pub trait ConclusionRepository: Send + Sync {
    /// Removes the conclusion for the work paper if one exists. Missing rows are not an error.
    fn delete_by_work_paper(&self, work_paper_id: WorkPaperId) -> Result<(), RepositoryError>;
    /// Fails with `Conflict` when the work paper already has a conclusion.
    fn insert(&self, conclusion: Conclusion) -> Result<Conclusion, RepositoryError>;
    fn fetch(&self, id: ConclusionId) -> Result<Option<Conclusion>, RepositoryError>;
    fn fetch_by_work_paper(
        &self,
        work_paper_id: WorkPaperId,
    ) -> Result<Option<Conclusion>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
