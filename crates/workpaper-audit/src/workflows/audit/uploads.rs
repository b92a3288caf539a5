use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::domain::WorkPaperId;

/// Raw document received alongside a work paper submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Extension including the leading dot, lowercased. Empty when the name has none.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File type {0} not allowed")]
    ExtensionNotAllowed(String),
    #[error("File too large")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Limits applied to every uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
}

pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 8] = [
    ".pdf", ".xlsx", ".xls", ".doc", ".docx", ".jpg", ".jpeg", ".png",
];

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, document: &UploadedDocument) -> Result<(), UploadError> {
        let extension = document.extension();
        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(UploadError::ExtensionNotAllowed(extension));
        }

        if document.bytes.len() > self.max_file_size {
            return Err(UploadError::TooLarge {
                size: document.bytes.len(),
                limit: self.max_file_size,
            });
        }

        Ok(())
    }
}

/// Backend persisting uploaded documents and returning their stored reference.
pub trait DocumentStorage: Send + Sync {
    fn policy(&self) -> &UploadPolicy;

    fn store(
        &self,
        work_paper_id: WorkPaperId,
        document: &UploadedDocument,
    ) -> Result<String, UploadError>;
}

/// Filesystem storage laid out as `<root>/<work_paper_id>/<uuid><ext>`.
#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    root: PathBuf,
    policy: UploadPolicy,
}

impl LocalDocumentStorage {
    pub fn new(root: impl Into<PathBuf>, policy: UploadPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }
}

impl DocumentStorage for LocalDocumentStorage {
    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn store(
        &self,
        work_paper_id: WorkPaperId,
        document: &UploadedDocument,
    ) -> Result<String, UploadError> {
        self.policy.check(document)?;

        let directory = self.root.join(work_paper_id.to_string());
        fs::create_dir_all(&directory)?;

        let file_name = format!("{}{}", Uuid::new_v4(), document.extension());
        fs::write(directory.join(&file_name), &document.bytes)?;

        Ok(format!("{work_paper_id}/{file_name}"))
    }
}
