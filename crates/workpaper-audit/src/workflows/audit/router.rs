use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::domain::{
    AttributeDefinition, AttributeId, AttributeUpdate, ConclusionId, WorkPaperId,
    WorkPaperSubmission,
};
use super::repository::RepositoryError;
use super::service::{AuditService, AuditServiceError, Pagination};
use super::uploads::{UploadError, UploadedDocument};

/// Multipart bodies may carry several documents; the cap is a multiple of the per-file limit.
const BODY_LIMIT_FILES: usize = 16;

/// Router builder exposing attribute, work paper and conclusion endpoints.
pub fn audit_router(service: Arc<AuditService>) -> Router {
    let body_limit = service
        .upload_policy()
        .max_file_size
        .saturating_mul(BODY_LIMIT_FILES);

    Router::new()
        .route(
            "/api/attributes",
            get(list_attributes_handler).post(create_attribute_handler),
        )
        .route(
            "/api/attributes/:attribute_id",
            get(get_attribute_handler)
                .put(update_attribute_handler)
                .delete(delete_attribute_handler),
        )
        .route(
            "/api/work-papers",
            get(list_work_papers_handler).post(submit_work_paper_handler),
        )
        .route("/api/work-papers/:work_paper_id", get(get_work_paper_handler))
        .route(
            "/api/work-papers/:work_paper_id/audit",
            post(trigger_audit_handler),
        )
        .route("/api/conclusions/:conclusion_id", get(get_conclusion_handler))
        .route(
            "/api/conclusions/work-papers/:work_paper_id/conclusion",
            get(conclusion_for_work_paper_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

pub(crate) async fn list_attributes_handler(
    State(service): State<Arc<AuditService>>,
    page: Result<Query<Pagination>, QueryRejection>,
) -> Response {
    let Query(page) = match page {
        Ok(page) => page,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.list_attributes(page) {
        Ok(attributes) => (StatusCode::OK, Json(attributes)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_attribute_handler(
    State(service): State<Arc<AuditService>>,
    definition: Result<Json<AttributeDefinition>, JsonRejection>,
) -> Response {
    let Json(definition) = match definition {
        Ok(body) => body,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.create_attribute(definition) {
        Ok(attribute) => (StatusCode::CREATED, Json(attribute)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_attribute_handler(
    State(service): State<Arc<AuditService>>,
    attribute_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(attribute_id) = match attribute_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.get_attribute(AttributeId(attribute_id)) {
        Ok(attribute) => (StatusCode::OK, Json(attribute)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_attribute_handler(
    State(service): State<Arc<AuditService>>,
    attribute_id: Result<Path<u64>, PathRejection>,
    update: Result<Json<AttributeUpdate>, JsonRejection>,
) -> Response {
    let Path(attribute_id) = match attribute_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    let Json(update) = match update {
        Ok(body) => body,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.update_attribute(AttributeId(attribute_id), update) {
        Ok(attribute) => (StatusCode::OK, Json(attribute)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_attribute_handler(
    State(service): State<Arc<AuditService>>,
    attribute_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(attribute_id) = match attribute_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.delete_attribute(AttributeId(attribute_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_work_papers_handler(
    State(service): State<Arc<AuditService>>,
    page: Result<Query<Pagination>, QueryRejection>,
) -> Response {
    let Query(page) = match page {
        Ok(page) => page,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.list_work_papers(page) {
        Ok(work_papers) => (StatusCode::OK, Json(work_papers)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_work_paper_handler(
    State(service): State<Arc<AuditService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    let (submission, documents) = match read_submission(multipart).await {
        Ok(parts) => parts,
        Err(message) => return error_body(StatusCode::BAD_REQUEST, message),
    };

    match service.submit_work_paper(submission, documents) {
        Ok(work_paper) => (StatusCode::CREATED, Json(work_paper)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_work_paper_handler(
    State(service): State<Arc<AuditService>>,
    work_paper_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(work_paper_id) = match work_paper_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.get_work_paper(WorkPaperId(work_paper_id)) {
        Ok(work_paper) => (StatusCode::OK, Json(work_paper)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn trigger_audit_handler(
    State(service): State<Arc<AuditService>>,
    work_paper_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(work_paper_id) = match work_paper_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.trigger_audit(WorkPaperId(work_paper_id)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome.work_paper)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_conclusion_handler(
    State(service): State<Arc<AuditService>>,
    conclusion_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(conclusion_id) = match conclusion_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.get_conclusion(ConclusionId(conclusion_id)) {
        Ok(conclusion) => (StatusCode::OK, Json(conclusion)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn conclusion_for_work_paper_handler(
    State(service): State<Arc<AuditService>>,
    work_paper_id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(work_paper_id) = match work_paper_id {
        Ok(path) => path,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };
    match service.get_conclusion_for_work_paper(WorkPaperId(work_paper_id)) {
        Ok(conclusion) => (StatusCode::OK, Json(conclusion)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Collect the `title`, `description`, `form_data` and `files` parts of a submission.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(WorkPaperSubmission, Vec<UploadedDocument>), String> {
    let mut submission = WorkPaperSubmission::default();
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| err.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => submission.title = field.text().await.map_err(|err| err.to_string())?,
            "description" => {
                let text = field.text().await.map_err(|err| err.to_string())?;
                submission.description = Some(text).filter(|text| !text.is_empty());
            }
            "form_data" => {
                let raw = field.text().await.map_err(|err| err.to_string())?;
                if !raw.trim().is_empty() {
                    match serde_json::from_str::<Value>(&raw) {
                        Ok(Value::Object(map)) => submission.form_data = Some(map),
                        _ => return Err("Invalid form_data JSON".to_string()),
                    }
                }
            }
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|err| err.to_string())?;
                documents.push(UploadedDocument::new(file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok((submission, documents))
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// HTTP status for a service failure; shared with `AppError`'s response mapping.
pub fn workflow_status(err: &AuditServiceError) -> StatusCode {
    match err {
        AuditServiceError::WorkPaperNotFound(_)
        | AuditServiceError::AttributeNotFound(_)
        | AuditServiceError::ConclusionNotFound(_)
        | AuditServiceError::NoConclusionForWorkPaper(_)
        | AuditServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AuditServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuditServiceError::InvalidInput(_)
        | AuditServiceError::Upload(UploadError::ExtensionNotAllowed(_))
        | AuditServiceError::Upload(UploadError::TooLarge { .. }) => StatusCode::BAD_REQUEST,
        AuditServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AuditServiceError::Upload(UploadError::Io(_))
        | AuditServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(err: AuditServiceError) -> Response {
    error_body(workflow_status(&err), err.to_string())
}
