use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::audit::{audit_router, ServiceIdentity, UserId};

const BOUNDARY: &str = "workpaper-boundary";

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn multipart_request(fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/work-papers")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn balance_rule_payload() -> Value {
    json!({
        "name": "Minimum balance",
        "attribute_type": "validation_rule",
        "rule_type": "threshold",
        "rule_parameters": { "field": "balance", "operator": ">", "value": 100 }
    })
}

#[tokio::test]
async fn create_and_list_attributes() {
    let (service, _, _) = build_service();
    let router = audit_router(service);

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/attributes", balance_rule_payload()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["id"], json!(1));
    assert_eq!(created["attribute_type"], json!("validation_rule"));
    assert_eq!(created["rule_type"], json!("threshold"));

    let response = router
        .oneshot(empty_request("GET", "/api/attributes?skip=0&limit=10"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn attribute_mutations_forbidden_for_auditors() {
    let (service, _, _) =
        build_service_as(ServiceIdentity::auditor(UserId(4), "auditor@example.com"));
    let router = audit_router(service);

    let response = router
        .oneshot(json_request("POST", "/api/attributes", balance_rule_payload()))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_and_delete_attribute() {
    let (service, repository, _) = build_service();
    repository.seed_attribute(checklist_attribute(1, "Support", "Support attached", true));
    let router = audit_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/attributes/1",
            json!({ "is_required": false }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json_body(response).await;
    assert_eq!(updated["is_required"], json!(false));

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/api/attributes/1"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(empty_request("GET", "/api/attributes/1"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("Attribute not found"));
}

#[tokio::test]
async fn multipart_submission_then_audit() {
    let (service, _, documents) = build_service();
    service
        .create_attribute(
            serde_json::from_value(balance_rule_payload()).expect("definition payload"),
        )
        .expect("attribute created");
    let router = audit_router(service);

    let response = router
        .clone()
        .oneshot(multipart_request(
            &[("title", "Q4 cash"), ("form_data", r#"{"balance": 50}"#)],
            &[("ledger.pdf", &b"%PDF-1.7"[..])],
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let paper = read_json_body(response).await;
    assert_eq!(paper["status"], json!("pending"));
    assert_eq!(paper["file_paths"].as_array().map(Vec::len), Some(1));
    assert_eq!(documents.stored()[0].1.bytes, b"%PDF-1.7".to_vec());

    let response = router
        .clone()
        .oneshot(empty_request("POST", "/api/work-papers/1/audit"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let audited = read_json_body(response).await;
    assert_eq!(audited["status"], json!("audited"));

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/conclusions/work-papers/1/conclusion",
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let conclusion = read_json_body(response).await;
    assert_eq!(conclusion["overall_score"], json!(0.0));
    assert_eq!(conclusion["compliance_summary"]["failed"], json!(1));
    assert!(conclusion["cpa_conclusion_text"]
        .as_str()
        .expect("narrative text")
        .contains("**AUDIT CONCLUSION REPORT**"));
}

#[tokio::test]
async fn invalid_form_data_is_rejected() {
    let (service, _, _) = build_service();
    let router = audit_router(service.clone());

    let response = router
        .oneshot(multipart_request(
            &[("title", "Q4 cash"), ("form_data", "{not json")],
            &[],
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("Invalid form_data JSON"));
    assert!(service
        .list_work_papers(Default::default())
        .expect("listed")
        .is_empty());
}

#[tokio::test]
async fn disallowed_extension_is_bad_request() {
    let (service, _, _) = build_service();
    let router = audit_router(service);

    let response = router
        .oneshot(multipart_request(
            &[("title", "Q4 cash")],
            &[("script.sh", &b"echo"[..])],
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("File type .sh not allowed"));
}

#[tokio::test]
async fn missing_resources_return_not_found() {
    let (service, _, _) = build_service();
    let router = audit_router(service);

    for (method, uri, message) in [
        ("GET", "/api/work-papers/42", "Work paper not found"),
        ("POST", "/api/work-papers/42/audit", "Work paper not found"),
        ("GET", "/api/conclusions/42", "Conclusion not found"),
        (
            "GET",
            "/api/conclusions/work-papers/42/conclusion",
            "Conclusion not found for this work paper",
        ),
    ] {
        let response = router
            .clone()
            .oneshot(empty_request(method, uri))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        let body = read_json_body(response).await;
        assert_eq!(body["error"], json!(message));
    }
}

#[tokio::test]
async fn list_work_papers_returns_seeded_rows() {
    let (service, repository, _) = build_service();
    repository.seed_work_paper(work_paper(1, json!({ "balance": 1 }), &[]));
    repository.seed_work_paper(work_paper(2, json!({ "balance": 2 }), &[]));
    let router = audit_router(service);

    let response = router
        .oneshot(empty_request("GET", "/api/work-papers?skip=1"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["id"], json!(2));
}

#[tokio::test]
async fn malformed_requests_answer_with_json_errors() {
    let (service, _, _) = build_service();
    let router = audit_router(service);

    let cases = [
        (
            json_request("POST", "/api/attributes", json!({ "name": "No type" })),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            empty_request("GET", "/api/attributes/not-a-number"),
            StatusCode::BAD_REQUEST,
        ),
        (
            empty_request("GET", "/api/work-papers?limit=many"),
            StatusCode::BAD_REQUEST,
        ),
        (
            json_request("POST", "/api/work-papers", json!({ "title": "Not multipart" })),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (request, status) in cases {
        let uri = request.uri().to_string();
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        assert_eq!(response.status(), status, "{uri}");
        let body = read_json_body(response).await;
        assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()), "{uri}");
    }
}
