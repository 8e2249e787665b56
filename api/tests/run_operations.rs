//! End-to-end runs of catalog operations against a mock server.

mod common;

use std::io::Write;

use api_runtime::diagnostics::Diagnostic;
use api_runtime::error::{ApiError, RequestError, ResponseError};
use api_runtime::value::BodyMap;
use api_runtime::{BodyValue, RunOptions, RunResult};
use serde_json::{json, Value};
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, collecting};

fn sent_json(request: &wiremock::Request) -> Value {
    serde_json::from_slice(&request.body).expect("request body is JSON")
}

#[tokio::test]
async fn test_create_sends_mapped_json_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/advertiser"))
        .and(header("x-adzerk-apikey", "secret"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 12,
            "Title": "Acme",
            "IsActive": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .run(
            "Advertiser",
            "create",
            json!({ "Title": "Acme", "is_active": true, "createdOn": "2021-09-01T10:00:00+02:00" }),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        RunResult::Json(json!({ "id": 12, "title": "Acme", "isActive": true }))
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        sent_json(&requests[0]),
        json!({ "title": "Acme", "isActive": true, "createdOn": "2021-09-01T08:00:00Z" })
    );
    let marker = requests[0].headers.get("x-client-version").unwrap();
    assert!(marker.to_str().unwrap().starts_with("api-runtime/"));
}

#[tokio::test]
async fn test_query_and_header_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/advertiser"))
        .and(query_param("page", "1"))
        .and(query_param("pageSize", "10"))
        .and(header("x-request-source", "tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{ "Id": 1, "Title": "Acme" }],
            "TotalItems": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (sink, collected) = collecting();
    let result = client(&server)
        .run(
            "advertiser",
            "list",
            json!({ "pageSize": 10, "X-Request-Source": "tests" }),
            &RunOptions::new().diagnostics(sink),
        )
        .await
        .unwrap();

    assert_eq!(
        result.into_json(),
        json!({ "items": [{ "id": 1, "title": "Acme" }], "totalItems": 1 })
    );
    assert!(collected.diagnostics().is_empty());
}

#[tokio::test]
async fn test_invalid_body_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .run(
            "advertiser",
            "create",
            json!({ "title": 5, "isActive": "yes" }),
            &RunOptions::default(),
        )
        .await
        .unwrap_err();

    let ApiError::Request(RequestError::InvalidBody { operation, failure }) = err else {
        panic!("expected invalid body, got {err:?}");
    };
    assert_eq!(operation, "advertiser.create");
    assert_eq!(failure.failed_children().count(), 2);
    assert!(failure
        .leaf_messages()
        .contains(&"`isActive` must be a valid boolean"));
}

#[tokio::test]
async fn test_missing_path_parameter() {
    let server = MockServer::start().await;
    let err = client(&server)
        .run("advertiser", "get", json!({}), &RunOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required path parameter id for advertiser.get"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_property_is_reported_and_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/advertiser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 1 })))
        .mount(&server)
        .await;

    let (sink, collected) = collecting();
    client(&server)
        .run(
            "advertiser",
            "create",
            json!({ "title": "Acme", "color": "red" }),
            &RunOptions::new().diagnostics(sink),
        )
        .await
        .unwrap();

    assert_eq!(
        collected.diagnostics(),
        vec![Diagnostic::UnsupportedProperty {
            property: "color".to_string(),
            path: "body".to_string(),
        }]
    );
    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        sent_json(&requests[0]),
        json!({ "title": "Acme", "isActive": true })
    );
}

#[tokio::test]
async fn test_omitted_property_takes_its_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/advertiser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .run(
            "advertiser",
            "create",
            json!({ "title": "x" }),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.into_json(), json!({ "id": 3 }));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(sent_json(&requests[0]), json!({ "title": "x", "isActive": true }));
}

#[tokio::test]
async fn test_error_status_surfaces_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/advertiser/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "no such advertiser" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .run("advertiser", "get", json!({ "id": 404 }), &RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    let ApiError::Response(ResponseError::Status { body, .. }) = err else {
        panic!("expected status error");
    };
    assert_eq!(body, json!({ "message": "no such advertiser" }));
}

#[tokio::test]
async fn test_operation_from_second_document_returns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/advertiser/7"))
        .and(header("x-adzerk-apikey", "secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .run("advertiser", "delete", json!({ "id": 7 }), &RunOptions::default())
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_fetch_before_send_overlays_caller_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/advertiser/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 5,
            "Title": "Old title",
            "IsActive": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/advertiser/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 5,
            "Title": "x",
            "IsActive": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::builder(&server)
        .fetch_before_send("advertiser", "update", "id")
        .build()
        .unwrap();
    let result = client
        .run("advertiser", "update", json!({ "id": 5, "title": "x" }), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(result.into_json()["title"], json!("x"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method.as_str(), "GET");
    assert!(requests[0].body.is_empty());
    assert_eq!(requests[1].method.as_str(), "PUT");
    assert_eq!(
        sent_json(&requests[1]),
        json!({ "id": 5, "title": "x", "isActive": true })
    );
}

#[tokio::test]
async fn test_multipart_upload_reads_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/creative/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 99 })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR").unwrap();
    let body = BodyMap::from([
        ("name".to_string(), BodyValue::from("banner")),
        ("image".to_string(), BodyValue::path(file.path())),
    ]);

    let result = client(&server)
        .run("creative", "upload", body, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(result.into_json(), json!({ "id": 99 }));

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0].headers.get("content-type").unwrap();
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = &requests[0].body;
    let contains = |needle: &[u8]| body.windows(needle.len()).any(|w| w == needle);
    assert!(contains(b"banner"));
    assert!(contains(b"image/png"));
    assert!(contains(b"filename=\"temp.png\""));
}

#[tokio::test]
async fn test_unknown_resource() {
    let server = MockServer::start().await;
    let err = client(&server)
        .run("campaign", "list", json!({}), &RunOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown resource: campaign");
}
