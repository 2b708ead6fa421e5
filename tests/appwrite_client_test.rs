//! REST client against a local fake of the document/session/file service
//!
//! The fake echoes what it received back inside its responses, so each test
//! can check the request shape from the decoded result.

use axum::extract::{Multipart, Path, RawQuery};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use zin::backend::{AppwriteClient, Backend, FileUpload, Query, ServiceError};
use zin::config::BackendConfig;

const TIMESTAMP: &str = "2024-01-01T00:00:00.000+00:00";
const SESSION_COOKIE: &str = "a_session_proj=token123";

fn error_body(status: StatusCode, message: &str, kind: &str) -> Response {
    (
        status,
        Json(json!({ "message": message, "code": status.as_u16(), "type": kind })),
    )
        .into_response()
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// FAKE SERVICE
// ============================================================================

async fn create_account(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@x.com" {
        return error_body(
            StatusCode::CONFLICT,
            "A user with the same email already exists",
            "user_already_exists",
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "$id": body["userId"],
            "name": body["name"],
            "email": body["email"],
        })),
    )
        .into_response()
}

async fn create_session(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return error_body(
            StatusCode::UNAUTHORIZED,
            "Invalid credentials",
            "user_invalid_credentials",
        );
    }
    (
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            format!("{}; Path=/; HttpOnly", SESSION_COOKIE),
        )],
        Json(json!({ "$id": "s1", "userId": "acc1", "expire": TIMESTAMP })),
    )
        .into_response()
}

async fn get_account(headers: HeaderMap) -> Response {
    if !header_text(&headers, "cookie").contains(SESSION_COOKIE) {
        return error_body(
            StatusCode::UNAUTHORIZED,
            "User (role: guests) missing scope (account)",
            "general_unauthorized_scope",
        );
    }
    Json(json!({ "$id": "acc1", "name": "Ada", "email": "ada@x.com" })).into_response()
}

async fn delete_session() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn document(id: &str, collection: &str, fields: Value) -> Value {
    let mut doc = json!({
        "$id": id,
        "$collectionId": collection,
        "$createdAt": TIMESTAMP,
        "$updatedAt": TIMESTAMP,
    });
    if let (Some(doc), Some(fields)) = (doc.as_object_mut(), fields.as_object()) {
        doc.extend(fields.clone());
    }
    doc
}

async fn create_document(
    Path((database, collection)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let doc = document(
        "d1",
        &collection,
        json!({
            "database": database,
            "documentId": body["documentId"],
            "data": body["data"],
            "project": header_text(&headers, "x-appwrite-project"),
            "format": header_text(&headers, "x-appwrite-response-format"),
        }),
    );
    (StatusCode::CREATED, Json(doc)).into_response()
}

async fn list_documents(
    Path((_database, collection)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    let raw = query.unwrap_or_default();
    let queries: Vec<Value> = url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "queries[]")
        .map(|(_, value)| serde_json::from_str(&value).unwrap_or(Value::Null))
        .collect();
    Json(json!({
        "total": 42,
        "documents": [document("d1", &collection, json!({ "queries": queries }))],
    }))
}

async fn get_document(Path((_database, collection, id)): Path<(String, String, String)>) -> Response {
    match id.as_str() {
        "gone" => error_body(
            StatusCode::NOT_FOUND,
            "Document with the requested ID could not be found.",
            "document_not_found",
        ),
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "internal").into_response(),
        "garbled" => (StatusCode::OK, "not json").into_response(),
        _ => Json(document(&id, &collection, json!({ "caption": "hi" }))).into_response(),
    }
}

async fn update_document(
    Path((_database, collection, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    Json(document(&id, &collection, body["data"].clone()))
}

async fn delete_document(
    Path((_database, _collection, id)): Path<(String, String, String)>,
) -> Response {
    if id == "gone" {
        return error_body(StatusCode::NOT_FOUND, "missing", "document_not_found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn upload_file(Path(bucket): Path<String>, mut multipart: Multipart) -> Response {
    let mut file_id = String::new();
    let mut name = String::new();
    let mut mime = String::new();
    let mut size = 0usize;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("fileId") => file_id = field.text().await.unwrap_or_default(),
            Some("file") => {
                name = field.file_name().unwrap_or_default().to_string();
                mime = field.content_type().unwrap_or_default().to_string();
                size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            }
            _ => {}
        }
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "$id": file_id,
            "bucketId": bucket,
            "name": name,
            "mimeType": mime,
            "sizeOriginal": size,
        })),
    )
        .into_response()
}

async fn delete_file(Path((_bucket, id)): Path<(String, String)>) -> Response {
    if id == "locked" {
        return error_body(StatusCode::FORBIDDEN, "No permission", "user_unauthorized");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_fake() -> String {
    let app = Router::new()
        .route("/v1/account", post(create_account).get(get_account))
        .route("/v1/account/sessions/email", post(create_session))
        .route("/v1/account/sessions/current", delete(delete_session))
        .route(
            "/v1/databases/{database}/collections/{collection}/documents",
            post(create_document).get(list_documents),
        )
        .route(
            "/v1/databases/{database}/collections/{collection}/documents/{id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/v1/storage/buckets/{bucket}/files", post(upload_file))
        .route("/v1/storage/buckets/{bucket}/files/{id}", delete(delete_file));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn client_for(endpoint: String) -> AppwriteClient {
    let config = BackendConfig {
        endpoint,
        project_id: "proj".into(),
        database_id: "db".into(),
        bucket_id: "media".into(),
        ..BackendConfig::default()
    };
    AppwriteClient::new(&config).unwrap()
}

async fn client() -> AppwriteClient {
    client_for(spawn_fake().await)
}

// ============================================================================
// ACCOUNTS AND SESSIONS
// ============================================================================

#[tokio::test]
async fn create_account_asks_for_generated_id() {
    let c = client().await;
    let account = c.create_account("ada@x.com", "secret", "Ada").await.unwrap();
    assert_eq!(account.id, "unique()");
    assert_eq!(account.name, "Ada");
}

#[tokio::test]
async fn duplicate_account_is_rejected_with_remote_status() {
    let c = client().await;
    let err = c
        .create_account("taken@x.com", "secret", "Ada")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Rejected {
            status: 409,
            message: "A user with the same email already exists (user_already_exists)".into(),
        }
    );
}

#[tokio::test]
async fn session_cookie_is_sent_on_later_calls() {
    let c = client().await;

    let err = c.get_account().await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let session = c.create_email_session("ada@x.com", "secret").await.unwrap();
    assert_eq!(session.user_id, "acc1");

    let account = c.get_account().await.unwrap();
    assert_eq!(account.id, "acc1");

    c.delete_current_session().await.unwrap();
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let c = client().await;
    let err = c.create_email_session("ada@x.com", "nope").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(m) if m.contains("user_invalid_credentials")));
}

// ============================================================================
// DOCUMENTS
// ============================================================================

#[tokio::test]
async fn create_document_sends_project_headers_and_wrapped_data() {
    let c = client().await;
    let doc = c
        .create_document("posts", json!({ "caption": "hi", "tags": ["a"] }))
        .await
        .unwrap();

    assert_eq!(doc.collection_id, "posts");
    assert_eq!(doc.fields["database"], "db");
    assert_eq!(doc.fields["documentId"], "unique()");
    assert_eq!(doc.fields["data"], json!({ "caption": "hi", "tags": ["a"] }));
    assert_eq!(doc.fields["project"], "proj");
    assert_eq!(doc.fields["format"], "1.5.0");
}

#[tokio::test]
async fn list_documents_sends_each_query_as_json() {
    let c = client().await;
    let list = c
        .list_documents(
            "posts",
            &[
                Query::order_desc("$updatedAt"),
                Query::limit(10),
                Query::cursor_after("p9"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(list.total, 42);
    assert_eq!(
        list.documents[0].fields["queries"],
        json!([
            { "method": "orderDesc", "attribute": "$updatedAt" },
            { "method": "limit", "values": [10] },
            { "method": "cursorAfter", "values": ["p9"] },
        ])
    );
}

#[tokio::test]
async fn update_document_patches_only_given_fields() {
    let c = client().await;
    let doc = c
        .update_document("posts", "p1", json!({ "likes": ["u1"] }))
        .await
        .unwrap();
    assert_eq!(doc.id, "p1");
    assert_eq!(doc.fields["likes"], json!(["u1"]));
    assert!(!doc.fields.contains_key("caption"));
}

#[tokio::test]
async fn status_codes_map_onto_service_errors() {
    let c = client().await;

    let err = c.get_document("posts", "gone").await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::NotFound(
            "Document with the requested ID could not be found. (document_not_found)".into()
        )
    );

    let err = c.get_document("posts", "boom").await.unwrap_err();
    assert_eq!(err, ServiceError::Unavailable("internal".into()));

    let err = c.get_document("posts", "garbled").await.unwrap_err();
    assert!(matches!(err, ServiceError::Malformed(_)));

    let err = c.delete_document("posts", "gone").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    c.delete_document("posts", "p1").await.unwrap();
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let c = client_for(format!("http://{}/v1", addr));
    let err = c.get_account().await.unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));
}

// ============================================================================
// FILES
// ============================================================================

#[tokio::test]
async fn upload_sends_multipart_with_generated_id() {
    let c = client().await;
    let stored = c
        .create_file(FileUpload::new("cat.png", vec![1u8, 2, 3, 4]))
        .await
        .unwrap();

    assert_eq!(stored.id, "unique()");
    assert_eq!(stored.name, "cat.png");
    assert_eq!(stored.mime_type, "image/png");
    assert_eq!(stored.size, 4);
}

#[tokio::test]
async fn declared_content_type_wins_over_extension() {
    let c = client().await;
    let upload = FileUpload {
        content_type: Some("image/webp".into()),
        ..FileUpload::new("photo.bin", vec![0u8; 8])
    };
    let stored = c.create_file(upload).await.unwrap();
    assert_eq!(stored.mime_type, "image/webp");
}

#[tokio::test]
async fn delete_file_reports_permission_errors() {
    let c = client().await;
    c.delete_file("f1").await.unwrap();

    let err = c.delete_file("locked").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}
