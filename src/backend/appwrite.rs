//! Appwrite REST implementation of [`Backend`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{
    Account, Backend, Document, DocumentList, FileUpload, PreviewOptions, Query, ServiceError,
    Session, StoredFile, UNIQUE_ID,
};
use crate::config::BackendConfig;

const RESPONSE_FORMAT: &str = "1.5.0";

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: Url,
    project_id: String,
    database_id: String,
    bucket_id: String,
}

impl AppwriteClient {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert("X-Appwrite-Project", HeaderValue::from_str(&config.project_id)?);
        headers.insert(
            "X-Appwrite-Response-Format",
            HeaderValue::from_static(RESPONSE_FORMAT),
        );

        // The cookie store holds the session, like the browser SDK does
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            bucket_id: config.bucket_id.clone(),
        })
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base, path.trim_start_matches('/')));
        url
    }

    fn documents_url(&self, collection: &str) -> Url {
        self.url(&format!(
            "databases/{}/collections/{}/documents",
            self.database_id, collection
        ))
    }

    fn document_url(&self, collection: &str, id: &str) -> Url {
        self.url(&format!(
            "databases/{}/collections/{}/documents/{}",
            self.database_id, collection, id
        ))
    }

    fn file_url(&self, file_id: &str) -> Url {
        self.url(&format!("storage/buckets/{}/files/{}", self.bucket_id, file_id))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = request.send().await.map_err(|e| {
            tracing::debug!("Request to backend failed: {}", e);
            ServiceError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ServiceError> {
        self.execute(request).await.map(|_| ())
    }
}

/// Map a failed response onto the service error taxonomy.
pub fn classify(status: StatusCode, body: &str) -> ServiceError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = match parsed {
        Some(b) if !b.message.is_empty() && !b.kind.is_empty() => {
            format!("{} ({})", b.message, b.kind)
        }
        Some(b) if !b.message.is_empty() => b.message,
        _ if !body.is_empty() => body.to_string(),
        _ => status.to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ServiceError::Unavailable(message)
        }
        s if s.is_server_error() => ServiceError::Unavailable(message),
        s => ServiceError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl Backend for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, ServiceError> {
        let body = json!({
            "userId": UNIQUE_ID,
            "email": email,
            "password": password,
            "name": name,
        });
        self.send(self.http.post(self.url("account")).json(&body))
            .await
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.http.post(self.url("account/sessions/email")).json(&body))
            .await
    }

    async fn get_account(&self) -> Result<Account, ServiceError> {
        self.send(self.http.get(self.url("account"))).await
    }

    async fn delete_current_session(&self) -> Result<(), ServiceError> {
        self.send_empty(self.http.delete(self.url("account/sessions/current")))
            .await
    }

    fn avatar_initials_url(&self, name: &str) -> Url {
        let mut url = self.url("avatars/initials");
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.project_id);
        url
    }

    async fn create_document(
        &self,
        collection: &str,
        data: Value,
    ) -> Result<Document, ServiceError> {
        let body = json!({ "documentId": UNIQUE_ID, "data": data });
        self.send(self.http.post(self.documents_url(collection)).json(&body))
            .await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, ServiceError> {
        self.send(self.http.get(self.document_url(collection, id)))
            .await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Document, ServiceError> {
        let body = json!({ "data": data });
        self.send(self.http.patch(self.document_url(collection, id)).json(&body))
            .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), ServiceError> {
        self.send_empty(self.http.delete(self.document_url(collection, id)))
            .await
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ServiceError> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|q| ("queries[]", q.to_string()))
            .collect();
        self.send(self.http.get(self.documents_url(collection)).query(&params))
            .await
    }

    async fn create_file(&self, upload: FileUpload) -> Result<StoredFile, ServiceError> {
        let mime = upload.mime_type();
        let part = Part::bytes(upload.data.to_vec())
            .file_name(upload.name)
            .mime_str(&mime)
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let form = Form::new().text("fileId", UNIQUE_ID).part("file", part);

        let url = self.url(&format!("storage/buckets/{}/files", self.bucket_id));
        self.send(self.http.post(url).multipart(form)).await
    }

    async fn file_preview(
        &self,
        file_id: &str,
        options: PreviewOptions,
    ) -> Result<Url, ServiceError> {
        if file_id.is_empty() {
            return Err(ServiceError::Malformed("empty file id".into()));
        }

        let mut url = self.file_url(file_id);
        let path = format!("{}/preview", url.path());
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("width", &options.width.to_string())
            .append_pair("height", &options.height.to_string())
            .append_pair("gravity", options.gravity.as_str())
            .append_pair("quality", &options.quality.to_string())
            .append_pair("project", &self.project_id);
        Ok(url)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        self.send_empty(self.http.delete(self.file_url(file_id)))
            .await
    }
}
