// Remote service contract - every side effect of the gateway goes through here
pub mod appwrite;
pub mod memory;
mod query;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use self::appwrite::AppwriteClient;
pub use self::memory::{MemoryBackend, Op};
pub use self::query::Query;

/// Id literal asking the service to generate a unique id.
pub const UNIQUE_ID: &str = "unique()";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed exchange: {0}")]
    Malformed(String),
}

/// A user account held by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
}

/// A stored document: system attributes plus the collection's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$collectionId", default)]
    pub collection_id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Decode into a typed model that names the fields it needs.
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    /// Look up a field, including the `$`-prefixed system attributes.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "$id" => Some(Value::String(self.id.clone())),
            "$createdAt" => Some(Value::String(self.created_at.to_rfc3339())),
            "$updatedAt" => Some(Value::String(self.updated_at.to_rfc3339())),
            _ => self.fields.get(name).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

/// File metadata returned after an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

/// A file about to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    /// Declared content type, else a guess from the file name.
    pub fn mime_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    Center,
    Top,
    Bottom,
}

impl Gravity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Center => "center",
            Gravity::Top => "top",
            Gravity::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: Gravity,
    pub quality: u8,
}

impl PreviewOptions {
    /// Preview used for post images.
    pub const POST_IMAGE: PreviewOptions = PreviewOptions {
        width: 2000,
        height: 2000,
        gravity: Gravity::Top,
        quality: 100,
    };
}

/// Backend trait - documents, sessions and files of the remote service
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create an account with a service-generated id
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, ServiceError>;

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError>;

    /// Account behind the active session
    async fn get_account(&self) -> Result<Account, ServiceError>;

    async fn delete_current_session(&self) -> Result<(), ServiceError>;

    /// Initials avatar for a display name; no request is made
    fn avatar_initials_url(&self, name: &str) -> Url;

    async fn create_document(
        &self,
        collection: &str,
        data: Value,
    ) -> Result<Document, ServiceError>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, ServiceError>;

    /// Partial update: only the given fields are replaced
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Document, ServiceError>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), ServiceError>;

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ServiceError>;

    async fn create_file(&self, upload: FileUpload) -> Result<StoredFile, ServiceError>;

    async fn file_preview(
        &self,
        file_id: &str,
        options: PreviewOptions,
    ) -> Result<Url, ServiceError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError>;
}

/// Type alias for the shared backend handle
pub type DynBackend = Arc<dyn Backend>;
