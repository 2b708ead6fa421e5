use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::FileUpload;

/// Anything stored as a document with its own id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A relationship field: a bare id, or the related document when the
/// service expands it on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Expanded(Box<T>),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id.as_str(),
            Ref::Expanded(doc) => doc.id(),
        }
    }

    pub fn expanded(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Expanded(doc) => Some(doc.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub liked: Vec<Ref<Post>>,
}

impl Identified for UserProfile {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub creator: Option<Ref<UserProfile>>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<Ref<UserProfile>>,
}

impl Identified for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Post {
    pub fn liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|r| r.id() == user_id)
    }
}

/// Join record between a user and a post they saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    pub user: Ref<UserProfile>,
    pub post: Ref<Post>,
}

impl Identified for SaveRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One page (or the whole result) of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub documents: Vec<T>,
    pub total: u64,
}

impl<T: Identified> Listing<T> {
    /// Cursor for the page after this one; `None` once a page comes back empty.
    pub fn next_cursor(&self) -> Option<&str> {
        self.documents.last().map(|doc| doc.id())
    }
}

// --- Inputs ---

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub account_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: String,
    pub caption: String,
    pub file: FileUpload,
    pub location: Option<String>,
    /// Free text, comma separated
    pub tags: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePost {
    pub post_id: String,
    pub caption: String,
    /// Current image; replaced when `file` is set
    pub image_url: String,
    pub image_id: String,
    pub file: Option<FileUpload>,
    pub location: Option<String>,
    pub tags: Option<String>,
}
