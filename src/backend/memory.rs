//! In-process backend.
//!
//! Keeps accounts, one session, documents and files in memory and evaluates
//! the same query clauses as the remote service. Faults can be queued per
//! operation and every call is recorded, which is what the gateway tests use
//! to check compensation and fail-fast behavior.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::Mutex;
use url::Url;

use super::{
    Account, Backend, Document, DocumentList, FileUpload, PreviewOptions, Query, ServiceError,
    Session, StoredFile,
};

/// Default page size applied when a listing carries no limit.
const DEFAULT_LIMIT: usize = 25;

/// Backend operations, as recorded in the call log and targeted by faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSession,
    CreateDocument,
    GetDocument,
    UpdateDocument,
    DeleteDocument,
    ListDocuments,
    CreateFile,
    FilePreview,
    DeleteFile,
}

struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    last_tick: Option<DateTime<Utc>>,
    accounts: Vec<StoredAccount>,
    session: Option<Session>,
    collections: HashMap<String, BTreeMap<String, Document>>,
    files: HashMap<String, (StoredFile, Bytes)>,
    faults: HashMap<Op, VecDeque<ServiceError>>,
    calls: Vec<Op>,
}

impl MemoryState {
    /// Strictly increasing timestamps so ordering by time is total.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn enter(&mut self, op: Op) -> Result<(), ServiceError> {
        self.calls.push(op);
        match self.faults.get_mut(&op).and_then(|queue| queue.pop_front()) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn collection(&mut self, name: &str) -> &mut BTreeMap<String, Document> {
        self.collections.entry(name.to_string()).or_default()
    }
}

pub struct MemoryBackend {
    endpoint: Url,
    project_id: String,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new(endpoint: Url, project_id: impl Into<String>) -> Self {
        Self {
            endpoint,
            project_id: project_id.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Make the next call of `op` fail with `fault`. Faults queue up.
    pub async fn fail_next(&self, op: Op, fault: ServiceError) {
        let mut state = self.state.lock().await;
        state.faults.entry(op).or_default().push_back(fault);
    }

    /// Every operation issued so far, in order.
    pub async fn calls(&self) -> Vec<Op> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn file_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut ids: Vec<String> = state.files.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn has_file(&self, file_id: &str) -> bool {
        self.state.lock().await.files.contains_key(file_id)
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base, path.trim_start_matches('/')));
        url
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        let endpoint = Url::parse("http://localhost/v1").expect("static URL is valid");
        Self::new(endpoint, "local")
    }
}

fn generate_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

fn object(data: Value) -> Result<Map<String, Value>, ServiceError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::Rejected {
            status: 400,
            message: format!("document data must be an object, got {}", other),
        }),
    }
}

fn attribute_matches(value: Option<&Value>, wanted: &[Value]) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(|item| wanted.contains(item)),
        Some(value) => wanted.contains(value),
        None => false,
    }
}

fn search_matches(value: Option<&Value>, term: &str) -> bool {
    let Some(Value::String(text)) = value else {
        return false;
    };
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    term.split_whitespace()
        .map(|t| t.to_lowercase())
        .any(|t| words.iter().any(|w| w.starts_with(&t)))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_by(attribute: &str, a: &Document, b: &Document) -> Ordering {
    match attribute {
        "$createdAt" => a.created_at.cmp(&b.created_at),
        "$updatedAt" => a.updated_at.cmp(&b.updated_at),
        "$id" => a.id.cmp(&b.id),
        _ => compare_values(a.fields.get(attribute), b.fields.get(attribute)),
    }
}

/// Evaluate filters, ordering, cursor and limit over one collection.
fn run_queries(docs: Vec<Document>, queries: &[Query]) -> Result<DocumentList, ServiceError> {
    let mut matched: Vec<Document> = docs
        .into_iter()
        .filter(|doc| {
            queries.iter().all(|query| match query {
                Query::Equal { attribute, values } => {
                    attribute_matches(doc.attribute(attribute).as_ref(), values)
                }
                Query::Search { attribute, term } => {
                    search_matches(doc.fields.get(attribute), term)
                }
                _ => true,
            })
        })
        .collect();

    let orders: Vec<(&str, bool)> = queries
        .iter()
        .filter_map(|query| match query {
            Query::OrderAsc(attribute) => Some((attribute.as_str(), false)),
            Query::OrderDesc(attribute) => Some((attribute.as_str(), true)),
            _ => None,
        })
        .collect();

    matched.sort_by(|a, b| {
        for (attribute, descending) in &orders {
            let ordering = compare_by(attribute, a, b);
            let ordering = if *descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.created_at.cmp(&b.created_at)
    });

    let total = matched.len() as u64;

    let mut start = 0;
    for query in queries {
        if let Query::CursorAfter(cursor) = query {
            let position = matched
                .iter()
                .position(|doc| &doc.id == cursor)
                .ok_or_else(|| ServiceError::Rejected {
                    status: 400,
                    message: format!("cursor document {} not found", cursor),
                })?;
            start = position + 1;
        }
    }

    let limit = queries
        .iter()
        .rev()
        .find_map(|query| match query {
            Query::Limit(limit) => Some(*limit as usize),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIMIT);

    let documents = matched.into_iter().skip(start).take(limit).collect();
    Ok(DocumentList { total, documents })
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::CreateAccount)?;

        if state.accounts.iter().any(|a| a.account.email == email) {
            return Err(ServiceError::Rejected {
                status: 409,
                message: format!("an account with email {} already exists", email),
            });
        }

        let account = Account {
            id: generate_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.accounts.push(StoredAccount {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::CreateSession)?;

        let user_id = state
            .accounts
            .iter()
            .find(|a| a.account.email == email && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".into()))?;

        let now = state.tick();
        let session = Session {
            id: generate_id(),
            user_id,
            expire: Some(now + Duration::days(365)),
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn get_account(&self) -> Result<Account, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::GetAccount)?;

        let session = state
            .session
            .clone()
            .ok_or_else(|| ServiceError::Unauthorized("no active session".into()))?;
        state
            .accounts
            .iter()
            .find(|a| a.account.id == session.user_id)
            .map(|a| a.account.clone())
            .ok_or_else(|| ServiceError::Unauthorized("session account is gone".into()))
    }

    async fn delete_current_session(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::DeleteSession)?;

        state
            .session
            .take()
            .map(|_| ())
            .ok_or_else(|| ServiceError::Unauthorized("no active session".into()))
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
        let mut state = self.state.lock().await;
        state.enter(Op::CreateDocument)?;

        let fields = object(data)?;
        let now = state.tick();
        let document = Document {
            id: generate_id(),
            collection_id: collection.to_string(),
            created_at: now,
            updated_at: now,
            fields,
        };
        state
            .collection(collection)
            .insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::GetDocument)?;

        state
            .collection(collection)
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("document {} in {}", id, collection)))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Document, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::UpdateDocument)?;

        let fields = object(data)?;
        let now = state.tick();
        let document = state
            .collection(collection)
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("document {} in {}", id, collection)))?;
        document.fields.extend(fields);
        document.updated_at = now;
        Ok(document.clone())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::DeleteDocument)?;

        state
            .collection(collection)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("document {} in {}", id, collection)))
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::ListDocuments)?;

        let docs: Vec<Document> = state.collection(collection).values().cloned().collect();
        run_queries(docs, queries)
    }

    async fn create_file(&self, upload: FileUpload) -> Result<StoredFile, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::CreateFile)?;

        let file = StoredFile {
            id: generate_id(),
            name: upload.name.clone(),
            mime_type: upload.mime_type(),
            size: upload.data.len() as u64,
        };
        state
            .files
            .insert(file.id.clone(), (file.clone(), upload.data));
        Ok(file)
    }

    async fn file_preview(
        &self,
        file_id: &str,
        options: PreviewOptions,
    ) -> Result<Url, ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::FilePreview)?;

        if !state.files.contains_key(file_id) {
            return Err(ServiceError::NotFound(format!("file {}", file_id)));
        }

        let mut url = self.url(&format!("storage/buckets/local/files/{}/preview", file_id));
        url.query_pairs_mut()
            .append_pair("width", &options.width.to_string())
            .append_pair("height", &options.height.to_string())
            .append_pair("gravity", options.gravity.as_str())
            .append_pair("quality", &options.quality.to_string())
            .append_pair("project", &self.project_id);
        Ok(url)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.enter(Op::DeleteFile)?;

        state
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("file {}", file_id)))
    }
}
