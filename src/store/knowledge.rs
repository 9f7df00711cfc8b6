//! Knowledge base store
//!
//! Base create and delete round-trip through the server before any
//! local state changes; document bookkeeping is purely local, keyed by
//! metadata the upload endpoint hands back.

use crate::api::{KnowledgeApi, UploadRecord};
use crate::error::{QaChatError, Result};
use crate::store::persistence::{LocalStore, KNOWLEDGE_KEY};
use crate::store::{now_iso, timestamp_id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Id of the built-in knowledge base that can never be deleted
pub const DEFAULT_KB_ID: &str = "0";

const DEFAULT_KB_NAME: &str = "Default Knowledge Base";
const DEFAULT_KB_DESCRIPTION: &str = "Built-in default knowledge base";

/// A named collection of documents usable as retrieval context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "documentCount")]
    pub document_count: usize,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Metadata for one uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
    #[serde(rename = "fileKey", default)]
    pub file_key: String,
    #[serde(rename = "savedName", default)]
    pub saved_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: String,
}

impl Document {
    /// Build a document record from a server upload response
    ///
    /// The saved name doubles as the file key, it is the handle the
    /// server's delete endpoint takes.
    pub fn from_upload(record: &UploadRecord, origin: &str) -> Self {
        Self {
            id: timestamp_id(),
            name: record.original_name.clone(),
            size: record.size,
            uploaded_at: now_iso(),
            file_key: record.saved_name.clone(),
            saved_name: record.saved_name.clone(),
            path: record.file_path.clone(),
            download_url: format!("{}{}", origin, record.file_path),
        }
    }
}

/// How a delete request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Persisted shape of the whole store, matching the browser client's
/// `knowledge_data` record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KnowledgeData {
    #[serde(rename = "knowledgeBases")]
    knowledge_bases: Vec<KnowledgeBase>,
    #[serde(default)]
    documents: HashMap<String, Vec<Document>>,
}

/// Store of knowledge bases and their document lists
pub struct KnowledgeStore {
    data: KnowledgeData,
    active_id: String,
    local: LocalStore,
}

impl KnowledgeStore {
    /// Load knowledge data from the local store, seeding the default
    /// base when nothing (or nothing readable) is stored
    pub fn load(local: LocalStore) -> Self {
        let data: KnowledgeData = match local.load(KNOWLEDGE_KEY) {
            Ok(Some(data)) => data,
            Ok(None) => KnowledgeData::default(),
            Err(e) => {
                tracing::warn!("Failed to load knowledge data, starting fresh: {}", e);
                KnowledgeData::default()
            }
        };

        let mut store = Self {
            data,
            active_id: DEFAULT_KB_ID.to_string(),
            local,
        };
        store.ensure_active();
        store
    }

    /// All knowledge bases, default base first
    pub fn bases(&self) -> &[KnowledgeBase] {
        &self.data.knowledge_bases
    }

    /// Look up a base by id
    pub fn base(&self, id: &str) -> Option<&KnowledgeBase> {
        self.data.knowledge_bases.iter().find(|kb| kb.id == id)
    }

    /// Id of the active base
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// The active base, falling back to the first one
    pub fn active_base(&self) -> &KnowledgeBase {
        self.base(&self.active_id)
            .unwrap_or(&self.data.knowledge_bases[0])
    }

    /// Make the given base the active one
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Knowledge` if no base has that id
    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.base(id).is_none() {
            return Err(QaChatError::Knowledge(format!("No knowledge base with id {}", id)).into());
        }
        self.active_id = id.to_string();
        Ok(())
    }

    /// Documents held by the given base
    pub fn documents_for(&self, kb_id: &str) -> &[Document] {
        self.data
            .documents
            .get(kb_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Documents held by the active base
    pub fn active_documents(&self) -> &[Document] {
        self.documents_for(&self.active_id)
    }

    /// Create a knowledge base on the server, then record it locally
    ///
    /// Nothing is stored unless the server acknowledges, so a failed
    /// call leaves the list exactly as it was.
    pub async fn create_knowledge_base(
        &mut self,
        api: &dyn KnowledgeApi,
        name: &str,
        description: &str,
    ) -> Result<&KnowledgeBase> {
        let record = api.create_knowledge_base(name, description).await?;

        let base = KnowledgeBase {
            id: record.id,
            name: record.name,
            description: record.description,
            document_count: 0,
            created_at: now_iso(),
        };
        self.data.documents.insert(base.id.clone(), Vec::new());
        self.data.knowledge_bases.push(base);
        self.persist();

        let index = self.data.knowledge_bases.len() - 1;
        Ok(&self.data.knowledge_bases[index])
    }

    /// Delete a knowledge base after user confirmation
    ///
    /// The reserved default base and bases that still hold documents
    /// are rejected up front, before `confirm` runs and before any
    /// network traffic. A declined confirmation is a quiet no-op. The
    /// server must acknowledge the delete before local state changes;
    /// deleting the active base hands activity to the first remaining
    /// one, or back to the default id.
    pub async fn delete_knowledge_base<C>(
        &mut self,
        api: &dyn KnowledgeApi,
        id: &str,
        confirm: C,
    ) -> Result<DeleteOutcome>
    where
        C: FnOnce() -> bool,
    {
        if id == DEFAULT_KB_ID {
            return Err(QaChatError::Knowledge(
                "The default knowledge base cannot be deleted".to_string(),
            )
            .into());
        }
        let index = self
            .data
            .knowledge_bases
            .iter()
            .position(|kb| kb.id == id)
            .ok_or_else(|| QaChatError::Knowledge(format!("No knowledge base with id {}", id)))?;
        let remaining = self.documents_for(id).len();
        if remaining > 0 {
            return Err(QaChatError::Knowledge(format!(
                "Knowledge base {} still has {} documents, remove them first",
                id, remaining
            ))
            .into());
        }

        if !confirm() {
            return Ok(DeleteOutcome::Cancelled);
        }

        api.delete_knowledge_base(id).await?;

        self.data.knowledge_bases.remove(index);
        self.data.documents.remove(id);
        if self.active_id == id {
            self.active_id = match self.data.knowledge_bases.first() {
                Some(first) => first.id.clone(),
                None => DEFAULT_KB_ID.to_string(),
            };
        }
        self.persist();

        Ok(DeleteOutcome::Deleted)
    }

    /// Record a document in the given base and bump its count
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Knowledge` if no base has that id
    pub fn register_document(&mut self, kb_id: &str, document: Document) -> Result<()> {
        if self.base(kb_id).is_none() {
            return Err(
                QaChatError::Knowledge(format!("No knowledge base with id {}", kb_id)).into(),
            );
        }

        self.data
            .documents
            .entry(kb_id.to_string())
            .or_default()
            .push(document);
        self.sync_document_count(kb_id);
        self.persist();
        Ok(())
    }

    /// Drop a document from the given base and return its metadata
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Knowledge` if the base or the document
    /// does not exist
    pub fn remove_document(&mut self, kb_id: &str, document_id: &str) -> Result<Document> {
        if self.base(kb_id).is_none() {
            return Err(
                QaChatError::Knowledge(format!("No knowledge base with id {}", kb_id)).into(),
            );
        }

        let documents = self.data.documents.entry(kb_id.to_string()).or_default();
        let index = documents
            .iter()
            .position(|d| d.id == document_id)
            .ok_or_else(|| {
                QaChatError::Knowledge(format!(
                    "No document {} in knowledge base {}",
                    document_id, kb_id
                ))
            })?;

        let document = documents.remove(index);
        self.sync_document_count(kb_id);
        self.persist();
        Ok(document)
    }

    /// Restore the invariant that the active id points at a base
    fn ensure_active(&mut self) {
        if self.data.knowledge_bases.is_empty() {
            self.data.knowledge_bases.push(KnowledgeBase {
                id: DEFAULT_KB_ID.to_string(),
                name: DEFAULT_KB_NAME.to_string(),
                description: DEFAULT_KB_DESCRIPTION.to_string(),
                document_count: 0,
                created_at: now_iso(),
            });
            self.data
                .documents
                .entry(DEFAULT_KB_ID.to_string())
                .or_default();
            self.persist();
        }

        if self.base(&self.active_id).is_none() {
            self.active_id = self.data.knowledge_bases[0].id.clone();
        }
    }

    fn sync_document_count(&mut self, kb_id: &str) {
        let count = self.data.documents.get(kb_id).map(Vec::len).unwrap_or(0);
        if let Some(base) = self.data.knowledge_bases.iter_mut().find(|kb| kb.id == kb_id) {
            base.document_count = count;
        }
    }

    fn persist(&self) {
        if let Err(e) = self.local.save(KNOWLEDGE_KEY, &self.data) {
            tracing::warn!("Failed to persist knowledge data: {}", e);
        }
    }
}
