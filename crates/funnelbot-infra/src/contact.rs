//! Flat-file contact store.
//!
//! The whole CRM is one JSON array at `{data_dir}/contacts.json`, cached in a
//! `DashMap` and rewritten atomically (temp file + rename) after each change.

use std::path::{Path, PathBuf};

use chrono::Utc;
use dashmap::DashMap;
use funnelbot_core::port::ContactStore;
use funnelbot_types::contact::ContactRecord;
use funnelbot_types::error::ContactStoreError;
use tokio::sync::Mutex;

pub const CONTACTS_FILE: &str = "contacts.json";

#[derive(Debug)]
pub struct JsonContactStore {
    path: PathBuf,
    contacts: DashMap<String, ContactRecord>,
    /// Serializes file rewrites.
    write_lock: Mutex<()>,
}

impl JsonContactStore {
    /// Load the store from `path`; a missing file is an empty CRM.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ContactStoreError> {
        let path = path.into();
        let contacts = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => {}
            Ok(content) => {
                let records: Vec<ContactRecord> =
                    serde_json::from_str(&content).map_err(|e| ContactStoreError::Serialization(e.to_string()))?;
                for record in records {
                    contacts.insert(record.id.clone(), record);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No contact file at {}, starting empty", path.display());
            }
            Err(err) => return Err(ContactStoreError::Storage(err.to_string())),
        }

        tracing::info!(contacts = contacts.len(), path = %path.display(), "contact store loaded");
        Ok(Self {
            path,
            contacts,
            write_lock: Mutex::new(()),
        })
    }

    /// Open `{data_dir}/contacts.json`.
    pub async fn open_in(data_dir: &Path) -> Result<Self, ContactStoreError> {
        Self::open(data_dir.join(CONTACTS_FILE)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, user_id: &str) -> Option<ContactRecord> {
        self.contacts.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Record the display name the chat network reported.
    pub async fn set_name(&self, user_id: &str, name: &str) -> Result<(), ContactStoreError> {
        {
            let mut record = self
                .contacts
                .entry(user_id.to_string())
                .or_insert_with(|| ContactRecord::new(user_id, Utc::now()));
            if record.name.as_deref() == Some(name) {
                return Ok(());
            }
            record.name = Some(name.to_string());
            record.updated_at = Utc::now();
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), ContactStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records: Vec<ContactRecord> = self.contacts.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let json =
            serde_json::to_string_pretty(&records).map_err(|e| ContactStoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ContactStoreError::Storage(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ContactStoreError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ContactStoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl ContactStore for JsonContactStore {
    async fn get_or_create(&self, user_id: &str) -> Result<ContactRecord, ContactStoreError> {
        if let Some(record) = self.get(user_id) {
            return Ok(record);
        }
        let record = self
            .contacts
            .entry(user_id.to_string())
            .or_insert_with(|| ContactRecord::new(user_id, Utc::now()))
            .clone();
        self.persist().await?;
        Ok(record)
    }

    async fn set_tags(&self, user_id: &str, tags: Vec<String>) -> Result<(), ContactStoreError> {
        {
            let mut record = self
                .contacts
                .entry(user_id.to_string())
                .or_insert_with(|| ContactRecord::new(user_id, Utc::now()));
            record.tags = tags;
            record.updated_at = Utc::now();
        }
        self.persist().await
    }
}
