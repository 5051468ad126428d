//! In-memory store for exercising resolution and sync logic without a git
//! binary or a remote.

use crate::errors::StoreError;
use crate::store::RepositoryStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    hashes: Mutex<HashMap<String, String>>,
    broken_files: Mutex<HashSet<(String, String)>>,
    failing_pulls: Mutex<HashSet<String>>,
    pulled: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn put_file(&self, label: &str, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .expect("files lock")
            .insert((label.to_string(), path.to_string()), bytes.to_vec());
    }

    pub fn set_commit_hash(&self, label: &str, hash: &str) {
        self.hashes
            .lock()
            .expect("hashes lock")
            .insert(label.to_string(), hash.to_string());
    }

    /// Make reads of this path fail with a non-NotFound I/O error.
    pub fn break_file(&self, label: &str, path: &str) {
        self.broken_files
            .lock()
            .expect("broken lock")
            .insert((label.to_string(), path.to_string()));
    }

    pub fn fail_pulls_for(&self, label: &str) {
        self.failing_pulls
            .lock()
            .expect("failing lock")
            .insert(label.to_string());
    }

    /// Branches pulled so far, in call order.
    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().expect("pulled lock").clone()
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn ensure_branch(&self, label: &str) -> Result<PathBuf, StoreError> {
        Ok(PathBuf::from(label))
    }

    async fn init_all_branches(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn pull(&self, label: &str) -> Result<(), StoreError> {
        self.pulled
            .lock()
            .expect("pulled lock")
            .push(label.to_string());
        if self.failing_pulls.lock().expect("failing lock").contains(label) {
            return Err(StoreError::Sync {
                branch: label.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn commit_hash(&self, label: &str) -> Result<String, StoreError> {
        self.hashes
            .lock()
            .expect("hashes lock")
            .get(label)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(label.to_string()))
    }

    async fn read_file(&self, label: &str, relative_path: &str) -> Result<Vec<u8>, StoreError> {
        let key = (label.to_string(), relative_path.to_string());
        if self.broken_files.lock().expect("broken lock").contains(&key) {
            return Err(StoreError::Io(io::Error::other("injected failure")));
        }
        self.files
            .lock()
            .expect("files lock")
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::FileNotFound(relative_path.to_string()))
    }
}
