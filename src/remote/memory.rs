//! In-memory blob store with a write log and failure injection

use crate::error::RemoteError;
use crate::remote::{AccessControl, BlobStore, IntegrityToken, PutObject};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// An object as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub access: AccessControl,
    pub integrity: Option<IntegrityToken>,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    put_log: Vec<String>,
    get_log: Vec<String>,
    failing_puts: HashSet<String>,
    failing_gets: HashSet<String>,
    /// After a successful put to the trigger key, overwrite the target key.
    races: Vec<(String, String, Vec<u8>)>,
}

/// In-memory blob store. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<State>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the write log
    pub fn insert(&self, key: &str, body: Vec<u8>) {
        self.state.lock().objects.insert(
            key.to_string(),
            StoredObject {
                body: Bytes::from(body),
                content_type: "application/octet-stream".to_string(),
                access: AccessControl::Private,
                integrity: None,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().objects.keys().cloned().collect()
    }

    /// Keys of successful puts, in order
    pub fn put_log(&self) -> Vec<String> {
        self.state.lock().put_log.clone()
    }

    pub fn get_log(&self) -> Vec<String> {
        self.state.lock().get_log.clone()
    }

    /// Make every put whose key satisfies `key` fail with a transport error.
    /// A key ending in `*` matches by prefix.
    pub fn fail_puts_to(&self, key: &str) {
        self.state.lock().failing_puts.insert(key.to_string());
    }

    pub fn fail_gets_from(&self, key: &str) {
        self.state.lock().failing_gets.insert(key.to_string());
    }

    /// Simulate a concurrent writer: once `trigger` is written, `target` is
    /// replaced with `body`.
    pub fn race_after_put(&self, trigger: &str, target: &str, body: Vec<u8>) {
        self.state
            .lock()
            .races
            .push((trigger.to_string(), target.to_string(), body));
    }

    fn matches(patterns: &HashSet<String>, key: &str) -> bool {
        patterns.iter().any(|p| match p.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => p == key,
        })
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let mut state = self.state.lock();
        state.get_log.push(key.to_string());
        if Self::matches(&state.failing_gets, key) {
            return Err(RemoteError::Transport {
                key: key.to_string(),
                message: "injected get failure".to_string(),
            });
        }
        Ok(state.objects.get(key).map(|o| o.body.to_vec()))
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        if Self::matches(&state.failing_puts, key) {
            return Err(RemoteError::Transport {
                key: key.to_string(),
                message: "injected put failure".to_string(),
            });
        }
        object.integrity.verify(key, &object.body)?;

        state.objects.insert(
            key.to_string(),
            StoredObject {
                body: object.body,
                content_type: object.content_type,
                access: object.access,
                integrity: Some(object.integrity),
            },
        );
        state.put_log.push(key.to_string());

        let triggered: Vec<(String, Vec<u8>)> = state
            .races
            .iter()
            .filter(|(trigger, _, _)| trigger == key)
            .map(|(_, target, body)| (target.clone(), body.clone()))
            .collect();
        for (target, body) in triggered {
            let entry = state.objects.entry(target).or_insert_with(|| StoredObject {
                body: Bytes::new(),
                content_type: "application/octet-stream".to_string(),
                access: AccessControl::Private,
                integrity: None,
            });
            entry.body = Bytes::from(body);
            entry.integrity = None;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
