//! Response cache: flat TTL key-value seam in front of the controller.
//!
//! The trait is async so an external key-value store can slot in; the
//! in-process implementation just guards a map for the multi-threaded
//! runtime.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    async fn invalidate(&self, key: &str);
}

/// In-memory TTL cache with expiry-on-read.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, Value)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let expired = {
            let guard = self.entries.read().ok()?;
            match guard.get(key) {
                Some((deadline, value)) if Instant::now() < *deadline => {
                    return Some(value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            if let Ok(mut guard) = self.entries.write() {
                guard.remove(key);
            }
        }
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key.to_string(), (Instant::now() + ttl, value));
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Ok(mut guard) = self.entries.write() {
            guard.remove(key);
        }
    }
}
