//! Process-wide session registry.
//!
//! A `SessionStore` is constructed once at startup and injected into the
//! handlers; there is no ambient global state. Each patch is applied as a
//! single locked entry mutation, so two patches never interleave
//! mid-mutation. Cross-request ordering for the same token is still the
//! caller's responsibility: the expected access pattern is one active client
//! per session, and overlapping writers are last-write-wins.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{DesignComparison, UxAudit};

/// Reference to the latest capture held by a session: inline copy plus the
/// storage path, not exclusive ownership of the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub base64: String,
    pub file_path: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub capture: Option<CaptureRecord>,
    pub dom: Option<String>,
    pub styles: Option<Vec<String>>,
    pub audit: Option<UxAudit>,
    pub comparison: Option<DesignComparison>,
}

impl SessionRecord {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            capture: None,
            dom: None,
            styles: None,
            audit: None,
            comparison: None,
        }
    }
}

/// Partial update: only supplied fields are replaced, unrelated fields are
/// never cleared.
#[derive(Debug, Default, Clone)]
pub struct SessionPatch {
    pub capture: Option<CaptureRecord>,
    pub dom: Option<String>,
    pub styles: Option<Vec<String>>,
    pub audit: Option<UxAudit>,
    pub comparison: Option<DesignComparison>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session and return its token.
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .insert(token.clone(), SessionRecord::empty(Utc::now()));
        token
    }

    /// Snapshot of a session, or `None` for unknown tokens. Pipeline entry
    /// points check this before doing any capture or analysis work.
    pub fn get(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.get(token).map(|entry| entry.clone())
    }

    pub fn exists(&self, token: &str) -> bool {
        self.sessions.contains_key(token)
    }

    /// Apply a patch to an existing session. Returns `false` for unknown
    /// tokens; no session is created implicitly.
    pub fn update(&self, token: &str, patch: SessionPatch) -> bool {
        let Some(mut entry) = self.sessions.get_mut(token) else {
            return false;
        };
        let record = entry.value_mut();
        if let Some(capture) = patch.capture {
            record.capture = Some(capture);
        }
        if let Some(dom) = patch.dom {
            record.dom = Some(dom);
        }
        if let Some(styles) = patch.styles {
            record.styles = Some(styles);
        }
        if let Some(audit) = patch.audit {
            record.audit = Some(audit);
        }
        if let Some(comparison) = patch.comparison {
            record.comparison = Some(comparison);
        }
        record.updated_at = Utc::now();
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions that have been idle longer than `ttl`. Returns the
    /// number of sessions removed. Removals are counted inside the retain
    /// predicate; diffing map lengths would race concurrent `create` calls.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;
        let mut removed = 0;
        self.sessions.retain(|_, record| {
            let keep = record.updated_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sessions_start_empty() {
        let store = SessionStore::new();
        let token = store.create();
        let record = store.get(&token).expect("session exists");
        assert!(record.capture.is_none());
        assert!(record.dom.is_none());
        assert!(record.styles.is_none());
        assert!(record.audit.is_none());
        assert!(record.comparison.is_none());
    }

    #[test]
    fn tokens_are_distinct_and_independent() {
        let store = SessionStore::new();
        let first = store.create();
        let second = store.create();
        assert_ne!(first, second);

        store.update(
            &first,
            SessionPatch {
                dom: Some("<html></html>".to_string()),
                ..Default::default()
            },
        );
        assert!(store.get(&second).unwrap().dom.is_none());
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let store = SessionStore::new();
        assert!(store.get("missing").is_none());
        assert!(!store.update("missing", SessionPatch::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn patch_replaces_only_supplied_fields() {
        let store = SessionStore::new();
        let token = store.create();

        store.update(
            &token,
            SessionPatch {
                capture: Some(CaptureRecord {
                    base64: "aGk=".to_string(),
                    file_path: "/tmp/shot.png".to_string(),
                    width: 10,
                    height: 10,
                }),
                audit: Some(UxAudit {
                    ux_score: 8.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        store.update(
            &token,
            SessionPatch {
                comparison: Some(DesignComparison::default()),
                ..Default::default()
            },
        );

        let record = store.get(&token).unwrap();
        assert_eq!(record.capture.as_ref().unwrap().width, 10);
        assert_eq!(record.audit.as_ref().unwrap().ux_score, 8.0);
        assert!(record.comparison.is_some());
    }

    #[test]
    fn eviction_count_is_exact_under_concurrent_creation() {
        use std::sync::Arc;

        let store = Arc::new(SessionStore::new());
        let stale = store.create();
        {
            let mut entry = store.sessions.get_mut(&stale).unwrap();
            entry.value_mut().updated_at = Utc::now() - chrono::Duration::hours(2);
        }

        // Fresh sessions arriving mid-sweep must not skew the removal count
        // (a length diff would underflow when the map grows during retain).
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    store.create();
                }
            })
        };

        let mut removed = 0;
        for _ in 0..200 {
            removed += store.evict_expired(Duration::from_secs(3600));
        }
        writer.join().unwrap();

        assert_eq!(removed, 1);
        assert!(store.get(&stale).is_none());
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn eviction_drops_only_idle_sessions() {
        let store = SessionStore::new();
        let stale = store.create();
        {
            let mut entry = store.sessions.get_mut(&stale).unwrap();
            entry.value_mut().updated_at = Utc::now() - chrono::Duration::hours(2);
        }
        let fresh = store.create();

        assert_eq!(store.evict_expired(Duration::from_secs(3600)), 1);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
    }
}
