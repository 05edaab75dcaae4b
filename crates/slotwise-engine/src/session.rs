//! Bounded, expiring store for pending proposal sessions.
//!
//! A proposal is only valid against the calendar snapshot it was computed
//! from, so sessions carry a hard TTL and are consumed on confirmation
//! (read-then-invalidate). The store is deliberately in-memory: a crash
//! before confirmation loses the pending proposal, which is an accepted
//! trade-off. Callers pass `now` explicitly so tests control expiry.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::search::{CandidateSlot, SlotRequest};

/// Ranked proposals awaiting user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSession {
    pub id: String,
    pub request: SlotRequest,
    pub proposals: Vec<CandidateSlot>,
    pub created_at: DateTime<Utc>,
}

/// Expiring key-value store for proposal sessions.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    capacity: usize,
    sessions: HashMap<String, ProposalSession>,
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        SessionStore {
            ttl,
            capacity: capacity.max(1),
            sessions: HashMap::new(),
        }
    }

    /// Open a new session and return its id. Expired sessions are purged
    /// first; if the store is still full, the oldest session is evicted.
    pub fn open(
        &mut self,
        request: SlotRequest,
        proposals: Vec<CandidateSlot>,
        now: DateTime<Utc>,
    ) -> String {
        self.purge_expired(now);
        while self.sessions.len() >= self.capacity {
            self.evict_oldest();
        }

        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            ProposalSession {
                id: id.clone(),
                request,
                proposals,
                created_at: now,
            },
        );
        id
    }

    /// Consume a session. The session is removed whether or not it is still
    /// live, so a second confirm against the same id always fails.
    pub fn take(&mut self, id: &str, now: DateTime<Utc>) -> Result<ProposalSession> {
        match self.sessions.remove(id) {
            None => Err(ScheduleError::SessionNotFound(id.to_string())),
            Some(session) => {
                if now - session.created_at > self.ttl {
                    Err(ScheduleError::SessionExpired(id.to_string()))
                } else {
                    Ok(session)
                }
            }
        }
    }

    /// Drop every session past its TTL.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.sessions
            .retain(|_, session| now - session.created_at <= ttl);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .sessions
            .values()
            .min_by_key(|s| s.created_at)
            .map(|s| s.id.clone());
        if let Some(id) = oldest {
            log::debug!("evicting oldest proposal session {}", id);
            self.sessions.remove(&id);
        }
    }
}
