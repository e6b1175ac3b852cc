//! InMemory CallSession Repository 実装
//!
//! 順序なしペアをキーにした HashMap を `RwLock` で守ります。
//! 遷移の検査と適用は write ロックを保持したまま行うため、
//! 同じペアへの応答と終了が競合しても遷移は 1 つずつしか起きません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    CallError, CallPair, CallSession, CallSessionRepository, CallState, CallTransition,
    Timestamp, UserId,
};

/// インメモリ CallSession Repository 実装
#[derive(Default)]
pub struct InMemoryCallSessionRepository {
    sessions: RwLock<HashMap<CallPair, CallSession>>,
}

impl InMemoryCallSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallSessionRepository for InMemoryCallSessionRepository {
    async fn insert_if_absent(&self, session: CallSession) -> Result<(), CallError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.pair()) {
            return Err(CallError::SessionAlreadyExists);
        }
        sessions.insert(session.pair().clone(), session);
        Ok(())
    }

    async fn get(&self, pair: &CallPair) -> Option<CallSession> {
        self.sessions.read().await.get(pair).cloned()
    }

    async fn apply(
        &self,
        pair: &CallPair,
        transition: CallTransition,
    ) -> Result<CallSession, CallError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(pair).ok_or(CallError::SessionNotFound)?;
        session.apply(&transition)?;

        let updated = session.clone();
        if updated.is_ended() {
            sessions.remove(pair);
        }
        Ok(updated)
    }

    async fn end_all_involving(&self, user_id: &UserId) -> Vec<CallSession> {
        let mut sessions = self.sessions.write().await;
        let pairs: Vec<CallPair> = sessions
            .keys()
            .filter(|pair| pair.contains(user_id))
            .cloned()
            .collect();

        pairs
            .into_iter()
            .filter_map(|pair| sessions.remove(&pair))
            .map(|mut session| {
                session.force_end();
                session
            })
            .collect()
    }

    async fn expire_invitations(&self, now: Timestamp, max_age_secs: u64) -> Vec<CallSession> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<CallPair> = sessions
            .values()
            .filter(|session| {
                session.state() == CallState::Invited
                    && now.seconds_since(session.created_at()) > max_age_secs
            })
            .map(|session| session.pair().clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|pair| sessions.remove(&pair))
            .map(|mut session| {
                session.force_end();
                session
            })
            .collect()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
