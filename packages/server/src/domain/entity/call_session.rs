//! 通話セッション（WebRTC シグナリングの交渉状態）
//!
//! ## 状態遷移
//!
//! ```text
//! Idle -> Invited -> Accepted -> Active -> Ended
//!                 -> Rejected ---------> Ended
//! (Ended 以外の任意の状態) -> Ended   ※ 終了・キャンセル・切断
//! ```
//!
//! セッションは参加者の順序なしペアで識別され、ペアごとに同時に 1 つしか存在しない。
//! `Ended` に達したセッションはリポジトリから取り除かれる。

use serde::Serialize;

use crate::domain::{
    error::CallError,
    value_object::{Timestamp, UserId},
};

/// 通話セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Invited,
    Accepted,
    Active,
    Rejected,
    Ended,
}

impl CallState {
    pub const ALL: [CallState; 6] = [
        CallState::Idle,
        CallState::Invited,
        CallState::Accepted,
        CallState::Active,
        CallState::Rejected,
        CallState::Ended,
    ];

    /// `self` から `next` への遷移が許可されているか
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        match (self, next) {
            (Idle, Invited) => true,
            (Invited, Accepted) | (Invited, Rejected) => true,
            (Accepted, Active) => true,
            (Ended, _) => false,
            (_, Ended) => true,
            _ => false,
        }
    }
}

/// 参加者の順序なしペア
///
/// `(a, b)` と `(b, a)` は同じペアになる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallPair {
    low: UserId,
    high: UserId,
}

impl CallPair {
    pub fn new(a: UserId, b: UserId) -> Result<Self, CallError> {
        if a == b {
            return Err(CallError::SelfCall);
        }
        if a < b {
            Ok(Self { low: a, high: b })
        } else {
            Ok(Self { low: b, high: a })
        }
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        &self.low == user_id || &self.high == user_id
    }

    /// ペアのうち `user_id` ではない側
    pub fn other(&self, user_id: &UserId) -> Option<&UserId> {
        if &self.low == user_id {
            Some(&self.high)
        } else if &self.high == user_id {
            Some(&self.low)
        } else {
            None
        }
    }
}

/// 既存セッションに対する操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTransition {
    Accept { by: UserId },
    Reject { by: UserId },
    End { by: UserId },
}

impl CallTransition {
    pub fn actor(&self) -> &UserId {
        match self {
            CallTransition::Accept { by }
            | CallTransition::Reject { by }
            | CallTransition::End { by } => by,
        }
    }
}

/// 2 ユーザー間のシグナリング交渉 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    pair: CallPair,
    caller: UserId,
    callee: UserId,
    state: CallState,
    created_at: Timestamp,
}

impl CallSession {
    /// 発信者から着信者への招待としてセッションを作成する（Idle -> Invited）
    pub fn invite(caller: UserId, callee: UserId, now: Timestamp) -> Result<Self, CallError> {
        let pair = CallPair::new(caller.clone(), callee.clone())?;
        let mut session = Self {
            pair,
            caller,
            callee,
            state: CallState::Idle,
            created_at: now,
        };
        session.transition_to(CallState::Invited)?;
        Ok(session)
    }

    pub fn pair(&self) -> &CallPair {
        &self.pair
    }

    pub fn caller(&self) -> &UserId {
        &self.caller
    }

    pub fn callee(&self) -> &UserId {
        &self.callee
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_ended(&self) -> bool {
        self.state == CallState::Ended
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CallState::Accepted | CallState::Active)
    }

    pub fn other_party(&self, user_id: &UserId) -> Option<&UserId> {
        self.pair.other(user_id)
    }

    /// 操作を適用する。失敗した場合セッションは変更されない。
    pub fn apply(&mut self, transition: &CallTransition) -> Result<(), CallError> {
        if !self.pair.contains(transition.actor()) {
            return Err(CallError::SessionNotFound);
        }

        match transition {
            CallTransition::Accept { by } => {
                self.ensure_answerable(by)?;
                self.transition_to(CallState::Accepted)?;
                self.transition_to(CallState::Active)
            }
            CallTransition::Reject { by } => {
                self.ensure_answerable(by)?;
                self.transition_to(CallState::Rejected)?;
                self.transition_to(CallState::Ended)
            }
            CallTransition::End { .. } => self.transition_to(CallState::Ended),
        }
    }

    /// 強制終了（切断・タイムアウト）
    pub fn force_end(&mut self) {
        if !self.is_ended() {
            self.state = CallState::Ended;
        }
    }

    /// SDP / ICE を中継できる状態か
    pub fn ensure_active(&self) -> Result<(), CallError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CallError::InvalidState {
                expected: CallState::Active,
                actual: self.state,
            })
        }
    }

    fn ensure_answerable(&self, by: &UserId) -> Result<(), CallError> {
        if self.state != CallState::Invited {
            return Err(CallError::InvalidState {
                expected: CallState::Invited,
                actual: self.state,
            });
        }
        if by != &self.callee {
            return Err(CallError::NotCallee);
        }
        Ok(())
    }

    fn transition_to(&mut self, next: CallState) -> Result<(), CallError> {
        if !self.state.can_transition_to(next) {
            return Err(CallError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
