//! ユーザー単位の接続・切断の直列化
//!
//! 同じユーザーの接続処理（登録とオンライン通知）と切断処理（登録解除から
//! オフライン通知まで）は、このゲートを通して 1 つずつ実行する。
//! 旧接続の後始末の途中で新接続が登録されることはない。

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::UserId;

/// ユーザーごとのロック表
#[derive(Default)]
pub struct UserSessionGate {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserSessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーのロックを取得する。ガードを落とすまで同じユーザーの他の処理は待つ。
    pub async fn enter(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 誰も保持・待機していないロックは捨てる
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// 保持または待機中のロックがあるユーザー数
    pub async fn tracked_users(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
