//! UseCase: 通話シグナリング
//!
//! 2 ユーザー間の通話交渉を状態機械で管理し、SDP / ICE を相手へ中継します。
//! ハブは SDP / ICE の中身を解釈しません（`data` の中身はそのまま転送）。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - invite / accept / reject / end / relay_sdp / relay_ice / end_all_for / expire_stale_invites
//!
//! ### なぜこのテストが必要か
//! - ペアごとに同時に 1 つのセッションしか存在しないことを保証
//! - セッションの無いペアへの応答が副作用なしで拒否されることを確認
//! - 通話中の切断で相手に終了通知が 1 通だけ届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：招待 → 応答 → SDP / ICE の中継 → 終了
//! - 異常系：セッション無しでの応答、応答前の SDP 中継、自分自身への発信
//! - エッジケース：着信者がオフラインの招待

use std::sync::Arc;

use gymates_hub_shared::time::Clock;
use serde_json::Value;

use crate::domain::{
    CallEndReason, CallError, CallPair, CallSession, CallSessionRepository, CallTransition,
    ConnectionRegistry, OutboundFrame, SignalKind, SignalPayload, Timestamp, UserId,
};

/// SDP の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

impl From<SdpKind> for SignalKind {
    fn from(kind: SdpKind) -> Self {
        match kind {
            SdpKind::Offer => SignalKind::SdpOffer,
            SdpKind::Answer => SignalKind::SdpAnswer,
        }
    }
}

/// 通話シグナリングのユースケース
///
/// 戻り値の `bool` は相手へライブで届いたかどうか。届かなくてもエラーではない。
pub struct CallSignalingUseCase {
    calls: Arc<dyn CallSessionRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl CallSignalingUseCase {
    pub fn new(
        calls: Arc<dyn CallSessionRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calls,
            registry,
            clock,
        }
    }

    /// 発信（Idle -> Invited）。着信者がオフラインでもセッションは作られる。
    pub async fn invite(
        &self,
        caller: &UserId,
        callee: &UserId,
        data: SignalPayload,
    ) -> Result<bool, CallError> {
        let now = Timestamp::new(self.clock.now_unix_secs());
        let session = CallSession::invite(caller.clone(), callee.clone(), now)?;
        self.calls.insert_if_absent(session).await?;
        tracing::info!("Call invite '{}' -> '{}'", caller, callee);

        Ok(self.signal(caller, callee, SignalKind::Invite, data).await)
    }

    /// 応答（Invited -> Accepted -> Active）
    pub async fn accept(
        &self,
        callee: &UserId,
        caller: &UserId,
        data: SignalPayload,
    ) -> Result<bool, CallError> {
        let pair = CallPair::new(callee.clone(), caller.clone())?;
        self.calls
            .apply(&pair, CallTransition::Accept { by: callee.clone() })
            .await?;
        tracing::info!("Call '{}' -> '{}' accepted", caller, callee);

        Ok(self.signal(callee, caller, SignalKind::Accept, data).await)
    }

    /// 拒否（Invited -> Rejected -> Ended）
    pub async fn reject(
        &self,
        callee: &UserId,
        caller: &UserId,
        data: SignalPayload,
    ) -> Result<bool, CallError> {
        let pair = CallPair::new(callee.clone(), caller.clone())?;
        self.calls
            .apply(&pair, CallTransition::Reject { by: callee.clone() })
            .await?;
        tracing::info!("Call '{}' -> '{}' rejected", caller, callee);

        Ok(self.signal(callee, caller, SignalKind::Reject, data).await)
    }

    /// どちらかの参加者による終了（キャンセルを含む）
    pub async fn end(
        &self,
        by: &UserId,
        other: &UserId,
        mut data: SignalPayload,
    ) -> Result<bool, CallError> {
        let pair = CallPair::new(by.clone(), other.clone())?;
        self.calls
            .apply(&pair, CallTransition::End { by: by.clone() })
            .await?;
        tracing::info!("Call between '{}' and '{}' ended by '{}'", by, other, by);

        data.entry("reason")
            .or_insert_with(|| Value::from(CallEndReason::Hangup.as_str()));
        Ok(self.signal(by, other, SignalKind::End, data).await)
    }

    /// SDP の中継（Accepted / Active のセッションが必要）
    pub async fn relay_sdp(
        &self,
        kind: SdpKind,
        from: &UserId,
        to: &UserId,
        data: SignalPayload,
    ) -> Result<bool, CallError> {
        self.ensure_relayable(from, to).await?;
        Ok(self.signal(from, to, kind.into(), data).await)
    }

    /// ICE 候補の中継（Accepted / Active のセッションが必要）
    pub async fn relay_ice(
        &self,
        from: &UserId,
        to: &UserId,
        data: SignalPayload,
    ) -> Result<bool, CallError> {
        self.ensure_relayable(from, to).await?;
        Ok(self.signal(from, to, SignalKind::IceCandidate, data).await)
    }

    /// ユーザーが関わる全セッションを強制終了し、相手に終了を通知する
    pub async fn end_all_for(&self, user_id: &UserId, reason: CallEndReason) -> usize {
        let ended = self.calls.end_all_involving(user_id).await;
        for session in &ended {
            if let Some(peer) = session.other_party(user_id) {
                self.signal(user_id, peer, SignalKind::End, reason_payload(reason))
                    .await;
            }
        }
        ended.len()
    }

    /// `max_age_secs` より古い招待を期限切れにし、両者に終了を通知する
    pub async fn expire_stale_invites(&self, max_age_secs: u64) -> usize {
        let now = Timestamp::new(self.clock.now_unix_secs());
        let expired = self.calls.expire_invitations(now, max_age_secs).await;
        for session in &expired {
            tracing::info!(
                "Call invite '{}' -> '{}' expired",
                session.caller(),
                session.callee()
            );
            let payload = reason_payload(CallEndReason::Timeout);
            self.signal(session.caller(), session.callee(), SignalKind::End, payload.clone())
                .await;
            self.signal(session.callee(), session.caller(), SignalKind::End, payload)
                .await;
        }
        expired.len()
    }

    async fn ensure_relayable(&self, from: &UserId, to: &UserId) -> Result<(), CallError> {
        let pair = CallPair::new(from.clone(), to.clone())?;
        self.calls
            .get(&pair)
            .await
            .ok_or(CallError::SessionNotFound)?
            .ensure_active()
    }

    async fn signal(
        &self,
        from: &UserId,
        to: &UserId,
        kind: SignalKind,
        data: SignalPayload,
    ) -> bool {
        let frame = OutboundFrame::signal(from.clone(), to.clone(), kind, data);
        self.registry.send_to(to, &frame).await
    }
}

fn reason_payload(reason: CallEndReason) -> SignalPayload {
    let mut data = SignalPayload::new();
    data.insert("reason".to_string(), Value::from(reason.as_str()));
    data
}
