//! ドメイン層
//!
//! ハブの中核となる値オブジェクト、エンティティ、外側の層が実装する trait を定義します。
//! この層は axum やシリアライズ形式に依存しません。

pub mod auth;
pub mod entity;
pub mod error;
pub mod frame;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use auth::{Authenticator, Credentials};
pub use entity::{
    CallPair, CallSession, CallState, CallTransition, Notification, NotificationDraft,
    NotificationKind,
};
pub use error::{AuthError, CallError, StoreError, ValueObjectError};
pub use frame::{CallEndReason, FrameKind, FrameScope, OutboundFrame, SignalKind, SignalPayload};
pub use registry::{ConnectionRegistry, Outbox, Registration, Unregistration};
pub use repository::{
    CallSessionRepository, ChatStore, NotificationStore, RoomMembershipRepository,
};
pub use value_object::{ConnectionId, MessageId, NotificationId, RoomId, Timestamp, UserId};
