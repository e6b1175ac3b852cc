//! ドメインエンティティ

pub mod call_session;
pub mod notification;

pub use call_session::{CallPair, CallSession, CallState, CallTransition};
pub use notification::{Notification, NotificationDraft, NotificationKind};
