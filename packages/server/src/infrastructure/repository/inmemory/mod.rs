//! インメモリ実装
//!
//! ルーム購読表と通話セッション表はハブ本来の揮発性の状態です。
//! チャット・通知のストアは外部の永続化層の代役で、単体での起動とテストに使います。

pub mod call_session;
pub mod chat;
pub mod notification;
pub mod room;

pub use call_session::InMemoryCallSessionRepository;
pub use chat::InMemoryChatStore;
pub use notification::InMemoryNotificationStore;
pub use room::InMemoryRoomMembershipRepository;
