//! UseCase 層
//!
//! 1 つの構造体が 1 つの操作グループを担当し、ドメイン層の trait
//! （`Arc<dyn Trait>`）だけに依存します。

pub mod call_signaling;
pub mod connect_user;
pub mod disconnect_user;
pub mod error;
pub mod push_notification;
pub mod query_presence;
pub mod relay_typing;
pub mod room_broadcast;
pub mod room_subscription;
pub mod send_message;
pub mod session_gate;

pub use call_signaling::CallSignalingUseCase;
pub use connect_user::{ConnectUserUseCase, ConnectedUser};
pub use disconnect_user::{DisconnectOutcome, DisconnectUserUseCase};
pub use error::{
    ConnectError, CreateNotificationError, RelayTypingError, RoomSubscriptionError,
    SendMessageError,
};
pub use push_notification::{CreatedNotification, PushNotificationUseCase};
pub use query_presence::QueryPresenceUseCase;
pub use relay_typing::RelayTypingUseCase;
pub use room_broadcast::RoomBroadcaster;
pub use room_subscription::RoomSubscriptionUseCase;
pub use send_message::{SendMessageUseCase, SentMessage};
pub use session_gate::UserSessionGate;
