//! Shared application state.

use std::sync::Arc;

use gymates_hub_shared::time::Clock;

use crate::{
    domain::Authenticator,
    infrastructure::{
        registry::WebSocketConnectionRegistry,
        repository::{
            InMemoryCallSessionRepository, InMemoryChatStore, InMemoryNotificationStore,
            InMemoryRoomMembershipRepository,
        },
    },
    usecase::{
        CallSignalingUseCase, ConnectUserUseCase, DisconnectUserUseCase, PushNotificationUseCase,
        QueryPresenceUseCase, RelayTypingUseCase, RoomBroadcaster, RoomSubscriptionUseCase,
        SendMessageUseCase, UserSessionGate,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectUserUseCase（接続・認証のユースケース）
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    /// DisconnectUserUseCase（切断時の後始末のユースケース）
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    pub room_subscription_usecase: Arc<RoomSubscriptionUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub relay_typing_usecase: Arc<RelayTypingUseCase>,
    pub call_signaling_usecase: Arc<CallSignalingUseCase>,
    pub push_notification_usecase: Arc<PushNotificationUseCase>,
    pub query_presence_usecase: Arc<QueryPresenceUseCase>,
    /// チャットサービスの代役（`POST /api/chats` で使う）
    pub chat_directory: Arc<InMemoryChatStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every use case against the in-memory implementations.
    ///
    /// Dependencies are created in order:
    /// 1. Connection registry
    /// 2. Repositories and collaborator stand-ins
    /// 3. UseCases
    pub fn in_memory(authenticator: Arc<dyn Authenticator>, clock: Arc<dyn Clock>) -> Self {
        // 1. Connection registry
        let registry = Arc::new(WebSocketConnectionRegistry::new(clock.clone()));

        // 2. Repositories
        let rooms = Arc::new(InMemoryRoomMembershipRepository::new());
        let calls = Arc::new(InMemoryCallSessionRepository::new());
        let chat_directory = Arc::new(InMemoryChatStore::new());
        let notification_store = Arc::new(InMemoryNotificationStore::new(clock.clone()));

        // 3. UseCases
        let session_gate = Arc::new(UserSessionGate::new());
        let broadcaster = Arc::new(RoomBroadcaster::new(rooms.clone(), registry.clone()));
        let call_signaling_usecase = Arc::new(CallSignalingUseCase::new(
            calls,
            registry.clone(),
            clock.clone(),
        ));

        Self {
            connect_user_usecase: Arc::new(ConnectUserUseCase::new(
                authenticator,
                registry.clone(),
                session_gate.clone(),
            )),
            disconnect_user_usecase: Arc::new(DisconnectUserUseCase::new(
                registry.clone(),
                rooms.clone(),
                call_signaling_usecase.clone(),
                session_gate,
            )),
            room_subscription_usecase: Arc::new(RoomSubscriptionUseCase::new(
                rooms.clone(),
                chat_directory.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                chat_directory.clone(),
                broadcaster.clone(),
            )),
            relay_typing_usecase: Arc::new(RelayTypingUseCase::new(rooms.clone(), broadcaster)),
            call_signaling_usecase,
            push_notification_usecase: Arc::new(PushNotificationUseCase::new(
                notification_store,
                registry.clone(),
            )),
            query_presence_usecase: Arc::new(QueryPresenceUseCase::new(registry, rooms)),
            chat_directory,
            clock,
        }
    }
}
