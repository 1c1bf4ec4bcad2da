/// Chat connection lifecycle: connect/disconnect sequencing and
/// republishing of inbound chat events

use futures::task::{LocalSpawn, LocalSpawnExt};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::chat_data::{parse_payload, ConnectionState, DeleteMessage, InboundEvent, PurgeMessage};
use crate::collaborators::{ChatApi, ChatFeed, ChatSocket, ChatTransport};
use crate::config::ChatConfig;
use crate::error::ChatResult;
use crate::events::EventPublisher;
use crate::moderation::{classify_purge, is_moderator, resolve_auth_identity, usable_endpoints, PurgeAction};

/// Everything the manager talks to
pub struct Collaborators {
    pub api: Rc<dyn ChatApi>,
    pub transport: Rc<dyn ChatTransport>,
    pub feed: Rc<dyn ChatFeed>,
    pub publisher: Rc<dyn EventPublisher>,
    pub spawner: Rc<dyn LocalSpawn>,
}

struct ActiveSocket {
    generation: u64,
    socket: Box<dyn ChatSocket>,
}

struct Inner {
    config: ChatConfig,
    deps: Collaborators,
    socket: RefCell<Option<ActiveSocket>>,
    connecting: Cell<bool>,
    moderator: Cell<bool>,
    /// Bumped for every socket created; handlers of older sockets go quiet
    generation: Cell<u64>,
    shut_down: Cell<bool>,
}

/// Owns the single chat connection of the extension.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct ChatConnectionManager {
    inner: Rc<Inner>,
}

impl ChatConnectionManager {
    pub fn new(config: ChatConfig, deps: Collaborators) -> Self {
        ChatConnectionManager {
            inner: Rc::new(Inner {
                config,
                deps,
                socket: RefCell::new(None),
                connecting: Cell::new(false),
                moderator: Cell::new(false),
                generation: Cell::new(0),
                shut_down: Cell::new(false),
            }),
        }
    }

    /// Connect to a channel's chat, replacing any existing connection.
    ///
    /// Does nothing without a channel or while another attempt is in flight.
    /// Resolves once the socket is created; the auth handshake finishes in the
    /// background. Failures are logged and leave the manager disconnected.
    pub async fn connect_to_chat(&self, channel_id: Option<u64>, user_id: Option<u64>) {
        let inner = &self.inner;
        let Some(channel_id) = channel_id else {
            return;
        };
        if inner.connecting.get() || inner.shut_down.get() {
            log::debug!("Ignoring chat connect for channel {}: busy", channel_id);
            return;
        }
        inner.connecting.set(true);
        inner.close_socket();

        let info = match inner.deps.api.get_channel_chat_info(channel_id).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                log::warn!("No chat info for channel {}, not connecting", channel_id);
                inner.connecting.set(false);
                return;
            }
            Err(e) => {
                log::error!("Failed to fetch chat info for channel {}: {}", channel_id, e);
                inner.connecting.set(false);
                return;
            }
        };

        if inner.shut_down.get() {
            return;
        }

        let endpoints = usable_endpoints(&info.endpoints);
        if endpoints.is_empty() {
            log::warn!("Chat info for channel {} has no usable endpoints", channel_id);
            inner.connecting.set(false);
            return;
        }

        inner.moderator.set(is_moderator(
            info.roles.as_deref(),
            &inner.config.moderator_roles,
        ));

        Inner::create_chat_socket(inner, channel_id, user_id, &endpoints, info.authkey.as_deref());
    }

    /// Close the active socket. Ignored while a connect attempt is in flight.
    pub fn disconnect_chat(&self) {
        if self.inner.connecting.get() {
            log::debug!("Ignoring chat disconnect: connect in progress");
            return;
        }
        self.inner.close_socket();
    }

    /// Release the socket for good, even mid-connect. Later connects are ignored.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.shut_down.set(true);
        inner.connecting.set(false);
        inner.moderator.set(false);
        inner.close_socket();
    }

    pub fn state(&self) -> ConnectionState {
        if self.inner.connecting.get() {
            ConnectionState::Connecting
        } else if self.inner.socket.borrow().is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.inner.moderator.get()
    }
}

impl Inner {
    fn create_chat_socket(
        this: &Rc<Inner>,
        channel_id: u64,
        user_id: Option<u64>,
        endpoints: &[String],
        authkey: Option<&str>,
    ) {
        let generation = this.generation.get() + 1;
        this.generation.set(generation);

        let socket = this.deps.transport.connect(endpoints);

        for event in InboundEvent::ALL {
            let weak = Rc::downgrade(this);
            socket.on(
                event.name(),
                Box::new(move |payload| {
                    if let Some(inner) = weak.upgrade() {
                        Inner::handle_event(&inner, generation, event, payload);
                    }
                }),
            );
        }

        let identity = resolve_auth_identity(user_id, authkey);
        let handshake = socket.auth(channel_id, identity, authkey);
        *this.socket.borrow_mut() = Some(ActiveSocket { generation, socket });

        let weak = Rc::downgrade(this);
        this.spawn(async move {
            let result = handshake.await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_auth(generation, result);
            }
        });
    }

    fn finish_auth(&self, generation: u64, result: ChatResult<()>) {
        if !self.is_current(generation) {
            log::debug!("Auth result for a replaced chat socket ignored");
            return;
        }
        self.connecting.set(false);
        match result {
            Ok(()) => log::info!("Connected to chat!"),
            Err(e) => {
                log::error!("An error occurred when connecting to chat: {}", e);
                self.close_socket();
            }
        }
    }

    fn handle_event(this: &Rc<Inner>, generation: u64, event: InboundEvent, payload: Option<Value>) {
        if !this.is_current(generation) {
            log::debug!("Dropping {} from a replaced chat socket", event.name());
            return;
        }

        match event {
            InboundEvent::UserUpdate => this.republish(event, payload),
            InboundEvent::DeleteMessage => {
                let Some(payload) = payload else {
                    return;
                };
                if this.moderator.get() {
                    match parse_payload::<DeleteMessage>(event, &payload) {
                        Ok(DeleteMessage {
                            id,
                            moderator: Some(moderator),
                        }) => this.deps.feed.message_deleted(&id, &moderator.user_name),
                        Ok(_) => {}
                        Err(e) => log::warn!("{}", e),
                    }
                }
                this.republish(event, Some(payload));
            }
            InboundEvent::PurgeMessage => {
                let Some(payload) = payload else {
                    return;
                };
                if !this.moderator.get() {
                    this.republish(event, Some(payload));
                    return;
                }
                match parse_payload::<PurgeMessage>(event, &payload) {
                    Ok(purge) => {
                        let weak = Rc::downgrade(this);
                        this.spawn(Inner::handle_purge(weak, generation, purge, payload));
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        this.republish(event, Some(payload));
                    }
                }
            }
            InboundEvent::UserTimeout => {
                log::info!("User was timed out: {:?}", payload);
                this.republish(event, payload);
            }
            InboundEvent::Error => {
                log::warn!("Chat socket error: {:?}", payload);
                this.republish(event, payload);
            }
        }
    }

    /// Moderator view of a purge: tell the chat feed who was banned or timed
    /// out, then republish. A failed user lookup drops the event entirely.
    async fn handle_purge(weak: Weak<Inner>, generation: u64, purge: PurgeMessage, payload: Value) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let lookup = inner.deps.api.get_user_info(purge.user_id);
        // Don't keep the manager alive across the lookup
        drop(inner);

        let user = match lookup.await {
            Ok(Some(user)) => user,
            Ok(None) => {
                log::debug!("No user info for purged user {}", purge.user_id);
                return;
            }
            Err(e) => {
                log::error!("Failed to look up purged user {}: {}", purge.user_id, e);
                return;
            }
        };

        let Some(inner) = weak.upgrade() else {
            return;
        };
        if !inner.is_current(generation) {
            return;
        }

        match classify_purge(&purge, user.username) {
            PurgeAction::Timeout { username, moderator } => {
                inner.deps.feed.user_timeout(&username, &moderator)
            }
            PurgeAction::Ban { username } => inner.deps.feed.user_banned(&username),
        }
        inner.republish(InboundEvent::PurgeMessage, Some(payload));
    }

    fn republish(&self, event: InboundEvent, payload: Option<Value>) {
        let topic = self.config.topic(event.topic_suffix());
        self.deps
            .publisher
            .publish(&topic, &payload.unwrap_or(Value::Null));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.socket
            .borrow()
            .as_ref()
            .map_or(false, |active| active.generation == generation)
    }

    fn close_socket(&self) {
        let active = self.socket.borrow_mut().take();
        if let Some(active) = active {
            log::info!("Disconnecting from chat socket");
            active.socket.close();
        }
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        if let Err(e) = self.deps.spawner.spawn_local(future) {
            log::error!("Failed to spawn chat task: {}", e);
        }
    }
}
