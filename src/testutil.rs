/// Fake collaborators and a harness for driving the manager in tests

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::chat_data::{ChatInfo, UserInfo};
use crate::collaborators::{ChatApi, ChatFeed, ChatSocket, ChatTransport, InboundHandler};
use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use crate::events::EventPublisher;
use crate::manager::{ChatConnectionManager, Collaborators};

pub fn create_test_chat_info(authkey: Option<&str>, roles: &[&str]) -> ChatInfo {
    ChatInfo::new(
        vec!["wss://chat1.example.com:443".to_string()],
        authkey.map(|k| k.to_string()),
        if roles.is_empty() {
            None
        } else {
            Some(roles.iter().map(|r| r.to_string()).collect())
        },
    )
}

async fn wait_for(gate: Option<oneshot::Receiver<()>>) {
    if let Some(gate) = gate {
        let _ = gate.await;
    }
}

pub struct FakeApi {
    pub chat_info: RefCell<Option<ChatInfo>>,
    pub fail_chat_info: Cell<bool>,
    pub fail_user_lookup: Cell<bool>,
    pub users: RefCell<HashMap<u64, UserInfo>>,
    pub chat_info_fetches: Cell<usize>,
    pub user_lookups: Cell<usize>,
    fetch_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            chat_info: RefCell::new(Some(create_test_chat_info(Some("secret"), &[]))),
            fail_chat_info: Cell::new(false),
            fail_user_lookup: Cell::new(false),
            users: RefCell::new(HashMap::new()),
            chat_info_fetches: Cell::new(0),
            user_lookups: Cell::new(0),
            fetch_gate: RefCell::new(None),
        }
    }

    pub fn add_user(&self, user_id: u64, username: &str) {
        self.users.borrow_mut().insert(
            user_id,
            UserInfo {
                username: username.to_string(),
            },
        );
    }

    /// The next chat info fetch stays pending until the sender fires
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.fetch_gate.borrow_mut() = Some(rx);
        tx
    }
}

impl ChatApi for FakeApi {
    fn get_channel_chat_info(&self, _channel_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<ChatInfo>>> {
        self.chat_info_fetches.set(self.chat_info_fetches.get() + 1);
        let gate = self.fetch_gate.borrow_mut().take();
        let result = if self.fail_chat_info.get() {
            Err(ChatError::Lookup("500 Internal Server Error".to_string()))
        } else {
            Ok(self.chat_info.borrow().clone())
        };
        async move {
            wait_for(gate).await;
            result
        }
        .boxed_local()
    }

    fn get_user_info(&self, user_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<UserInfo>>> {
        self.user_lookups.set(self.user_lookups.get() + 1);
        let result = if self.fail_user_lookup.get() {
            Err(ChatError::Lookup("503 Service Unavailable".to_string()))
        } else {
            Ok(self.users.borrow().get(&user_id).cloned())
        };
        async move { result }.boxed_local()
    }
}

pub struct FakeSocketState {
    pub endpoints: Vec<String>,
    pub auth_calls: RefCell<Vec<(u64, Option<u64>, Option<String>)>>,
    pub closed: Cell<bool>,
    handlers: RefCell<HashMap<String, Rc<dyn Fn(Option<Value>)>>>,
}

impl FakeSocketState {
    /// Deliver an inbound event, as long as the socket is open
    pub fn emit(&self, event: &str, payload: Option<Value>) {
        if self.closed.get() {
            return;
        }
        self.emit_unchecked(event, payload);
    }

    /// Deliver an event to whatever handler is still registered
    pub fn emit_unchecked(&self, event: &str, payload: Option<Value>) {
        if let Some(handler) = self.handler(event) {
            handler(payload);
        }
    }

    pub fn handler(&self, event: &str) -> Option<Rc<dyn Fn(Option<Value>)>> {
        self.handlers.borrow().get(event).cloned()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

struct FakeSocket {
    state: Rc<FakeSocketState>,
    auth_result: ChatResult<()>,
    auth_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl ChatSocket for FakeSocket {
    fn auth(&self, channel_id: u64, user_id: Option<u64>, authkey: Option<&str>) -> LocalBoxFuture<'static, ChatResult<()>> {
        self.state
            .auth_calls
            .borrow_mut()
            .push((channel_id, user_id, authkey.map(|k| k.to_string())));
        let gate = self.auth_gate.borrow_mut().take();
        let result = self.auth_result.clone();
        async move {
            wait_for(gate).await;
            result
        }
        .boxed_local()
    }

    fn on(&self, event: &str, handler: InboundHandler) {
        self.state
            .handlers
            .borrow_mut()
            .insert(event.to_string(), Rc::from(handler));
    }

    fn close(&self) {
        self.state.closed.set(true);
        self.state.handlers.borrow_mut().clear();
    }
}

pub struct FakeTransport {
    pub auth_result: RefCell<ChatResult<()>>,
    sockets: RefCell<Vec<Rc<FakeSocketState>>>,
    auth_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport {
            auth_result: RefCell::new(Ok(())),
            sockets: RefCell::new(Vec::new()),
            auth_gate: RefCell::new(None),
        }
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.borrow().len()
    }

    pub fn socket(&self, index: usize) -> Rc<FakeSocketState> {
        self.sockets.borrow()[index].clone()
    }

    /// The next socket's handshake stays pending until the sender fires
    pub fn hold_next_auth(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.auth_gate.borrow_mut() = Some(rx);
        tx
    }
}

impl ChatTransport for FakeTransport {
    fn connect(&self, endpoints: &[String]) -> Box<dyn ChatSocket> {
        let state = Rc::new(FakeSocketState {
            endpoints: endpoints.to_vec(),
            auth_calls: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            handlers: RefCell::new(HashMap::new()),
        });
        self.sockets.borrow_mut().push(state.clone());
        Box::new(FakeSocket {
            state,
            auth_result: self.auth_result.borrow().clone(),
            auth_gate: RefCell::new(self.auth_gate.borrow_mut().take()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedCall {
    MessageDeleted(String, String),
    UserBanned(String),
    UserTimeout(String, String),
}

#[derive(Default)]
pub struct FakeFeed {
    calls: RefCell<Vec<FeedCall>>,
}

impl FakeFeed {
    pub fn calls(&self) -> Vec<FeedCall> {
        self.calls.borrow().clone()
    }
}

impl ChatFeed for FakeFeed {
    fn message_deleted(&self, id: &str, moderator: &str) {
        self.calls
            .borrow_mut()
            .push(FeedCall::MessageDeleted(id.to_string(), moderator.to_string()));
    }

    fn user_banned(&self, username: &str) {
        self.calls
            .borrow_mut()
            .push(FeedCall::UserBanned(username.to_string()));
    }

    fn user_timeout(&self, username: &str, moderator: &str) {
        self.calls
            .borrow_mut()
            .push(FeedCall::UserTimeout(username.to_string(), moderator.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: RefCell<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, detail: &Value) {
        self.events
            .borrow_mut()
            .push((topic.to_string(), detail.clone()));
    }
}

pub struct TestHarness {
    pub pool: LocalPool,
    pub api: Rc<FakeApi>,
    pub transport: Rc<FakeTransport>,
    pub feed: Rc<FakeFeed>,
    pub published: Rc<RecordingPublisher>,
    pub manager: ChatConnectionManager,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ChatConfig::default())
    }

    pub fn with_config(config: ChatConfig) -> Self {
        let pool = LocalPool::new();
        let api = Rc::new(FakeApi::new());
        let transport = Rc::new(FakeTransport::new());
        let feed = Rc::new(FakeFeed::default());
        let published = Rc::new(RecordingPublisher::default());

        let manager = ChatConnectionManager::new(
            config,
            Collaborators {
                api: api.clone(),
                transport: transport.clone(),
                feed: feed.clone(),
                publisher: published.clone(),
                spawner: Rc::new(pool.spawner()),
            },
        );

        TestHarness {
            pool,
            api,
            transport,
            feed,
            published,
            manager,
        }
    }

    /// Run a connect to completion, including any handshake that isn't held
    pub fn connect(&mut self, channel_id: Option<u64>, user_id: Option<u64>) {
        let manager = self.manager.clone();
        self.pool.run_until(manager.connect_to_chat(channel_id, user_id));
        self.pool.run_until_stalled();
    }

    /// Start a connect as a background task without driving it
    pub fn spawn_connect(&self, channel_id: Option<u64>, user_id: Option<u64>) {
        let manager = self.manager.clone();
        self.pool
            .spawner()
            .spawn_local(async move { manager.connect_to_chat(channel_id, user_id).await })
            .unwrap();
    }
}
