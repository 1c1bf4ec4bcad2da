/// Browser entry points: JS-backed collaborators and the exported
/// `ChatConnection` class

mod bridge;
mod dom;

pub use bridge::{JsChatApi, JsChatFeed, JsChatTransport};
pub use dom::DomEventPublisher;

use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::manager::{ChatConnectionManager, Collaborators};

/// Runs local futures on the browser's microtask queue
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

fn parse_config(config: JsValue) -> Result<ChatConfig, ChatError> {
    if config.is_null() || config.is_undefined() {
        return Ok(ChatConfig::default());
    }
    let value: serde_json::Value = serde_wasm_bindgen::from_value(config)
        .map_err(|e| ChatError::InvalidConfig(format!("{:?}", e)))?;
    ChatConfig::from_json(value)
}

#[wasm_bindgen]
pub struct ChatConnection {
    manager: ChatConnectionManager,
}

#[wasm_bindgen]
impl ChatConnection {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ChatConnection, JsValue> {
        let config = parse_config(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::debug!("Chat relay using namespace {}", config.event_namespace);

        let manager = ChatConnectionManager::new(
            config,
            Collaborators {
                api: Rc::new(JsChatApi),
                transport: Rc::new(JsChatTransport),
                feed: Rc::new(JsChatFeed),
                publisher: Rc::new(DomEventPublisher),
                spawner: Rc::new(BrowserSpawner),
            },
        );
        Ok(ChatConnection { manager })
    }

    #[wasm_bindgen(js_name = connectToChat)]
    pub fn connect_to_chat(&self, channel_id: Option<f64>, user_id: Option<f64>) -> js_sys::Promise {
        let manager = self.manager.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            manager
                .connect_to_chat(channel_id.map(|id| id as u64), user_id.map(|id| id as u64))
                .await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = disconnectChat)]
    pub fn disconnect_chat(&self) {
        self.manager.disconnect_chat();
    }

    pub fn shutdown(&self) {
        self.manager.shutdown();
    }

    pub fn state(&self) -> String {
        self.manager.state().as_str().to_string()
    }

    #[wasm_bindgen(js_name = isModerator)]
    pub fn is_moderator(&self) -> bool {
        self.manager.is_moderator()
    }
}
