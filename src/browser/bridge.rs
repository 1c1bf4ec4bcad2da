/// Collaborator implementations backed by the extension's JS modules

use futures::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::chat_data::{ChatInfo, UserInfo};
use crate::collaborators::{ChatApi, ChatFeed, ChatSocket, ChatTransport, InboundHandler};
use crate::error::{ChatError, ChatResult};

// Import JS bridge functions
#[wasm_bindgen(module = "/chat_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn getChannelChatInfo(channel_id: f64) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch)]
    fn getUserInfo(user_id: f64) -> Result<js_sys::Promise, JsValue>;

    fn messageDeleted(id: &str, moderator: &str);

    fn userBanned(username: &str);

    fn userTimeout(username: &str, moderator: &str);

    fn createChatSocket(endpoints: js_sys::Array) -> ClientSocket;

    /// Socket object from the chat-client library
    type ClientSocket;

    #[wasm_bindgen(method)]
    fn auth(this: &ClientSocket, channel_id: f64, user_id: JsValue, authkey: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(method)]
    fn on(this: &ClientSocket, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = removeAllListeners)]
    fn remove_all_listeners(this: &ClientSocket);

    #[wasm_bindgen(method)]
    fn close(this: &ClientSocket);
}

fn js_error(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Await a lookup promise; `null`/`undefined` become `None`
async fn lookup<T: DeserializeOwned>(promise: Result<js_sys::Promise, JsValue>) -> ChatResult<Option<T>> {
    let promise = promise.map_err(|e| ChatError::Bridge(js_error(&e)))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| ChatError::Lookup(js_error(&e)))?;

    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(value)
        .map(Some)
        .map_err(|e| ChatError::Lookup(format!("Failed to parse response: {:?}", e)))
}

pub struct JsChatApi;

impl ChatApi for JsChatApi {
    fn get_channel_chat_info(&self, channel_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<ChatInfo>>> {
        lookup(getChannelChatInfo(channel_id as f64)).boxed_local()
    }

    fn get_user_info(&self, user_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<UserInfo>>> {
        lookup(getUserInfo(user_id as f64)).boxed_local()
    }
}

pub struct JsChatFeed;

impl ChatFeed for JsChatFeed {
    fn message_deleted(&self, id: &str, moderator: &str) {
        messageDeleted(id, moderator);
    }

    fn user_banned(&self, username: &str) {
        userBanned(username);
    }

    fn user_timeout(&self, username: &str, moderator: &str) {
        userTimeout(username, moderator);
    }
}

pub struct JsChatTransport;

impl ChatTransport for JsChatTransport {
    fn connect(&self, endpoints: &[String]) -> Box<dyn ChatSocket> {
        let endpoints: js_sys::Array = endpoints.iter().map(|e| JsValue::from_str(e)).collect();
        Box::new(JsChatSocket {
            socket: createChatSocket(endpoints),
            handlers: RefCell::new(Vec::new()),
        })
    }
}

struct JsChatSocket {
    socket: ClientSocket,
    // Keeps the JS callbacks alive for as long as the socket is owned
    handlers: RefCell<Vec<Closure<dyn Fn(JsValue)>>>,
}

impl ChatSocket for JsChatSocket {
    fn auth(&self, channel_id: u64, user_id: Option<u64>, authkey: Option<&str>) -> LocalBoxFuture<'static, ChatResult<()>> {
        let user_id = user_id.map_or(JsValue::NULL, |id| JsValue::from_f64(id as f64));
        let authkey = authkey.map_or(JsValue::NULL, JsValue::from_str);
        let promise = self.socket.auth(channel_id as f64, user_id, authkey);

        async move {
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| ChatError::Auth(js_error(&e)))
        }
        .boxed_local()
    }

    fn on(&self, event: &str, handler: InboundHandler) {
        let event_name = event.to_string();
        let closure = Closure::wrap(Box::new(move |data: JsValue| {
            let payload = if data.is_null() || data.is_undefined() {
                None
            } else {
                match serde_wasm_bindgen::from_value::<Value>(data) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("Unreadable {} payload: {:?}", event_name, e);
                        None
                    }
                }
            };
            handler(payload);
        }) as Box<dyn Fn(JsValue)>);

        self.socket.on(event, closure.as_ref().unchecked_ref());
        self.handlers.borrow_mut().push(closure);
    }

    fn close(&self) {
        // Late events (e.g. an error from a half-open socket) must not reach
        // closures that are about to be freed
        self.socket.remove_all_listeners();
        self.socket.close();
        self.handlers.borrow_mut().clear();
    }
}
