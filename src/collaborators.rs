/// Seams to the world outside the connection manager: the HTTP API, the
/// chat-feed display and the third-party chat client.
///
/// Futures are `'static` and not `Send`; everything here runs on the single
/// browser thread.

use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::chat_data::{ChatInfo, UserInfo};
use crate::error::ChatResult;

/// Callback for one inbound socket event; `None` when the event had no payload
pub type InboundHandler = Box<dyn Fn(Option<Value>)>;

pub trait ChatApi {
    /// `Ok(None)` means the API had no chat info for the channel
    fn get_channel_chat_info(&self, channel_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<ChatInfo>>>;

    fn get_user_info(&self, user_id: u64) -> LocalBoxFuture<'static, ChatResult<Option<UserInfo>>>;
}

/// Moderation notices shown in the extension's chat feed
pub trait ChatFeed {
    fn message_deleted(&self, id: &str, moderator: &str);
    fn user_banned(&self, username: &str);
    fn user_timeout(&self, username: &str, moderator: &str);
}

/// Creates chat sockets. The client library owns framing, handshake and
/// reconnects.
pub trait ChatTransport {
    fn connect(&self, endpoints: &[String]) -> Box<dyn ChatSocket>;
}

pub trait ChatSocket {
    /// Start the auth handshake. Calls made before the socket is open are
    /// queued by the client library.
    fn auth(&self, channel_id: u64, user_id: Option<u64>, authkey: Option<&str>) -> LocalBoxFuture<'static, ChatResult<()>>;

    fn on(&self, event: &str, handler: InboundHandler);

    /// Close the socket and drop every registered handler
    fn close(&self);
}
