/// Chat Relay - chat connection manager for the extension
/// Built with Rust + WASM

mod chat_data;
mod collaborators;
mod config;
mod error;
mod events;
mod manager;
mod moderation;
#[cfg(test)]
mod testutil;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use chat_data::{ChatInfo, ConnectionState, DeleteMessage, InboundEvent, ModeratorRef, PurgeMessage, UserInfo};
pub use collaborators::{ChatApi, ChatFeed, ChatSocket, ChatTransport, InboundHandler};
pub use config::ChatConfig;
pub use error::{ChatError, ChatResult};
pub use events::{EventBus, EventPublisher, Subscription};
pub use manager::{ChatConnectionManager, Collaborators};

use wasm_bindgen::prelude::*;

// Set up panic hook and logging for the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}
