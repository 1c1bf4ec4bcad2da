/// Republishes chat events as `CustomEvent`s on `window`

use serde::Serialize;
use serde_json::Value;
use web_sys::{CustomEvent, CustomEventInit};

use crate::events::EventPublisher;

pub struct DomEventPublisher;

impl EventPublisher for DomEventPublisher {
    fn publish(&self, topic: &str, detail: &Value) {
        let Some(window) = web_sys::window() else {
            log::warn!("No window to dispatch {} on", topic);
            return;
        };

        // Plain JS objects rather than Maps, so listeners can read fields
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let detail = match detail.serialize(&serializer) {
            Ok(detail) => detail,
            Err(e) => {
                log::error!("Failed to convert {} detail: {:?}", topic, e);
                return;
            }
        };

        let init = CustomEventInit::new();
        init.set_detail(&detail);

        match CustomEvent::new_with_event_init_dict(topic, &init) {
            Ok(event) => {
                if let Err(e) = window.dispatch_event(&event) {
                    log::error!("Failed to dispatch {}: {:?}", topic, e);
                }
            }
            Err(e) => log::error!("Failed to create {} event: {:?}", topic, e),
        }
    }
}
