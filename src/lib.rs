/// Tab Eater - browser extension background core
/// Built with Rust + WASM
pub mod background;
pub mod chrome;
pub mod domain;
pub mod error;
pub mod history;
pub mod host;
pub mod messages;
pub mod operations;
pub mod restore;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod suggestions;
pub mod tab_data;

#[cfg(test)]
mod test_support;

use std::rc::Rc;

use wasm_bindgen::prelude::*;

use background::Background;
use chrome::{ChromeHost, ChromeTimer};
use messages::Request;

type ChromeBackground = Background<ChromeHost, ChromeTimer>;

thread_local! {
    static BACKGROUND: Rc<ChromeBackground> = Rc::new(Background::new(ChromeHost, ChromeTimer));
}

pub(crate) fn background_handle() -> Rc<ChromeBackground> {
    BACKGROUND.with(Rc::clone)
}

// Set up panic hook and logging, then register menus and the toolbar icon
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    wasm_bindgen_futures::spawn_local(async {
        let background = background_handle();
        background.install_context_menus().await;
        background.refresh_icon().await;
    });
}

/// Entry point for `runtime.onMessage`. Resolves to `undefined` for messages
/// this extension does not understand.
#[wasm_bindgen]
pub async fn handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    let value: serde_json::Value = serde_wasm_bindgen::from_value(message)?;
    let Some(request) = Request::from_value(value) else {
        return Ok(JsValue::UNDEFINED);
    };

    let response = background_handle().handle(request).await;
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(serde::Serialize::serialize(&response, &serializer)?)
}

/// Tab created/removed/activated/updated/replaced, or settings changed.
#[wasm_bindgen]
pub fn on_tabs_changed() {
    background_handle().schedule_refresh();
}

/// `runtime.onInstalled` / `runtime.onStartup`.
#[wasm_bindgen]
pub async fn on_installed() {
    background_handle().install_context_menus().await;
}

#[wasm_bindgen]
pub async fn on_context_menu_clicked(menu_item_id: String, page_url: Option<String>) {
    background_handle()
        .on_menu_clicked(&menu_item_id, page_url.as_deref())
        .await;
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn domain_from_url(url: &str) -> Option<String> {
    domain::domain_from_url(url)
}
