/// `TabHost` backed by the WebExtension APIs through `host.js`.
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::background::RefreshTimer;
use crate::error::HostError;
use crate::host::{CreateProperties, IconKind, MenuItem, TabHost, TabQuery};
use crate::tab_data::TabInfo;

// Import JS bridge functions
#[wasm_bindgen(module = "/host.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(props: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveTab(tab_id: i32, index: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeAllMenus() -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createMenu(item: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn setActionIcon(paths: JsValue) -> Result<(), JsValue>;

    fn scheduleTimeout(delay_ms: u32, callback: &js_sys::Function);
}

/// The running browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeHost;

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn describe(err: JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

#[async_trait(?Send)]
impl TabHost for ChromeHost {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError> {
        let query_js = to_js(&query).map_err(|e| HostError::Tabs(describe(e)))?;
        let tabs_js = queryTabs(query_js).await.map_err(|e| HostError::Tabs(describe(e)))?;
        serde_wasm_bindgen::from_value(tabs_js).map_err(|e| HostError::Tabs(format!("Failed to parse tabs: {}", e)))
    }

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError> {
        let ids_js = to_js(tab_ids).map_err(|e| HostError::Tabs(describe(e)))?;
        removeTabs(ids_js).await.map_err(|e| HostError::Tabs(describe(e)))
    }

    async fn create_tab(&self, props: &CreateProperties) -> Result<(), HostError> {
        let props_js = to_js(props).map_err(|e| HostError::Tabs(describe(e)))?;
        createTab(props_js).await.map_err(|e| HostError::Tabs(describe(e)))
    }

    async fn move_tab(&self, tab_id: i32, index: usize) -> Result<(), HostError> {
        let index = u32::try_from(index).map_err(|e| HostError::Tabs(e.to_string()))?;
        moveTab(tab_id, index).await.map_err(|e| HostError::Tabs(describe(e)))
    }

    async fn storage_get(&self, key: &str) -> Result<Option<Value>, HostError> {
        let value_js = getStorage(key).await.map_err(|e| HostError::Storage(describe(e)))?;
        if value_js.is_null() || value_js.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value_js)
            .map(Some)
            .map_err(|e| HostError::Storage(format!("Failed to parse {}: {}", key, e)))
    }

    async fn storage_set(&self, key: &str, value: Value) -> Result<(), HostError> {
        let value_js = to_js(&value).map_err(|e| HostError::Storage(describe(e)))?;
        setStorage(key, value_js).await.map_err(|e| HostError::Storage(describe(e)))
    }

    async fn clear_context_menus(&self) -> Result<(), HostError> {
        removeAllMenus().await.map_err(|e| HostError::Menus(describe(e)))
    }

    async fn create_context_menu(&self, item: &MenuItem) -> Result<(), HostError> {
        let item_js = to_js(item).map_err(|e| HostError::Menus(describe(e)))?;
        createMenu(item_js).await.map_err(|e| HostError::Menus(describe(e)))
    }

    async fn set_action_icon(&self, icon: IconKind) -> Result<(), HostError> {
        let paths: std::collections::BTreeMap<String, &str> =
            icon.paths().into_iter().map(|(size, path)| (size.to_string(), path)).collect();
        let paths_js = to_js(&paths).map_err(|e| HostError::Icon(describe(e)))?;
        setActionIcon(paths_js).await.map_err(|e| HostError::Icon(describe(e)))
    }

    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

/// `setTimeout` timer that runs the icon refresh on the global background.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeTimer;

impl RefreshTimer for ChromeTimer {
    fn arm(&self, delay_ms: u32) {
        let callback = Closure::once_into_js(|| {
            wasm_bindgen_futures::spawn_local(async {
                crate::background_handle().refresh_icon().await;
            });
        });
        scheduleTimeout(delay_ms, callback.unchecked_ref());
    }
}
