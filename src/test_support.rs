/// In-memory browser used by unit tests.
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HostError;
use crate::host::{CreateProperties, IconKind, MenuItem, TabHost, TabQuery};
use crate::tab_data::TabInfo;

pub const NOW: i64 = 1_700_000_000_000;

pub struct FakeHost {
    tabs: RefCell<Vec<TabInfo>>,
    current_window: i32,
    next_id: Cell<i32>,
    now: Cell<i64>,
    storage: RefCell<HashMap<String, Value>>,
    storage_writes_fail: Cell<bool>,
    closed_windows: RefCell<HashSet<i32>>,
    failing_moves: RefCell<HashSet<i32>>,
    creates_fail: Cell<bool>,
    created: RefCell<Vec<CreateProperties>>,
    removed: RefCell<Vec<i32>>,
    moves: RefCell<Vec<(i32, usize)>>,
    menus: RefCell<Vec<MenuItem>>,
    menu_clears: Cell<usize>,
    icons: RefCell<Vec<IconKind>>,
}

impl FakeHost {
    pub fn new() -> Self {
        FakeHost {
            tabs: RefCell::new(Vec::new()),
            current_window: 1,
            next_id: Cell::new(1000),
            now: Cell::new(NOW),
            storage: RefCell::new(HashMap::new()),
            storage_writes_fail: Cell::new(false),
            closed_windows: RefCell::new(HashSet::new()),
            failing_moves: RefCell::new(HashSet::new()),
            creates_fail: Cell::new(false),
            created: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            moves: RefCell::new(Vec::new()),
            menus: RefCell::new(Vec::new()),
            menu_clears: Cell::new(0),
            icons: RefCell::new(Vec::new()),
        }
    }

    pub fn with_tabs(tabs: Vec<TabInfo>) -> Self {
        let host = FakeHost::new();
        *host.tabs.borrow_mut() = tabs;
        host
    }

    pub fn set_now(&self, now: i64) {
        self.now.set(now);
    }

    pub fn seed_storage(&self, key: &str, value: Value) {
        self.storage.borrow_mut().insert(key.to_string(), value);
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.storage.borrow().get(key).cloned()
    }

    pub fn fail_storage_writes(&self) {
        self.storage_writes_fail.set(true);
    }

    pub fn close_window(&self, window_id: i32) {
        self.closed_windows.borrow_mut().insert(window_id);
    }

    pub fn fail_move(&self, tab_id: i32) {
        self.failing_moves.borrow_mut().insert(tab_id);
    }

    pub fn fail_all_creates(&self) {
        self.creates_fail.set(true);
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.tabs.borrow().clone()
    }

    /// Tabs of one window in on-screen order.
    pub fn window_tabs(&self, window_id: i32) -> Vec<TabInfo> {
        let mut tabs: Vec<TabInfo> = self
            .tabs
            .borrow()
            .iter()
            .filter(|t| t.window_id == Some(window_id))
            .cloned()
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs
    }

    pub fn created(&self) -> Vec<CreateProperties> {
        self.created.borrow().clone()
    }

    pub fn removed(&self) -> Vec<i32> {
        self.removed.borrow().clone()
    }

    pub fn moves(&self) -> Vec<(i32, usize)> {
        self.moves.borrow().clone()
    }

    pub fn menus(&self) -> Vec<MenuItem> {
        self.menus.borrow().clone()
    }

    pub fn menu_clears(&self) -> usize {
        self.menu_clears.get()
    }

    pub fn icons(&self) -> Vec<IconKind> {
        self.icons.borrow().clone()
    }

    fn place(&self, tab: TabInfo, index: Option<usize>) {
        let window_id = tab.window_id;
        let mut tabs = self.tabs.borrow_mut();
        let (mut window, rest): (Vec<TabInfo>, Vec<TabInfo>) =
            tabs.drain(..).partition(|t| t.window_id == window_id);
        window.sort_by_key(|t| t.index);

        let at = index.unwrap_or(window.len()).min(window.len());
        window.insert(at, tab);
        for (i, t) in window.iter_mut().enumerate() {
            t.index = Some(i as i32);
        }

        tabs.extend(rest);
        tabs.extend(window);
    }
}

#[async_trait(?Send)]
impl TabHost for FakeHost {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError> {
        Ok(self
            .tabs
            .borrow()
            .iter()
            .filter(|t| !query.current_window || t.window_id == Some(self.current_window))
            .filter(|t| query.active.is_none_or(|active| t.active == active))
            .cloned()
            .collect())
    }

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError> {
        self.tabs.borrow_mut().retain(|t| !tab_ids.contains(&t.id));
        self.removed.borrow_mut().extend_from_slice(tab_ids);
        Ok(())
    }

    async fn create_tab(&self, props: &CreateProperties) -> Result<(), HostError> {
        if self.creates_fail.get() {
            return Err(HostError::Tabs("creation disabled".to_string()));
        }
        if let Some(window_id) = props.window_id {
            if self.closed_windows.borrow().contains(&window_id) {
                return Err(HostError::Tabs(format!("No window with id: {}", window_id)));
            }
        }

        self.created.borrow_mut().push(props.clone());
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let tab = TabInfo {
            id,
            window_id: Some(props.window_id.unwrap_or(self.current_window)),
            url: props.url.clone(),
            pinned: props.pinned,
            active: props.active,
            ..Default::default()
        };
        self.place(tab, props.index.map(|i| i.max(0) as usize));
        Ok(())
    }

    async fn move_tab(&self, tab_id: i32, index: usize) -> Result<(), HostError> {
        if self.failing_moves.borrow().contains(&tab_id) {
            return Err(HostError::Tabs(format!("Tab {} cannot be moved", tab_id)));
        }

        let tab = {
            let mut tabs = self.tabs.borrow_mut();
            let pos = tabs
                .iter()
                .position(|t| t.id == tab_id)
                .ok_or_else(|| HostError::Tabs(format!("No tab with id: {}", tab_id)))?;
            tabs.remove(pos)
        };
        self.place(tab, Some(index));
        self.moves.borrow_mut().push((tab_id, index));
        Ok(())
    }

    async fn storage_get(&self, key: &str) -> Result<Option<Value>, HostError> {
        Ok(self.stored(key))
    }

    async fn storage_set(&self, key: &str, value: Value) -> Result<(), HostError> {
        if self.storage_writes_fail.get() {
            return Err(HostError::Storage("QUOTA_BYTES quota exceeded".to_string()));
        }
        self.seed_storage(key, value);
        Ok(())
    }

    async fn clear_context_menus(&self) -> Result<(), HostError> {
        self.menus.borrow_mut().clear();
        self.menu_clears.set(self.menu_clears.get() + 1);
        Ok(())
    }

    async fn create_context_menu(&self, item: &MenuItem) -> Result<(), HostError> {
        self.menus.borrow_mut().push(item.clone());
        Ok(())
    }

    async fn set_action_icon(&self, icon: IconKind) -> Result<(), HostError> {
        self.icons.borrow_mut().push(icon);
        Ok(())
    }

    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}
