/// Long-lived background coordinator.
///
/// Owns the host handle and the little mutable state the extension keeps
/// between events (last icon set, pending icon refresh). Requests from the
/// popup and context menus all come through [`Background::handle`].
use std::cell::RefCell;

use log::{error, warn};

use crate::domain::domain_from_url;
use crate::error::Result;
use crate::host::{IconKind, MenuItem, TabHost, TabQuery};
use crate::messages::{Payload, Request, Response, RestoreOutcome, SortOutcome};
use crate::operations::{self, CloseOutcome};
use crate::restore;
use crate::settings::{self, Settings};
use crate::stats;
use crate::suggestions;

pub const ICON_REFRESH_DELAY_MS: u32 = 250;

pub const CLOSE_SITE_MENU_ID: &str = "tabEater-close-site-tabs-page";

const CLOSE_SITE_CONTEXTS: [&str; 8] = ["page", "selection", "link", "editable", "image", "video", "audio", "tab"];

/// Arms a one-shot timer that eventually calls [`Background::refresh_icon`].
pub trait RefreshTimer {
    fn arm(&self, delay_ms: u32);
}

#[derive(Debug, Default)]
struct IconState {
    refresh_pending: bool,
    current: Option<IconKind>,
}

pub struct Background<H, T> {
    host: H,
    timer: T,
    icon: RefCell<IconState>,
}

impl<H: TabHost, T: RefreshTimer> Background<H, T> {
    pub fn new(host: H, timer: T) -> Self {
        Background {
            host,
            timer,
            icon: RefCell::new(IconState::default()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::CloseByKeyword { query } => {
                self.respond_closed("closeByKeyword", |settings| async move {
                    operations::close_by_keyword(&self.host, &settings, &query).await
                })
                .await
            }
            Request::CloseInactive => {
                self.respond_closed("closeInactive", |settings| async move {
                    operations::close_inactive(&self.host, &settings).await
                })
                .await
            }
            Request::CloseDuplicates => {
                self.respond_closed("closeDuplicates", |settings| async move {
                    operations::close_duplicates(&self.host, &settings).await
                })
                .await
            }
            Request::RestoreTabs { tabs } => {
                let records = tabs.as_array().map(Vec::as_slice).unwrap_or_default();
                let restored_count = restore::restore_tabs(&self.host, records).await;
                if restored_count > 0 {
                    self.schedule_refresh();
                }
                Response::ok(Payload::Restored(RestoreOutcome { restored_count }))
            }
            Request::SortTabsByOpenCount => match operations::sort_tabs_by_open_count(&self.host).await {
                Ok(sorted_count) => {
                    if sorted_count > 0 {
                        self.schedule_refresh();
                    }
                    Response::ok(Payload::Sorted(SortOutcome { sorted_count }))
                }
                Err(e) => failed("sortTabsByOpenCount", e),
            },
            Request::GetSuggestions => {
                let result = async {
                    let settings = settings::load(&self.host).await?;
                    suggestions::get_suggestions(&self.host, &settings).await
                };
                match result.await {
                    Ok(suggestions) => Response::ok(Payload::Suggestions { suggestions }),
                    Err(e) => failed("getSuggestions", e),
                }
            }
            Request::GetSettings => match settings::load(&self.host).await {
                Ok(settings) => Response::ok(Payload::Settings { settings }),
                Err(e) => failed("getSettings", e),
            },
            Request::UpdateSettings { payload } => match settings::update(&self.host, &payload).await {
                Ok(_) => {
                    self.schedule_refresh();
                    Response::done()
                }
                Err(e) => failed("updateSettings", e),
            },
            Request::GetStats => match stats::read(&self.host).await {
                Ok(stats) => Response::ok(Payload::Stats { stats }),
                Err(e) => failed("getStats", e),
            },
            Request::ResetStats => match stats::reset(&self.host).await {
                Ok(_) => Response::done(),
                Err(e) => failed("resetStats", e),
            },
        }
    }

    async fn respond_closed<F, Fut>(&self, name: &str, close: F) -> Response
    where
        F: FnOnce(Settings) -> Fut,
        Fut: Future<Output = Result<CloseOutcome>>,
    {
        let outcome = match settings::load(&self.host).await {
            Ok(settings) => close(settings).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                if outcome.closed_count > 0 {
                    self.schedule_refresh();
                }
                Response::ok(Payload::Closed(outcome))
            }
            Err(e) => failed(name, e),
        }
    }

    /// Ask for an icon refresh. Bursts of tab events collapse into one timer;
    /// returns the delay armed, or `None` if a refresh was already pending.
    pub fn schedule_refresh(&self) -> Option<u32> {
        {
            let mut icon = self.icon.borrow_mut();
            if icon.refresh_pending {
                return None;
            }
            icon.refresh_pending = true;
        }
        self.timer.arm(ICON_REFRESH_DELAY_MS);
        Some(ICON_REFRESH_DELAY_MS)
    }

    /// Timer callback: set the toolbar icon unless it is already current.
    pub async fn refresh_icon(&self) {
        let wanted = IconKind::Active;
        {
            let mut icon = self.icon.borrow_mut();
            icon.refresh_pending = false;
            if icon.current == Some(wanted) {
                return;
            }
        }

        match self.host.set_action_icon(wanted).await {
            Ok(()) => self.icon.borrow_mut().current = Some(wanted),
            Err(e) => warn!("Unable to set action icon: {}", e),
        }
    }

    pub fn current_icon_state(&self) -> Option<IconKind> {
        self.icon.borrow().current
    }

    pub fn refresh_pending(&self) -> bool {
        self.icon.borrow().refresh_pending
    }

    /// Replace all context menu entries with ours. Failures are logged.
    pub async fn install_context_menus(&self) {
        if let Err(e) = self.host.clear_context_menus().await {
            warn!("Context menu removeAll failed: {}", e);
        }

        let item = MenuItem {
            id: CLOSE_SITE_MENU_ID.to_string(),
            title: "Close site tabs".to_string(),
            contexts: CLOSE_SITE_CONTEXTS.iter().map(|c| c.to_string()).collect(),
        };
        if let Err(e) = self.host.create_context_menu(&item).await {
            warn!("Context menu create failed (contexts: {}): {}", item.contexts.join(","), e);
        }
    }

    pub async fn on_menu_clicked(&self, menu_item_id: &str, page_url: Option<&str>) {
        if menu_item_id != CLOSE_SITE_MENU_ID {
            return;
        }
        if let Err(e) = self.close_site_tabs(page_url).await {
            error!("Context menu action {} failed: {}", menu_item_id, e);
        }
    }

    /// Close every tab of the site the user right-clicked, falling back to
    /// the active tab of the current window when the click carried no URL.
    pub async fn close_site_tabs(&self, page_url: Option<&str>) -> Result<CloseOutcome> {
        let url = match page_url.filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => {
                let active = self.host.query_tabs(TabQuery::active_in_current_window()).await?;
                active.into_iter().next().map(|t| t.url).unwrap_or_default()
            }
        };

        let Some(domain) = domain_from_url(&url) else {
            return Ok(CloseOutcome::default());
        };

        let settings = settings::load(&self.host).await?;
        let outcome = operations::close_by_keyword(&self.host, &settings, &domain).await?;
        if outcome.closed_count > 0 {
            self.schedule_refresh();
        }
        Ok(outcome)
    }
}

fn failed(operation: &str, e: crate::error::Error) -> Response {
    error!("{} failed: {}", operation, e);
    Response::failed()
}
