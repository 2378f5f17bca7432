//! Dashboard read-model
//!
//! A plain snapshot the presentation layer renders as-is. Everything here is
//! derived; nothing is stored.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::accounts::{ConnectionState, SocialAccount};
use crate::calendar::{self, CalendarView};
use crate::service::suggestions::SlotState;
use crate::suggestions::SuggestionCategory;
use crate::types::{Platform, Post, PostStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Dashboard,
    Calendar,
    Create,
    Analytics,
    Team,
    Settings,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Dashboard,
        Route::Calendar,
        Route::Create,
        Route::Analytics,
        Route::Team,
        Route::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Calendar => "/calendar",
            Route::Create => "/create",
            Route::Analytics => "/analytics",
            Route::Team => "/team",
            Route::Settings => "/settings",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Calendar => "Content Calendar",
            Route::Create => "Create Content",
            Route::Analytics => "Analytics",
            Route::Team => "Team",
            Route::Settings => "Settings",
        }
    }

    /// Match a path, ignoring a trailing slash. `None` for unknown routes.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|route| route.path() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub route: Route,
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

/// Sidebar entries with `active` highlighted.
pub fn navigation(active: Route) -> Vec<NavItem> {
    Route::ALL
        .into_iter()
        .map(|route| NavItem {
            route,
            label: route.label(),
            path: route.path(),
            active: route == active,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingRow {
    pub post_id: String,
    pub title: String,
    pub platform: Platform,
    pub status: PostStatus,
    pub day_label: String,
    pub time_label: String,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellPost {
    pub post_id: String,
    pub title: String,
    pub platform: Platform,
    pub status: PostStatus,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub posts: Vec<CellPost>,
    /// Rendered as "+N more" when non-zero
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRow {
    pub platform: Platform,
    pub label: &'static str,
    pub username: String,
    pub state: ConnectionState,
    pub last_synced_at: Option<NaiveDateTime>,
    /// e.g. "Today, 2:30 PM"
    pub last_synced_label: Option<String>,
    /// Buttons are disabled while a connect or sync is in flight
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionRow {
    pub category: SuggestionCategory,
    pub title: &'static str,
    pub content: String,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub navigation: Vec<NavItem>,
    pub upcoming: Vec<UpcomingRow>,
    pub calendar_view: CalendarView,
    pub calendar: Vec<CalendarCell>,
    pub accounts: Vec<AccountRow>,
    pub suggestions: Vec<SuggestionRow>,
    pub engagement: BTreeMap<Platform, u64>,
}

/// Inputs for [`DashboardView::build`].
pub struct DashboardInput<'a> {
    pub posts: &'a [Post],
    pub accounts: &'a [SocialAccount],
    pub suggestions: &'a [SlotState],
    pub now: NaiveDateTime,
    pub active: Route,
    pub view: CalendarView,
    pub anchor: NaiveDate,
    pub preview_limit: usize,
}

impl DashboardView {
    pub fn build(input: DashboardInput<'_>) -> Self {
        let today = input.now.date();

        let upcoming = calendar::upcoming(input.posts, input.now)
            .into_iter()
            .map(|row| UpcomingRow {
                post_id: row.post.id().to_string(),
                title: row.post.title().to_string(),
                platform: row.post.platform(),
                status: row.post.status(),
                day_label: calendar::day_label(row.post.date_key(), today),
                time_label: calendar::time_label(row.post.scheduled_at()),
                overdue: row.overdue,
            })
            .collect();

        let calendar = calendar::group_in_view(input.posts, input.view, input.anchor)
            .into_iter()
            .map(|(date, posts)| {
                let preview = calendar::day_preview(&posts, input.preview_limit);
                CalendarCell {
                    date,
                    posts: preview.shown.iter().map(|post| cell_post(post)).collect(),
                    overflow: preview.overflow,
                }
            })
            .collect();

        let accounts = input
            .accounts
            .iter()
            .map(|account| AccountRow {
                platform: account.platform(),
                label: account.platform().label(),
                username: account.username().to_string(),
                state: account.state(),
                last_synced_at: account.last_synced_at(),
                last_synced_label: account.last_synced_at().map(|at| {
                    format!(
                        "{}, {}",
                        calendar::day_label(at.date(), today),
                        calendar::time_label(at)
                    )
                }),
                busy: account.state().is_pending(),
            })
            .collect();

        let suggestions = input
            .suggestions
            .iter()
            .map(|state| SuggestionRow {
                category: state.slot.category,
                title: state.slot.category.title(),
                content: state.slot.content.clone(),
                pending: state.pending,
            })
            .collect();

        Self {
            navigation: navigation(input.active),
            upcoming,
            calendar_view: input.view,
            calendar,
            accounts,
            suggestions,
            engagement: calendar::engagement_by_platform(input.posts),
        }
    }
}

fn cell_post(post: &Post) -> CellPost {
    CellPost {
        post_id: post.id().to_string(),
        title: post.title().to_string(),
        platform: post.platform(),
        status: post.status(),
        time_label: calendar::time_label(post.scheduled_at()),
    }
}
