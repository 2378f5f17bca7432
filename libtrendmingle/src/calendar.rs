//! Calendar projection of posts
//!
//! Buckets are derived on every read and never stored. Keys come from
//! [`Post::date_key`], the date component of the post's local timestamp.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::types::{Platform, Post};

/// Number of posts a calendar cell renders before collapsing into "+N more".
pub const DEFAULT_PREVIEW_LIMIT: usize = 3;

/// Group posts by calendar day, each day ordered by `scheduled_at`.
///
/// Equal timestamps keep their input order.
pub fn group_by_date<'a, I>(posts: I) -> BTreeMap<NaiveDate, Vec<&'a Post>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut days: BTreeMap<NaiveDate, Vec<&'a Post>> = BTreeMap::new();
    for post in posts {
        days.entry(post.date_key()).or_default().push(post);
    }
    for bucket in days.values_mut() {
        bucket.sort_by_key(|post| post.scheduled_at());
    }
    days
}

/// Bounded slice of a day's posts for rendering.
#[derive(Debug, PartialEq, Eq)]
pub struct DayPreview<'a, T> {
    pub shown: &'a [T],
    pub overflow: usize,
}

pub fn day_preview<T>(posts: &[T], limit: usize) -> DayPreview<'_, T> {
    let shown = &posts[..posts.len().min(limit)];
    DayPreview {
        shown,
        overflow: posts.len().saturating_sub(limit),
    }
}

/// A not-yet-published post in the upcoming list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingPost<'a> {
    pub post: &'a Post,
    /// Scheduled time already passed on the viewer's clock.
    pub overdue: bool,
}

/// Every unpublished post in ascending `scheduled_at` order.
pub fn upcoming<'a, I>(posts: I, now: NaiveDateTime) -> Vec<UpcomingPost<'a>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut rows: Vec<UpcomingPost<'a>> = posts
        .into_iter()
        .filter(|post| !post.is_posted())
        .map(|post| UpcomingPost {
            post,
            overdue: post.scheduled_at() < now,
        })
        .collect();
    rows.sort_by_key(|row| row.post.scheduled_at());
    rows
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Day,
}

impl CalendarView {
    /// Inclusive span of days visible around `anchor`. Weeks start on Sunday.
    pub fn range(self, anchor: NaiveDate) -> RangeInclusive<NaiveDate> {
        match self {
            CalendarView::Day => anchor..=anchor,
            CalendarView::Week => {
                let offset = i64::from(anchor.weekday().num_days_from_sunday());
                let start = anchor - Duration::days(offset);
                start..=start + Duration::days(6)
            }
            CalendarView::Month => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                let (year, month) = if anchor.month() == 12 {
                    (anchor.year() + 1, 1)
                } else {
                    (anchor.year(), anchor.month() + 1)
                };
                let end = NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(anchor);
                start..=end
            }
        }
    }
}

/// [`group_by_date`] restricted to the days visible in `view`.
pub fn group_in_view<'a, I>(
    posts: I,
    view: CalendarView,
    anchor: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<&'a Post>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let range = view.range(anchor);
    group_by_date(
        posts
            .into_iter()
            .filter(|post| range.contains(&post.date_key())),
    )
}

/// "Today", "Tomorrow", "Yesterday" or a short date like "Sep 15".
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%b %-d").to_string(),
    }
}

/// 12-hour clock label such as "2:30 PM".
pub fn time_label(at: NaiveDateTime) -> String {
    at.format("%-I:%M %p").to_string()
}

/// Total engagement of published posts per platform.
pub fn engagement_by_platform<'a, I>(posts: I) -> BTreeMap<Platform, u64>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut totals = BTreeMap::new();
    for post in posts {
        if let Some(engagement) = post.engagement() {
            *totals.entry(post.platform()).or_insert(0) += engagement;
        }
    }
    totals
}
