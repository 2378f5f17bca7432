//! Core types for TrendMingle
//!
//! A [`Post`] moves through `idea → draft → scheduled → posted`. Every
//! transition checks its precondition before touching any field, so a
//! rejected call leaves the post exactly as it was.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{MingleError, Result};

/// Social networks a post can target and an account can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Twitter,
    Linkedin,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Tiktok,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Tiktok => "tiktok",
        }
    }

    /// Display name as shown in the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Twitter => "Twitter",
            Platform::Linkedin => "LinkedIn",
            Platform::Tiktok => "TikTok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = MingleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "twitter" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(MingleError::Validation(format!(
                "Unknown platform '{}'. Valid options: instagram, twitter, linkedin, tiktok",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Idea,
    Draft,
    Scheduled,
    Posted,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Idea => "idea",
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Posted => "posted",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = MingleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idea" => Ok(PostStatus::Idea),
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "posted" => Ok(PostStatus::Posted),
            other => Err(MingleError::Validation(format!(
                "Unknown post status '{}'",
                other
            ))),
        }
    }
}

/// A schedulable content item.
///
/// `scheduled_at` is timezone-naive and read in the viewer's local clock.
/// `engagement` is present if and only if the post has been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PostFields")]
pub struct Post {
    id: String,
    title: String,
    scheduled_at: NaiveDateTime,
    platform: Platform,
    status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    engagement: Option<u64>,
    /// Full text to publish; empty for posts created from a title alone.
    #[serde(skip_serializing_if = "String::is_empty")]
    body: String,
}

#[derive(Deserialize)]
struct PostFields {
    id: String,
    title: String,
    scheduled_at: NaiveDateTime,
    platform: Platform,
    status: PostStatus,
    #[serde(default)]
    engagement: Option<u64>,
    #[serde(default)]
    body: String,
}

impl TryFrom<PostFields> for Post {
    type Error = MingleError;

    fn try_from(fields: PostFields) -> Result<Self> {
        Post::restore(
            fields.id,
            fields.title,
            fields.scheduled_at,
            fields.platform,
            fields.status,
            fields.engagement,
        )
        .map(|post| post.with_body(fields.body))
    }
}

impl Post {
    /// Create a draft from a title and a timestamp string.
    ///
    /// Accepts the local timestamp formats understood by
    /// [`crate::scheduling::parse_timestamp`].
    pub fn create(title: impl Into<String>, platform: Platform, scheduled_at: &str) -> Result<Self> {
        let title = validate_title(title.into())?;
        let at = crate::scheduling::parse_timestamp(scheduled_at)?;
        Ok(Self::fresh(title, platform, at, PostStatus::Draft))
    }

    /// Create a draft from an already-parsed timestamp.
    pub fn draft(title: impl Into<String>, platform: Platform, scheduled_at: NaiveDateTime) -> Result<Self> {
        let title = validate_title(title.into())?;
        Ok(Self::fresh(title, platform, scheduled_at, PostStatus::Draft))
    }

    /// Create a pre-draft idea.
    pub fn idea(title: impl Into<String>, platform: Platform, scheduled_at: NaiveDateTime) -> Result<Self> {
        let title = validate_title(title.into())?;
        Ok(Self::fresh(title, platform, scheduled_at, PostStatus::Idea))
    }

    /// Rebuild a post from stored fields, re-checking its invariants.
    pub fn restore(
        id: String,
        title: String,
        scheduled_at: NaiveDateTime,
        platform: Platform,
        status: PostStatus,
        engagement: Option<u64>,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(MingleError::Validation("Post id cannot be empty".to_string()));
        }
        let title = validate_title(title)?;
        match (status, engagement) {
            (PostStatus::Posted, None) => {
                return Err(MingleError::Validation(format!(
                    "Posted post {} is missing its engagement count",
                    id
                )))
            }
            (PostStatus::Idea | PostStatus::Draft | PostStatus::Scheduled, Some(_)) => {
                return Err(MingleError::Validation(format!(
                    "Post {} carries engagement but is {}",
                    id, status
                )))
            }
            _ => {}
        }
        Ok(Self {
            id,
            title,
            scheduled_at,
            platform,
            status,
            engagement,
            body: String::new(),
        })
    }

    fn fresh(title: String, platform: Platform, scheduled_at: NaiveDateTime, status: PostStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            scheduled_at,
            platform,
            status,
            engagement: None,
            body: String::new(),
        }
    }

    /// Attach the text that will be published.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.scheduled_at
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn status(&self) -> PostStatus {
        self.status
    }

    pub fn engagement(&self) -> Option<u64> {
        self.engagement
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_posted(&self) -> bool {
        self.status == PostStatus::Posted
    }

    /// Calendar day this post is filed under.
    pub fn date_key(&self) -> NaiveDate {
        self.scheduled_at.date()
    }

    /// `idea → draft`
    pub fn promote(&mut self) -> Result<()> {
        self.require(PostStatus::Idea, "promote")?;
        self.status = PostStatus::Draft;
        Ok(())
    }

    /// `draft → scheduled`
    pub fn schedule(&mut self) -> Result<()> {
        self.require(PostStatus::Draft, "schedule")?;
        self.status = PostStatus::Scheduled;
        Ok(())
    }

    /// `scheduled → posted`, attaching the engagement count.
    pub fn mark_posted(&mut self, engagement: i64) -> Result<()> {
        self.require(PostStatus::Scheduled, "mark as posted")?;
        let engagement = u64::try_from(engagement).map_err(|_| {
            MingleError::Validation(format!(
                "Engagement for post {} cannot be negative (got {})",
                self.id, engagement
            ))
        })?;
        self.status = PostStatus::Posted;
        self.engagement = Some(engagement);
        Ok(())
    }

    pub fn retitle(&mut self, title: impl Into<String>) -> Result<()> {
        self.require_editable("retitle")?;
        self.title = validate_title(title.into())?;
        Ok(())
    }

    pub fn reschedule(&mut self, scheduled_at: NaiveDateTime) -> Result<()> {
        self.require_editable("reschedule")?;
        self.scheduled_at = scheduled_at;
        Ok(())
    }

    /// Published posts are history and cannot be removed.
    pub fn ensure_deletable(&self) -> Result<()> {
        self.require_editable("delete")
    }

    fn require(&self, expected: PostStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(MingleError::invalid_transition(
                format!("post {}", self.id),
                action,
                self.status,
            ))
        }
    }

    fn require_editable(&self, action: &'static str) -> Result<()> {
        if self.is_posted() {
            Err(MingleError::invalid_transition(
                format!("post {}", self.id),
                action,
                self.status,
            ))
        } else {
            Ok(())
        }
    }
}

fn validate_title(title: String) -> Result<String> {
    if title.trim().is_empty() {
        return Err(MingleError::Validation("Post title cannot be empty".to_string()));
    }
    Ok(title)
}
