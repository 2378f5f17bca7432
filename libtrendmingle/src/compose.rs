//! Post composer state
//!
//! Collects content, target platforms, a date and a time of day, then fans
//! out into one draft [`Post`] per selected platform.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{MingleError, Result};
use crate::scheduling::combine_date_time;
use crate::types::{Platform, Post};

/// Longest title derived from the first line of the content.
pub const TITLE_MAX_CHARS: usize = 60;

pub const DEFAULT_TIME: &str = "09:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDraft {
    pub content: String,
    platforms: BTreeSet<Platform>,
    pub date: NaiveDate,
    pub time: String,
    hashtags: Vec<String>,
}

impl ComposeDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            content: String::new(),
            platforms: BTreeSet::new(),
            date,
            time: DEFAULT_TIME.to_string(),
            hashtags: Vec::new(),
        }
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.platforms.iter().copied()
    }

    pub fn is_selected(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    /// Flip a platform on or off. Returns whether it is now selected.
    pub fn toggle_platform(&mut self, platform: Platform) -> bool {
        if self.platforms.remove(&platform) {
            false
        } else {
            self.platforms.insert(platform);
            true
        }
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    /// Add a hashtag, normalizing the leading `#`. Duplicates are ignored.
    pub fn add_hashtag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        if self.hashtags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            return false;
        }
        self.hashtags.push(tag);
        true
    }

    pub fn remove_hashtag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        let before = self.hashtags.len();
        self.hashtags.retain(|t| !t.eq_ignore_ascii_case(&tag));
        self.hashtags.len() != before
    }

    pub fn scheduled_at(&self) -> Result<NaiveDateTime> {
        combine_date_time(self.date, &self.time)
    }

    /// Title shown on calendar cells: the first non-blank line, truncated.
    pub fn title(&self) -> Option<String> {
        let line = self.content.lines().map(str::trim).find(|l| !l.is_empty())?;
        if line.chars().count() <= TITLE_MAX_CHARS {
            return Some(line.to_string());
        }
        let mut title: String = line.chars().take(TITLE_MAX_CHARS - 1).collect();
        title.push('…');
        Some(title)
    }

    /// Text published with each post: the trimmed content, then the hashtags
    /// on their own line.
    pub fn body(&self) -> String {
        let content = self.content.trim();
        if self.hashtags.is_empty() {
            return content.to_string();
        }
        format!("{}\n\n{}", content, self.hashtags.join(" "))
    }

    /// One draft per selected platform, in platform order, each carrying
    /// [`ComposeDraft::body`].
    pub fn into_posts(self) -> Result<Vec<Post>> {
        if self.platforms.is_empty() {
            return Err(MingleError::Validation(
                "Select at least one platform".to_string(),
            ));
        }
        let title = self
            .title()
            .ok_or_else(|| MingleError::Validation("Post content cannot be empty".to_string()))?;
        let at = self.scheduled_at()?;
        let body = self.body();

        self.platforms
            .iter()
            .map(|&platform| -> Result<Post> {
                Ok(Post::draft(title.clone(), platform, at)?.with_body(body.clone()))
            })
            .collect()
    }
}

fn normalize_tag(tag: &str) -> Option<String> {
    let bare = tag.trim().trim_start_matches('#');
    if bare.is_empty() || bare.chars().any(char::is_whitespace) {
        None
    } else {
        Some(format!("#{}", bare))
    }
}
