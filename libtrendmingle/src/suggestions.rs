//! AI-style suggestion slots
//!
//! Each category has exactly one active slot. Regenerating a slot draws a
//! replacement uniformly from that category's fixed pool; repeats of the
//! current content are allowed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, MingleError, Result};

/// Random source that can live behind a shared service.
pub type BoxedRng = Box<dyn RngCore + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Hashtags,
    Caption,
    Idea,
}

impl SuggestionCategory {
    pub const ALL: [SuggestionCategory; 3] = [
        SuggestionCategory::Hashtags,
        SuggestionCategory::Caption,
        SuggestionCategory::Idea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionCategory::Hashtags => "hashtags",
            SuggestionCategory::Caption => "caption",
            SuggestionCategory::Idea => "idea",
        }
    }

    /// Tab title in the suggestions widget.
    pub fn title(self) -> &'static str {
        match self {
            SuggestionCategory::Hashtags => "Trending Hashtags",
            SuggestionCategory::Caption => "Caption Suggestion",
            SuggestionCategory::Idea => "Content Idea",
        }
    }

    fn index(self) -> usize {
        match self {
            SuggestionCategory::Hashtags => 0,
            SuggestionCategory::Caption => 1,
            SuggestionCategory::Idea => 2,
        }
    }
}

impl fmt::Display for SuggestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestionCategory {
    type Err = MingleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashtags" => Ok(SuggestionCategory::Hashtags),
            "caption" => Ok(SuggestionCategory::Caption),
            "idea" => Ok(SuggestionCategory::Idea),
            other => Err(MingleError::Validation(format!(
                "Unknown suggestion category '{}'. Valid options: hashtags, caption, idea",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSlot {
    pub category: SuggestionCategory,
    pub content: String,
}

/// Seed values and replacement pools, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionLibrary {
    seeds: [String; 3],
    pools: [Vec<String>; 3],
}

impl SuggestionLibrary {
    /// Build a library, filling any category left out with the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyPool` if a supplied pool has no entries.
    pub fn new(
        mut seeds: BTreeMap<SuggestionCategory, String>,
        mut pools: BTreeMap<SuggestionCategory, Vec<String>>,
    ) -> Result<Self> {
        let mut library = Self::builtin();
        for category in SuggestionCategory::ALL {
            if let Some(seed) = seeds.remove(&category) {
                library.seeds[category.index()] = seed;
            }
            if let Some(pool) = pools.remove(&category) {
                if pool.is_empty() {
                    return Err(ConfigError::EmptyPool(category).into());
                }
                library.pools[category.index()] = pool;
            }
        }
        Ok(library)
    }

    pub fn builtin() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            seeds: [
                "#WorkFromAnywhere #DigitalNomad #RemoteWork #TravelTuesday #WorkLifeBalance".to_string(),
                "Embracing the nomad lifestyle! Working with this view makes Monday feel like a vacation. What's your ideal workspace? 💻🌴 #WorkFromAnywhere".to_string(),
                "Create a short tutorial showing your 3-step workflow optimization process that saves you 5 hours each week.".to_string(),
            ],
            pools: [
                owned(&[
                    "#DigitalMarketing #SocialMediaTips #ContentCreator #GrowthHacking",
                    "#PersonalBranding #BusinessTips #MarketingStrategy #Entrepreneur",
                    "#AI #ClimateAction #MentalHealthAwareness #SummerVibes",
                    "#WorkFromAnywhere #DigitalNomad #RemoteWork #WorkLifeBalance",
                ]),
                owned(&[
                    "Just wrapped up our quarterly strategy meeting! 📊 Big things are coming next month. Stay tuned!",
                    "Behind every great launch is a team that refuses to settle. Meet the people who made it happen. 🚀",
                    "Three habits that changed how we work remotely. Which one would you try first? 👇",
                ]),
                owned(&[
                    "Share a behind-the-scenes clip of how your team plans a week of content.",
                    "Post a customer success story as a short carousel with one stat per slide.",
                    "Run a poll asking followers which productivity tool they can't live without.",
                ]),
            ],
        }
    }

    pub fn seed(&self, category: SuggestionCategory) -> &str {
        &self.seeds[category.index()]
    }

    pub fn pool(&self, category: SuggestionCategory) -> &[String] {
        &self.pools[category.index()]
    }
}

impl Default for SuggestionLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Uniform draw from `pool`; `None` only when the pool is empty.
pub fn pick<'a, T, R>(pool: &'a [T], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    pool.choose(rng)
}

/// Owns the active slot of every category.
pub struct Regenerator<R = BoxedRng> {
    library: SuggestionLibrary,
    slots: [SuggestionSlot; 3],
    rng: R,
}

impl Regenerator<BoxedRng> {
    /// Regenerator backed by an entropy-seeded generator.
    pub fn new(library: SuggestionLibrary) -> Self {
        Self::with_rng(library, Box::new(StdRng::from_entropy()))
    }
}

impl<R: RngCore> Regenerator<R> {
    pub fn with_rng(library: SuggestionLibrary, rng: R) -> Self {
        let slots = SuggestionCategory::ALL.map(|category| SuggestionSlot {
            category,
            content: library.seed(category).to_string(),
        });
        Self {
            library,
            slots,
            rng,
        }
    }

    pub fn slot(&self, category: SuggestionCategory) -> &SuggestionSlot {
        &self.slots[category.index()]
    }

    pub fn slots(&self) -> &[SuggestionSlot] {
        &self.slots
    }

    pub fn library(&self) -> &SuggestionLibrary {
        &self.library
    }

    /// Replace the slot's content with a fresh draw from its pool.
    pub fn regenerate(&mut self, category: SuggestionCategory) -> Result<SuggestionSlot> {
        let content = pick(self.library.pool(category), &mut self.rng)
            .ok_or(ConfigError::EmptyPool(category))?
            .clone();
        let slot = &mut self.slots[category.index()];
        slot.content = content;
        Ok(slot.clone())
    }
}
