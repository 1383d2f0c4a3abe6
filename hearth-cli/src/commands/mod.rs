//! Command implementations for the hearth CLI

pub mod property;
pub mod review;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use hearth_core::cache::{CachePort, MemoryCache};
use hearth_core::{CachedReviews, Config, ConnectionManager, PropertyRepo, ReviewRepo};
use serde::Serialize;

pub use property::run_property;
pub use review::run_review;

/// Repositories sharing one pool and one review cache
pub struct Catalog {
    pub properties: PropertyRepo,
    pub reviews: CachedReviews<ReviewRepo>,
}

impl Catalog {
    pub fn new(db: ConnectionManager, config: &Config) -> Self {
        let cache: Arc<dyn CachePort> = Arc::new(MemoryCache::new());
        Self {
            properties: PropertyRepo::new(db.clone()).with_review_cache(cache.clone()),
            reviews: CachedReviews::new(ReviewRepo::new(db, config.reviews), cache, config.cache),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output (for piping to jq)
    Json,
}

impl OutputFormat {
    pub fn resolve(self, json: bool) -> Self {
        if json {
            Self::Json
        } else {
            self
        }
    }
}

/// `--output`/`--json` flags shared by every listing command
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,
}

impl OutputArgs {
    pub(crate) fn format(&self) -> OutputFormat {
        self.output.resolve(self.json)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
