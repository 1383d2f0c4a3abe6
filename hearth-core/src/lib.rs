pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use cache::{CachePort, CachedReviews, MemoryCache};
pub use config::{CacheConfig, Config, DatabaseConfig, ReviewPolicy};
pub use db::{
    ConnectionManager, DeleteSummary, FaultPolicy, InquiryRepo, PropertyFilterParams,
    PropertyFilters, PropertyRepo, RetryPolicy, ReviewRepo, ReviewSource,
};
pub use error::{ConfigError, ConnectionError, Result, StoreError};
pub use models::{
    Inquiry, Listing, NewInquiry, NewProperty, NewReview, PropertyAggregate, PropertyPatch,
    Review, ReviewStats, ValidationError,
};
