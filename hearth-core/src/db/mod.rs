//! Database access layer

pub mod filter;
pub mod migrations;
pub mod params;
pub mod pool;
pub mod repos;

pub use filter::{PropertyFilterParams, PropertyFilters};
pub use pool::{ConnectionManager, FaultPolicy, RetryPolicy};
pub use repos::{DeleteSummary, InquiryRepo, PropertyRepo, ReviewRepo, ReviewSource};
