//! Domain models for the property catalog
//!
//! Row types derive `sqlx::FromRow` directly; input types carry their own
//! validation so bad input never reaches the database.

pub mod inquiry;
pub mod property;
pub mod review;
pub mod validation;

use serde::{Deserialize, Serialize};

pub use inquiry::{Inquiry, NewInquiry};
pub use property::{
    photo_inserts, status, NewPhoto, NewProperty, Photo, PhotoInsert, Property,
    PropertyAggregate, PropertyPatch,
};
pub use review::{NewReview, Review, ReviewStats, ValidReview};
pub use validation::ValidationError;

/// Result list for read endpoints that degrade instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub count: usize,
    /// Set when the list is empty because the read failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
            message: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            message: Some(message.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.message.is_some()
    }
}
