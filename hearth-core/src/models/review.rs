//! Review records, input validation and rating statistics

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::{self, ValidationError};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Stored review plus display fields derived from the referenced property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reviewer_name: String,
    pub reviewer_email: String,
    pub rating: i32,
    pub review_text: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// "City, ST" of the referenced property, or the submitted value
    #[sqlx(default)]
    pub location: Option<String>,
    #[sqlx(default)]
    pub property_type: Option<String>,
}

/// Review as submitted. Everything is optional so that validation, not
/// deserialization, reports what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReview {
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
    pub rating: Option<f64>,
    pub review_text: Option<String>,
    pub property_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Fallback display values when no property is referenced
    pub location: Option<String>,
    pub property_type: Option<String>,
}

/// Review input that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub reviewer_name: String,
    pub reviewer_email: String,
    pub rating: i32,
    pub review_text: String,
    pub property_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub location: Option<String>,
    pub property_type: Option<String>,
}

impl NewReview {
    pub fn validate(&self) -> Result<ValidReview, ValidationError> {
        let name = validation::require("reviewer_name", self.reviewer_name.as_deref())?;
        let email = validation::require("reviewer_email", self.reviewer_email.as_deref())?;
        let text = validation::require("review_text", self.review_text.as_deref())?;
        let rating = self.rating.ok_or(ValidationError::Empty { field: "rating" })?;

        if !rating.is_finite() || rating.fract() != 0.0 {
            return Err(ValidationError::InvalidFormat {
                field: "rating",
                reason: "must be a whole number",
            });
        }
        let rating = rating as i64;
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::OutOfRange {
                field: "rating",
                min: MIN_RATING,
                max: MAX_RATING,
                value: rating,
            });
        }
        validation::email("reviewer_email", email)?;

        Ok(ValidReview {
            reviewer_name: name.to_owned(),
            reviewer_email: email.to_owned(),
            rating: rating as i32,
            review_text: text.to_owned(),
            property_id: self.property_id,
            user_id: self.user_id,
            location: self.location.clone(),
            property_type: self.property_type.clone(),
        })
    }
}

/// Aggregate rating figures over verified reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_reviews: i64,
    /// Mean rating rounded to one decimal; 0 when there are no reviews
    pub average_rating: f64,
    /// Count per star value, always holding keys 1 through 5
    pub rating_distribution: BTreeMap<i32, i64>,
}

impl ReviewStats {
    /// Build stats from per-rating counts.
    pub fn from_counts(counts: impl IntoIterator<Item = (i32, i64)>) -> Self {
        let mut distribution: BTreeMap<i32, i64> =
            (MIN_RATING as i32..=MAX_RATING as i32).map(|r| (r, 0)).collect();
        for (rating, count) in counts {
            if let Some(slot) = distribution.get_mut(&rating) {
                *slot += count;
            }
        }

        let total: i64 = distribution.values().sum();
        let weighted: i64 = distribution.iter().map(|(r, c)| i64::from(*r) * c).sum();
        let average_rating = if total == 0 {
            0.0
        } else {
            round_one_decimal(weighted as f64 / total as f64)
        };

        Self {
            total_reviews: total,
            average_rating,
            rating_distribution: distribution,
        }
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
