//! Property aggregate: core row plus features, amenities and photos

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::review::Review;
use super::validation::{self, ValidationError};

/// Lifecycle labels. Stored as free text; transitions are not enforced.
pub mod status {
    pub const DRAFT: &str = "Draft";
    pub const PENDING_REVIEW: &str = "Pending Review";
    pub const APPROVED: &str = "Approved";
    pub const REJECTED: &str = "Rejected";
    pub const PUBLISHED: &str = "Published";
}

/// Core `properties` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    pub lot_size: Option<f64>,
    pub price: Option<f64>,
    /// rent, sell or buy
    pub listing_type: String,
    pub status: String,
    pub available_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub contact_preference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `property_photos` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub display_order: i32,
    pub photo_url: String,
    pub photo_name: Option<String>,
    pub photo_size: Option<i64>,
    pub is_primary: bool,
}

/// A property with its dependent collections assembled in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAggregate {
    #[serde(flatten)]
    pub property: Property,
    pub features: Vec<String>,
    pub amenities: Vec<String>,
    pub photos: Vec<Photo>,
    /// Only populated by single-property reads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
}

impl PropertyAggregate {
    /// Aggregate with empty child collections
    pub fn bare(property: Property) -> Self {
        Self {
            property,
            features: Vec::new(),
            amenities: Vec::new(),
            photos: Vec::new(),
            reviews: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.property.id
    }
}

/// Photo as submitted by a client: either a url or inline (base64) data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPhoto {
    pub name: Option<String>,
    pub url: Option<String>,
    pub data: Option<String>,
    pub size: Option<i64>,
}

impl NewPhoto {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Url wins over inline data when both are present.
    fn source(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.data.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Photo row ready for insertion, with ordering already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoInsert {
    pub display_order: i32,
    pub photo_url: String,
    pub photo_name: Option<String>,
    pub photo_size: Option<i64>,
    pub is_primary: bool,
}

/// Assign dense 1-based display order and flag the first photo primary.
pub fn photo_inserts(photos: &[NewPhoto]) -> Result<Vec<PhotoInsert>, ValidationError> {
    photos
        .iter()
        .enumerate()
        .map(|(index, photo)| {
            let url = photo
                .source()
                .ok_or(ValidationError::MissingPhotoSource { index })?;
            Ok(PhotoInsert {
                display_order: index as i32 + 1,
                photo_url: url.to_owned(),
                photo_name: photo.name.clone(),
                photo_size: photo.size,
                is_primary: index == 0,
            })
        })
        .collect()
}

fn default_status() -> String {
    status::DRAFT.to_owned()
}

/// Full payload for creating a property aggregate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProperty {
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    pub lot_size: Option<f64>,
    pub price: Option<f64>,
    pub listing_type: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub available_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub contact_preference: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub photos: Vec<NewPhoto>,
}

impl NewProperty {
    /// Check required fields and numeric sanity; returns the photo rows to insert.
    pub fn validate(&self) -> Result<Vec<PhotoInsert>, ValidationError> {
        validation::require("title", Some(self.title.as_str()))?;
        validation::require("address", Some(self.address.as_str()))?;
        validation::require("city", Some(self.city.as_str()))?;
        validation::require("state", Some(self.state.as_str()))?;
        validation::require("listing_type", Some(self.listing_type.as_str()))?;
        validation::non_negative("price", self.price)?;
        validation::non_negative("bedrooms", self.bedrooms)?;
        validation::non_negative("bathrooms", self.bathrooms)?;
        validation::non_negative("square_feet", self.square_feet)?;
        validation::non_negative("lot_size", self.lot_size)?;
        if let Some(email) = self.owner_email.as_deref() {
            validation::email("owner_email", email)?;
        }
        photo_inserts(&self.photos)
    }

    /// Workflow status to store; blank means a fresh draft.
    pub fn initial_status(&self) -> &str {
        match self.status.trim() {
            "" => status::DRAFT,
            other => other,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched; a present child
/// collection (even empty) replaces the stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    pub lot_size: Option<f64>,
    pub price: Option<f64>,
    pub listing_type: Option<String>,
    pub status: Option<String>,
    pub available_date: Option<NaiveDate>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub contact_preference: Option<String>,
    pub features: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub photos: Option<Vec<NewPhoto>>,
}

impl PropertyPatch {
    pub fn validate(&self) -> Result<Option<Vec<PhotoInsert>>, ValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("listing_type", &self.listing_type),
            ("status", &self.status),
        ] {
            if value.is_some() {
                validation::require(field, value.as_deref())?;
            }
        }
        validation::non_negative("price", self.price)?;
        validation::non_negative("bedrooms", self.bedrooms)?;
        validation::non_negative("bathrooms", self.bathrooms)?;
        validation::non_negative("square_feet", self.square_feet)?;
        validation::non_negative("lot_size", self.lot_size)?;
        if let Some(email) = self.owner_email.as_deref() {
            validation::email("owner_email", email)?;
        }
        self.photos.as_deref().map(photo_inserts).transpose()
    }
}
