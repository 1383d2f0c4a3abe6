//! Contact inquiries sent to a property's owner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::{self, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inquiry {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub inquiry_type: String,
    pub created_at: DateTime<Utc>,
}

fn default_inquiry_type() -> String {
    "general".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInquiry {
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    #[serde(default = "default_inquiry_type")]
    pub inquiry_type: String,
}

impl NewInquiry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require("name", Some(self.name.as_str()))?;
        validation::require("email", Some(self.email.as_str()))?;
        validation::require("message", Some(self.message.as_str()))?;
        validation::email("email", &self.email)
    }
}
