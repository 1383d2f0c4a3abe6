//! Repositories, one per aggregate

pub mod inquiries;
pub mod properties;
pub mod reviews;

pub use inquiries::InquiryRepo;
pub use properties::{DeleteSummary, PropertyRepo};
pub use reviews::{ReviewRepo, ReviewSource};
