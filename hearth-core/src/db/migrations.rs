//! Schema for the property catalog
//!
//! Statements are idempotent (`IF NOT EXISTS`) and safe to run on every start.

use sqlx::PgConnection;
use tracing::{debug, info};

use crate::db::ConnectionManager;
use crate::error::Result;

const PROPERTIES: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    zip_code TEXT,
    property_type TEXT,
    bedrooms INTEGER,
    bathrooms DOUBLE PRECISION,
    square_feet INTEGER,
    year_built INTEGER,
    lot_size DOUBLE PRECISION,
    price DOUBLE PRECISION,
    listing_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Draft',
    available_date DATE,
    owner_id UUID,
    agent_id UUID,
    owner_name TEXT,
    owner_email TEXT,
    owner_phone TEXT,
    contact_preference TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const PROPERTY_FEATURES: &str = r#"
CREATE TABLE IF NOT EXISTS property_features (
    id BIGSERIAL PRIMARY KEY,
    property_id UUID NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    feature_name VARCHAR(255) NOT NULL
)
"#;

const PROPERTY_AMENITIES: &str = r#"
CREATE TABLE IF NOT EXISTS property_amenities (
    id BIGSERIAL PRIMARY KEY,
    property_id UUID NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    amenity_name VARCHAR(255) NOT NULL
)
"#;

const PROPERTY_PHOTOS: &str = r#"
CREATE TABLE IF NOT EXISTS property_photos (
    id BIGSERIAL PRIMARY KEY,
    property_id UUID NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    photo_url TEXT NOT NULL,
    photo_name TEXT,
    photo_size BIGINT,
    is_primary BOOLEAN NOT NULL DEFAULT FALSE,
    display_order INTEGER NOT NULL
)
"#;

const CONTACT_INQUIRIES: &str = r#"
CREATE TABLE IF NOT EXISTS contact_inquiries (
    id UUID PRIMARY KEY,
    property_id UUID NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    message TEXT NOT NULL,
    inquiry_type TEXT NOT NULL DEFAULT 'general',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Review storage. Also issued lazily by the review repository before writes.
pub(crate) const REVIEWS: &str = r#"
CREATE TABLE IF NOT EXISTS reviews (
    id UUID PRIMARY KEY,
    property_id UUID REFERENCES properties(id) ON DELETE CASCADE,
    user_id UUID,
    reviewer_name TEXT NOT NULL,
    reviewer_email TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_text TEXT NOT NULL,
    is_verified BOOLEAN,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_properties_created ON properties(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_properties_status ON properties(status)",
    "CREATE INDEX IF NOT EXISTS idx_properties_owner_email ON properties(LOWER(owner_email))",
    "CREATE INDEX IF NOT EXISTS idx_property_features_property ON property_features(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_property_amenities_property ON property_amenities(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_property_photos_property ON property_photos(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_contact_inquiries_property ON contact_inquiries(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_property ON reviews(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_created ON reviews(created_at DESC)",
];

/// Create every catalog table and index.
pub async fn run(db: &ConnectionManager) -> Result<()> {
    info!("running catalog migrations");
    let mut conn = db.acquire().await?;
    apply(&mut conn).await?;
    info!("catalog migrations complete");
    Ok(())
}

async fn apply(conn: &mut PgConnection) -> Result<()> {
    for (table, ddl) in [
        ("properties", PROPERTIES),
        ("property_features", PROPERTY_FEATURES),
        ("property_amenities", PROPERTY_AMENITIES),
        ("property_photos", PROPERTY_PHOTOS),
        ("contact_inquiries", CONTACT_INQUIRIES),
        ("reviews", REVIEWS),
    ] {
        sqlx::query(ddl).execute(&mut *conn).await?;
        debug!(table, "table ensured");
    }

    for index in INDEXES {
        sqlx::query(index).execute(&mut *conn).await?;
    }
    Ok(())
}
