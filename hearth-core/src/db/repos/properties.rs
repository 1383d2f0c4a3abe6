//! Property repository
//!
//! Handles the property aggregate with:
//! - One transaction per write; any failing statement rolls back the lot
//! - Replace-the-whole-collection semantics for child updates
//! - Per-property child fetches on list so one bad row can't sink a page

use std::sync::Arc;

use serde::Serialize;
use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{CachePort, REVIEW_CACHE_PATTERNS};
use crate::db::filter::PropertyFilters;
use crate::db::params::{to_arguments, SetClause};
use crate::db::repos::reviews;
use crate::db::ConnectionManager;
use crate::error::{Result, StoreError};
use crate::models::{
    Listing, NewProperty, Photo, PhotoInsert, Property, PropertyAggregate, PropertyPatch,
};

const COLUMNS: &str = "id, title, description, address, city, state, zip_code, property_type, \
    bedrooms, bathrooms, square_feet, year_built, lot_size, price, listing_type, status, \
    available_date, owner_id, agent_id, owner_name, owner_email, owner_phone, \
    contact_preference, created_at, updated_at";

/// Label collections stored one row per string
#[derive(Debug, Clone, Copy)]
enum Labels {
    Features,
    Amenities,
}

impl Labels {
    fn select_sql(self) -> &'static str {
        match self {
            Self::Features => {
                "SELECT feature_name FROM property_features WHERE property_id = $1 ORDER BY id"
            }
            Self::Amenities => {
                "SELECT amenity_name FROM property_amenities WHERE property_id = $1 ORDER BY id"
            }
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            Self::Features => {
                "INSERT INTO property_features (property_id, feature_name) VALUES ($1, $2)"
            }
            Self::Amenities => {
                "INSERT INTO property_amenities (property_id, amenity_name) VALUES ($1, $2)"
            }
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            Self::Features => "DELETE FROM property_features WHERE property_id = $1",
            Self::Amenities => "DELETE FROM property_amenities WHERE property_id = $1",
        }
    }
}

/// Rows removed by a property delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub features: u64,
    pub amenities: u64,
    pub photos: u64,
    pub inquiries: u64,
    pub reviews: u64,
}

/// Property repository
#[derive(Clone)]
pub struct PropertyRepo {
    db: ConnectionManager,
    review_cache: Option<Arc<dyn CachePort>>,
}

impl PropertyRepo {
    pub fn new(db: ConnectionManager) -> Self {
        Self {
            db,
            review_cache: None,
        }
    }

    /// Invalidate cached review reads whenever a delete removes reviews.
    pub fn with_review_cache(mut self, cache: Arc<dyn CachePort>) -> Self {
        self.review_cache = Some(cache);
        self
    }

    /// List properties matching `filters`, newest first, with child collections.
    pub async fn list(&self, filters: &PropertyFilters) -> Result<Vec<PropertyAggregate>> {
        let (predicate, params) = filters.predicate().into_parts();
        let sql = format!(
            "SELECT {} FROM properties p {} ORDER BY p.created_at DESC",
            COLUMNS, predicate
        );

        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query_as_with::<Postgres, Property, _>(&sql, to_arguments(&params)?)
            .fetch_all(&mut *conn)
            .await?;

        let mut aggregates = Vec::with_capacity(rows.len());
        for property in rows {
            let id = property.id;
            match fetch_children(&mut conn, id).await {
                Ok(children) => aggregates.push(children.attach(property)),
                Err(source) => {
                    let err = StoreError::PartialFetch {
                        property_id: id,
                        source,
                    };
                    warn!(error = %err, "listing property without child collections");
                    aggregates.push(PropertyAggregate::bare(property));
                }
            }
        }

        debug!(count = aggregates.len(), filters = params.len(), "properties listed");
        Ok(aggregates)
    }

    /// Like [`list`](Self::list), but a database outage yields an empty,
    /// explained listing instead of an error.
    pub async fn list_or_empty(
        &self,
        filters: &PropertyFilters,
    ) -> Result<Listing<PropertyAggregate>> {
        match self.list(filters).await {
            Ok(items) => Ok(Listing::new(items)),
            Err(err) if err.is_transient() => {
                error!(error = %err, "property listing unavailable");
                Ok(Listing::degraded(
                    "Property listings are temporarily unavailable",
                ))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_by_owner_email(&self, email: &str) -> Result<Vec<PropertyAggregate>> {
        self.list(&PropertyFilters::owned_by(email)).await
    }

    pub async fn get_published(&self) -> Result<Vec<PropertyAggregate>> {
        self.list(&PropertyFilters::published()).await
    }

    /// Single property with children and the reviews referencing it.
    pub async fn get_by_id(&self, id: Uuid) -> Result<PropertyAggregate> {
        let mut conn = self.db.acquire().await?;

        let property = fetch_property(&mut conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found("property", id))?;
        let children = fetch_children(&mut conn, id).await?;
        let mut aggregate = children.attach(property);
        aggregate.reviews = reviews::fetch_for_property(&mut conn, id).await?;

        Ok(aggregate)
    }

    /// Insert the property and all child rows atomically.
    pub async fn create(&self, input: &NewProperty) -> Result<PropertyAggregate> {
        const OP: &str = "create_property";
        let photos = input.validate()?;

        let mut conn = self.db.acquire().await?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StoreError::transaction(OP, e))?;

        match insert_aggregate(&mut tx, input, &photos).await {
            Ok(aggregate) => {
                tx.commit()
                    .await
                    .map_err(|e| StoreError::transaction(OP, e))?;
                info!(property_id = %aggregate.id(), "property created");
                Ok(aggregate)
            }
            Err(err) => Err(rollback(tx, OP, err).await),
        }
    }

    /// Apply a partial update. Child collections present in `patch` replace
    /// the stored ones; omitted collections are left alone.
    pub async fn update(&self, id: Uuid, patch: &PropertyPatch) -> Result<PropertyAggregate> {
        const OP: &str = "update_property";
        let photos = patch.validate()?;

        let mut conn = self.db.acquire().await?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StoreError::transaction(OP, e))?;

        match apply_patch(&mut tx, id, patch, photos.as_deref()).await {
            Ok(aggregate) => {
                tx.commit()
                    .await
                    .map_err(|e| StoreError::transaction(OP, e))?;
                info!(property_id = %id, "property updated");
                Ok(aggregate)
            }
            Err(err) => Err(rollback(tx, OP, err).await),
        }
    }

    /// Remove the property and everything that references it.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteSummary> {
        const OP: &str = "delete_property";

        let mut conn = self.db.acquire().await?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StoreError::transaction(OP, e))?;

        let summary = match delete_aggregate(&mut tx, id).await {
            Ok(summary) => {
                tx.commit()
                    .await
                    .map_err(|e| StoreError::transaction(OP, e))?;
                summary
            }
            Err(err) => return Err(rollback(tx, OP, err).await),
        };

        info!(property_id = %id, ?summary, "property deleted");
        if let Some(cache) = &self.review_cache {
            if summary.reviews > 0 {
                for pattern in REVIEW_CACHE_PATTERNS {
                    cache.invalidate(Some(pattern)).await;
                }
            }
        }
        Ok(summary)
    }
}

async fn rollback(
    tx: Transaction<'_, Postgres>,
    operation: &'static str,
    err: StoreError,
) -> StoreError {
    if let Err(rollback_err) = tx.rollback().await {
        error!(operation, error = %rollback_err, "rollback failed");
    }
    warn!(operation, error = %err, "transaction rolled back");
    err.within(operation)
}

struct Children {
    features: Vec<String>,
    amenities: Vec<String>,
    photos: Vec<Photo>,
}

impl Children {
    fn attach(self, property: Property) -> PropertyAggregate {
        PropertyAggregate {
            property,
            features: self.features,
            amenities: self.amenities,
            photos: self.photos,
            reviews: Vec::new(),
        }
    }
}

async fn fetch_property(
    conn: &mut PgConnection,
    id: Uuid,
) -> std::result::Result<Option<Property>, sqlx::Error> {
    let sql = format!("SELECT {} FROM properties WHERE id = $1", COLUMNS);
    sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await
}

async fn fetch_children(
    conn: &mut PgConnection,
    id: Uuid,
) -> std::result::Result<Children, sqlx::Error> {
    let features = fetch_labels(conn, Labels::Features, id).await?;
    let amenities = fetch_labels(conn, Labels::Amenities, id).await?;
    let photos = sqlx::query_as(
        r#"
        SELECT display_order, photo_url, photo_name, photo_size, is_primary
        FROM property_photos
        WHERE property_id = $1
        ORDER BY display_order
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Children {
        features,
        amenities,
        photos,
    })
}

async fn fetch_labels(
    conn: &mut PgConnection,
    labels: Labels,
    id: Uuid,
) -> std::result::Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(labels.select_sql())
        .bind(id)
        .fetch_all(&mut *conn)
        .await
}

async fn lock_existing(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM properties WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    found
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found("property", id))
}

async fn insert_aggregate(
    conn: &mut PgConnection,
    input: &NewProperty,
    photos: &[PhotoInsert],
) -> Result<PropertyAggregate> {
    let sql = format!(
        r#"
        INSERT INTO properties (
            id, title, description, address, city, state, zip_code, property_type,
            bedrooms, bathrooms, square_feet, year_built, lot_size, price, listing_type,
            status, available_date, owner_id, agent_id, owner_name, owner_email,
            owner_phone, contact_preference
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23)
        RETURNING {}
        "#,
        COLUMNS
    );

    let property: Property = sqlx::query_as(&sql)
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.description.as_deref())
        .bind(input.address.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.zip_code.as_deref())
        .bind(input.property_type.as_deref())
        .bind(input.bedrooms)
        .bind(input.bathrooms)
        .bind(input.square_feet)
        .bind(input.year_built)
        .bind(input.lot_size)
        .bind(input.price)
        .bind(input.listing_type.trim())
        .bind(input.initial_status())
        .bind(input.available_date)
        .bind(input.owner_id)
        .bind(input.agent_id)
        .bind(input.owner_name.as_deref())
        .bind(input.owner_email.as_deref())
        .bind(input.owner_phone.as_deref())
        .bind(input.contact_preference.as_deref())
        .fetch_one(&mut *conn)
        .await?;

    let id = property.id;
    insert_labels(conn, Labels::Features, id, &input.features).await?;
    insert_labels(conn, Labels::Amenities, id, &input.amenities).await?;
    insert_photos(conn, id, photos).await?;

    Ok(PropertyAggregate {
        property,
        features: input.features.clone(),
        amenities: input.amenities.clone(),
        photos: photos.iter().map(photo_row).collect(),
        reviews: Vec::new(),
    })
}

async fn apply_patch(
    conn: &mut PgConnection,
    id: Uuid,
    patch: &PropertyPatch,
    photos: Option<&[PhotoInsert]>,
) -> Result<PropertyAggregate> {
    lock_existing(conn, id).await?;

    let (sql, values) = patch_assignments(patch).into_update("properties", id, COLUMNS);
    let property = sqlx::query_as_with::<Postgres, Property, _>(&sql, to_arguments(&values)?)
        .fetch_one(&mut *conn)
        .await?;

    if let Some(features) = &patch.features {
        replace_labels(conn, Labels::Features, id, features).await?;
    }
    if let Some(amenities) = &patch.amenities {
        replace_labels(conn, Labels::Amenities, id, amenities).await?;
    }
    if let Some(photos) = photos {
        sqlx::query("DELETE FROM property_photos WHERE property_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        insert_photos(conn, id, photos).await?;
    }

    let children = fetch_children(conn, id).await?;
    Ok(children.attach(property))
}

async fn delete_aggregate(conn: &mut PgConnection, id: Uuid) -> Result<DeleteSummary> {
    lock_existing(conn, id).await?;

    let mut summary = DeleteSummary::default();
    for (slot, sql) in [
        (
            &mut summary.features,
            "DELETE FROM property_features WHERE property_id = $1",
        ),
        (
            &mut summary.amenities,
            "DELETE FROM property_amenities WHERE property_id = $1",
        ),
        (
            &mut summary.photos,
            "DELETE FROM property_photos WHERE property_id = $1",
        ),
        (
            &mut summary.inquiries,
            "DELETE FROM contact_inquiries WHERE property_id = $1",
        ),
        (
            &mut summary.reviews,
            "DELETE FROM reviews WHERE property_id = $1",
        ),
    ] {
        *slot = sqlx::query(sql)
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(summary)
}

/// Core columns present in the patch, in declaration order.
fn patch_assignments(patch: &PropertyPatch) -> SetClause {
    let mut set = SetClause::new();
    set.set("title", patch.title.clone())
        .set("description", patch.description.clone())
        .set("address", patch.address.clone())
        .set("city", patch.city.clone())
        .set("state", patch.state.clone())
        .set("zip_code", patch.zip_code.clone())
        .set("property_type", patch.property_type.clone())
        .set("bedrooms", patch.bedrooms)
        .set("bathrooms", patch.bathrooms)
        .set("square_feet", patch.square_feet)
        .set("year_built", patch.year_built)
        .set("lot_size", patch.lot_size)
        .set("price", patch.price)
        .set("listing_type", patch.listing_type.clone())
        .set("status", patch.status.clone())
        .set("available_date", patch.available_date)
        .set("owner_name", patch.owner_name.clone())
        .set("owner_email", patch.owner_email.clone())
        .set("owner_phone", patch.owner_phone.clone())
        .set("contact_preference", patch.contact_preference.clone());
    set
}

async fn insert_labels(
    conn: &mut PgConnection,
    labels: Labels,
    id: Uuid,
    values: &[String],
) -> std::result::Result<(), sqlx::Error> {
    for value in values {
        sqlx::query(labels.insert_sql())
            .bind(id)
            .bind(value)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn replace_labels(
    conn: &mut PgConnection,
    labels: Labels,
    id: Uuid,
    values: &[String],
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(labels.delete_sql())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    insert_labels(conn, labels, id, values).await
}

async fn insert_photos(
    conn: &mut PgConnection,
    id: Uuid,
    photos: &[PhotoInsert],
) -> std::result::Result<(), sqlx::Error> {
    for photo in photos {
        sqlx::query(
            r#"
            INSERT INTO property_photos
                (property_id, photo_url, photo_name, photo_size, is_primary, display_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&photo.photo_url)
        .bind(photo.photo_name.as_deref())
        .bind(photo.photo_size)
        .bind(photo.is_primary)
        .bind(photo.display_order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn photo_row(photo: &PhotoInsert) -> Photo {
    Photo {
        display_order: photo.display_order,
        photo_url: photo.photo_url.clone(),
        photo_name: photo.photo_name.clone(),
        photo_size: photo.photo_size,
        is_primary: photo.is_primary,
    }
}
