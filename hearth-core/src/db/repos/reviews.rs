//! Review persistence and rating statistics

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReviewPolicy;
use crate::db::migrations;
use crate::db::ConnectionManager;
use crate::error::{Result, StoreError};
use crate::models::{NewReview, Review, ReviewStats, ValidReview};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Review columns plus display fields joined from `properties p`.
const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.property_id, r.user_id, r.reviewer_name, r.reviewer_email,
           r.rating, r.review_text, COALESCE(r.is_verified, TRUE) AS is_verified,
           r.created_at, r.updated_at,
           CASE WHEN p.id IS NULL THEN NULL ELSE p.city || ', ' || p.state END AS location,
           p.property_type
"#;

/// Postgres codes meaning the object is already there: duplicate table,
/// duplicate object, and the catalog unique violation from concurrent DDL.
const ALREADY_EXISTS: [&str; 3] = ["42P07", "42710", "23505"];
const UNDEFINED_TABLE: &str = "42P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Clamp a caller-supplied page window to sane bounds.
pub fn normalize_window(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Review operations, independent of where reviews are stored.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Validate and store a review.
    async fn create(&self, input: &NewReview) -> Result<Review>;

    /// Verified reviews, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Review>>;

    async fn stats(&self) -> Result<ReviewStats>;

    async fn update_status(&self, id: Uuid, verified: bool) -> Result<Review>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[derive(Debug, FromRow)]
struct PropertyDisplay {
    city: String,
    state: String,
    property_type: Option<String>,
}

/// Postgres-backed review store
#[derive(Debug, Clone)]
pub struct ReviewRepo {
    db: ConnectionManager,
    policy: ReviewPolicy,
    schema_ready: Arc<AtomicBool>,
}

impl ReviewRepo {
    pub fn new(db: ConnectionManager, policy: ReviewPolicy) -> Self {
        Self {
            db,
            policy,
            schema_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create the reviews table if it is missing. Safe to race with other
    /// processes doing the same.
    async fn ensure_schema(&self, conn: &mut PgConnection) -> Result<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        match sqlx::query(migrations::REVIEWS).execute(&mut *conn).await {
            Ok(_) => {}
            Err(err) if has_code(&err, &ALREADY_EXISTS) => {
                debug!(error = %err, "reviews table already present");
            }
            Err(err) => return Err(err.into()),
        }

        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn insert(&self, conn: &mut PgConnection, review: &ValidReview) -> Result<Review> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews
                (id, property_id, user_id, reviewer_name, reviewer_email,
                 rating, review_text, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, property_id, user_id, reviewer_name, reviewer_email,
                      rating, review_text, COALESCE(is_verified, TRUE) AS is_verified,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review.property_id)
        .bind(review.user_id)
        .bind(&review.reviewer_name)
        .bind(&review.reviewer_email)
        .bind(review.rating)
        .bind(&review.review_text)
        .bind(self.policy.auto_verify)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl ReviewSource for ReviewRepo {
    async fn create(&self, input: &NewReview) -> Result<Review> {
        let review = input.validate()?;

        let mut conn = self.db.acquire().await?;
        self.ensure_schema(&mut conn).await?;

        // Display fields come from the referenced property when it can be read.
        // A lookup that fails outright falls back to the caller's values.
        let display = match review.property_id {
            Some(property_id) => match sqlx::query_as::<_, PropertyDisplay>(
                "SELECT city, state, property_type FROM properties WHERE id = $1",
            )
            .bind(property_id)
            .fetch_optional(&mut *conn)
            .await
            {
                Ok(Some(display)) => Some(display),
                Ok(None) => return Err(StoreError::not_found("property", property_id)),
                Err(err) => {
                    warn!(%property_id, error = %err, "property lookup for review failed");
                    None
                }
            },
            None => None,
        };

        let mut row = match self.insert(&mut conn, &review).await {
            Ok(row) => row,
            // The property vanished between lookup and insert
            Err(StoreError::Database(err)) if has_code(&err, &[FOREIGN_KEY_VIOLATION]) => {
                let id = review.property_id.unwrap_or_default();
                return Err(StoreError::not_found("property", id));
            }
            Err(err) => return Err(err),
        };

        match display {
            Some(display) => {
                row.location = Some(format!("{}, {}", display.city, display.state));
                row.property_type = display.property_type;
            }
            None => {
                row.location = review.location;
                row.property_type = review.property_type;
            }
        }

        info!(review_id = %row.id, rating = row.rating, "review created");
        Ok(row)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Review>> {
        let (limit, offset) = normalize_window(Some(limit), Some(offset));
        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "{} FROM reviews r LEFT JOIN properties p ON p.id = r.property_id \
             WHERE r.is_verified IS NOT FALSE \
             ORDER BY r.created_at DESC LIMIT $1 OFFSET $2",
            REVIEW_SELECT
        );
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await;

        match rows {
            Ok(rows) => Ok(rows),
            Err(err) if has_code(&err, &[UNDEFINED_TABLE]) => {
                debug!("reviews table not created yet");
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn stats(&self) -> Result<ReviewStats> {
        let mut conn = self.db.acquire().await?;

        let counts = sqlx::query_as::<_, (i32, i64)>(
            r#"
            SELECT rating, COUNT(*) AS count
            FROM reviews
            WHERE is_verified IS NOT FALSE
            GROUP BY rating
            "#,
        )
        .fetch_all(&mut *conn)
        .await;

        match counts {
            Ok(counts) => Ok(ReviewStats::from_counts(counts)),
            Err(err) if has_code(&err, &[UNDEFINED_TABLE]) => {
                Ok(ReviewStats::from_counts(Vec::new()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_status(&self, id: Uuid, verified: bool) -> Result<Review> {
        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "WITH r AS ( \
                 UPDATE reviews SET is_verified = $2, updated_at = NOW() \
                 WHERE id = $1 RETURNING * \
             ) {} FROM r LEFT JOIN properties p ON p.id = r.property_id",
            REVIEW_SELECT
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(verified)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| StoreError::not_found("review", id))?;

        info!(review_id = %id, verified, "review status updated");
        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = self.db.acquire().await?;

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("review", id));
        }
        info!(review_id = %id, "review deleted");
        Ok(())
    }
}

/// Verified reviews referencing one property, newest first.
pub(crate) async fn fetch_for_property(
    conn: &mut PgConnection,
    property_id: Uuid,
) -> std::result::Result<Vec<Review>, sqlx::Error> {
    let sql = format!(
        "{} FROM reviews r LEFT JOIN properties p ON p.id = r.property_id \
         WHERE r.property_id = $1 AND r.is_verified IS NOT FALSE \
         ORDER BY r.created_at DESC",
        REVIEW_SELECT
    );
    let rows = sqlx::query_as::<_, Review>(&sql)
        .bind(property_id)
        .fetch_all(&mut *conn)
        .await;

    match rows {
        Err(err) if has_code(&err, &[UNDEFINED_TABLE]) => Ok(Vec::new()),
        other => other,
    }
}

fn has_code(err: &sqlx::Error, codes: &[&str]) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| codes.contains(&code.as_ref()))
}
