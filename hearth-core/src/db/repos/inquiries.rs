//! Contact inquiries

use tracing::info;
use uuid::Uuid;

use crate::db::ConnectionManager;
use crate::error::{Result, StoreError};
use crate::models::{Inquiry, NewInquiry};

#[derive(Debug, Clone)]
pub struct InquiryRepo {
    db: ConnectionManager,
}

impl InquiryRepo {
    pub fn new(db: ConnectionManager) -> Self {
        Self { db }
    }

    /// Record an inquiry against an existing property.
    pub async fn create(&self, input: &NewInquiry) -> Result<Inquiry> {
        input.validate()?;
        let mut conn = self.db.acquire().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM properties WHERE id = $1)")
                .bind(input.property_id)
                .fetch_one(&mut *conn)
                .await?;
        if !exists {
            return Err(StoreError::not_found("property", input.property_id));
        }

        let inquiry = sqlx::query_as::<_, Inquiry>(
            r#"
            INSERT INTO contact_inquiries
                (id, property_id, name, email, phone, message, inquiry_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, property_id, name, email, phone, message, inquiry_type, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.property_id)
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(input.phone.as_deref())
        .bind(input.message.trim())
        .bind(&input.inquiry_type)
        .fetch_one(&mut *conn)
        .await?;

        info!(inquiry_id = %inquiry.id, property_id = %inquiry.property_id, "inquiry recorded");
        Ok(inquiry)
    }

    /// Inquiries for one property, newest first.
    pub async fn list_for_property(&self, property_id: Uuid) -> Result<Vec<Inquiry>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, Inquiry>(
            r#"
            SELECT id, property_id, name, email, phone, message, inquiry_type, created_at
            FROM contact_inquiries
            WHERE property_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(property_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}
