use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use thiserror::Error;
use tracing::debug;

use homekey_core::domain::offer::{
    NewOffer, Offer, OfferId, OfferResponse, OfferStatistics, OfferStatus,
};
use homekey_core::errors::ValidationError;

use crate::DbPool;

/// Failure taxonomy for store operations. `Validation` and `NotFound` are
/// recoverable by the caller; `Database`/`Decode` surface persistence
/// failures and are never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("offer `{0}` not found")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// The five offer operations plus administrative delete, shared by the tool
/// gateway and the HTTP facade. Implementations must be safe to call from
/// concurrent tasks without external locking.
#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn create_offer(&self, new_offer: NewOffer) -> Result<Offer, StoreError>;

    async fn get_offer(&self, offer_id: &OfferId) -> Result<Offer, StoreError>;

    async fn process_offer_response(
        &self,
        offer_id: &OfferId,
        response: &str,
        counter_offer_price: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<Offer, StoreError>;

    async fn list_offers(
        &self,
        property_id: &str,
        status: Option<OfferStatus>,
    ) -> Result<(Vec<Offer>, OfferStatistics), StoreError>;

    async fn get_offer_statistics(&self, property_id: &str)
        -> Result<OfferStatistics, StoreError>;

    /// Idempotent: returns whether a record was actually removed.
    async fn delete_offer(&self, offer_id: &OfferId) -> Result<bool, StoreError>;
}

pub struct SqlOfferStore {
    pool: DbPool,
}

impl SqlOfferStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn statistics_for_property<'e, E>(
        executor: E,
        property_id: &str,
    ) -> Result<OfferStatistics, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let rows = sqlx::query("SELECT status, offer_price FROM offers WHERE property_id = ?")
            .bind(property_id)
            .fetch_all(executor)
            .await?;

        let tallies = rows
            .iter()
            .map(|row| {
                let status_str: String =
                    row.try_get("status").map_err(|e| StoreError::Decode(e.to_string()))?;
                let status = parse_status(&status_str)?;
                let price_str: String =
                    row.try_get("offer_price").map_err(|e| StoreError::Decode(e.to_string()))?;
                let price = parse_decimal("offer_price", &price_str)?;
                Ok((status, price))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(OfferStatistics::from_tallies(tallies))
    }
}

fn parse_status(value: &str) -> Result<OfferStatus, StoreError> {
    OfferStatus::parse(value)
        .ok_or_else(|| StoreError::Decode(format!("unknown offer status `{value}`")))
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal, StoreError> {
    value
        .parse::<Decimal>()
        .map_err(|e| StoreError::Decode(format!("invalid decimal in `{column}`: {e}")))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}

fn row_to_offer(row: &sqlx::sqlite::SqliteRow) -> Result<Offer, StoreError> {
    let offer_id: String =
        row.try_get("offer_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let property_id: String =
        row.try_get("property_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let buyer_name: String =
        row.try_get("buyer_name").map_err(|e| StoreError::Decode(e.to_string()))?;
    let buyer_email: String =
        row.try_get("buyer_email").map_err(|e| StoreError::Decode(e.to_string()))?;
    let buyer_phone: String =
        row.try_get("buyer_phone").map_err(|e| StoreError::Decode(e.to_string()))?;
    let offer_price_str: String =
        row.try_get("offer_price").map_err(|e| StoreError::Decode(e.to_string()))?;
    let contingencies_str: String =
        row.try_get("contingencies").map_err(|e| StoreError::Decode(e.to_string()))?;
    let closing_date_str: String =
        row.try_get("closing_date").map_err(|e| StoreError::Decode(e.to_string()))?;
    let additional_terms_str: Option<String> =
        row.try_get("additional_terms").map_err(|e| StoreError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| StoreError::Decode(e.to_string()))?;
    let counter_offer_price_str: Option<String> =
        row.try_get("counter_offer_price").map_err(|e| StoreError::Decode(e.to_string()))?;
    let response_notes: Option<String> =
        row.try_get("response_notes").map_err(|e| StoreError::Decode(e.to_string()))?;
    let submitted_at_str: String =
        row.try_get("submitted_at").map_err(|e| StoreError::Decode(e.to_string()))?;
    let last_updated_str: String =
        row.try_get("last_updated").map_err(|e| StoreError::Decode(e.to_string()))?;
    let responded_at_str: Option<String> =
        row.try_get("responded_at").map_err(|e| StoreError::Decode(e.to_string()))?;

    let contingencies: Vec<String> = serde_json::from_str(&contingencies_str)
        .map_err(|e| StoreError::Decode(format!("invalid contingencies JSON: {e}")))?;
    let additional_terms = additional_terms_str
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| StoreError::Decode(format!("invalid additional_terms JSON: {e}")))?;
    let closing_date = NaiveDate::parse_from_str(&closing_date_str, "%Y-%m-%d")
        .map_err(|e| StoreError::Decode(format!("invalid closing_date: {e}")))?;
    let counter_offer_price = counter_offer_price_str
        .map(|raw| parse_decimal("counter_offer_price", &raw))
        .transpose()?;
    let responded_at =
        responded_at_str.map(|raw| parse_timestamp("responded_at", &raw)).transpose()?;

    Ok(Offer {
        offer_id: OfferId(offer_id),
        property_id,
        buyer_name,
        buyer_email,
        buyer_phone,
        offer_price: parse_decimal("offer_price", &offer_price_str)?,
        contingencies,
        closing_date,
        additional_terms,
        status: parse_status(&status_str)?,
        counter_offer_price,
        response_notes,
        submitted_at: parse_timestamp("submitted_at", &submitted_at_str)?,
        last_updated: parse_timestamp("last_updated", &last_updated_str)?,
        responded_at,
    })
}

const OFFER_SELECT: &str = "SELECT offer_id, property_id, buyer_name, buyer_email, buyer_phone,
            offer_price, contingencies, closing_date, additional_terms, status,
            counter_offer_price, response_notes, submitted_at, last_updated, responded_at
     FROM offers";

#[async_trait]
impl OfferStore for SqlOfferStore {
    async fn create_offer(&self, new_offer: NewOffer) -> Result<Offer, StoreError> {
        let offer = new_offer.into_offer(Utc::now())?;

        let contingencies = serde_json::to_string(&offer.contingencies)
            .map_err(|e| StoreError::Decode(format!("encode contingencies: {e}")))?;
        let additional_terms = offer
            .additional_terms
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Decode(format!("encode additional_terms: {e}")))?;

        sqlx::query(
            "INSERT INTO offers (offer_id, property_id, buyer_name, buyer_email, buyer_phone,
                                 offer_price, contingencies, closing_date, additional_terms,
                                 status, submitted_at, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&offer.offer_id.0)
        .bind(&offer.property_id)
        .bind(&offer.buyer_name)
        .bind(&offer.buyer_email)
        .bind(&offer.buyer_phone)
        .bind(offer.offer_price.to_string())
        .bind(&contingencies)
        .bind(offer.closing_date.format("%Y-%m-%d").to_string())
        .bind(&additional_terms)
        .bind(offer.status.as_str())
        .bind(offer.submitted_at.to_rfc3339())
        .bind(offer.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(offer_id = %offer.offer_id, property_id = %offer.property_id, "offer created");
        Ok(offer)
    }

    async fn get_offer(&self, offer_id: &OfferId) -> Result<Offer, StoreError> {
        let sql = format!("{OFFER_SELECT} WHERE offer_id = ?");
        let row = sqlx::query(&sql).bind(&offer_id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => row_to_offer(r),
            None => Err(StoreError::NotFound(offer_id.0.clone())),
        }
    }

    async fn process_offer_response(
        &self,
        offer_id: &OfferId,
        response: &str,
        counter_offer_price: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<Offer, StoreError> {
        let response = OfferResponse::parse(response)?;

        let mut tx = self.pool.begin().await?;

        let sql = format!("{OFFER_SELECT} WHERE offer_id = ?");
        let row = sqlx::query(&sql).bind(&offer_id.0).fetch_optional(&mut *tx).await?;
        let mut offer = match row {
            Some(ref r) => row_to_offer(r)?,
            None => return Err(StoreError::NotFound(offer_id.0.clone())),
        };

        offer.apply_response(response, counter_offer_price, notes, Utc::now())?;

        sqlx::query(
            "UPDATE offers
             SET status = ?,
                 counter_offer_price = ?,
                 response_notes = ?,
                 responded_at = ?,
                 last_updated = ?
             WHERE offer_id = ?",
        )
        .bind(offer.status.as_str())
        .bind(offer.counter_offer_price.map(|price| price.to_string()))
        .bind(&offer.response_notes)
        .bind(offer.responded_at.map(|at| at.to_rfc3339()))
        .bind(offer.last_updated.to_rfc3339())
        .bind(&offer.offer_id.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(offer_id = %offer.offer_id, status = offer.status.as_str(), "offer response applied");
        Ok(offer)
    }

    async fn list_offers(
        &self,
        property_id: &str,
        status: Option<OfferStatus>,
    ) -> Result<(Vec<Offer>, OfferStatistics), StoreError> {
        let mut tx = self.pool.begin().await?;

        let rows = if let Some(status) = status {
            let sql = format!(
                "{OFFER_SELECT} WHERE property_id = ? AND status = ?
                 ORDER BY submitted_at DESC, offer_id ASC"
            );
            sqlx::query(&sql).bind(property_id).bind(status.as_str()).fetch_all(&mut *tx).await?
        } else {
            let sql = format!(
                "{OFFER_SELECT} WHERE property_id = ?
                 ORDER BY submitted_at DESC, offer_id ASC"
            );
            sqlx::query(&sql).bind(property_id).fetch_all(&mut *tx).await?
        };

        let offers = rows.iter().map(row_to_offer).collect::<Result<Vec<_>, _>>()?;

        // Statistics always cover the full property, ignoring the status filter.
        let statistics = Self::statistics_for_property(&mut *tx, property_id).await?;

        tx.commit().await?;

        Ok((offers, statistics))
    }

    async fn get_offer_statistics(
        &self,
        property_id: &str,
    ) -> Result<OfferStatistics, StoreError> {
        Self::statistics_for_property(&self.pool, property_id).await
    }

    async fn delete_offer(&self, offer_id: &OfferId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM offers WHERE offer_id = ?")
                .bind(&offer_id.0)
                .execute(&self.pool)
                .await?;

        let removed = result.rows_affected() > 0;
        debug!(offer_id = %offer_id, removed, "offer delete requested");
        Ok(removed)
    }
}
