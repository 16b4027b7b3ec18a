use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::validation;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

impl OfferId {
    /// Builds `OFFER-<YYYYMMDD>-<8 uppercase hex chars>`. The date segment
    /// keeps ids sortable by submission day; the suffix comes from a v4 UUID.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        let suffix = uuid[..8].to_uppercase();
        Self(format!("OFFER-{}-{suffix}", now.format("%Y%m%d")))
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    PendingReview,
    Accepted,
    Rejected,
    Countered,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_review" => Some(Self::PendingReview),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "countered" => Some(Self::Countered),
            _ => None,
        }
    }
}

/// A seller-side answer to a pending offer. Parsed case-insensitively so both
/// facades accept `"ACCEPT"` and `"accept"` alike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferResponse {
    Accept,
    Reject,
    Counter,
}

impl OfferResponse {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "counter" => Ok(Self::Counter),
            other => Err(ValidationError::new(
                "response",
                format!("unrecognized response `{other}` (expected accept|reject|counter)"),
            )),
        }
    }

    pub fn target_status(self) -> OfferStatus {
        match self {
            Self::Accept => OfferStatus::Accepted,
            Self::Reject => OfferStatus::Rejected,
            Self::Counter => OfferStatus::Countered,
        }
    }
}

/// Validated input for creating an offer. `closing_date` arrives as the raw
/// caller string and is checked during conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub property_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: String,
    pub offer_price: Decimal,
    pub contingencies: Vec<String>,
    pub closing_date: String,
    pub additional_terms: Option<Value>,
}

impl NewOffer {
    pub fn into_offer(self, now: DateTime<Utc>) -> Result<Offer, ValidationError> {
        validation::require_email("buyer_email", &self.buyer_email)?;
        validation::require_positive_price("offer_price", self.offer_price)?;
        let closing_date = validation::parse_closing_date("closing_date", &self.closing_date)?;

        Ok(Offer {
            offer_id: OfferId::generate(now),
            property_id: self.property_id,
            buyer_name: self.buyer_name,
            buyer_email: self.buyer_email,
            buyer_phone: self.buyer_phone,
            offer_price: self.offer_price,
            contingencies: self.contingencies,
            closing_date,
            additional_terms: self.additional_terms,
            status: OfferStatus::PendingReview,
            counter_offer_price: None,
            response_notes: None,
            submitted_at: now,
            last_updated: now,
            responded_at: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: OfferId,
    pub property_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: String,
    pub offer_price: Decimal,
    pub contingencies: Vec<String>,
    pub closing_date: NaiveDate,
    pub additional_terms: Option<Value>,
    pub status: OfferStatus,
    pub counter_offer_price: Option<Decimal>,
    pub response_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Applies a seller response. The last response wins wholly: status,
    /// counter price, notes and responded_at are all overwritten, so
    /// counter_offer_price is present iff the resulting status is countered.
    pub fn apply_response(
        &mut self,
        response: OfferResponse,
        counter_offer_price: Option<Decimal>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let counter_offer_price = match response {
            OfferResponse::Counter => {
                let price = counter_offer_price.ok_or_else(|| {
                    ValidationError::new(
                        "counter_offer_price",
                        "required when response is `counter`",
                    )
                })?;
                validation::require_positive_price("counter_offer_price", price)?;
                Some(price)
            }
            OfferResponse::Accept | OfferResponse::Reject => None,
        };

        self.status = response.target_status();
        self.counter_offer_price = counter_offer_price;
        self.response_notes = notes;
        self.responded_at = Some(now);
        self.last_updated = now;
        Ok(())
    }
}

/// Derived per-property aggregates. Never stored; recomputed from current
/// records on every call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferStatistics {
    pub total_offers: u64,
    pub pending: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub countered: u64,
    pub highest_offer: Option<Decimal>,
    pub average_offer: Option<Decimal>,
}

impl OfferStatistics {
    pub fn from_tallies<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (OfferStatus, Decimal)>,
    {
        let mut stats = Self::default();
        let mut sum = Decimal::ZERO;

        for (status, price) in rows {
            stats.total_offers += 1;
            match status {
                OfferStatus::PendingReview => stats.pending += 1,
                OfferStatus::Accepted => stats.accepted += 1,
                OfferStatus::Rejected => stats.rejected += 1,
                OfferStatus::Countered => stats.countered += 1,
            }
            sum += price;
            stats.highest_offer = Some(match stats.highest_offer {
                Some(highest) => highest.max(price),
                None => price,
            });
        }

        if stats.total_offers > 0 {
            stats.average_offer = Some(sum / Decimal::from(stats.total_offers));
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{NewOffer, OfferId, OfferResponse, OfferStatistics, OfferStatus};

    fn new_offer() -> NewOffer {
        NewOffer {
            property_id: "PROP-1".to_string(),
            buyer_name: "Dana Wells".to_string(),
            buyer_email: "dana@example.com".to_string(),
            buyer_phone: "+1-555-0100".to_string(),
            offer_price: Decimal::new(500_000, 0),
            contingencies: vec!["inspection".to_string(), "financing".to_string()],
            closing_date: "2026-10-15".to_string(),
            additional_terms: None,
        }
    }

    #[test]
    fn generated_id_has_date_and_suffix_segments() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        let id = OfferId::generate(now);

        let parts: Vec<&str> = id.0.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "OFFER");
        assert_eq!(parts[1], "20260829");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn new_offer_starts_in_pending_review() {
        let now = Utc::now();
        let offer = new_offer().into_offer(now).expect("valid offer");

        assert_eq!(offer.status, OfferStatus::PendingReview);
        assert_eq!(offer.submitted_at, offer.last_updated);
        assert!(offer.responded_at.is_none());
        assert!(offer.counter_offer_price.is_none());
    }

    #[test]
    fn new_offer_rejects_non_positive_price() {
        let mut input = new_offer();
        input.offer_price = Decimal::ZERO;

        let error = input.into_offer(Utc::now()).expect_err("zero price should fail");
        assert_eq!(error.field, "offer_price");
    }

    #[test]
    fn new_offer_rejects_malformed_email() {
        let mut input = new_offer();
        input.buyer_email = "not-an-email".to_string();

        let error = input.into_offer(Utc::now()).expect_err("bad email should fail");
        assert_eq!(error.field, "buyer_email");
    }

    #[test]
    fn new_offer_rejects_impossible_calendar_date() {
        let mut input = new_offer();
        input.closing_date = "2025-13-45".to_string();

        let error = input.into_offer(Utc::now()).expect_err("bad date should fail");
        assert_eq!(error.field, "closing_date");
    }

    #[test]
    fn response_parse_is_case_insensitive() {
        assert_eq!(OfferResponse::parse("ACCEPT").unwrap(), OfferResponse::Accept);
        assert_eq!(OfferResponse::parse("  Counter ").unwrap(), OfferResponse::Counter);
        assert!(OfferResponse::parse("withdraw").is_err());
    }

    #[test]
    fn counter_response_requires_price() {
        let mut offer = new_offer().into_offer(Utc::now()).expect("valid offer");

        let error = offer
            .apply_response(OfferResponse::Counter, None, None, Utc::now())
            .expect_err("counter without price should fail");
        assert_eq!(error.field, "counter_offer_price");
        assert_eq!(offer.status, OfferStatus::PendingReview);
    }

    #[test]
    fn accept_after_counter_clears_counter_price() {
        let mut offer = new_offer().into_offer(Utc::now()).expect("valid offer");

        offer
            .apply_response(
                OfferResponse::Counter,
                Some(Decimal::new(525_000, 0)),
                Some("counter at asking".to_string()),
                Utc::now(),
            )
            .expect("counter");
        assert_eq!(offer.status, OfferStatus::Countered);
        assert_eq!(offer.counter_offer_price, Some(Decimal::new(525_000, 0)));

        offer.apply_response(OfferResponse::Accept, None, None, Utc::now()).expect("accept");
        assert_eq!(offer.status, OfferStatus::Accepted);
        assert!(offer.counter_offer_price.is_none());
    }

    #[test]
    fn statistics_over_empty_set_are_zeroed() {
        let stats = OfferStatistics::from_tallies(std::iter::empty());
        assert_eq!(stats.total_offers, 0);
        assert!(stats.highest_offer.is_none());
        assert!(stats.average_offer.is_none());
    }

    #[test]
    fn statistics_report_max_and_mean() {
        let stats = OfferStatistics::from_tallies([
            (OfferStatus::PendingReview, Decimal::new(500_000, 0)),
            (OfferStatus::Countered, Decimal::new(550_000, 0)),
            (OfferStatus::Accepted, Decimal::new(600_000, 0)),
        ]);

        assert_eq!(stats.total_offers, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.countered, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.highest_offer, Some(Decimal::new(600_000, 0)));
        assert_eq!(stats.average_offer, Some(Decimal::new(550_000, 0)));
    }
}
