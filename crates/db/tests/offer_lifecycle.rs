//! Integration tests for the offer store
//!
//! These tests drive the public `OfferStore` API end to end the way both
//! facades do: submit offers, apply seller responses, list with statistics,
//! and remove records.

use rust_decimal::Decimal;

use homekey_core::domain::offer::{NewOffer, OfferStatus};
use homekey_db::{connect_with_settings, migrations, OfferStore, SqlOfferStore};

async fn store() -> SqlOfferStore {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    SqlOfferStore::new(pool)
}

fn offer(property_id: &str, buyer_email: &str, price: i64) -> NewOffer {
    NewOffer {
        property_id: property_id.to_string(),
        buyer_name: "Dana Wells".to_string(),
        buyer_email: buyer_email.to_string(),
        buyer_phone: "+1-555-0100".to_string(),
        offer_price: Decimal::new(price, 0),
        contingencies: vec!["inspection".to_string()],
        closing_date: "2026-10-15".to_string(),
        additional_terms: None,
    }
}

#[tokio::test]
async fn competing_offers_run_through_the_full_lifecycle() {
    let store = store().await;

    let low = store
        .create_offer(offer("PROP-42", "first@example.com", 480_000))
        .await
        .expect("first offer");
    let high = store
        .create_offer(offer("PROP-42", "second@example.com", 520_000))
        .await
        .expect("second offer");

    // Seller counters the low offer and accepts the high one.
    store
        .process_offer_response(
            &low.offer_id,
            "counter",
            Some(Decimal::new(505_000, 0)),
            Some("meet in the middle".to_string()),
        )
        .await
        .expect("counter");
    store
        .process_offer_response(&high.offer_id, "accept", None, Some("clean terms".to_string()))
        .await
        .expect("accept");

    let (offers, stats) = store.list_offers("PROP-42", None).await.expect("list");
    assert_eq!(offers.len(), 2);
    assert_eq!(stats.total_offers, 2);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.countered, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.highest_offer, Some(Decimal::new(520_000, 0)));
    assert_eq!(stats.average_offer, Some(Decimal::new(500_000, 0)));

    let countered = store.get_offer(&low.offer_id).await.expect("get countered");
    assert_eq!(countered.status, OfferStatus::Countered);
    assert_eq!(countered.counter_offer_price, Some(Decimal::new(505_000, 0)));
    assert_eq!(countered.response_notes.as_deref(), Some("meet in the middle"));

    // The losing offer gets withdrawn; statistics follow the current records.
    assert!(store.delete_offer(&low.offer_id).await.expect("delete"));
    let stats = store.get_offer_statistics("PROP-42").await.expect("stats");
    assert_eq!(stats.total_offers, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.countered, 0);
}

#[tokio::test]
async fn properties_are_isolated_from_each_other() {
    let store = store().await;

    store.create_offer(offer("PROP-1", "a@example.com", 300_000)).await.expect("create");
    store.create_offer(offer("PROP-2", "b@example.com", 900_000)).await.expect("create");

    let (offers, stats) = store.list_offers("PROP-1", None).await.expect("list");
    assert_eq!(offers.len(), 1);
    assert_eq!(stats.total_offers, 1);
    assert_eq!(stats.highest_offer, Some(Decimal::new(300_000, 0)));
}
