pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use domain::offer::{NewOffer, Offer, OfferId, OfferResponse, OfferStatistics, OfferStatus};
pub use errors::ValidationError;
