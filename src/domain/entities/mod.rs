//! Core domain entities.
//!
//! - [`ShortUrl`] - a stored short code mapping, with [`NewShortUrl`] for creation
//! - [`RefererStats`], [`DailyClicks`] - aggregated click analytics

pub mod click;
pub mod url;

pub use click::{DailyClicks, RefererStats};
pub use url::{NewShortUrl, ShortUrl};
