//! Market data access port traits.

use chrono::NaiveDateTime;

use crate::domain::auction::AuctionListing;
use crate::domain::error::SkytraderError;
use crate::domain::observation::{BazaarSnapshot, RawObservation};

/// Time span requested from a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesRange {
    Between {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
    /// The current quote as a one-row series.
    Snapshot,
}

/// Bazaar price history and live quotes.
///
/// Failures surface as `SkytraderError::Fetch`; callers skip the item and carry on.
pub trait MarketDataPort {
    fn fetch_series(
        &self,
        item_tag: &str,
        range: &SeriesRange,
    ) -> Result<Vec<RawObservation>, SkytraderError>;

    fn fetch_snapshot(&self, item_tag: &str) -> Result<BazaarSnapshot, SkytraderError>;

    fn list_item_tags(&self) -> Result<Vec<String>, SkytraderError>;
}

/// Auction house listings.
pub trait AuctionDataPort {
    /// Active buy-it-now listings, cheapest first.
    fn fetch_active_bins(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError>;

    /// Recently sold auctions.
    fn fetch_sold(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError>;
}
