use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};

/// What the booking engine needs to know about a rentable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub price_per_day: Decimal,
}

/// Read access to the external listing catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingCatalog: Send + Sync {
    async fn get_listing(&self, listing_id: Uuid) -> BookingResult<Option<Listing>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryListingCatalog {
    listings: Arc<RwLock<HashMap<Uuid, Listing>>>,
}

impl InMemoryListingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, listing: Listing) {
        self.listings.write().await.insert(listing.id, listing);
    }

    /// Change the daily rate of an existing listing
    pub async fn set_price(&self, listing_id: Uuid, price_per_day: Decimal) -> BookingResult<()> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .get_mut(&listing_id)
            .ok_or(BookingError::ListingNotFound(listing_id))?;
        listing.price_per_day = price_per_day;
        Ok(())
    }
}

#[async_trait]
impl ListingCatalog for InMemoryListingCatalog {
    async fn get_listing(&self, listing_id: Uuid) -> BookingResult<Option<Listing>> {
        Ok(self.listings.read().await.get(&listing_id).cloned())
    }
}
