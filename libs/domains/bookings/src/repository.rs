use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingFilter, StatusChange};
use crate::state_machine::BookingStatus;

/// Repository trait for Booking persistence
///
/// Bookings are never deleted. Status changes are compare-and-set on the
/// expected current status so two concurrent transitions cannot both commit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Store a new booking
    async fn insert(&self, booking: Booking) -> BookingResult<Booking>;

    /// Get a booking by ID
    async fn get(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    /// Bookings matching the filter, newest first
    async fn list(&self, filter: BookingFilter) -> BookingResult<Vec<Booking>>;

    /// Apply `change` if the booking is still in `expected`.
    ///
    /// Fails with [`BookingError::StatusChanged`] when another writer got there first.
    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        change: StatusChange,
    ) -> BookingResult<Booking>;

    /// Undo the last status change if the booking is still in `expected`
    async fn revert_status(&self, id: Uuid, expected: BookingStatus) -> BookingResult<Booking>;
}

/// In-memory implementation of BookingRepository
#[derive(Clone, Default)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_status(booking: &Booking, expected: BookingStatus) -> BookingResult<()> {
    if booking.status != expected {
        return Err(BookingError::StatusChanged {
            id: booking.id,
            expected,
            actual: booking.status,
        });
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: Booking) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(BookingError::Internal(format!(
                "booking {} already exists",
                booking.id
            )));
        }

        bookings.insert(booking.id, booking.clone());
        tracing::debug!(booking_id = %booking.id, "Stored booking");
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn list(&self, filter: BookingFilter) -> BookingResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;

        let mut result: Vec<Booking> = bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();

        result.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        Ok(result.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        change: StatusChange,
    ) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or(BookingError::NotFound(id))?;
        check_status(booking, expected)?;

        booking.apply_change(change);
        Ok(booking.clone())
    }

    async fn revert_status(&self, id: Uuid, expected: BookingStatus) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or(BookingError::NotFound(id))?;
        check_status(booking, expected)?;

        if booking.status_history.len() < 2 {
            return Err(BookingError::Internal(format!(
                "booking {} has no status change to revert",
                id
            )));
        }
        booking.status_history.pop();
        if let Some(previous) = booking.status_history.last() {
            booking.status = previous.status;
            booking.updated_at = previous.at;
        }

        tracing::warn!(booking_id = %id, status = %booking.status, "Reverted status change");
        Ok(booking.clone())
    }
}
