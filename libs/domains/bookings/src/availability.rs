use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::date_range::DateRange;
use crate::error::{BookingError, BookingResult};

/// A date range blocked on a listing by one booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub booking_id: Uuid,
    pub range: DateRange,
}

/// Per-listing index of reserved date ranges.
///
/// `reserve` is a single check-and-insert: for two overlapping requests on
/// the same listing at most one succeeds, and the loser sees
/// [`BookingError::RangeConflict`]. Implementations bound every lock wait and
/// report [`BookingError::LockTimeout`] instead of blocking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityIndex: Send + Sync {
    /// True when no reservation on the listing overlaps `range`
    async fn is_free(&self, listing_id: Uuid, range: DateRange) -> BookingResult<bool>;

    /// Block `range` for `booking_id`, or fail without changing anything
    async fn reserve(
        &self,
        listing_id: Uuid,
        range: DateRange,
        booking_id: Uuid,
    ) -> BookingResult<()>;

    /// Drop the reservation held by `booking_id`; unknown bookings are a no-op
    async fn release(&self, listing_id: Uuid, booking_id: Uuid) -> BookingResult<()>;

    /// Current reservations on the listing, ordered by start date
    async fn reservations(&self, listing_id: Uuid) -> BookingResult<Vec<Reservation>>;
}

/// Non-overlapping reservations of one listing
#[derive(Debug, Default)]
struct ListingCalendar {
    by_start: BTreeMap<NaiveDate, Reservation>,
    by_booking: HashMap<Uuid, NaiveDate>,
}

impl ListingCalendar {
    /// Entries never overlap, so they are sorted by end as well as by start.
    /// Only the last entry starting on or before `range.end` can reach back
    /// into `range`.
    fn conflict(&self, range: &DateRange) -> Option<&Reservation> {
        self.by_start
            .range(..=range.end())
            .next_back()
            .map(|(_, reservation)| reservation)
            .filter(|reservation| reservation.range.overlaps(range))
    }

    fn insert(&mut self, reservation: Reservation) -> Result<(), Reservation> {
        if let Some(start) = self.by_booking.get(&reservation.booking_id) {
            let existing = self.by_start[start];
            return if existing.range == reservation.range {
                Ok(())
            } else {
                Err(existing)
            };
        }
        if let Some(existing) = self.conflict(&reservation.range) {
            return Err(*existing);
        }

        self.by_booking
            .insert(reservation.booking_id, reservation.range.start());
        self.by_start.insert(reservation.range.start(), reservation);
        Ok(())
    }

    fn remove(&mut self, booking_id: Uuid) -> Option<Reservation> {
        let start = self.by_booking.remove(&booking_id)?;
        self.by_start.remove(&start)
    }

    fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    fn snapshot(&self) -> Vec<Reservation> {
        self.by_start.values().copied().collect()
    }
}

/// In-process [`AvailabilityIndex`] with one mutex per listing.
///
/// Operations on different listings never wait on each other; the shared
/// directory lock is held only long enough to look up a listing's mutex.
/// A listing whose last reservation is released leaves the directory.
#[derive(Debug, Clone)]
pub struct InMemoryAvailabilityIndex {
    calendars: Arc<RwLock<CalendarDirectory>>,
    lock_timeout: Duration,
}

type SharedCalendar = Arc<Mutex<ListingCalendar>>;
type CalendarDirectory = HashMap<Uuid, SharedCalendar>;

impl InMemoryAvailabilityIndex {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            calendars: Arc::new(RwLock::new(HashMap::new())),
            lock_timeout,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(config.lock_timeout)
    }

    /// Calendar handles are only cloned out while the directory is locked.
    async fn directory(
        &self,
        listing_id: Uuid,
    ) -> BookingResult<RwLockReadGuard<'_, CalendarDirectory>> {
        tokio::time::timeout(self.lock_timeout, self.calendars.read())
            .await
            .map_err(|_| self.timed_out(listing_id, "directory"))
    }

    async fn directory_mut(
        &self,
        listing_id: Uuid,
    ) -> BookingResult<RwLockWriteGuard<'_, CalendarDirectory>> {
        tokio::time::timeout(self.lock_timeout, self.calendars.write())
            .await
            .map_err(|_| self.timed_out(listing_id, "directory"))
    }

    async fn existing_calendar(&self, listing_id: Uuid) -> BookingResult<Option<SharedCalendar>> {
        Ok(self.directory(listing_id).await?.get(&listing_id).cloned())
    }

    async fn calendar(&self, listing_id: Uuid) -> BookingResult<SharedCalendar> {
        if let Some(calendar) = self.existing_calendar(listing_id).await? {
            return Ok(calendar);
        }
        let mut calendars = self.directory_mut(listing_id).await?;
        Ok(Arc::clone(calendars.entry(listing_id).or_default()))
    }

    async fn lock(
        &self,
        listing_id: Uuid,
        calendar: SharedCalendar,
    ) -> BookingResult<OwnedMutexGuard<ListingCalendar>> {
        tokio::time::timeout(self.lock_timeout, calendar.lock_owned())
            .await
            .map_err(|_| self.timed_out(listing_id, "listing"))
    }

    fn timed_out(&self, listing_id: Uuid, lock: &'static str) -> BookingError {
        warn!(
            %listing_id,
            lock,
            timeout_ms = self.lock_timeout.as_millis() as u64,
            "Availability lock timed out"
        );
        BookingError::LockTimeout { listing_id }
    }

    /// Remove an emptied calendar unless some task still holds a handle to it.
    /// Best effort: a busy directory leaves the empty calendar in place.
    async fn prune(&self, listing_id: Uuid, calendar: SharedCalendar) {
        let Ok(mut calendars) = self.directory_mut(listing_id).await else {
            return;
        };
        drop(calendar);

        let idle = calendars.get(&listing_id).is_some_and(|entry| {
            Arc::strong_count(entry) == 1
                && entry.try_lock().is_ok_and(|calendar| calendar.is_empty())
        });
        if idle {
            calendars.remove(&listing_id);
            debug!(%listing_id, "Dropped empty calendar");
        }
    }
}

impl Default for InMemoryAvailabilityIndex {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

#[async_trait]
impl AvailabilityIndex for InMemoryAvailabilityIndex {
    async fn is_free(&self, listing_id: Uuid, range: DateRange) -> BookingResult<bool> {
        let Some(calendar) = self.existing_calendar(listing_id).await? else {
            return Ok(true);
        };
        let calendar = self.lock(listing_id, calendar).await?;
        Ok(calendar.conflict(&range).is_none())
    }

    async fn reserve(
        &self,
        listing_id: Uuid,
        range: DateRange,
        booking_id: Uuid,
    ) -> BookingResult<()> {
        let calendar = self.calendar(listing_id).await?;
        let mut calendar = self.lock(listing_id, calendar).await?;

        calendar
            .insert(Reservation { booking_id, range })
            .map_err(|existing| {
                debug!(
                    %listing_id,
                    %booking_id,
                    requested = %range,
                    held_by = %existing.booking_id,
                    "Reservation conflict"
                );
                BookingError::RangeConflict {
                    listing_id,
                    start: range.start(),
                    end: range.end(),
                }
            })?;

        debug!(%listing_id, %booking_id, range = %range, "Reserved");
        Ok(())
    }

    async fn release(&self, listing_id: Uuid, booking_id: Uuid) -> BookingResult<()> {
        let Some(calendar) = self.existing_calendar(listing_id).await? else {
            return Ok(());
        };
        let mut guard = self.lock(listing_id, Arc::clone(&calendar)).await?;

        match guard.remove(booking_id) {
            Some(reservation) => {
                debug!(%listing_id, %booking_id, range = %reservation.range, "Released")
            }
            None => debug!(%listing_id, %booking_id, "Nothing to release"),
        }

        let emptied = guard.is_empty();
        drop(guard);
        if emptied {
            self.prune(listing_id, calendar).await;
        }
        Ok(())
    }

    async fn reservations(&self, listing_id: Uuid) -> BookingResult<Vec<Reservation>> {
        let Some(calendar) = self.existing_calendar(listing_id).await? else {
            return Ok(Vec::new());
        };
        let calendar = self.lock(listing_id, calendar).await?;
        Ok(calendar.snapshot())
    }
}
