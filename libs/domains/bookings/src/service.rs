use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::availability::{AvailabilityIndex, Reservation};
use crate::catalog::ListingCatalog;
use crate::date_range::DateRange;
use crate::error::{BookingError, BookingResult};
use crate::events::{BookingEvent, BookingEventKind, EventPublisher};
use crate::models::{Actor, Booking, BookingFilter, CreateBooking, Party, StatusChange};
use crate::pricing;
use crate::repository::BookingRepository;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::state_machine::{ActorRole, BookingStateMachine, BookingStatus, TransitionEvent};

/// Service layer for the booking lifecycle
///
/// The only writer of bookings and reservations. Every operation either
/// commits to both the repository and the availability index or leaves both
/// as they were.
pub struct BookingLifecycleService<R, A, P>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    repository: Arc<R>,
    availability: Arc<A>,
    publisher: Arc<P>,
    catalog: Option<Arc<dyn ListingCatalog>>,
    retry: RetryPolicy,
}

impl<R, A, P> Clone for BookingLifecycleService<R, A, P>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            availability: Arc::clone(&self.availability),
            publisher: Arc::clone(&self.publisher),
            catalog: self.catalog.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl<R, A, P> BookingLifecycleService<R, A, P>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    pub fn new(repository: R, availability: A, publisher: P) -> Self {
        Self {
            repository: Arc::new(repository),
            availability: Arc::new(availability),
            publisher: Arc::new(publisher),
            catalog: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Backoff used when a listing lock is contended
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Add a listing catalog for [`Self::create_booking_for_listing`]
    pub fn with_catalog(mut self, catalog: Arc<dyn ListingCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Open a `pending` booking and block its dates.
    ///
    /// The price is computed once here and never again.
    #[instrument(skip(self, input), fields(listing_id = %input.listing_id, range = %input.range))]
    pub async fn create_booking(&self, input: CreateBooking) -> BookingResult<Booking> {
        let total_amount =
            pricing::compute(&input.range, input.unit_price_per_day, input.quantity)?;

        let booking_id = Uuid::now_v7();
        self.reserve_with_retry(input.listing_id, input.range, booking_id)
            .await?;

        let booking = Booking::pending(booking_id, &input, total_amount);
        let booking = match self.repository.insert(booking).await {
            Ok(booking) => booking,
            Err(e) => {
                error!(%booking_id, error = %e, "Failed to store booking, releasing dates");
                if let Err(release_err) = self.release_with_retry(input.listing_id, booking_id).await
                {
                    error!(%booking_id, error = %release_err, "Failed to release dates of unstored booking");
                }
                return Err(e);
            }
        };

        info!(
            booking_id = %booking.id,
            total_amount = %booking.total_amount,
            "Booking created"
        );
        self.emit(BookingEventKind::BookingCreated, &booking).await;
        Ok(booking)
    }

    /// Open a booking at the listing's current owner and daily rate
    #[instrument(skip(self), fields(listing_id = %listing_id))]
    pub async fn create_booking_for_listing(
        &self,
        listing_id: Uuid,
        renter_id: Uuid,
        range: DateRange,
        quantity: u32,
    ) -> BookingResult<Booking> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| BookingError::Internal("no listing catalog configured".to_string()))?;
        let listing = catalog
            .get_listing(listing_id)
            .await?
            .ok_or(BookingError::ListingNotFound(listing_id))?;

        self.create_booking(CreateBooking {
            listing_id,
            renter_id,
            owner_id: listing.owner_id,
            range,
            quantity,
            unit_price_per_day: listing.price_per_day,
        })
        .await
    }

    /// Fire `event` on a booking on behalf of `actor`.
    ///
    /// Entering `cancelled` or `completed` releases the dates before this
    /// returns. If they cannot be released the status change is undone.
    #[instrument(skip(self), fields(booking_id = %booking_id, event = %event, role = %actor.role))]
    pub async fn apply_transition(
        &self,
        booking_id: Uuid,
        event: TransitionEvent,
        actor: Actor,
    ) -> BookingResult<Booking> {
        let booking = self.get_booking(booking_id).await?;
        let target = BookingStateMachine::transition(booking.status, event, actor.role)?;
        check_identity(&booking, actor, event)?;

        let change = StatusChange::new(target, event, actor);
        let updated = self
            .repository
            .update_status(booking.id, booking.status, change)
            .await
            .map_err(|e| match e {
                BookingError::StatusChanged { actual, .. } => {
                    debug!(%booking_id, %actual, "Lost a concurrent transition");
                    BookingError::IllegalTransition {
                        from: actual,
                        event,
                    }
                }
                other => other,
            })?;

        if !target.holds_reservation() {
            if let Err(e) = self
                .release_with_retry(updated.listing_id, updated.id)
                .await
            {
                error!(%booking_id, error = %e, "Failed to release dates, reverting status");
                if let Err(revert_err) = self.repository.revert_status(updated.id, target).await {
                    error!(%booking_id, error = %revert_err, "Failed to revert status");
                }
                return Err(e);
            }
        }

        info!(%booking_id, from = %booking.status, to = %target, "Booking transitioned");
        self.emit(BookingEventKind::for_transition(event), &updated)
            .await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(booking_id = %id))]
    pub async fn get_booking(&self, id: Uuid) -> BookingResult<Booking> {
        self.repository
            .get(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    /// Bookings of one renter or one owner, newest first
    pub async fn list_bookings_for(
        &self,
        party: Party,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<Booking>> {
        self.repository
            .list(BookingFilter::for_party(party).with_status(status))
            .await
    }

    /// Paged listing with arbitrary filters
    pub async fn list_bookings(&self, filter: BookingFilter) -> BookingResult<Vec<Booking>> {
        filter.validate()?;
        self.repository.list(filter).await
    }

    pub(crate) async fn bookings_with_status(
        &self,
        status: BookingStatus,
    ) -> BookingResult<Vec<Booking>> {
        self.repository
            .list(BookingFilter::all().with_status(Some(status)))
            .await
    }

    /// True when no live booking on the listing overlaps `range`
    #[instrument(skip(self), fields(listing_id = %listing_id, range = %range))]
    pub async fn get_availability(&self, listing_id: Uuid, range: DateRange) -> BookingResult<bool> {
        self.availability.is_free(listing_id, range).await
    }

    /// Reserved ranges of a listing ordered by start date
    pub async fn blocked_ranges(&self, listing_id: Uuid) -> BookingResult<Vec<Reservation>> {
        self.availability.reservations(listing_id).await
    }

    async fn reserve_with_retry(
        &self,
        listing_id: Uuid,
        range: DateRange,
        booking_id: Uuid,
    ) -> BookingResult<()> {
        retry_with_backoff(
            || self.availability.reserve(listing_id, range, booking_id),
            &self.retry,
            BookingError::is_retryable,
        )
        .await
    }

    async fn release_with_retry(&self, listing_id: Uuid, booking_id: Uuid) -> BookingResult<()> {
        retry_with_backoff(
            || self.availability.release(listing_id, booking_id),
            &self.retry,
            BookingError::is_retryable,
        )
        .await
    }

    async fn emit(&self, kind: BookingEventKind, booking: &Booking) {
        let event = BookingEvent::from_booking(kind, booking);
        if let Err(e) = self.publisher.publish(&event).await {
            warn!(error = %e, %kind, booking_id = %booking.id, "Failed to publish booking event");
        }
    }
}

/// Renters and owners may only act on their own bookings
fn check_identity(booking: &Booking, actor: Actor, event: TransitionEvent) -> BookingResult<()> {
    let allowed = match actor.role {
        ActorRole::Renter => actor.id == booking.renter_id,
        ActorRole::Owner => actor.id == booking.owner_id,
        ActorRole::System => true,
    };
    if !allowed {
        return Err(BookingError::Unauthorized {
            role: actor.role,
            event,
        });
    }
    Ok(())
}
