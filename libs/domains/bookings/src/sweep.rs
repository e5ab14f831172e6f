use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::availability::AvailabilityIndex;
use crate::error::{BookingError, BookingResult};
use crate::events::EventPublisher;
use crate::models::{Actor, Booking};
use crate::repository::BookingRepository;
use crate::service::BookingLifecycleService;
use crate::state_machine::{BookingStatus, TransitionEvent};

/// Outcome of one time-driven pass over the bookings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub as_of: NaiveDate,
    pub activated: usize,
    pub completed: usize,
    /// Moved by someone else between listing and transitioning
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            activated: 0,
            completed: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

enum Outcome {
    Applied,
    Skipped,
    Failed,
}

impl<R, A, P> BookingLifecycleService<R, A, P>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    /// Activate confirmed bookings that have started and complete active ones
    /// that ended before `as_of`.
    ///
    /// Runs as the system actor. A confirmed booking whose whole range is
    /// already past is activated and completed in the same pass.
    #[instrument(skip(self))]
    pub async fn sweep(&self, as_of: NaiveDate) -> BookingResult<SweepReport> {
        let mut report = SweepReport::new(as_of);

        for booking in self.bookings_with_status(BookingStatus::Confirmed).await? {
            if booking.range.start() <= as_of {
                match self.sweep_one(&booking, TransitionEvent::Activate).await {
                    Outcome::Applied => report.activated += 1,
                    Outcome::Skipped => report.skipped += 1,
                    Outcome::Failed => report.failed += 1,
                }
            }
        }

        for booking in self.bookings_with_status(BookingStatus::Active).await? {
            if booking.range.end() < as_of {
                match self.sweep_one(&booking, TransitionEvent::Complete).await {
                    Outcome::Applied => report.completed += 1,
                    Outcome::Skipped => report.skipped += 1,
                    Outcome::Failed => report.failed += 1,
                }
            }
        }

        info!(
            %as_of,
            activated = report.activated,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed,
            "Sweep finished"
        );
        Ok(report)
    }

    async fn sweep_one(&self, booking: &Booking, event: TransitionEvent) -> Outcome {
        match self
            .apply_transition(booking.id, event, Actor::system())
            .await
        {
            Ok(_) => Outcome::Applied,
            Err(BookingError::IllegalTransition { from, .. }) => {
                debug!(booking_id = %booking.id, %from, %event, "Booking moved before sweep reached it");
                Outcome::Skipped
            }
            Err(e) => {
                warn!(booking_id = %booking.id, %event, error = %e, "Sweep could not transition booking");
                Outcome::Failed
            }
        }
    }
}
