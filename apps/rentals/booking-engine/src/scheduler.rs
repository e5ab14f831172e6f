use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use eyre::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::EngineService;

/// Register the status sweep on `cron_expr` and start the scheduler.
///
/// Both the schedule and the date handed to the sweep follow `timezone`, so a
/// booking starting on a local date activates at local midnight.
/// The returned scheduler must be kept alive for the job to keep firing.
pub async fn start_sweep(
    service: EngineService,
    cron_expr: &str,
    timezone: Tz,
) -> Result<JobScheduler> {
    info!(cron = cron_expr, timezone = timezone.name(), "Scheduling booking status sweep");

    let sched = JobScheduler::new().await?;

    let job = Job::new_async_tz(cron_expr, timezone, move |_uuid, _l| {
        let service = service.clone();

        Box::pin(async move {
            let today = sweep_date(Utc::now(), timezone);
            match service.sweep(today).await {
                Ok(report) => {
                    info!(
                        as_of = %report.as_of,
                        activated = report.activated,
                        completed = report.completed,
                        failed = report.failed,
                        "Scheduled sweep complete"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Scheduled sweep failed");
                }
            }
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    Ok(sched)
}

/// Calendar date of `now` in `timezone`
fn sweep_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}
