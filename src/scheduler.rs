//! Daily refresh jobs, detached from API traffic.
//!
//! Each remote-refreshable source gets its own task that sleeps until the
//! next configured local fire time and then runs a refresh. Failures are
//! logged and never propagate: a bad run must not take the process down or
//! block the next one.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, LocalResult, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::model::RefreshOutcome;
use crate::sources::{self, SourceSpec};
use crate::state::AppState;

pub fn spawn(state: Arc<AppState>) {
    let stocks_at = state.config.stocks_refresh_at;
    let rates_at = state.config.rates_refresh_at;

    if let Some(spec) = sources::by_alias("euronext") {
        spawn_daily(Arc::clone(&state), spec, stocks_at);
    }
    spawn_daily(state, sources::rates_spec(), rates_at);
}

fn spawn_daily(state: Arc<AppState>, spec: &'static SourceSpec, at: NaiveTime) {
    let offset_minutes = state.config.sched_utc_offset_minutes;
    tokio::spawn(async move {
        loop {
            let wait = until_next_fire(Utc::now(), at, offset_minutes);
            tokio::time::sleep(wait).await;

            tracing::info!("running scheduled refresh of {}", spec.file_name);
            match state.refresher.refresh_remote(spec).await {
                Ok(RefreshOutcome::Stocks { records_loaded }) => {
                    tracing::info!("scheduled refresh of {} loaded {records_loaded} records", spec.file_name);
                }
                Ok(RefreshOutcome::Rates { currencies_loaded }) => {
                    tracing::info!(
                        "scheduled refresh of {} loaded {currencies_loaded} currencies",
                        spec.file_name
                    );
                }
                Ok(RefreshOutcome::Skipped { .. }) => {}
                Err(e) => {
                    tracing::error!("scheduled refresh of {} failed: {e}", spec.file_name);
                }
            }
        }
    });
}

/// Time until the next occurrence of `at` in the fixed `offset_minutes` zone.
fn until_next_fire(now: DateTime<Utc>, at: NaiveTime, offset_minutes: i32) -> Duration {
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("UTC offset is valid"));
    let local_now = now.with_timezone(&offset);

    let mut target_date = local_now.date_naive();
    if local_now.time() >= at {
        target_date = target_date + ChronoDuration::days(1);
    }

    let target = match target_date.and_time(at).and_local_timezone(offset) {
        LocalResult::Single(t) => t,
        // Unreachable for a fixed offset; retry in a day rather than spin.
        _ => return Duration::from_secs(24 * 60 * 60),
    };

    (target - local_now)
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}
