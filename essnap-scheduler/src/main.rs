// essnap Scheduler - takes cluster snapshots on configured schedules
// and prunes old ones according to each schedule's retention

use anyhow::{Context, Result};
use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Timelike, Utc,
};
use essnap::{ClusterTransport, SnapshotAdminClient};
use essnap_common::{
    ClusterConfig, Schedule, ScheduleType, SchedulesConfig, SnapshotRequest, SnapshotState,
};
use std::thread;
use std::time::Duration;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("================================================");
    log::info!("essnap Scheduler Service Starting");
    log::info!("================================================");

    let config = match ClusterConfig::new() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let client = match SnapshotAdminClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create cluster client: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Cluster: {}", config.url);
    log::info!("Schedules config: {}", config.schedules_config.display());

    // Main service loop
    loop {
        if let Err(e) = run_scheduler_loop(&config, &client) {
            log::error!("Scheduler error: {:#}", e);
            log::info!("Will retry in 60 seconds...");
            thread::sleep(Duration::from_secs(60));
        }
    }
}

/// Main scheduler loop
fn run_scheduler_loop<T: ClusterTransport>(
    config: &ClusterConfig,
    client: &SnapshotAdminClient<T>,
) -> Result<()> {
    let schedules = load_schedules(config)?;
    let enabled = schedules.enabled_schedules();

    if enabled.is_empty() {
        log::warn!("No schedules are enabled. Waiting 5 minutes before checking again...");
        thread::sleep(Duration::from_secs(300));
        return Ok(());
    }

    log::info!("Enabled schedules:");
    for schedule in &enabled {
        log::info!(
            "  - {} ({}) -> {} [{}]",
            schedule.prefix,
            schedule.schedule_type.as_str(),
            schedule.repository,
            schedule.indices
        );
    }

    let now = Local::now();
    let mut next_runs: Vec<(DateTime<Local>, &Schedule)> = enabled
        .iter()
        .filter_map(|s| {
            let next = s
                .validate()
                .map_err(anyhow::Error::msg)
                .and_then(|_| next_run(s, &now));
            match next {
                Ok(at) => Some((at, *s)),
                Err(e) => {
                    log::warn!("Skipping schedule '{}': {:#}", s.prefix, e);
                    None
                }
            }
        })
        .collect();

    if next_runs.is_empty() {
        log::error!("Could not calculate next run time for any schedule");
        return Err(anyhow::anyhow!("No valid schedules"));
    }

    // Sort by soonest first
    next_runs.sort_by_key(|(at, _)| *at);
    let (run_at, next_schedule) = next_runs[0];

    let sleep_duration = (run_at - now).to_std().unwrap_or(Duration::ZERO);
    log::info!(
        "Next snapshot: {} in {} (at {})",
        next_schedule.prefix,
        format_duration(sleep_duration),
        run_at.format("%Y-%m-%d %H:%M")
    );

    // Sleep until it's time
    thread::sleep(sleep_duration);

    run_schedule(client, next_schedule, Utc::now())?;

    // Retention failures must not stop future snapshots
    match apply_retention(client, next_schedule, Utc::now()) {
        Ok(0) => {}
        Ok(deleted) => log::info!(
            "Retention removed {} snapshot(s) for '{}'",
            deleted,
            next_schedule.prefix
        ),
        Err(e) => log::warn!("Failed to apply retention cleanup: {:#}", e),
    }

    Ok(())
}

/// Load schedules from configuration file
fn load_schedules(config: &ClusterConfig) -> Result<SchedulesConfig> {
    if !config.schedules_config.exists() {
        log::warn!(
            "Schedules config not found at {}. Using defaults.",
            config.schedules_config.display()
        );
        return Ok(SchedulesConfig::default());
    }

    SchedulesConfig::load_from_file(&config.schedules_config)
        .context("Failed to load schedules configuration")
}

/// Take the snapshot for a schedule, returning its name
fn run_schedule<T: ClusterTransport>(
    client: &SnapshotAdminClient<T>,
    schedule: &Schedule,
    now: DateTime<Utc>,
) -> Result<String> {
    let name = essnap_common::snapshot_name(Some(&schedule.prefix), now);
    let request = SnapshotRequest::new(schedule.indices.as_str(), client.snapshot_defaults());

    log::info!(
        "Creating scheduled snapshot: {}/{}",
        schedule.repository,
        name
    );

    let state = client
        .create_snapshot_named(&schedule.repository, &name, &request)
        .with_context(|| format!("Scheduled snapshot '{}' failed", name))?;

    if let Some(state) = state.filter(|s| *s != SnapshotState::Success) {
        log::warn!(
            "Scheduled snapshot '{}' finished with state {}, retention will not count it",
            name,
            state.as_str()
        );
    }

    Ok(name)
}

/// Delete snapshots of a schedule that fall outside its retention
fn apply_retention<T: ClusterTransport>(
    client: &SnapshotAdminClient<T>,
    schedule: &Schedule,
    now: DateTime<Utc>,
) -> Result<usize> {
    log::info!("Running retention cleanup for '{}'...", schedule.prefix);

    let snapshots = client
        .list_snapshots(&schedule.repository)
        .context("Failed to list snapshots for retention")?;

    let to_delete = schedule
        .retention()
        .apply(&snapshots, &schedule.prefix, now);

    let mut deleted = 0;
    for name in &to_delete {
        // Keep going; the next run retries whatever is left
        match client.delete_snapshot(&schedule.repository, name) {
            Ok(()) => deleted += 1,
            Err(e) => log::warn!("Could not delete expired snapshot '{}': {}", name, e),
        }
    }

    Ok(deleted)
}

/// Calculate the next run time of a schedule strictly after `now`
fn next_run<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let tz = now.timezone();
    let local = now.naive_local();
    let today = local.date();

    match schedule.schedule_type {
        ScheduleType::Hourly => {
            let this_hour = today
                .and_hms_opt(local.hour(), 0, 0)
                .context("Invalid current hour")?;
            resolve(&tz, this_hour + TimeDelta::hours(1))
        }

        ScheduleType::Daily => {
            let time = schedule_time(schedule)?;
            let candidate = resolve(&tz, today.and_time(time))?;
            if candidate > *now {
                Ok(candidate)
            } else {
                resolve(&tz, (today + TimeDelta::days(1)).and_time(time))
            }
        }

        ScheduleType::Weekly => {
            let time = schedule_time(schedule)?;
            let target = schedule
                .day_of_week
                .context("Weekly schedule missing day_of_week")? as i64;

            let current = today.weekday().num_days_from_sunday() as i64;
            let days_until = (target - current).rem_euclid(7);

            let candidate = resolve(&tz, (today + TimeDelta::days(days_until)).and_time(time))?;
            if candidate > *now {
                Ok(candidate)
            } else {
                // Target day but time has passed, wait until next week
                resolve(
                    &tz,
                    (today + TimeDelta::days(days_until + 7)).and_time(time),
                )
            }
        }

        ScheduleType::Monthly => {
            let time = schedule_time(schedule)?;
            let target = schedule
                .day_of_month
                .context("Monthly schedule missing day_of_month")? as u32;

            let this_month = month_day(today.year(), today.month(), target)?;
            let candidate = resolve(&tz, this_month.and_time(time))?;
            if candidate > *now {
                return Ok(candidate);
            }

            let (year, month) = next_month(today.year(), today.month());
            resolve(&tz, month_day(year, month, target)?.and_time(time))
        }
    }
}

/// Parse the HH:MM time of a schedule
fn schedule_time(schedule: &Schedule) -> Result<NaiveTime> {
    let time = schedule.time.as_deref().with_context(|| {
        format!(
            "{} schedule missing time",
            schedule.schedule_type.as_str()
        )
    })?;

    NaiveTime::parse_from_str(time, "%H:%M")
        .with_context(|| format!("Invalid schedule time '{}'", time))
}

/// Map a wall-clock time to the time zone, skipping forward over DST gaps
fn resolve<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .with_context(|| format!("{} does not exist in the local time zone", naive))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The given day of a month, clamped to the month's last day
fn month_day(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = next_month(year, month);
    let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .with_context(|| format!("Invalid month {}-{}", year, month))?;

    NaiveDate::from_ymd_opt(year, month, day.min(last_day))
        .with_context(|| format!("Invalid date {}-{}-{}", year, month, day))
}

/// Format duration into human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essnap::{ClusterRequest, ClusterResponse, Method};
    use std::sync::Mutex;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_next_hourly() {
        let schedule = Schedule::default_hourly();
        let now = Utc.with_ymd_and_hms(2024, 6, 5, 10, 15, 30).unwrap();
        assert_eq!(next_run(&schedule, &now).unwrap(), at(2024, 6, 5, 11, 0));

        let now = at(2024, 12, 31, 23, 0);
        assert_eq!(next_run(&schedule, &now).unwrap(), at(2025, 1, 1, 0, 0));
    }

    #[test]
    fn test_next_daily() {
        let schedule = Schedule::default_daily(); // 02:00

        assert_eq!(
            next_run(&schedule, &at(2024, 6, 5, 1, 0)).unwrap(),
            at(2024, 6, 5, 2, 0)
        );
        // Exactly at the scheduled time counts as already run
        assert_eq!(
            next_run(&schedule, &at(2024, 6, 5, 2, 0)).unwrap(),
            at(2024, 6, 6, 2, 0)
        );
        assert_eq!(
            next_run(&schedule, &at(2024, 6, 30, 3, 0)).unwrap(),
            at(2024, 7, 1, 2, 0)
        );
    }

    #[test]
    fn test_next_weekly() {
        // 2024-06-05 is a Wednesday
        let schedule = Schedule::default_weekly(); // Sunday 03:00
        assert_eq!(
            next_run(&schedule, &at(2024, 6, 5, 10, 0)).unwrap(),
            at(2024, 6, 9, 3, 0)
        );

        let mut wednesday = Schedule::default_weekly();
        wednesday.day_of_week = Some(3);
        assert_eq!(
            next_run(&wednesday, &at(2024, 6, 5, 1, 0)).unwrap(),
            at(2024, 6, 5, 3, 0)
        );
        assert_eq!(
            next_run(&wednesday, &at(2024, 6, 5, 10, 0)).unwrap(),
            at(2024, 6, 12, 3, 0)
        );
    }

    #[test]
    fn test_next_monthly() {
        let schedule = Schedule::default_monthly(); // 1st at 04:00
        assert_eq!(
            next_run(&schedule, &at(2024, 12, 15, 0, 0)).unwrap(),
            at(2025, 1, 1, 4, 0)
        );

        let mut end_of_month = Schedule::default_monthly();
        end_of_month.day_of_month = Some(31);
        assert_eq!(
            next_run(&end_of_month, &at(2024, 2, 10, 0, 0)).unwrap(),
            at(2024, 2, 29, 4, 0)
        );
        assert_eq!(
            next_run(&end_of_month, &at(2024, 3, 31, 5, 0)).unwrap(),
            at(2024, 4, 30, 4, 0)
        );
    }

    #[test]
    fn test_missing_time_is_an_error() {
        let mut schedule = Schedule::default_daily();
        schedule.time = None;
        assert!(next_run(&schedule, &at(2024, 6, 5, 1, 0)).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 120)), "3h 2m");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d 1h");
    }

    /// Answers listings and snapshot creation with fixed bodies, acknowledges deletes
    struct ListingTransport {
        listing: String,
        put_reply: String,
        requests: Mutex<Vec<ClusterRequest>>,
    }

    impl ListingTransport {
        fn new(listing: &str) -> Self {
            Self {
                listing: listing.to_string(),
                put_reply: r#"{"acknowledged":true}"#.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn answering_put(mut self, body: &str) -> Self {
            self.put_reply = body.to_string();
            self
        }
    }

    impl ClusterTransport for ListingTransport {
        fn execute(&self, request: &ClusterRequest) -> essnap::Result<ClusterResponse> {
            self.requests.lock().unwrap().push(request.clone());

            let body = match request.method {
                Method::Get => self.listing.clone(),
                Method::Put => self.put_reply.clone(),
                Method::Delete => r#"{"acknowledged":true}"#.to_string(),
            };

            Ok(ClusterResponse { status: 200, body })
        }
    }

    #[test]
    fn test_run_schedule() {
        let client = SnapshotAdminClient::new(ListingTransport::new("{}"));
        let mut schedule = Schedule::default_daily();
        schedule.repository = "graylog".to_string();
        schedule.indices = "graylog_*".to_string();

        let name = run_schedule(&client, &schedule, at(2024, 6, 5, 2, 0)).unwrap();
        assert_eq!(name, "daily-2024-06-05-02:00:00");

        let requests = client.transport().requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].path,
            vec!["_snapshot", "graylog", "daily-2024-06-05-02:00:00"]
        );
        assert_eq!(requests[0].body.as_ref().unwrap()["indices"], "graylog_*");
    }

    #[test]
    fn test_failed_scheduled_snapshot_is_an_error() {
        let client = SnapshotAdminClient::new(ListingTransport::new("{}").answering_put(
            r#"{"snapshot":{"snapshot":"x","state":"FAILED","reason":"disk full"}}"#,
        ));

        let err = run_schedule(&client, &Schedule::default_daily(), at(2024, 6, 5, 2, 0))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
    }

    #[test]
    fn test_apply_retention() {
        let listing = r#"{"snapshots":[
            {"snapshot":"daily-2024-06-01-02:00:00","state":"SUCCESS","start_time_in_millis":1717207200000},
            {"snapshot":"daily-2024-06-02-02:00:00","state":"SUCCESS","start_time_in_millis":1717293600000},
            {"snapshot":"daily-2024-06-03-02:00:00","state":"SUCCESS","start_time_in_millis":1717380000000},
            {"snapshot":"weekly-2024-06-02-03:00:00","state":"SUCCESS","start_time_in_millis":1717297200000}
        ]}"#;
        let client = SnapshotAdminClient::new(ListingTransport::new(listing));

        let mut schedule = Schedule::default_daily();
        schedule.keep_count = 2;
        schedule.keep_days = 0;

        let deleted = apply_retention(&client, &schedule, at(2024, 6, 3, 12, 0)).unwrap();
        assert_eq!(deleted, 1);

        let requests = client.transport().requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Delete);
        assert_eq!(
            requests[1].path,
            vec!["_snapshot", "backups", "daily-2024-06-01-02:00:00"]
        );
    }
}
