//! Scheduled blocking handlers.

use std::time::Duration;

use chrono::{Local, NaiveTime, Weekday};
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use homegate_core::{BlockScheduler, BlockWindow, Gateway, MacAddress, ScheduledChange};

use crate::cli::{GlobalOpts, ScheduleArgs, ScheduleCommand};
use crate::error::CliError;
use crate::output;

use super::{router, util};

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ScheduleEntry {
    mac: MacAddress,
    #[serde(flatten)]
    window: BlockWindow,
    active: bool,
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&ScheduleEntry> for ScheduleRow {
    fn from(e: &ScheduleEntry) -> Self {
        Self {
            mac: e.mac.to_string(),
            window: e.window.to_string(),
            active: if e.active { "yes" } else { "" }.into(),
        }
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, CliError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not a time of day (expected HH:MM)"),
    })
}

fn parse_days(raw: &[String]) -> Result<Vec<Weekday>, CliError> {
    raw.iter()
        .map(|day| {
            day.trim().parse::<Weekday>().map_err(|_| CliError::Validation {
                field: "days".into(),
                reason: format!("'{day}' is not a day of the week"),
            })
        })
        .collect()
}

fn report(changes: &[ScheduledChange], quiet: bool) -> Result<(), CliError> {
    if changes.is_empty() {
        output::status_line("Every scheduled device is already in place", quiet);
        return Ok(());
    }
    let mut refused = Vec::new();
    for change in changes {
        let verb = if change.blocked { "Blocked" } else { "Unblocked" };
        if change.applied {
            output::status_line(&format!("{verb} {}", change.mac), quiet);
        } else {
            refused.push(change.mac.to_string());
        }
    }
    if refused.is_empty() {
        Ok(())
    } else {
        Err(CliError::OperationFailed {
            message: format!("The gateway did not accept changes for {}", refused.join(", ")),
        })
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(gateway: &Gateway, args: ScheduleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let scheduler = BlockScheduler::new(gateway.context().store.clone());

    match args.command {
        ScheduleCommand::List => {
            let now = Local::now().naive_local();
            let schedule = scheduler.schedule()?;
            let entries: Vec<ScheduleEntry> = schedule
                .iter()
                .flat_map(|(mac, windows)| {
                    windows.iter().map(move |w| ScheduleEntry {
                        mac: mac.clone(),
                        window: w.clone(),
                        active: w.contains(now),
                    })
                })
                .collect();
            if entries.is_empty() {
                output::warn_line(
                    "no block windows. Add one with: homegate devices schedule add <mac> --from HH:MM --until HH:MM",
                    global.quiet,
                );
            }
            let out = output::render_list(&global.output, &entries, |e| ScheduleRow::from(e), |e| {
                format!("{} {}", e.mac, e.window)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ScheduleCommand::Add {
            mac,
            from,
            until,
            days,
        } => {
            let mac = util::parse_mac(&mac)?;
            let window = BlockWindow::new(parse_time("from", &from)?, parse_time("until", &until)?)?
                .on_days(parse_days(&days)?);
            let summary = format!("Block {mac} during {window}");
            scheduler.add_window(mac, window)?;
            output::status_line(&summary, global.quiet);
            Ok(())
        }

        ScheduleCommand::Remove { mac } => {
            let mac = util::parse_mac(&mac)?;
            if !scheduler.clear(&mac)? {
                return Err(CliError::NotFound {
                    resource_type: "schedule".into(),
                    identifier: mac.to_string(),
                    list_command: "devices schedule list".into(),
                });
            }
            output::status_line(&format!("Removed the block schedule for {mac}"), global.quiet);
            Ok(())
        }

        ScheduleCommand::Apply { watch, every } => {
            router::require_live(gateway, global).await?;
            if !watch {
                let changes = scheduler.apply(gateway, Local::now().naive_local()).await?;
                return report(&changes, global.quiet);
            }

            let cancel = CancellationToken::new();
            let stop = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stop.cancel();
                }
            });
            output::status_line(
                &format!("Enforcing the block schedule every {every}s (Ctrl-C to stop)"),
                global.quiet,
            );
            scheduler.run(gateway, Duration::from_secs(every), &cancel).await;
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn times_need_hours_and_minutes() {
        assert_eq!(parse_time("from", "22:30").unwrap(), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert!(matches!(
            parse_time("from", "late"),
            Err(CliError::Validation { field, .. }) if field == "from"
        ));
    }

    #[test]
    fn days_accept_short_and_long_names() {
        let days = parse_days(&["mon".into(), "Friday".into()]).unwrap();
        assert_eq!(days, [Weekday::Mon, Weekday::Fri]);
        assert!(parse_days(&["someday".into()]).is_err());
    }
}
