// Per-device traffic counters.

use tracing::trace;

use super::html;
use crate::error::Error;
use crate::models::TrafficEntry;

pub const TRAFFIC_CONTAINER: &str = "traffic-stats";

/// Extract the traffic table. The first row is the header; rows whose
/// counters do not parse are dropped.
pub fn extract_traffic(page: &str) -> Result<Vec<TrafficEntry>, Error> {
    let container = html::div_by_id(page, TRAFFIC_CONTAINER).ok_or(Error::StructuralParse {
        container: "div#traffic-stats",
    })?;

    Ok(html::rows(container)
        .into_iter()
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = html::cells(row).into_iter().map(html::text).collect();
            let entry = match cells.as_slice() {
                [mac, sent, received, ..] => Some(TrafficEntry {
                    mac: mac.clone(),
                    bytes_sent: parse_count(sent)?,
                    bytes_received: parse_count(received)?,
                }),
                _ => None,
            };
            if entry.is_none() {
                trace!("skipping traffic row");
            }
            entry
        })
        .collect())
}

/// Counters are printed with thousands separators.
fn parse_count(raw: &str) -> Option<u64> {
    raw.chars()
        .filter(|c| !matches!(c, ',' | ' '))
        .collect::<String>()
        .parse()
        .ok()
}
