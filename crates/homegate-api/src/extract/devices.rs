// Connected-devices table extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::html;
use crate::error::Error;
use crate::models::DeviceEntry;

/// Container holding the online devices table. Required.
pub const ONLINE_CONTAINER: &str = "online-private";
/// Container holding the offline devices table. Optional.
pub const OFFLINE_CONTAINER: &str = "offline-private";

const LABEL_IPV4: &str = "IPv4 Address";
const LABEL_IPV6: &str = "IPv6 Address";
const LABEL_MAC: &str = "MAC Address";
const LABEL_COMMENTS: &str = "Comments";

// Column positions within a data row.
const COL_HOST: usize = 0;
const COL_ADDRESSING: usize = 1;
const COL_CONNECTION: usize = 2;
const COL_RSSI: usize = 3;
const COL_ACTION: usize = 4;

static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}([:-][0-9A-Fa-f]{2}){5}$").expect("valid regex")
});

static DEVICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*class\s*=\s*["'][^"']*\bdevice-name\b[^"']*["'][^>]*>(.*?)</a\s*>"#)
        .expect("valid regex")
});

static DEFINITION_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<dl\b.*?</dl\s*>").expect("valid regex"));

static RSSI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(-?\d+)\s*dBm").expect("valid regex"));

/// Why a single row was skipped. Never leaves this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowDefect {
    MissingMac,
    InvalidMac(String),
    MissingHostname,
    MissingHostCell,
}

/// Extract every well-formed device row from the devices page.
///
/// The online container must exist; the offline container is optional.
/// Malformed rows are dropped. The result is sorted by hostname
/// (case-insensitive), then MAC.
pub fn extract_devices(page: &str) -> Result<Vec<DeviceEntry>, Error> {
    let online = html::div_by_id(page, ONLINE_CONTAINER).ok_or(Error::StructuralParse {
        container: "div#online-private",
    })?;

    let mut devices = table_rows(online, true);
    if let Some(offline) = html::div_by_id(page, OFFLINE_CONTAINER) {
        devices.extend(table_rows(offline, false));
    }

    sort_devices(&mut devices);
    debug!(count = devices.len(), "extracted devices");
    Ok(devices)
}

/// Sort by hostname ignoring case, MAC breaking ties.
pub fn sort_devices(devices: &mut [DeviceEntry]) {
    devices.sort_by(|a, b| {
        a.hostname
            .to_lowercase()
            .cmp(&b.hostname.to_lowercase())
            .then_with(|| a.mac.cmp(&b.mac))
    });
}

/// Data rows of the container's table: the first row is the header and the
/// last the footer, both skipped by position.
fn table_rows(container: &str, online: bool) -> Vec<DeviceEntry> {
    let rows = html::rows(container);
    let data = match rows.len() {
        0..=2 => &[][..],
        n => &rows[1..n - 1],
    };

    data.iter()
        .enumerate()
        .filter_map(|(index, row)| match parse_row(row, online) {
            Ok(entry) => Some(entry),
            Err(defect) => {
                trace!(row = index + 1, ?defect, "skipping device row");
                None
            }
        })
        .collect()
}

pub(crate) fn parse_row(row: &str, online: bool) -> Result<DeviceEntry, RowDefect> {
    let cells = html::cells(row);
    let host_cell = cells.get(COL_HOST).ok_or(RowDefect::MissingHostCell)?;

    let mut ipv4 = None;
    let mut ipv6 = None;
    let mut mac = None;
    let mut comment = None;

    let definitions = html::definitions(host_cell);
    for entry in &definitions {
        if let Some(v) = html::value_after_label(entry, LABEL_IPV4) {
            ipv4 = Some(v.to_owned());
        } else if let Some(v) = html::value_after_label(entry, LABEL_IPV6) {
            ipv6 = Some(v.to_owned());
        } else if let Some(v) = html::value_after_label(entry, LABEL_MAC) {
            mac = Some(v.to_owned());
        } else if let Some(v) = html::value_after_label(entry, LABEL_COMMENTS) {
            comment = Some(v.to_owned());
        }
    }

    let mac = mac.ok_or(RowDefect::MissingMac)?;
    if !MAC.is_match(&mac) {
        return Err(RowDefect::InvalidMac(mac));
    }

    let hostname = DEVICE_NAME
        .captures(host_cell)
        .and_then(|c| c.get(1))
        .map(|m| html::text(m.as_str()))
        .or_else(|| {
            // No anchor: the host cell text before the definition list.
            let without_list = DEFINITION_LIST.replace_all(host_cell, "");
            Some(html::text(&without_list))
        })
        .filter(|h| !h.is_empty())
        .ok_or(RowDefect::MissingHostname)?;

    let column = |index: usize| {
        cells
            .get(index)
            .map(|c| html::text(c))
            .filter(|t| !t.is_empty())
    };

    let rssi_dbm = column(COL_RSSI)
        .and_then(|t| RSSI.captures(&t).and_then(|c| c[1].parse().ok()));
    let blocked = column(COL_ACTION).is_some_and(|t| t.eq_ignore_ascii_case("unblock"));

    Ok(DeviceEntry {
        mac,
        hostname,
        ipv4,
        ipv6,
        addressing: column(COL_ADDRESSING),
        connection: column(COL_CONNECTION),
        rssi_dbm,
        blocked,
        online,
        comment,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device_row(hostname: &str, mac: Option<&str>, action: &str) -> String {
        let mac_entry = mac
            .map(|m| format!("<dd><b>MAC Address</b>{m}</dd>"))
            .unwrap_or_default();
        format!(
            r#"<tr>
  <td headers="host-name"><a href="javascript:void(0)" class="label device-name">{hostname}</a>
    <div class="device-info"><dl>
      <dd><b>IPv4 Address</b>10.0.0.23</dd>
      {mac_entry}
      <dd><b>Comments</b>Living room TV</dd>
    </dl></div></td>
  <td headers="dhcp">DHCP</td>
  <td headers="connection">Wi-Fi 5G</td>
  <td headers="rssi">-61 dBm</td>
  <td headers="action"><a class="btn">{action}</a></td>
</tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><div id="content">
<div id="online-private" class="module"><table class="data">
<tr><th>Host Name</th><th>DHCP/Reserved IP</th><th>Connection</th><th>RSSI Level</th><th></th></tr>
{}
<tr class="table-footer"><td colspan="5">Add Device with Reserved IP</td></tr>
</table></div></div></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn well_formed_rows_survive_malformed_ones() {
        let rows = vec![
            device_row("zeta-phone", Some("AA:BB:CC:00:00:01"), "Block"),
            device_row("Broken", None, "Block"),
            device_row("alpha-laptop", Some("AA:BB:CC:00:00:02"), "Block"),
            device_row("Bad", Some("not-a-mac"), "Block"),
            device_row("", Some("AA:BB:CC:00:00:03"), "Block"),
            device_row("Mid", Some("AA:BB:CC:00:00:04"), "Unblock"),
        ];

        let devices = extract_devices(&page(&rows)).unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.hostname.as_str()).collect();
        assert_eq!(names, vec!["alpha-laptop", "Mid", "zeta-phone"]);
    }

    #[test]
    fn one_row_missing_mac_among_three() {
        let rows = vec![
            device_row("one", Some("AA:BB:CC:00:00:01"), "Block"),
            device_row("two", None, "Block"),
            device_row("three", Some("AA:BB:CC:00:00:03"), "Block"),
        ];
        assert_eq!(extract_devices(&page(&rows)).unwrap().len(), 2);
    }

    #[test]
    fn fields_are_split_on_labels() {
        let rows = vec![device_row("TV", Some("AA:BB:CC:00:00:09"), "Unblock")];
        let devices = extract_devices(&page(&rows)).unwrap();
        let tv = &devices[0];

        assert_eq!(tv.mac, "AA:BB:CC:00:00:09");
        assert_eq!(tv.ipv4.as_deref(), Some("10.0.0.23"));
        assert_eq!(tv.comment.as_deref(), Some("Living room TV"));
        assert_eq!(tv.addressing.as_deref(), Some("DHCP"));
        assert_eq!(tv.connection.as_deref(), Some("Wi-Fi 5G"));
        assert_eq!(tv.rssi_dbm, Some(-61));
        assert!(tv.blocked);
        assert!(tv.online);
    }

    #[test]
    fn missing_container_is_structural() {
        let err = extract_devices("<html><body><p>Loading</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::StructuralParse { .. }));
    }

    #[test]
    fn header_and_footer_only_yields_nothing() {
        assert!(extract_devices(&page(&[])).unwrap().is_empty());
    }

    #[test]
    fn ties_on_hostname_break_by_mac() {
        let rows = vec![
            device_row("printer", Some("AA:BB:CC:00:00:02"), "Block"),
            device_row("Printer", Some("AA:BB:CC:00:00:01"), "Block"),
        ];
        let devices = extract_devices(&page(&rows)).unwrap();
        assert_eq!(devices[0].mac, "AA:BB:CC:00:00:01");
        assert_eq!(devices[1].mac, "AA:BB:CC:00:00:02");
    }

    #[test]
    fn offline_container_marks_devices_offline() {
        let online = page(&[device_row("on", Some("AA:BB:CC:00:00:01"), "Block")]);
        let offline = format!(
            r#"<div id="offline-private"><table>
<tr><th>Host Name</th></tr>{}<tr><td>footer</td></tr></table></div>"#,
            device_row("off", Some("AA:BB:CC:00:00:02"), "Block")
        );
        let html = online.replace("</body>", &format!("{offline}</body>"));

        let devices = extract_devices(&html).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().find(|d| d.hostname == "off").is_some_and(|d| !d.online));
        assert!(devices.iter().find(|d| d.hostname == "on").is_some_and(|d| d.online));
    }
}
