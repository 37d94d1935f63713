// Network-setup page extraction.
//
// Fields are looked up one at a time by label. A missing label degrades that
// field to its default; it never fails the page.

use regex::Regex;
use tracing::trace;

use super::html;
use crate::models::{StatusFields, UNKNOWN};

pub const LABEL_INTERNET: &str = "Internet:";
pub const LABEL_UPTIME: &str = "System Uptime:";
pub const LABEL_CLIENTS: &str = "No of Clients connected:";
pub const LABEL_MODEL: &str = "Model:";
pub const LABEL_FIRMWARE: &str = "Software Version:";
pub const LABEL_SSID: &str = "Network Name (SSID):";

/// Extract whatever status fields the page carries.
pub fn extract_status(page: &str) -> StatusFields {
    let text_field = |label: &str| labeled_value(page, label).unwrap_or_else(|| UNKNOWN.into());

    StatusFields {
        internet: text_field(LABEL_INTERNET),
        uptime: text_field(LABEL_UPTIME),
        connected_devices: labeled_value(page, LABEL_CLIENTS)
            .and_then(|v| leading_number(&v))
            .unwrap_or(0),
        model: text_field(LABEL_MODEL),
        firmware: text_field(LABEL_FIRMWARE),
        ssid: text_field(LABEL_SSID),
    }
}

/// Value of the `<span class="value">` that follows the `readonlyLabel` span
/// reading `label`.
pub fn labeled_value(page: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\breadonlyLabel\b[^"']*["'][^>]*>\s*{}\s*</span\s*>\s*<span\b[^>]*class\s*=\s*["'][^"']*\bvalue\b[^"']*["'][^>]*>(.*?)</span\s*>"#,
        regex::escape(label)
    );
    let re = Regex::new(&pattern).ok()?;
    let value = re
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| html::text(m.as_str()))
        .filter(|v| !v.is_empty());

    if value.is_none() {
        trace!(label, "status field missing");
    }
    value
}

fn leading_number(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
