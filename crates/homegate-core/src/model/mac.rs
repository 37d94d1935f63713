// ── MacAddress ──
//
// Identity key of every device record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Normalize any common spelling: colon- or dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lowered = raw.as_ref().trim().to_lowercase().replace('-', ":");
        let bare = !lowered.contains(':') && lowered.len() == 12;
        if bare && lowered.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<&str> = (0..6).filter_map(|i| lowered.get(i * 2..i * 2 + 2)).collect();
            return Self(pairs.join(":"));
        }
        Self(lowered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for MacAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_spellings() {
        assert_eq!(MacAddress::new("AA-BB-CC-00-11-22").as_str(), "aa:bb:cc:00:11:22");
        assert_eq!(MacAddress::new("AA:BB:CC:00:11:22").as_str(), "aa:bb:cc:00:11:22");
        assert_eq!(MacAddress::new("aabbcc001122").as_str(), "aa:bb:cc:00:11:22");
    }

    #[test]
    fn spellings_compare_equal() {
        assert_eq!(MacAddress::new("AA-BB-CC-00-11-22"), MacAddress::new("aabbcc001122"));
    }
}
