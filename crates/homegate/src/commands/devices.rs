//! Device command handlers.

use bytesize::ByteSize;
use tabled::Tabled;

use homegate_core::{Device, DeviceService, Gateway, TrafficData};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{router, schedule, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IPv4")]
    ipv4: String,
    #[tabled(rename = "Link")]
    link: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Blocked")]
    blocked: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.display_name().to_owned(),
            mac: d.mac.to_string(),
            ipv4: d.ipv4.map(|ip| ip.to_string()).unwrap_or_default(),
            link: d.link.to_string(),
            band: d.band.map(|b| b.to_string()).unwrap_or_default(),
            signal: d.signal_dbm.map(|s| format!("{s} dBm")).unwrap_or_default(),
            status: if d.online { "online" } else { "offline" }.into(),
            blocked: if d.blocked { "yes" } else { "" }.into(),
        }
    }
}

fn traffic_detail(t: &TrafficData) -> String {
    [
        format!("MAC:       {}", t.mac),
        format!("Sent:      {}", ByteSize(t.bytes_sent)),
        format!("Received:  {}", ByteSize(t.bytes_received)),
        format!("Sampled:   {}", t.sampled_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(gateway: &Gateway, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            router::ensure_connected(gateway, global).await?;
            let devices = gateway.get_devices().await?;
            let out = output::render_list(&global.output, &devices, |d| DeviceRow::from(d), |d| {
                d.mac.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Block { mac } => {
            let mac = util::parse_mac(&mac)?;
            if !util::confirm(&format!("Block {mac} from the network?"), "block", global.yes)? {
                return Ok(());
            }
            router::require_live(gateway, global).await?;
            if !gateway.block_device(&mac).await {
                return Err(CliError::OperationFailed {
                    message: format!("The gateway did not block {mac}"),
                });
            }
            output::status_line(&format!("Blocked {mac}"), global.quiet);
            Ok(())
        }

        DevicesCommand::Unblock { mac } => {
            let mac = util::parse_mac(&mac)?;
            router::require_live(gateway, global).await?;
            if !gateway.unblock_device(&mac).await {
                return Err(CliError::OperationFailed {
                    message: format!("The gateway did not unblock {mac}"),
                });
            }
            output::status_line(&format!("Unblocked {mac}"), global.quiet);
            Ok(())
        }

        DevicesCommand::Traffic { mac } => {
            let mac = util::parse_mac(&mac)?;
            router::ensure_connected(gateway, global).await?;
            let traffic = gateway.get_traffic_data(&mac).await?;
            let out = output::render_single(&global.output, &traffic, traffic_detail, |t| {
                format!("{} {}", t.bytes_sent, t.bytes_received)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Schedule(args) => schedule::handle(gateway, args, global).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use homegate_core::MacAddress;

    #[test]
    fn traffic_detail_formats_byte_counts() {
        let traffic = TrafficData {
            mac: MacAddress::new("a4:83:e7:5c:10:9d"),
            bytes_sent: 2_000,
            bytes_received: 512,
            sampled_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };
        let text = traffic_detail(&traffic);
        assert!(text.contains(&format!("Sent:      {}", ByteSize(2_000))), "{text}");
        assert!(text.contains("Received:  512 B"), "{text}");
        assert!(text.contains("1970-01-01 00:00:00 UTC"), "{text}");
    }
}
