//! Gateway-level command handlers: check, status, restart, login, logout, advice.

use homegate_core::{ConnectionAdvice, Gateway, RouterService, RouterStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn status_detail(s: &RouterStatus) -> String {
    [
        format!("Status:    {}", s.status),
        format!("Model:     {}", s.model),
        format!("Firmware:  {}", s.firmware),
        format!("Uptime:    {}", s.uptime),
        format!("SSID:      {}", s.ssid),
        format!("Devices:   {}", s.connected_devices),
    ]
    .join("\n")
}

fn advice_detail(a: &ConnectionAdvice) -> String {
    let mut lines = vec![
        format!(
            "Live connection: {}",
            if a.can_connect { "possible" } else { "not possible" }
        ),
        format!("Reason:          {}", a.reason),
    ];
    if !a.suggestions.is_empty() {
        lines.push("Suggestions:".into());
        lines.extend(a.suggestions.iter().map(|s| format!("  - {s}")));
    }
    lines.join("\n")
}

/// Make sure something can answer before a data command runs.
///
/// A live gateway that cannot be reached flips to sample data; that is
/// reported as a warning. Any other connection failure is an error.
pub async fn ensure_connected(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner("Contacting gateway...", global.quiet);
    let connected = gateway.check_connection().await;
    spinner.finish_and_clear();

    if gateway.is_fallback() {
        let reason = gateway.connection_advice().reason;
        output::warn_line(&format!("{reason}; showing sample data"), global.quiet);
        return Ok(());
    }
    if connected {
        Ok(())
    } else {
        Err(CliError::ConnectionFailed {
            reason: gateway.connection_advice().reason,
        })
    }
}

/// Like [`ensure_connected`], but sample data is not good enough: the
/// command must reach a real gateway unless mock mode was asked for.
pub async fn require_live(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    ensure_connected(gateway, global).await?;
    if gateway.is_fallback() {
        return Err(CliError::ConnectionFailed {
            reason: gateway.connection_advice().reason,
        });
    }
    Ok(())
}

pub async fn check(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner("Looking for the gateway...", global.quiet);
    let connected = gateway.check_connection().await;
    spinner.finish_and_clear();

    let advice = gateway.connection_advice();
    if gateway.is_fallback() || !connected {
        return Err(CliError::ConnectionFailed {
            reason: advice.reason,
        });
    }

    let message = match gateway.backend().as_live() {
        Some(live) => format!("Gateway reachable at {}", live.address()),
        None => advice.reason,
    };
    output::status_line(&message, global.quiet);
    Ok(())
}

pub async fn status(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    ensure_connected(gateway, global).await?;
    let info = gateway.get_router_info().await;
    if info.is_unknown() {
        output::warn_line("the gateway did not report its status", global.quiet);
    }
    let out = output::render_single(&global.output, &info, status_detail, |s| s.model.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn restart(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    if !util::confirm(
        "Restart the gateway? The network will be down for a while.",
        "restart",
        global.yes,
    )? {
        return Ok(());
    }

    require_live(gateway, global).await?;

    let spinner = util::spinner("Restarting gateway...", global.quiet);
    let outcome = gateway.restart_router().await;
    spinner.finish_and_clear();

    if !outcome.success {
        return Err(CliError::OperationFailed {
            message: outcome.message,
        });
    }
    let message = match outcome.estimated_downtime_secs {
        Some(secs) => format!("{} (back in about {secs}s)", outcome.message),
        None => outcome.message,
    };
    output::status_line(&message, global.quiet);
    Ok(())
}

pub async fn login(gateway: &Gateway, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    require_live(gateway, global).await?;
    if gateway.context().config.credentials.is_none() && !gateway.context().config.mock {
        return Err(CliError::NoCredentials {
            profile: profile.into(),
        });
    }
    if gateway.authenticate(true).await {
        output::status_line("Logged in", global.quiet);
        return Ok(());
    }
    Err(CliError::AuthFailed {
        profile: profile.into(),
        message: "the gateway did not accept the credentials".into(),
    })
}

pub async fn logout(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    gateway.logout().await?;
    output::status_line("Logged out", global.quiet);
    Ok(())
}

pub async fn advice(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner("Checking connectivity...", global.quiet);
    gateway.check_connection().await;
    spinner.finish_and_clear();

    let advice = gateway.connection_advice();
    let out = output::render_single(&global.output, &advice, advice_detail, |a| a.reason.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
