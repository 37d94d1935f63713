//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use homegate_core::{Credentials, MacAddress};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Ask for whatever credentials the profile could not supply.
pub fn prompt_credentials(username: Option<&str>, profile: &str) -> Result<Credentials, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            profile: profile.into(),
        });
    }

    let username = match username {
        Some(name) => name.to_owned(),
        None => Input::new()
            .with_prompt("Username")
            .default("admin".to_owned())
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = Password::new()
        .with_prompt(format!("Password for {username}"))
        .interact()
        .map_err(prompt_err)?;

    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    Ok(Credentials {
        username,
        password: SecretString::from(password),
    })
}

/// Validate a MAC address argument: six hex octets, any common separator.
pub fn parse_mac(raw: &str) -> Result<MacAddress, CliError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CliError::Validation {
            field: "mac".into(),
            reason: format!("'{raw}' is not a MAC address (expected aa:bb:cc:dd:ee:ff)"),
        });
    }
    Ok(MacAddress::new(digits))
}

/// A spinner on stderr while a slow call runs. Hidden when quiet or when
/// stderr is not a terminal.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
