//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};

use homegate_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

/// A copy of the config that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let profiles = cfg
        .profiles
        .iter()
        .map(|(name, profile)| {
            let mut profile = profile.clone();
            if profile.password.is_some() {
                profile.password = Some("********".into());
            }
            (name.clone(), profile)
        })
        .collect();
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: homegate_config::Defaults {
            output: cfg.defaults.output.clone(),
            timeout: cfg.defaults.timeout,
        },
        profiles,
    }
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort_unstable();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = redacted(&homegate_config::load_config()?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unprintable: {e}>")),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", homegate_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = homegate_config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                output::warn_line("no profiles configured. Run: homegate config init", global.quiet);
                return Ok(());
            }
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = homegate_config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }

            let password = Password::new()
                .with_prompt(format!("Password for profile '{name}'"))
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            homegate_config::store_password(&name, &password)?;
            output::status_line(
                &format!("Password for '{name}' stored in the system keyring"),
                global.quiet,
            );
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = homegate_config::config_path();
    eprintln!("homegate configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = homegate_config::load_config_or_default();

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Gateway address
    let address: String = Input::new()
        .with_prompt("Gateway address")
        .default(homegate_core::config::DEFAULT_ADDRESS.into())
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("not a URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Credentials
    let username: String = Input::new()
        .with_prompt("Admin username")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;
    let password = Password::new()
        .with_prompt("Admin password")
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_err)?;

    let password_field = if password.is_empty() {
        None
    } else {
        let choices = &[
            "Store in system keyring (recommended)",
            "Save to config file (plaintext)",
        ];
        let selection = Select::new()
            .with_prompt("Where to store the password?")
            .items(choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        if selection == 0 {
            homegate_config::store_password(&profile_name, &password)?;
            eprintln!("   ✓ Password stored in system keyring");
            None
        } else {
            Some(password)
        }
    };

    // 4. Mock mode
    let mock = Confirm::new()
        .with_prompt("Serve sample data instead of contacting the gateway?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;

    let profile = Profile {
        address,
        username: Some(username),
        password: password_field,
        mock,
        ..Profile::default()
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(profile_name.clone());
    }

    homegate_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Test it: homegate --profile {profile_name} check");
    Ok(())
}
