mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use homegate_core::Gateway;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never touch the gateway
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "homegate", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let resolved = config::build_router_config(&cli.global)?;
            let mut router_config = resolved.config;

            if matches!(cmd, Command::Login)
                && router_config.credentials.is_none()
                && !router_config.mock
            {
                let credentials =
                    commands::util::prompt_credentials(resolved.username.as_deref(), &resolved.profile)?;
                router_config = config::with_credentials(router_config, credentials);
            }

            let ctx = config::build_context(router_config);
            let gateway = Gateway::new(Arc::new(ctx))?;

            tracing::debug!(command = ?cmd, backend = %gateway.kind(), "dispatching command");
            commands::dispatch(cmd, &gateway, &resolved.profile, &cli.global).await
        }
    }
}
