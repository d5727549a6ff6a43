//! Command line surface of the `paycheck` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::errors::GatewayResult;
use crate::gateway::{ConnectionStatus, LicensingGateway};

/// Check whether a company's subscription is paid up.
///
/// Connection settings come from `config.toml` and `PAYCHECK_*` environment
/// variables.
#[derive(Debug, Parser)]
#[command(name = "paycheck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Look up a company's activation status. Exits 0 when activated.
    Status {
        /// Company name, matched case-insensitively
        company: String,
        /// Print the full lookup report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe the database connection.
    Probe,
}

/// What a command printed and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub text: String,
}

impl CommandOutput {
    pub fn exit_code(&self) -> ExitCode {
        if self.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Run `command` against `gateway`.
pub async fn run(gateway: &LicensingGateway, command: &Command) -> GatewayResult<CommandOutput> {
    match command {
        Command::Status { company, json } => {
            let report = gateway.activation_report(company).await;

            let text = if *json {
                serde_json::to_string_pretty(&report)?
            } else {
                format!("{}: {}", report.company, report.activated)
            };

            Ok(CommandOutput {
                success: report.activated,
                text,
            })
        }
        Command::Probe => {
            let status = gateway.check_connection().await;

            Ok(CommandOutput {
                success: status == ConnectionStatus::Valid,
                text: format!("{status:?}"),
            })
        }
    }
}
