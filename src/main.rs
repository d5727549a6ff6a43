use std::process::ExitCode;

use clap::Parser;

use paycheck::cli::{run, Cli};
use paycheck::config::init_config;
use paycheck::errors::GatewayResult;
use paycheck::gateway::LicensingGateway;
use paycheck::logging::init_logging;

#[tokio::main]
async fn main() -> GatewayResult<ExitCode> {
    let cli = Cli::parse();

    init_logging(&init_config()?.logging);

    let gateway = LicensingGateway::from_config()?;
    let output = run(&gateway, &cli.command).await?;
    println!("{}", output.text);

    Ok(output.exit_code())
}
