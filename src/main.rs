use clap::Parser;
use tracing::error;

use nestegg::api::{Cli, Command, DriverError};

#[tokio::main]
async fn main() {
    nestegg::api::init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Project(args) => {
            nestegg::api::run_project_command(&args).map(|out| println!("{out}"))
        }
        Command::Paycheck(args) => {
            nestegg::api::run_paycheck_command(&args).map(|out| println!("{out}"))
        }
        Command::Serve { port } => nestegg::api::run_http_server(port)
            .await
            .map_err(DriverError::from),
    };

    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}
