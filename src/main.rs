// src/main.rs

use opguard::errors::{describe_failure, OpguardError};
use opguard::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    let debug = args.debug;
    if let Err(err) = run_main(args).await {
        eprintln!("{}", describe_failure(&err, debug));
        std::process::exit(1);
    }
}

async fn run_main(args: cli::CliArgs) -> Result<(), OpguardError> {
    logging::init_logging(args.log_level)?;
    run(args).await
}
