use anyhow::Result;
use clap::Parser;
use daily_checkin::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    // Logging is not initialized yet when the config fails to load.
    if let Err(err) = cli::dispatch(args) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
