use clap::Parser;
use microstep::cli::{self, Cli};
use microstep::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;
    tracing::debug!("microstep {} ({})", microstep::VERSION, microstep::BUILD_DATE);

    cli::run(cli)
}
