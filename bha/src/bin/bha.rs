use anyhow::Result;
use bha::cli::{self, Cli};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing from the CLI verbosity flags.
fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = if let Some(ref custom) = cli.trace_filter {
        EnvFilter::try_new(custom)?
    } else if cli.trace {
        EnvFilter::new("debug,bha=trace")
    } else if cli.debug {
        EnvFilter::new("warn,bha=debug")
    } else if cli.verbose {
        EnvFilter::new("warn,bha=info")
    } else {
        // Production default: only errors and warnings.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(cli.debug || cli.trace)
                .with_file(cli.trace)
                .with_line_number(cli.trace)
                .compact(),
        )
        .init();

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(&cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    debug!("bha v{}", env!("CARGO_PKG_VERSION"));

    match cli::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
