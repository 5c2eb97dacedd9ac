use clap::Parser;
use mealgraph::{
    cli::{self, Cli},
    config::Settings,
    Result,
};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Logs go to stderr so results on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mealgraph=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e.log_safe());
        eprintln!("\x1b[31m\u{2717}\x1b[0m {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    settings.validate()?;

    cli::run(cli, &settings).await
}
