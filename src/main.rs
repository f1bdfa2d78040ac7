use sub_sniax::cli::Cli;
use sub_sniax::target::Domain;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let targets = match cli.targets().await {
        Ok(targets) => targets,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if targets.is_empty() {
        eprintln!("{}", Cli::usage());
        std::process::exit(1);
    }

    let domains: Vec<Domain> = targets.iter().map(String::as_str).map(Domain::normalize).collect();

    if let Err(e) = cli.run(domains).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
