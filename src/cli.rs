use crate::config::{EnumConfig, ProbeConfig, DEFAULT_DELAY_MS};
use crate::dns::SystemResolver;
use crate::enumeration::{enumerate_all, Enumerator, FanoutReport};
use crate::output::OutputSink;
use crate::scanner::sni::RustlsProbe;
use crate::target::{load_domains_file, Domain};
use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short = 'd', long = "domain", help = "Single domain to enumerate subdomains")]
    pub domain: Option<String>,

    #[arg(short = 'f', long = "file", help = "File containing list of domains, one per line")]
    pub file: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = DEFAULT_DELAY_MS,
        help = "AXFR read timeout per attempt in milliseconds"
    )]
    pub delay: u64,

    #[arg(short = 'o', long = "output", help = "Output file to save discovered subdomains")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Domains enumerated at the same time"
    )]
    pub concurrency: u16,

    #[arg(
        long,
        default_value_t = 8,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "AXFR probes in flight per domain"
    )]
    pub ns_concurrency: u16,

    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "SNI handshakes in flight per domain"
    )]
    pub sni_concurrency: u16,

    #[arg(long, help = "Give up on an SNI handshake after this many milliseconds")]
    pub tls_timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output", required = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }

    pub fn enum_config(&self) -> EnumConfig {
        EnumConfig {
            probe: ProbeConfig::from_delay_ms(self.delay),
            domain_concurrency: usize::from(self.concurrency),
            ns_concurrency: usize::from(self.ns_concurrency),
            sni_concurrency: usize::from(self.sni_concurrency),
            tls_timeout: self.tls_timeout.map(Duration::from_millis),
        }
    }

    /// Raw targets: the domain file when given, otherwise `-d`.
    pub async fn targets(&self) -> anyhow::Result<Vec<String>> {
        if let Some(file) = &self.file {
            return load_domains_file(file)
                .await
                .with_context(|| format!("Failed to open domain file {}", file.display()));
        }

        Ok(self
            .domain
            .iter()
            .map(|domain| domain.trim())
            .filter(|domain| !domain.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn run(&self, domains: Vec<Domain>) -> anyhow::Result<FanoutReport> {
        let output = match &self.output {
            Some(path) => Some(
                File::create(path)
                    .await
                    .with_context(|| format!("Failed to create output file {}", path.display()))?,
            ),
            None => None,
        };

        let config = self.enum_config();
        let resolver = SystemResolver::build().context("Failed to create resolver")?;
        let tls = RustlsProbe::build(config.tls_timeout).context("Failed to set up TLS client")?;

        let (sink, writer) = OutputSink::stdout(output);
        let enumerator = Arc::new(Enumerator::new(
            Arc::new(resolver),
            Arc::new(tls),
            config,
            sink,
        ));

        let report = enumerate_all(enumerator, domains, config.domain_concurrency).await;
        writer
            .await
            .context("Output writer panicked")?
            .context("Failed to write results")?;

        Ok(report)
    }
}
