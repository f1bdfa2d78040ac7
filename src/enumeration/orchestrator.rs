use crate::config::EnumConfig;
use crate::dns::DnsLookup;
use crate::error::Result;
use crate::output::OutputSink;
use crate::scanner::axfr::AxfrProber;
use crate::scanner::cname::walk_cname_chain;
use crate::scanner::sni::{self, TlsProbe, COMMON_SUBDOMAINS};
use crate::target::Domain;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Number of hostnames each technique reported for one domain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnumSummary {
    pub name_servers: usize,
    pub axfr: usize,
    pub cname: usize,
    pub sni: usize,
}

impl EnumSummary {
    pub fn total(&self) -> usize {
        self.axfr + self.cname + self.sni
    }
}

/// Runs AXFR, CNAME chaining and the SNI sweep for one domain at a time.
pub struct Enumerator {
    resolver: Arc<dyn DnsLookup>,
    tls: Arc<dyn TlsProbe>,
    config: EnumConfig,
    sink: OutputSink,
    wordlist: &'static [&'static str],
}

impl Enumerator {
    pub fn new(
        resolver: Arc<dyn DnsLookup>,
        tls: Arc<dyn TlsProbe>,
        config: EnumConfig,
        sink: OutputSink,
    ) -> Self {
        Enumerator {
            resolver,
            tls,
            config,
            sink,
            wordlist: COMMON_SUBDOMAINS,
        }
    }

    pub fn with_wordlist(mut self, wordlist: &'static [&'static str]) -> Self {
        self.wordlist = wordlist;
        self
    }

    /// Fails only when the name servers of `domain` cannot be resolved, in
    /// which case nothing else is attempted for it.
    pub async fn enumerate(&self, domain: &Domain) -> Result<EnumSummary> {
        info!(domain = %domain, "enumerating subdomains");

        let name_servers = match self.resolver.name_servers(domain.as_str()).await {
            Ok(name_servers) => name_servers,
            Err(e) => {
                warn!(domain = %domain, error = %e, "failed to get NS records");
                return Err(e);
            }
        };

        let mut summary = EnumSummary {
            name_servers: name_servers.len(),
            axfr: self.zone_transfers(domain, name_servers).await,
            ..EnumSummary::default()
        };

        info!(domain = %domain, "attempting CNAME chaining");
        let chained = walk_cname_chain(self.resolver.as_ref(), domain.as_str()).await;
        summary.cname = chained.len();
        self.sink.write(chained).await;

        info!(domain = %domain, "attempting SNI enumeration");
        let detected = sni::sweep(
            self.tls.as_ref(),
            domain.as_str(),
            self.wordlist,
            self.config.sni_concurrency,
        )
        .await;
        summary.sni = detected.len();
        self.sink.write(detected).await;

        info!(
            domain = %domain,
            axfr = summary.axfr,
            cname = summary.cname,
            sni = summary.sni,
            "enumeration finished"
        );
        Ok(summary)
    }

    /// One probe task per name server; each result set goes to the sink as
    /// soon as its probe is done.
    async fn zone_transfers(&self, domain: &Domain, name_servers: Vec<String>) -> usize {
        let prober = AxfrProber::new(self.config.probe);
        let limit = Arc::new(Semaphore::new(self.config.ns_concurrency.max(1)));
        let mut probes = JoinSet::new();

        for nameserver in name_servers {
            let domain = domain.clone();
            let limit = limit.clone();
            probes.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                info!(domain = %domain, nameserver = %nameserver, "attempting AXFR");
                let subdomains = prober.probe(domain.as_str(), &nameserver).await;
                if subdomains.is_empty() {
                    debug!(domain = %domain, nameserver = %nameserver, "AXFR failed or timed out");
                }
                subdomains
            });
        }

        let mut found = 0;
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(subdomains) => {
                    found += subdomains.len();
                    self.sink.write(subdomains).await;
                }
                Err(e) => error!(domain = %domain, error = %e, "AXFR task failed"),
            }
        }

        found
    }
}
