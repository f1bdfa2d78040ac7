use super::message::strip_root;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;
use trust_dns_proto::rr::{RData, RecordType};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::system_conf::read_system_conf;
use trust_dns_resolver::TokioAsyncResolver;

/// Name-server and alias lookups the enumeration needs from DNS.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Host names of the servers authoritative for `domain`.
    async fn name_servers(&self, domain: &str) -> Result<Vec<String>>;

    /// The CNAME target of `host`, or `None` when it has no alias.
    async fn cname(&self, host: &str) -> Result<Option<String>>;
}

pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    /// Uses the host's resolver configuration, falling back to the
    /// resolver defaults when it cannot be read.
    pub fn build() -> Result<Self> {
        let (resolver_config, mut resolver_opts) = read_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read system resolver config, using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        });
        resolver_opts.timeout = Duration::from_secs(5);
        let resolver = TokioAsyncResolver::tokio(resolver_config, resolver_opts)?;

        Ok(SystemResolver { resolver })
    }
}

#[async_trait]
impl DnsLookup for SystemResolver {
    async fn name_servers(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = self.resolver.ns_lookup(domain).await?;
        Ok(lookup.iter().map(|ns| strip_root(&ns.to_string())).collect())
    }

    async fn cname(&self, host: &str) -> Result<Option<String>> {
        match self.resolver.lookup(host, RecordType::CNAME).await {
            Ok(lookup) => Ok(lookup.iter().find_map(|rdata| match rdata {
                RData::CNAME(target) => Some(strip_root(&target.to_string())),
                _ => None,
            })),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(None),
                _ => Err(e.into()),
            },
        }
    }
}
