use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

pub const HTTPS_PORT: u16 = 443;

pub const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "ftp", "webmail", "smtp", "portal", "vpn", "api", "dev", "test",
    "staging", "beta", "alpha", "dev-api", "sandbox", "preprod", "prod", "uat", "qa", "demo",
    "auth", "login", "register", "signup", "accounts", "user", "profile", "admin", "adminpanel",
    "help", "support", "docs", "documentation", "contact", "knowledgebase", "kb", "faq",
    "blog", "news", "media", "static", "images", "img", "cdn", "video", "assets", "resources",
    "shop", "store", "cart", "checkout", "order", "payments", "billing", "invoice", "pay",
    "analytics", "track", "tracking", "stats", "metrics", "data", "insights", "reports",
    "status", "monitor", "dashboard", "gateway", "node", "proxy", "edge", "backup",
    "community", "forum", "discuss", "discussion", "social", "events", "meetup", "groups",
    "internal", "devtools", "tools", "config", "settings", "configurations",
    "developers", "developer", "api-docs", "api-portal", "graphql", "rest",
    "marketing", "promo", "offers", "campaign", "landing", "sales",
    "client", "userportal", "account", "my", "myaccount", "customer", "members",
    "app", "test1", "test2", "api-staging", "console", "manage", "sso", "single-sign-on",
    "service", "sync",
];

/// Something that can tell whether `host` completes a TLS handshake.
#[async_trait]
pub trait TlsProbe: Send + Sync {
    async fn handshake(&self, host: &str) -> bool;
}

/// Accepts whatever certificate chain the server presents. Handshake
/// signatures are still checked so only a real TLS endpoint counts.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

pub struct RustlsProbe {
    connector: TlsConnector,
    port: u16,
    timeout: Option<Duration>,
}

impl RustlsProbe {
    /// `timeout` bounds TCP connect plus handshake; `None` leaves both to the
    /// operating system.
    pub fn build(timeout: Option<Duration>) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(RustlsProbe {
            connector: TlsConnector::from(Arc::new(config)),
            port: HTTPS_PORT,
            timeout,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn connect(&self, host: &str) -> Result<()> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| Error::Tls(format!("invalid server name '{host}': {e}")))?;
        let tcp_stream = TcpStream::connect((host, self.port)).await?;
        self.connector.connect(server_name, tcp_stream).await?;
        Ok(())
    }
}

#[async_trait]
impl TlsProbe for RustlsProbe {
    async fn handshake(&self, host: &str) -> bool {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.connect(host))
                .await
                .unwrap_or(Err(Error::Timeout("performing TLS handshake"))),
            None => self.connect(host).await,
        };

        if let Err(e) = &result {
            debug!(host, error = %e, "no TLS handshake");
        }
        result.is_ok()
    }
}

/// Tries `label.domain` for every label and returns the hosts that completed
/// a handshake, in `labels` order. Up to `concurrency` handshakes run at once.
pub async fn sweep(
    probe: &dyn TlsProbe,
    domain: &str,
    labels: &[&str],
    concurrency: usize,
) -> Vec<String> {
    let hosts: Vec<String> = labels.iter().map(|label| format!("{label}.{domain}")).collect();

    stream::iter(hosts)
        .map(|host| async move {
            if probe.handshake(&host).await {
                info!(domain, host = %host, "SNI detected");
                Some(host)
            } else {
                None
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(|host| async move { host })
        .collect::<Vec<String>>()
        .await
}
