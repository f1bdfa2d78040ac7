use crate::config::ProbeConfig;
use crate::dns::message::{build_axfr_query, parse_response, tcp_frames, write_framed};
use crate::error::{Error, Result};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Zone transfer attempt against one name server.
///
/// The probe sends a single AXFR query and then reads for a fixed number of
/// attempts. It never looks for the closing SOA record, so a long zone may be
/// cut short and a server that keeps talking only gets `max_attempts` reads.
#[derive(Debug, Clone, Copy)]
pub struct AxfrProber {
    config: ProbeConfig,
}

impl AxfrProber {
    pub fn new(config: ProbeConfig) -> Self {
        AxfrProber { config }
    }

    /// Owner names of every A and CNAME record received, trailing dot
    /// removed, in stream order. Failures are logged and end the probe with
    /// whatever was collected up to that point.
    pub async fn probe(&self, domain: &str, nameserver: &str) -> Vec<String> {
        let mut subdomains = Vec::new();
        if let Err(e) = self.transfer(domain, nameserver, &mut subdomains).await {
            warn!(
                domain,
                nameserver,
                error = %e,
                collected = subdomains.len(),
                "AXFR probe aborted"
            );
        }

        subdomains
    }

    async fn transfer(
        &self,
        domain: &str,
        nameserver: &str,
        subdomains: &mut Vec<String>,
    ) -> Result<()> {
        let query = build_axfr_query(domain)?;
        let mut stream = timeout(
            self.config.read_timeout,
            TcpStream::connect((nameserver, self.config.port)),
        )
        .await
        .map_err(|_| Error::Timeout("connecting to name server"))??;

        write_framed(&mut stream, &query).await?;

        // Partial frames stay buffered when a read times out mid-message.
        let mut frames = tcp_frames(stream);
        for attempt in 1..=self.config.max_attempts {
            let response = match timeout(self.config.read_timeout, frames.next()).await {
                Ok(Some(Ok(response))) => response,
                Ok(Some(Err(e))) => {
                    debug!(domain, nameserver, attempt, error = %e, "AXFR read failed");
                    sleep(self.config.backoff).await;
                    continue;
                }
                Ok(None) => {
                    debug!(domain, nameserver, attempt, "AXFR transfer closed");
                    sleep(self.config.backoff).await;
                    continue;
                }
                Err(_) => {
                    debug!(domain, nameserver, attempt, "AXFR read timed out");
                    sleep(self.config.backoff).await;
                    continue;
                }
            };

            for answer in parse_response(&response)? {
                info!(domain, nameserver, subdomain = %answer.name, "AXFR record");
                subdomains.push(answer.name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::tests::axfr_response;
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use trust_dns_proto::op::Message;
    use trust_dns_proto::rr::{Name, RData, RecordType};

    fn fast_config(port: u16) -> ProbeConfig {
        ProbeConfig {
            read_timeout: Duration::from_millis(100),
            backoff: Duration::from_millis(200),
            max_attempts: 3,
            port,
        }
    }

    fn zone_records() -> Vec<(&'static str, RData)> {
        vec![
            ("x.example.com.", RData::A(Ipv4Addr::new(192, 0, 2, 10))),
            ("y.example.com.", RData::CNAME(Name::from_str("x.example.com.").unwrap())),
        ]
    }

    /// Prefixes `message` with its big-endian length.
    fn framed(message: &[u8]) -> Vec<u8> {
        let mut bytes = (message.len() as u16).to_be_bytes().to_vec();
        bytes.extend_from_slice(message);
        bytes
    }

    /// Accepts one connection, checks the AXFR question and then writes each
    /// chunk after its delay, before idling until the client hangs up.
    async fn fake_name_server_raw(chunks: Vec<(Duration, Vec<u8>)>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut prefix = [0u8; 2];
            socket.read_exact(&mut prefix).await.unwrap();
            let mut query = vec![0u8; u16::from_be_bytes(prefix) as usize];
            socket.read_exact(&mut query).await.unwrap();

            let query = Message::from_vec(&query).unwrap();
            assert_eq!(query.queries()[0].query_type(), RecordType::AXFR);
            assert_eq!(query.queries()[0].name().to_string(), "example.com.");

            for (delay, chunk) in chunks {
                tokio::time::sleep(delay).await;
                socket.write_all(&chunk).await.unwrap();
            }

            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
        });

        port
    }

    /// Answers with each of `frames` in turn, all at once.
    async fn fake_name_server(frames: Vec<Vec<u8>>) -> u16 {
        let chunks = frames
            .iter()
            .map(|frame| (Duration::ZERO, framed(frame)))
            .collect();
        fake_name_server_raw(chunks).await
    }

    #[tokio::test]
    async fn test_first_attempt_answers_then_timeouts() {
        let port = fake_name_server(vec![axfr_response(1, &zone_records())]).await;
        let config = fast_config(port);

        let started = Instant::now();
        let subdomains = AxfrProber::new(config).probe("example.com", "127.0.0.1").await;
        let elapsed = started.elapsed();

        assert_eq!(subdomains, vec!["x.example.com", "y.example.com"]);
        assert!(elapsed >= config.backoff * 2, "elapsed {elapsed:?}");
        assert!(elapsed < config.attempt_budget() + Duration::from_secs(1), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_duplicates_across_attempts_are_kept() {
        let frame = axfr_response(1, &zone_records());
        let port = fake_name_server(vec![frame.clone(), frame.clone(), frame]).await;

        let subdomains = AxfrProber::new(fast_config(port))
            .probe("example.com", "127.0.0.1")
            .await;

        assert_eq!(subdomains.len(), 6);
        assert_eq!(subdomains[0], subdomains[2]);
        assert_eq!(subdomains[1], subdomains[5]);
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_partial_results() {
        let frames = vec![axfr_response(1, &zone_records()), vec![0xde, 0xad, 0xbe]];
        let port = fake_name_server(frames).await;

        let started = Instant::now();
        let subdomains = AxfrProber::new(fast_config(port))
            .probe("example.com", "127.0.0.1")
            .await;

        assert_eq!(subdomains, vec!["x.example.com", "y.example.com"]);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_frame_split_across_a_timeout_is_not_lost() {
        let first = framed(&axfr_response(1, &zone_records()));
        let second = framed(&axfr_response(
            1,
            &[("z.example.com.", RData::A(Ipv4Addr::new(192, 0, 2, 11)))],
        ));
        let (head, tail) = first.split_at(first.len() / 2);
        let mut rest = tail.to_vec();
        rest.extend_from_slice(&second);

        // The first read times out holding half a message; the rest lands
        // during the backoff that follows.
        let config = fast_config(0);
        let port = fake_name_server_raw(vec![
            (Duration::ZERO, head.to_vec()),
            (config.read_timeout + config.backoff / 2, rest),
        ])
        .await;

        let subdomains = AxfrProber::new(ProbeConfig { port, ..config })
            .probe("example.com", "127.0.0.1")
            .await;

        assert_eq!(subdomains, vec!["x.example.com", "y.example.com", "z.example.com"]);
    }

    #[tokio::test]
    async fn test_connect_is_bounded_by_read_timeout() {
        // TEST-NET-1 is never routed: either refused at once or black-holed.
        let config = fast_config(53);

        let started = Instant::now();
        let subdomains = AxfrProber::new(config).probe("example.com", "192.0.2.1").await;
        let elapsed = started.elapsed();

        assert!(subdomains.is_empty());
        assert!(elapsed < config.read_timeout + Duration::from_millis(500), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_unreachable_name_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = fast_config(port);

        let started = Instant::now();
        let subdomains = AxfrProber::new(config).probe("example.com", "127.0.0.1").await;

        assert!(subdomains.is_empty());
        assert!(started.elapsed() <= config.read_timeout + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_invalid_domain_never_connects() {
        let subdomains = AxfrProber::new(fast_config(1))
            .probe("bad domain", "127.0.0.1")
            .await;
        assert!(subdomains.is_empty());
    }
}
