//! DNS message codec for zone transfer requests.
//!
//! Builds the AXFR question in wire format and pulls A/CNAME owner names out
//! of whatever the server streams back. DNS over TCP prefixes every message
//! with its length as a big-endian `u16`; the framing helpers live here too.
//! Incoming frames are reassembled by a buffered `FramedRead`, so a read cut
//! short by a timeout keeps its partial bytes for the next attempt.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use trust_dns_proto::op::{Message, MessageType, OpCode, Query};
use trust_dns_proto::rr::{DNSClass, Name, RData, RecordType};
use trust_dns_proto::serialize::binary::{BinEncodable, BinEncoder};

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]([A-Za-z0-9_-]*[A-Za-z0-9_])?$").unwrap());

/// An answer record the scanner cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Owner name without the trailing root dot.
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    /// Alias target for CNAME answers.
    pub target: Option<String>,
}

/// Builds an AXFR query for `domain` with a random message id.
pub fn build_axfr_query(domain: &str) -> Result<Vec<u8>> {
    build_axfr_query_with_id(domain, fastrand::u16(..))
}

pub fn build_axfr_query_with_id(domain: &str, id: u16) -> Result<Vec<u8>> {
    let name = zone_name(domain)?;

    let mut query = Query::query(name, RecordType::AXFR);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query);

    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| Error::Encode(format!("failed to serialize query for '{domain}': {e}")))?;

    Ok(buf)
}

/// Decodes one DNS message and keeps only its A and CNAME answers.
pub fn parse_response(bytes: &[u8]) -> Result<Vec<Answer>> {
    let message = Message::from_vec(bytes).map_err(Error::Decode)?;

    let answers = message
        .answers()
        .iter()
        .filter(|record| matches!(record.record_type(), RecordType::A | RecordType::CNAME))
        .map(|record| Answer {
            name: strip_root(&record.name().to_string()),
            record_type: record.record_type(),
            ttl: record.ttl(),
            target: match record.data() {
                Some(RData::CNAME(target)) => Some(strip_root(&target.to_string())),
                _ => None,
            },
        })
        .collect();

    Ok(answers)
}

pub fn strip_root(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}

fn zone_name(domain: &str) -> Result<Name> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() || domain.len() > MAX_NAME_LEN {
        return Err(Error::Encode(format!("'{domain}' is not a valid zone name length")));
    }

    let invalid = |label: &&str| label.len() > MAX_LABEL_LEN || !LABEL_RE.is_match(label);
    if let Some(label) = domain.split('.').find(invalid) {
        return Err(Error::Encode(format!("invalid label '{label}' in '{domain}'")));
    }

    Name::from_ascii(format!("{domain}."))
        .map_err(|e| Error::Encode(format!("invalid domain '{domain}': {e}")))
}

pub async fn write_framed<S>(stream: &mut S, message_bytes: &[u8]) -> std::io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "DNS message exceeds 65535 bytes")
    })?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message_bytes).await?;
    stream.flush().await
}

/// Length-prefixed DNS messages read off `stream`. The returned frames are
/// message bodies without the prefix.
pub fn tcp_frames<S: AsyncRead>(stream: S) -> FramedRead<S, LengthDelimitedCodec> {
    let codec = LengthDelimitedCodec::builder()
        .length_field_length(2)
        .new_codec();
    FramedRead::new(stream, codec)
}
