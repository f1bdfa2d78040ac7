use thiserror::Error;
use trust_dns_proto::error::ProtoError;
use trust_dns_resolver::error::ResolveError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot encode DNS query: {0}")]
    Encode(String),

    #[error("cannot decode DNS message: {0}")]
    Decode(#[source] ProtoError),

    #[error("lookup failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error("TLS error: {0}")]
    Tls(String),
}
