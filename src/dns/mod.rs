pub mod message;
pub mod resolver;

pub use message::{build_axfr_query, parse_response, Answer};
pub use resolver::{DnsLookup, SystemResolver};
