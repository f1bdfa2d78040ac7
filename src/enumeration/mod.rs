pub mod fanout;
pub mod orchestrator;

pub use fanout::{enumerate_all, FanoutReport};
pub use orchestrator::{EnumSummary, Enumerator};
