//! Subdomain discovery through zone transfers, CNAME chains and SNI probing.
//!
//! Use only against domains you are authorised to test.

pub mod cli;
pub mod config;
pub mod dns;
pub mod enumeration;
pub mod error;
pub mod output;
pub mod scanner;
pub mod target;

pub use error::{Error, Result};
