pub mod axfr;
pub mod cname;
pub mod sni;
