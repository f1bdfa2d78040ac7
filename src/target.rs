use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A target host with scheme and leading `www.` removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn normalize(raw: &str) -> Self {
        Domain(normalize_domain(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim();
    loop {
        let before = domain;
        domain = domain
            .strip_prefix("https://")
            .or_else(|| domain.strip_prefix("http://"))
            .unwrap_or(domain);
        domain = domain.strip_prefix("www.").unwrap_or(domain);
        if domain == before {
            return domain.to_string();
        }
    }
}

/// Reads one domain per line, skipping blank lines.
pub async fn load_domains_file(filename: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let file_domains = File::open(filename).await?;
    let reader = BufReader::new(file_domains);
    let mut lines = reader.lines();
    let mut domains = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let domain = line.trim();
        if !domain.is_empty() {
            domains.push(domain.to_string());
        }
    }

    Ok(domains)
}
