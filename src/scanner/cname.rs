use crate::dns::DnsLookup;
use std::collections::HashSet;
use tracing::{debug, info, warn};

fn canonical(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Follows the alias chain starting at `domain` and returns every distinct
/// target in the order it was reached.
///
/// The walk ends when a target points back at `domain`, repeats a target
/// already seen, or has no further alias.
pub async fn walk_cname_chain(resolver: &dyn DnsLookup, domain: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let origin = canonical(domain);
    let mut visited = HashSet::new();

    let mut next = match resolver.cname(domain).await {
        Ok(next) => next,
        Err(e) => {
            warn!(domain, error = %e, "CNAME lookup failed");
            return chain;
        }
    };

    while let Some(target) = next {
        let key = canonical(&target);
        if key == origin || !visited.insert(key) {
            debug!(domain, target = %target, "CNAME chain loops back");
            break;
        }

        info!(domain, target = %target, "CNAME");
        chain.push(target.clone());

        next = match resolver.cname(&target).await {
            Ok(next) => next,
            Err(e) => {
                debug!(domain, host = %target, error = %e, "CNAME chain ends");
                None
            }
        };
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Aliases(HashMap<&'static str, &'static str>);

    impl Aliases {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Aliases(pairs.iter().copied().collect())
        }
    }

    #[async_trait]
    impl DnsLookup for Aliases {
        async fn name_servers(&self, _domain: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn cname(&self, host: &str) -> Result<Option<String>> {
            match self.0.get(host) {
                Some(&"FAIL") => Err(Error::Timeout("resolving CNAME")),
                Some(target) => Ok(Some(target.to_string())),
                None => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_cycle_back_to_start() {
        let resolver = Aliases::new(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(walk_cname_chain(&resolver, "a").await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_self_referencing_hop() {
        let resolver = Aliases::new(&[("a", "b"), ("b", "b")]);
        assert_eq!(walk_cname_chain(&resolver, "a").await, vec!["b"]);
    }

    #[tokio::test]
    async fn test_chain_ends_without_alias() {
        let resolver = Aliases::new(&[
            ("shop.example.com", "shops.myshopify.com"),
            ("shops.myshopify.com", "edge.cdn.net."),
        ]);
        assert_eq!(
            walk_cname_chain(&resolver, "shop.example.com").await,
            vec!["shops.myshopify.com", "edge.cdn.net."]
        );
    }

    #[tokio::test]
    async fn test_first_hop_failure_is_empty() {
        let resolver = Aliases::new(&[("a", "FAIL")]);
        assert!(walk_cname_chain(&resolver, "a").await.is_empty());
    }

    #[tokio::test]
    async fn test_mid_chain_failure_keeps_prefix() {
        let resolver = Aliases::new(&[("a", "b"), ("b", "c"), ("c", "FAIL")]);
        assert_eq!(walk_cname_chain(&resolver, "a").await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_no_alias() {
        let resolver = Aliases::new(&[]);
        assert!(walk_cname_chain(&resolver, "example.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_comparison_ignores_case_and_root_dot() {
        let resolver = Aliases::new(&[("a.example", "B.example."), ("B.example.", "A.EXAMPLE.")]);
        assert_eq!(walk_cname_chain(&resolver, "a.example").await, vec!["B.example."]);
    }
}
