use super::orchestrator::Enumerator;
use crate::target::Domain;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    pub enumerated: usize,
    pub failed: usize,
    pub discovered: usize,
}

/// Enumerates every domain on its own task, at most `concurrency` at once,
/// and returns when all of them, including their AXFR probes, are done.
/// A failing domain never stops the others.
pub async fn enumerate_all(
    enumerator: Arc<Enumerator>,
    domains: Vec<Domain>,
    concurrency: usize,
) -> FanoutReport {
    let limit = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for domain in domains {
        let Ok(permit) = limit.clone().acquire_owned().await else {
            break;
        };
        let enumerator = enumerator.clone();
        tasks.spawn(async move {
            let _permit = permit;
            enumerator.enumerate(&domain).await
        });
    }

    let mut report = FanoutReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(summary)) => {
                report.enumerated += 1;
                report.discovered += summary.total();
            }
            Ok(Err(_)) => report.failed += 1,
            Err(e) => {
                error!(error = %e, "domain task failed");
                report.failed += 1;
            }
        }
    }

    info!(
        enumerated = report.enumerated,
        failed = report.failed,
        discovered = report.discovered,
        "all domains finished"
    );
    report
}
