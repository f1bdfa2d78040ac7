use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

const SINK_CAPACITY: usize = 256;

/// Handle through which every concurrent enumeration reports hostnames.
///
/// A single writer task owns stdout and the optional file, so lines from
/// different producers never interleave. Clone freely; the writer finishes
/// once every clone is dropped. A broken console is logged once and the file
/// keeps receiving every line; a file error ends the writer.
#[derive(Clone)]
pub struct OutputSink {
    tx: mpsc::Sender<Vec<String>>,
}

impl OutputSink {
    /// Writer on stdout plus `file` when one was requested.
    pub fn stdout(file: Option<File>) -> (OutputSink, JoinHandle<std::io::Result<u64>>) {
        Self::spawn(tokio::io::stdout(), file)
    }

    pub fn spawn<C, F>(console: C, file: Option<F>) -> (OutputSink, JoinHandle<std::io::Result<u64>>)
    where
        C: AsyncWrite + Unpin + Send + 'static,
        F: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let writer = tokio::spawn(write_lines(ReceiverStream::new(rx), console, file));
        (OutputSink { tx }, writer)
    }

    pub async fn write(&self, subdomains: Vec<String>) {
        if subdomains.is_empty() {
            return;
        }

        if let Err(e) = self.tx.send(subdomains).await {
            warn!(lost = e.0.len(), "output writer has stopped, dropping results");
        }
    }
}

async fn write_lines<C, F>(
    mut batches: ReceiverStream<Vec<String>>,
    mut console: C,
    mut file: Option<F>,
) -> std::io::Result<u64>
where
    C: AsyncWrite + Unpin,
    F: AsyncWrite + Unpin,
{
    let mut written = 0;
    let mut console_open = true;
    while let Some(subdomains) = batches.next().await {
        for subdomain in subdomains {
            let line = format!("{subdomain}\n");
            if console_open {
                if let Err(e) = console.write_all(line.as_bytes()).await {
                    warn!(error = %e, "console output failed, writing to the file only");
                    console_open = false;
                }
            }
            if let Some(file) = file.as_mut() {
                file.write_all(line.as_bytes()).await?;
            }
            written += 1;
        }

        if console_open {
            if let Err(e) = console.flush().await {
                warn!(error = %e, "console output failed, writing to the file only");
                console_open = false;
            }
        }
    }

    if let Some(file) = file.as_mut() {
        file.flush().await?;
    }

    Ok(written)
}
