//! Workload commands.

pub mod broadcast;
pub mod counter;

use std::time::Duration;

use anyhow::Result;
use gossamer_node::{Node, Shutdown, serve};
use tokio::io::BufReader;
use tracing::{error, info, warn};

/// Serves `node` over stdin/stdout until end of input, Ctrl-C, or a fatal
/// error.
pub(crate) async fn serve_stdio<S>(mut node: Node<S>, tick: Option<Duration>) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    match serve(&mut node, input, output, tick, interrupted()).await {
        Ok(reason) => {
            let stats = node.stats();
            match reason {
                Shutdown::EndOfInput => info!(?stats, "input closed, node stopped"),
                Shutdown::Interrupted => info!(?stats, "interrupted, node stopped"),
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, stats = ?node.stats(), "fatal error, node stopped");
            Err(e.into())
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot watch for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
