//! I/O shell around the dispatch core.
//!
//! Reads lines, feeds them to the [`Node`], and writes whatever the node
//! returns, one envelope per line with a flush after each. A wall-clock
//! ticker runs the periodic hooks even while no input arrives.

use std::future::Future;
use std::time::Duration;

use gossamer_wire::{Envelope, codec};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::NodeResult;
use crate::node::Node;

/// Why the receive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The input was closed.
    EndOfInput,
    /// The shutdown signal fired.
    Interrupted,
}

/// Runs the receive loop until end of input, the `shutdown` future
/// completes, or a fatal error occurs.
///
/// `tick` sets the period of the hook timer; `None` runs hooks only when a
/// message arrives.
pub async fn serve<S, C, R, W, F>(
    node: &mut Node<S, C>,
    input: R,
    mut output: W,
    tick: Option<Duration>,
    shutdown: F,
) -> NodeResult<Shutdown>
where
    C: Clock,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut ticker = tick.map(|period| {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    tokio::pin!(shutdown);

    info!(?tick, "node loop started");

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("interrupted, shutting down");
                return Ok(Shutdown::Interrupted);
            }

            line = lines.next_line() => match line? {
                Some(line) => {
                    let out = node.handle_line(&line)?;
                    write_all(&mut output, &out).await?;
                }
                None => {
                    info!("end of input, shutting down");
                    return Ok(Shutdown::EndOfInput);
                }
            },

            () = next_tick(&mut ticker) => {
                let out = node.tick()?;
                write_all(&mut output, &out).await?;
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Writes each envelope as one complete line.
async fn write_all<W: AsyncWrite + Unpin>(output: &mut W, envelopes: &[Envelope]) -> NodeResult<()> {
    for envelope in envelopes {
        let line = codec::encode_line(envelope)?;
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
        debug!(kind = %envelope.body.kind, dest = %envelope.dest, "sent");
    }
    Ok(())
}
