use std::time::Duration;

use alloy_provider::{Provider, ProviderBuilder, WsConnect};
use futures::StreamExt;
use pbs_errors::PbsError;
use tokio::sync::{mpsc, watch};

const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(20);
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// `INIT -> CONNECTING -> SUBSCRIBED` while heads keep arriving normally;
/// a heartbeat miss or socket close drops to `DISCONNECTED`, which backs
/// off exponentially (1s, doubling, capped at 60s) before returning to
/// `CONNECTING`. `SHUTDOWN` is reachable from every other state the
/// moment the shutdown signal fires (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Connecting,
    Subscribed,
    Disconnected,
    Shutdown,
}

/// Subscribes to `newHeads` over the execution node's WebSocket endpoint
/// and forwards each new block number into `heads`. `heads` is a bounded
/// channel; a full channel makes `send` wait, which is how backpressure
/// reaches this reader without a separate watermark check — once the
/// channel is full the reader simply stops consuming new heads until a
/// stage drains one, exactly the behavior §4.9 calls for.
pub async fn run_head_reader(ws_url: String, heads: mpsc::Sender<u64>, mut shutdown: watch::Receiver<bool>) {
    let mut state = ReaderState::Connecting;
    let mut backoff = BACKOFF_BASE;

    loop {
        if *shutdown.borrow() {
            break;
        }

        state = match connect_and_subscribe(&ws_url).await {
            Ok(mut stream) => {
                backoff = BACKOFF_BASE;
                tracing::info!("head reader subscribed");
                let mut next_state = ReaderState::Subscribed;

                while next_state == ReaderState::Subscribed {
                    tokio::select! {
                        biased;
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                next_state = ReaderState::Shutdown;
                            }
                        }
                        polled = tokio::time::timeout(HEARTBEAT_TIMEOUT, stream.next()) => {
                            match polled {
                                Ok(Some(number)) => {
                                    if heads.send(number).await.is_err() {
                                        next_state = ReaderState::Shutdown;
                                    }
                                }
                                Ok(None) => {
                                    tracing::warn!("head subscription stream closed");
                                    next_state = ReaderState::Disconnected;
                                }
                                Err(_) => {
                                    tracing::warn!(timeout = ?HEARTBEAT_TIMEOUT, "missed heartbeat, treating connection as dead");
                                    next_state = ReaderState::Disconnected;
                                }
                            }
                        }
                    }
                }
                next_state
            }
            Err(e) => {
                tracing::warn!(error = %e, "head reader connect failed");
                ReaderState::Disconnected
            }
        };

        if state == ReaderState::Shutdown {
            break;
        }

        tracing::warn!(backoff = ?backoff, "reconnecting after backoff");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
        backoff = (backoff * 2).min(BACKOFF_CAP);
    }

    tracing::info!("head reader stopped");
}

async fn connect_and_subscribe(ws_url: &str) -> Result<impl futures::Stream<Item = u64>, PbsError> {
    let provider = ProviderBuilder::new()
        .on_ws(WsConnect::new(ws_url))
        .await
        .map_err(|e| PbsError::Transport(format!("ws connect failed: {e}")))?;
    let subscription =
        provider.subscribe_blocks().await.map_err(|e| PbsError::Transport(format!("subscribe_blocks failed: {e}")))?;
    Ok(subscription.into_stream().map(|header| header.number))
}
