//! # Fan-out Logger
//!
//! Drains the event bus and records every committed change. Deployments
//! that push to connected clients subscribe the same way; this task keeps a
//! worker's log complete even when no gateway is attached.

use shared_bus::{EventFilter, EventStream, InMemoryEventBus, PlatformEvent};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tracing::{debug, info};

/// Spawns the logger. The task ends when `shutdown` flips or the bus is
/// dropped, returning how many events it saw.
pub fn spawn_fanout_logger(
    bus: &InMemoryEventBus,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    let mut stream = bus.event_stream(EventFilter::all());
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(event) => {
                        log_event(&event);
                        seen += 1;
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        drain(&mut stream, &mut seen).await;
                        break;
                    }
                }
            }
        }
        info!(events = seen, "[fanout] Logger stopped");
        seen
    })
}

/// Logs whatever is already buffered so nothing committed before shutdown
/// goes unrecorded.
async fn drain(stream: &mut EventStream, seen: &mut u64) {
    while let Ok(Some(event)) = timeout(Duration::ZERO, stream.next()).await {
        log_event(&event);
        *seen += 1;
    }
}

fn log_event(event: &PlatformEvent) {
    match event {
        PlatformEvent::CardPosted(card) => {
            info!(card_id = %card.id, created_by = %card.created_by, "[fanout] Card posted");
        }
        PlatformEvent::CardDeleted { card_id } => {
            info!(card_id = %card_id, "[fanout] Card deleted");
        }
        PlatformEvent::MutationCommitted(record) => {
            debug!(
                card_id = %record.card_id,
                index = record.index,
                kind = record.mutation.kind(),
                by = %record.by,
                "[fanout] Mutation committed"
            );
        }
        PlatformEvent::TransactionCommitted {
            transaction_id,
            originator,
            amount,
            reason,
            ..
        } => {
            info!(
                transaction_id = %transaction_id,
                originator = %originator,
                %amount,
                reason = %reason,
                "[fanout] Transaction committed"
            );
        }
    }
}
