//! Turning a closed flow's fragments into HTTP events.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::{Shared, WriteGate};
use crate::capture::TcpPacket;
use crate::error::StreamError;
use crate::flow::ConnectionId;
use crate::http::{FlowEvent, HttpSegmenter};
use crate::store::SequenceToken;
use crate::stream::StreamMaterializer;

/// What one reconstruction produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconstructionSummary {
    pub fragments: usize,
    pub events: u64,
    pub bytes: u64,
}

/// Reconstructs `id` and then deletes its fragments, whatever the outcome.
pub(crate) async fn run(shared: Arc<Shared>, id: ConnectionId, fin: TcpPacket, gate: Option<WriteGate>) {
    // Every write admitted before the FIN holds a read guard on the gate.
    if let Some(gate) = gate {
        drop(gate.write_owned().await);
    }

    let first_seen = shared.registry.remove(&id);
    tracing::info!(
        flow = %id,
        open_for = ?first_seen.and_then(|t| t.elapsed().ok()),
        "Connection closed"
    );

    if !fin.payload.is_empty() {
        store_fin_payload(&shared, id, &fin).await;
    }

    let pipeline = tokio::spawn(segment(Arc::clone(&shared), id));
    match pipeline.await {
        Ok(Ok(summary)) => {
            shared.stats.reconstruction_completed();
            tracing::info!(
                flow = %id,
                fragments = summary.fragments,
                events = summary.events,
                bytes = summary.bytes,
                "Reconstruction completed"
            );
        }
        Ok(Err(e)) => {
            shared.stats.reconstruction_failed();
            tracing::error!(flow = %id, error = %e, "Reconstruction failed");
        }
        Err(e) => {
            shared.stats.reconstruction_failed();
            tracing::error!(flow = %id, error = %e, "Reconstruction task aborted");
        }
    }

    if let Err(e) = shared.store.delete_all(&id).await {
        tracing::error!(flow = %id, error = %e, "Could not remove flow fragments");
    }
    shared.reconstructions.fetch_sub(1, Ordering::AcqRel);
}

/// A FIN may carry the last bytes of the flow. They are stored without
/// touching the registry, which has already forgotten the flow.
async fn store_fin_payload(shared: &Shared, id: ConnectionId, fin: &TcpPacket) {
    let token = SequenceToken(fin.seq);
    let stored = match shared.store.create(&id).await {
        Ok(()) => shared.store.append(&id, token, &fin.payload).await,
        Err(e) => Err(e),
    };

    match stored {
        Ok(()) => shared.stats.fragment_written(),
        Err(e) => {
            shared.stats.fragment_write_failed();
            tracing::error!(flow = %id, token = %token, error = %e, "Fragment lost");
        }
    }
}

async fn segment(shared: Arc<Shared>, id: ConnectionId) -> Result<ReconstructionSummary, StreamError> {
    let stream = StreamMaterializer::open(&shared.store, &id).await?;
    let fragments = stream.fragment_count();

    let mut segmenter = HttpSegmenter::new(stream);
    let mut events = 0;
    let mut consumer_gone = false;

    while let Some(event) = segmenter.next_event().await? {
        events += 1;
        shared.stats.event_emitted();
        if consumer_gone {
            continue;
        }
        if shared.events.send(FlowEvent { flow: id, event }).await.is_err() {
            tracing::warn!(flow = %id, "Event consumer has gone away");
            consumer_gone = true;
        }
    }

    Ok(ReconstructionSummary {
        fragments,
        events,
        bytes: segmenter.bytes_consumed(),
    })
}
