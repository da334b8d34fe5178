//! Background runners for the LLM UI app
//!
//! Network work never runs on the UI thread. Each job gets its own thread with
//! a Tokio runtime and reports back over a channel that the UI polls per frame.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use agent_host::CompletionJob;
use providers::{ModelCatalog, OpenRouterClient};
use shared::agent_api::{StreamEvent, StreamUpdate};
use shared::catalog::ModelCatalogEntry;
use shared::error::ChatError;
use tracing::{debug, error};

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start async runtime: {}", e))
}

/// Run one completion in the background (non-blocking for the caller's thread).
pub fn run_completion(job: CompletionJob, tx: Sender<StreamUpdate>) {
    let CompletionJob {
        seq,
        client,
        request,
        abort,
    } = job;
    let send = |event: StreamEvent| {
        // The UI drops its receiver on Stop; nothing left to tell it.
        let _ = tx.send(StreamUpdate { seq, event });
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            error!("{}", e);
            send(StreamEvent::Failed(ChatError::Config(e)));
            return;
        }
    };

    let result = rt.block_on(client.complete(&request, abort, |event| send(event)));
    let last = match result {
        Ok(result) => StreamEvent::Finished(result),
        Err(e) if e.is_cancelled() => {
            debug!("request {} cancelled", seq);
            StreamEvent::Cancelled
        }
        Err(e) => StreamEvent::Failed(e),
    };
    send(last);
}

/// Refresh the model catalog (cached for a day) in the background.
pub fn run_catalog_refresh(
    catalog: Arc<ModelCatalog>,
    client: OpenRouterClient,
    tx: Sender<Vec<ModelCatalogEntry>>,
) {
    let models = match runtime() {
        Ok(rt) => rt.block_on(catalog.models(&client)),
        Err(e) => {
            error!("{}", e);
            catalog.cached().unwrap_or_default()
        }
    };
    let _ = tx.send(models);
}
