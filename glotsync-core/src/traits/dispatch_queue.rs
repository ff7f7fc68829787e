//! Job scheduler abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::DispatchChunk;

/// Hands dispatch chunks to background workers
///
/// Platform implementation:
/// - `ChannelDispatchQueue` (tokio mpsc + worker pool, glotsync-app)
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// Accept a chunk for asynchronous processing. Must not wait for the chunk to run.
    async fn enqueue(&self, chunk: DispatchChunk) -> CoreResult<()>;
}
