use pitchmap::Engine;
use pitchmap_types::Entity;
use tokio::sync::mpsc;

/// Default capacity of the write queue.
pub const DEFAULT_WRITE_BUFFER: usize = 1024;

/// Write operation to be buffered and executed by the background worker
#[derive(Debug)]
pub enum WriteOp {
    Upsert(Entity),
    Remove(String),
}

/// Returns the sender channel to be used by the handler
pub fn spawn_background_writer(engine: Engine, buffer_size: usize) -> mpsc::Sender<WriteOp> {
    let (tx, mut rx) = mpsc::channel(buffer_size);

    // Index writes take shard locks; keep them off the tokio workers.
    std::thread::spawn(move || {
        while let Some(op) = rx.blocking_recv() {
            match op {
                WriteOp::Upsert(entity) => {
                    let id = entity.id.clone();
                    if let Err(e) = engine.upsert(entity) {
                        tracing::error!("Background write failed (upsert {}): {}", id, e);
                    }
                }
                WriteOp::Remove(id) => {
                    if engine.remove(&id).is_none() {
                        tracing::debug!("Background remove of unknown id {}", id);
                    }
                }
            }
        }
        tracing::info!("Background writer shutting down");
    });

    tx
}
