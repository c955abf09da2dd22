use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::scan::cell::Cell;

/// Mailbox a `ColumnFamily` drops new flush output into; a live
/// `StoreScanner` polls it (lazily, once per `next` call) and reseats its
/// heap when it finds something waiting. Shared behind `Arc<Mutex<_>>`
/// because the flushing thread and the scanning thread are different
/// threads by construction (the background compaction/flush loop spawned
/// by `ColumnFamily::open`).
#[derive(Debug, Default)]
pub struct FlushState {
    pub flushed: bool,
    pub pending_files: Vec<PathBuf>,
    pub pending_memstore: Option<Vec<Cell>>,
}

pub type FlushChannel = Arc<Mutex<FlushState>>;

pub fn new_flush_channel() -> FlushChannel {
    Arc::new(Mutex::new(FlushState::default()))
}
