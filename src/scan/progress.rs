use std::time::Instant;

/// Two granularities at which `ScanLimits` are enforced: tight limits
/// checked on every included/skipped cell, and looser ones checked only at
/// row boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    BetweenCells,
    BetweenRows,
}

/// Why a `StoreScanner::next` call returned before exhausting the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    MoreValues,
    NoMoreValues,
    TimeLimitReached,
    BatchLimitReached,
    SizeLimitReached,
}

#[derive(Debug, Clone, Default)]
pub struct ScanLimits {
    pub max_batch: Option<u64>,
    pub max_size_bytes: Option<u64>,
    pub deadline: Option<Instant>,
}

/// Caller-owned accounting object threaded through repeated
/// `StoreScanner::next` calls. `keep_progress` lets a caller accumulate
/// batch/size counters across calls instead of resetting them at the start
/// of every `next`.
pub struct ScanProgress {
    pub between_cells: ScanLimits,
    pub between_rows: ScanLimits,
    pub keep_progress: bool,
    batch_count: u64,
    size_bytes: u64,
    now: Option<Instant>,
}

impl ScanProgress {
    pub fn new() -> Self {
        ScanProgress {
            between_cells: ScanLimits::default(),
            between_rows: ScanLimits::default(),
            keep_progress: false,
            batch_count: 0,
            size_bytes: 0,
            now: None,
        }
    }

    pub fn reset_counters(&mut self) {
        if !self.keep_progress {
            self.batch_count = 0;
            self.size_bytes = 0;
        }
    }

    pub fn update_time_progress(&mut self) {
        self.now = Some(Instant::now());
    }

    pub fn check_time_limit(&self, scope: LimitScope) -> bool {
        match (self.now, self.limits_for(scope).deadline) {
            (Some(now), Some(deadline)) => now >= deadline,
            _ => false,
        }
    }

    pub fn add_emitted(&mut self, bytes: u64) {
        self.batch_count += 1;
        self.size_bytes += bytes;
    }

    pub fn check_batch_limit(&self, scope: LimitScope) -> bool {
        self.limits_for(scope).max_batch.is_some_and(|m| self.batch_count >= m)
    }

    pub fn check_size_limit(&self, scope: LimitScope) -> bool {
        self.limits_for(scope).max_size_bytes.is_some_and(|m| self.size_bytes >= m)
    }

    fn limits_for(&self, scope: LimitScope) -> &ScanLimits {
        match scope {
            LimitScope::BetweenCells => &self.between_cells,
            LimitScope::BetweenRows => &self.between_rows,
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
