use crate::scan::spec::ScanSpec;
use crate::scan::sub_scanner::SubScanner;

/// Prunes candidate `SubScanner`s before a scan opens, the way a real store
/// would use bloom filters and file metadata to skip sources that cannot
/// possibly contribute. Here that is just each scanner's own row-range /
/// time-range / TTL bookkeeping via `SubScanner::should_use`.
pub struct SubScannerSelector;

impl SubScannerSelector {
    pub fn select(
        candidates: Vec<Box<dyn SubScanner>>,
        scan: &ScanSpec,
        ttl_cutoff: i64,
    ) -> Vec<Box<dyn SubScanner>> {
        candidates
            .into_iter()
            .filter(|c| c.should_use(scan, ttl_cutoff))
            .collect()
    }
}
