use crate::scan::cell::Cell;
use crate::scan::error::ScanError;
use crate::scan::sub_scanner::SubScanner;

/// Seeks every file-backed scanner in `candidates` to `key` concurrently.
/// Only worth doing when a scan opens several SSTables at once and no
/// explicit-column lazy seek narrowed things down first (see
/// `ColumnFamily::open_user_scanner`).
pub struct ParallelSeeker;

impl ParallelSeeker {
    pub fn seek_all(candidates: &mut [Box<dyn SubScanner>], key: &Cell) -> Result<(), ScanError> {
        let mut file_refs: Vec<&mut Box<dyn SubScanner>> = Vec::new();
        let mut other_refs: Vec<&mut Box<dyn SubScanner>> = Vec::new();
        for c in candidates.iter_mut() {
            if c.is_file_scanner() {
                file_refs.push(c);
            } else {
                other_refs.push(c);
            }
        }

        let results: Vec<Result<(), ScanError>> = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = file_refs
                .into_iter()
                .map(|scanner| scope.spawn(move |_| scanner.seek(key)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|_| Err(ScanError::Interrupted("seek thread panicked".into()))))
                .collect()
        })
        .unwrap_or_else(|_| vec![Err(ScanError::Interrupted("parallel seek scope panicked".into()))]);

        for r in results {
            r?;
        }
        for c in other_refs {
            c.seek(key)?;
        }
        Ok(())
    }
}
