use crate::scan::cell::{store_cmp, Cell};
use crate::scan::error::ScanError;
use crate::scan::spec::ScanSpec;
use crate::scan::sub_scanner::SubScanner;

/// A `SubScanner` over a memstore snapshot. Unlike `FileSubScanner` there is
/// no block index to fake: the memstore is small and entirely resident, so
/// `next_indexed_key` always reports `None` and the merge loop falls back to
/// an explicit seek whenever this scanner is on top.
pub struct MemSubScanner {
    cells: Vec<Cell>,
    pos: usize,
}

impl MemSubScanner {
    pub fn new(cells: Vec<Cell>) -> Self {
        MemSubScanner { cells, pos: 0 }
    }
}

impl SubScanner for MemSubScanner {
    fn peek(&self) -> Option<&Cell> {
        self.cells.get(self.pos)
    }

    fn advance(&mut self) -> Result<(), ScanError> {
        if self.pos < self.cells.len() {
            self.pos += 1;
        }
        Ok(())
    }

    fn seek(&mut self, key: &Cell) -> Result<(), ScanError> {
        self.pos = self.cells.partition_point(|c| store_cmp(c, key) == std::cmp::Ordering::Less);
        Ok(())
    }

    fn is_file_scanner(&self) -> bool {
        false
    }

    fn should_use(&self, scan: &ScanSpec, ttl_cutoff: i64) -> bool {
        if self.cells.is_empty() {
            return false;
        }
        let last_row = &self.cells.last().unwrap().row;
        if let Some(stop) = &scan.stop_row {
            let first_row = &self.cells.first().unwrap().row;
            let past_stop = if scan.stop_row_inclusive {
                first_row.as_slice() > stop.as_slice()
            } else {
                first_row.as_slice() >= stop.as_slice()
            };
            if past_stop {
                return false;
            }
        }
        if last_row.as_slice() < scan.start_row.as_slice() {
            return false;
        }
        if ttl_cutoff > i64::MIN {
            let newest = self.cells.iter().map(|c| c.timestamp).max().unwrap_or(0);
            if (newest as i64) < ttl_cutoff {
                return false;
            }
        }
        true
    }
}
