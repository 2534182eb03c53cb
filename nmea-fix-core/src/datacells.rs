use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;
use portable_atomic::{AtomicU32, Ordering};

/// A thread-safe slot for handing a `Copy` value to readers in other
/// execution contexts, e.g. publishing the committed fix.
pub struct DataCell<T: Copy> {
    storage: Mutex<CriticalSectionRawMutex, Cell<T>>,
    last_updated: AtomicU32,
}

impl<T: Copy> DataCell<T> {
    /// Create a new cell with an initial value.
    pub const fn new(init: T) -> Self {
        Self {
            storage: Mutex::new(Cell::new(init)),
            last_updated: AtomicU32::new(0),
        }
    }

    /// Update the data in the cell, stamping it with `now`.
    pub fn update(&self, data: T, now: Instant) {
        self.storage.lock(|cell| {
            cell.set(data);
        });
        self.last_updated
            .store(now.as_ticks() as u32, Ordering::Relaxed);
    }

    /// Get the tick count of the last update.
    pub fn last_updated(&self) -> u32 {
        self.last_updated.load(Ordering::Relaxed)
    }

    /// Fetch the latest data from the cell.
    pub fn read(&self) -> T {
        self.storage.lock(|cell| cell.get())
    }
}
