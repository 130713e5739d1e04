use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected across a stamping and export run
#[derive(Default)]
pub struct RunStats {
    pub documents_scanned: AtomicU64,
    pub documents_modified: AtomicU64,
    pub documents_skipped: AtomicU64,
    pub documents_undated: AtomicU64,
    pub ids_registered: AtomicU64,
    pub ids_assigned: AtomicU64,
    pub sentences_extracted: AtomicU64,
    pub sentences_excluded: AtomicU64,
    pub duplicates_dropped: AtomicU64,
    pub records_written: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_scanned(&self) {
        self.documents_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_modified(&self) {
        self.documents_modified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.documents_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_undated(&self) {
        self.documents_undated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_registered(&self, count: u64) {
        self.ids_registered.store(count, Ordering::Relaxed);
    }

    pub fn add_assigned(&self, count: u64) {
        self.ids_assigned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_extracted(&self, count: u64) {
        self.sentences_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_excluded(&self, count: u64) {
        self.sentences_excluded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_duplicates(&self, count: u64) {
        self.duplicates_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_written(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn scanned(&self) -> u64 {
        self.documents_scanned.load(Ordering::Relaxed)
    }

    pub fn modified(&self) -> u64 {
        self.documents_modified.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.documents_skipped.load(Ordering::Relaxed)
    }

    pub fn undated(&self) -> u64 {
        self.documents_undated.load(Ordering::Relaxed)
    }

    pub fn registered(&self) -> u64 {
        self.ids_registered.load(Ordering::Relaxed)
    }

    pub fn assigned(&self) -> u64 {
        self.ids_assigned.load(Ordering::Relaxed)
    }

    pub fn extracted(&self) -> u64 {
        self.sentences_extracted.load(Ordering::Relaxed)
    }

    pub fn excluded(&self) -> u64 {
        self.sentences_excluded.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates_dropped.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }
}
