use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected across normalization and export
#[derive(Default)]
pub struct PipelineStats {
    pub records_read: AtomicU64,
    pub records_rejected: AtomicU64,
    pub entries_merged: AtomicU64,
    pub references_dropped: AtomicU64,
    pub entries_excluded: AtomicU64,
    pub entries_stored: AtomicU64,
    pub entries_rendered: AtomicU64,
    pub render_failures: AtomicU64,
    pub content_bytes: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_records(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_merged(&self) {
        self.entries_merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_references_dropped(&self, count: u64) {
        self.references_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_excluded(&self) {
        self.entries_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_stored(&self, count: u64) {
        self.entries_stored.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_rendered(&self) {
        self.entries_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_render_failures(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_content_bytes(&self, count: u64) {
        self.content_bytes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn records(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.records_rejected.load(Ordering::Relaxed)
    }

    pub fn merged(&self) -> u64 {
        self.entries_merged.load(Ordering::Relaxed)
    }

    pub fn references_dropped(&self) -> u64 {
        self.references_dropped.load(Ordering::Relaxed)
    }

    pub fn excluded(&self) -> u64 {
        self.entries_excluded.load(Ordering::Relaxed)
    }

    pub fn stored(&self) -> u64 {
        self.entries_stored.load(Ordering::Relaxed)
    }

    pub fn rendered(&self) -> u64 {
        self.entries_rendered.load(Ordering::Relaxed)
    }

    pub fn render_failures(&self) -> u64 {
        self.render_failures.load(Ordering::Relaxed)
    }

    pub fn content_bytes(&self) -> u64 {
        self.content_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = PipelineStats::new();
        assert_eq!(stats.records(), 0);
        assert_eq!(stats.rejected(), 0);
        assert_eq!(stats.merged(), 0);
        assert_eq!(stats.references_dropped(), 0);
        assert_eq!(stats.excluded(), 0);
        assert_eq!(stats.stored(), 0);
        assert_eq!(stats.rendered(), 0);
        assert_eq!(stats.render_failures(), 0);
        assert_eq!(stats.content_bytes(), 0);
    }

    #[test]
    fn mixed_operations() {
        let stats = PipelineStats::new();
        stats.inc_records();
        stats.inc_records();
        stats.inc_rejected();
        stats.add_references_dropped(3);
        stats.add_stored(2);
        stats.inc_rendered();
        stats.add_content_bytes(120);
        stats.add_content_bytes(30);

        assert_eq!(stats.records(), 2);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.references_dropped(), 3);
        assert_eq!(stats.stored(), 2);
        assert_eq!(stats.rendered(), 1);
        assert_eq!(stats.content_bytes(), 150);
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let stats = PipelineStats::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        stats.inc_rendered();
                    }
                });
            }
        });
        assert_eq!(stats.rendered(), 400);
    }
}
