//! Upload strategy selection.
//!
//! Large files risk single-request timeouts and benefit from server-side
//! offset tracking; small files finish faster as plain concurrent chunk
//! writes.

use crate::types::{StrategyKind, UploadConfiguration};

/// Chooses the transfer strategy from the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStrategySelector {
    resumable_threshold_bytes: u64,
}

impl UploadStrategySelector {
    /// Create a selector with an explicit threshold.
    pub fn new(resumable_threshold_bytes: u64) -> Self {
        Self {
            resumable_threshold_bytes,
        }
    }

    /// Create a selector from the pipeline configuration.
    pub fn from_config(config: &UploadConfiguration) -> Self {
        Self::new(config.resumable_threshold_bytes)
    }

    /// `Resumable` when `total_size_bytes >= threshold`, else `Parallel`.
    pub fn select(&self, total_size_bytes: u64) -> StrategyKind {
        if total_size_bytes >= self.resumable_threshold_bytes {
            StrategyKind::Resumable
        } else {
            StrategyKind::Parallel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1_000_000;

    #[test]
    fn test_select_boundary() {
        let selector = UploadStrategySelector::new(6 * MB);
        assert_eq!(selector.select(6 * MB - 1), StrategyKind::Parallel);
        assert_eq!(selector.select(6 * MB), StrategyKind::Resumable);
        assert_eq!(selector.select(6 * MB + 1), StrategyKind::Resumable);
    }

    #[test]
    fn test_select_is_deterministic_across_sizes() {
        let threshold: u64 = 4096;
        let selector = UploadStrategySelector::new(threshold);
        for size in (1..threshold).step_by(97) {
            assert_eq!(selector.select(size), StrategyKind::Parallel);
        }
        for size in (threshold..threshold * 4).step_by(97) {
            assert_eq!(selector.select(size), StrategyKind::Resumable);
        }
    }

    #[test]
    fn test_scenarios() {
        let selector = UploadStrategySelector::new(6 * MB);
        assert_eq!(selector.select(60 * MB), StrategyKind::Resumable);
        assert_eq!(selector.select(2 * MB), StrategyKind::Parallel);
    }

    #[test]
    fn test_from_default_config() {
        let config = UploadConfiguration::default();
        let selector = UploadStrategySelector::from_config(&config);
        assert_eq!(
            selector.select(config.resumable_threshold_bytes),
            StrategyKind::Resumable
        );
    }
}
