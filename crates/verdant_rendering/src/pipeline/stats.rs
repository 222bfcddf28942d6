//! Frame reports and running statistics.

use crate::culling::CullStats;
use crate::lod::TierCounts;

/// What one frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Simulation tick applied this frame, if a snapshot arrived.
    pub tick: Option<u64>,
    /// Tiers actually held after reconciliation.
    pub tiers: TierCounts,
    /// Entities that entered the Detailed tier.
    pub promotions: u32,
    /// Entities that left the Detailed tier.
    pub demotions: u32,
    /// Entities that wanted Proxy but found their partition full.
    pub proxy_overflows: u32,
    /// Entities that wanted Detailed but the factory failed.
    pub construction_failures: u32,
    /// Snapshot records skipped as malformed.
    pub malformed_records: u32,
    /// Tracked entities dropped via removal lists.
    pub removed: u32,
    /// Proxies hidden or restored by visibility refresh.
    pub visibility_changes: u32,
    /// Instance buffers uploaded.
    pub buffers_flushed: u32,
    /// Visibility tests run this frame.
    pub culling: CullStats,
}

impl FrameReport {
    /// Whether the frame degraded any entity.
    #[must_use]
    pub const fn degraded(&self) -> bool {
        self.proxy_overflows > 0 || self.construction_failures > 0 || self.malformed_records > 0
    }
}

/// Running totals across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames processed.
    pub frames: u64,
    /// Frames that applied a snapshot.
    pub snapshots: u64,
    /// Total promotions to Detailed.
    pub promotions: u64,
    /// Total demotions from Detailed.
    pub demotions: u64,
    /// Total proxy overflows.
    pub proxy_overflows: u64,
    /// Total construction failures.
    pub construction_failures: u64,
    /// Total malformed records.
    pub malformed_records: u64,
    /// Total buffer uploads.
    pub buffers_flushed: u64,
    /// Most Detailed entities seen in one frame.
    pub peak_detailed: usize,
}

impl RenderStats {
    /// Folds a frame report into the totals.
    pub fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        if report.tick.is_some() {
            self.snapshots += 1;
        }
        self.promotions += u64::from(report.promotions);
        self.demotions += u64::from(report.demotions);
        self.proxy_overflows += u64::from(report.proxy_overflows);
        self.construction_failures += u64::from(report.construction_failures);
        self.malformed_records += u64::from(report.malformed_records);
        self.buffers_flushed += u64::from(report.buffers_flushed);
        self.peak_detailed = self.peak_detailed.max(report.tiers.detailed);
    }

    /// Average uploads per frame.
    #[must_use]
    pub fn uploads_per_frame(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.buffers_flushed as f64 / self.frames as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut stats = RenderStats::default();
        let mut report = FrameReport {
            frame: 1,
            tick: Some(4),
            promotions: 3,
            buffers_flushed: 2,
            ..FrameReport::default()
        };
        report.tiers.detailed = 3;
        stats.record(&report);
        stats.record(&FrameReport { frame: 2, ..FrameReport::default() });

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.snapshots, 1);
        assert_eq!(stats.promotions, 3);
        assert_eq!(stats.peak_detailed, 3);
        assert!((stats.uploads_per_frame() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degraded() {
        assert!(!FrameReport::default().degraded());
        assert!(FrameReport { proxy_overflows: 1, ..FrameReport::default() }.degraded());
    }
}
