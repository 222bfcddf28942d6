//! # Update Orchestrator
//!
//! Per-frame driver for the population renderer.
//!
//! ```text
//! snapshot ──► ingest ──► 1. removal ──► 2. classification ──► 3. reconciliation ──► 4. flush
//!                                                                 │
//!                                            releases (all) ◄─────┤
//!                                            acquisitions  ◄──────┘
//! no snapshot ──────────────────────────► 2. classification ──► 3. reconciliation ──► visibility ──► 4. flush
//! ```
//!
//! Every frame re-classifies from the last known records, so tiers follow
//! the camera even while the simulation is busy. Every failure is contained
//! to one entity for one frame and the next frame self-heals.
//!
//! Between snapshots a proxy that drifts out of view keeps its slot and is
//! only hidden; the next snapshot releases it.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};
use verdant_shared::{EntityKey, EntityRecord, Snapshot};

use crate::config::RenderConfig;
use crate::culling::{Camera, CullingEvaluator};
use crate::detail::{DetailFactory, DetailPool, ProceduralFactory};
use crate::error::{RenderError, RenderResult};
use crate::gpu::InstanceUploader;
use crate::instancing::{ProxyBuffer, ProxyKind};
use crate::lod::{RenderTier, Thresholds, TierClassifier, TierCounts, TierDecision};
use crate::picking::{pick_detailed, pick_proxies, Ray, Selection};
use crate::pipeline::{FrameReport, RenderStats};

/// Last known state of one entity.
#[derive(Debug, Clone, Copy)]
struct Tracked {
    record: EntityRecord,
    /// Tier whose resource the entity currently holds.
    tier: RenderTier,
}

/// Drives classification, the detail pool and the proxy buffers.
pub struct UpdateOrchestrator<F: DetailFactory = ProceduralFactory> {
    config: RenderConfig,
    /// Ordered by key; classification input order.
    tracked: BTreeMap<EntityKey, Tracked>,
    classifier: TierClassifier,
    evaluator: CullingEvaluator,
    detail: DetailPool<F>,
    /// Indexed by [`ProxyKind::index`].
    proxies: [ProxyBuffer; 3],
    frame: u64,
    last_tick: Option<u64>,
    stats: RenderStats,
}

impl UpdateOrchestrator<ProceduralFactory> {
    /// Creates an orchestrator with the procedural detail factory.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        Self::with_factory(config, ProceduralFactory::new())
    }
}

impl<F: DetailFactory> UpdateOrchestrator<F> {
    /// Creates an orchestrator with a custom detail factory.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] if `config` fails validation.
    pub fn with_factory(config: RenderConfig, factory: F) -> RenderResult<Self> {
        config.validate()?;
        let proxy = &config.proxy;
        let proxies = [
            ProxyBuffer::new(ProxyKind::Creatures, proxy.creature_capacity, &[1.0]),
            ProxyBuffer::new(ProxyKind::Plants, proxy.plant_capacity, &proxy.plant_shares),
            ProxyBuffer::new(ProxyKind::Corpses, proxy.corpse_capacity, &proxy.corpse_shares),
        ];
        debug!(
            max_detailed = config.detail.max_detailed,
            detail_distance = config.lod.detail_distance,
            cull_distance = config.lod.cull_distance,
            "Update orchestrator created"
        );
        Ok(Self {
            classifier: TierClassifier::new(Thresholds::from_config(&config)),
            evaluator: CullingEvaluator::new(config.lod.cull_distance, config.lod.near_override),
            detail: DetailPool::new(factory, config.detail.max_detailed, config.detail.recycle_limit),
            proxies,
            tracked: BTreeMap::new(),
            frame: 0,
            last_tick: None,
            stats: RenderStats::default(),
            config,
        })
    }

    /// Applies a new snapshot and renders the frame.
    ///
    /// Records are normalized first; malformed ones are skipped. A record
    /// whose key also appears in the removal lists is removed.
    pub fn apply_snapshot<U: InstanceUploader>(
        &mut self,
        snapshot: Snapshot,
        camera: &Camera,
        uploader: &mut U,
    ) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            tick: Some(snapshot.tick),
            ..FrameReport::default()
        };
        self.last_tick = Some(snapshot.tick);

        // Ingest
        for raw in snapshot.records {
            match EntityRecord::try_from(raw) {
                Ok(record) => {
                    self.tracked
                        .entry(record.key())
                        .and_modify(|t| t.record = record)
                        .or_insert(Tracked { record, tier: RenderTier::Culled });
                }
                Err(err) => {
                    report.malformed_records += 1;
                    warn!(error = %RenderError::from(err), tick = snapshot.tick, "Skipping snapshot record");
                }
            }
        }

        // 1. Removal
        for key in snapshot.removed.keys() {
            if let Some(tracked) = self.tracked.remove(&key) {
                release(&mut self.detail, &mut self.proxies, key, tracked.tier);
                report.removed += 1;
            } else {
                trace!(%key, "Removal of untracked entity");
            }
        }

        // 2. Classification
        self.classify(camera);

        // 3. Reconciliation
        self.reconcile(&mut report, Records::Fresh);

        // 4. Flush
        report.buffers_flushed = self.flush(uploader);
        self.finish(report)
    }

    /// Renders a frame without a new snapshot.
    ///
    /// Tiers are re-classified from the last known records against the new
    /// camera. Entities that keep their tier are not rewritten. Proxies that
    /// left the view are hidden in place and restored when they come back.
    pub fn refresh<U: InstanceUploader>(&mut self, camera: &Camera, uploader: &mut U) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        self.classify(camera);
        self.reconcile(&mut report, Records::Unchanged);
        for proxy in &mut self.proxies {
            report.visibility_changes += proxy.refresh_visibility(camera, &mut self.evaluator);
        }

        report.buffers_flushed = self.flush(uploader);
        self.finish(report)
    }

    /// Advances detailed renderer animation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.detail.tick(dt);
    }

    /// Resolves a pick ray to an entity: detailed renderers first, then
    /// proxies.
    #[must_use]
    pub fn pick(&self, ray: &Ray) -> Option<Selection> {
        let (key, distance) = pick_detailed(&self.detail, ray).or_else(|| pick_proxies(&self.proxies, ray))?;
        let tracked = self.tracked.get(&key)?;
        Some(Selection {
            key,
            record: tracked.record,
            tier: tracked.tier,
            distance,
        })
    }

    /// Tier currently held by `key`.
    #[must_use]
    pub fn tier_of(&self, key: EntityKey) -> Option<RenderTier> {
        self.tracked.get(&key).map(|t| t.tier)
    }

    /// Last known record of `key`.
    #[must_use]
    pub fn record_of(&self, key: EntityKey) -> Option<&EntityRecord> {
        self.tracked.get(&key).map(|t| &t.record)
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Tier counts over all tracked entities.
    #[must_use]
    pub fn tier_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for tracked in self.tracked.values() {
            counts.add(tracked.tier);
        }
        counts
    }

    /// Detail pool.
    #[must_use]
    pub const fn detail_pool(&self) -> &DetailPool<F> {
        &self.detail
    }

    /// Proxy buffer for `kind`.
    #[must_use]
    pub fn proxy(&self, kind: ProxyKind) -> &ProxyBuffer {
        &self.proxies[kind.index()]
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Running totals.
    #[must_use]
    pub const fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Frames processed.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Tick of the last applied snapshot.
    #[must_use]
    pub const fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    /// Keys whose tier disagrees with the resources they hold.
    ///
    /// Empty when the tier map, detail pool and proxy buffers agree: every
    /// Detailed key holds exactly one handle and no slot, every Proxy key
    /// exactly one slot and no handle, every Culled key neither.
    #[must_use]
    pub fn audit(&self) -> Vec<EntityKey> {
        let mut bad: Vec<EntityKey> = self
            .tracked
            .iter()
            .filter(|(key, t)| {
                let detailed = self.detail.contains(**key);
                let proxied = self.proxies[ProxyKind::for_class(key.class).index()].contains(key.id);
                match t.tier {
                    RenderTier::Detailed => !detailed || proxied,
                    RenderTier::Proxy => detailed || !proxied,
                    RenderTier::Culled => detailed || proxied,
                }
            })
            .map(|(key, _)| *key)
            .collect();

        // Resources held by untracked keys are leaks.
        bad.extend(self.detail.iter().map(|(key, _)| key).filter(|key| !self.tracked.contains_key(key)));
        for proxy in &self.proxies {
            let class = proxy.kind().class();
            bad.extend(
                (0..proxy.capacity())
                    .filter_map(|slot| proxy.slot_owner(slot))
                    .map(|id| EntityKey::new(class, id))
                    .filter(|key| !self.tracked.contains_key(key)),
            );
        }
        bad
    }

    fn classify(&mut self, camera: &Camera) {
        self.evaluator.update(camera);
        self.classifier.classify(
            self.tracked.iter().map(|(key, t)| (*key, t.record.position)),
            camera,
            &mut self.evaluator,
        );
    }

    /// Releases changed tiers first, then acquires, nearest first.
    ///
    /// With [`Records::Unchanged`] held resources are not rewritten, and a
    /// proxy culled only by the frustum keeps its slot.
    fn reconcile(&mut self, report: &mut FrameReport, records: Records) {
        let decisions = self.classifier.decisions();
        let cull_distance = self.classifier.thresholds().cull_distance;
        let keeps_slot = |current: RenderTier, decision: &TierDecision| {
            records == Records::Unchanged
                && current == RenderTier::Proxy
                && decision.tier == RenderTier::Culled
                && decision.distance < cull_distance
        };

        for decision in decisions {
            let Some(tracked) = self.tracked.get_mut(&decision.key) else {
                continue;
            };
            if tracked.tier != decision.tier && !keeps_slot(tracked.tier, decision) {
                release(&mut self.detail, &mut self.proxies, decision.key, tracked.tier);
                if tracked.tier == RenderTier::Detailed {
                    report.demotions += 1;
                }
                trace!(key = %decision.key, from = ?tracked.tier, to = ?decision.tier, "Tier change");
                tracked.tier = RenderTier::Culled;
            }
        }

        for decision in decisions {
            let Some(tracked) = self.tracked.get_mut(&decision.key) else {
                continue;
            };
            let record = tracked.record;
            tracked.tier = match (tracked.tier, decision.tier) {
                (current, _) if keeps_slot(current, decision) => RenderTier::Proxy,
                (RenderTier::Detailed, RenderTier::Detailed) => {
                    if records == Records::Fresh {
                        self.detail.update(decision.key, &record);
                    }
                    RenderTier::Detailed
                }
                (RenderTier::Proxy, RenderTier::Proxy) if records == Records::Unchanged => RenderTier::Proxy,
                (_, RenderTier::Detailed) => match self.detail.acquire(&record) {
                    Ok(_) => {
                        report.promotions += 1;
                        RenderTier::Detailed
                    }
                    Err(RenderError::ConstructionFailure { .. }) => {
                        report.construction_failures += 1;
                        RenderTier::Culled
                    }
                    Err(err) => {
                        debug!(key = %decision.key, error = %err, "Detailed tier unavailable");
                        RenderTier::Culled
                    }
                },
                (_, RenderTier::Proxy) => {
                    let proxy = &mut self.proxies[ProxyKind::for_class(decision.key.class).index()];
                    if proxy.add_or_update(&record) {
                        RenderTier::Proxy
                    } else {
                        report.proxy_overflows += 1;
                        RenderTier::Culled
                    }
                }
                (_, RenderTier::Culled) => RenderTier::Culled,
            };
        }

        if report.proxy_overflows > 0 {
            warn!(overflows = report.proxy_overflows, "Proxy partitions full; entities culled");
        }
    }

    /// Uploads each dirty buffer once.
    fn flush<U: InstanceUploader>(&mut self, uploader: &mut U) -> u32 {
        let mut flushed = 0;
        for proxy in &mut self.proxies {
            let kind = proxy.kind();
            let buffer = proxy.buffer_mut();
            if let Some(range) = buffer.take_dirty() {
                let (offset, bytes) = buffer.bytes_for(range);
                uploader.upload(kind, offset, bytes);
                flushed += 1;
            }
        }
        flushed
    }

    fn finish(&mut self, mut report: FrameReport) -> FrameReport {
        report.tiers = self.tier_counts();
        report.culling = self.evaluator.take_stats();
        self.stats.record(&report);
        debug!(
            frame = report.frame,
            detailed = report.tiers.detailed,
            proxy = report.tiers.proxy,
            culled = report.tiers.culled,
            promotions = report.promotions,
            demotions = report.demotions,
            flushed = report.buffers_flushed,
            "Frame complete"
        );
        report
    }
}

/// Whether reconciliation sees new records or last frame's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Records {
    Fresh,
    Unchanged,
}

/// Releases whatever `key` holds for `tier`. Idempotent.
fn release<F: DetailFactory>(
    detail: &mut DetailPool<F>,
    proxies: &mut [ProxyBuffer; 3],
    key: EntityKey,
    tier: RenderTier,
) {
    match tier {
        RenderTier::Detailed => {
            detail.release(key);
        }
        RenderTier::Proxy => {
            proxies[ProxyKind::for_class(key.class).index()].remove(key.id);
        }
        RenderTier::Culled => {}
    }
}

impl<F: DetailFactory> std::fmt::Debug for UpdateOrchestrator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateOrchestrator")
            .field("frame", &self.frame)
            .field("tracked", &self.tracked.len())
            .field("detailed", &self.detail.active_count())
            .finish_non_exhaustive()
    }
}
