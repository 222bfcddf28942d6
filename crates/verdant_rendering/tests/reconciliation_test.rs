//! # Reconciliation Tests
//!
//! Tier changes across frames: releases, recycling, removals, uploads and
//! the invariant that every entity holds exactly the resource its tier
//! names.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use verdant_rendering::{
    AssetRegistry, Camera, DetailFactory, DetailHandle, ProceduralFactory, ProxyKind,
    RecordingUploader, RenderConfig, RenderError, RenderResult, RenderTier, UpdateOrchestrator,
};
use verdant_shared::{
    Activity, CorpseTraits, CreatureTraits, EntityClass, EntityKey, EntityRecord, Habitat,
    PlantTraits, RawEntityRecord, RemovedIds, Snapshot, Traits, Vec3,
};

fn camera_facing(yaw: f32) -> Camera {
    let target = Vec3::new(yaw.sin(), 0.0, -yaw.cos());
    Camera::looking_at(Vec3::ZERO, target, 1.0, 0.1, 1000.0)
}

fn forward_camera() -> Camera {
    camera_facing(0.0)
}

fn creature_at(id: u32, distance: f32) -> EntityRecord {
    EntityRecord::new(
        id,
        Vec3::new(0.0, 0.0, -distance),
        1.0,
        Traits::Creature(CreatureTraits::default()),
    )
}

fn corpse_at(id: u32, distance: f32, toxicity: f32) -> EntityRecord {
    EntityRecord::new(
        id,
        Vec3::new(0.0, 0.0, -distance),
        1.0,
        Traits::Corpse(CorpseTraits { toxicity, decay: 0.0 }),
    )
}

fn removed(keys: &[EntityKey]) -> RemovedIds {
    let mut ids = RemovedIds::default();
    for key in keys {
        ids.push(*key);
    }
    ids
}

/// Fails the first construction of each listed id.
struct FlakyFactory {
    inner: ProceduralFactory,
    fail_once: BTreeSet<u32>,
}

impl DetailFactory for FlakyFactory {
    fn construct(
        &mut self,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<DetailHandle> {
        if self.fail_once.remove(&record.id) {
            return Err(RenderError::ConstructionFailure {
                key: record.key(),
                reason: "mesh upload rejected".into(),
            });
        }
        self.inner.construct(record, registry)
    }

    fn rebuild(
        &mut self,
        handle: &mut DetailHandle,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<()> {
        self.inner.rebuild(handle, record, registry)
    }
}

/// Test: A demoted creature returns its handle to the recycle list and
/// takes a proxy slot in the same frame.
#[test]
fn test_demotion_recycles_and_proxies() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();

    orchestrator.apply_snapshot(Snapshot::from_records(1, [&creature_at(7, 20.0)]), &camera, &mut uploader);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(7)), Some(RenderTier::Detailed));
    let recycled_before = orchestrator.detail_pool().recycled_count();

    let report =
        orchestrator.apply_snapshot(Snapshot::from_records(2, [&creature_at(7, 200.0)]), &camera, &mut uploader);

    assert_eq!(report.demotions, 1);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(7)), Some(RenderTier::Proxy));
    assert_eq!(orchestrator.detail_pool().recycled_count(), recycled_before + 1);
    assert_eq!(orchestrator.detail_pool().active_count(), 0);
    assert!(orchestrator.proxy(ProxyKind::Creatures).contains(7));
    assert!(orchestrator.audit().is_empty());
}

/// Test: A recycled handle carries nothing over from its previous occupant.
#[test]
fn test_recycled_handle_starts_clean() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();

    let mut fighter = creature_at(1, 20.0);
    if let Traits::Creature(traits) = &mut fighter.traits {
        traits.activity = Activity::Attacking;
    }
    orchestrator.apply_snapshot(Snapshot::from_records(1, [&fighter]), &camera, &mut uploader);
    orchestrator.tick(0.5);
    let first = orchestrator.detail_pool().get(EntityKey::creature(1)).unwrap();
    assert!(first.flags().attacking);
    assert!(first.animation().elapsed > 0.0);

    let snapshot = Snapshot::from_records(2, [&creature_at(2, 20.0)])
        .with_removed(removed(&[EntityKey::creature(1)]));
    let report = orchestrator.apply_snapshot(snapshot, &camera, &mut uploader);

    assert_eq!(report.removed, 1);
    assert_eq!(orchestrator.detail_pool().stats().recycled, 1);
    let handle = orchestrator.detail_pool().get(EntityKey::creature(2)).unwrap();
    assert_eq!(handle.occupant(), Some(EntityKey::creature(2)));
    assert!(!handle.flags().any(), "flags leaked from previous occupant");
    assert_eq!(handle.animation().elapsed, 0.0);
    assert_eq!(handle.animation().action_time, 0.0);
}

/// Test: Removal releases everything, and the id can come back later.
#[test]
fn test_removal_then_readd() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();
    let key = EntityKey::creature(3);

    orchestrator.apply_snapshot(Snapshot::from_records(1, [&creature_at(3, 20.0)]), &camera, &mut uploader);
    orchestrator.apply_snapshot(Snapshot::from_records(2, [&creature_at(3, 200.0)]), &camera, &mut uploader);
    assert_eq!(orchestrator.tier_of(key), Some(RenderTier::Proxy));

    let report = orchestrator.apply_snapshot(
        Snapshot::default().with_removed(removed(&[key])),
        &camera,
        &mut uploader,
    );
    assert_eq!(report.removed, 1);
    assert_eq!(orchestrator.tracked_count(), 0);
    assert_eq!(orchestrator.tier_of(key), None);
    assert!(orchestrator.proxy(ProxyKind::Creatures).is_empty());
    assert_eq!(orchestrator.detail_pool().active_count(), 0);
    assert!(orchestrator.audit().is_empty());

    orchestrator.apply_snapshot(Snapshot::from_records(4, [&creature_at(3, 30.0)]), &camera, &mut uploader);
    assert_eq!(orchestrator.tier_of(key), Some(RenderTier::Detailed));
}

/// Test: A key that is both listed and removed in one snapshot is removed.
#[test]
fn test_removal_wins_over_record() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let snapshot = Snapshot::from_records(1, [&creature_at(5, 20.0)])
        .with_removed(removed(&[EntityKey::creature(5)]));

    orchestrator.apply_snapshot(snapshot, &forward_camera(), &mut RecordingUploader::new());

    assert_eq!(orchestrator.tracked_count(), 0);
    assert_eq!(orchestrator.detail_pool().active_count(), 0);
}

/// Test: Entities missing from a snapshot keep their last record and tier.
#[test]
fn test_absent_entity_keeps_last_record() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();

    orchestrator.apply_snapshot(
        Snapshot::from_records(1, [&creature_at(0, 20.0), &creature_at(1, 200.0)]),
        &camera,
        &mut uploader,
    );
    orchestrator.apply_snapshot(Snapshot::from_records(2, [&creature_at(0, 25.0)]), &camera, &mut uploader);

    let record = orchestrator.record_of(EntityKey::creature(1)).unwrap();
    assert_eq!(record.position, Vec3::new(0.0, 0.0, -200.0));
    assert_eq!(orchestrator.tier_of(EntityKey::creature(1)), Some(RenderTier::Proxy));
    assert_eq!(orchestrator.last_tick(), Some(2));
}

/// Test: Each dirty buffer is uploaded exactly once per frame, clean ones
/// not at all.
#[test]
fn test_one_upload_per_dirty_buffer() {
    let plants: Vec<EntityRecord> = (0..5)
        .map(|i| {
            EntityRecord::new(
                i,
                Vec3::new(i as f32, 0.0, -150.0),
                1.0,
                Traits::Plant(PlantTraits { habitat: Habitat::Water, hue: 0.5, maturity: 0.5 }),
            )
        })
        .collect();
    let creatures: Vec<EntityRecord> = (0..30).map(|i| creature_at(i, 100.0 + i as f32)).collect();

    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let report = orchestrator.apply_snapshot(
        Snapshot::from_records(1, creatures.iter().chain(&plants)),
        &forward_camera(),
        &mut uploader,
    );

    println!("Uploads: {:?}", uploader.records());
    assert_eq!(report.buffers_flushed, 2);
    assert_eq!(uploader.count_for(ProxyKind::Creatures), 1);
    assert_eq!(uploader.count_for(ProxyKind::Plants), 1);
    assert_eq!(uploader.count_for(ProxyKind::Corpses), 0);

    uploader.clear();
    let report = orchestrator.refresh(&forward_camera(), &mut uploader);
    assert_eq!(report.buffers_flushed, 0, "nothing changed, nothing to upload");
    assert!(uploader.records().is_empty());
}

/// Test: Turning the camera hides proxies in place; turning back restores
/// them. The slot stays held until the next snapshot.
#[test]
fn test_refresh_hides_and_restores() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    orchestrator.apply_snapshot(
        Snapshot::from_records(1, [&creature_at(9, 200.0)]),
        &forward_camera(),
        &mut uploader,
    );
    assert!(orchestrator.proxy(ProxyKind::Creatures).is_visible(9));

    uploader.clear();
    let report = orchestrator.refresh(&camera_facing(std::f32::consts::PI), &mut uploader);
    assert_eq!(report.tick, None);
    assert_eq!(report.visibility_changes, 1);
    assert_eq!(uploader.count_for(ProxyKind::Creatures), 1);
    assert!(!orchestrator.proxy(ProxyKind::Creatures).is_visible(9));
    assert_eq!(orchestrator.tier_of(EntityKey::creature(9)), Some(RenderTier::Proxy));
    assert!(orchestrator.proxy(ProxyKind::Creatures).contains(9));

    let report = orchestrator.refresh(&forward_camera(), &mut uploader);
    assert_eq!(report.visibility_changes, 1);
    assert!(orchestrator.proxy(ProxyKind::Creatures).is_visible(9));
}

/// Test: Frames without a snapshot still re-classify against the camera.
/// An entity culled behind the camera becomes a proxy once the camera turns
/// to it, and a proxy the camera walks up to is promoted.
#[test]
fn test_refresh_reclassifies_last_known_records() {
    let records = [creature_at(1, -200.0), creature_at(2, 100.0)];
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    orchestrator.apply_snapshot(Snapshot::from_records(1, &records), &forward_camera(), &mut uploader);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(1)), Some(RenderTier::Culled));
    assert_eq!(orchestrator.tier_of(EntityKey::creature(2)), Some(RenderTier::Proxy));

    let turned = camera_facing(std::f32::consts::PI);
    for _ in 0..10 {
        orchestrator.refresh(&turned, &mut uploader);
    }
    assert_eq!(orchestrator.tier_of(EntityKey::creature(1)), Some(RenderTier::Proxy));
    assert!(orchestrator.proxy(ProxyKind::Creatures).is_visible(1));
    // Left behind, but kept hidden until the next snapshot.
    assert_eq!(orchestrator.tier_of(EntityKey::creature(2)), Some(RenderTier::Proxy));
    assert!(!orchestrator.proxy(ProxyKind::Creatures).is_visible(2));
    assert!(orchestrator.audit().is_empty());

    let closer = Camera::looking_at(
        Vec3::new(0.0, 0.0, -90.0),
        Vec3::new(0.0, 0.0, -200.0),
        1.0,
        0.1,
        1000.0,
    );
    let report = orchestrator.refresh(&closer, &mut uploader);
    println!("Refresh report: {report:?}");
    assert_eq!(report.tick, None);
    assert_eq!(report.promotions, 1);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(2)), Some(RenderTier::Detailed));
    assert!(!orchestrator.proxy(ProxyKind::Creatures).contains(2));
    assert!(orchestrator.audit().is_empty());

    // The next snapshot releases the hidden slot.
    orchestrator.apply_snapshot(Snapshot::from_records(2, &records), &closer, &mut uploader);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(1)), Some(RenderTier::Culled));
    assert!(orchestrator.proxy(ProxyKind::Creatures).is_empty());
    assert!(orchestrator.audit().is_empty());
}

/// Test: Visibility counters cover one frame and do not pile up across
/// frames.
#[test]
fn test_culling_counters_reset_each_frame() {
    let records = [creature_at(1, 200.0), creature_at(2, 210.0), creature_at(3, -200.0)];
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();

    for tick in 1..=3 {
        let report = orchestrator.apply_snapshot(Snapshot::from_records(tick, &records), &camera, &mut uploader);
        assert_eq!(report.culling.visible, 2, "tick {tick}");
        assert_eq!(report.culling.hidden, 1, "tick {tick}");
    }

    // Classification plus the visibility pass over both held proxies.
    let report = orchestrator.refresh(&camera, &mut uploader);
    assert_eq!(report.culling.visible, 4);
    assert_eq!(report.culling.hidden, 1);
}

/// Test: A malformed record is skipped; the rest of the snapshot applies.
#[test]
fn test_malformed_record_skipped() {
    let mut snapshot = Snapshot::from_records(1, [&creature_at(0, 20.0), &creature_at(1, 200.0)]);
    snapshot.records.push(RawEntityRecord {
        id: Some(99),
        class: Some(EntityClass::Creature),
        ..RawEntityRecord::default()
    });

    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let report = orchestrator.apply_snapshot(snapshot, &forward_camera(), &mut RecordingUploader::new());

    assert_eq!(report.malformed_records, 1);
    assert!(report.degraded());
    assert_eq!(orchestrator.tracked_count(), 2);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(99)), None);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(0)), Some(RenderTier::Detailed));
}

/// Test: A failed construction leaves the entity culled for one frame; the
/// next frame retries.
#[test]
fn test_construction_failure_self_heals() {
    let factory = FlakyFactory {
        inner: ProceduralFactory::new(),
        fail_once: BTreeSet::from([4]),
    };
    let mut orchestrator = UpdateOrchestrator::with_factory(RenderConfig::default(), factory).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();
    let records = [creature_at(4, 20.0), creature_at(5, 21.0)];

    let report = orchestrator.apply_snapshot(Snapshot::from_records(1, &records), &camera, &mut uploader);
    assert_eq!(report.construction_failures, 1);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(4)), Some(RenderTier::Culled));
    assert_eq!(orchestrator.tier_of(EntityKey::creature(5)), Some(RenderTier::Detailed));
    assert!(orchestrator.audit().is_empty());

    let report = orchestrator.apply_snapshot(Snapshot::from_records(2, &records), &camera, &mut uploader);
    assert_eq!(report.construction_failures, 0);
    assert_eq!(report.promotions, 1);
    assert_eq!(orchestrator.tier_of(EntityKey::creature(4)), Some(RenderTier::Detailed));
}

/// Test: A corpse turning toxic moves to the toxic partition without
/// leaking its old slot.
#[test]
fn test_toxicity_change_repartitions() {
    let mut orchestrator = UpdateOrchestrator::new(RenderConfig::default()).unwrap();
    let mut uploader = RecordingUploader::new();
    let camera = forward_camera();

    orchestrator.apply_snapshot(Snapshot::from_records(1, [&corpse_at(0, 200.0, 0.2)]), &camera, &mut uploader);
    let corpses = orchestrator.proxy(ProxyKind::Corpses);
    assert_eq!(corpses.partition_in_use(0), 1);
    assert_eq!(corpses.partition_in_use(1), 0);

    orchestrator.apply_snapshot(Snapshot::from_records(2, [&corpse_at(0, 200.0, 0.8)]), &camera, &mut uploader);
    let corpses = orchestrator.proxy(ProxyKind::Corpses);
    assert_eq!(corpses.partition_in_use(0), 0);
    assert_eq!(corpses.partition_in_use(1), 1);
    assert_eq!(corpses.stats().repartitions, 1);
    assert_eq!(corpses.len(), 1);
    assert!(orchestrator.audit().is_empty());
}

/// Test: Random churn never breaks the one-resource-per-tier invariant.
#[test]
fn test_random_churn_keeps_resources_consistent() {
    let mut cfg = RenderConfig::default();
    cfg.detail.max_detailed = 20;
    cfg.detail.recycle_limit = 8;
    cfg.proxy.creature_capacity = 64;
    cfg.proxy.plant_capacity = 64;
    cfg.proxy.corpse_capacity = 32;

    let mut orchestrator = UpdateOrchestrator::new(cfg).unwrap();
    let mut uploader = RecordingUploader::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    for tick in 1..=120u64 {
        let mut records = Vec::new();
        for n in 0..300u32 {
            if !rng.gen_bool(0.7) {
                continue;
            }
            let position = Vec3::new(rng.gen_range(-600.0..600.0), 0.0, rng.gen_range(-600.0..600.0));
            let traits = match n % 3 {
                0 => Traits::Creature(CreatureTraits {
                    activity: Activity::Moving,
                    ..CreatureTraits::default()
                }),
                1 => Traits::Plant(PlantTraits {
                    habitat: if rng.gen_bool(0.5) { Habitat::Land } else { Habitat::Water },
                    hue: 0.3,
                    maturity: 1.0,
                }),
                _ => Traits::Corpse(CorpseTraits { toxicity: rng.gen_range(0.0..1.0), decay: 0.2 }),
            };
            records.push(EntityRecord::new(n / 3, position, 1.0, traits));
        }
        let mut gone = RemovedIds::default();
        for _ in 0..10 {
            let class = EntityClass::ALL[rng.gen_range(0..3)];
            gone.push(EntityKey::new(class, rng.gen_range(0..100)));
        }

        let camera = camera_facing(rng.gen_range(0.0..std::f32::consts::TAU));
        let report = orchestrator.apply_snapshot(
            Snapshot::from_records(tick, &records).with_removed(gone),
            &camera,
            &mut uploader,
        );
        orchestrator.tick(1.0 / 60.0);

        let bad = orchestrator.audit();
        assert!(bad.is_empty(), "tick {tick}: inconsistent keys {bad:?}");

        assert!(orchestrator.detail_pool().active_count() <= 20);
        assert!(orchestrator.detail_pool().recycled_count() <= 8);
        assert_eq!(report.tiers.detailed, orchestrator.detail_pool().active_count());
        let proxied: usize = ProxyKind::ALL.iter().map(|k| orchestrator.proxy(*k).len()).sum();
        assert_eq!(report.tiers.proxy, proxied);
        assert_eq!(report.tiers.total(), orchestrator.tracked_count());

        // A frame with no snapshot from another angle.
        let turned = camera_facing(rng.gen_range(0.0..std::f32::consts::TAU));
        let report = orchestrator.refresh(&turned, &mut uploader);
        let bad = orchestrator.audit();
        assert!(bad.is_empty(), "tick {tick} refresh: inconsistent keys {bad:?}");
        assert!(orchestrator.detail_pool().active_count() <= 20);
        assert_eq!(report.tiers.total(), orchestrator.tracked_count());
    }

    let stats = orchestrator.stats();
    println!("Churn stats: {stats:?}");
    assert_eq!(stats.frames, 240);
    assert_eq!(stats.snapshots, 120);
    assert!(stats.promotions > 0 && stats.demotions > 0);
    assert!(stats.peak_detailed <= 20);
}
