//! # Tier Assignment Tests
//!
//! Whole-population frames through the update orchestrator: who ends up
//! Detailed, who ends up as a proxy, who is culled, and why.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use verdant_rendering::{
    Camera, ProxyKind, Ray, RecordingUploader, RenderConfig, RenderTier, UpdateOrchestrator,
};
use verdant_shared::{
    CreatureTraits, EntityKey, EntityRecord, Habitat, PlantTraits, Snapshot, Traits, Vec3,
};

fn forward_camera() -> Camera {
    Camera::looking_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 1.0, 0.1, 1000.0)
}

fn creature_at(id: u32, distance: f32) -> EntityRecord {
    EntityRecord::new(
        id,
        Vec3::new(0.0, 0.0, -distance),
        1.0,
        Traits::Creature(CreatureTraits::default()),
    )
}

fn plant_at(id: u32, position: Vec3) -> EntityRecord {
    EntityRecord::new(
        id,
        position,
        2.0,
        Traits::Plant(PlantTraits { habitat: Habitat::Land, hue: 0.3, maturity: 1.0 }),
    )
}

fn config(max_detailed: usize) -> RenderConfig {
    let mut config = RenderConfig::default();
    config.lod.detail_distance = 80.0;
    config.lod.cull_distance = 500.0;
    config.detail.max_detailed = max_detailed;
    config
}

/// Test: The nearest creatures take the detailed budget, the rest fall
/// back by distance.
#[test]
fn test_nearest_hundred_are_detailed() {
    let mut records: Vec<EntityRecord> = (0..150)
        .map(|i| {
            let distance = if i < 100 {
                5.0 + i as f32 * 0.7
            } else {
                100.0 + (i - 100) as f32 * 10.0
            };
            creature_at(i, distance)
        })
        .collect();
    records.shuffle(&mut ChaCha8Rng::seed_from_u64(7));

    let mut orchestrator = UpdateOrchestrator::new(config(100)).unwrap();
    let mut uploader = RecordingUploader::new();
    let report = orchestrator.apply_snapshot(
        Snapshot::from_records(1, &records),
        &forward_camera(),
        &mut uploader,
    );

    println!("Tiers: {:?}", report.tiers);
    assert_eq!(report.tiers.detailed, 100, "budget should be filled by the nearest");
    assert_eq!(report.tiers.proxy, 40, "100..490 lie inside the cull distance");
    assert_eq!(report.tiers.culled, 10, "500 and beyond are culled");
    assert_eq!(report.promotions, 100);
    assert!(!report.degraded());

    for id in 0..100 {
        assert_eq!(orchestrator.tier_of(EntityKey::creature(id)), Some(RenderTier::Detailed));
    }
    for id in 100..140 {
        assert_eq!(orchestrator.tier_of(EntityKey::creature(id)), Some(RenderTier::Proxy));
    }
    for id in 140..150 {
        assert_eq!(orchestrator.tier_of(EntityKey::creature(id)), Some(RenderTier::Culled));
    }
    assert!(orchestrator.audit().is_empty());
}

/// Test: Entities inside the detail distance beyond the budget become
/// proxies.
#[test]
fn test_budget_overflow_falls_back_to_proxy() {
    let records: Vec<EntityRecord> = (0..20).map(|i| creature_at(i, 10.0 + i as f32 * 2.0)).collect();

    let mut orchestrator = UpdateOrchestrator::new(config(10)).unwrap();
    let report = orchestrator.apply_snapshot(
        Snapshot::from_records(1, &records),
        &forward_camera(),
        &mut RecordingUploader::new(),
    );

    assert_eq!(report.tiers.detailed, 10);
    assert_eq!(report.tiers.proxy, 10);
    for id in 0..10 {
        assert_eq!(orchestrator.tier_of(EntityKey::creature(id)), Some(RenderTier::Detailed));
    }
    for id in 10..20 {
        assert_eq!(orchestrator.tier_of(EntityKey::creature(id)), Some(RenderTier::Proxy));
        assert!(orchestrator.proxy(ProxyKind::Creatures).contains(id));
    }
    assert_eq!(orchestrator.detail_pool().active_count(), 10);
}

/// Test: A full proxy partition culls the farthest entities without
/// failing the frame.
#[test]
fn test_full_partition_culls_overflow() {
    let mut cfg = config(100);
    cfg.proxy.creature_capacity = 50;
    let records: Vec<EntityRecord> = (0..60).map(|i| creature_at(i, 100.0 + i as f32 * 5.0)).collect();

    let mut orchestrator = UpdateOrchestrator::new(cfg).unwrap();
    let report = orchestrator.apply_snapshot(
        Snapshot::from_records(1, &records),
        &forward_camera(),
        &mut RecordingUploader::new(),
    );

    println!("Overflows: {}", report.proxy_overflows);
    assert_eq!(report.tiers.proxy, 50);
    assert_eq!(report.tiers.culled, 10);
    assert_eq!(report.proxy_overflows, 10);
    assert!(report.degraded());
    for id in 50..60 {
        assert_eq!(
            orchestrator.tier_of(EntityKey::creature(id)),
            Some(RenderTier::Culled),
            "farthest entities should be the ones that miss a slot"
        );
    }
    assert_eq!(orchestrator.proxy(ProxyKind::Creatures).len(), 50);
    assert!(orchestrator.audit().is_empty());
}

/// Test: Ties at equal distance resolve the same way whatever order the
/// snapshot lists the records in.
#[test]
fn test_assignment_ignores_record_order() {
    let records: Vec<EntityRecord> = (0..10).map(|i| creature_at(i, 30.0)).collect();
    let camera = forward_camera();

    let mut reference = None;
    for seed in 0..5 {
        let mut shuffled = records.clone();
        shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

        let mut orchestrator = UpdateOrchestrator::new(config(5)).unwrap();
        orchestrator.apply_snapshot(
            Snapshot::from_records(1, &shuffled),
            &camera,
            &mut RecordingUploader::new(),
        );
        let tiers: Vec<Option<RenderTier>> =
            (0..10).map(|id| orchestrator.tier_of(EntityKey::creature(id))).collect();

        match &reference {
            None => reference = Some(tiers),
            Some(expected) => assert_eq!(&tiers, expected, "seed {seed} changed the assignment"),
        }
    }

    let tiers = reference.unwrap();
    assert!(tiers[..5].iter().all(|t| *t == Some(RenderTier::Detailed)));
    assert!(tiers[5..].iter().all(|t| *t == Some(RenderTier::Proxy)));
}

/// Test: Plants never take the detailed tier, even right next to the camera.
#[test]
fn test_plants_are_never_detailed() {
    let records = [plant_at(0, Vec3::new(0.0, 0.0, -5.0)), plant_at(1, Vec3::new(0.0, 0.0, -40.0))];

    let mut orchestrator = UpdateOrchestrator::new(config(100)).unwrap();
    let report = orchestrator.apply_snapshot(
        Snapshot::from_records(1, &records),
        &forward_camera(),
        &mut RecordingUploader::new(),
    );

    assert_eq!(report.tiers.detailed, 0);
    assert_eq!(report.tiers.proxy, 2);
    assert_eq!(orchestrator.detail_pool().active_count(), 0);
}

/// Test: Proxies outside the view are culled, unless they are inside the
/// near override distance.
#[test]
fn test_behind_camera_culled_unless_near() {
    let behind_far = creature_at(0, -200.0);
    let behind_near = creature_at(1, -5.0);
    let mut cfg = config(100);
    cfg.lod.detail_distance = 1.0;
    cfg.lod.near_override = 12.0;

    let mut orchestrator = UpdateOrchestrator::new(cfg).unwrap();
    orchestrator.apply_snapshot(
        Snapshot::from_records(1, [&behind_far, &behind_near]),
        &forward_camera(),
        &mut RecordingUploader::new(),
    );

    assert_eq!(orchestrator.tier_of(EntityKey::creature(0)), Some(RenderTier::Culled));
    assert_eq!(orchestrator.tier_of(EntityKey::creature(1)), Some(RenderTier::Proxy));
}

/// Test: Picking prefers detailed renderers and falls back to proxies.
#[test]
fn test_pick_detailed_then_proxy() {
    let records = [creature_at(0, 20.0), plant_at(0, Vec3::new(10.0, 0.0, -200.0))];

    let mut orchestrator = UpdateOrchestrator::new(config(100)).unwrap();
    orchestrator.apply_snapshot(
        Snapshot::from_records(1, &records),
        &forward_camera(),
        &mut RecordingUploader::new(),
    );

    let hit = orchestrator
        .pick(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)))
        .expect("creature on the axis");
    assert_eq!(hit.key, EntityKey::creature(0));
    assert_eq!(hit.tier, RenderTier::Detailed);
    assert!((hit.distance - 19.0).abs() < 1e-3);

    let hit = orchestrator
        .pick(&Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0)))
        .expect("plant on the offset axis");
    assert_eq!(hit.key, EntityKey::plant(0));
    assert_eq!(hit.tier, RenderTier::Proxy);
    assert_eq!(hit.record.class(), verdant_shared::EntityClass::Plant);

    assert!(orchestrator
        .pick(&Ray::new(Vec3::new(50.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0)))
        .is_none());
}
