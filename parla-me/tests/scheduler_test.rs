//! Timed viseme replay tests for VisemeScheduler

use parking_lot::Mutex;
use parla_me::{AvatarConfig, AvatarMesh, SharedMorphTargets, VisemeScheduler, VISEME_NAMES};
use parla_spk::VisemeEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn setup() -> (VisemeScheduler, Arc<Mutex<AvatarMesh>>) {
    let mesh = AvatarMesh::with_targets(VISEME_NAMES).into_shared();
    let shared: SharedMorphTargets = mesh.clone();
    (VisemeScheduler::new(&AvatarConfig::default(), shared), mesh)
}

fn active(mesh: &Arc<Mutex<AvatarMesh>>) -> Vec<String> {
    mesh.lock()
        .active_targets()
        .into_iter()
        .map(String::from)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_replay_follows_offsets() {
    let (scheduler, mesh) = setup();
    scheduler.record(10, 0.0);
    scheduler.record(11, 100.0);
    scheduler.record(0, 500.0);

    let replay = scheduler.play();
    assert_eq!(replay.len(), 3);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(active(&mesh), vec!["viseme_aa"]);
    assert_eq!(mesh.lock().influence("viseme_aa"), Some(0.6));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(active(&mesh), vec!["viseme_E"]);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(active(&mesh), vec!["viseme_sil"]);

    replay.finished().await;
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_offsets_fire_by_time() {
    let (scheduler, mesh) = setup();
    scheduler.record(13, 200.0);
    scheduler.record(12, 50.0);

    let replay = scheduler.play();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(active(&mesh), vec!["viseme_I"]);

    replay.finished().await;
    assert_eq!(active(&mesh), vec!["viseme_O"]);
}

#[tokio::test(start_paused = true)]
async fn test_unmapped_ids_are_skipped() {
    let (scheduler, mesh) = setup();
    scheduler.record(10, 0.0);
    scheduler.record(21, 100.0);

    let replay = scheduler.play();
    replay.finished().await;

    // The unmapped id left the previous viseme in place
    assert_eq!(active(&mesh), vec!["viseme_aa"]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_pending_timers() {
    let (scheduler, mesh) = setup();
    scheduler.record(10, 0.0);
    scheduler.record(11, 100.0);
    scheduler.record(0, 500.0);

    let replay = scheduler.play();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(active(&mesh), vec!["viseme_aa"]);

    scheduler.reset();
    assert!(active(&mesh).is_empty());
    assert!(scheduler.is_empty());

    // Stale timers still fire but must not touch the mesh
    replay.finished().await;
    assert!(active(&mesh).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_turn_unaffected_by_stale_timers() {
    let (scheduler, mesh) = setup();
    scheduler.record(10, 300.0);
    let stale = scheduler.play();

    scheduler.reset();
    scheduler.record(14, 400.0);
    let current = scheduler.play();
    assert_ne!(stale.generation(), current.generation());

    sleep(Duration::from_millis(350)).await;
    assert!(active(&mesh).is_empty());

    current.finished().await;
    stale.finished().await;
    assert_eq!(active(&mesh), vec!["viseme_U"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_targets_do_not_stop_replay() {
    let mesh = AvatarMesh::with_targets(["viseme_aa", "viseme_sil"]).into_shared();
    let shared: SharedMorphTargets = mesh.clone();
    let scheduler = VisemeScheduler::new(&AvatarConfig::default(), shared);

    scheduler.record(10, 0.0);
    scheduler.record(11, 100.0);
    scheduler.record(0, 200.0);
    scheduler.play().finished().await;

    assert_eq!(active(&mesh), vec!["viseme_sil"]);
}

#[tokio::test]
async fn test_replay_without_morph_targets() {
    let mesh: SharedMorphTargets = AvatarMesh::default().into_shared();
    let scheduler = VisemeScheduler::new(&AvatarConfig::default(), mesh);

    scheduler.record(10, 0.0);
    scheduler.play().finished().await;
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unschedulable_offsets_are_skipped() {
    let (scheduler, mesh) = setup();
    scheduler.record(11, 1e30);
    scheduler.record_event(VisemeEvent { id: 12, offset_ms: f64::INFINITY });
    scheduler.record_event(VisemeEvent { id: 13, offset_ms: f64::NAN });
    scheduler.record(10, 100.0);

    let replay = scheduler.play();
    assert_eq!(replay.len(), 1);

    replay.finished().await;
    assert_eq!(active(&mesh), vec!["viseme_aa"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_races_with_firing_timers() {
    let (scheduler, mesh) = setup();

    for _ in 0..200 {
        for id in 0..15 {
            scheduler.record(id, 0.0);
        }
        let replay = scheduler.play();
        tokio::task::yield_now().await;
        scheduler.reset();

        // Whatever fired before the reset was cleared; nothing fires after it
        replay.finished().await;
        assert!(active(&mesh).is_empty());
    }
}
