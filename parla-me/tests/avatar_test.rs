//! Avatar animation tests: timed cross-fades and clip playback

use parla_me::{
    AnimationLibrary, Avatar, AvatarConfig, AvatarEvent, AvatarMesh, AvatarState, BlendTiming,
    SharedMorphTargets,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn avatar_with(config: AvatarConfig) -> Arc<Avatar> {
    let mesh: SharedMorphTargets = AvatarMesh::with_targets(["viseme_aa"]).into_shared();
    let animations = AnimationLibrary::new(["Idle", "Talk", "Wave"]).unwrap();
    Arc::new(Avatar::new(config, mesh, animations).unwrap())
}

fn weight(avatar: &Avatar, clip: &str) -> f32 {
    avatar.animations().lock().get(clip).unwrap().weight()
}

#[tokio::test(start_paused = true)]
async fn test_timed_blend_idle_to_talk() {
    let avatar = avatar_with(AvatarConfig::default());
    let mut events = avatar.subscribe();
    avatar.start_idle();

    avatar.spawn_blend("Idle", "Talk", 2.0).unwrap();

    sleep(Duration::from_millis(1000)).await;
    let (idle, talk) = (weight(&avatar, "Idle"), weight(&avatar, "Talk"));
    assert!((idle - 0.5).abs() < 0.02, "idle weight {}", idle);
    assert!((talk - 0.5).abs() < 0.02, "talk weight {}", talk);
    assert!((idle + talk - 1.0).abs() < 1e-5);
    assert!(avatar.is_blending());

    sleep(Duration::from_millis(1050)).await;
    let animations = avatar.animations();
    let animations = animations.lock();
    assert!(!animations.get("Idle").unwrap().is_playing());
    assert_eq!(animations.get("Talk").unwrap().weight(), 1.0);
    assert_eq!(animations.get("Talk").unwrap().speed(), 2.0);
    drop(animations);

    assert!(!avatar.is_blending());
    assert_eq!(
        events.recv().await.unwrap(),
        AvatarEvent::BlendFinished {
            source: "Idle".to_string(),
            target: "Talk".to_string(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_blend() {
    let config = AvatarConfig {
        blend_timing: BlendTiming::ElapsedTime,
        assumed_frame_rate: 30.0,
        ..AvatarConfig::default()
    };
    let avatar = avatar_with(config);

    avatar.spawn_blend("Idle", "Talk", 1.0).unwrap();
    sleep(Duration::from_millis(500)).await;
    assert!((weight(&avatar, "Talk") - 0.5).abs() < 0.05);

    sleep(Duration::from_millis(600)).await;
    assert!(!avatar.is_blending());
    assert_eq!(weight(&avatar, "Talk"), 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_new_blend_replaces_running_one() {
    let avatar = avatar_with(AvatarConfig::default());

    avatar.spawn_blend("Idle", "Talk", 2.0).unwrap();
    sleep(Duration::from_millis(500)).await;

    avatar.spawn_blend("Talk", "Wave", 1.0).unwrap();
    sleep(Duration::from_millis(1100)).await;

    let animations = avatar.animations();
    let animations = animations.lock();
    assert_eq!(animations.playing(), vec!["Idle", "Wave"]);
    assert!(!animations.get("Talk").unwrap().is_playing());
    assert_eq!(animations.get("Wave").unwrap().weight(), 1.0);
    // The first blend was abandoned partway
    let idle = animations.get("Idle").unwrap().weight();
    assert!(idle > 0.0 && idle < 1.0, "idle weight {}", idle);
}

#[tokio::test]
async fn test_blend_with_unknown_clip_is_noop() {
    let avatar = avatar_with(AvatarConfig::default());
    avatar.start_idle();

    assert!(avatar.spawn_blend("Idle", "Dance", 1.0).is_err());
    assert!(!avatar.is_blending());
    assert_eq!(avatar.animations().lock().playing(), vec!["Idle"]);
}

#[tokio::test]
async fn test_missing_talk_clip_leaves_nothing_playing() {
    let config = AvatarConfig {
        talk_clip: "Talking".to_string(),
        ..AvatarConfig::default()
    };
    let avatar = avatar_with(config);
    avatar.start_idle();

    avatar.speaking_started();
    assert_eq!(avatar.state(), AvatarState::Talking);
    assert!(avatar.animations().lock().playing().is_empty());

    avatar.speaking_ended();
    assert_eq!(avatar.animations().lock().playing(), vec!["Idle"]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_blend_keeps_running_blend() {
    let avatar = avatar_with(AvatarConfig::default());
    let mut events = avatar.subscribe();

    avatar.spawn_blend("Idle", "Talk", 1.0).unwrap();
    sleep(Duration::from_millis(300)).await;

    assert!(avatar.spawn_blend("Idle", "Dance", 1.0).is_err());
    assert!(avatar.blend("Idle", "Talk", 0.0).is_err());
    assert!(avatar.spawn_blend("Talk", "Talk", 1.0).is_err());

    sleep(Duration::from_millis(800)).await;
    assert!(!avatar.is_blending());
    assert!(!avatar.animations().lock().get("Idle").unwrap().is_playing());
    assert_eq!(weight(&avatar, "Talk"), 1.0);
    assert!(matches!(
        events.recv().await.unwrap(),
        AvatarEvent::BlendFinished { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_timed_blend_steps_immediately() {
    let avatar = avatar_with(AvatarConfig::default());

    avatar.spawn_blend("Idle", "Talk", 2.0).unwrap();
    sleep(Duration::from_millis(1)).await;

    let talk = weight(&avatar, "Talk");
    assert!((talk - 1.0 / 120.0).abs() < 1e-4, "talk weight {}", talk);
}
