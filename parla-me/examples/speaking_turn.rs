//! One speaking turn against an in-memory avatar, with the mouth shape
//! printed as it changes.
//!
//! Run with: cargo run -p parla-me --example speaking_turn

use parla_me::{AnimationLibrary, Avatar, AvatarConfig, AvatarMesh, SharedMorphTargets, Speaker, VISEME_NAMES};
use parla_spk::{silent_wav, ScriptedTtsEngine, SpeechConfig, SynthesisSession, VisemeEvent};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mesh = AvatarMesh::with_targets(VISEME_NAMES).into_shared();
    let shared: SharedMorphTargets = mesh.clone();
    let animations = AnimationLibrary::new(["Idle", "Talk"])?;
    let avatar = Arc::new(Avatar::new(AvatarConfig::default(), shared, animations)?);
    avatar.start_idle();

    // "Hello": offsets arrive in 100ns ticks
    let track = vec![
        VisemeEvent::from_ticks(12, 0),
        VisemeEvent::from_ticks(11, 1_000_000),
        VisemeEvent::from_ticks(14, 2_500_000),
        VisemeEvent::from_ticks(13, 4_000_000),
        VisemeEvent::from_ticks(0, 6_000_000),
    ];
    let engine = ScriptedTtsEngine::new(track, silent_wav(Duration::from_millis(650), 16_000)?);
    let session = SynthesisSession::new(SpeechConfig::default(), Arc::new(engine))?;
    let speaker = Arc::new(Speaker::with_defaults(Arc::clone(&avatar), session));

    let turn = {
        let speaker = Arc::clone(&speaker);
        tokio::spawn(async move { speaker.speak("Hello").await })
    };

    let mut last = Vec::new();
    while !turn.is_finished() {
        let current: Vec<String> = mesh
            .lock()
            .active_targets()
            .into_iter()
            .map(String::from)
            .collect();
        if current != last {
            println!("{:?} {:?}", avatar.state(), current);
            last = current;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let report = turn.await??;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
