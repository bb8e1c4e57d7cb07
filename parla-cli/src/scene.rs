// Configuration file layout and in-memory scene assembly for the CLI

use anyhow::{anyhow, Context};
use parking_lot::Mutex;
use parla_core::InstanceConfig;
use parla_me::{AnimationLibrary, Avatar, AvatarConfig, AvatarMesh, MorphTargetManager, SharedMorphTargets, VISEME_NAMES};
use parla_spk::{SpeechConfig, VisemeEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything the `parla` binary reads from its config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub instance: InstanceConfig,
    pub avatar: AvatarConfig,
    pub speech: SpeechConfig,
    pub scene: SceneConfig,
}

/// Stand-in for a loaded avatar model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Morph target names, one list per sub-mesh
    pub morph_targets: Vec<Vec<String>>,
    /// Animation clip names: base model first, then additional files
    pub clips: Vec<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            morph_targets: vec![VISEME_NAMES.iter().map(|n| n.to_string()).collect()],
            clips: vec!["Idle".to_string(), "Talk".to_string()],
        }
    }
}

impl CliConfig {
    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config: CliConfig = match path {
            Some(path) => parla_core::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CliConfig::default(),
        };
        config.instance.apply_env();
        config.speech.apply_env();
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.instance.validate().map_err(|e| anyhow!("instance: {}", e))?;
        self.avatar.validate().map_err(|e| anyhow!("avatar: {}", e))?;
        self.speech.validate().map_err(|e| anyhow!("speech: {}", e))?;
        if self.scene.clips.is_empty() {
            return Err(anyhow!("scene: at least one animation clip is required"));
        }
        Ok(())
    }
}

/// Avatar built from the scene description, plus a handle on its mesh
pub struct Scene {
    pub avatar: Arc<Avatar>,
    pub mesh: Arc<Mutex<AvatarMesh>>,
}

impl Scene {
    pub fn build(config: &CliConfig) -> anyhow::Result<Self> {
        let managers = config
            .scene
            .morph_targets
            .iter()
            .map(|names| MorphTargetManager::new(names.iter().cloned()))
            .collect();
        let mesh = AvatarMesh::new(managers).into_shared();
        let shared: SharedMorphTargets = mesh.clone();

        let animations = AnimationLibrary::new(config.scene.clips.iter().cloned())?;
        let avatar = Arc::new(Avatar::new(config.avatar.clone(), shared, animations)?);
        info!("Scene ready for instance {}", config.instance.name);

        Ok(Self { avatar, mesh })
    }

    /// Names of the morph targets currently influenced
    pub fn active_targets(&self) -> Vec<String> {
        self.mesh
            .lock()
            .active_targets()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

/// Parse `id:offset_ms`
pub fn parse_viseme(s: &str) -> Result<VisemeEvent, String> {
    let (id, offset) = s
        .split_once(':')
        .ok_or_else(|| format!("expected id:offset_ms, got '{}'", s))?;
    let id: u32 = id.trim().parse().map_err(|_| format!("invalid viseme id '{}'", id))?;
    let offset: f64 = offset
        .trim()
        .parse()
        .map_err(|_| format!("invalid offset '{}'", offset))?;
    if !offset.is_finite() || offset < 0.0 {
        return Err(format!("offset must be a non-negative number, got '{}'", offset));
    }
    Ok(VisemeEvent::new(id, offset))
}

/// Track used when none is given on the command line ("Hello")
pub fn demo_track() -> Vec<VisemeEvent> {
    vec![
        VisemeEvent::new(12, 0.0),
        VisemeEvent::new(11, 100.0),
        VisemeEvent::new(14, 250.0),
        VisemeEvent::new(13, 400.0),
        VisemeEvent::new(0, 600.0),
    ]
}
