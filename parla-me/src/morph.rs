//! Morph targets: named, weighted shape keys on the avatar mesh

use parking_lot::Mutex;
use std::sync::Arc;

/// A named shape key with an influence in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    name: String,
    influence: f32,
}

impl MorphTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            influence: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn influence(&self) -> f32 {
        self.influence
    }

    pub fn set_influence(&mut self, influence: f32) {
        self.influence = if influence.is_finite() {
            influence.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}

/// The morph targets of one sub-mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTargetManager {
    targets: Vec<MorphTarget>,
}

impl MorphTargetManager {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: names.into_iter().map(MorphTarget::new).collect(),
        }
    }

    pub fn targets(&self) -> &[MorphTarget] {
        &self.targets
    }

    pub fn num_targets(&self) -> usize {
        self.targets.len()
    }
}

/// Access to every morph target of an avatar, across all of its sub-meshes.
///
/// Implemented by the rendering host; the avatar core only queries and
/// mutates influences through it.
pub trait MorphTargets: Send + Sync {
    /// Number of morph target managers (one per sub-mesh that has any)
    fn manager_count(&self) -> usize;

    /// Visit every target of every manager
    fn for_each_target(&mut self, f: &mut dyn FnMut(&mut MorphTarget));
}

/// Shared handle the scheduler and the host both hold
pub type SharedMorphTargets = Arc<Mutex<dyn MorphTargets>>;

/// Zero every influence
pub fn reset_influences(morphs: &mut dyn MorphTargets) {
    morphs.for_each_target(&mut |target| target.set_influence(0.0));
}

/// In-memory avatar mesh: one [`MorphTargetManager`] per sub-mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarMesh {
    managers: Vec<MorphTargetManager>,
}

impl AvatarMesh {
    pub fn new(managers: Vec<MorphTargetManager>) -> Self {
        Self { managers }
    }

    /// Single sub-mesh carrying `names`
    pub fn with_targets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(vec![MorphTargetManager::new(names)])
    }

    pub fn into_shared(self) -> Arc<Mutex<AvatarMesh>> {
        Arc::new(Mutex::new(self))
    }

    pub fn managers(&self) -> &[MorphTargetManager] {
        &self.managers
    }

    /// Influence of the first target named `name`
    pub fn influence(&self, name: &str) -> Option<f32> {
        self.managers
            .iter()
            .flat_map(|m| m.targets.iter())
            .find(|t| t.name == name)
            .map(|t| t.influence)
    }

    /// Names of targets with non-zero influence, in mesh order
    pub fn active_targets(&self) -> Vec<&str> {
        self.managers
            .iter()
            .flat_map(|m| m.targets.iter())
            .filter(|t| t.influence > 0.0)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn target_count(&self) -> usize {
        self.managers.iter().map(|m| m.num_targets()).sum()
    }
}

impl MorphTargets for AvatarMesh {
    fn manager_count(&self) -> usize {
        self.managers.len()
    }

    fn for_each_target(&mut self, f: &mut dyn FnMut(&mut MorphTarget)) {
        for manager in &mut self.managers {
            for target in &mut manager.targets {
                f(target);
            }
        }
    }
}
