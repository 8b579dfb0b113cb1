//! Headless state of the masking and registration forms: which controls are
//! enabled and what the buttons do.

use crate::enums::{BlankRegion, MaskMode};
use crate::error::Result;
use crate::mask::run_masking;
use crate::registration::{RegistrationEngine, RegistrationLogic};
use crate::scene::{NodeId, Scene};

/// Volumes offered by the volume selectors: label maps are hidden.
pub fn selectable_volumes(scene: &Scene) -> Vec<NodeId> {
    scene.scalar_volume_ids()
}

#[derive(Clone, Debug, Default)]
pub struct MaskForm {
    pub volumes: Vec<NodeId>,
    pub region: Option<NodeId>,
    pub in_place: bool,
    pub blank: BlankRegion,
}

impl MaskForm {
    pub fn apply_enabled(&self) -> bool {
        !self.volumes.is_empty()
    }

    pub fn mode(&self) -> MaskMode {
        if self.in_place {
            MaskMode::InPlace
        } else {
            MaskMode::Clone
        }
    }

    /// Returns `Ok(None)` when no volume is checked or no region is selected.
    pub fn apply(&self, scene: &mut Scene) -> Result<Option<Vec<NodeId>>> {
        let Some(region) = self.region.filter(|_| self.apply_enabled()) else {
            return Ok(None);
        };
        run_masking(scene, region, &self.volumes, self.mode(), self.blank).map(Some)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RegistrationForm {
    pub target: Option<NodeId>,
    pub moving: Vec<NodeId>,
}

impl RegistrationForm {
    pub fn register_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Returns `Ok(None)` when no target is selected.
    pub fn register<E: RegistrationEngine>(
        &self,
        scene: &mut Scene,
        logic: &RegistrationLogic<E>,
    ) -> Result<Option<Vec<NodeId>>> {
        let Some(target) = self.target else {
            return Ok(None);
        };
        logic.run_registration(scene, target, &self.moving).map(Some)
    }
}
