//! Scene housekeeping: drop masked or unmasked volumes in bulk.

use tracing::info;

use crate::mask::MASKED_MARKER;
use crate::scene::{NodeId, Scene};

fn remove_volumes_where(scene: &mut Scene, keep_masked: bool) -> Vec<NodeId> {
    let doomed: Vec<NodeId> = scene
        .volume_ids()
        .into_iter()
        .filter(|&id| {
            let masked = scene
                .name(id)
                .is_ok_and(|name| name.contains(MASKED_MARKER));
            masked != keep_masked
        })
        .collect();

    for &id in &doomed {
        if let Some(node) = scene.remove_node(id) {
            info!("removed {}", node.name);
        }
    }
    doomed
}

/// Remove every volume whose name contains "masked".
pub fn clear_masked_volumes(scene: &mut Scene) -> Vec<NodeId> {
    remove_volumes_where(scene, false)
}

/// Remove every volume whose name does not contain "masked".
pub fn clear_unmasked_volumes(scene: &mut Scene) -> Vec<NodeId> {
    remove_volumes_where(scene, true)
}
