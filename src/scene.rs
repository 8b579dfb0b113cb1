//! Minimal in-memory scene: named nodes, string attributes and parent
//! transform links.
//!
//! Nodes are kept in insertion order, which is also the order returned by
//! every query.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{FlexCropError, Result};
use crate::geometry::Matrix;
use crate::region::Region;
use crate::transform::LinearTransform;
use crate::volume::Volume;

/// Attribute set to `"1"` on label-map volumes.
pub const LABEL_MAP_ATTRIBUTE: &str = "LabelMap";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Volume(Volume),
    Region(Region),
    Transform(LinearTransform),
}

impl NodeData {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeData::Volume(_) => "volume",
            NodeData::Region(_) => "region",
            NodeData::Transform(_) => "transform",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub parent_transform: Option<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn new(name: impl Into<String>, data: NodeData) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            parent_transform: None,
            data,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn is_label_map(&self) -> bool {
        self.attribute(LABEL_MAP_ATTRIBUTE) == Some("1")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn add_volume(&mut self, name: impl Into<String>, volume: Volume) -> NodeId {
        self.add_node(Node::new(name, NodeData::Volume(volume)))
    }

    pub fn add_region(&mut self, name: impl Into<String>, region: Region) -> NodeId {
        self.add_node(Node::new(name, NodeData::Region(region)))
    }

    /// Create an identity linear transform node.
    pub fn create_transform(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(Node::new(
            name,
            NodeData::Transform(LinearTransform::identity()),
        ))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(FlexCropError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FlexCropError::NodeNotFound(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.name.as_str())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.node_mut(id)?.attributes.insert(key.into(), value.into());
        Ok(())
    }

    /// First node with exactly this name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Nodes whose attribute `key` equals `value`.
    pub fn nodes_with_attribute<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes()
            .filter(move |(_, node)| node.attribute(key) == Some(value))
            .map(|(id, _)| id)
    }

    pub fn volume(&self, id: NodeId) -> Result<&Volume> {
        match &self.node(id)?.data {
            NodeData::Volume(volume) => Ok(volume),
            _ => Err(FlexCropError::WrongNodeKind {
                id,
                expected: "volume",
            }),
        }
    }

    pub fn volume_mut(&mut self, id: NodeId) -> Result<&mut Volume> {
        match &mut self.node_mut(id)?.data {
            NodeData::Volume(volume) => Ok(volume),
            _ => Err(FlexCropError::WrongNodeKind {
                id,
                expected: "volume",
            }),
        }
    }

    pub fn region(&self, id: NodeId) -> Result<&Region> {
        match &self.node(id)?.data {
            NodeData::Region(region) => Ok(region),
            _ => Err(FlexCropError::WrongNodeKind {
                id,
                expected: "region",
            }),
        }
    }

    pub fn transform(&self, id: NodeId) -> Result<&LinearTransform> {
        match &self.node(id)?.data {
            NodeData::Transform(transform) => Ok(transform),
            _ => Err(FlexCropError::WrongNodeKind {
                id,
                expected: "transform",
            }),
        }
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut LinearTransform> {
        match &mut self.node_mut(id)?.data {
            NodeData::Transform(transform) => Ok(transform),
            _ => Err(FlexCropError::WrongNodeKind {
                id,
                expected: "transform",
            }),
        }
    }

    /// All volume nodes, label maps included.
    pub fn volume_ids(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| matches!(node.data, NodeData::Volume(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Volume nodes that are not label maps.
    pub fn scalar_volume_ids(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| matches!(node.data, NodeData::Volume(_)) && !node.is_label_map())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn parent_transform(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent_transform)
    }

    /// Nest `id` under `parent`, or detach it with `None`.
    pub fn set_parent_transform(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.node(id)?;
        if let Some(parent) = parent {
            self.transform(parent)?;
            // Walking up from the new parent must never reach `id`.
            let mut seen = HashSet::new();
            let mut current = Some(parent);
            while let Some(step) = current {
                if step == id || !seen.insert(step) {
                    return Err(FlexCropError::TransformCycle(id));
                }
                current = self.node(step)?.parent_transform;
            }
        }
        self.node_mut(id)?.parent_transform = parent;
        Ok(())
    }

    /// Matrix taking coordinates of children of `transform` into world.
    pub fn matrix_transform_to_world(&self, transform: NodeId) -> Result<Matrix> {
        let mut matrix = Matrix::identity();
        let mut seen = HashSet::new();
        let mut current = Some(transform);
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(FlexCropError::TransformCycle(id));
            }
            matrix = self.transform(id)?.to_parent * matrix;
            current = self.node(id)?.parent_transform;
        }
        Ok(matrix)
    }

    /// Matrix taking the space under `from` into the space under `to`.
    /// `None` on either side stands for world.
    pub fn matrix_transform_to_node(&self, from: Option<NodeId>, to: Option<NodeId>) -> Result<Matrix> {
        let from_to_world = match from {
            Some(id) => self.matrix_transform_to_world(id)?,
            None => Matrix::identity(),
        };
        let to_to_world = match to {
            Some(id) => self.matrix_transform_to_world(id)?,
            None => return Ok(from_to_world),
        };
        let world_to_target = to_to_world
            .try_inverse()
            .ok_or(FlexCropError::SingularTransform)?;
        Ok(world_to_target * from_to_world)
    }

    /// Deep copy of a volume node under a new name. The copy keeps the
    /// source's geometry, attributes and parent transform.
    pub fn clone_volume(&mut self, id: NodeId, name: impl Into<String>) -> Result<NodeId> {
        self.volume(id)?;
        let mut node = self.node(id)?.clone();
        node.name = name.into();
        Ok(self.add_node(node))
    }

    /// Remove a node. Links from other nodes to a removed transform are
    /// cleared.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = self.nodes.remove(&id)?;
        if matches!(removed.data, NodeData::Transform(_)) {
            for node in self.nodes.values_mut() {
                if node.parent_transform == Some(id) {
                    node.parent_transform = None;
                }
            }
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, Vector3};

    fn translation(x: f64, y: f64, z: f64) -> LinearTransform {
        LinearTransform::new(Translation3::new(x, y, z).to_homogeneous())
    }

    #[test]
    fn transform_chain_accumulates_to_world() {
        let mut scene = Scene::new();
        let outer = scene.add_node(Node::new("outer", NodeData::Transform(translation(1.0, 0.0, 0.0))));
        let inner = scene.add_node(Node::new("inner", NodeData::Transform(translation(0.0, 2.0, 0.0))));
        scene.set_parent_transform(inner, Some(outer)).unwrap();

        let to_world = scene.matrix_transform_to_world(inner).unwrap();
        assert_eq!(to_world.fixed_view::<3, 1>(0, 3).into_owned(), Vector3::new(1.0, 2.0, 0.0));

        let inner_to_outer = scene.matrix_transform_to_node(Some(inner), Some(outer)).unwrap();
        assert_eq!(inner_to_outer.fixed_view::<3, 1>(0, 3).into_owned(), Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_transform("a");
        let b = scene.create_transform("b");
        scene.set_parent_transform(b, Some(a)).unwrap();
        assert!(matches!(
            scene.set_parent_transform(a, Some(b)),
            Err(FlexCropError::TransformCycle(_))
        ));
        assert!(matches!(
            scene.set_parent_transform(a, Some(a)),
            Err(FlexCropError::TransformCycle(_))
        ));
    }

    #[test]
    fn only_transforms_can_be_parents() {
        let mut scene = Scene::new();
        let volume = scene.add_volume("v", Volume::default());
        let other = scene.add_volume("w", Volume::default());
        assert!(matches!(
            scene.set_parent_transform(volume, Some(other)),
            Err(FlexCropError::WrongNodeKind { .. })
        ));
    }

    #[test]
    fn removing_transform_detaches_children() {
        let mut scene = Scene::new();
        let transform = scene.create_transform("t");
        let volume = scene.add_volume("v", Volume::default());
        scene.set_parent_transform(volume, Some(transform)).unwrap();
        assert!(scene.remove_node(transform).is_some());
        assert_eq!(scene.parent_transform(volume).unwrap(), None);
        assert!(scene.remove_node(transform).is_none());
    }

    #[test]
    fn clone_volume_copies_links_and_attributes() {
        let mut scene = Scene::new();
        let transform = scene.create_transform("t");
        let volume = scene.add_volume("v", Volume::default());
        scene.set_attribute(volume, "Modality", "CT").unwrap();
        scene.set_parent_transform(volume, Some(transform)).unwrap();

        let copy = scene.clone_volume(volume, "v copy").unwrap();
        let node = scene.node(copy).unwrap();
        assert_eq!(node.name, "v copy");
        assert_eq!(node.attribute("Modality"), Some("CT"));
        assert_eq!(node.parent_transform, Some(transform));
        assert!(scene.clone_volume(transform, "nope").is_err());
    }

    #[test]
    fn label_maps_are_not_scalar_volumes() {
        let mut scene = Scene::new();
        let ct = scene.add_volume("ct", Volume::default());
        let labels = scene.add_volume("labels", Volume::default());
        scene.set_attribute(labels, LABEL_MAP_ATTRIBUTE, "1").unwrap();
        scene.create_transform("t");

        assert_eq!(scene.volume_ids(), vec![ct, labels]);
        assert_eq!(scene.scalar_volume_ids(), vec![ct]);
        assert_eq!(scene.nodes_with_attribute(LABEL_MAP_ATTRIBUTE, "1").collect::<Vec<_>>(), vec![labels]);
    }
}
