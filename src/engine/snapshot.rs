//! Frame snapshot - Throwaway copy of the visible, enabled element tree.
//!
//! Callbacks may restructure the scene at any point during dispatch. Walks
//! therefore enumerate a snapshot taken before dispatch instead of the live
//! tree, and the live visible/enabled state is re-read per node while walking.
//!
//! Snapshot nodes are recycled through a bounded [`SnapshotPool`].
//!
//! # Example
//!
//! ```ignore
//! let mut pool = SnapshotPool::new(256);
//! let snapshot = pool.capture(&scene);
//! let hits = snapshot.hit_test(&scene, 10.0, 4.0);
//! pool.release(snapshot);
//! ```

use std::collections::{HashMap, HashSet};

use crate::area;
use crate::engine::registry::{ElementId, Scene, SceneInner};
use crate::types::Coord;

// =============================================================================
// Hit State
// =============================================================================

/// Hit result of one element for one touch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitState {
    /// Something painted above the element, or one of its own
    /// post-children, covers the point.
    pub covered: bool,
    /// Covered only by the element's own post-children, not from above.
    pub covered_by_descendant: bool,
}

impl HitState {
    /// Whether the touch counts as inside the element.
    pub fn is_touch_in(&self) -> bool {
        !self.covered || self.covered_by_descendant
    }
}

/// Elements whose interaction area contains a point, in walk order
/// (topmost subtree first, each element after its children).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitMap {
    entries: Vec<(ElementId, HitState)>,
    index: HashMap<ElementId, usize>,
}

impl HitMap {
    fn insert(&mut self, element: ElementId, state: HitState) {
        if self.index.contains_key(&element) {
            return;
        }
        self.index.insert(element, self.entries.len());
        self.entries.push((element, state));
    }

    pub fn get(&self, element: ElementId) -> Option<HitState> {
        self.index.get(&element).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.index.contains_key(&element)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, HitState)> + '_ {
        self.entries.iter().copied()
    }

    /// Elements the touch counts as inside, in walk order.
    pub fn touch_in(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries
            .iter()
            .filter(|(_, state)| state.is_touch_in())
            .map(|(element, _)| *element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug)]
pub(crate) struct SnapshotNode {
    element: ElementId,
    pre: Vec<usize>,
    post: Vec<usize>,
}

/// Copy of the scene's visible and enabled subtree at one structural version.
#[derive(Debug)]
pub struct FrameSnapshot {
    nodes: Vec<SnapshotNode>,
    root: Option<usize>,
    members: HashSet<ElementId>,
    version: u64,
}

impl FrameSnapshot {
    /// Structural version of the scene when this snapshot was taken.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Elements that were visible, enabled and in the tree at capture.
    pub fn members(&self) -> &HashSet<ElementId> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hit test every captured element at `(x, y)`.
    ///
    /// Capability callbacks (`interaction_area` / `cover_area`) run without
    /// any scene borrow held.
    pub fn hit_test(&self, scene: &Scene, x: Coord, y: Coord) -> HitMap {
        let mut map = HitMap::default();
        if let Some(root) = self.root {
            self.extract(scene, root, x, y, false, &mut map);
        }
        map
    }

    /// Returns whether anything in this subtree covers the point.
    fn extract(
        &self,
        scene: &Scene,
        index: usize,
        x: Coord,
        y: Coord,
        covered_from_above: bool,
        map: &mut HitMap,
    ) -> bool {
        let node = &self.nodes[index];
        let element = node.element;

        // Live state may have changed since capture
        let live = scene.with_inner(|inner| {
            inner
                .node(element)
                .is_some_and(|node| node.visible && node.enabled)
        });
        if !live {
            return false;
        }

        let interaction = scene.interaction(element);

        // Post-children paint above, last one on top
        let mut covered_by_post = false;
        for &child in node.post.iter().rev() {
            covered_by_post |=
                self.extract(scene, child, x, y, covered_from_above || covered_by_post, map);
        }

        let covered_by_self = interaction
            .as_ref()
            .is_some_and(|i| area::contains(i.cover_area().as_ref(), x, y));

        let mut covered_by_pre = false;
        for &child in node.pre.iter().rev() {
            let covered = covered_from_above || covered_by_post || covered_by_self || covered_by_pre;
            covered_by_pre |= self.extract(scene, child, x, y, covered, map);
        }

        if let Some(interaction) = interaction {
            if area::contains(interaction.interaction_area().as_ref(), x, y) {
                map.insert(
                    element,
                    HitState {
                        covered: covered_from_above || covered_by_post,
                        covered_by_descendant: covered_by_post && !covered_from_above,
                    },
                );
            }
        }

        covered_by_post || covered_by_self || covered_by_pre
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Bounded free list of snapshot nodes.
#[derive(Debug)]
pub struct SnapshotPool {
    free: Vec<SnapshotNode>,
    capacity: usize,
}

impl SnapshotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Number of nodes waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Copy the scene's visible and enabled subtree.
    pub fn capture(&mut self, scene: &Scene) -> FrameSnapshot {
        let version = scene.structural_version();
        let mut nodes = Vec::new();
        let mut members = HashSet::new();

        let root = scene.with_inner(|inner| {
            self.copy_subtree(inner, inner.root(), &mut nodes, &mut members)
        });

        tracing::trace!(nodes = nodes.len(), version, "captured frame snapshot");
        FrameSnapshot {
            nodes,
            root,
            members,
            version,
        }
    }

    /// Return a snapshot's nodes to the pool.
    pub fn release(&mut self, snapshot: FrameSnapshot) {
        for mut node in snapshot.nodes {
            if self.free.len() >= self.capacity {
                break;
            }
            node.pre.clear();
            node.post.clear();
            self.free.push(node);
        }
    }

    fn take_node(&mut self, element: ElementId) -> SnapshotNode {
        match self.free.pop() {
            Some(mut node) => {
                node.element = element;
                node
            }
            None => SnapshotNode {
                element,
                pre: Vec::new(),
                post: Vec::new(),
            },
        }
    }

    fn copy_subtree(
        &mut self,
        inner: &SceneInner,
        element: ElementId,
        nodes: &mut Vec<SnapshotNode>,
        members: &mut HashSet<ElementId>,
    ) -> Option<usize> {
        let source = inner.node(element)?;
        if !source.visible || !source.enabled {
            return None;
        }

        let slot = nodes.len();
        let node = self.take_node(element);
        nodes.push(node);
        members.insert(element);

        for &child in &source.pre_children {
            if let Some(child_slot) = self.copy_subtree(inner, child, nodes, members) {
                nodes[slot].pre.push(child_slot);
            }
        }
        for &child in &source.post_children {
            if let Some(child_slot) = self.copy_subtree(inner, child, nodes, members) {
                nodes[slot].post.push(child_slot);
            }
        }

        Some(slot)
    }
}
