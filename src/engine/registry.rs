//! Element Registry - Arena-backed element tree.
//!
//! Manages the lifecycle of elements the touch engine walks:
//! - Generational ids over a recycled index pool
//! - Ordered pre-children (painted below) and post-children (painted above)
//! - Visibility / enablement flags
//! - One optional interaction capability per element
//! - Structural version counter, bumped on every shape or visibility change
//!
//! [`Scene`] is a cheap handle; clones share the same tree. No borrow is ever
//! held across a capability callback, so callbacks may mutate the scene they
//! are dispatched from.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::error::SceneError;
use crate::touch::TouchInteraction;

// =============================================================================
// Element Id
// =============================================================================

/// Stable handle of an element.
///
/// Indices are reused after [`Scene::despawn`]; the generation makes ids of
/// despawned elements stop resolving instead of aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Which child list an element is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLayer {
    /// Painted before (below) the parent
    Pre,
    /// Painted after (above) the parent
    Post,
}

// =============================================================================
// Registry State
// =============================================================================

pub(crate) struct ElementNode {
    pub(crate) parent: Option<ElementId>,
    pub(crate) pre_children: Vec<ElementId>,
    pub(crate) post_children: Vec<ElementId>,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    interaction: Option<Rc<dyn TouchInteraction>>,
}

impl ElementNode {
    fn new(interaction: Option<Rc<dyn TouchInteraction>>) -> Self {
        Self {
            parent: None,
            pre_children: Vec::new(),
            post_children: Vec::new(),
            visible: true,
            enabled: true,
            interaction,
        }
    }

    fn children_mut(&mut self, layer: ChildLayer) -> &mut Vec<ElementId> {
        match layer {
            ChildLayer::Pre => &mut self.pre_children,
            ChildLayer::Post => &mut self.post_children,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<ElementNode>,
}

pub(crate) struct SceneInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ElementId,
}

impl SceneInner {
    pub(crate) fn node(&self, id: ElementId) -> Option<&ElementNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut ElementNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub(crate) fn root(&self) -> ElementId {
        self.root
    }

    fn allocate(&mut self, node: ElementNode) -> ElementId {
        // Reuse free index or allocate new
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            ElementId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, node: Some(node) });
            ElementId { index, generation: 0 }
        }
    }

    /// Release one slot back to the pool, returning what it held.
    fn release(&mut self, id: ElementId) -> Option<ElementNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    fn is_ancestor_or_self(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.node(id).and_then(|node| node.parent);
        }
        false
    }

    fn unlink_from_parent(&mut self, child: ElementId) -> bool {
        let Some(parent) = self.node(child).and_then(|node| node.parent) else {
            return false;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.pre_children.retain(|&id| id != child);
            parent_node.post_children.retain(|&id| id != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        true
    }
}

// =============================================================================
// Scene
// =============================================================================

/// Shared handle to an element tree.
#[derive(Clone)]
pub struct Scene {
    inner: Rc<RefCell<SceneInner>>,
    version: Signal<u64>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root())
            .field("len", &self.len())
            .field("structural_version", &self.structural_version())
            .finish()
    }
}

// The root is never released, so there is no `is_empty`
#[allow(clippy::len_without_is_empty)]
impl Scene {
    /// Create a scene holding only a visible, enabled root.
    pub fn new() -> Self {
        let mut inner = SceneInner {
            slots: Vec::new(),
            free: Vec::new(),
            root: ElementId { index: 0, generation: 0 },
        };
        inner.root = inner.allocate(ElementNode::new(None));

        Self {
            inner: Rc::new(RefCell::new(inner)),
            version: signal(0),
        }
    }

    /// Whether two handles point at the same tree.
    pub fn ptr_eq(&self, other: &Scene) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&SceneInner) -> R) -> R {
        f(&self.inner.borrow())
    }

    fn bump_version(&self) {
        self.version.set(self.version.get() + 1);
    }

    // -------------------------------------------------------------------------
    // Element lifecycle
    // -------------------------------------------------------------------------

    /// The root element.
    pub fn root(&self) -> ElementId {
        self.inner.borrow().root
    }

    /// Create a detached element with an interaction capability.
    pub fn spawn(&self, interaction: impl TouchInteraction + 'static) -> ElementId {
        self.spawn_shared(Some(Rc::new(interaction)))
    }

    /// Create a detached element without touch behavior (a plain container).
    pub fn spawn_empty(&self) -> ElementId {
        self.spawn_shared(None)
    }

    /// Create a detached element from an already shared capability.
    pub fn spawn_shared(&self, interaction: Option<Rc<dyn TouchInteraction>>) -> ElementId {
        self.inner.borrow_mut().allocate(ElementNode::new(interaction))
    }

    /// Remove an element and its whole subtree. Their ids stop resolving.
    pub fn despawn(&self, id: ElementId) -> Result<(), SceneError> {
        let released = {
            let mut inner = self.inner.borrow_mut();
            if id == inner.root {
                return Err(SceneError::RootIsFixed);
            }
            if inner.node(id).is_none() {
                return Err(SceneError::UnknownElement(id));
            }
            inner.unlink_from_parent(id);

            // Collect first, then release, so children never see a half-freed parent
            let mut pending = vec![id];
            let mut released = Vec::new();
            while let Some(current) = pending.pop() {
                if let Some(node) = inner.release(current) {
                    pending.extend(node.pre_children.iter().copied());
                    pending.extend(node.post_children.iter().copied());
                    released.push(node);
                }
            }
            released
        };

        tracing::trace!(element = %id, released = released.len(), "despawned subtree");
        // Capabilities drop here, outside the borrow
        drop(released);
        self.bump_version();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tree structure
    // -------------------------------------------------------------------------

    /// Append `child` to `parent`'s pre-children (painted below `parent`).
    pub fn add_pre_child(&self, parent: ElementId, child: ElementId) -> Result<(), SceneError> {
        self.attach(parent, child, ChildLayer::Pre, None)
    }

    /// Append `child` to `parent`'s post-children (painted above `parent`).
    pub fn add_post_child(&self, parent: ElementId, child: ElementId) -> Result<(), SceneError> {
        self.attach(parent, child, ChildLayer::Post, None)
    }

    /// Attach `child` to `parent` in `layer`, at `index` or at the end.
    ///
    /// Later siblings paint above earlier ones.
    pub fn attach(
        &self,
        parent: ElementId,
        child: ElementId,
        layer: ChildLayer,
        index: Option<usize>,
    ) -> Result<(), SceneError> {
        {
            let mut inner = self.inner.borrow_mut();
            if child == inner.root {
                return Err(SceneError::RootIsFixed);
            }
            if inner.node(parent).is_none() {
                return Err(SceneError::UnknownElement(parent));
            }
            let Some(child_node) = inner.node(child) else {
                return Err(SceneError::UnknownElement(child));
            };
            if let Some(existing) = child_node.parent {
                return Err(SceneError::AlreadyAttached { child, parent: existing });
            }
            if inner.is_ancestor_or_self(child, parent) {
                return Err(SceneError::WouldCreateCycle { child, parent });
            }

            if let Some(parent_node) = inner.node_mut(parent) {
                let children = parent_node.children_mut(layer);
                let at = index.unwrap_or(children.len()).min(children.len());
                children.insert(at, child);
            }
            if let Some(child_node) = inner.node_mut(child) {
                child_node.parent = Some(parent);
            }
        }
        self.bump_version();
        Ok(())
    }

    /// Detach an element from its parent. It stays alive and can be re-attached.
    ///
    /// Returns whether the element had a parent.
    pub fn detach(&self, id: ElementId) -> Result<bool, SceneError> {
        let detached = {
            let mut inner = self.inner.borrow_mut();
            if id == inner.root {
                return Err(SceneError::RootIsFixed);
            }
            if inner.node(id).is_none() {
                return Err(SceneError::UnknownElement(id));
            }
            inner.unlink_from_parent(id)
        };
        if detached {
            self.bump_version();
        }
        Ok(detached)
    }

    // -------------------------------------------------------------------------
    // Element state
    // -------------------------------------------------------------------------

    /// Show or hide an element (and with it, its subtree).
    pub fn set_visible(&self, id: ElementId, visible: bool) -> Result<(), SceneError> {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let node = inner.node_mut(id).ok_or(SceneError::UnknownElement(id))?;
            let changed = node.visible != visible;
            node.visible = visible;
            changed
        };
        if changed {
            self.bump_version();
        }
        Ok(())
    }

    /// Enable or disable an element (and with it, its subtree).
    pub fn set_enabled(&self, id: ElementId, enabled: bool) -> Result<(), SceneError> {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let node = inner.node_mut(id).ok_or(SceneError::UnknownElement(id))?;
            let changed = node.enabled != enabled;
            node.enabled = enabled;
            changed
        };
        if changed {
            self.bump_version();
        }
        Ok(())
    }

    /// Replace an element's interaction capability.
    pub fn set_interaction(
        &self,
        id: ElementId,
        interaction: Option<Rc<dyn TouchInteraction>>,
    ) -> Result<(), SceneError> {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            let node = inner.node_mut(id).ok_or(SceneError::UnknownElement(id))?;
            std::mem::replace(&mut node.interaction, interaction)
        };
        drop(previous);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Whether the id resolves to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.inner.borrow().node(id).is_some()
    }

    /// The element's own visibility flag. Dead elements are not visible.
    pub fn is_visible(&self, id: ElementId) -> bool {
        self.inner.borrow().node(id).is_some_and(|node| node.visible)
    }

    /// Whether the element and all its ancestors are enabled.
    pub fn is_enabled(&self, id: ElementId) -> bool {
        let inner = self.inner.borrow();
        let mut current = Some(id);
        let mut seen_any = false;
        while let Some(current_id) = current {
            let Some(node) = inner.node(current_id) else {
                return false;
            };
            if !node.enabled {
                return false;
            }
            seen_any = true;
            current = node.parent;
        }
        seen_any
    }

    /// Whether the element is attached under the root and it and every
    /// ancestor are visible and enabled.
    pub fn is_active(&self, id: ElementId) -> bool {
        let inner = self.inner.borrow();
        let mut current = id;
        loop {
            let Some(node) = inner.node(current) else {
                return false;
            };
            if !node.visible || !node.enabled {
                return false;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return current == inner.root,
            }
        }
    }

    /// Whether the element is attached (transitively) under the root.
    pub fn is_in_tree(&self, id: ElementId) -> bool {
        let inner = self.inner.borrow();
        if inner.node(id).is_none() {
            return false;
        }
        inner.is_ancestor_or_self(inner.root, id)
    }

    /// Parent of an element.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.inner.borrow().node(id).and_then(|node| node.parent)
    }

    /// Pre-children of an element, bottom first.
    pub fn pre_children(&self, id: ElementId) -> Vec<ElementId> {
        self.inner
            .borrow()
            .node(id)
            .map(|node| node.pre_children.clone())
            .unwrap_or_default()
    }

    /// Post-children of an element, bottom first.
    pub fn post_children(&self, id: ElementId) -> Vec<ElementId> {
        self.inner
            .borrow()
            .node(id)
            .map(|node| node.post_children.clone())
            .unwrap_or_default()
    }

    /// The element's interaction capability, if any.
    pub fn interaction(&self, id: ElementId) -> Option<Rc<dyn TouchInteraction>> {
        self.inner.borrow().node(id).and_then(|node| node.interaction.clone())
    }

    /// Number of live elements, root included.
    pub fn len(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.node.is_some())
            .count()
    }

    // -------------------------------------------------------------------------
    // Structural version
    // -------------------------------------------------------------------------

    /// Counter bumped on every attach, detach, despawn, visibility or
    /// enablement change.
    pub fn structural_version(&self) -> u64 {
        self.version.get()
    }

    /// The version as a signal, for deriveds that must rerun on tree changes.
    pub fn structural_version_signal(&self) -> Signal<u64> {
        self.version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::TouchHandlers;

    #[test]
    fn test_spawn_and_attach() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn(TouchHandlers::new());

        assert_eq!(scene.len(), 3);
        assert!(!scene.is_in_tree(a));

        scene.add_pre_child(root, a).unwrap();
        scene.add_post_child(root, b).unwrap();

        assert!(scene.is_in_tree(a));
        assert_eq!(scene.parent(b), Some(root));
        assert_eq!(scene.pre_children(root), vec![a]);
        assert_eq!(scene.post_children(root), vec![b]);
        assert!(scene.interaction(b).is_some());
        assert!(scene.interaction(a).is_none());
    }

    #[test]
    fn test_attach_at_index() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn_empty();
        scene.add_post_child(root, a).unwrap();
        scene.attach(root, b, ChildLayer::Post, Some(0)).unwrap();
        assert_eq!(scene.post_children(root), vec![b, a]);
    }

    #[test]
    fn test_attach_errors() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn_empty();
        scene.add_pre_child(root, a).unwrap();
        scene.add_pre_child(a, b).unwrap();

        assert_eq!(
            scene.add_pre_child(root, a),
            Err(SceneError::AlreadyAttached { child: a, parent: root })
        );
        scene.detach(a).unwrap();
        assert_eq!(
            scene.add_pre_child(b, a),
            Err(SceneError::WouldCreateCycle { child: a, parent: b })
        );
        assert_eq!(scene.add_pre_child(a, root), Err(SceneError::RootIsFixed));
        assert_eq!(scene.despawn(root), Err(SceneError::RootIsFixed));
    }

    #[test]
    fn test_despawn_is_recursive_and_ids_go_stale() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn_empty();
        scene.add_pre_child(root, a).unwrap();
        scene.add_post_child(a, b).unwrap();

        scene.despawn(a).unwrap();
        assert!(!scene.is_alive(a));
        assert!(!scene.is_alive(b));
        assert!(scene.pre_children(root).is_empty());
        assert_eq!(scene.despawn(a), Err(SceneError::UnknownElement(a)));

        // Should reuse a freed index with a new generation
        let c = scene.spawn_empty();
        assert!(c.index() == a.index() || c.index() == b.index());
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(!scene.is_alive(a));
        assert!(scene.is_alive(c));
    }

    #[test]
    fn test_structural_version() {
        let scene = Scene::new();
        let root = scene.root();
        let v0 = scene.structural_version();

        let a = scene.spawn_empty();
        assert_eq!(scene.structural_version(), v0, "spawning detached is not structural");

        scene.add_pre_child(root, a).unwrap();
        let v1 = scene.structural_version();
        assert!(v1 > v0);

        scene.set_visible(a, true).unwrap();
        assert_eq!(scene.structural_version(), v1, "no-op toggle");

        scene.set_visible(a, false).unwrap();
        let v2 = scene.structural_version();
        assert!(v2 > v1);

        scene.set_enabled(a, false).unwrap();
        let v3 = scene.structural_version();
        assert!(v3 > v2);

        scene.detach(a).unwrap();
        assert!(scene.structural_version() > v3);

        let signal = scene.structural_version_signal();
        assert_eq!(signal.get(), scene.structural_version());
    }

    #[test]
    fn test_enabled_and_active_follow_ancestors() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn_empty();
        scene.add_pre_child(root, a).unwrap();
        scene.add_pre_child(a, b).unwrap();

        assert!(scene.is_active(b));
        scene.set_enabled(a, false).unwrap();
        assert!(!scene.is_enabled(b));
        assert!(!scene.is_active(b));
        assert!(scene.is_visible(b));

        scene.set_enabled(a, true).unwrap();
        scene.set_visible(a, false).unwrap();
        assert!(scene.is_enabled(b));
        assert!(!scene.is_active(b));
    }

    #[test]
    fn test_detached_subtree_is_not_active() {
        let scene = Scene::new();
        let root = scene.root();
        let a = scene.spawn_empty();
        let b = scene.spawn_empty();
        scene.add_pre_child(root, a).unwrap();
        scene.add_post_child(a, b).unwrap();
        assert!(scene.is_active(b));

        scene.detach(a).unwrap();
        assert!(scene.is_alive(b));
        assert!(!scene.is_active(a));
        assert!(!scene.is_active(b));
        assert!(scene.is_active(root));

        scene.add_post_child(root, a).unwrap();
        assert!(scene.is_active(b));
    }
}
