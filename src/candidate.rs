use crate::selectors::Selectors;
use serde::{Deserialize, Serialize};

/// Structural facts about a node, read from the live page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTraits {
    pub class_name: String,
    pub child_element_count: usize,
}

impl NodeTraits {
    pub fn new(class_name: impl Into<String>, child_element_count: usize) -> Self {
        Self {
            class_name: class_name.into(),
            child_element_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Disabled,
}

/// One product checkbox from the current render of the listing.
///
/// The element handle is only valid until the page mutates, so candidates are
/// rebuilt from scratch on every poll.
#[derive(Debug, Clone)]
pub struct ProductCandidate<E> {
    pub name: Option<String>,
    pub availability: Availability,
    pub element: E,
}

impl<E> ProductCandidate<E> {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Decides which rendered nodes are real, selectable product checkboxes.
pub trait CandidatePolicy: Send + Sync {
    /// `None` for nodes that are not product checkboxes at all (wrappers,
    /// nodes with nested checkboxes).
    fn classify(&self, node: &NodeTraits) -> Option<Availability>;
}

impl<F> CandidatePolicy for F
where
    F: Fn(&NodeTraits) -> Option<Availability> + Send + Sync,
{
    fn classify(&self, node: &NodeTraits) -> Option<Availability> {
        self(node)
    }
}

/// Classifies nodes by class-name fragments and leaf-ness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMarkerPolicy {
    pub disabled_marker: String,
    pub container_marker: String,
    pub require_leaf: bool,
}

impl ClassMarkerPolicy {
    pub fn from_selectors(selectors: &Selectors) -> Self {
        Self {
            disabled_marker: selectors.disabled_marker.clone(),
            container_marker: selectors.container_marker.clone(),
            require_leaf: selectors.require_leaf,
        }
    }
}

impl Default for ClassMarkerPolicy {
    fn default() -> Self {
        Self::from_selectors(&Selectors::default())
    }
}

impl CandidatePolicy for ClassMarkerPolicy {
    fn classify(&self, node: &NodeTraits) -> Option<Availability> {
        if !self.container_marker.is_empty() && node.class_name.contains(&self.container_marker) {
            return None;
        }
        if self.require_leaf && node.child_element_count > 0 {
            return None;
        }
        if !self.disabled_marker.is_empty() && node.class_name.contains(&self.disabled_marker) {
            return Some(Availability::Disabled);
        }
        Some(Availability::Available)
    }
}
