//! Option tree resolution
//!
//! Each node of the tree sees the options of all its ancestors merged with
//! its own. Ordinary keys are overwritten by the nearer node; `params` is
//! appended instead, root first.
//!
//! Bags are layered rather than copied: a node's bag holds only that node's
//! own options plus a shared pointer to its parent's bag, so resolving a
//! wide or deep tree never clones ancestor state. Siblings share the parent
//! layer read-only and cannot observe each other.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key whose list is appended across ancestors rather than overwritten
pub const PARAMS_KEY: &str = "params";

/// One node of the option tree, as read from the tree file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptionNode {
    /// Options set at this node
    pub options: NodeOptions,

    /// Child nodes, in order
    pub children: Vec<OptionNode>,
}

/// Options set directly on one node
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOptions {
    /// Raw packer tokens, appended onto the ancestors' tokens
    #[serde(default)]
    pub params: Vec<String>,

    /// Every other key, overriding ancestors
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl OptionNode {
    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OptionNode::count).sum::<usize>()
    }
}

#[derive(Debug)]
struct Layer {
    values: Map<String, Value>,
    params: Vec<String>,
    parent: Option<Arc<Layer>>,
    depth: usize,
}

/// Fully merged options visible at one tree node
#[derive(Debug, Clone)]
pub struct OptionBag {
    layer: Arc<Layer>,
}

impl OptionBag {
    /// Bag for a root node
    pub fn root(options: &NodeOptions) -> Self {
        Self::derive(None, options)
    }

    /// Bag for a node below `parent`
    pub fn child(&self, options: &NodeOptions) -> Self {
        Self::derive(Some(self), options)
    }

    fn derive(parent: Option<&OptionBag>, options: &NodeOptions) -> Self {
        let parent = parent.map(|bag| Arc::clone(&bag.layer));
        let depth = parent.as_ref().map_or(0, |layer| layer.depth + 1);
        Self {
            layer: Arc::new(Layer {
                values: options.values.clone(),
                params: options.params.clone(),
                parent,
                depth,
            }),
        }
    }

    /// Depth of the node this bag belongs to (root = 0)
    pub fn depth(&self) -> usize {
        self.layer.depth
    }

    /// Look up an ordinary key; the nearest node that sets it wins
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut layer = Some(&self.layer);
        while let Some(current) = layer {
            if let Some(value) = current.values.get(key) {
                return Some(value);
            }
            layer = current.parent.as_ref();
        }
        None
    }

    /// Accumulated `params`, root first
    pub fn params(&self) -> Vec<String> {
        let mut chain = Vec::with_capacity(self.layer.depth + 1);
        let mut layer = Some(&self.layer);
        while let Some(current) = layer {
            chain.push(&current.params);
            layer = current.parent.as_ref();
        }
        chain.into_iter().rev().flatten().cloned().collect()
    }

    /// Materialize the merged view, `params` included
    pub fn to_map(&self) -> Map<String, Value> {
        let mut chain = Vec::with_capacity(self.layer.depth + 1);
        let mut layer = Some(&self.layer);
        while let Some(current) = layer {
            chain.push(current);
            layer = current.parent.as_ref();
        }

        let mut merged = Map::new();
        for current in chain.into_iter().rev() {
            for (key, value) in &current.values {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged.insert(
            PARAMS_KEY.to_string(),
            Value::Array(self.params().into_iter().map(Value::String).collect()),
        );
        merged
    }
}

/// Produce one bag per node, in pre-order (node before its children,
/// siblings in their original order).
pub fn resolve(root: &OptionNode) -> Vec<OptionBag> {
    let mut bags = Vec::with_capacity(root.count());
    let bag = OptionBag::root(&root.options);
    visit(root, bag, &mut bags);
    bags
}

fn visit(node: &OptionNode, bag: OptionBag, bags: &mut Vec<OptionBag>) {
    bags.push(bag.clone());
    for child in &node.children {
        let child_bag = bag.child(&child.options);
        visit(child, child_bag, bags);
    }
}
