use std::collections::HashSet;

use thiserror::Error;

use super::{Key, Vnode};

/// A tree the host would refuse to render.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSubtree {
    #[error("subtree root must not carry a key, found {0}")]
    KeyedRoot(Key),
    #[error("element tag must not be empty")]
    EmptyTag,
    #[error("sibling vnodes must either all have keys or none have keys")]
    MixedKeys,
    #[error("duplicate key {0} among siblings")]
    DuplicateKey(Key),
}

/// Check a render callback's output before it reaches the host.
///
/// A keyed root is a host control node and cannot be rendered into a
/// container on its own.
pub fn validate_subtree(root: &Vnode) -> Result<(), InvalidSubtree> {
    if let Some(key) = root.key() {
        return Err(InvalidSubtree::KeyedRoot(key.clone()));
    }
    validate_node(root)
}

fn validate_node(node: &Vnode) -> Result<(), InvalidSubtree> {
    if let Vnode::Element(element) = node
        && element.tag.trim().is_empty()
    {
        return Err(InvalidSubtree::EmptyTag);
    }

    let children = node.children();
    validate_siblings(children)?;
    children.iter().try_for_each(validate_node)
}

fn validate_siblings(children: &[Vnode]) -> Result<(), InvalidSubtree> {
    let mut keyed = None;
    let mut seen = HashSet::new();

    // Holes carry no identity either way
    for child in children.iter().filter(|child| !child.is_empty()) {
        let key = child.key();
        match keyed {
            None => keyed = Some(key.is_some()),
            Some(expected) if expected != key.is_some() => {
                return Err(InvalidSubtree::MixedKeys);
            }
            Some(_) => {}
        }
        if let Some(key) = key
            && !seen.insert(key)
        {
            return Err(InvalidSubtree::DuplicateKey(key.clone()));
        }
    }
    Ok(())
}
