use std::collections::HashSet;

use super::{Fragment, InvalidSubtree, Key, Vnode};

/// Build a keyed list: one keyed fragment per item.
///
/// `by` picks each item's key and `view` renders it. Keys are coerced to
/// strings before the uniqueness check, so `1` and `"1"` collide.
pub fn each<T, I, K, V>(
    list: I,
    by: impl Fn(&T, usize) -> K,
    view: impl Fn(T, usize) -> V,
) -> Result<Vnode, InvalidSubtree>
where
    I: IntoIterator<Item = T>,
    K: Into<Key>,
    V: Into<Vnode>,
{
    let mut found = HashSet::new();
    let children = list
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let key = by(&item, index).into();
            if !found.insert(key.clone()) {
                return Err(InvalidSubtree::DuplicateKey(key));
            }
            Ok(Fragment::keyed(key, vec![view(item, index).into()]).into())
        })
        .collect::<Result<Vec<Vnode>, _>>()?;

    Ok(Fragment::new(children).into())
}
