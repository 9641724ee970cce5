//! Conditional fragment builders.
//!
//! All of these return a fragment whose direct children keep fixed positions,
//! so the host's diff sees a stable shape no matter which branch is taken.

use super::{Fragment, Key, Vnode};

/// One branch of [`cond`] or [`match_value`].
pub struct Case<'a, C> {
    condition: C,
    then: Box<dyn FnOnce() -> Vnode + 'a>,
}

impl<'a, C> Case<'a, C> {
    pub fn new<F, V>(condition: C, then: F) -> Self
    where
        F: FnOnce() -> V + 'a,
        V: Into<Vnode>,
    {
        Self {
            condition,
            then: Box::new(move || then().into()),
        }
    }

    fn resolve(self) -> Vnode {
        Fragment::new(vec![(self.then)()]).into()
    }
}

/// Group `children` under an identity key. Changing the key makes the host
/// drop and recreate the whole group.
pub fn link<I, V>(key: impl Into<Key>, children: I) -> Vnode
where
    I: IntoIterator<Item = V>,
    V: Into<Vnode>,
{
    let keyed = Fragment::keyed(key, children.into_iter().map(Into::into).collect());
    Fragment::new(vec![keyed.into()]).into()
}

/// Render `then` or `or_else`. The branch is keyed by `condition`, so
/// flipping it recreates the subtree instead of patching it.
pub fn when<T, E, A, B>(condition: bool, then: T, or_else: E) -> Vnode
where
    T: FnOnce() -> A,
    E: FnOnce() -> B,
    A: Into<Vnode>,
    B: Into<Vnode>,
{
    let branch = if condition {
        then().into()
    } else {
        or_else().into()
    };
    link(condition, [branch])
}

/// Render every case whose condition holds. Cases that do not hold leave a
/// hole in their slot.
pub fn cond<'a>(cases: impl IntoIterator<Item = Case<'a, bool>>) -> Vnode {
    let children = cases
        .into_iter()
        .map(|case| {
            if case.condition {
                case.resolve()
            } else {
                Vnode::Empty
            }
        })
        .collect();
    Fragment::new(children).into()
}

/// Render every case equal to `value`, leaving holes for the rest.
///
/// A value that is not equal to itself (a float NaN) matches the cases that
/// are likewise not equal to themselves.
pub fn match_value<'a, T: PartialEq>(
    value: &T,
    cases: impl IntoIterator<Item = Case<'a, T>>,
) -> Vnode {
    #[allow(clippy::eq_op)]
    let reflexive = value == value;
    let children = cases
        .into_iter()
        .map(|case| {
            #[allow(clippy::eq_op)]
            let hit = if reflexive {
                case.condition == *value
            } else {
                case.condition != case.condition
            };
            if hit { case.resolve() } else { Vnode::Empty }
        })
        .collect();
    Fragment::new(children).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::{text, validate_subtree};

    fn slot(node: &Vnode, index: usize) -> &Vnode {
        &node.children()[index]
    }

    #[test]
    fn test_link_wraps_single_keyed_group() {
        let node = link("user-7", ["a", "b"]);
        assert_eq!(node.children().len(), 1);
        assert_eq!(slot(&node, 0).key(), Some(&Key::from("user-7")));
        assert_eq!(slot(&node, 0).children(), &[text("a"), text("b")]);
    }

    #[test]
    fn test_when_keys_by_condition() {
        let yes = when(true, || "yes", || "no");
        let no = when(false, || "yes", || "no");

        assert_eq!(slot(&yes, 0).key(), Some(&Key::from("true")));
        assert_eq!(slot(&yes, 0).children(), &[text("yes")]);
        assert_eq!(slot(&no, 0).key(), Some(&Key::from("false")));
        assert_eq!(slot(&no, 0).children(), &[text("no")]);
    }

    #[test]
    fn test_when_only_runs_taken_branch() {
        let node = when(false, || -> Vnode { panic!("not taken") }, || "fallback");
        assert_eq!(slot(&node, 0).children(), &[text("fallback")]);
    }

    #[test]
    fn test_cond_leaves_holes() {
        let node = cond([
            Case::new(false, || "a"),
            Case::new(true, || "b"),
            Case::new(true, || "c"),
        ]);
        assert!(slot(&node, 0).is_empty());
        assert_eq!(slot(&node, 1).children(), &[text("b")]);
        assert_eq!(slot(&node, 2).children(), &[text("c")]);
        assert_eq!(validate_subtree(&node), Ok(()));
    }

    #[test]
    fn test_match_value_by_equality() {
        let node = match_value(&"edit", [Case::new("view", || "V"), Case::new("edit", || "E")]);
        assert!(slot(&node, 0).is_empty());
        assert_eq!(slot(&node, 1).children(), &[text("E")]);
    }

    #[test]
    fn test_match_value_nan_matches_nan() {
        let node = match_value(
            &f64::NAN,
            [Case::new(1.0, || "one"), Case::new(f64::NAN, || "nan")],
        );
        assert!(slot(&node, 0).is_empty());
        assert_eq!(slot(&node, 1).children(), &[text("nan")]);
    }

    #[test]
    fn test_match_value_skips_unmatched_thunks() {
        let node = match_value(&2, [Case::new(1, || -> Vnode { panic!("unmatched") })]);
        assert!(slot(&node, 0).is_empty());
    }
}
