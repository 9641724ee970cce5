//! Minimal vnode model shared with the host rendering library.
//!
//! The host owns diffing and DOM work. This crate only builds trees, checks
//! them against the shape the host accepts, and hands them over.

pub mod censor;
pub mod each;
pub mod select;
pub mod validate;

use std::collections::BTreeMap;
use std::fmt;

use crate::event::Handler;

pub use censor::{MAGIC_ATTRS, censor};
pub use each::each;
pub use select::{Case, cond, link, match_value, when};
pub use validate::{InvalidSubtree, validate_subtree};

/// Identity key used by the host to match siblings across redraws.
///
/// Keys are always compared as strings, so `1` and `"1"` are the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl ToString) -> Self {
        Key(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key(key.to_owned())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key(key)
    }
}

impl From<&String> for Key {
    fn from(key: &String) -> Self {
        Key(key.clone())
    }
}

macro_rules! key_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(key: $ty) -> Self {
                    Key(key.to_string())
                }
            }
        )*
    };
}

key_from_display!(bool, char, i32, i64, u32, u64, usize);

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Handler(Handler),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<Handler> for AttrValue {
    fn from(value: Handler) -> Self {
        AttrValue::Handler(value)
    }
}

/// Attribute map. Ordered so rendered output is deterministic.
pub type Attrs = BTreeMap<String, AttrValue>;

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    pub key: Option<Key>,
    pub attrs: Attrs,
    pub children: Vec<Vnode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key: None,
            attrs: Attrs::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn child(mut self, child: impl Into<Vnode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vnode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    pub key: Option<Key>,
    pub children: Vec<Vnode>,
}

impl Fragment {
    pub fn new(children: Vec<Vnode>) -> Self {
        Self {
            key: None,
            children,
        }
    }

    pub fn keyed(key: impl Into<Key>, children: Vec<Vnode>) -> Self {
        Self {
            key: Some(key.into()),
            children,
        }
    }
}

/// A node in the virtual tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Vnode {
    Element(Element),
    Text(String),
    Fragment(Fragment),
    /// A hole. Keeps sibling positions stable when a branch renders nothing.
    #[default]
    Empty,
}

impl Vnode {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Vnode::Element(element) => element.key.as_ref(),
            Vnode::Fragment(fragment) => fragment.key.as_ref(),
            Vnode::Text(_) | Vnode::Empty => None,
        }
    }

    pub fn children(&self) -> &[Vnode] {
        match self {
            Vnode::Element(element) => &element.children,
            Vnode::Fragment(fragment) => &fragment.children,
            Vnode::Text(_) | Vnode::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Vnode::Empty)
    }
}

impl From<Element> for Vnode {
    fn from(element: Element) -> Self {
        Vnode::Element(element)
    }
}

impl From<Fragment> for Vnode {
    fn from(fragment: Fragment) -> Self {
        Vnode::Fragment(fragment)
    }
}

impl From<&str> for Vnode {
    fn from(text: &str) -> Self {
        Vnode::Text(text.to_owned())
    }
}

impl From<String> for Vnode {
    fn from(text: String) -> Self {
        Vnode::Text(text)
    }
}

impl From<Vec<Vnode>> for Vnode {
    fn from(children: Vec<Vnode>) -> Self {
        Vnode::Fragment(Fragment::new(children))
    }
}

impl<V: Into<Vnode>> From<Option<V>> for Vnode {
    fn from(node: Option<V>) -> Self {
        node.map_or(Vnode::Empty, Into::into)
    }
}

impl From<()> for Vnode {
    fn from(_: ()) -> Self {
        Vnode::Empty
    }
}

/// Start building an element.
pub fn h(tag: impl Into<String>) -> Element {
    Element::new(tag)
}

pub fn text(content: impl Into<String>) -> Vnode {
    Vnode::Text(content.into())
}

/// Unkeyed fragment of the given children.
pub fn fragment<I, V>(children: I) -> Vnode
where
    I: IntoIterator<Item = V>,
    V: Into<Vnode>,
{
    Vnode::Fragment(Fragment::new(
        children.into_iter().map(Into::into).collect(),
    ))
}
