use std::borrow::Cow;

use super::Attrs;

/// Attributes the host treats as lifecycle hooks or identity, never as
/// element attributes.
pub const MAGIC_ATTRS: [&str; 7] = [
    "key",
    "oninit",
    "oncreate",
    "onbeforeupdate",
    "onupdate",
    "onbeforeremove",
    "onremove",
];

/// Strip lifecycle attributes (and any `extras`) before forwarding `attrs`
/// to a child element.
///
/// Returns the input untouched when there is nothing to strip, so the common
/// case does not allocate.
pub fn censor<'a>(attrs: &'a Attrs, extras: &[&str]) -> Cow<'a, Attrs> {
    let excluded = |name: &str| MAGIC_ATTRS.contains(&name) || extras.contains(&name);

    if !attrs.keys().any(|name| excluded(name)) {
        return Cow::Borrowed(attrs);
    }

    Cow::Owned(
        attrs
            .iter()
            .filter(|(name, _)| !excluded(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::AttrValue;

    fn attrs(pairs: &[(&str, &str)]) -> Attrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_clean_attrs_are_borrowed() {
        let input = attrs(&[("class", "a"), ("id", "b")]);
        let output = censor(&input, &[]);
        assert!(matches!(output, Cow::Borrowed(_)));
        assert_eq!(*output, input);
    }

    #[test]
    fn test_magic_attrs_removed() {
        let input = attrs(&[("class", "a"), ("key", "k"), ("onremove", "f")]);
        let output = censor(&input, &[]);
        assert!(matches!(output, Cow::Owned(_)));
        assert_eq!(*output, attrs(&[("class", "a")]));
    }

    #[test]
    fn test_extras_removed() {
        let input = attrs(&[("class", "a"), ("tag", "section"), ("view", "v")]);
        let output = censor(&input, &["tag", "view"]);
        assert_eq!(*output, attrs(&[("class", "a")]));
    }

    #[test]
    fn test_extras_alone_trigger_copy() {
        let input = attrs(&[("style", "x")]);
        let output = censor(&input, &["style"]);
        assert!(output.is_empty());
    }
}
