//! Element descriptions: the immutable input to reconciliation.
//!
//! An [`Element`] says what a subtree should look like; it owns no host
//! resources and carries no identity beyond its optional key. Rendering
//! the same element twice is free to reuse, move or rebuild work nodes as
//! the reconciler sees fit.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::hash::hash_key;
use crate::hooks::Scope;

/// Reconciliation key. Author-supplied keys of any `Hash` type are
/// reduced to this.
pub type Key = u64;

/// A property value on a host element.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl From<&str> for PropValue {
    fn from(value: &str) -> PropValue {
        PropValue::Text(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> PropValue {
        PropValue::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> PropValue {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> PropValue {
        PropValue::Number(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> PropValue {
        PropValue::Flag(value)
    }
}

/// Named properties of a host element. Compared wholesale to decide
/// whether a committed host node needs an in-place update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostProps {
    entries: FxHashMap<String, PropValue>,
}

impl HostProps {
    pub fn new() -> HostProps {
        HostProps::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> HostProps {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A host element description: tag, props and child elements.
#[derive(Clone)]
pub struct HostElement {
    pub(crate) tag: Rc<str>,
    pub(crate) key: Option<Key>,
    pub(crate) props: HostProps,
    pub(crate) children: Vec<Element>,
}

impl HostElement {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn props(&self) -> &HostProps {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

pub(crate) type RenderFn = Rc<dyn Fn(&mut Scope, &dyn Any) -> Element>;

/// A component element description: a render function plus its props.
///
/// Identity for reconciliation is the render function's address; two
/// elements made from the same `fn` item reconcile into the same node.
#[derive(Clone)]
pub struct ComponentElement {
    pub(crate) identity: usize,
    pub(crate) key: Option<Key>,
    pub(crate) props: Rc<dyn Any>,
    pub(crate) render: RenderFn,
}

/// An immutable description of a subtree.
#[derive(Clone)]
pub enum Element {
    Host(Rc<HostElement>),
    Component(Rc<ComponentElement>),
    Text(Rc<str>),
}

impl Element {
    pub fn key(&self) -> Option<Key> {
        match self {
            Element::Host(el) => el.key,
            Element::Component(el) => el.key,
            Element::Text(_) => None,
        }
    }

    /// Attach a reconciliation key. Keys on text elements are ignored;
    /// text participates in diffing by position only.
    #[must_use]
    pub fn keyed<K: Hash>(self, key: K) -> Element {
        let key = Some(hash_key(&key));
        match self {
            Element::Host(mut el) => {
                Rc::make_mut(&mut el).key = key;
                Element::Host(el)
            }
            Element::Component(mut el) => {
                Rc::make_mut(&mut el).key = key;
                Element::Component(el)
            }
            text @ Element::Text(_) => text,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Host(el) => f
                .debug_struct("Host")
                .field("tag", &el.tag)
                .field("key", &el.key)
                .field("children", &el.children.len())
                .finish(),
            Element::Component(el) => f
                .debug_struct("Component")
                .field("identity", &el.identity)
                .field("key", &el.key)
                .finish(),
            Element::Text(content) => f.debug_tuple("Text").field(content).finish(),
        }
    }
}

/// Build a host element.
pub fn host(tag: impl Into<Rc<str>>, props: HostProps, children: Vec<Element>) -> Element {
    Element::Host(Rc::new(HostElement {
        tag: tag.into(),
        key: None,
        props,
        children,
    }))
}

/// Build a text element.
pub fn text(content: impl Into<Rc<str>>) -> Element {
    Element::Text(content.into())
}

/// Build a component element from a render function and its props.
pub fn component<P: 'static>(render: fn(&mut Scope, &P) -> Element, props: P) -> Element {
    let identity = render as usize;
    let props: Rc<dyn Any> = Rc::new(props);
    let erased: RenderFn = Rc::new(move |scope, props| {
        let props = props.downcast_ref::<P>().expect("component props type mismatch");
        render(scope, props)
    });
    Element::Component(Rc::new(ComponentElement {
        identity,
        key: None,
        props,
        render: erased,
    }))
}
