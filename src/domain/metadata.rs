//! Layered front-matter metadata
//!
//! Every page's front matter is a [`MetadataLayer`]. A page's
//! [`MetadataChain`] stacks its own layer on top of the layers of its
//! ancestor index pages, nearest first. Ancestor layers are shared (`Arc`)
//! between all descendants.
//!
//! Lookup rule: layers are scanned nearest to farthest. A layer other than
//! the nearest one is skipped for a key when the key is `private` itself, or
//! when the layer lists the key in its own `private` declaration. The nearest
//! layer's values are always visible.

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Key under which a layer declares its non-inheritable keys
pub const PRIVATE_KEY: &str = "private";

/// One page's own front matter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataLayer {
    values: Mapping,
}

impl MetadataLayer {
    /// Creates an empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value defined directly in this layer
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Sets a value in this layer
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(Value::String(key.into()), value.into());
    }

    /// Returns true if the layer defines no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the string-keyed entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
    }

    /// Returns true if this layer marks the key as not inheritable
    ///
    /// `private` may be a single key or a list of keys.
    pub fn is_private(&self, key: &str) -> bool {
        match self.values.get(PRIVATE_KEY) {
            Some(Value::String(s)) => s == key,
            Some(Value::Sequence(keys)) => keys.iter().any(|k| k.as_str() == Some(key)),
            _ => false,
        }
    }
}

impl From<Mapping> for MetadataLayer {
    fn from(values: Mapping) -> Self {
        Self { values }
    }
}

/// A page's metadata with inherited ancestor layers
#[derive(Debug, Clone)]
pub struct MetadataChain {
    /// Nearest first; never empty
    layers: Vec<Arc<MetadataLayer>>,
}

impl MetadataChain {
    /// Creates a chain with a single layer
    pub fn new(layer: MetadataLayer) -> Self {
        Self {
            layers: vec![Arc::new(layer)],
        }
    }

    /// Creates a descendant chain whose nearest layer is `layer`
    pub fn new_child(&self, layer: MetadataLayer) -> Self {
        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        layers.push(Arc::new(layer));
        layers.extend(self.layers.iter().cloned());
        Self { layers }
    }

    /// The page's own layer
    pub fn own(&self) -> &MetadataLayer {
        &self.layers[0]
    }

    /// Number of layers including the page's own
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    fn visible(index: usize, layer: &MetadataLayer, key: &str) -> bool {
        index == 0 || (key != PRIVATE_KEY && !layer.is_private(key))
    }

    /// Looks up a key, honouring private declarations of ancestor layers
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(i, layer)| Self::visible(*i, layer, key))
            .find_map(|(_, layer)| layer.get(key))
    }

    /// Looks up a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Looks up a boolean flag; anything but `true` is false
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns true if lookup of the key succeeds
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over every key for which lookup succeeds, each once
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .flat_map(|layer| layer.iter().map(|(k, _)| k))
            .filter(move |key| seen.insert(*key))
            .filter(move |key| self.contains(key))
    }

    /// Iterates over visible key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys().filter_map(move |k| self.get(k).map(|v| (k, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(yaml: &str) -> MetadataLayer {
        let mapping: Mapping = serde_yaml::from_str(yaml).unwrap();
        MetadataLayer::from(mapping)
    }

    #[test]
    fn nearest_layer_wins() {
        let root = MetadataChain::new(layer("title: Site\nauthor: Ann"));
        let page = root.new_child(layer("title: Page"));

        assert_eq!(page.get_str("title"), Some("Page"));
        assert_eq!(page.get_str("author"), Some("Ann"));
        assert_eq!(page.depth(), 2);
    }

    #[test]
    fn descendant_inherits_from_nearest_defining_ancestor() {
        let root = MetadataChain::new(layer("theme: dark"));
        let section = root.new_child(layer("theme: light"));
        let page = section.new_child(layer("title: Page"));

        assert_eq!(page.get_str("theme"), Some("light"));
    }

    #[test]
    fn private_keys_are_not_inherited() {
        let root = MetadataChain::new(layer("draft: true\nprivate: [draft]\ntitle: Root"));
        let page = root.new_child(layer("title: Page"));

        assert!(page.get("draft").is_none());
        assert!(!page.contains("draft"));
        assert_eq!(page.get_str("title"), Some("Page"));

        // Still visible on the ancestor itself
        assert!(root.flag("draft"));
    }

    #[test]
    fn private_key_itself_is_not_inherited() {
        let root = MetadataChain::new(layer("private: secret\nsecret: 1"));
        let page = root.new_child(MetadataLayer::new());

        assert!(page.get(PRIVATE_KEY).is_none());
        assert!(root.get(PRIVATE_KEY).is_some());
        assert_eq!(root.get("secret"), Some(&Value::from(1)));
    }

    #[test]
    fn private_skips_only_that_layer() {
        let root = MetadataChain::new(layer("color: red"));
        let section = root.new_child(layer("color: blue\nprivate: [color]"));
        let page = section.new_child(MetadataLayer::new());

        assert_eq!(page.get_str("color"), Some("red"));
        assert_eq!(section.get_str("color"), Some("blue"));
    }

    #[test]
    fn keys_yield_visible_keys_once() {
        let root = MetadataChain::new(layer("a: 1\nb: 2\nprivate: [b]"));
        let page = root.new_child(layer("a: 3\nc: 4"));

        let keys: Vec<_> = page.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);

        let pairs: Vec<_> = page.iter().collect();
        assert_eq!(pairs[0], ("a", &Value::from(3)));
    }

    #[test]
    fn missing_key_is_none() {
        let chain = MetadataChain::new(MetadataLayer::new());
        assert!(chain.get("nothing").is_none());
        assert!(!chain.flag("nothing"));
    }
}
