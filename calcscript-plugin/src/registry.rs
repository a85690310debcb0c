//! Function registry.
//!
//! Kernel crates register unit-struct plugins with the builder-style
//! [`PluginRegistry::with_function`]; each function files itself under the
//! namespace its metadata names. The registry then freezes into a
//! [`Value::Namespace`] tree mounted at the reserved root, which is the
//! only way documents reach the standard library.

use std::collections::BTreeMap;
use std::sync::Arc;

use calcscript_core::{FunctionMeta, FunctionPlugin, Namespace, Value};

/// Central function registry. BTreeMaps keep every listing deterministic.
pub struct PluginRegistry {
    namespaces: BTreeMap<String, BTreeMap<String, Arc<dyn FunctionPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
        }
    }

    /// Register a function under the namespace its metadata declares.
    pub fn with_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let meta = f.meta();
        self.namespaces
            .entry(meta.namespace.to_string())
            .or_default()
            .insert(meta.name.to_string(), Arc::new(f));
        self
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&Arc<dyn FunctionPlugin>> {
        self.namespaces.get(namespace)?.get(name)
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Namespace names in order.
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// One namespace as a frozen value, or None if nothing registered there.
    pub fn namespace_value(&self, namespace: &str) -> Option<Value> {
        let functions = self.namespaces.get(namespace)?;
        let entries: BTreeMap<String, Value> = functions
            .iter()
            .map(|(name, f)| (name.clone(), Value::Function(Arc::clone(f))))
            .collect();
        Some(Value::Namespace(Arc::new(Namespace::from_entries(
            namespace, entries,
        ))))
    }

    /// The whole library as one frozen tree, to mount at the reserved root.
    pub fn root(&self, root_name: &str) -> Value {
        let entries: BTreeMap<String, Value> = self
            .namespaces
            .keys()
            .filter_map(|ns| Some((ns.clone(), self.namespace_value(ns)?)))
            .collect();
        Value::Namespace(Arc::new(Namespace::from_entries(root_name, entries)))
    }

    /// All function metadata, ordered by namespace then name.
    pub fn catalog(&self) -> Vec<FunctionMeta> {
        self.namespaces
            .values()
            .flat_map(|fns| fns.values().map(|f| f.meta()))
            .collect()
    }

    /// Dotted names similar to `name`, for "did you mean" errors.
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let needle = name.to_lowercase();
        let mut scored: Vec<(usize, String)> = self
            .namespaces
            .iter()
            .flat_map(|(ns, fns)| fns.keys().map(move |f| (ns, f)))
            .filter_map(|(ns, f)| {
                let candidate = f.to_lowercase();
                let score = if candidate == needle {
                    100
                } else if candidate.starts_with(&needle) || needle.starts_with(&candidate) {
                    60
                } else if candidate.contains(&needle) || needle.contains(&candidate) {
                    30
                } else {
                    0
                };
                if score > 0 {
                    Some((score, format!("{}.{}", ns, f)))
                } else {
                    None
                }
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.into_iter().take(5).map(|(_, name)| name).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcscript_core::{ArgMeta, CalcError, FnContext};

    struct Stub(&'static str, &'static str);

    static NO_ARGS: [ArgMeta; 0] = [];

    impl FunctionPlugin for Stub {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: self.1,
                namespace: self.0,
                usage: "",
                description: "stub",
                args: &NO_ARGS,
                returns: "null",
            }
        }

        fn call(&self, _args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new()
            .with_function(Stub("math", "abs"))
            .with_function(Stub("math", "sum"))
            .with_function(Stub("finance", "pmt"))
    }

    #[test]
    fn test_functions_file_under_their_namespace() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert!(reg.get("math", "abs").is_some());
        assert!(reg.get("finance", "pmt").is_some());
        assert!(reg.get("math", "pmt").is_none());
    }

    #[test]
    fn test_root_tree_resolves_dotted_path() {
        let root = registry().root("calc");
        let Value::Namespace(root) = root else {
            panic!("root is not a namespace")
        };
        let Some(Value::Namespace(math)) = root.get("math") else {
            panic!("math missing")
        };
        assert!(matches!(math.get("abs"), Some(Value::Function(_))));
        assert!(math.get("pmt").is_none());
    }

    #[test]
    fn test_catalog_is_ordered() {
        let names: Vec<&str> = registry().catalog().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["pmt", "abs", "sum"]); // finance before math
    }

    #[test]
    fn test_suggest_finds_near_misses() {
        let suggestions = registry().suggest("ab");
        assert_eq!(suggestions.first().map(String::as_str), Some("math.abs"));
        assert!(registry().suggest("zzz").is_empty());
    }
}
