//! The single-inheritance class lattice.
//!
//! Every class has exactly one parent except the root `Object`. Queries walk
//! parent chains, and every walk is capped at the number of registered
//! classes so a malformed graph cannot loop.

use std::collections::HashMap;

pub const OBJECT: &str = "Object";
pub const IO: &str = "IO";
pub const INT: &str = "Int";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";
pub const SELF_TYPE: &str = "SELF_TYPE";
pub const MAIN: &str = "Main";

pub const BUILTIN_CLASSES: [&str; 5] = [OBJECT, IO, INT, STRING, BOOL];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<String, ClassEntry>,
    order: Vec<String>,
}

impl TypeRegistry {
    /// An empty registry holding only the root type.
    pub fn new() -> Self {
        let mut registry = Self {
            classes: HashMap::new(),
            order: Vec::new(),
        };
        registry.classes.insert(
            OBJECT.to_string(),
            ClassEntry {
                name: OBJECT.to_string(),
                parent: None,
            },
        );
        registry.order.push(OBJECT.to_string());
        registry
    }

    /// A registry with the root and the built-in `IO`, `Int`, `String` and `Bool` classes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_CLASSES.iter().skip(1) {
            registry.register(name, None);
        }
        registry
    }

    /// Adds `name` with `parent` (the root when absent). The parent is not
    /// required to exist yet. Returns `false` and leaves the registry untouched
    /// when `name` is already registered.
    pub fn register(&mut self, name: &str, parent: Option<&str>) -> bool {
        if self.classes.contains_key(name) {
            return false;
        }
        let parent = parent.unwrap_or(OBJECT).to_string();
        self.classes.insert(
            name.to_string(),
            ClassEntry {
                name: name.to_string(),
                parent: Some(parent),
            },
        );
        self.order.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.classes
            .get(name)
            .and_then(|entry| entry.parent.as_deref())
    }

    /// Replaces the parent of an already registered class. The root keeps no parent.
    pub fn reparent(&mut self, name: &str, parent: &str) {
        if name == OBJECT {
            return;
        }
        if let Some(entry) = self.classes.get_mut(name) {
            entry.parent = Some(parent.to_string());
        }
    }

    /// Class names in registration order, root first.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `name` followed by each ancestor up to the last registered one.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = vec![name.to_string()];
        let mut current = name;
        while chain.len() <= self.classes.len() {
            match self.parent_of(current) {
                Some(parent) => {
                    chain.push(parent.to_string());
                    current = parent;
                }
                None => break,
            }
        }
        chain
    }

    /// True when `sup` appears on `sub`'s parent chain, `sub` included.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).iter().any(|ancestor| ancestor == sup)
    }

    pub fn is_numeric_pair(&self, left: &str, right: &str) -> bool {
        left == INT && right == INT
    }

    /// Equality and ordering comparisons need matching types, or `Object` on
    /// either side. Yields the result type, or the offending left type.
    pub fn can_compare(&self, left: &str, right: &str) -> Result<&'static str, String> {
        if left == right || left == OBJECT || right == OBJECT {
            Ok(BOOL)
        } else {
            Err(left.to_string())
        }
    }

    /// Nearest common ancestor; falls back to the root.
    pub fn least_upper_bound(&self, left: &str, right: &str) -> String {
        let right_chain = self.ancestors(right);
        self.ancestors(left)
            .into_iter()
            .find(|ancestor| right_chain.contains(ancestor))
            .unwrap_or_else(|| OBJECT.to_string())
    }

    pub fn is_inherited_from(&self, child: &str, ancestor: &str) -> bool {
        self.is_subtype(child, ancestor)
    }
}
