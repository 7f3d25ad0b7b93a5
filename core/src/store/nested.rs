use crate::prelude::{NmbimError, NmbimResult};
use crate::store::value::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
enum Node {
    Leaf(Value),
    Branch(BTreeMap<String, Node>),
}

impl Node {
    fn to_value(&self) -> Value {
        match self {
            Node::Leaf(value) => value.clone(),
            Node::Branch(children) => Value::Map(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_value()))
                    .collect(),
            ),
        }
    }

    fn holds_data(&self) -> bool {
        match self {
            Node::Leaf(value) => !value.is_null(),
            Node::Branch(children) => children.values().any(Node::holds_data),
        }
    }

    fn collect_leaves(&self, prefix: &str, out: &mut Vec<String>) {
        match self {
            Node::Leaf(_) => out.push(prefix.to_string()),
            Node::Branch(children) => {
                for (key, child) in children {
                    child.collect_leaves(&join(prefix, key), out);
                }
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// Splits a `/`-separated path; surrounding slashes are ignored.
pub(crate) fn split_path(path: &str) -> NmbimResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(NmbimError::InvalidPath(path.to_string()));
    }
    let keys: Vec<&str> = trimmed.split('/').collect();
    if keys.iter().any(|key| key.is_empty()) {
        return Err(NmbimError::InvalidPath(path.to_string()));
    }
    Ok(keys)
}

/// Hierarchical key/value container addressed by `/`-separated paths.
///
/// Leaves hold exactly one [`Value`]; every intermediate segment is a group.
/// Terminal paths are indexed on write so `paths()` and the write-once check
/// never walk the tree.
#[derive(Debug, Clone, Default)]
pub struct NestedPathStore {
    root: BTreeMap<String, Node>,
    paths: BTreeSet<String>,
}

impl NestedPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal paths currently holding a value.
    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    pub fn has(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Returns the value at `path`; a group comes back as a `Value::Map`.
    pub fn get(&self, path: &str) -> NmbimResult<Value> {
        self.resolve(path).map(Node::to_value)
    }

    /// Borrows the leaf value at `path` without cloning.
    pub fn get_ref(&self, path: &str) -> NmbimResult<&Value> {
        match self.resolve(path)? {
            Node::Leaf(value) => Ok(value),
            Node::Branch(_) => Err(NmbimError::TypeMismatch(format!(
                "'{}' is a group, not a value",
                path
            ))),
        }
    }

    /// Writes `value` at `path`, creating intermediate groups.
    ///
    /// A `Value::Map` is merged leaf by leaf under `path`. Without `overwrite`,
    /// any target leaf already holding non-null data rejects the whole write;
    /// nothing is modified unless every leaf can be written.
    pub fn set(&mut self, path: &str, value: Value, overwrite: bool) -> NmbimResult<()> {
        let keys = split_path(path)?;
        let normalized = keys.join("/");
        let (last, parents) = keys
            .split_last()
            .ok_or_else(|| NmbimError::InvalidPath(path.to_string()))?;

        let mut level = Some(&self.root);
        let mut walked = String::new();
        for key in parents {
            walked = join(&walked, key);
            level = match level.and_then(|children| children.get(*key)) {
                Some(Node::Branch(children)) => Some(children),
                Some(Node::Leaf(_)) => {
                    return Err(NmbimError::TypeMismatch(format!(
                        "cannot create '{}' under non-group '{}'",
                        normalized, walked
                    )))
                }
                None => None,
            };
        }
        if !overwrite {
            let existing = level.and_then(|children| children.get(*last));
            check_conflicts(existing, &value, &normalized)?;
        }

        let mut children = &mut self.root;
        for key in parents {
            let node = children
                .entry(key.to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            children = match node {
                Node::Branch(next) => next,
                Node::Leaf(_) => {
                    return Err(NmbimError::TypeMismatch(format!(
                        "cannot create '{}' under non-group '{}'",
                        normalized, key
                    )))
                }
            };
        }
        merge_into(children, last, value, &normalized, &mut self.paths);
        Ok(())
    }

    fn resolve(&self, path: &str) -> NmbimResult<&Node> {
        let keys = split_path(path)?;
        let not_found = || NmbimError::PathNotFound(path.to_string());
        let (last, parents) = keys.split_last().ok_or_else(not_found)?;
        let mut level = &self.root;
        for key in parents {
            match level.get(*key) {
                Some(Node::Branch(children)) => level = children,
                _ => return Err(not_found()),
            }
        }
        level.get(*last).ok_or_else(not_found)
    }
}

fn check_conflicts(existing: Option<&Node>, incoming: &Value, path: &str) -> NmbimResult<()> {
    match (existing, incoming) {
        (None, _) => Ok(()),
        (Some(Node::Branch(children)), Value::Map(entries)) => {
            for (key, value) in entries {
                check_conflicts(children.get(key), value, &join(path, key))?;
            }
            Ok(())
        }
        (Some(node), _) if node.holds_data() => Err(NmbimError::PathExists(path.to_string())),
        (Some(_), _) => Ok(()),
    }
}

fn unindex(node: &Node, path: &str, paths: &mut BTreeSet<String>) {
    let mut stale = Vec::new();
    node.collect_leaves(path, &mut stale);
    for leaf in stale {
        paths.remove(&leaf);
    }
}

fn merge_into(
    children: &mut BTreeMap<String, Node>,
    key: &str,
    value: Value,
    path: &str,
    paths: &mut BTreeSet<String>,
) {
    match value {
        Value::Map(entries) => {
            if let Some(node @ Node::Leaf(_)) = children.get(key) {
                unindex(node, path, paths);
                children.remove(key);
            }
            let node = children
                .entry(key.to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            if let Node::Branch(grandchildren) = node {
                for (child_key, child_value) in entries {
                    let child_path = join(path, &child_key);
                    merge_into(grandchildren, &child_key, child_value, &child_path, paths);
                }
            }
        }
        leaf => {
            if let Some(previous) = children.get(key) {
                unindex(previous, path, paths);
            }
            children.insert(key.to_string(), Node::Leaf(leaf));
            paths.insert(path.to_string());
        }
    }
}
