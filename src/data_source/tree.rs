//! Local copy of a database subtree, updated the way the realtime database
//! applies writes: `put` replaces the value at a path, `patch` replaces only
//! the named children, and null or empty objects cease to exist.

use serde_json::{Map, Value};



fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
	let mut node = root;
	for segment in segments(path) {
		node = node.get(segment)?;
	}
	Some(node).filter(|v| !v.is_null())
}

pub fn put(root: &mut Value, path: &str, data: Value) {
	*slot(root, path) = data;
	prune_root(root);
}

pub fn patch(root: &mut Value, path: &str, data: Value) {
	match data {
		Value::Object(children) => {
			let node = slot(root, path);
			for (key, child) in children {
				*slot(node, &key) = child;
			}
			prune_root(root);
		},
		other => put(root, path, other),
	}
}

// Walks to the node at `path`, turning scalars along the way into objects.
fn slot<'a>(mut node: &'a mut Value, path: &str) -> &'a mut Value {
	for segment in segments(path) {
		if !node.is_object() {
			*node = Value::Object(Map::new());
		}
		node = match node {
			Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
			_ => unreachable!("node was just made an object"),
		};
	}
	node
}

fn prune_root(root: &mut Value) {
	if !prune(root) {
		*root = Value::Null;
	}
}

// Returns whether the value still exists.
fn prune(value: &mut Value) -> bool {
	match value {
		Value::Null => false,
		Value::Object(map) => {
			map.retain(|_, child| prune(child));
			!map.is_empty()
		},
		_ => true,
	}
}
