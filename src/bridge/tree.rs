//! Path tree built incrementally from batches.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
}

#[derive(Debug, Default)]
pub struct FileTree {
    root: Node,
    nodes: usize,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rel` component by component. Returns the newly created nodes as (depth, name).
    pub fn insert(&mut self, rel: &Path) -> Vec<(usize, String)> {
        let mut added = Vec::new();
        let mut node = &mut self.root;
        for (depth, part) in rel.components().enumerate() {
            let name = part.as_os_str().to_string_lossy().into_owned();
            if !node.children.contains_key(&name) {
                added.push((depth, name.clone()));
            }
            node = node.children.entry(name).or_default();
        }
        self.nodes += added.len();
        added
    }

    pub fn len(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    /// Indented rendering, two spaces per level, children sorted by name.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_node(&self.root, 0, &mut out);
        out
    }
}

fn render_node(node: &Node, depth: usize, out: &mut String) {
    for (name, child) in &node.children {
        out.push_str(&"  ".repeat(depth));
        out.push_str(name);
        out.push('\n');
        render_node(child, depth + 1, out);
    }
}
