use std::collections::HashMap;

use anyhow::Result;
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, Event},
};

use super::{ExportError, finish_document, new_document};
use crate::access::Level;

/// Deepest nesting the exporter follows before giving up on a hierarchy.
pub const MAX_TREE_DEPTH: usize = 32;

/// One child as reported by a [`ChildSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: String,
    pub label: String,
    /// Least privileged level still allowed to see this node; `None` means everyone.
    pub min_level: Option<Level>,
    pub has_children: bool,
}

impl TreeEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            min_level: None,
            has_children: true,
        }
    }

    pub fn restricted_to(mut self, level: Level) -> Self {
        self.min_level = Some(level);
        self
    }

    fn visible_to(&self, viewer: Option<Level>) -> bool {
        match (viewer, self.min_level) {
            (Some(viewer), Some(min_level)) => viewer.satisfies(min_level),
            _ => true,
        }
    }
}

/// Ordered children lookup. `None` asks for the top level (entries without a parent).
pub trait ChildSource {
    fn children_of(&self, parent: Option<&str>) -> Vec<TreeEntry>;
}

#[cfg(test)]
impl<F> ChildSource for F
where
    F: Fn(Option<&str>) -> Vec<TreeEntry>,
{
    fn children_of(&self, parent: Option<&str>) -> Vec<TreeEntry> {
        self(parent)
    }
}

/// In-memory parent → children map built from flat `(parent, entry)` pairs.
///
/// Insertion order is the sibling order handed back to the exporter.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    children: HashMap<Option<String>, Vec<TreeEntry>>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent: Option<String>, entry: TreeEntry) {
        self.children.entry(parent).or_default().push(entry);
    }
}

impl FromIterator<(Option<String>, TreeEntry)> for AdjacencyIndex {
    fn from_iter<T: IntoIterator<Item = (Option<String>, TreeEntry)>>(iter: T) -> Self {
        let mut index = Self::new();
        for (parent, entry) in iter {
            index.insert(parent, entry);
        }
        index
    }
}

impl ChildSource for AdjacencyIndex {
    fn children_of(&self, parent: Option<&str>) -> Vec<TreeEntry> {
        let key = parent.map(str::to_string);
        self.children
            .get(&key)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| TreeEntry {
                        has_children: self.children.contains_key(&Some(entry.id.clone())),
                        ..entry.clone()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Where a tree export starts.
#[derive(Debug, Clone)]
pub enum RootSelector {
    /// Every entry without a parent becomes a top-level item.
    Orphans,
    /// A single explicit root, emitted itself with its descendants below it.
    Node(TreeEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub open: bool,
    pub selected: bool,
    pub children: Vec<TreeNode>,
}

pub struct TreeExporter<'a, S: ChildSource + ?Sized> {
    source: &'a S,
    viewer: Option<Level>,
}

impl<'a, S: ChildSource + ?Sized> TreeExporter<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            viewer: None,
        }
    }

    pub fn visible_to(mut self, level: Level) -> Self {
        self.viewer = Some(level);
        self
    }

    pub fn build(&self, root: RootSelector) -> Result<Vec<TreeNode>, ExportError> {
        let top = match root {
            RootSelector::Orphans => self.source.children_of(None),
            RootSelector::Node(entry) => vec![entry],
        };

        let mut ancestors = Vec::new();
        let mut roots = Vec::new();
        for entry in top.into_iter().filter(|e| e.visible_to(self.viewer)) {
            roots.push(self.expand(entry, 0, &mut ancestors)?);
        }

        if let Some(first) = roots.first_mut() {
            first.selected = true;
        }
        Ok(roots)
    }

    fn expand(
        &self,
        entry: TreeEntry,
        depth: usize,
        ancestors: &mut Vec<String>,
    ) -> Result<TreeNode, ExportError> {
        if ancestors.contains(&entry.id) {
            return Err(ExportError::Cycle { id: entry.id });
        }
        if depth > MAX_TREE_DEPTH {
            return Err(ExportError::TooDeep {
                id: entry.id,
                limit: MAX_TREE_DEPTH,
            });
        }

        let mut children = Vec::new();
        if entry.has_children {
            ancestors.push(entry.id.clone());
            for child in self
                .source
                .children_of(Some(&entry.id))
                .into_iter()
                .filter(|child| child.visible_to(self.viewer))
            {
                children.push(self.expand(child, depth + 1, ancestors)?);
            }
            ancestors.pop();
        }

        Ok(TreeNode {
            id: entry.id,
            label: entry.label,
            open: true,
            selected: false,
            children,
        })
    }
}

/// Serializes top-level nodes under `<tree id="0">`.
pub fn tree_document(roots: &[TreeNode]) -> Result<String> {
    let mut writer = new_document()?;
    writer.write_event(Event::Start(
        BytesStart::new("tree").with_attributes([("id", "0")]),
    ))?;
    for node in roots {
        write_item(&mut writer, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new("tree")))?;
    Ok(finish_document(writer))
}

fn write_item(writer: &mut Writer<Vec<u8>>, node: &TreeNode) -> Result<()> {
    let mut start = BytesStart::new("item").with_attributes([
        ("text", node.label.as_str()),
        ("id", node.id.as_str()),
        ("open", if node.open { "yes" } else { "no" }),
    ]);
    if node.selected {
        start.push_attribute(("select", "1"));
    }

    writer.write_event(Event::Start(start))?;
    for child in &node.children {
        write_item(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

pub fn empty_tree_document() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><tree id="0"></tree>"#.to_string()
}
