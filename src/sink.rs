//! Expression-tree nodes built while resolving a [`crate::group::Group`].
//!
//! A functional group is decoded high-address-to-low-address off a working
//! stack: each instruction either produces a value (`Source`), consumes one
//! or more (`Sink`), or both (`SinkSource`). Resolving the group wires each
//! sink's consumed values to the sources (or sinks) that produced them,
//! keyed by the producing instruction's address, and the result is walked
//! depth-first to emit a single expression string.
//!
//! `Fake` stands in for a subtree the combo pass has already flattened into
//! literal text (`combo_run(combo3)`) and has no operation of its own.

use std::collections::BTreeMap;

use crate::arena::{Arena, Id};
use crate::operation::{Operation, Schema};

#[derive(Debug)]
pub enum Node {
    /// Pushes exactly one value, pops none: a leaf.
    Source { address: u32 },
    /// Pops one or more values, pushes none.
    Sink {
        address: u32,
        children: BTreeMap<u32, Id>,
    },
    /// Pops one or more values and pushes one: an interior node.
    SinkSource {
        address: u32,
        children: BTreeMap<u32, Id>,
    },
    Fake { text: String },
}

pub type NodeId = Id;
pub type Tree = Arena<Node>;

impl Node {
    pub fn address(&self) -> Option<u32> {
        match self {
            Node::Source { address } => Some(*address),
            Node::Sink { address, .. } => Some(*address),
            Node::SinkSource { address, .. } => Some(*address),
            Node::Fake { .. } => None,
        }
    }

    fn operation<'a>(&self, ops: &'a BTreeMap<u32, Operation>) -> Option<&'a Operation> {
        self.address().and_then(|a| ops.get(&a))
    }

    fn bounded(&self, ops: &BTreeMap<u32, Operation>) -> bool {
        self.operation(ops).map(Operation::bounded).unwrap_or(true)
    }

    fn is_sink_source(&self) -> bool {
        matches!(self, Node::SinkSource { .. })
    }

    /// The raw immediate value this node pushes, if it is a bare `pushi`
    /// leaf — the only case the `ret_constants` rewrite cares about.
    fn immediate(&self, ops: &BTreeMap<u32, Operation>) -> Option<i64> {
        match self {
            Node::Source { address } => {
                let op = ops.get(address)?;
                match op.schema {
                    Schema::Static(s) if s.op_id == 0x05 => op.raw_args.first().copied(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Depth-first render of this node and everything beneath it.
    pub fn render(
        &self,
        _id: NodeId,
        tree: &Tree,
        ops: &BTreeMap<u32, Operation>,
        var_name: &dyn Fn(i64) -> String,
    ) -> String {
        match self {
            Node::Fake { text } => text.clone(),
            Node::Source { address } => ops
                .get(address)
                .map(|op| op.render(&[], var_name))
                .unwrap_or_default(),
            Node::Sink { address, children } | Node::SinkSource { address, children } => {
                let Some(op) = ops.get(address) else {
                    return String::new();
                };
                let texts = render_children(op, children, tree, ops, var_name, !op.bounded());
                op.render(&texts, var_name)
            }
        }
    }
}

/// Renders every child of a sink, applying the per-child constant-table
/// rewrite, the `ret_constants` symbolic rewrite, and the "parenthesize a
/// nested unbounded `SinkSource`" rule.
fn render_children(
    parent: &Operation,
    children: &BTreeMap<u32, Id>,
    tree: &Tree,
    ops: &BTreeMap<u32, Operation>,
    var_name: &dyn Fn(i64) -> String,
    parent_unbounded: bool,
) -> Vec<String> {
    let ids: Vec<Id> = children.values().copied().collect();
    let mut texts: Vec<String> = ids
        .iter()
        .map(|id| tree.get(*id).render(*id, tree, ops, var_name))
        .collect();

    // A sink's constant tables cover the raw-argument positions first, then
    // one entry per popped child in stack (ascending-address) order — see
    // spec §4.5. A child whose value is a literal immediate renders through
    // whichever table covers its position, same as a direct raw argument
    // would (`Operation::render` handles the raw-argument half of this).
    if let Schema::Static(schema) = parent.schema {
        for (i, (text, id)) in texts.iter_mut().zip(&ids).enumerate() {
            let overall = parent.raw_args.len() + i;
            if let Some(Some(table)) = schema.constants.get(overall) {
                if let Some(value) = tree.get(*id).immediate(ops) {
                    if let Some(name) = table.lookup(value) {
                        *text = name.to_string();
                    }
                }
            }
        }
    }

    let ret_table = ids.iter().find_map(|id| {
        let node = tree.get(*id);
        node.operation(ops).and_then(|op| match op.schema {
            Schema::Static(s) => s.ret_constants,
            Schema::Data | Schema::Failed { .. } => None,
        })
    });
    if let Some(table) = ret_table {
        for (text, id) in texts.iter_mut().zip(&ids) {
            if let Some(value) = tree.get(*id).immediate(ops) {
                if let Some(name) = table.lookup(value) {
                    *text = name.to_string();
                }
            }
        }
    }

    if parent_unbounded {
        for (text, id) in texts.iter_mut().zip(&ids) {
            let node = tree.get(*id);
            if node.is_sink_source() && !node.bounded(ops) {
                *text = format!("({text})");
            }
        }
    }

    texts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::Cursor;

    fn decode(bytes: &[u8], address: u32) -> Operation {
        let mut cursor = Cursor::new(bytes, address);
        Operation::decode_one(&mut cursor, address).unwrap()
    }

    #[test]
    fn source_leaf_renders_its_operation() {
        let mut ops = BTreeMap::new();
        let data = [0x05, 0x2A, 0x00];
        ops.insert(0, decode(&data, 0));
        let mut tree = Tree::new();
        let id = tree.push(Node::Source { address: 0 });
        assert_eq!(
            tree.get(id).render(id, &tree, &ops, &|v| v.to_string()),
            "42"
        );
    }

    #[test]
    fn sink_renders_children_assembled_into_its_template() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x07, 0x00], 0)); // pushi 7
        ops.insert(3, decode(&[0x06, 0x00, 0x00], 3)); // pop v0
        let mut tree = Tree::new();
        let source = tree.push(Node::Source { address: 0 });
        let mut children = BTreeMap::new();
        children.insert(0, source);
        let sink = tree.push(Node::Sink {
            address: 3,
            children,
        });
        let rendered = tree
            .get(sink)
            .render(sink, &tree, &ops, &|v| format!("v{v}"));
        assert_eq!(rendered, "v0 = 7");
    }

    #[test]
    fn jmpz_condition_child_renders_through_truths_table() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x01, 0x00], 0)); // pushi 1
        ops.insert(3, decode(&[0x09, 0x0A, 0x00], 3)); // jmpz -> 10
        let mut tree = Tree::new();
        let source = tree.push(Node::Source { address: 0 });
        let mut children = BTreeMap::new();
        children.insert(0, source);
        let sink = tree.push(Node::Sink {
            address: 3,
            children,
        });
        let rendered = tree
            .get(sink)
            .render(sink, &tree, &ops, &|v| format!("v{v}"));
        assert_eq!(rendered, "if (TRUE)");
    }
}
