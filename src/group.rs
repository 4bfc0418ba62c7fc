//! Functional-group discovery: turning a flat run of operations into one
//! expression tree per statement, plus the jump-topology annotations
//! structural control-flow recovery (`crate::block`) reads back off.
//!
//! A [`crate::sub::Loc`] is a straight-line run of operations with no
//! internal jump targets. Executed as a stack machine, low address to high,
//! each operation either pushes a value (a [`crate::sink::Node::Source`]),
//! pops one or more (a [`crate::sink::Node::Sink`]), or both. A *functional
//! group* is the maximal run of operations whose net stack effect is a
//! single fully-consumed statement — the working stack returns to empty
//! right after the group's last (sink) operation.
//!
//! Any operations left dangling on the stack once the run is exhausted are
//! bare unconsumed pushes; each becomes its own single-node group instead of
//! silently disappearing.

use std::collections::BTreeMap;

use crate::arena::Id;
use crate::error::Error;
use crate::operation::Operation;
use crate::sink::{Node, NodeId, Tree};

/// How a group's rendered line should be overridden by structural recovery.
/// Plain groups render their `final_sink` normally (e.g. a bare `jmpz`
/// already decompiles to `if (COND)` via its schema template); these three
/// cases need text the schema can't express because it depends on context
/// `crate::block::resolve` discovers, not on the operation alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Override {
    #[default]
    None,
    While,
    ElseIf,
    Break,
}

/// One resolved statement: a root node in a [`Tree`] shared by the whole
/// containing [`crate::sub::Sub`].
#[derive(Debug)]
pub struct Group {
    pub root: NodeId,
    /// Lowest and highest addresses spanned, used for block-boundary checks.
    pub first_address: u32,
    pub last_address: u32,
    /// Outgoing unconditional jump target, if the final op is a bare `jmp`.
    pub jump: Option<u32>,
    /// Outgoing conditional jump target, if the final op is `jmpz`.
    pub jumpz: Option<u32>,
    /// Address of a group elsewhere in the sub whose unconditional `jmp`
    /// targets this group.
    pub jumped: Option<u32>,
    /// Address of a group elsewhere in the sub whose `jmpz` targets this
    /// group.
    pub jumpzed: Option<u32>,
    /// The next group in this sub, in address order.
    pub next: Option<u32>,
    /// Set by combo recognition to suppress the "simple group" fast path
    /// once a group has been rewritten into a high-level combo call.
    pub complex: bool,
    pub opens_block: bool,
    pub closes_block: bool,
    pub override_render: Override,
}

impl Group {
    /// A group is "simple" (§4.6's `init_decode` cutoff) when it hasn't been
    /// rewritten by combo recognition and every instruction it contains is
    /// schema-flagged `simple` (straight-line arithmetic/load/store).
    pub fn is_simple(&self, ops: &BTreeMap<u32, Operation>) -> bool {
        if self.complex {
            return false;
        }
        ops.range(self.first_address..=self.last_address)
            .all(|(_, op)| match op.schema {
                crate::operation::Schema::Static(s) => s.simple,
                crate::operation::Schema::Data | crate::operation::Schema::Failed { .. } => false,
            })
    }
}

/// Builds every functional group in a straight-line run of operation
/// addresses, appending resolved nodes to `tree` and consuming from `ops`.
pub fn resolve_groups(
    addresses: &[u32],
    ops: &BTreeMap<u32, Operation>,
    tree: &mut Tree,
) -> Result<Vec<Group>, Error> {
    let mut groups = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut group_start: Option<u32> = None;

    fn push_group(root: NodeId, first: u32, last: u32, groups: &mut Vec<Group>) {
        groups.push(Group {
            root,
            first_address: first,
            last_address: last,
            jump: None,
            jumpz: None,
            jumped: None,
            jumpzed: None,
            next: None,
            complex: false,
            opens_block: false,
            closes_block: false,
            override_render: Override::None,
        });
    }

    for &addr in addresses {
        let op = ops
            .get(&addr)
            .expect("operation address came from this same Loc's decode pass");
        if group_start.is_none() {
            group_start = Some(addr);
        }

        if op.pops > 0 {
            if (stack.len() as u8) < op.pops {
                return Err(Error::StackUnderflow {
                    address: addr,
                    mnemonic: op.mnemonic(),
                    pops: op.pops,
                    depth: stack.len() as i32,
                });
            }
            let taken = stack.split_off(stack.len() - op.pops as usize);
            let mut children: BTreeMap<u32, Id> = BTreeMap::new();
            for child in taken {
                let key = tree.get(child).address().unwrap_or(addr);
                children.insert(key, child);
            }
            let node = if op.pushes > 0 {
                Node::SinkSource {
                    address: addr,
                    children,
                }
            } else {
                Node::Sink {
                    address: addr,
                    children,
                }
            };
            let id = tree.push(node);
            if op.pushes > 0 {
                stack.push(id);
            } else if stack.is_empty() {
                push_group(id, group_start.take().unwrap(), addr, &mut groups);
            }
            // A pure sink that leaves the stack non-empty mid-group (should
            // not happen for well-formed input) simply keeps accumulating;
            // the next pure sink that drains the stack closes the group.
        } else if op.pushes > 0 {
            let id = tree.push(Node::Source { address: addr });
            stack.push(id);
        } else if stack.is_empty() {
            // A side-effect-only instruction (`turn_off()`, `nop`, an
            // unconditional `jmp`) at a stack-empty boundary is a complete
            // statement on its own.
            let id = tree.push(Node::Sink {
                address: addr,
                children: BTreeMap::new(),
            });
            push_group(id, group_start.take().unwrap(), addr, &mut groups);
        } else {
            return Err(Error::MalformedGroup { address: addr });
        }
    }

    for leftover in stack {
        let addr = tree.get(leftover).address().unwrap_or(0);
        push_group(leftover, addr, addr, &mut groups);
    }

    Ok(groups)
}

/// Cross-references a sub's flat, address-ordered group list: records each
/// group's outgoing `jump`/`jumpz` target (read off its final operation),
/// links `next` to the following group, then back-fills `jumped`/`jumpzed`
/// on whichever group each jump actually targets. Run once per sub, after
/// every loc's groups have been merged into one map (§4.4's structural
/// recovery walks this flat, annotated list).
pub fn annotate_jump_topology(groups: &mut BTreeMap<u32, Group>, ops: &BTreeMap<u32, Operation>) {
    let addresses: Vec<u32> = groups.keys().copied().collect();
    for (i, &addr) in addresses.iter().enumerate() {
        let op = match ops.get(&addr) {
            Some(op) => op,
            None => continue,
        };
        let group = groups.get_mut(&addr).unwrap();
        if op.is_jump() && op.is_conditional() {
            group.jumpz = op.jump_target;
        } else if op.is_jump() {
            group.jump = op.jump_target;
        }
        group.next = addresses.get(i + 1).copied();
    }

    let jumps: Vec<(u32, u32)> = addresses
        .iter()
        .filter_map(|&addr| groups[&addr].jump.map(|t| (addr, t)))
        .collect();
    for (addr, target) in jumps {
        if addr != 0 {
            if let Some(g) = groups.get_mut(&target) {
                g.jumped = Some(addr);
            }
        }
    }
    let jumpzs: Vec<(u32, u32)> = addresses
        .iter()
        .filter_map(|&addr| groups[&addr].jumpz.map(|t| (addr, t)))
        .collect();
    for (addr, target) in jumpzs {
        if let Some(g) = groups.get_mut(&target) {
            g.jumpzed = Some(addr);
        }
    }
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
    fn pushi_then_pop_forms_a_single_group() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x2A, 0x00], 0)); // pushi 42
        ops.insert(3, decode(&[0x06, 0x00, 0x00], 3)); // pop v0
        let mut tree = Tree::new();
        let groups = resolve_groups(&[0, 3], &ops, &mut tree).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            tree.get(groups[0].root)
                .render(groups[0].root, &tree, &ops, &|v| format!("v{v}")),
            "v0 = 42"
        );
    }

    #[test]
    fn two_independent_statements_split_into_two_groups() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x01, 0x00], 0)); // pushi 1
        ops.insert(3, decode(&[0x06, 0x00, 0x00], 3)); // pop v0
        ops.insert(6, decode(&[0x05, 0x02, 0x00], 6)); // pushi 2
        ops.insert(9, decode(&[0x06, 0x01, 0x00], 9)); // pop v1
        let mut tree = Tree::new();
        let groups = resolve_groups(&[0, 3, 6, 9], &ops, &mut tree).unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn unconsumed_trailing_push_becomes_its_own_group() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x09, 0x00], 0)); // pushi 9, never popped
        let mut tree = Tree::new();
        let groups = resolve_groups(&[0], &ops, &mut tree).unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn standalone_side_effect_op_forms_its_own_group() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x1E], 0)); // turnoff
        let mut tree = Tree::new();
        let groups = resolve_groups(&[0], &ops, &mut tree).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            tree.get(groups[0].root)
                .render(groups[0].root, &tree, &ops, &|v| v.to_string()),
            "turn_off()"
        );
    }

    #[test]
    fn jump_topology_links_jumpz_to_its_target() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x01, 0x00], 0)); // pushi 1
        ops.insert(3, decode(&[0x09, 0x09, 0x00], 3)); // jmpz -> 9
        ops.insert(6, decode(&[0x1E], 6)); // turnoff (skipped if false)
        ops.insert(9, decode(&[0x00], 9)); // end
        let mut tree = Tree::new();
        let mut groups = BTreeMap::new();
        for g in resolve_groups(&[0, 3], &ops, &mut tree).unwrap() {
            groups.insert(g.first_address, g);
        }
        for g in resolve_groups(&[6], &ops, &mut tree).unwrap() {
            groups.insert(g.first_address, g);
        }
        for g in resolve_groups(&[9], &ops, &mut tree).unwrap() {
            groups.insert(g.first_address, g);
        }
        annotate_jump_topology(&mut groups, &ops);
        assert_eq!(groups[&0].jumpz, Some(9));
        assert_eq!(groups[&9].jumpzed, Some(0));
        assert_eq!(groups[&0].next, Some(6));
    }
}
