//! Combo recognition (spec §4.7): `main`'s last `2*combo_count + 1` top-level
//! statements are a state machine the original compiler generated for each
//! `combo { }` block — a selector header paired with a body that sets three
//! slots (`v0[3k]`, `v0[3k+1]`, `v0[3k+2]`) per combo `k`. This pass lifts
//! each pair out of `main`, flattens the compiler scaffolding inside the
//! body, and rewrites the resulting triples into `combo_run`/`combo_restart`/
//! `combo_stop`/`combo_running` calls.
//!
//! Grounded directly on `gpclib/decode.py`'s `split_combos`, `resolve_combos`,
//! `flatten_combo`, `fix_combo_calls`, `fix_combos` and `fix_run_combo`. That
//! original matches structure by string-comparing each operand's *decompiled
//! text* (`sorted(s.decompile() for s in sources)`); per spec §9's design
//! note that "a structural match on operation + argument tuple would be
//! sounder and should replace it", this port compares raw slot/immediate
//! values instead of rendered text.

use std::collections::BTreeMap;

use crate::block::{Child, OrderedAddress};
use crate::operation::{Operation, Schema};
use crate::sink::{Node, NodeId, Tree};
use crate::sub::Sub;

/// One recovered `combo comboK { ... }` body, referencing groups and nested
/// blocks still owned by the `main` sub they were lifted out of.
pub struct Combo {
    pub index: u32,
    pub children: BTreeMap<OrderedAddress, Child>,
}

/// An operand discovered under a group's final sink, ordered the same way
/// the original's `sorted(decompile())` orders its text: immediates (digit
/// strings) before variable names (`v...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Operand {
    Immediate(i64),
    Slot(i64),
}

fn collect_operands(id: NodeId, tree: &Tree, ops: &BTreeMap<u32, Operation>, out: &mut Vec<Operand>) {
    match tree.get(id) {
        Node::Source { address } => {
            let Some(op) = ops.get(address) else { return };
            if op.is_push() {
                if let Some(slot) = op.var_slot() {
                    out.push(Operand::Slot(slot));
                }
            } else if matches!(op.schema, Schema::Static(s) if s.op_id == 0x05) {
                if let Some(&value) = op.raw_args.first() {
                    out.push(Operand::Immediate(value));
                }
            }
        }
        Node::Sink { children, .. } | Node::SinkSource { children, .. } => {
            let ids: Vec<NodeId> = children.values().copied().collect();
            for child in ids {
                collect_operands(child, tree, ops, out);
            }
        }
        Node::Fake { .. } => {}
    }
}

fn group_operands(addr: u32, main: &Sub, ops: &BTreeMap<u32, Operation>) -> Vec<Operand> {
    let mut operands = Vec::new();
    if let Some(group) = main.groups.get(&addr) {
        collect_operands(group.root, &main.tree, ops, &mut operands);
    }
    operands.sort();
    operands
}

/// `true` when a condition/statement's operands are exactly `[_, v0[3k+2]]`
/// — the pattern `flatten_combo` drops as compiler scaffolding.
fn matches_scaffold_pattern(idx: u32, operands: &[Operand]) -> bool {
    operands.len() == 2 && operands[1] == Operand::Slot(idx as i64 * 3 + 2)
}

fn flatten_into(
    idx: u32,
    child: Child,
    main: &Sub,
    ops: &BTreeMap<u32, Operation>,
    out: &mut BTreeMap<OrderedAddress, Child>,
) {
    match child {
        Child::Nested(block_id) => {
            let block = main.blocks.get(block_id);
            let scaffold = block
                .condition
                .map(|addr| matches_scaffold_pattern(idx, &group_operands(addr, main, ops)))
                .unwrap_or(false);
            if scaffold {
                let grandchildren: Vec<Child> = block.children.values().copied().collect();
                for grandchild in grandchildren {
                    flatten_into(idx, grandchild, main, ops, out);
                }
            } else {
                out.insert(OrderedAddress::of_block(block.start, block.end.unwrap_or(block.start)), child);
            }
        }
        Child::Stmt(addr) => {
            if should_drop_stmt(idx, addr, main, ops) {
                return;
            }
            out.insert(OrderedAddress::normal(addr), child);
        }
    }
}

fn should_drop_stmt(idx: u32, addr: u32, main: &Sub, ops: &BTreeMap<u32, Operation>) -> bool {
    let Some(group) = main.groups.get(&addr) else { return false };
    let Some(op) = ops.get(&group.last_address) else { return false };
    let operands = group_operands(addr, main, ops);

    if op.is_pop() {
        if let Some(slot) = op.var_slot() {
            let base = idx as i64 * 3;
            if (base..=base + 2).contains(&slot) && operands.first() == Some(&Operand::Immediate(0)) {
                return true;
            }
        }
    }
    matches_scaffold_pattern(idx, &operands)
}

/// Pulls `main`'s trailing `2 * combo_count + 1` top-level statements apart
/// into `combo_count` selector/body pairs, flattens each body, and returns
/// the recovered combos. `main.root`'s children shrink by `2 * combo_count`
/// entries; the one unpaired trailing entry (the sub's final `end`) is left
/// untouched.
pub fn split_and_resolve(main: &mut Sub, ops: &BTreeMap<u32, Operation>, combo_count: u32) -> Vec<Combo> {
    if combo_count == 0 {
        return Vec::new();
    }
    let need = combo_count as usize * 2 + 1;

    let root_children: Vec<(OrderedAddress, Child)> = {
        let root = main.blocks.get(main.root);
        root.children.iter().map(|(&k, &v)| (k, v)).collect()
    };
    if root_children.len() < need {
        tracing::warn!(
            have = root_children.len(),
            need,
            "not enough top-level statements in main to split combos out of"
        );
        return Vec::new();
    }
    let tail = &root_children[root_children.len() - need..];

    {
        let root = main.blocks.get_mut(main.root);
        for &(key, _) in &tail[..tail.len() - 1] {
            root.children.remove(&key);
        }
    }

    let mut combos = Vec::with_capacity(combo_count as usize);
    for k in 0..combo_count as usize {
        let (case_key, case_child) = tail[2 * k];
        let (block_key, block_child) = tail[2 * k + 1];
        // The higher-address of the pair is the body (nested block); the
        // selector header never survives into the combo's rendered body.
        let body = if block_key > case_key { block_child } else { case_child };

        let mut children = BTreeMap::new();
        flatten_into(k as u32, body, main, ops, &mut children);
        combos.push(Combo { index: k as u32, children });
    }
    combos
}

fn single_child(tree: &Tree, sink_id: NodeId) -> Option<NodeId> {
    match tree.get(sink_id) {
        Node::Sink { children, .. } | Node::SinkSource { children, .. } => {
            children.values().next().copied()
        }
        _ => None,
    }
}

fn child_op_id(tree: &Tree, id: NodeId, ops: &BTreeMap<u32, Operation>) -> Option<u8> {
    let address = tree.get(id).address()?;
    match ops.get(&address)?.schema {
        Schema::Static(s) => Some(s.op_id),
        _ => None,
    }
}

fn child_immediate(tree: &Tree, id: NodeId, ops: &BTreeMap<u32, Operation>) -> Option<i64> {
    let address = tree.get(id).address()?;
    let op = ops.get(&address)?;
    match op.schema {
        Schema::Static(s) if s.op_id == 0x05 => op.raw_args.first().copied(),
        _ => None,
    }
}

fn pop_at(addr: u32, groups: &BTreeMap<u32, crate::group::Group>, ops: &BTreeMap<u32, Operation>) -> Option<(NodeId, i64)> {
    let group = groups.get(&addr)?;
    let op = ops.get(&group.last_address)?;
    if !op.is_pop() {
        return None;
    }
    let slot = op.var_slot()?;
    Some((group.root, slot))
}

/// Detects the canonical triple starting at `addrs[0]`: three consecutive
/// `pop`s to `v0[3k]`, `v0[3k+1]`, `v0[3k+2]`, the latter two always a
/// `pushi 0` source, the first a bare `pushi` immediate.
fn triple_value(
    addrs: &[u32],
    groups: &BTreeMap<u32, crate::group::Group>,
    tree: &Tree,
    ops: &BTreeMap<u32, Operation>,
    combo_count: u32,
) -> Option<(u32, i64)> {
    let (root0, slot0) = pop_at(addrs[0], groups, ops)?;
    let (root1, slot1) = pop_at(addrs[1], groups, ops)?;
    let (root2, slot2) = pop_at(addrs[2], groups, ops)?;

    if slot0 % 3 != 0 || slot0 < 0 {
        return None;
    }
    let k = slot0 / 3;
    if k >= combo_count as i64 || slot1 != slot0 + 1 || slot2 != slot0 + 2 {
        return None;
    }

    let c0 = single_child(tree, root0)?;
    let c1 = single_child(tree, root1)?;
    let c2 = single_child(tree, root2)?;
    if child_op_id(tree, c0, ops) != Some(0x05) {
        return None;
    }
    if child_op_id(tree, c1, ops) != Some(0x05) || child_immediate(tree, c1, ops) != Some(0) {
        return None;
    }
    if child_op_id(tree, c2, ops) != Some(0x05) || child_immediate(tree, c2, ops) != Some(0) {
        return None;
    }
    let value = child_immediate(tree, c0, ops)?;
    Some((k as u32, value))
}

fn set_fake(tree: &mut Tree, id: NodeId, text: String) {
    *tree.get_mut(id) = Node::Fake { text };
}

fn mark_complex(groups: &mut BTreeMap<u32, crate::group::Group>, addr: u32) {
    if let Some(g) = groups.get_mut(&addr) {
        g.complex = true;
    }
}

/// Single-group rewrites tried when no triple starts at this address:
/// `pop v0[3k] = pushi 1` → `call(comboK)`, `pop v0[3k] = pushi N` (N != 1)
/// → `combo_run(comboK)`, `pop v0[3k+1] = mul ...` (timer scaffolding) →
/// empty text.
fn rewrite_single(addr: u32, groups: &mut BTreeMap<u32, crate::group::Group>, tree: &mut Tree, ops: &BTreeMap<u32, Operation>, combo_count: u32) {
    let Some((root, slot)) = pop_at(addr, groups, ops) else { return };
    if slot < 0 {
        return;
    }
    if slot % 3 == 1 {
        let k = slot / 3;
        if k >= combo_count as i64 {
            return;
        }
        if let Some(child) = single_child(tree, root) {
            if child_op_id(tree, child, ops) == Some(0x14) {
                set_fake(tree, root, String::new());
                mark_complex(groups, addr);
            }
        }
        return;
    }
    if slot % 3 != 0 {
        return;
    }
    let k = slot / 3;
    if k >= combo_count as i64 {
        return;
    }
    let Some(child) = single_child(tree, root) else { return };
    if child_op_id(tree, child, ops) != Some(0x05) {
        return;
    }
    let Some(value) = child_immediate(tree, child, ops) else { return };
    let text = if value == 1 {
        format!("call(combo{k})")
    } else {
        format!("combo_run(combo{k})")
    };
    set_fake(tree, root, text);
    mark_complex(groups, addr);
}

fn rewrite_running_sources(id: NodeId, tree: &mut Tree, ops: &BTreeMap<u32, Operation>, combo_count: u32) {
    let children = match tree.get(id) {
        Node::Source { address } => {
            if let Some(op) = ops.get(address) {
                if op.is_push() {
                    if let Some(slot) = op.var_slot() {
                        if slot >= 0 && slot % 3 == 0 && slot / 3 < combo_count as i64 {
                            let k = slot / 3;
                            set_fake(tree, id, format!("combo_running(combo{k})"));
                        }
                    }
                }
            }
            return;
        }
        Node::Sink { children, .. } | Node::SinkSource { children, .. } => {
            children.values().copied().collect::<Vec<_>>()
        }
        Node::Fake { .. } => return,
    };
    for child in children {
        rewrite_running_sources(child, tree, ops, combo_count);
    }
}

/// Runs the triple/single/running-source rewrite over every group in `sub`,
/// in address order. Matches `fix_run_combo`, applied to every sub including
/// `main` after its combo bodies have been extracted — calls from outside
/// `main` (or left behind in `main` itself) render symbolically too.
pub fn fix_run_combo(sub: &mut Sub, ops: &BTreeMap<u32, Operation>, combo_count: u32) {
    if combo_count == 0 {
        return;
    }
    let addrs: Vec<u32> = sub.groups.keys().copied().collect();
    let mut i = 0;
    while i < addrs.len() {
        if i + 2 < addrs.len() {
            if let Some((k, value)) = triple_value(&addrs[i..i + 3], &sub.groups, &sub.tree, ops, combo_count) {
                let text = if value == 1 {
                    format!("combo_restart(combo{k})")
                } else {
                    format!("combo_stop(combo{k})")
                };
                let (r0, _) = pop_at(addrs[i], &sub.groups, ops).unwrap();
                let (r1, _) = pop_at(addrs[i + 1], &sub.groups, ops).unwrap();
                let (r2, _) = pop_at(addrs[i + 2], &sub.groups, ops).unwrap();
                set_fake(&mut sub.tree, r0, text);
                set_fake(&mut sub.tree, r1, String::new());
                set_fake(&mut sub.tree, r2, String::new());
                mark_complex(&mut sub.groups, addrs[i]);
                mark_complex(&mut sub.groups, addrs[i + 1]);
                mark_complex(&mut sub.groups, addrs[i + 2]);
                i += 3;
                continue;
            }
        }
        rewrite_single(addrs[i], &mut sub.groups, &mut sub.tree, ops, combo_count);
        i += 1;
    }

    let roots: Vec<NodeId> = sub.groups.values().map(|g| g.root).collect();
    for root in roots {
        rewrite_running_sources(root, &mut sub.tree, ops, combo_count);
    }
}
