//! Structural control-flow recovery: turning a sub's flat, address-ordered
//! group list and its `jmp`/`jmpz` topology into a tree of nested
//! `while`/`if`/`else`/`else if` [`Block`]s.
//!
//! GBC only expresses structured control flow through two primitives —
//! `jmpz target` (pop a value, skip forward past a body if false) and `jmp
//! target` (unconditional) — so this walks the shape those jumps draw over
//! the already-annotated group list (see [`crate::group::annotate_jump_topology`])
//! rather than reading any explicit block markers from the bytecode. The
//! match arms below mirror the nine patterns in spec §4.4 in the same order
//! they're tried; a group matching none of them falls through to the plain
//! path rather than aborting (§7's defensive fallback).

use std::collections::BTreeMap;

use crate::arena::{Arena, Id};
use crate::group::{Group, Override};

pub type BlockId = Id;

/// Sort key for a block's children. Groups sort at `address * 2`; an empty
/// nested block (`start == end`, e.g. a `while` with no body) sorts at
/// `address * 2 - 1` so it lands immediately before — never colliding with —
/// a real group that happens to share its address, per spec §3's "decrement
/// by ½" convention realized without floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderedAddress(i64);

impl OrderedAddress {
    pub(crate) fn normal(addr: u32) -> Self {
        Self(addr as i64 * 2)
    }

    pub(crate) fn of_block(start: u32, end: u32) -> Self {
        if start == end {
            Self(start as i64 * 2 - 1)
        } else {
            Self(start as i64 * 2)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Child {
    Stmt(u32),
    Nested(BlockId),
}

#[derive(Debug)]
pub struct Block {
    pub start: u32,
    /// `None` for the sub's implicit, braceless root.
    pub end: Option<u32>,
    pub is_while: bool,
    pub is_else: bool,
    /// Closing brace is suppressed: the following sibling (an `else`/`else
    /// if`) supplies its own leading `} ` instead.
    pub closing: bool,
    /// Address of the group whose expression controls this block.
    pub condition: Option<u32>,
    else_pending: Option<u32>,
    else_condition: Option<u32>,
    pub children: BTreeMap<OrderedAddress, Child>,
}

impl Block {
    fn new(start: u32, end: Option<u32>) -> Self {
        Self {
            start,
            end,
            is_while: false,
            is_else: false,
            closing: false,
            condition: None,
            else_pending: None,
            else_condition: None,
            children: BTreeMap::new(),
        }
    }

    fn insert_stmt(&mut self, addr: u32) {
        self.children.insert(OrderedAddress::normal(addr), Child::Stmt(addr));
    }

    fn insert_nested(&mut self, start: u32, end: u32, id: BlockId) {
        self.children
            .insert(OrderedAddress::of_block(start, end), Child::Nested(id));
    }
}

/// Builds the block tree for one sub's already-annotated group map,
/// returning the arena and the id of the outermost (implicit) block.
///
/// Mutates `groups` in place: while/break/else-if headers get their
/// rendered text overridden and their `opens_block`/`closes_block` layout
/// flags set, exactly as spec §4.4 describes.
pub fn resolve(groups: &mut BTreeMap<u32, Group>) -> (Arena<Block>, BlockId) {
    let addresses: Vec<u32> = groups.keys().copied().collect();
    let mut arena: Arena<Block> = Arena::new();
    let mut root: Option<BlockId> = None;
    let mut current: BlockId = Id(0);
    let mut stack: Vec<BlockId> = Vec::new();

    for addr in addresses {
        if root.is_none() {
            let id = arena.push(Block::new(addr, None));
            root = Some(id);
            current = id;
        }

        while arena.get(current).end == Some(addr) && !stack.is_empty() {
            current = stack.pop().unwrap();
        }

        let (jump, jumpz, jumped, jumpzed, next) = {
            let g = &groups[&addr];
            (g.jump, g.jumpz, g.jumped, g.jumpzed, g.next)
        };
        let block_condition = arena.get(current).condition;
        let block_else_pending = arena.get(current).else_pending;

        if jump.is_none() && jumpz.is_none() && jumped.is_none() && jumpzed.is_none() {
            // Plain: nothing jumps here and this group jumps nowhere.
            arena.get_mut(current).insert_stmt(addr);
        } else if let (Some(jumped_from), Some(jumpz_target)) =
            (jumped.filter(|&from| from > addr), jumpz)
        {
            // While header: a later `jmp` loops back up to this `jmpz`. Gated
            // on `jumped` (not `jumpzed`), matching `decode.py`'s single
            // `elif group._jumped and group._jumpz and group._jumped >
            // group.address` — anything with `jumped_from <= addr` falls
            // through to the remaining checks below, which are all gated on
            // `jumpzed`, per spec §4.4.
            let _ = jumped_from;
            let g = groups.get_mut(&addr).unwrap();
            g.override_render = Override::While;
            g.opens_block = true;
            stack.push(current);
            arena.get_mut(current).insert_stmt(addr);
            let body_start = next.unwrap_or(addr);
            let id = arena.push(Block::new(body_start, Some(jumpz_target)));
            {
                let b = arena.get_mut(id);
                b.is_while = true;
                b.condition = Some(addr);
            }
            arena.get_mut(current).insert_nested(body_start, jumpz_target, id);
            current = id;
        } else if block_condition.is_some() && jump == block_condition {
            // While tail: the back-edge jump targets this block's own
            // condition group.
            arena.get_mut(current).insert_stmt(addr);
            current = stack.pop().unwrap_or(current);
        } else if block_condition.is_some() && jump.is_some() {
            let target = jump.unwrap();
            let is_break = stack.iter().any(|&id| {
                let b = arena.get(id);
                b.is_while
                    && b.condition
                        .map(|c| groups.get(&c).and_then(|g| g.jumpz) == Some(target))
                        .unwrap_or(false)
            });
            if is_break {
                groups.get_mut(&addr).unwrap().override_render = Override::Break;
                arena.get_mut(current).insert_stmt(addr);
            } else {
                // If-end: this `jmp` skips over an `else` arm.
                arena.get_mut(current).insert_stmt(addr);
                let cond = arena.get(current).condition;
                arena.get_mut(current).closing = true;
                current = stack.pop().unwrap_or(current);
                let outer = arena.get_mut(current);
                outer.else_pending = Some(target);
                outer.else_condition = cond;
            }
        } else if jumpzed.is_some()
            && jump.is_none()
            && jumpz.is_none()
            && block_else_pending.is_some()
        {
            // Else block start: the first statement of the `else` arm.
            let end = block_else_pending.unwrap();
            let cond = arena.get(current).else_condition;
            stack.push(current);
            let id = arena.push(Block::new(addr, Some(end)));
            {
                let b = arena.get_mut(id);
                b.is_else = true;
                b.condition = cond;
                b.insert_stmt(addr);
            }
            arena.get_mut(current).else_pending = None;
            arena.get_mut(current).insert_nested(addr, end, id);
            current = id;
        } else if (jumped.is_some() || jumpzed.is_some()) && jump.is_none() && jumpz.is_none() {
            // Plain statement right after a conditional, no block transition.
            arena.get_mut(current).insert_stmt(addr);
        } else if jumpzed.is_some() && jumpz.is_some() && block_else_pending.is_some() {
            resolve_else_if_or_plain(
                &mut arena, groups, &mut stack, &mut current, addr, jump, jumpz, jumped, jumpzed,
                next, block_condition, block_else_pending,
            );
        } else if jumpz.is_some() {
            // If header, no else-pending context.
            let target = jumpz.unwrap();
            groups.get_mut(&addr).unwrap().opens_block = true;
            stack.push(current);
            arena.get_mut(current).insert_stmt(addr);
            let body_start = next.unwrap_or(addr);
            let id = arena.push(Block::new(body_start, Some(target)));
            arena.get_mut(id).condition = Some(addr);
            arena.get_mut(current).insert_nested(body_start, target, id);
            current = id;
        } else {
            // Defensive fallback (§7): an unrecognised combination renders
            // as a plain statement instead of aborting recovery.
            arena.get_mut(current).insert_stmt(addr);
        }
    }

    (arena, root.unwrap_or_else(|| arena_with_empty_root(&mut arena)))
}

fn arena_with_empty_root(arena: &mut Arena<Block>) -> BlockId {
    arena.push(Block::new(0, None))
}

/// Body for the `jumpzed && jumpz && else_pending` branch — an else-if
/// chain, or, falling through the `found` walk, a genuinely nested `if`
/// inside an implicit `else`. Gated purely on `jumpzed`, never `jumped`:
/// `decode.py`'s matching branch (`elif group._jumpzed and group._jumpz and
/// block._else_pending`) never looks at `_jumped` either.
#[allow(clippy::too_many_arguments)]
fn resolve_else_if_or_plain(
    arena: &mut Arena<Block>,
    groups: &mut BTreeMap<u32, Group>,
    stack: &mut Vec<BlockId>,
    current: &mut BlockId,
    addr: u32,
    _jump: Option<u32>,
    jumpz: Option<u32>,
    _jumped: Option<u32>,
    _jumpzed: Option<u32>,
    next: Option<u32>,
    _block_condition: Option<u32>,
    block_else_pending: Option<u32>,
) {
    let Some(else_pending) = block_else_pending else {
        arena.get_mut(*current).insert_stmt(addr);
        return;
    };
    let target = match jumpz {
        Some(t) => t,
        None => {
            arena.get_mut(*current).insert_stmt(addr);
            return;
        }
    };

    // Walk the chain of `jmpz` targets starting at this group's own target:
    // if it reaches an address strictly before `else_pending` with no
    // further `jmpz` of its own, there is trailing code after this `if`
    // inside the `else` arm, so it cannot collapse into `else if`.
    let mut found = false;
    let mut cursor = target;
    loop {
        if cursor >= else_pending {
            break;
        }
        match groups.get(&cursor).and_then(|g| g.jumpz) {
            Some(next_target) => cursor = next_target,
            None => {
                found = true;
                break;
            }
        }
    }

    if found {
        groups.get_mut(&addr).unwrap().opens_block = true;
        let cond = arena.get(*current).else_condition;
        stack.push(*current);
        let else_id = arena.push(Block::new(addr, Some(else_pending)));
        {
            let b = arena.get_mut(else_id);
            b.is_else = true;
            b.condition = cond;
        }
        arena.get_mut(*current).else_pending = None;
        arena.get_mut(*current).insert_nested(addr, else_pending, else_id);
        *current = else_id;
        stack.push(*current);
        arena.get_mut(*current).insert_stmt(addr);

        let body_start = next.unwrap_or(addr);
        let if_id = arena.push(Block::new(body_start, Some(target)));
        arena.get_mut(if_id).condition = Some(addr);
        arena.get_mut(*current).insert_nested(body_start, target, if_id);
        *current = if_id;
    } else {
        arena.get_mut(*current).else_pending = None;
        let g = groups.get_mut(&addr).unwrap();
        g.override_render = Override::ElseIf;
        g.opens_block = true;
        g.closes_block = true;
        stack.push(*current);
        arena.get_mut(*current).insert_stmt(addr);

        let body_start = next.unwrap_or(addr);
        let if_id = arena.push(Block::new(body_start, Some(target)));
        arena.get_mut(if_id).condition = Some(addr);
        arena.get_mut(*current).insert_nested(body_start, target, if_id);
        *current = if_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::Cursor;
    use crate::operation::Operation;
    use crate::sink::Tree;

    fn decode(bytes: &[u8], address: u32) -> Operation {
        let mut cursor = Cursor::new(bytes, address);
        Operation::decode_one(&mut cursor, address).unwrap()
    }

    /// `if (TRUE) { v0 = 7; }` — pushi 1; jmpz 9; pushi 7; pop v0; [9] end
    #[test]
    fn recovers_a_plain_if() {
        let mut ops = BTreeMap::new();
        ops.insert(0, decode(&[0x05, 0x01, 0x00], 0)); // pushi 1
        ops.insert(3, decode(&[0x09, 0x0A, 0x00], 3)); // jmpz -> 10
        ops.insert(6, decode(&[0x05, 0x07, 0x00], 6)); // pushi 7
        ops.insert(9, decode(&[0x06, 0x00, 0x00], 9)); // pop v0
        ops.insert(12, decode(&[0x00], 12)); // end is past our range; unused

        let mut tree = Tree::new();
        let mut groups = BTreeMap::new();
        for g in crate::group::resolve_groups(&[0, 3], &ops, &mut tree).unwrap() {
            groups.insert(g.first_address, g);
        }
        for g in crate::group::resolve_groups(&[6, 9], &ops, &mut tree).unwrap() {
            groups.insert(g.first_address, g);
        }
        crate::group::annotate_jump_topology(&mut groups, &ops);
        let (arena, root) = resolve(&mut groups);
        let r = arena.get(root);
        assert_eq!(r.children.len(), 1);
        match r.children.values().next().unwrap() {
            Child::Nested(id) => {
                let b = arena.get(*id);
                assert_eq!(b.condition, Some(0));
                assert!(!b.is_while);
                assert_eq!(b.children.len(), 1);
            }
            _ => panic!("expected the if-body to be nested"),
        }
        assert_eq!(groups[&0].opens_block, true);
    }
}
