//! Subroutines and the straight-line runs ("locs") they're broken into.

use std::collections::BTreeMap;

use crate::arena::{Arena, Id};
use crate::block::Block;
use crate::group::Group;
use crate::sink::Tree;

/// A straight-line run of operations: no jump target lands inside it, and
/// it ends in exactly one control-transfer operation (`jmp`, `jmpz`, `ret`,
/// `end`) or falls through into the next loc.
#[derive(Debug, Clone)]
pub struct Loc {
    pub address: u32,
    pub operations: Vec<u32>,
    /// Address one past the last operation's last byte.
    pub end: u32,
}

/// `start`, `init`, `main`, or one of the user-defined `sub_XXXX` targets a
/// `call` instruction can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubKind {
    Start,
    Init,
    Main,
    Named,
}

pub struct Sub {
    pub address: u32,
    pub kind: SubKind,
    pub arg_count: u8,
    /// Locs making up this sub's body, keyed by starting address.
    pub locs: BTreeMap<u32, Loc>,
    /// Shared expression-tree arena for every group resolved in this sub.
    pub tree: Tree,
    /// Resolved functional groups, keyed by their first operation's address.
    pub groups: BTreeMap<u32, Group>,
    /// Structural control-flow tree, built by [`crate::block::resolve`] once
    /// `groups` has been annotated with jump topology.
    pub blocks: Arena<Block>,
    /// The sub's outermost (implicit, braceless) block.
    pub root: Id,
}

impl Sub {
    pub fn new(address: u32, kind: SubKind, arg_count: u8) -> Self {
        Self {
            address,
            kind,
            arg_count,
            locs: BTreeMap::new(),
            tree: Tree::new(),
            groups: BTreeMap::new(),
            blocks: Arena::new(),
            root: Id(0),
        }
    }

    /// Re-derives the block tree from `groups` (whose jump topology must
    /// already be annotated). Called once after a sub's groups are first
    /// resolved, and again by `init_decode`'s renormalization pass once
    /// `init`'s alloc/map groups have been stripped out.
    pub fn resolve_blocks(&mut self) {
        let (arena, root) = crate::block::resolve(&mut self.groups);
        self.blocks = arena;
        self.root = root;
    }

    pub fn name(&self) -> String {
        match self.kind {
            SubKind::Start => "start".to_string(),
            SubKind::Init => "init".to_string(),
            SubKind::Main => "main".to_string(),
            SubKind::Named => format!("sub_{:04X}", self.address),
        }
    }

    pub fn prototype(&self) -> String {
        match self.kind {
            SubKind::Start | SubKind::Init | SubKind::Main => self.name(),
            SubKind::Named => {
                let args: Vec<String> = (0..self.arg_count).map(|i| format!("a{i}")).collect();
                format!("function {}({})", self.name(), args.join(", "))
            }
        }
    }

    /// End address of the sub: one past its last loc.
    pub fn end(&self) -> u32 {
        self.locs
            .values()
            .map(|l| l.end)
            .max()
            .unwrap_or(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_sub_prototype_lists_its_arguments() {
        let sub = Sub::new(0x100, SubKind::Named, 2);
        assert_eq!(sub.prototype(), "function sub_0100(a0, a1)");
    }

    #[test]
    fn main_prototype_is_bare() {
        let sub = Sub::new(0x10, SubKind::Main, 0);
        assert_eq!(sub.prototype(), "main");
    }
}
