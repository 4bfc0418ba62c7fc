//! Text rendering: the three CLI front ends' entire job, reduced to calling
//! one of [`dump`], [`blocks`], or [`source`] over an already-decoded
//! [`Decoder`].
//!
//! `source`'s segmented layout and block-brace elision are a recursive
//! protocol over the `Block`/`Group` trees (spec §4.8/§6), not argument
//! parsing or file I/O, so it lives here in the library rather than in
//! `src/bin/gbc_source.rs` — the binary is a few lines of `clap` plus one
//! call into this module.

use std::collections::BTreeMap;

use crate::arena::Arena;
use crate::block::{Block, BlockId, Child, OrderedAddress};
use crate::decoder::Decoder;
use crate::group::{Group, Override};
use crate::operation::Operation;
use crate::sink::Tree;
use crate::sub::{Sub, SubKind};

// ---- `gbc-dump`: raw per-address opcode listing ---------------------------

/// One line per address: optional `sub`/`loc` label lines, then the
/// mnemonic and its raw, formatted arguments (spec §6's `dump` CLI).
pub fn dump(decoder: &Decoder) -> String {
    let mut out = String::new();
    for (&addr, op) in &decoder.operations {
        if let Some(label) = &op.sub_label {
            out.push_str(&format!("{addr:04X} {label}:\n"));
        }
        if let Some(label) = &op.loc_label {
            out.push_str(&format!("{addr:04X}\t{label}:\n"));
        }
        let args = op.dump_args();
        if args.is_empty() {
            out.push_str(&format!("{addr:04X}\t\t{}\n", op.mnemonic()));
        } else {
            out.push_str(&format!("{addr:04X}\t\t{} {}\n", op.mnemonic(), args));
        }
    }
    out
}

// ---- `gbc-blocks`: Block/Group tree with jump annotations -----------------

/// Per-subroutine dump of the recovered Block/Group tree, annotated with
/// each group's jump topology (spec §6's `blocks` CLI).
pub fn blocks(decoder: &Decoder) -> String {
    let mut out = String::new();
    for sub in decoder.subs.values() {
        out.push_str(&format!("=== {} (0x{:04X}) ===\n", sub.name(), sub.address));
        dump_block(sub, sub.root, 0, &mut out);
        out.push('\n');
    }
    out
}

fn dump_block(sub: &Sub, block_id: BlockId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let block = sub.blocks.get(block_id);
    for child in block.children.values() {
        match child {
            Child::Stmt(addr) => {
                let Some(g) = sub.groups.get(addr) else { continue };
                out.push_str(&format!(
                    "{indent}{addr:04X} jump={:?} jumpz={:?} jumped={:?} jumpzed={:?}\n",
                    g.jump, g.jumpz, g.jumped, g.jumpzed
                ));
            }
            Child::Nested(id) => {
                let b = sub.blocks.get(*id);
                let kind = if b.is_while {
                    "while"
                } else if b.is_else {
                    "else"
                } else {
                    "if"
                };
                out.push_str(&format!(
                    "{indent}[{kind} {:04X}..{}]\n",
                    b.start,
                    b.end.map(|e| format!("{e:04X}")).unwrap_or_else(|| "?".to_string())
                ));
                dump_block(sub, *id, depth + 1, out);
            }
        }
    }
}

// ---- `gbc-source`: segmented decompiled listing ---------------------------

/// Renders one functional group's statement text, applying the `while`/
/// `else if`/`break` overrides structural recovery stamped on it (spec
/// §4.4's three rendered-text overrides, applied here rather than baked into
/// `Group` itself since they depend on context only the renderer walks).
fn render_stmt_text(
    addr: u32,
    groups: &BTreeMap<u32, Group>,
    tree: &Tree,
    ops: &BTreeMap<u32, Operation>,
    var_name: &dyn Fn(i64) -> String,
) -> Option<String> {
    let group = groups.get(&addr)?;
    let base = tree.get(group.root).render(group.root, tree, ops, var_name);
    let text = match group.override_render {
        Override::None => base,
        Override::While => base.replacen("if (", "while (", 1),
        Override::ElseIf => format!("else {base}"),
        Override::Break => "break".to_string(),
    };
    Some(text)
}

/// Recursively renders a block's children in address order, applying the
/// brace-elision rule from spec §6: a `closing` block's own `}` is withheld
/// and instead prefixed (`"} "`) onto whatever line follows it at the same
/// nesting level — the next `else`/`else if` sibling, normally.
fn render_children(
    children: &BTreeMap<OrderedAddress, Child>,
    groups: &BTreeMap<u32, Group>,
    tree: &Tree,
    ops: &BTreeMap<u32, Operation>,
    blocks_arena: &Arena<Block>,
    depth: usize,
    var_name: &dyn Fn(i64) -> String,
    out: &mut String,
) {
    let indent = "\t".repeat(depth);
    let mut pending_prefix: Option<&'static str> = None;

    for child in children.values() {
        match child {
            Child::Stmt(addr) => {
                let Some(text) = render_stmt_text(*addr, groups, tree, ops, var_name) else {
                    continue;
                };
                // Scaffolding groups the combo pass emptied out (timer
                // arithmetic, the while-tail back-edge jump) contribute no
                // line at all; any brace prefix they were carrying over
                // stays armed for the next real line.
                if text.is_empty() {
                    continue;
                }
                let opens = groups.get(addr).map(|g| g.opens_block).unwrap_or(false);
                let prefix = pending_prefix.take().unwrap_or("");
                let suffix = if opens { " {" } else { ";" };
                out.push_str(&indent);
                out.push_str(prefix);
                out.push_str(&text);
                out.push_str(suffix);
                out.push('\n');
            }
            Child::Nested(block_id) => {
                let block = blocks_arena.get(*block_id);
                let prefix = pending_prefix.take().unwrap_or("");
                if block.is_else {
                    out.push_str(&indent);
                    out.push_str(prefix);
                    out.push_str("else {\n");
                } else if !prefix.is_empty() {
                    // Defensive: a body block directly preceded by an
                    // un-flushed "} " (shouldn't happen for well-formed
                    // input — every `closing` block is followed by an
                    // `else`/`else if` per spec §4.4 — but §7 asks the
                    // renderer not to drop text over it).
                    out.push_str(&indent);
                    out.push_str(prefix);
                    out.push('\n');
                }
                render_children(&block.children, groups, tree, ops, blocks_arena, depth + 1, var_name, out);
                if block.closing {
                    pending_prefix = Some("} ");
                } else {
                    out.push_str(&indent);
                    out.push_str("}\n");
                }
            }
        }
    }

    // A trailing `closing` block with no following sibling (an `if` with no
    // `else` at all, at the very end of a body) still owes its brace.
    if pending_prefix.is_some() {
        out.push_str(&indent);
        out.push_str("}\n");
    }
}

fn render_sub_body(sub: &Sub, ops: &BTreeMap<u32, Operation>, var_name: &dyn Fn(i64) -> String) -> String {
    let mut out = format!("{} {{\n", sub.prototype());
    let root = sub.blocks.get(sub.root);
    render_children(&root.children, &sub.groups, &sub.tree, ops, &sub.blocks, 1, var_name, &mut out);
    out.push_str("}\n");
    out
}

fn data_segment(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    let addr = decoder.start?;
    Some(render_sub_body(&decoder.subs[&addr], &decoder.operations, var_name))
}

fn mapping_segment(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    let maps = decoder.maps.as_ref()?;
    let tree_addr = decoder.init_tree_addr?;
    let tree = &decoder.subs[&tree_addr].tree;
    let mut lines = Vec::with_capacity(maps.len());
    for g in maps {
        let text = tree.get(g.root).render(g.root, tree, &decoder.operations, var_name);
        lines.push(format!("{text};"));
    }
    if lines.is_empty() {
        None
    } else {
        lines.push(String::new());
        Some(lines.join("\n"))
    }
}

/// One `int vN;` / `int vN[M];` per allocation base not consumed by the
/// combo state array (spec §4.6/§6); a base with a recorded `alloc_values`
/// initializer renders `int vN = <rhs>;` instead.
fn variable_segment(decoder: &Decoder) -> Option<String> {
    let mut lines = Vec::new();
    for (&base, &count) in &decoder.allocs {
        if base == 0 && decoder.combo_count > 0 {
            continue;
        }
        if count <= 1 {
            if let Some(init) = decoder.alloc_values.get(&base) {
                lines.push(format!("int {init};"));
            } else {
                let name = decoder
                    .slot_names
                    .get(&base)
                    .cloned()
                    .unwrap_or_else(|| format!("v{base}"));
                lines.push(format!("int {name};"));
            }
        } else {
            lines.push(format!("int v{base}[{count}];"));
        }
    }
    if lines.is_empty() {
        None
    } else {
        lines.push(String::new());
        Some(lines.join("\n"))
    }
}

fn guard_line(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    let g = decoder.t0.as_ref()?;
    let tree_addr = decoder.init_tree_addr?;
    let tree = &decoder.subs[&tree_addr].tree;
    let text = tree.get(g.root).render(g.root, tree, &decoder.operations, var_name);
    Some(format!("{text};\n"))
}

fn main_segment(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    let mut out = String::new();
    if let Some(addr) = decoder.init {
        out.push_str(&render_sub_body(&decoder.subs[&addr], &decoder.operations, var_name));
    }
    if let Some(addr) = decoder.main {
        out.push_str(&render_sub_body(&decoder.subs[&addr], &decoder.operations, var_name));
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn combo_segment(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    if decoder.combos.is_empty() {
        return None;
    }
    let main_addr = decoder.main?;
    let main = &decoder.subs[&main_addr];
    let mut out = String::new();
    for combo in &decoder.combos {
        out.push_str(&format!("combo combo{} {{\n", combo.index));
        render_children(&combo.children, &main.groups, &main.tree, &decoder.operations, &main.blocks, 1, var_name, &mut out);
        out.push_str("}\n");
    }
    Some(out)
}

fn function_segment(decoder: &Decoder, var_name: &dyn Fn(i64) -> String) -> Option<String> {
    let mut out = String::new();
    for sub in decoder.subs.values() {
        if !matches!(sub.kind, SubKind::Named) {
            continue;
        }
        out.push_str(&render_sub_body(sub, &decoder.operations, var_name));
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Renders the full segmented C-like source listing (spec §6's `source`
/// CLI): data, mapping, variable, and guard segments, then `init`/`main`,
/// then combos, then every other sub as a `function`, each preceded by its
/// comment banner and separated from its neighbours by a blank line.
pub fn source(decoder: &Decoder) -> String {
    let var_name = |v: i64| decoder.var_name(v);
    let mut segments: Vec<String> = Vec::new();

    if let Some(s) = data_segment(decoder, &var_name) {
        segments.push(format!("// data segment\n{s}"));
    }
    if let Some(s) = mapping_segment(decoder, &var_name) {
        segments.push(format!("// mapping segment\n{s}"));
    }
    if let Some(s) = variable_segment(decoder) {
        segments.push(format!("// variable segment\n{s}"));
    }
    if let Some(s) = guard_line(decoder, &var_name) {
        segments.push(s);
    }
    if let Some(s) = main_segment(decoder, &var_name) {
        segments.push(format!("// main segment\n{s}"));
    }
    if let Some(s) = combo_segment(decoder, &var_name) {
        segments.push(format!("// combo segment\n{s}"));
    }
    if let Some(s) = function_segment(decoder, &var_name) {
        segments.push(format!("// function segment\n{s}"));
    }

    segments.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;

    fn decompile(bytes: &[u8]) -> String {
        let mut decoder = Decoder::new(bytes);
        decoder.full_decode().unwrap();
        decoder.combo_decode();
        decoder.init_decode();
        source(&decoder)
    }

    #[test]
    fn seed_1_bare_main() {
        let out = decompile(&[0x01, 0x00]); // main; end
        assert!(out.contains("main {"));
        assert!(!out.contains("variable segment"));
    }

    #[test]
    fn seed_2_single_alloc() {
        // alloc 1; main; end
        let out = decompile(&[0x03, 0x01, 0x01, 0x00]);
        assert!(out.contains("int v0;"));
    }

    #[test]
    fn seed_3_alloc_with_initializer() {
        // alloc 1; pushi 42; pop v0; main; end
        let out = decompile(&[0x03, 0x01, 0x05, 0x2A, 0x00, 0x06, 0x00, 0x00, 0x01, 0x00]);
        assert!(out.contains("int v0 = 42;"));
    }

    #[test]
    fn seed_4_if_true() {
        // [0] main; [1] pushi 1; [4] jmpz 13; [7] pushi 7; [10] pop v0; [13] end
        let out = decompile(&[
            0x01, 0x05, 0x01, 0x00, 0x09, 0x0D, 0x00, 0x05, 0x07, 0x00, 0x06, 0x00, 0x00, 0x00,
        ]);
        assert!(out.contains("if (TRUE) {"));
        assert!(out.contains("v0 = 7;"));
    }

    #[test]
    fn seed_5_remap() {
        // remap BUTTON_CROSS(16) -> BUTTON_CIRCLE(15); main; end
        let out = decompile(&[0x02, 16, 15, 0x01, 0x00]);
        assert!(out.contains("remap PS4_CROSS -> PS4_CIRCLE;"));
    }

    #[test]
    fn full_decode_twice_is_byte_identical() {
        let bytes = [
            0x01, 0x05, 0x01, 0x00, 0x09, 0x0D, 0x00, 0x05, 0x07, 0x00, 0x06, 0x00, 0x00, 0x00,
        ];
        let first = decompile(&bytes);
        let second = decompile(&bytes);
        assert_eq!(first, second);
    }
}
