//! The GBC opcode schema: one static row per mnemonic.
//!
//! Mirrors the teacher's `schema::blocks`/`schema::enums` tables (a flat,
//! `#[repr(u8)]`-keyed static description of every record/block id LLVM
//! defines) but for GBC's ~80 instructions. Each row is transcribed from the
//! original `gpclib/opcodes.py` opcode classes; see DESIGN.md for the
//! mapping from Python class to row.

use crate::constants::ConstTable;
use crate::template::Template;

/// Primitive argument packing, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    U8,
    I16,
}

impl ArgKind {
    pub const fn width(self) -> usize {
        match self {
            ArgKind::U8 => 1,
            ArgKind::I16 => 2,
        }
    }
}

/// How a raw argument renders in the flat opcode-dump view (`gbc-dump`).
#[derive(Debug, Clone, Copy)]
pub enum PrintFormat {
    /// Plain unsigned hex, 2 digits: `var_{:02X}`-style variable reference.
    VarByte,
    /// `loc_XXXX` jump target.
    Loc,
    /// `sub_XXXX` call target.
    Sub,
    /// `0x{:X}` signed immediate.
    Immediate,
    /// Bare 2-digit hex byte.
    HexByte,
    /// Bare 4-digit hex word.
    HexWord,
    /// `a{N}` call argument index.
    ArgIndex,
    /// `arg_{N:X}` hex call argument index.
    ArgIndexHex,
}

/// A single opcode's static description: encoding layout, stack effect,
/// control-flow classification, and rendering metadata.
pub struct OpcodeSchema {
    pub op_id: u8,
    pub mnemonic: &'static str,
    pub arguments: &'static [ArgKind],
    pub print_formats: &'static [PrintFormat],
    /// `None` for `call`/`ret`, whose arity is read from their own
    /// arguments at parse time instead of the schema.
    pub pops: Option<u8>,
    pub pushes: Option<u8>,
    pub is_jump: bool,
    pub is_conditional: bool,
    pub is_call: bool,
    pub bounded: bool,
    /// Index into `arguments` holding the jump/call target, if any.
    pub target_arg_index: Option<usize>,
    /// `None` means "comment out the raw form" (only used by the synthetic
    /// `Failed` row, which has no static schema entry at all).
    pub decompile_template: Option<&'static str>,
    /// Per-argument constant table, parallel to `arguments`.
    pub constants: &'static [Option<&'static ConstTable>],
    /// Per-argument "this raw value is a variable slot index" flag, parallel
    /// to `arguments`.
    pub variables: &'static [bool],
    /// When this op's pushed value is itself drawn from this table (e.g.
    /// `get_console()` returning a `PIO` route), sibling immediate arguments
    /// equal to one of the table's keys render symbolically too.
    pub ret_constants: Option<&'static ConstTable>,
    /// Straight-line arithmetic / load / store, no side effects — used by
    /// `init_decode`'s "simple group" cutoff (§4.6).
    pub simple: bool,
}

impl OpcodeSchema {
    pub fn decompile_template(&self) -> Option<Template> {
        self.decompile_template.map(Template::compile)
    }
}

macro_rules! row {
    (
        id: $id:expr, name: $name:expr,
        args: [$($arg:expr),*], print: [$($pf:expr),*],
        pops: $pops:expr, pushes: $pushes:expr,
        jump: $jump:expr, cond: $cond:expr, call: $call:expr, bounded: $bounded:expr,
        target: $target:expr,
        decompile: $decompile:expr,
        constants: [$($c:expr),*], variables: [$($v:expr),*],
        ret: $ret:expr, simple: $simple:expr $(,)?
    ) => {
        OpcodeSchema {
            op_id: $id,
            mnemonic: $name,
            arguments: &[$($arg),*],
            print_formats: &[$($pf),*],
            pops: $pops,
            pushes: $pushes,
            is_jump: $jump,
            is_conditional: $cond,
            is_call: $call,
            bounded: $bounded,
            target_arg_index: $target,
            decompile_template: $decompile,
            constants: &[$($c),*],
            variables: &[$($v),*],
            ret_constants: $ret,
            simple: $simple,
        }
    };
}

use ArgKind::*;
use PrintFormat::*;

pub static SCHEMA: &[OpcodeSchema] = &[
    row!(id: 0x00, name: "end", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some(""), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x01, name: "main", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some(""), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x02, name: "remap", args: [U8, U8], print: [VarByte, VarByte],
        pops: Some(0), pushes: Some(0), jump: false, cond: false, call: false, bounded: true,
        target: None, decompile: Some("remap {0} -> {1}"),
        constants: [Some(&crate::constants::BUTTONS), Some(&crate::constants::BUTTONS)],
        variables: [false, false], ret: None, simple: false),
    row!(id: 0x03, name: "alloc", args: [U8], print: [HexByte], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some(""), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x04, name: "push", args: [I16], print: [VarByte], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0}"), constants: [None], variables: [true], ret: None, simple: true),
    row!(id: 0x05, name: "pushi", args: [I16], print: [Immediate], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0}"), constants: [None], variables: [false], ret: None, simple: true),
    row!(id: 0x06, name: "pop", args: [I16], print: [VarByte], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("{0} = {1}"), constants: [None], variables: [true], ret: None, simple: true),
    row!(id: 0x07, name: "wait", args: [I16], print: [Immediate], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("wait({1})"), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x08, name: "jmp", args: [I16], print: [Loc], pops: Some(0), pushes: Some(0),
        jump: true, cond: false, call: false, bounded: false, target: Some(0),
        decompile: Some(""), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x09, name: "jmpz", args: [I16], print: [Loc], pops: Some(1), pushes: Some(0),
        jump: true, cond: true, call: false, bounded: false, target: Some(0),
        decompile: Some("if ({1})"), constants: [None, Some(&crate::constants::TRUTHS)],
        variables: [false, false], ret: None, simple: false),
    row!(id: 0x0A, name: "and", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} && {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x0B, name: "or", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} || {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x0C, name: "eq", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} == {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x0D, name: "neq", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} != {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x0E, name: "lt", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} < {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x0F, name: "lte", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} <= {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x10, name: "gt", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} > {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x11, name: "gte", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} >= {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x12, name: "add", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} + {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x13, name: "sub", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} - {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x14, name: "mul", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} * {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x15, name: "div", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} / {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x16, name: "not", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("!{0}"), constants: [Some(&crate::constants::TRUTHS)], variables: [],
        ret: None, simple: true),
    row!(id: 0x17, name: "grtime", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_rtime()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x18, name: "sval", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("set_val({0}, {1})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x19, name: "gval", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_val({0})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x1A, name: "glval", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_lval({0})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x1B, name: "gptime", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_ptime({0})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x1C, name: "eventpress", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("event_press({0})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x1D, name: "eventrelease", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("event_release({0})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x1E, name: "turnoff", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("turn_off()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x1F, name: "swap", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("swap({0}, {1})"),
        constants: [Some(&crate::constants::BUTTONS), Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x20, name: "block", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("block({0}, {1})"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x21, name: "sens", args: [], print: [], pops: Some(3), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("sensitivity({0}, {1}, {2})"),
        constants: [Some(&crate::constants::BUTTONS), None, Some(&crate::constants::SENS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x22, name: "sled", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("set_led({0}, {1})"), constants: [Some(&crate::constants::LEDS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x23, name: "gled", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_led({0})"), constants: [Some(&crate::constants::LEDS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x24, name: "srumble", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("set_rumble({0}, {1})"), constants: [Some(&crate::constants::RUMBLE)],
        variables: [], ret: None, simple: false),
    row!(id: 0x25, name: "grumble", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_rumble({0})"), constants: [Some(&crate::constants::RUMBLE)],
        variables: [], ret: None, simple: false),
    row!(id: 0x26, name: "loadslot", args: [], print: [], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("load_slot({0})"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x27, name: "abs", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("abs({0})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x28, name: "resetleds", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("reset_leds()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x29, name: "blockrumble", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("block_rumble()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x2A, name: "resetrumble", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("reset_rumble()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x2B, name: "vmtctrl", args: [], print: [], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("vm_tctrl({0})"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x2C, name: "inv", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("inv({0})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x2D, name: "wroscr", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("wiir_offscreen()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x2E, name: "pow", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("pow({0}, {1})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x2F, name: "isqrt", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("isqrt({0})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x30, name: "stickize", args: [], print: [], pops: Some(3), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("stickize({0}, {1}, {2})"),
        constants: [Some(&crate::constants::BUTTONS), Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x31, name: "unmap", args: [U8], print: [VarByte], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("unmap {0}"), constants: [Some(&crate::constants::BUTTONS)],
        variables: [false], ret: None, simple: false),
    row!(id: 0x32, name: "dzone", args: [], print: [], pops: Some(4), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("deadzone({0}, {1}, {2}, {3})"),
        constants: [Some(&crate::constants::BUTTONS), Some(&crate::constants::BUTTONS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x33, name: "mod", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} % {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x34, name: "spvar", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("set_pvar({0}, {1})"), constants: [Some(&crate::constants::PVARS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x35, name: "gpvar", args: [], print: [], pops: Some(4), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("get_pvar({0}, {1}, {2}, {3})"), constants: [Some(&crate::constants::PVARS)],
        variables: [], ret: None, simple: false),
    // `call`/`ret` have no static decompile template: their argument count
    // is read from their own encoding, so `Operation`'s call/ret-specific
    // rendering builds the text directly instead of going through a
    // precompiled `Template`.
    row!(id: 0x36, name: "call", args: [I16, U8, U8], print: [Sub, HexByte, HexByte],
        pops: None, pushes: None, jump: false, cond: false, call: true, bounded: true,
        target: Some(0), decompile: None,
        constants: [None, None, None], variables: [false, false, false], ret: None, simple: false),
    row!(id: 0x37, name: "ret", args: [U8], print: [HexByte], pops: None, pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: None, constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x38, name: "pusha", args: [I16], print: [ArgIndex], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("a{0}"), constants: [None], variables: [false], ret: None, simple: true),
    row!(id: 0x39, name: "popa", args: [I16], print: [ArgIndex], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("a{0} = {1}"), constants: [None], variables: [false], ret: None, simple: true),
    row!(id: 0x3A, name: "sledx", args: [], print: [], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("set_ledx({0}, {1})"), constants: [Some(&crate::constants::LEDS)],
        variables: [], ret: None, simple: false),
    row!(id: 0x3B, name: "gledx", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_ledx()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x3C, name: "gcnsl", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_console()"), constants: [], variables: [], ret: Some(&crate::constants::PIO),
        simple: false),
    row!(id: 0x3D, name: "gctrl", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_controller()"), constants: [], variables: [], ret: Some(&crate::constants::PIO),
        simple: false),
    row!(id: 0x3E, name: "xor", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0} ^^ {1}"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x3F, name: "pushidx", args: [I16], print: [VarByte], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0}[{1}]"), constants: [None], variables: [true], ret: None, simple: true),
    row!(id: 0x40, name: "popidx", args: [I16], print: [VarByte], pops: Some(2), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("{0}[{1}] = {2}"), constants: [None], variables: [true], ret: None, simple: true),
    row!(id: 0x41, name: "getslot", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_slot()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x42, name: "sbit", args: [I16], print: [VarByte], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("set_bit({1}, {0})"), constants: [None], variables: [true], ret: None, simple: false),
    row!(id: 0x43, name: "cbit", args: [I16], print: [VarByte], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: None, constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x44, name: "tbit", args: [], print: [], pops: Some(2), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("test_bit({0}, {1})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x45, name: "sbits", args: [I16], print: [VarByte], pops: Some(3), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("set_bits({0}, {1}, {2}, {3})"), constants: [None], variables: [true],
        ret: None, simple: false),
    row!(id: 0x46, name: "gbits", args: [], print: [], pops: Some(3), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_bits({0}, {1}, {2})"), constants: [], variables: [], ret: None, simple: true),
    row!(id: 0x47, name: "dchar", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("dchar({0})"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x48, name: "dbyte", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("dbyte({0})"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x49, name: "dword", args: [], print: [], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("dword({0})"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x4A, name: "sbita", args: [I16], print: [ArgIndexHex], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("set_bit(a{0}, {1})"), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x4B, name: "cbita", args: [I16], print: [ArgIndexHex], pops: Some(1), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("clear_bit(a{0}, {1})"), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x4C, name: "sbitsa", args: [I16], print: [ArgIndexHex], pops: Some(3), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("set_bits(a{0}, {1}, {2}, {3})"), constants: [None], variables: [false], ret: None, simple: false),
    row!(id: 0x4D, name: "ps4tch", args: [I16], print: [HexWord], pops: Some(1), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: true, target: None,
        decompile: Some("ps4_touchpad({0})"), constants: [Some(&crate::constants::PS4)],
        variables: [false], ret: None, simple: false),
    row!(id: 0x4E, name: "gbatt", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_battery()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x4F, name: "nop", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("NOP()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x50, name: "GetPS4AuthTimeout", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("ps4_authtimeout()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x51, name: "op_reconn", args: [], print: [], pops: Some(0), pushes: Some(0),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("output_reconnection()"), constants: [], variables: [], ret: None, simple: false),
    row!(id: 0x52, name: "GetCtrlBtnOpCode", args: [], print: [], pops: Some(0), pushes: Some(1),
        jump: false, cond: false, call: false, bounded: false, target: None,
        decompile: Some("get_ctrlbutton()"), constants: [], variables: [], ret: None, simple: false),
];

/// Static `(op_id, instruction byte length)` overrides for opcodes absent
/// from `SCHEMA`, tolerated instead of raising `Error::UnknownOpcode`.
///
/// Empty, per the Open Question in spec §9/DESIGN.md: whether a populated
/// table was ever intended is unknown; an unrecognised opcode is a hard
/// decode error until a specific override is added here.
pub static MISSING: &[(u8, u32)] = &[];

pub fn lookup(op_id: u8) -> Option<&'static OpcodeSchema> {
    SCHEMA.iter().find(|row| row.op_id == op_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_covers_every_id_from_0_to_0x52_contiguously() {
        for id in 0x00u8..=0x52 {
            assert!(lookup(id).is_some(), "missing schema row for {id:#04X}");
        }
    }

    #[test]
    fn jump_rows_declare_a_target_argument() {
        let jmp = lookup(0x08).unwrap();
        assert!(jmp.is_jump && !jmp.is_conditional);
        assert_eq!(jmp.target_arg_index, Some(0));

        let jmpz = lookup(0x09).unwrap();
        assert!(jmpz.is_jump && jmpz.is_conditional);
    }

    #[test]
    fn call_and_ret_have_no_static_arity() {
        assert_eq!(lookup(0x36).unwrap().pops, None);
        assert_eq!(lookup(0x37).unwrap().pops, None);
    }
}
