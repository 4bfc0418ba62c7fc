//! End-to-end decompilation scenarios, run through the full pipeline
//! (`full_decode` + `combo_decode` + `init_decode` + `emit::source`) the way
//! the `gbc-source` binary does.

use gbc_decompiler::emit;
use gbc_decompiler::Decoder;

fn decompile(bytes: &[u8]) -> (Decoder<'_>, String) {
    let mut decoder = Decoder::new(bytes);
    decoder.full_decode().expect("well-formed fixture should decode cleanly");
    decoder.combo_decode();
    decoder.init_decode();
    let text = emit::source(&decoder);
    (decoder, text)
}

// ---- Seed scenarios (spec §8) ----------------------------------------

#[test]
fn seed_1_bare_main_emits_nothing_but_its_own_braces() {
    let (_, out) = decompile(&[0x01, 0x00]);
    assert!(out.contains("main {"));
    assert!(!out.contains("variable segment"));
    assert!(!out.contains("mapping segment"));
}

#[test]
fn seed_2_single_alloc_with_empty_main() {
    let (_, out) = decompile(&[0x03, 0x01, 0x01, 0x00]);
    assert!(out.contains("int v0;"));
    assert!(out.contains("main {"));
}

#[test]
fn seed_3_alloc_with_constant_initializer() {
    let bytes = [0x03, 0x01, 0x05, 0x2A, 0x00, 0x06, 0x00, 0x00, 0x01, 0x00];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("int v0 = 42;"));
}

#[test]
fn seed_4_if_true_block() {
    // [0] main  [1] pushi 1  [4] jmpz 13  [7] pushi 7  [10] pop v0  [13] end
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x0D, 0x00, 0x05, 0x07, 0x00, 0x06, 0x00, 0x00, 0x00,
    ];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("if (TRUE) {"));
    assert!(out.contains("v0 = 7;"));
}

#[test]
fn seed_5_lone_remap_has_no_main_body_statements() {
    // remap BUTTON_CROSS(16) -> BUTTON_CIRCLE(15); main; end
    let bytes = [0x02, 16, 15, 0x01, 0x00];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("remap PS4_CROSS -> PS4_CIRCLE;"));
}

#[test]
fn seed_6_canonical_combo_triple() {
    // alloc 3 (-> combo_count = 1); main;
    // pop v0[0]=1; pop v0[1]=0; pop v0[2]=0  (combo_restart call site)
    // if (TRUE) { turnoff(); }              (combo body, split off main's tail)
    let bytes = [
        0x03, 0x03, // alloc 3
        0x01, // main
        0x05, 0x01, 0x00, 0x06, 0x00, 0x00, // pushi 1; pop v0[0]
        0x05, 0x00, 0x00, 0x06, 0x01, 0x00, // pushi 0; pop v0[1]
        0x05, 0x00, 0x00, 0x06, 0x02, 0x00, // pushi 0; pop v0[2]
        0x05, 0x01, 0x00, // pushi 1 (selector condition)
        0x09, 0x1C, 0x00, // jmpz -> 0x1C (28)
        0x1E, // turnoff() (combo body)
        0x00, // end
    ];
    let (decoder, out) = decompile(&bytes);
    assert_eq!(decoder.combo_count, 1);
    assert_eq!(decoder.combos.len(), 1);
    assert!(out.contains("combo combo0 {"));
    assert!(out.contains("combo_restart(combo0);"));
    assert!(out.contains("turnoff();"));
}

// ---- Round-trip / idempotence (spec §8) --------------------------------

#[test]
fn full_decode_is_idempotent_on_rerun() {
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x0D, 0x00, 0x05, 0x07, 0x00, 0x06, 0x00, 0x00, 0x00,
    ];
    let (_, first) = decompile(&bytes);
    let (_, second) = decompile(&bytes);
    assert_eq!(first, second);
}

#[test]
fn combo_decode_is_a_no_op_when_there_are_no_combos() {
    let bytes = [0x01, 0x00];
    let mut decoder = Decoder::new(&bytes);
    decoder.full_decode().unwrap();
    decoder.combo_decode();
    let after_first = emit::source(&decoder);
    decoder.combo_decode();
    let after_second = emit::source(&decoder);
    assert_eq!(after_first, after_second);
}

// ---- Boundary behaviour (spec §8) --------------------------------------

#[test]
fn single_end_byte_emits_an_empty_init_body() {
    let (decoder, out) = decompile(&[0x00]);
    assert_eq!(decoder.start, None);
    assert_eq!(decoder.init, None); // empty init is suppressed from rendering
    assert!(!out.contains("function sub_"));
}

#[test]
fn jump_at_zero_splits_start_and_init() {
    // jmp 2; [2] end
    let (decoder, _) = decompile(&[0x08, 0x02, 0x00, 0x00]);
    assert_eq!(decoder.start, Some(0));
    assert_eq!(decoder.init, Some(2));
}

// ---- Structural control-flow recovery (spec §4.4) ----------------------

#[test]
fn if_else_block() {
    // [0] main  [1] pushi 1  [4] jmpz 16  [7] pushi 1  [10] pop v0  [13] jmp 22
    // [16] pushi 2  [19] pop v0  [22] end
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x10, 0x00, 0x05, 0x01, 0x00, 0x06, 0x00, 0x00, 0x08, 0x16,
        0x00, 0x05, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00,
    ];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("if (TRUE) {"));
    assert!(out.contains("v0 = 1;"));
    assert!(out.contains("} else {"));
    assert!(out.contains("v0 = 2;"));
}

#[test]
fn else_if_chain_with_no_trailing_else() {
    // [0] main  [1] pushi 1  [4] jmpz 16  [7] pushi 1  [10] pop v0  [13] jmp 28
    // [16] pushi 1  [19] jmpz 28  [22] pushi 2  [25] pop v0  [28] end
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x10, 0x00, 0x05, 0x01, 0x00, 0x06, 0x00, 0x00, 0x08, 0x1C,
        0x00, 0x05, 0x01, 0x00, 0x09, 0x1C, 0x00, 0x05, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00,
    ];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("if (TRUE) {"));
    assert!(out.contains("v0 = 1;"));
    assert!(out.contains("} else if (TRUE) {"));
    assert!(out.contains("v0 = 2;"));
}

#[test]
fn while_loop_with_a_break() {
    // [0] main  [1] pushi 1  [4] jmpz 25  [7] pushi 1  [10] jmpz 16  [13] jmp 25 (break)
    // [16] pushi 1  [19] pop v0  [22] jmp 1 (loop tail)  [25] end
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x19, 0x00, 0x05, 0x01, 0x00, 0x09, 0x10, 0x00, 0x08, 0x19,
        0x00, 0x05, 0x01, 0x00, 0x06, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00,
    ];
    let (_, out) = decompile(&bytes);
    assert!(out.contains("while (TRUE) {"));
    assert!(out.contains("if (TRUE) {"));
    assert!(out.contains("break;"));
    assert!(out.contains("v0 = 1;"));
}

#[test]
fn two_sequential_top_level_ifs_each_open_their_own_block() {
    // Regression: an unconditional `jmp` closing the first `if`/`else` must
    // not make the second `if`'s condition group fall into
    // `resolve_else_if_or_plain` just because it is the jump's target and
    // sits at a lower address than the jump site.
    //
    // [0] main  [1] pushi 1  [4] jmpz 11  [7] turnoff()  [8] jmp 17
    // [11] pushi 99  [14] pop v0           (else: v0 = 99)
    // [17] pushi 1  [20] jmpz 29
    // [23] pushi 42  [26] pop v1           (second if: v1 = 42)
    // [29] end
    let bytes = [
        0x01, 0x05, 0x01, 0x00, 0x09, 0x0B, 0x00, 0x1E, 0x08, 0x11, 0x00, 0x05, 0x63, 0x00, 0x06,
        0x00, 0x00, 0x05, 0x01, 0x00, 0x09, 0x1D, 0x00, 0x05, 0x2A, 0x00, 0x06, 0x01, 0x00, 0x00,
    ];
    let (_, out) = decompile(&bytes);
    assert_eq!(out.matches("if (TRUE) {").count(), 2);
    assert!(!out.contains("if (TRUE);"));
    assert!(out.contains("} else {"));
    assert!(out.contains("turnoff();"));
    assert!(out.contains("v0 = 99;"));
    assert!(out.contains("v1 = 42;"));
}

#[test]
fn call_site_renders_the_callee_prototype_with_its_argument_count() {
    // [0] main  [1] call sub_000B, pops=2, pushes=1  [7] pop v0  [10] end
    // sub_000B at 11: ret pops=2
    let mut bytes = vec![0x01]; // main
    bytes.extend_from_slice(&[0x36, 0x0B, 0x00, 0x02, 0x01]); // call 0x000B, pops=2, pushes=1
    bytes.extend_from_slice(&[0x06, 0x00, 0x00]); // pop v0
    bytes.push(0x00); // end
    while bytes.len() < 0x000B {
        bytes.push(0x4F); // nop padding, unreachable so gap-filled
    }
    bytes.push(0x37);
    bytes.push(0x02); // ret pops=2

    let (decoder, out) = decompile(&bytes);
    assert_eq!(decoder.subs[&0x000B].arg_count, 2);
    assert!(out.contains("function sub_000B(a0, a1)"));
}
