use ccc::compile;

fn listing(source: &str) -> String {
    compile(source).expect("program should compile").0
}

fn lines(source: &str) -> Vec<String> {
    listing(source)
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}

/// Asserts that `needles` appear in the listing in order (not
/// necessarily adjacent).
fn assert_in_order(source: &str, needles: &[&str]) {
    let lines = lines(source);
    let mut pos = 0;
    for needle in needles {
        match lines[pos..].iter().position(|line| line == needle) {
            Some(offset) => pos += offset + 1,
            None => panic!(
                "missing '{}' (after line {}) in:\n{}",
                needle,
                pos,
                lines.join("\n")
            ),
        }
    }
}

#[test]
fn empty_main() {
    let expected = "\
  MOVI SP stack
  CALL main
program_finished:
  JMPI program_finished
main:
  PUSH FP
  MOV FP SP
main_end:
  MOV SP FP
  POP FP
  RET
stack:
";
    assert_eq!(listing("void main(){}"), expected);
}

#[test]
fn stream_frames_every_program() {
    let lines = lines("uint16 g; uint16 f(){ return g; } void main(){ f(); }");
    assert_eq!(lines[0], "MOVI SP stack");
    assert_eq!(lines[1], "CALL main");
    assert_eq!(lines.last().unwrap(), "stack:");
}

#[test]
fn scalar_global_emits_its_folded_word() {
    assert_in_order("uint16 x = 3 + 4 * 2; void main(){}", &["x:", "0x000b"]);
}

#[test]
fn array_global_emits_body_address_then_body() {
    // The bootloader is three instructions (12 bytes); the address word
    // is the current position plus the instruction size.
    assert_in_order(
        "uint16[3] a = { 1, 2, 3 }; void main(){}",
        &["a:", "0x0010", "0x0001", "0x0002", "0x0003"],
    );
}

#[test]
fn uninitialized_globals_default_to_zero() {
    // The array body address follows x's word: 12 bootloader bytes,
    // one data word, plus the instruction size.
    assert_in_order(
        "uint16 x; uint16[2] a; void main(){}",
        &["x:", "0x0000", "a:", "0x0012", "0x0000", "0x0000"],
    );
}

#[test]
fn for_loop_emits_the_label_triad() {
    let source = "void main(){ uint16 i; for (i=0;i<3;i=i+1) {} }";
    assert_in_order(
        source,
        &[
            "for_start:",
            "TST L L",
            "JEQ for_break",
            "for_continue:",
            "JMPI for_start",
            "for_break:",
        ],
    );
}

#[test]
fn while_and_do_while_shapes() {
    assert_in_order(
        "void main(){ while (1) { break; } }",
        &[
            "while_continue:",
            "TST L L",
            "JEQ while_break",
            "JMPI while_break",
            "JMPI while_continue",
            "while_break:",
        ],
    );
    assert_in_order(
        "void main(){ do { } while (0); }",
        &["do_while_continue:", "TST L L", "JNE do_while_continue"],
    );
}

#[test]
fn if_else_attaches_greedily() {
    assert_in_order(
        "void main(){ uint16 a; if (a) a = 1; else a = 2; }",
        &["TST L L", "JEQ if_false", "JMPI if_end", "if_false:", "if_end:"],
    );
}

#[test]
fn parameters_arrive_in_registers_and_return_goes_through_l() {
    let source = "uint16 f(uint16 a, uint16 b){ return a + b; } void main(){}";
    assert_in_order(
        source,
        &["f:", "MOV N B", "MOV M A", "ADD M N", "MOV L M", "JMPI f_end", "f_end:"],
    );
}

#[test]
fn overflow_parameters_are_cleaned_by_ret() {
    let source = "uint16 f(uint16 a, uint16 b, uint16 c, uint16 d, uint16 e, uint16 g){ \
                  return a; } void main(){}";
    assert_in_order(source, &["f:", "RET 0x04"]);
}

#[test]
fn calls_save_the_argument_window() {
    let source = "uint16 g(uint16 a){ return a; } \
                  void main(){ uint16 x; x = g(7); }";
    assert_in_order(
        source,
        &["PUSH A", "MOVI A 0x0007", "CALL g", "POP A", "MOV N L", "MOV E N"],
    );
}

#[test]
fn address_of_a_global_materializes_its_label() {
    let source = "uint16 x; void main(){ uint16 p; p = &x; }";
    assert_in_order(source, &["MOVI L x", "MOV N L", "MOV E N"]);
}

#[test]
fn address_taken_locals_live_in_the_frame() {
    // `a` loses register storage; `p` keeps one. The frame reservation
    // covers a's slot, and a's reference goes through FP.
    let source = "void main(){ uint16 a; uint16 p; p = &a; }";
    assert_in_order(
        source,
        &["main:", "PUSH E", "PUSH FP", "MOV FP SP", "MOVI M 0x0002", "ADD SP M", "ADD L FP"],
    );
}

#[test]
fn goto_lowering_reuses_one_label_per_source_label() {
    let source = "void main(){ once: goto once; goto once; }";
    let lines = lines(source);
    assert!(lines.iter().any(|line| line == "main_once:"));
    let jumps = lines.iter().filter(|line| *line == "JMPI main_once").count();
    assert_eq!(jumps, 2);
}

#[test]
fn builtins_lower_to_inline_instructions() {
    let source = "void main(){ uint16 t; COLOR(7); PIXEL(1, 2); TIMERST(); \
                  t = TIME(); t = INPUT(0); t = RND(); }";
    let lines = lines(source);
    for inst in ["COLOR M", "PIXEL M N", "TIMERST", "TIME L", "INPUT L M", "RND L"] {
        assert!(
            lines.iter().any(|line| line == inst),
            "missing '{}' in:\n{}",
            inst,
            lines.join("\n")
        );
    }
    assert!(!lines.iter().any(|line| line.starts_with("CALL")
        && line != "CALL main"));
}

#[test]
fn local_array_slot_holds_its_data_address() {
    let source = "void main(){ uint16[2] v = { 4, 5 }; v[0] = v[1]; }";
    assert_in_order(
        source,
        &[
            "main:",
            "PUSH E",
            "MOV FP SP",
            // Frame holds the 4-byte data region.
            "MOVI M 0x0004",
            "ADD SP M",
            // The slot register receives the data address.
            "MOVI E 0x0000",
            "ADD E FP",
            // Element initializers store through M.
            "MOVI N 0x0004",
            "STOR N M",
            "MOVI N 0x0005",
            "STOR N M",
        ],
    );
}

#[test]
fn comparisons_materialize_zero_or_one() {
    let source = "void main(){ uint16 a; uint16 b; a = a < b; }";
    assert_in_order(
        source,
        &["CMP M N", "MOVI M 0x0001", "JB cmp_done", "MOVI M 0x0000", "cmp_done:"],
    );
}

#[test]
fn booleans_evaluate_both_sides() {
    // No short circuit: both normalizations appear before the OR.
    let source = "void main(){ uint16 a; uint16 b; a = a || b; }";
    assert_in_order(
        source,
        &["TST M M", "bool_done:", "TST N N", "bool_done1:", "OR M N"],
    );
}

#[test]
fn modulo_uses_the_three_step_idiom() {
    let source = "void main(){ uint16 a; uint16 b; a = a % b; }";
    assert_in_order(source, &["MOV L M", "DIV M N", "MUL M N", "SUB L M"]);
}

#[test]
fn label_book_keeps_control_flow_labels_unique() {
    let source = "void main(){ uint16 i; \
                  for (i=0;i<1;i=i+1) {} for (i=0;i<1;i=i+1) {} }";
    assert_in_order(source, &["for_start:", "for_start1:"]);
    let lines = lines(source);
    assert!(lines.iter().any(|line| line == "JEQ for_break"));
    assert!(lines.iter().any(|line| line == "JEQ for_break1"));
}

#[test]
fn no_adjacent_push_pop_pairs_survive() {
    let source = "uint16 g; uint16[3] a = { 1, 2, 3 }; \
                  uint16 add(uint16 x, uint16 y){ return x + y; } \
                  void main(){ uint16 i; uint16 p; p = &g; \
                  for (i=0;i<3;i=i+1) { a[i] = add(a[i], g) % 7; } }";
    let lines = lines(source);
    for pair in lines.windows(2) {
        assert!(
            !(pair[0].starts_with("PUSH ") && pair[1].starts_with("POP ")),
            "peephole missed: {} / {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn warnings_do_not_stop_compilation() {
    let (text, warnings) =
        compile("uint16[2] t = { 1, 2 }; uint16 z = 1 / 0; void main(){ uint16 x; x = t[5]; }")
            .unwrap();
    assert!(text.ends_with("stack:\n"));
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].to_string().contains("Division by zero"));
    assert!(warnings[1].to_string().contains("out of bounds"));
}
