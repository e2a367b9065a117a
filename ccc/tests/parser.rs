use ccc::compile;

fn err(source: &str) -> String {
    match compile(source) {
        Err(error) => error.to_string(),
        Ok(_) => panic!("expected an error for: {}", source),
    }
}

fn ok(source: &str) {
    if let Err(error) = compile(source) {
        panic!("expected {:?} to compile, got: {}", source, error);
    }
}

#[test]
fn break_and_continue_require_a_loop() {
    assert_eq!(
        err("void main(){ break; }"),
        "Error:1: Must be within a loop statement to use 'break;'."
    );
    assert_eq!(
        err("void main(){ continue; }"),
        "Error:1: Must be within a loop statement to use 'continue;'."
    );
    ok("void main(){ while (0) { break; } }");
    ok("void main(){ do { continue; } while (0); }");
    // An if body inside a loop is still inside the loop.
    ok("void main(){ uint16 i; for (i=0;;) if (i) break; }");
}

#[test]
fn joint_namespace_rejects_duplicates() {
    assert_eq!(
        err("uint16 x; uint16 x; void main(){}"),
        "Error:1: Duplicate declaration of 'x'."
    );
    assert_eq!(
        err("uint16 x; void x(){} void main(){}"),
        "Error:1: Duplicate declaration of 'x'."
    );
    assert_eq!(
        err("uint16 x; void main(){ uint16 x; }"),
        "Error:1: Duplicate declaration of 'x'."
    );
    assert_eq!(
        err("void f(uint16 a, uint16 a){} void main(){}"),
        "Error:1: Duplicate declaration of 'a'."
    );
    assert_eq!(
        err("void main(){ uint16 a; uint16 a; }"),
        "Error:1: Duplicate declaration of 'a'."
    );
    // Builtins occupy the function namespace.
    assert_eq!(
        err("uint16 RND; void main(){}"),
        "Error:1: Duplicate declaration of 'RND'."
    );
}

#[test]
fn reserved_words_are_not_names() {
    assert_eq!(
        err("uint16 if; void main(){}"),
        "Error:1: Cannot use reserved word 'if' as a name."
    );
    assert_eq!(
        err("void while(){} void main(){}"),
        "Error:1: Cannot use reserved word 'while' as a name."
    );
}

#[test]
fn labels_and_gotos_stay_in_one_function() {
    assert_eq!(
        err("void main(){ goto nowhere; }"),
        "Error:1: Label 'nowhere' was not declared in this function."
    );
    assert_eq!(
        err("void main(){ spot: spot: ; }"),
        "Error:1: Duplicate label 'spot'."
    );
    // Labels in another function are out of reach.
    assert_eq!(
        err("void f(){ spot: ; } void main(){ goto spot; }"),
        "Error:1: Label 'spot' was not declared in this function."
    );
    // But the same label name can exist in both.
    ok("void f(){ spot: ; } void main(){ spot: goto spot; }");
}

#[test]
fn undeclared_names_are_rejected() {
    assert_eq!(
        err("void main(){ x = 1; }"),
        "Error:1: Use of undeclared identifier 'x'."
    );
    assert_eq!(
        err("void main(){ uint16 a; a = missing(); }"),
        "Error:1: Use of undeclared identifier 'missing'."
    );
}

#[test]
fn globals_and_functions_resolve_in_both_directions() {
    ok("void main(){ helper(); } void helper(){}");
    ok("void helper(){} void main(){ helper(); }");
    ok("void main(){ counter = counter + 1; } uint16 counter;");
    ok("uint16 counter; void main(){ counter = counter + 1; }");
    ok("uint16 f(){ return g(); } uint16 g(){ return 0; } void main(){}");
}

#[test]
fn locals_must_be_declared_before_use() {
    assert_eq!(
        err("void main(){ uint16 a = b; uint16 b; }"),
        "Error:1: Use of undeclared identifier 'b'."
    );
    ok("void main(){ uint16 a = 1; uint16 b = a; }");
}

#[test]
fn main_contract() {
    assert_eq!(err("uint16 x;"), "Error: Missing 'main' function.");
    assert_eq!(
        err("uint16 main(){ return 1; }"),
        "Error:1: The 'main' function must be declared 'void main()'."
    );
    assert_eq!(
        err("void main(uint16 a){}"),
        "Error:1: The 'main' function must be declared 'void main()'."
    );
    assert_eq!(
        err("void main(){ main(); }"),
        "Error:1: The 'main' function cannot be called."
    );
    assert_eq!(
        err("void f(){ main(); } void main(){}"),
        "Error:1: The 'main' function cannot be called."
    );
}

#[test]
fn void_rules() {
    assert_eq!(
        err("void x; void main(){}"),
        "Error:1: Variables cannot be of type 'void'."
    );
    assert_eq!(
        err("void f(void v){} void main(){}"),
        "Error:1: Function parameters cannot be of type 'void'."
    );
    assert_eq!(
        err("void f(){} void main(){ uint16 a; a = f(); }"),
        "Error:1: Cannot use void function 'f' in an expression."
    );
    // Forward reference to a void function in a value position.
    assert_eq!(
        err("void main(){ uint16 a; a = f(); } void f(){}"),
        "Error:1: Cannot use void function 'f' in an expression."
    );
    // A void call is fine as a whole statement, forward or backward.
    ok("void f(){} void main(){ f(); }");
    ok("void main(){ f(); } void f(){}");
}

#[test]
fn array_rules() {
    assert_eq!(
        err("void f(uint16[3] a){} void main(){}"),
        "Error:1: Function parameters cannot be arrays."
    );
    assert_eq!(
        err("uint16[3] f(){ } void main(){}"),
        "Error:1: Functions cannot return arrays."
    );
    assert_eq!(
        err("void[3] x; void main(){}"),
        "Error:1: Cannot declare an array of void."
    );
    assert_eq!(
        err("uint16[0] x; void main(){}"),
        "Error:1: Array size must be greater than zero."
    );
    assert_eq!(
        err("void main(){ uint16 n; uint16[n] x; }"),
        "Error:1: Array size must be a constant expression."
    );
    assert_eq!(
        err("uint16[3] a = { 1, 2 }; void main(){}"),
        "Error:1: Expected 3 array initializers, got 2."
    );
    assert_eq!(
        err("uint16[2] a; void main(){ uint16 x; x = a; }"),
        "Error:1: Cannot use array 'a' in a scalar context."
    );
    assert_eq!(
        err("uint16[2] a; void main(){ a = 1; }"),
        "Error:1: Cannot use array 'a' in a scalar context."
    );
    ok("uint16[2] a; void main(){ uint16 x; x = a[1]; a[0] = x; }");
}

#[test]
fn global_initializers_must_be_constant() {
    assert_eq!(
        err("uint16 x = y; uint16 y; void main(){}"),
        "Error:1: Initial value of a global variable must be a constant expression."
    );
    assert_eq!(
        err("uint16 x = RND(); void main(){}"),
        "Error:1: Initial value of a global variable must be a constant expression."
    );
    ok("uint16 y = 2; uint16 x = y * 3; void main(){}");
}

#[test]
fn return_shape_is_checked() {
    assert_eq!(
        err("void main(){ return 1; }"),
        "Error:1: Cannot return a value from a void function."
    );
    assert_eq!(
        err("uint16 f(){ return; } void main(){}"),
        "Error:1: Non-void functions must return a value."
    );
    ok("uint16 f(){ return 1; } void main(){ return; }");
}

#[test]
fn argument_counts_must_match() {
    assert_eq!(
        err("uint16 f(uint16 a){ return a; } void main(){ uint16 x; x = f(1, 2); }"),
        "Error:1: Function 'f' takes 1 arguments, got 2."
    );
    assert_eq!(
        err("void main(){ COLOR(1, 2); }"),
        "Error:1: Function 'COLOR' takes 1 arguments, got 2."
    );
    // Forward call with the wrong count.
    assert_eq!(
        err("void main(){ uint16 x; x = f(); } uint16 f(uint16 a){ return a; }"),
        "Error:1: Function 'f' takes 1 arguments, got 0."
    );
}

#[test]
fn lvalue_rules() {
    assert_eq!(
        err("void main(){ uint16 x; 5 = x; }"),
        "Error:1: The left hand side of an assignment must be an lvalue."
    );
    assert_eq!(
        err("void main(){ uint16 x; x + 1 = 2; }"),
        "Error:1: The left hand side of an assignment must be an lvalue."
    );
    assert_eq!(
        err("void main(){ uint16 x; x = &5; }"),
        "Error:1: Cannot take the address of an rvalue."
    );
    ok("uint16 g; void main(){ uint16 x; *x = 1; g[0] = 2; x = &g; }");
}

#[test]
fn locals_only_at_the_top() {
    assert_eq!(
        err("void main(){ TIMERST(); uint16 x; }"),
        "Error:1: Local variables must be declared at the top of a function body."
    );
    assert_eq!(
        err("void main(){ { uint16 x; } }"),
        "Error:1: Local variables must be declared at the top of a function body."
    );
    ok("void main(){ uint16 x; uint16 y = x; TIMERST(); }");
}

#[test]
fn functions_are_not_values() {
    assert_eq!(
        err("uint16 f(){ return 0; } void main(){ uint16 x; x = f; }"),
        "Error:1: Cannot use function 'f' as a value."
    );
    assert_eq!(
        err("void main(){ uint16 x; x = f; } uint16 f(){ return 0; }"),
        "Error:1: Cannot use function 'f' as a value."
    );
}

#[test]
fn malformed_literals_and_tokens() {
    assert_eq!(
        err("uint16 x = 0x; void main(){}"),
        "Error:1: Invalid literal '0x'."
    );
    assert_eq!(
        err("uint16 x = 12ab; void main(){}"),
        "Error:1: Invalid literal '12ab'."
    );
    assert_eq!(
        err("void main(){ uint16* p; }"),
        "Error:1: Invalid name '*'."
    );
    assert_eq!(
        err("uint16 x = 5 void main(){}"),
        "Error:1: Unexpected token 'void', expected ';'."
    );
    assert_eq!(err("uint16 x"), "Error:1: Unexpected EOF, expected ';'.");
}

#[test]
fn line_numbers_follow_the_source() {
    let source = "uint16 x;\nvoid main(){\n  break;\n}";
    assert_eq!(
        err(source),
        "Error:3: Must be within a loop statement to use 'break;'."
    );
}
