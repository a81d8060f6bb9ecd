use bumpalo::Bump;
use std::path::Path;

use crate::config::{CheckConfig, NilComparisonPolicy, ResolveConfig};
use crate::decl::{ForeignModule, Manifest};
use crate::diag::{Category, Diagnostic, FixIt, Severity};
use crate::project::ImportedModule;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;
use crate::typeck::check_program;

const MANIFEST: &str = r#"
    module = "Kit"

    [[typedef]]
    name = "GadgetRef"
    target = "struct __Gadget *"

    [[typedef]]
    name = "MaybeThing"
    target = "id _Nullable"

    [[function]]
    name = "GadgetUse"
    params = ["GadgetRef _Nonnull"]

    [[function]]
    name = "GadgetMaybeUse"
    params = ["GadgetRef _Nullable"]

    [[class]]
    name = "Widget"
    [[class.method]]
    selector = "methodA:"
    params = ["Widget * _Nullable"]
    returns = "id _Nonnull"
    [[class.method]]
    selector = "take:"
    params = ["Widget * _Nonnull"]
    [[class.method]]
    selector = "take:with:"
    params = ["Widget * _Nonnull", "Widget * _Nullable"]
    [[class.method]]
    selector = "maybeChild"
    returns = "Widget * _Nullable"
    [[class.method]]
    selector = "sharedWidget"
    class_method = true
    returns = "instancetype _Nonnull"
    [[class.property]]
    name = "property"
    type = "nullable id"
    readonly = true
    [[class.property]]
    name = "name"
    type = "const char * _Nonnull"
    [[class.property]]
    name = "tag"
    type = "null_resettable id"
    [[class.property]]
    name = "count"
    type = "NSInteger"
    [[class.initializer]]
    selector = "initWithInt:"
    params = ["int"]
    returns = "nonnull instancetype"
    [[class.initializer]]
    selector = "initWithDouble:"
    params = ["double"]
    returns = "nullable instancetype"

    [[class]]
    name = "Button"
    superclass = "Widget"
    [[class.method]]
    selector = "take:"
    params = ["Button * _Nonnull"]

    [[region]]
    audited = true
    [[region.function]]
    name = "Use"
    params = ["MaybeThing"]
    [[region.function]]
    name = "Keep"
    params = ["id"]
"#;

fn module() -> ImportedModule {
    let manifest = Manifest::from_toml_str(MANIFEST, Path::new("kit.toml")).unwrap();
    let foreign = ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).unwrap();
    ImportedModule::import(foreign)
}

fn check_with(code: &str, config: &CheckConfig) -> Vec<Diagnostic> {
    let module = module();
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert!(program.errors.is_empty(), "unexpected parse errors: {:?}", program.errors);
    check_program(&program, &module, config)
}

fn check(code: &str) -> Vec<Diagnostic> {
    check_with(code, &CheckConfig::default())
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|diag| diag.message.as_str()).collect()
}

fn column(code: &str, offset: usize) -> usize {
    crate::span::offset_line_info(code.as_bytes(), offset)
        .unwrap()
        .column
}

#[test]
fn nullable_parameter_accepts_optional_argument() {
    let code = "func f(w: Widget, ow: Widget?) {\n  let a: AnyObject = w.methodA(ow)\n  _ = a\n}\n";
    assert!(check(code).is_empty());
}

#[test]
fn nullable_property_needs_unwrap_when_bound_non_optional() {
    let code = "func f(w: Widget) {\n  let x: AnyObject = w.property\n  _ = x\n}\n";
    let diagnostics = check(code);
    assert_eq!(diagnostics.len(), 1, "{:?}", messages(&diagnostics));
    let diag = &diagnostics[0];
    assert_eq!(diag.category, Category::UnwrapRequired);
    assert_eq!(
        diag.message,
        "value of optional type 'AnyObject?' not unwrapped; did you mean to use '!' or '?'?"
    );
    let span = diag.span.unwrap();
    assert_eq!(column(code, span.start), 22);
    assert_eq!(diag.fixits, vec![FixIt::insert(span.end, "!")]);
    assert_eq!(column(code, span.end), 32);
}

#[test]
fn integer_literal_to_optional_reference_is_a_mismatch() {
    let code = "func f() {\n  GadgetMaybeUse(5)\n  GadgetUse(5)\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "cannot convert value of type 'Int' to expected argument type 'Gadget?'",
            "cannot convert value of type 'Int' to expected argument type 'Gadget'",
        ]
    );
    assert!(diagnostics
        .iter()
        .all(|diag| diag.category == Category::TypeMismatch && diag.fixits.is_empty()));
}

#[test]
fn nil_to_nonnull_parameter_has_no_fixit() {
    let code = "func f(g: Gadget) {\n  GadgetUse(nil)\n  GadgetMaybeUse(nil)\n  GadgetUse(g)\n}\n";
    let diagnostics = check(code);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].category, Category::NilIncompatible);
    assert_eq!(
        diagnostics[0].message,
        "nil is not compatible with expected argument type 'Gadget'"
    );
    assert!(diagnostics[0].fixits.is_empty());
}

#[test]
fn nil_comparison_always_type_checks() {
    let code = "func f(w: Widget, ow: Widget?) {\n  if w == nil { }\n  if ow != nil { }\n  if w.count == nil { }\n  if w.maybeChild() == nil { }\n}\n";
    assert!(check(code).is_empty());
}

#[test]
fn reference_only_policy_warns_on_scalars() {
    let code = "func f(w: Widget) {\n  if w == nil { }\n  if w.count == nil { }\n  if w.count != nil { }\n}\n";
    let config = CheckConfig {
        nil_comparison: NilComparisonPolicy::ReferenceOnly,
        ..CheckConfig::default()
    };
    let diagnostics = check_with(code, &config);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "comparing non-optional value of type 'Int' to 'nil' always returns false",
            "comparing non-optional value of type 'Int' to 'nil' always returns true",
        ]
    );
    assert!(diagnostics.iter().all(|diag| diag.severity == Severity::Warning));
}

#[test]
fn optional_result_bound_to_non_optional_offers_conditional_unwrap() {
    let code = "func f(w: Widget) {\n  let c: Widget = w.maybeChild()\n}\n";
    let diagnostics = check(code);
    assert_eq!(diagnostics.len(), 1);
    let diag = &diagnostics[0];
    let span = diag.span.unwrap();
    assert_eq!(diag.fixits, vec![FixIt::insert(span.end, "!")]);
    assert_eq!(diag.notes.len(), 1);
    assert_eq!(diag.notes[0].fixits[0].replacement, "if let");

    let config = CheckConfig {
        conditional_unwrap_notes: false,
        ..CheckConfig::default()
    };
    let diagnostics = check_with(code, &config);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].notes.is_empty());
}

#[test]
fn failable_initializer_yields_optional() {
    let code = "func f() {\n  let a = Widget(double: 1.5)\n  let b: Widget = a\n  let c = Widget(int: 3)\n  let d: Widget = c\n  _ = b\n  _ = d\n}\n";
    let diagnostics = check(code);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "value of optional type 'Widget?' not unwrapped; did you mean to use '!' or '?'?"
    );
    assert_eq!(column(code, diagnostics[0].fixits[0].span.start), 20);
}

#[test]
fn optional_receivers_need_unwrap_or_chaining() {
    let code = "func f(w: Widget, ow: Widget?) {\n  ow.take(w)\n  ow?.take(w)\n  ow!.take(w)\n  w?.take(w)\n  w!.take(w)\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "value of optional type 'Widget?' not unwrapped; did you mean to use '!' or '?'?",
            "cannot use optional chaining on non-optional value of type 'Widget'",
            "cannot force unwrap value of non-optional type 'Widget'",
        ]
    );
    // `!` goes right after the receiver; redundant operators are removed.
    assert_eq!(column(code, diagnostics[0].fixits[0].span.start), 5);
    assert_eq!(diagnostics[1].fixits[0].replacement, "");
    assert_eq!(diagnostics[2].fixits[0].replacement, "");
}

#[test]
fn argument_labels_and_arity_are_checked() {
    let code = "func f(w: Widget, ow: Widget?, g: Gadget) {\n  w.take(w, with: ow)\n  w.take(w, ow)\n  GadgetUse(fridge: g)\n  GadgetUse()\n  GadgetUse(g, g)\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "no exact matches in call to instance method 'take'",
            "incorrect argument label in call (have 'fridge:', expected '_:')",
            "missing argument for parameter #1 in call",
            "extra argument in call",
        ]
    );
}

#[test]
fn subclasses_convert_to_superclasses() {
    let code = "func f(b: Button, w: Widget) {\n  let up: Widget = b\n  w.take(b)\n  let any: AnyObject = b\n  let down: Button = w\n  let shared: Button = Button.sharedWidget()\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec!["cannot convert value of type 'Widget' to specified type 'Button'"]
    );
}

#[test]
fn subclass_methods_only_hide_same_labelled_overloads() {
    let code = "func f(b: Button, w: Widget) {\n  b.take(w, with: nil)\n  b.take(b)\n  b.take(w)\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec!["cannot convert value of type 'Widget' to expected argument type 'Button'"]
    );
    assert_eq!(column(code, diagnostics[0].span.unwrap().start), 10);
}

#[test]
fn typedef_nullability_survives_an_audited_region() {
    let module = module();
    let interface = module.render_interface();
    assert!(interface.contains("func Use(_: AnyObject?)\n"), "{interface}");
    assert!(interface.contains("func Keep(_: AnyObject)\n"), "{interface}");

    let diagnostics = check("func f() {\n  Use(nil)\n  Keep(nil)\n}\n");
    assert_eq!(
        messages(&diagnostics),
        vec!["nil is not compatible with expected argument type 'AnyObject'"]
    );
}

#[test]
fn unresolved_names_members_and_types() {
    let code = "import Kit\nimport Nope\nfunc g(x: Nothing) { }\nfunc f(w: Widget) {\n  let q = missing\n  let r = w.nothing\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "no such module 'Nope'",
            "cannot find type 'Nothing' in scope",
            "cannot find 'missing' in scope",
            "value of type 'Widget' has no member 'nothing'",
        ]
    );
    assert!(diagnostics
        .iter()
        .all(|diag| diag.category == Category::Unresolved));
}

#[test]
fn assignments_respect_mutability_and_setters() {
    let code = "func f(w: Widget) {\n  w.property = w\n  w.tag = nil\n  w.name = nil\n  w.name = \"label\"\n  let k = 1\n  k = 2\n  var v = 1\n  v = 2\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "cannot assign to property: 'property' is a get-only property",
            "'nil' cannot be assigned to type 'UnsafePointer<CChar>'",
            "cannot assign to value: 'k' is a 'let' constant",
        ]
    );
}

#[test]
fn return_values_are_checked_against_the_declared_type() {
    let code = "func g(w: Widget) -> Widget {\n  return w.maybeChild()\n}\nfunc h() -> Widget {\n  return nil\n}\nfunc v() {\n  return 1\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "value of optional type 'Widget?' not unwrapped; did you mean to use '!' or '?'?",
            "'nil' is incompatible with return type 'Widget'",
            "unexpected non-void return value in void function",
        ]
    );
}

#[test]
fn any_object_members_are_dynamic() {
    let code = "func f(w: Widget) {\n  let a: AnyObject = w.methodA(nil)\n  a.whatever(1, 2)\n  let z = a.foo\n  _ = z\n}\n";
    assert!(check(code).is_empty());
}

#[test]
fn conditions_must_be_bool() {
    let code = "func f(w: Widget, ow: Widget?) {\n  if w.count { }\n  if ow { }\n  if true { }\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "cannot convert value of type 'Int' to expected condition type 'Bool'",
            "optional type 'Widget?' cannot be used as a boolean; test for '!= nil' instead",
        ]
    );
    assert_eq!(diagnostics[1].fixits[0].replacement, " != nil");
}

#[test]
fn checking_continues_after_each_violation() {
    let code = "func f(w: Widget) {\n  GadgetUse(nil)\n  let c: Widget = w.maybeChild()\n  GadgetMaybeUse(5)\n}\n";
    let categories: Vec<Category> = check(code).iter().map(|diag| diag.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::NilIncompatible,
            Category::UnwrapRequired,
            Category::TypeMismatch,
        ]
    );
}

#[test]
fn local_functions_are_hoisted_and_checked() {
    let code = "func f(w: Widget) {\n  let r: Widget = pick(w, other: nil)\n  pick(w, w)\n}\nfunc pick(_ a: Widget, other b: Widget?) -> Widget? {\n  return b\n}\n";
    let diagnostics = check(code);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "value of optional type 'Widget?' not unwrapped; did you mean to use '!' or '?'?",
            "incorrect argument label in call (have '_:_:', expected '_:other:')",
        ]
    );
}
