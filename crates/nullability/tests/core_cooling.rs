use nullability::config::{NilComparisonPolicy, OutputFormat};
use nullability::{NullcheckConfig, Session};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn core_cooling(config: NullcheckConfig) -> Session {
    Session::open(&fixture("CoreCooling.toml"), config).unwrap()
}

fn error_lines(rendered: &str) -> Vec<&str> {
    rendered
        .lines()
        .filter(|line| line.contains(": error: "))
        .collect()
}

#[test]
fn core_cooling_diagnostics() {
    let session = core_cooling(NullcheckConfig::default());
    let source = std::fs::read_to_string(fixture("nullability.swift")).unwrap();
    let report = session.check_source("nullability.swift", &source);
    assert!(report.has_errors());

    let rendered = report.render(OutputFormat::Plain).unwrap();
    let unwrap = "value of optional type 'SomeClass?' not unwrapped; did you mean to use '!' or '?'?";
    let expected = vec![
        "nullability.swift:14:24: error: value of optional type 'AnyObject?' not unwrapped; did you mean to use '!' or '?'? {35-35=!}".to_string(),
        format!("nullability.swift:24:14: error: {unwrap} {{17-17=!}}"),
        format!("nullability.swift:27:14: error: {unwrap} {{17-17=!}}"),
        format!("nullability.swift:28:26: error: {unwrap} {{29-29=!}}"),
        format!("nullability.swift:31:14: error: {unwrap} {{17-17=!}}"),
        format!("nullability.swift:42:25: error: {unwrap} {{28-28=!}}"),
        "nullability.swift:54:33: error: nil is not compatible with expected argument type 'CCRefrigerator'".to_string(),
        "nullability.swift:59:38: error: cannot convert value of type 'Int' to expected argument type 'CCRefrigerator?'".to_string(),
    ];
    assert_eq!(error_lines(&rendered), expected);
}

#[test]
fn bindings_get_an_if_let_note() {
    let session = core_cooling(NullcheckConfig::default());
    let source = std::fs::read_to_string(fixture("nullability.swift")).unwrap();
    let report = session.check_source("nullability.swift", &source);

    let rendered = report.render(OutputFormat::Plain).unwrap();
    let notes: Vec<&str> = rendered.lines().filter(|line| line.contains(": note: ")).collect();
    assert_eq!(notes.len(), 2, "{rendered}");
    assert!(notes[0].contains("'ao3'"));
    assert!(notes[0].contains("{3-6=if let}"));
    assert!(notes[1].contains("'sc3a'"));

    let mut config = NullcheckConfig::default();
    config.check.conditional_unwrap_notes = false;
    let quiet = core_cooling(config).check_source("nullability.swift", &source);
    assert!(quiet.diagnostics.iter().all(|diag| diag.notes.is_empty()));
}

#[test]
fn annotation_problems_become_import_warnings() {
    let session = core_cooling(NullcheckConfig::default());
    let warnings = session.import_diagnostics();
    assert_eq!(warnings.len(), 1);
    assert!(!warnings[0].is_error());
    assert!(warnings[0].span.is_none());
    assert!(warnings[0]
        .message
        .starts_with("parameter 1 of 'Thermostat.broken:': conflicting nullability"));
    assert!(warnings[0].message.ends_with("(treated as unspecified)"));

    // The conflicting slot falls back to an optional; its neighbour is audited.
    let interface = session.module().render_interface();
    assert!(interface.contains("  func broken(_: SomeClass?)\n"), "{interface}");
    assert!(interface.contains("  func setTarget(_: SomeClass)\n"), "{interface}");
}

#[test]
fn interface_dump_shows_projected_types() {
    let session = core_cooling(NullcheckConfig::default());
    let interface = session.module().render_interface();
    for line in [
        "module CoreCooling",
        "func CCRefrigeratorOpenDoSomething(_: CCRefrigerator)",
        "func CCRefrigeratorOpenMaybeDoSomething(_: CCRefrigerator?)",
        "  func methodA(_: SomeClass?) -> AnyObject",
        "  func methodD() -> AnyObject",
        "  func methodF(_: SomeClass, second: SomeClass)",
        "  func methodG(_: SomeClass, second: SomeClass?)",
        "  func returnMe() -> SomeClass",
        "  var property: AnyObject? { get }",
        "  init(int: CInt)",
        "  init?(double: Double)",
    ] {
        assert!(interface.contains(line), "missing {line:?} in\n{interface}");
    }
}

#[test]
fn reference_only_policy_flags_scalar_nil_checks() {
    let mut config = NullcheckConfig::default();
    config.check.nil_comparison = NilComparisonPolicy::ReferenceOnly;
    let session = core_cooling(config);
    let report = session.check_source(
        "nil_checks.swift",
        "func f(sc: SomeClass, n: CInt) {\n  if sc == nil { }\n  if n == nil { }\n}\n",
    );
    let rendered = report.render(OutputFormat::Plain).unwrap();
    assert_eq!(
        rendered,
        "nil_checks.swift:3:6: warning: comparing non-optional value of type 'CInt' to 'nil' always returns false\n"
    );
    assert!(!report.has_errors());
}

#[test]
fn syntax_and_type_errors_are_reported_in_source_order() {
    let session = core_cooling(NullcheckConfig::default());
    let report = session.check_source(
        "broken.swift",
        "func f(sc: SomeClass) {\n  let = 1\n  sc.methodE(nil)\n}\n",
    );
    let rendered = report.render(OutputFormat::Plain).unwrap();
    assert_eq!(
        error_lines(&rendered),
        vec![
            "broken.swift:2:7: error: expected pattern",
            "broken.swift:3:14: error: nil is not compatible with expected argument type 'SomeClass'",
        ]
    );

    let report = session.check_source(
        "late.swift",
        "func f(sc: SomeClass) {\n  sc.methodE(nil)\n  let = 1\n}\n",
    );
    let rendered = report.render(OutputFormat::Plain).unwrap();
    assert_eq!(
        error_lines(&rendered),
        vec![
            "late.swift:2:14: error: nil is not compatible with expected argument type 'SomeClass'",
            "late.swift:3:7: error: expected pattern",
        ]
    );
}

#[test]
fn json_manifest_and_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("Ice.json");
    std::fs::write(
        &manifest,
        r#"{
            "module": "Ice",
            "class": [{
                "name": "Cube",
                "method": [{ "selector": "melt:", "params": ["Cube * _Nonnull"] }]
            }]
        }"#,
    )
    .unwrap();
    let source = dir.path().join("main.swift");
    std::fs::write(&source, "import Ice\nfunc f(c: Cube) {\n  c.melt(nil)\n}\n").unwrap();

    let session = Session::open(&manifest, NullcheckConfig::default()).unwrap();
    let report = session.check_file(&source).unwrap();
    let rendered = report.render(OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["severity"], "error");
    assert_eq!(entries[0]["category"], "nil-incompatible");
    assert_eq!(entries[0]["line"], 3);
    assert_eq!(entries[0]["column"], 10);
    assert!(entries[0]["fixits"].as_array().unwrap().is_empty());
}

#[test]
fn missing_source_file_is_an_error() {
    let session = core_cooling(NullcheckConfig::default());
    let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/nope.swift");
    assert!(session.check_file(&missing).is_err());
}

#[test]
fn discovered_config_audits_unannotated_declarations() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("nullcheck.toml"),
        "[resolve]\ndefault_audited = true\n",
    )
    .unwrap();
    let config = NullcheckConfig::discover(dir.path());
    assert!(config.resolve.default_audited);

    let manifest = dir.path().join("Ice.toml");
    std::fs::write(
        &manifest,
        "module = \"Ice\"\n[[function]]\nname = \"IceMake\"\nparams = [\"int *\"]\n",
    )
    .unwrap();
    let session = Session::open(&manifest, config).unwrap();
    assert!(session
        .module()
        .render_interface()
        .contains("func IceMake(_: UnsafeMutablePointer<CInt>)"));

    let fallback = NullcheckConfig::discover(&dir.path().join("elsewhere"));
    assert!(!fallback.resolve.default_audited);
}
