//! Input previews through the registry

mod fixtures;

use artifact_registry::{ParseSettings, RegisteredInput, RegistryError};
use fixtures::Workspace;

#[test]
fn test_preview_caps_rows_at_configured_default() {
    let ws = Workspace::new();
    let mut contents = String::from("n,square\n");
    for n in 0..60 {
        contents.push_str(&format!("{},{}\n", n, n * n));
    }
    let path = ws.input("squares.csv", &contents);
    let registry = ws.registry();
    let id = registry
        .inputs()
        .register(RegisteredInput::new(path.display().to_string()))
        .unwrap()
        .record()
        .id
        .unwrap();

    let preview = registry.preview().preview(id, 0).unwrap();
    assert_eq!(preview.headers, vec!["n", "square"]);
    assert_eq!(preview.line_count, 50);
    assert_eq!(preview.rows.len(), 50);

    let short = registry.preview().preview(id, 3).unwrap();
    assert_eq!(short.line_count, 3);
    assert_eq!(short.rows[2], vec![Some("2".to_string()), Some("4".to_string())]);
}

#[test]
fn test_preview_honors_separator_and_null_token() {
    let ws = Workspace::new();
    let settings = ParseSettings {
        separator: ';',
        null_value: "NA".to_string(),
        ..ParseSettings::default()
    };
    let path = ws.input("semi.csv", "city;zip\nPotsdam;NA\n");
    let registry = ws.registry();
    let id = registry
        .inputs()
        .register(RegisteredInput::new(path.display().to_string()).with_settings(settings))
        .unwrap()
        .record()
        .id
        .unwrap();

    let preview = registry.preview().preview(id, 10).unwrap();
    assert_eq!(preview.headers, vec!["city", "zip"]);
    assert_eq!(preview.rows, vec![vec![Some("Potsdam".to_string()), None]]);
}

#[test]
fn test_preview_without_header_generates_column_names() {
    let ws = Workspace::new();
    let settings = ParseSettings {
        has_header: false,
        ..ParseSettings::default()
    };
    let path = ws.input("raw.csv", "1,2,3\n4,5,6\n");
    let registry = ws.registry();
    let id = registry
        .inputs()
        .register(RegisteredInput::new(path.display().to_string()).with_settings(settings))
        .unwrap()
        .record()
        .id
        .unwrap();

    let preview = registry.preview().preview(id, 0).unwrap();
    assert_eq!(preview.headers, vec!["column1", "column2", "column3"]);
    assert_eq!(preview.line_count, 2);
}

#[test]
fn test_preview_of_malformed_input_is_a_read_error() {
    let ws = Workspace::new();
    let registry = ws.registry();
    let path = ws.input("ragged.csv", "a,b\n1,2\n3\n");
    let id = registry
        .inputs()
        .register(RegisteredInput::new(path.display().to_string()))
        .unwrap()
        .record()
        .id
        .unwrap();

    let err = registry.preview().preview(id, 0).unwrap_err();
    assert!(matches!(err, RegistryError::Read { .. }));
    assert_eq!(err.to_client_error().code, artifact_registry::ClientCode::BadRequest);
}

#[test]
fn test_preview_of_missing_file_or_record_is_not_found() {
    let ws = Workspace::new();
    let registry = ws.registry();
    let id = registry
        .inputs()
        .register(RegisteredInput::new("/nowhere/lost.csv"))
        .unwrap()
        .record()
        .id
        .unwrap();

    assert!(registry.preview().preview(id, 0).unwrap_err().is_not_found());
    assert!(registry.preview().preview(999, 0).unwrap_err().is_not_found());
}

#[test]
fn test_preview_of_latin1_input_replaces_undecodable_bytes() {
    let ws = Workspace::new();
    let path = ws.config.directories.inputs.join("latin1.csv");
    std::fs::write(&path, b"name,city\nJos\xe9,M\xfcnchen\n").unwrap();
    let registry = ws.registry();
    let id = registry
        .inputs()
        .register(RegisteredInput::new(path.display().to_string()))
        .unwrap()
        .record()
        .id
        .unwrap();

    let preview = registry.preview().preview(id, 0).unwrap();
    assert_eq!(preview.headers, vec!["name", "city"]);
    assert_eq!(preview.line_count, 1);
    assert_eq!(
        preview.rows[0],
        vec![Some("Jos\u{FFFD}".to_string()), Some("M\u{FFFD}nchen".to_string())]
    );
}
