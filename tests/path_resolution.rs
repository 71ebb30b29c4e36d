//! Path resolution against a real directory tree

mod fixtures;

use std::fs;

use artifact_registry::{PathResolver, Resolution, Strategy};
use fixtures::Workspace;

fn resolver(ws: &Workspace) -> PathResolver {
    PathResolver::from_config(&ws.config)
}

// === Strategies ===

#[test]
fn test_absolute_path_resolves_to_itself() {
    let ws = Workspace::new();
    let file = ws.input("abalone.csv", "a,b\n1,2\n");

    let resolution = resolver(&ws).resolve(&file.display().to_string());
    assert_eq!(
        resolution,
        Resolution::Resolved {
            path: file,
            strategy: Strategy::Absolute
        }
    );
}

#[test]
fn test_relative_path_resolves_against_working_root() {
    let ws = Workspace::new();
    let file = ws.input("nested/iris.csv", "x\n");

    let resolution = resolver(&ws).resolve("inputs/nested/iris.csv");
    assert_eq!(resolution.path(), Some(file.as_path()));
    assert!(matches!(
        resolution,
        Resolution::Resolved {
            strategy: Strategy::WorkingRoot,
            ..
        }
    ));
}

#[test]
fn test_bare_leaf_is_found_in_search_roots() {
    let ws = Workspace::new();
    let file = ws.input("deep/er/WDC_planets.csv", "x\n");

    let resolution = resolver(&ws).resolve("/somewhere/else/wdc_PLANETS.csv");
    assert_eq!(resolution.path(), Some(file.as_path()));
    assert!(matches!(
        resolution,
        Resolution::Resolved {
            strategy: Strategy::LeafSearch,
            ..
        }
    ));
}

#[test]
fn test_percent_encoded_input_is_decoded() {
    let ws = Workspace::new();
    let file = ws.input("with space.csv", "x\n");

    let encoded = file.display().to_string().replace(' ', "%20");
    assert_eq!(resolver(&ws).resolve(&encoded).path(), Some(file.as_path()));
}

#[test]
fn test_literal_percent_name_still_resolves() {
    let ws = Workspace::new();
    let file = ws.input("100%20done.csv", "x\n");

    let resolution = resolver(&ws).resolve(&file.display().to_string());
    assert_eq!(resolution.path(), Some(file.as_path()));
}

#[test]
fn test_unresolvable_path_is_returned_unchanged() {
    let ws = Workspace::new();
    let raw = "does/not/exist.csv";

    let resolution = resolver(&ws).resolve(raw);
    assert!(!resolution.is_resolved());
    assert_eq!(resolution.into_string(), raw);
}

#[test]
fn test_resolution_is_idempotent() {
    let ws = Workspace::new();
    ws.input("ncvoter.csv", "x\n");
    let resolver = resolver(&ws);

    for raw in ["inputs/ncvoter.csv", "ncvoter.csv", "missing.csv"] {
        let once = resolver.resolve(raw).into_string();
        let twice = resolver.resolve(&once).into_string();
        assert_eq!(once, twice, "resolving {raw} twice changed the result");
    }
}

// === Deployment root ===

#[test]
fn test_deployment_marker_reanchors_onto_configured_root() {
    let ws = Workspace::with_overrides(serde_json::json!({
        "resolution": { "deployment_root": "deploy" }
    }));
    let target = ws.root.join("deploy/inputs/flight.csv");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "x\n").unwrap();

    let resolution =
        resolver(&ws).resolve("/old/server/app/WEB-INF/classes/inputs/flight.csv");
    assert_eq!(resolution.path(), Some(target.as_path()));
    assert!(matches!(
        resolution,
        Resolution::Resolved {
            strategy: Strategy::DeploymentRoot,
            ..
        }
    ));
}

#[test]
fn test_deployment_marker_without_root_falls_through() {
    let ws = Workspace::new();
    let file = ws.input("flight.csv", "x\n");

    let resolution = resolver(&ws).resolve("/old/WEB-INF/classes/inputs/flight.csv");
    assert_eq!(resolution.path(), Some(file.as_path()));
    assert!(matches!(
        resolution,
        Resolution::Resolved {
            strategy: Strategy::LeafSearch,
            ..
        }
    ));
}

// === Directories ===

#[test]
fn test_resolve_directory_anchors_and_collapses() {
    let ws = Workspace::new();
    let resolver = resolver(&ws);

    assert_eq!(
        resolver.resolve_directory("inputs/./sub/../other"),
        ws.root.join("inputs/other")
    );
    assert_eq!(resolver.resolve_directory("/abs/dir"), std::path::PathBuf::from("/abs/dir"));
}

#[test]
fn test_locate_managed_does_not_escape_its_directory() {
    let ws = Workspace::new();
    ws.input("shared.jar", "not an artifact");
    let resolver = resolver(&ws);

    let algorithms = ws.config.directories.algorithms.clone();
    assert_eq!(resolver.locate_managed(&algorithms, "shared.jar"), None);
}
