// Markup options loaded from YAML files

use annotext::{MarkupOptions, Tag, TextError};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_options_from_file() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        file,
        "namespace_weights:\n  section: 0\nid_weights:\n  NN: 2\nnamespaces:\n  penn: pos\n  offset: ~\ninclude: [penn, section]\nroot: doc"
    )
    .unwrap();

    let options = MarkupOptions::from_yaml_file(file.path()).unwrap();
    assert_eq!(options.weight(&Tag::point("section", "p", 0)), 0);
    assert_eq!(options.weight(&Tag::point("penn", "NN", 0)), 2 * annotext::config::DEFAULT_WEIGHT);
    assert_eq!(options.element_name(&Tag::point("penn", "NN", 0)), "pos:NN");
    assert_eq!(options.element_name(&Tag::point("offset", "o", 0)), "o");
    assert!(options.includes("penn"));
    assert!(!options.includes("offset"));
    assert_eq!(options.root.as_deref(), Some("doc"));
}

#[test]
fn test_options_survive_yaml_round_trip() {
    let options = MarkupOptions::new()
        .with_namespace_weight("section", 0)
        .with_namespace_alias("penn", None);

    let yaml = options.to_yaml_string().unwrap();
    assert_eq!(MarkupOptions::from_yaml_str(&yaml).unwrap(), options);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = MarkupOptions::from_yaml_file(dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(TextError::Config(_))));
}
