use std::path::PathBuf;

use is_project::schema::*;
use is_project::{ProjectError, load, load_yaml, save, save_yaml, validate_protocol_file};

fn protocols_dir() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // go to crates
    dir.pop(); // go to repo root
    dir.push("protocols");
    dir
}

#[test]
fn roundtrip_yaml_default_file() {
    let file = ProtocolFile::new("Default");
    validate_protocol_file(&file).unwrap();

    let path = std::env::temp_dir().join("is_project_roundtrip_default.yaml");
    save_yaml(&path, &file).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(file, loaded);
}

#[test]
fn roundtrip_json_with_pauses() {
    let mut file = ProtocolFile::new("Paused");
    file.protocol.cycles = 3;
    file.protocol.range_start_pa = 150.0;
    file.protocol.range_end_pa = -150.0;
    file.host.period_ms = 0.05;
    file.host.pauses.push(PauseWindowDef {
        start_s: 0.5,
        end_s: 0.75,
    });

    let path = std::env::temp_dir().join("is_project_roundtrip_paused.json");
    save(&path, &file).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(file, loaded);
}

#[test]
fn missing_fields_take_plugin_defaults() {
    let yaml = "version: 1\nname: Sparse\nprotocol:\n  cycles: 4\n";
    let file: ProtocolFile = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(file.protocol.cycles, 4);
    assert_eq!(file.protocol.stim_time_ms, 0.25);
    assert_eq!(file.protocol.range_start_pa, -100.0);
    assert_eq!(file.protocol.downtime_s, 0.556);
    assert_eq!(file.host, HostDef::default());
}

#[test]
fn unknown_extension_is_rejected() {
    let path = std::env::temp_dir().join("is_project_roundtrip.toml");
    let err = save(&path, &ProtocolFile::new("x")).unwrap_err();
    assert!(matches!(err, ProjectError::UnsupportedFormat { .. }));
}

#[test]
fn shipped_protocols_load() {
    let dir = protocols_dir();
    if !dir.exists() {
        eprintln!("Skipping test: protocols not found at {:?}", dir);
        return;
    }

    for name in [
        "default_istep.yaml",
        "staircase_two_cycles.yaml",
        "descending.json",
    ] {
        let file = load(&dir.join(name)).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(file.version, LATEST_VERSION);
    }

    let default = load(&dir.join("default_istep.yaml")).unwrap();
    assert_eq!(default.protocol, ProtocolDef::default());
}
