use std::path::{Path, PathBuf};

use semver::Version;

use super::*;

fn gate_for(input: &str) -> VersionGate {
    VersionGate::classify(&parse_version_triple(input).expect("must parse version"))
}

#[test]
fn version_gate_accepts_releases_newer_than_1_4_0() {
    assert_eq!(gate_for("1.4.1"), VersionGate::Current);
    assert_eq!(gate_for("1.5.0"), VersionGate::Current);
    assert_eq!(gate_for("2.4.1"), VersionGate::Current);
    assert!(gate_for("1.4.1").reports_backup_location());
}

#[test]
fn version_gate_marks_1_4_0_as_legacy() {
    assert_eq!(gate_for("1.4.0"), VersionGate::Legacy);
    assert!(!gate_for("1.4.0").reports_backup_location());
    assert_eq!(VersionGate::Legacy.as_str(), "legacy");
}

#[test]
fn version_gate_rejects_old_releases() {
    assert_eq!(gate_for("1.3.12"), VersionGate::Unsupported);
    assert_eq!(gate_for("0.9.9"), VersionGate::Unsupported);
}

#[test]
fn version_gate_compares_minor_even_for_later_majors() {
    assert_eq!(gate_for("2.0.0"), VersionGate::Unsupported);
    assert_eq!(gate_for("2.4.0"), VersionGate::Legacy);
}

#[test]
fn parse_reported_version_reads_text_after_marker() {
    let version =
        parse_reported_version("OctoPrint, version 1.4.2\n").expect("must parse version output");
    assert_eq!(version, Version::new(1, 4, 2));
}

#[test]
fn parse_reported_version_ignores_component_suffixes() {
    let version =
        parse_reported_version("OctoPrint, version 1.5.0rc1").expect("must parse rc version");
    assert_eq!(version, Version::new(1, 5, 0));

    let version =
        parse_reported_version("OctoPrint, version 1.4.0.post0").expect("must parse post version");
    assert_eq!(version, Version::new(1, 4, 0));
}

#[test]
fn parse_reported_version_rejects_missing_marker() {
    let err = parse_reported_version("OctoPrint 1.4.2").expect_err("marker is required");
    assert!(
        err.to_string().contains("did not contain a version"),
        "unexpected error: {err}"
    );
}

#[test]
fn parse_version_triple_requires_three_components() {
    let err = parse_version_triple("1.4").expect_err("patch is required");
    assert!(
        err.to_string().contains("missing its patch component"),
        "unexpected error: {err}"
    );

    let err = parse_version_triple("1.x.0").expect_err("minor must be numeric");
    assert!(
        err.to_string().contains("non-numeric minor component"),
        "unexpected error: {err}"
    );
}

#[test]
fn backup_location_reads_current_format() {
    let output = "Creating backup...\nBackup located at /x/y/z.zip\n";
    let location =
        parse_backup_location(output, VersionGate::Current, None, Path::new("data/backup"))
            .expect("must locate backup");
    assert_eq!(location.stem(), Path::new("/x/y/z"));
    assert_eq!(location.archive_path(), PathBuf::from("/x/y/z.zip"));
}

#[test]
fn backup_location_joins_legacy_name_with_config_base() {
    let output = "Creating backup at myfile.zip";
    let location = parse_backup_location(
        output,
        VersionGate::Legacy,
        Some(Path::new("/cfg")),
        Path::new("data/backup"),
    )
    .expect("must locate legacy backup");
    assert_eq!(location.stem(), Path::new("/cfg/data/backup/myfile"));
    assert_eq!(
        location.archive_path(),
        PathBuf::from("/cfg/data/backup/myfile.zip")
    );
}

#[test]
fn backup_location_accepts_legacy_name_without_extension() {
    let location = parse_backup_location(
        "Creating backup at myfile",
        VersionGate::Legacy,
        Some(Path::new("/cfg")),
        Path::new("data/backup"),
    )
    .expect("must locate legacy backup");
    assert_eq!(location.stem(), Path::new("/cfg/data/backup/myfile"));
}

#[test]
fn backup_location_legacy_name_stops_at_end_of_line() {
    let location = parse_backup_location(
        "Creating backup at backup-20240101.zip\r\nDone.\n",
        VersionGate::Legacy,
        Some(Path::new("/cfg")),
        Path::new("data/backup"),
    )
    .expect("must locate legacy backup");
    assert_eq!(
        location.archive_path(),
        PathBuf::from("/cfg/data/backup/backup-20240101.zip")
    );
}

#[test]
fn backup_location_legacy_requires_config_base() {
    let err = parse_backup_location(
        "Creating backup at myfile.zip",
        VersionGate::Legacy,
        None,
        Path::new("data/backup"),
    )
    .expect_err("config base is required");
    assert!(
        err.to_string().contains("config directory is required"),
        "unexpected error: {err}"
    );
}

#[test]
fn backup_location_rejects_output_without_location() {
    let err = parse_backup_location(
        "Creating backup at myfile.zip",
        VersionGate::Current,
        None,
        Path::new("data/backup"),
    )
    .expect_err("current format expects a located line");
    assert!(
        err.to_string().contains("Backup located at"),
        "unexpected error: {err}"
    );
}

#[test]
fn inventory_parses_manifest_and_ignores_extra_fields() {
    let inventory = PluginInventory::from_manifest_json(
        r#"[{"name":"A","key":"a1","version":"1.0"},{"name":"B","key":"b1"}]"#,
    )
    .expect("must parse manifest");
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory.plugins()[1].key, "b1");
    assert_eq!(inventory.plugins()[1].name, "B");
}

#[test]
fn inventory_rejects_manifest_without_key() {
    let err = PluginInventory::from_manifest_json(r#"[{"name":"A"}]"#)
        .expect_err("key is required");
    assert!(
        err.to_string().contains("failed to parse plugin manifest"),
        "unexpected error: {err}"
    );
}

#[test]
fn match_inventory_queues_catalog_hits_and_keeps_misses() {
    let inventory =
        PluginInventory::from_manifest_json(r#"[{"name":"A","key":"a1"},{"name":"B","key":"b1"}]"#)
            .expect("must parse manifest");
    let catalog = parse_catalog_json(r#"[{"id":"a1","archive":"urlA"}]"#).expect("must parse");

    let plan = match_inventory(&inventory, &catalog);

    assert_eq!(
        plan.queued,
        vec![QueuedPlugin {
            key: "a1".to_string(),
            name: "A".to_string(),
            archive: "urlA".to_string(),
        }]
    );
    assert_eq!(
        plan.unmatched,
        vec![PluginRecord {
            name: "B".to_string(),
            key: "b1".to_string(),
        }]
    );
}

#[test]
fn match_inventory_follows_catalog_order_and_consumes_keys_once() {
    let inventory = PluginInventory::new(vec![
        PluginRecord {
            name: "First".to_string(),
            key: "first".to_string(),
        },
        PluginRecord {
            name: "Second".to_string(),
            key: "second".to_string(),
        },
    ]);
    let catalog = parse_catalog_json(
        r#"[
            {"id":"second","archive":"urlSecond","title":"Second"},
            {"id":"first","archive":"urlFirst"},
            {"id":"first","archive":"urlFirstAgain"}
        ]"#,
    )
    .expect("must parse catalog");

    let plan = match_inventory(&inventory, &catalog);

    let archives = plan
        .queued
        .iter()
        .map(|plugin| plugin.archive.as_str())
        .collect::<Vec<_>>();
    assert_eq!(archives, vec!["urlSecond", "urlFirst"]);
    assert!(plan.unmatched.is_empty());
}

#[test]
fn match_inventory_skips_catalog_entries_without_archive() {
    let inventory = PluginInventory::new(vec![PluginRecord {
        name: "Bundled".to_string(),
        key: "bundled".to_string(),
    }]);
    let catalog = parse_catalog_json(r#"[{"id":"bundled"},{"id":"bundled","archive":" "}]"#)
        .expect("must parse catalog");

    let plan = match_inventory(&inventory, &catalog);

    assert!(plan.queued.is_empty());
    assert_eq!(plan.unmatched.len(), 1);
}

#[test]
fn upgrade_config_defaults_describe_appliance_image() {
    let config = UpgradeConfig::default();
    assert_eq!(config.appliance_marker, PathBuf::from("/etc/octopi_version"));
    assert_eq!(config.appliance_venv, PathBuf::from("/home/pi/oprint"));
    assert_eq!(config.backup_excludes, vec!["timelapse", "uploads"]);
    assert_eq!(config.manifest_entry, "plugin_list.json");
    config.validate().expect("defaults must validate");
}

#[test]
fn upgrade_config_overrides_subset_from_toml() {
    let config = UpgradeConfig::from_toml_str(
        r#"
appliance_venv = "/opt/printer/venv"
backup_excludes = ["timelapse"]
"#,
    )
    .expect("must parse config");
    assert_eq!(config.appliance_venv, PathBuf::from("/opt/printer/venv"));
    assert_eq!(config.backup_excludes, vec!["timelapse"]);
    assert_eq!(config.app_package, "OctoPrint");
}

#[test]
fn upgrade_config_rejects_empty_and_non_http_catalog_url() {
    let err = UpgradeConfig::from_toml_str("catalog_url = \"\"").expect_err("must reject empty");
    assert!(
        err.to_string().contains("'catalog_url' must not be empty"),
        "unexpected error: {err}"
    );

    let err = UpgradeConfig::from_toml_str("catalog_url = \"ftp://example.test/plugins.json\"")
        .expect_err("must reject ftp");
    assert!(
        err.to_string().contains("must be an http(s) URL"),
        "unexpected error: {err}"
    );
}

#[test]
fn upgrade_config_rejects_absolute_venv_interpreter() {
    let err = UpgradeConfig::from_toml_str("venv_interpreter = \"/usr/bin/python\"")
        .expect_err("must reject absolute interpreter");
    assert!(
        err.to_string().contains("must be relative"),
        "unexpected error: {err}"
    );
}

#[test]
fn installation_context_derives_interpreter_and_retired_paths() {
    let context = InstallationContext::new(
        InstallKind::Appliance,
        PathBuf::from("/home/pi/oprint"),
        Path::new("bin/python"),
        None,
        ServiceCommands {
            stop: "sudo service octoprint stop".to_string(),
            start: "sudo service octoprint start".to_string(),
        },
        Version::new(1, 5, 2),
    );

    assert_eq!(
        context.interpreter(),
        Path::new("/home/pi/oprint/bin/python")
    );
    assert_eq!(
        context.retired_venv(".bak"),
        PathBuf::from("/home/pi/oprint.bak")
    );
    assert_eq!(context.gate(), VersionGate::Current);
    assert_eq!(context.gate().as_str(), "current");
    assert_eq!(context.kind().as_str(), "appliance");
    assert_eq!(context.version(), &Version::new(1, 5, 2));
}
