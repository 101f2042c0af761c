use assert_cmd::Command;
use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn gbvh_cmd(work_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("gbvh");
    cmd.current_dir(work_dir.path());
    cmd.env("NO_COLOR", "1");
    cmd
}

fn write_units(work_dir: &TempDir) {
    let units = work_dir.path().join("units");
    std::fs::create_dir(&units).unwrap();
    std::fs::write(
        units.join("4.json"),
        r#"[
 {"id": "<0000ABCD>", "x": [0, 1], "y": [0, 1], "z": [0, 1]},
 {"id": "<0000DCBA>", "x": [1, 2], "y": [1, 2], "z": [1, 2]},
 {"id": "<00000007>", "x": [5, 6], "y": [0, 1], "z": [0, 1]}
]"#,
    )
    .unwrap();
    std::fs::write(units.join("10.json"), "[]").unwrap();
}

#[test]
fn test_help_lists_subcommands() {
    cargo_bin_cmd!("gbvh")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("pack"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn test_verbose_quiet_conflict() {
    let tmp = TempDir::new().unwrap();
    gbvh_cmd(&tmp)
        .args(["--verbose", "--quiet", "info", "x.bvh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_pack_info_extract() {
    let tmp = TempDir::new().unwrap();
    write_units(&tmp);

    // 3 leaves -> 5 records, empty map -> header only
    gbvh_cmd(&tmp)
        .args(["pack", "units", "-o", "field.bvh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 352 bytes"));

    gbvh_cmd(&tmp)
        .args(["info", "field.bvh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Maps:      2"))
        .stdout(predicate::str::is_match(r"\n\s+4\s+5\s+3\s+").unwrap());

    gbvh_cmd(&tmp)
        .args(["extract", "field.bvh", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 map(s)"));

    let text = std::fs::read_to_string(tmp.path().join("out/4.json")).unwrap();
    let unit: serde_json::Value = serde_json::from_str(&text).unwrap();
    let mut ids: Vec<&str> = unit.as_array().unwrap().iter().map(|l| l["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["<00000007>", "<0000ABCD>", "<0000DCBA>"]);

    let empty = std::fs::read_to_string(tmp.path().join("out/10.json")).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&empty).unwrap(), serde_json::json!([]));
}

#[test]
fn test_extract_compact() {
    let tmp = TempDir::new().unwrap();
    write_units(&tmp);

    gbvh_cmd(&tmp).args(["-q", "pack", "units", "-o", "field.bvh"]).assert().success().stdout("");
    gbvh_cmd(&tmp).args(["extract", "--compact", "field.bvh", "-o", "out"]).assert().success();

    let text = std::fs::read_to_string(tmp.path().join("out/4.json")).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn test_malformed_container_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("bad.bvh"), b"GBVH\x00\x02\x00\x00\x10\x00\x00\x00\x01\x00\x00\x00").unwrap();

    gbvh_cmd(&tmp)
        .args(["extract", "bad.bvh", "-o", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to extract bad.bvh"))
        .stderr(predicate::str::contains("version"));

    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_bad_unit_fails() {
    let tmp = TempDir::new().unwrap();
    let units = tmp.path().join("units");
    std::fs::create_dir(&units).unwrap();
    std::fs::write(units.join("3.json"), r#"[{"id":"<nothex>","x":[0,1],"y":[0,1],"z":[0,1]}]"#).unwrap();

    gbvh_cmd(&tmp)
        .args(["pack", "units", "-o", "field.bvh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("map 3"));

    assert!(!tmp.path().join("field.bvh").exists());
}

/// Level file with one ENEW entry (waves 2..5) and one untyped section.
fn write_level(work_dir: &TempDir) {
    let mut enew = vec![0u8; 12];
    enew[4] = 1;
    enew[8..10].copy_from_slice(&2u16.to_le_bytes());
    enew[10..12].copy_from_slice(&5u16.to_le_bytes());

    let mut sections = Vec::new();
    for (tag, entry) in [(b"ENEW", enew), (b"ZZZZ", vec![0xCA, 0xFE])] {
        let start = sections.len();
        sections.extend_from_slice(tag);
        sections.extend_from_slice(&(32 + entry.len() as u32).to_le_bytes());
        sections.extend_from_slice(&1u32.to_le_bytes());
        sections.extend_from_slice(&1u32.to_le_bytes());
        sections.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        sections.resize(start + 32, 0);
        sections.extend_from_slice(&entry);
    }

    let mut data = b"LVLB".to_vec();
    data.extend_from_slice(&(32 + sections.len() as u32).to_le_bytes());
    data.extend_from_slice(&5u32.to_le_bytes());
    data.resize(32, 0);
    data.extend_from_slice(&sections);
    std::fs::write(work_dir.path().join("field.lvb"), data).unwrap();
}

#[test]
fn test_sections_dump() {
    let tmp = TempDir::new().unwrap();
    write_level(&tmp);

    let output = gbvh_cmd(&tmp).args(["sections", "field.lvb", "--compact"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(value["version"], 5);
    assert_eq!(value["sections"][0]["magic"], "ENEW");
    assert_eq!(value["sections"][0]["entries"][0]["start_wave"], 2);
    assert_eq!(value["sections"][0]["entries"][0]["end_wave"], 5);
    assert_eq!(value["sections"][1]["entries"][0]["bytes"], "cafe");
}

#[test]
fn test_sections_single_tag() {
    let tmp = TempDir::new().unwrap();
    write_level(&tmp);

    gbvh_cmd(&tmp)
        .args(["sections", "field.lvb", "--tag", "ZZZZ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"magic\": \"ZZZZ\""))
        .stdout(predicate::str::contains("ENEW").not());

    gbvh_cmd(&tmp)
        .args(["sections", "field.lvb", "--tag", "INFO"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no INFO section"));
}

#[test]
fn test_extract_non_finite_leaf_fails() {
    let tmp = TempDir::new().unwrap();
    write_units(&tmp);
    gbvh_cmd(&tmp).args(["pack", "units", "-o", "field.bvh"]).assert().success();

    // Map 4 sorts first and holds all 5 records: set every min.x to -inf
    let path = tmp.path().join("field.bvh");
    let mut data = std::fs::read(&path).unwrap();
    let records = (data.len() - 32) / 64;
    for record in 0..records {
        let at = 16 + record * 64;
        data[at..at + 4].copy_from_slice(&f32::NEG_INFINITY.to_le_bytes());
    }
    std::fs::write(&path, data).unwrap();

    gbvh_cmd(&tmp)
        .args(["extract", "field.bvh", "-o", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-finite"));

    assert!(!tmp.path().join("out").exists());
}
