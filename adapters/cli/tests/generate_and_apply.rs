use std::{fs, path::PathBuf, process::Command};

use serde_json::{json, Value};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("worldforge-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn read(path: &PathBuf) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read output")).expect("parse output")
}

#[test]
fn generated_worlds_accept_diffs() {
    let dir = scratch_dir("roundtrip");
    let config = dir.join("worldforge.toml");
    let params = dir.join("params.json");
    let world = dir.join("world.json");
    let diff = dir.join("diff.json");
    let merged = dir.join("merged.json");
    let response = dir.join("response.json");

    fs::write(&config, "[terrain]\nresolution = 48\n").unwrap();
    fs::write(
        &params,
        json!({"biome": "forest", "time": "day", "structure_counts": {"trees": 8, "rocks": 3}})
            .to_string(),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_worldforge"))
        .arg("--config")
        .arg(&config)
        .args(["generate", "--seed", "42", "--params"])
        .arg(&params)
        .arg("--out")
        .arg(&world)
        .status()
        .expect("run worldforge generate");
    assert!(status.success());

    let generated = read(&world);
    assert_eq!(generated["world"]["biome"], json!("forest"));
    assert_eq!(generated["world"]["terrain"]["resolution"], json!(48));
    assert_eq!(generated["world"]["terrain"]["seed"], json!(42));
    assert!(generated["world"]["lighting"].is_object());
    let trees = generated["structures"]["trees"].as_array().unwrap().len();
    assert!(trees <= 8);

    fs::write(
        &diff,
        json!({"remove": {"trees": 999}, "time_change": "night"}).to_string(),
    )
    .unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_worldforge"))
        .arg("--config")
        .arg(&config)
        .args(["apply", "--seed", "1", "--world"])
        .arg(&world)
        .arg("--diff")
        .arg(&diff)
        .arg("--out")
        .arg(&merged)
        .arg("--response")
        .arg(&response)
        .status()
        .expect("run worldforge apply");
    assert!(status.success());

    let merged = read(&merged);
    assert_eq!(merged["structures"]["trees"], json!([]));
    assert_eq!(merged["world"]["time"], json!("night"));
    assert_eq!(
        merged["structures"]["rocks"],
        generated["structures"]["rocks"]
    );

    let response = read(&response);
    assert_eq!(response["world"]["time"], json!("night"));
    assert!(response.get("physics").is_none());
    assert!(response.get("spawn_point").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_inputs_fail_with_a_message() {
    let output = Command::new(env!("CARGO_BIN_EXE_worldforge"))
        .args(["generate", "--params", "/definitely/not/here.json"])
        .output()
        .expect("run worldforge generate");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}
