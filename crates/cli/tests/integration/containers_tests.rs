//! `containers` command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;
#[cfg(unix)]
use super::common::DIGEST;

const SIDECAR: &str = "oasis.pipeline_component_root.yaml";

#[test]
fn new_python_uv_root_records_image_name() {
  let env = TestEnv::new();

  env
    .oasis_cmd()
    .args(["containers", "new", "python-uv-container-root"])
    .args(["--container-image-name", "ghcr.io/org/app"])
    .arg("--directory")
    .arg(env.path().join("root"))
    .assert()
    .success();

  for file in ["Dockerfile", ".dockerignore", "pyproject.toml", "uv.lock", ".python-version"] {
    assert!(env.path().join("root").join(file).exists(), "{} should exist", file);
  }
  let sidecar: serde_yaml::Value = serde_yaml::from_str(&env.read_file(&format!("root/{}", SIDECAR))).unwrap();
  assert_eq!(sidecar["container_image_name"].as_str(), Some("ghcr.io/org/app"));
}

#[test]
fn new_into_existing_root_needs_force() {
  let env = TestEnv::new();
  env.write_file("root/Dockerfile", "FROM scratch\n");

  env
    .oasis_cmd()
    .args(["containers", "new", "generic-container-root"])
    .args(["--container-image-name", "ghcr.io/org/app"])
    .arg("--directory")
    .arg(env.path().join("root"))
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("Dockerfile").and(predicate::str::contains("--force")));

  assert_eq!(env.read_file("root/Dockerfile"), "FROM scratch\n");
  assert!(!env.path().join("root").join(SIDECAR).exists());

  env
    .oasis_cmd()
    .args(["containers", "new", "generic-container-root", "--force"])
    .args(["--container-image-name", "ghcr.io/org/app"])
    .arg("--directory")
    .arg(env.path().join("root"))
    .assert()
    .success()
    .stderr(predicate::str::contains("Overwrote Dockerfile"));
}

#[test]
fn build_without_repository_fails() {
  let env = TestEnv::new();
  env.write_file("root/Dockerfile", "FROM scratch\n");

  env
    .oasis_cmd()
    .args(["containers", "build", "--tag", "v1", "--directory"])
    .arg(env.path().join("root"))
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("container_image_name"));
}

#[cfg(unix)]
#[test]
fn build_uses_sidecar_and_records_digest() {
  let env = TestEnv::new();
  let root = env.path().join("root");

  env
    .oasis_cmd()
    .args(["containers", "new", "generic-container-root"])
    .args(["--container-image-name", "ghcr.io/org/app:v1"])
    .arg("--directory")
    .arg(&root)
    .assert()
    .success();

  env
    .oasis_cmd()
    .args(["containers", "build", "--directory"])
    .arg(&root)
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("ghcr.io/org/app@{}", DIGEST)));

  let log = env.engine_log();
  assert_eq!(log.len(), 2);
  assert_eq!(
    log[0],
    format!(
      "build -f {} -t ghcr.io/org/app:v1 --platform linux/amd64 {}",
      root.join("Dockerfile").display(),
      root.display()
    )
  );
  assert!(log[1].starts_with("push --digestfile "));
  assert!(log[1].ends_with(" ghcr.io/org/app:v1"));

  let sidecar: serde_yaml::Value = serde_yaml::from_str(&env.read_file(&format!("root/{}", SIDECAR))).unwrap();
  let expected = format!("ghcr.io/org/app@{}", DIGEST);
  assert_eq!(sidecar["container_image_name"].as_str(), Some(expected.as_str()));

  // A rebuild starts from the pinned reference and keeps the repository.
  env
    .oasis_cmd()
    .args(["containers", "build", "--tag", "v2", "--platform", "linux/arm64", "--directory"])
    .arg(&root)
    .assert()
    .success();
  let log = env.engine_log();
  assert!(log[2].contains("-t ghcr.io/org/app:v2 --platform linux/arm64"));
}

#[cfg(unix)]
#[test]
fn explicit_repository_overrides_sidecar() {
  let env = TestEnv::new();
  let root = env.path().join("root");
  env.write_file("root/Dockerfile", "FROM scratch\n");
  env.write_file(&format!("root/{}", SIDECAR), "container_image_name: ghcr.io/org/old\nowner: team\n");

  env
    .oasis_cmd()
    .args(["containers", "build", "--repository", "localhost:5000/new", "--tag", "dev", "--directory"])
    .arg(&root)
    .assert()
    .success();

  assert!(env.engine_log()[0].contains("-t localhost:5000/new:dev "));
  let sidecar: serde_yaml::Value = serde_yaml::from_str(&env.read_file(&format!("root/{}", SIDECAR))).unwrap();
  let expected = format!("localhost:5000/new@{}", DIGEST);
  assert_eq!(sidecar["container_image_name"].as_str(), Some(expected.as_str()));
  assert_eq!(sidecar["owner"].as_str(), Some("team"));
}

#[cfg(unix)]
#[test]
fn failing_engine_leaves_sidecar_unchanged() {
  let env = TestEnv::new();
  let root = env.path().join("root");
  env.write_file("root/Dockerfile", "FROM scratch\n");
  env.write_file(&format!("root/{}", SIDECAR), "container_image_name: ghcr.io/org/app:v1\n");
  let failing = env.write_script("bin/failing-engine", "#!/bin/sh\nexit 3\n");

  env
    .oasis_cmd()
    .env("OASIS_CONTAINER_ENGINE", &failing)
    .args(["containers", "build", "--directory"])
    .arg(&root)
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("exit code 3"));

  assert_eq!(
    env.read_file(&format!("root/{}", SIDECAR)),
    "container_image_name: ghcr.io/org/app:v1\n"
  );
}
