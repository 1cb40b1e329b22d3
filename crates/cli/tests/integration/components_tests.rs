//! `components` command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

fn load_yaml(env: &TestEnv, relative_path: &str) -> serde_yaml::Value {
  serde_yaml::from_str(&env.read_file(relative_path)).unwrap()
}

fn new_function_component(env: &TestEnv, directory: &str) {
  env
    .oasis_cmd()
    .args(["components", "new", "python-function-component", "--directory"])
    .arg(env.path().join(directory))
    .assert()
    .success();
}

#[test]
fn shell_script_component_is_a_valid_spec() {
  let env = TestEnv::new();

  env
    .oasis_cmd()
    .args(["components", "new", "shell-script-component", "--directory"])
    .arg(env.path())
    .assert()
    .success();

  let spec = load_yaml(&env, "component.yaml");
  assert_eq!(spec["name"].as_str(), Some("Filter text"));
  assert!(spec["implementation"]["container"]["image"].is_string());
}

#[test]
fn regenerate_template_with_default_image() {
  let env = TestEnv::new();
  new_function_component(&env, "filter");

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component", "--directory"])
    .arg(env.path().join("filter"))
    .assert()
    .success()
    .stdout(predicate::str::contains("filter_text"));

  let spec = load_yaml(&env, "filter/component.yaml");
  assert_eq!(spec["name"].as_str(), Some("Filter text"));
  // OASIS_PYTHON points at a missing interpreter, so the fallback version is used.
  assert_eq!(spec["implementation"]["container"]["image"].as_str(), Some("python:3.12"));

  let annotations = &spec["metadata"]["annotations"];
  assert_eq!(annotations["cloud_pipelines.net"].as_str(), Some("true"));
  assert_eq!(
    annotations["components new regenerate python-function-component"].as_str(),
    Some("true")
  );
  let source = env.read_file("filter/component.py");
  assert_eq!(annotations["python_original_code"].as_str(), Some(source.as_str()));
  assert!(annotations.get("python_dependencies").is_none());
}

#[test]
fn regenerate_with_pyproject_dependencies() {
  let env = TestEnv::new();
  new_function_component(&env, "filter");
  env.write_file(
    "filter/pyproject.toml",
    "[project]\nname = \"filter\"\ndependencies = [\"requests>=2\"]\n",
  );

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component"])
    .args(["--container-image", "python:3.11-slim", "--directory"])
    .arg(env.path().join("filter"))
    .assert()
    .success();

  let spec = load_yaml(&env, "filter/component.yaml");
  assert_eq!(
    spec["metadata"]["annotations"]["python_dependencies"].as_str(),
    Some(r#"["requests>=2"]"#)
  );
  assert_eq!(spec["implementation"]["container"]["image"].as_str(), Some("python:3.11-slim"));
  let install = spec["implementation"]["container"]["command"][2].as_str().unwrap();
  assert!(install.contains("pip install"));
  assert!(install.contains("'requests>=2'"));
}

#[test]
fn regenerate_with_all_defaults_records_dependencies() {
  let env = TestEnv::new();
  new_function_component(&env, "filter");
  env.write_file(
    "filter/pyproject.toml",
    "[project]\nname = \"filter\"\ndependencies = [\"requests>=2\"]\n",
  );

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component", "--directory"])
    .arg(env.path().join("filter"))
    .assert()
    .success();

  let spec = load_yaml(&env, "filter/component.yaml");
  let annotations = &spec["metadata"]["annotations"];
  let source = env.read_file("filter/component.py");
  assert_eq!(annotations["python_original_code"].as_str(), Some(source.as_str()));
  assert_eq!(annotations["python_dependencies"].as_str(), Some(r#"["requests>=2"]"#));
  assert_eq!(spec["implementation"]["container"]["image"].as_str(), Some("python:3.12"));
}

#[test]
fn non_literal_default_is_rejected() {
  let env = TestEnv::new();
  env.write_file(
    "limit/component.py",
    "LIMIT = 10\n\n\ndef head(text: str, lines: int = LIMIT) -> str:\n    return text\n",
  );

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component", "--directory"])
    .arg(env.path().join("limit"))
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("'lines'").and(predicate::str::contains("LIMIT")));

  assert!(!env.path().join("limit/component.yaml").exists());
}

#[test]
fn regenerate_with_image_from_container_root() {
  let env = TestEnv::new();
  env
    .oasis_cmd()
    .args(["containers", "new", "generic-container-root"])
    .args(["--container-image-name", "ghcr.io/org/base:v1"])
    .arg("--directory")
    .arg(env.path())
    .assert()
    .success();
  new_function_component(&env, "components/filter");

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component"])
    .args(["--container-image-from", "../../oasis.pipeline_component_root.yaml"])
    .args(["--output-component-yaml-path", "out/component.yaml"])
    .arg("--directory")
    .arg(env.path().join("components/filter"))
    .assert()
    .success();

  let spec = load_yaml(&env, "components/filter/out/component.yaml");
  assert_eq!(
    spec["implementation"]["container"]["image"].as_str(),
    Some("ghcr.io/org/base:v1")
  );
}

#[test]
fn both_image_options_conflict() {
  let env = TestEnv::new();
  new_function_component(&env, "filter");

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component"])
    .args(["--container-image", "python:3.12"])
    .args(["--container-image-from", "image.yaml"])
    .arg("--directory")
    .arg(env.path().join("filter"))
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("cannot be specified at the same time"));

  assert!(!env.path().join("filter/component.yaml").exists());
}

#[test]
fn ambiguous_module_lists_functions() {
  let env = TestEnv::new();
  env.write_file(
    "multi/component.py",
    "def tokenize(text: str) -> list:\n    return text.split()\n\n\ndef count(text: str) -> int:\n    return len(text)\n",
  );

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component"])
    .args(["--container-image", "python:3.12", "--directory"])
    .arg(env.path().join("multi"))
    .assert()
    .failure()
    .code(1)
    .stderr(
      predicate::str::contains("--function-name")
        .and(predicate::str::contains("tokenize"))
        .and(predicate::str::contains("count")),
    );

  env
    .oasis_cmd()
    .args(["components", "regenerate", "python-function-component"])
    .args(["--container-image", "python:3.12", "--function-name", "count", "--directory"])
    .arg(env.path().join("multi"))
    .assert()
    .success();

  let spec = load_yaml(&env, "multi/component.yaml");
  assert_eq!(spec["name"].as_str(), Some("Count"));
  assert_eq!(spec["outputs"][0]["name"].as_str(), Some("Output"));
  assert_eq!(spec["outputs"][0]["type"].as_str(), Some("Integer"));
}

#[test]
fn verbose_logs_to_stderr() {
  let env = TestEnv::new();
  new_function_component(&env, "filter");

  env
    .oasis_cmd()
    .args(["--verbose", "components", "regenerate", "python-function-component"])
    .args(["--container-image", "python:3.12", "--directory"])
    .arg(env.path().join("filter"))
    .assert()
    .success()
    .stderr(predicate::str::contains("wrote component spec"));
}
