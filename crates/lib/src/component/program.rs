//! The Python program a generated component runs in its container.
//!
//! The program holds the function itself (annotations stripped, body as
//! written) followed by an argparse launcher that maps command-line flags to
//! parameters and writes return values to the `----output-paths` files.

use super::RegenerateError;
use super::spec::{Argument, Port, ReturnField, SINGLE_OUTPUT_NAME, base_type};
use crate::python::{FunctionDescriptor, ParameterKind};

/// Writes the program passed as `$0` to a temp file and runs it with the remaining arguments.
const LAUNCHER: &str = "program_path=$(mktemp)\nprintf \"%s\" \"$0\" > \"$program_path\"\npython3 -u \"$program_path\" \"$@\"\n";

const PIP_INSTALL: &str = "PIP_DISABLE_PIP_VERSION_CHECK=1 python3 -m pip install --quiet --no-warn-script-location";

const MAKE_PARENT_DIRS: &str = r#"def _make_parent_dirs_and_return_path(file_path: str):
    import os
    os.makedirs(os.path.dirname(file_path), exist_ok=True)
    return file_path
"#;

const DESERIALIZE_BOOL: &str = r#"def _deserialize_bool(s) -> bool:
    if s.lower() in ("true", "1", "yes", "y", "on"):
        return True
    if s.lower() in ("false", "0", "no", "n", "off"):
        return False
    raise ValueError('Cannot convert "{}" to bool.'.format(s))
"#;

const DESERIALIZE_JSON: &str = r#"def _deserialize_json(s):
    import json
    return json.loads(s)
"#;

const SERIALIZE_JSON: &str = r#"def _serialize_json(obj) -> str:
    if isinstance(obj, str):
        return obj
    import json
    return json.dumps(obj)
"#;

const WRITE_OUTPUTS: &str = r#"import os
for idx, output_file in enumerate(_output_files):
    try:
        os.makedirs(os.path.dirname(output_file))
    except OSError:
        pass
    with open(output_file, 'w') as f:
        f.write(_output_serializers[idx](_outputs[idx]))
"#;

fn is_json(annotation: Option<&str>) -> bool {
  annotation.is_some_and(|a| matches!(base_type(a), "list" | "List" | "dict" | "Dict"))
}

/// argparse `type=` for a value parameter.
fn parser_type(annotation: Option<&str>) -> &'static str {
  match annotation.map(base_type) {
    Some("int") => "int",
    Some("float") => "float",
    Some("bool") => "_deserialize_bool",
    Some("list" | "List" | "dict" | "Dict") => "_deserialize_json",
    _ => "str",
  }
}

/// A Python string literal for `text`. JSON string syntax is valid Python.
fn python_string(text: &str) -> String {
  serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn flag(name: &str) -> String {
  format!("--{}", name.replace('_', "-"))
}

/// `def name(a, b=1, *, c=None):` with annotations removed.
fn header(function: &FunctionDescriptor) -> String {
  let mut parameters = Vec::new();
  let mut keyword_only = false;
  for parameter in &function.parameters {
    if parameter.kind == ParameterKind::KeywordOnly && !keyword_only {
      parameters.push("*".to_string());
      keyword_only = true;
    }
    match &parameter.default {
      Some(default) => parameters.push(format!("{}={}", parameter.name, default)),
      None => parameters.push(parameter.name.clone()),
    }
  }
  format!("def {}({}):", function.name, parameters.join(", "))
}

/// Full source of the program.
pub(crate) fn generate(
  function: &FunctionDescriptor,
  name: &str,
  description: Option<&str>,
  ports: &[Port],
  returns: &[ReturnField],
) -> String {
  let value_types: Vec<Option<&str>> = ports
    .iter()
    .filter_map(|port| match port {
      Port::Value { annotation, .. } => Some(annotation.as_deref()),
      _ => None,
    })
    .collect();

  let mut sections: Vec<String> = Vec::new();
  if ports.iter().any(|p| matches!(p, Port::OutputPath { .. })) {
    sections.push(MAKE_PARENT_DIRS.to_string());
  }
  if value_types.iter().any(|t| t.map(base_type) == Some("bool")) {
    sections.push(DESERIALIZE_BOOL.to_string());
  }
  if value_types.iter().any(|t| is_json(*t)) {
    sections.push(DESERIALIZE_JSON.to_string());
  }
  if returns.iter().any(|r| is_json(r.annotation.as_deref())) {
    sections.push(SERIALIZE_JSON.to_string());
  }
  sections.push(format!("{}\n{}\n", header(function), function.body.trim_end()));

  let mut launcher = String::from("import argparse\n");
  launcher.push_str(&format!(
    "_parser = argparse.ArgumentParser(prog={}, description={})\n",
    python_string(name),
    python_string(description.unwrap_or_default())
  ));
  for port in ports {
    let (flag_name, parameter, type_name, required) = match port {
      Port::Value {
        parameter,
        input,
        annotation,
        optional,
      } => (input, parameter, parser_type(annotation.as_deref()), !optional),
      Port::InputPath {
        parameter,
        input,
        optional,
      } => (input, parameter, "str", !optional),
      Port::OutputPath { parameter, output } => (output, parameter, "_make_parent_dirs_and_return_path", true),
    };
    launcher.push_str(&format!(
      "_parser.add_argument({}, dest={}, type={}, required={}, default=argparse.SUPPRESS)\n",
      python_string(&flag(flag_name)),
      python_string(parameter),
      type_name,
      if required { "True" } else { "False" }
    ));
  }
  if !returns.is_empty() {
    launcher.push_str(&format!(
      "_parser.add_argument(\"----output-paths\", dest=\"_output_paths\", type=str, nargs={})\n",
      returns.len()
    ));
  }
  launcher.push_str("_parsed_args = vars(_parser.parse_args())\n");
  if !returns.is_empty() {
    launcher.push_str("_output_files = _parsed_args.pop(\"_output_paths\", [])\n");
  }
  launcher.push_str(&format!("\n_outputs = {}(**_parsed_args)\n", function.name));

  if !returns.is_empty() {
    if matches!(returns, [only] if only.name == SINGLE_OUTPUT_NAME) {
      launcher.push_str("\n_outputs = [_outputs]\n");
    }
    launcher.push_str("\n_output_serializers = [\n");
    for field in returns {
      let serializer = if is_json(field.annotation.as_deref()) {
        "_serialize_json"
      } else {
        "str"
      };
      launcher.push_str(&format!("    {},\n", serializer));
    }
    launcher.push_str("]\n\n");
    launcher.push_str(WRITE_OUTPUTS);
  }
  sections.push(launcher);

  sections.join("\n")
}

/// Container command: optional `pip install`, then the launcher running `program`.
pub(crate) fn command(dependencies: &[String], program: String) -> Result<Vec<Argument>, RegenerateError> {
  let mut command = Vec::new();

  if !dependencies.is_empty() {
    let packages = dependencies
      .iter()
      .map(|dependency| {
        shlex::try_quote(dependency)
          .map(|quoted| quoted.into_owned())
          .map_err(|_| RegenerateError::InvalidDependency {
            dependency: dependency.clone(),
          })
      })
      .collect::<Result<Vec<_>, _>>()?;
    let install = format!("{} {}", PIP_INSTALL, packages.join(" "));
    command.push(Argument::Literal("sh".to_string()));
    command.push(Argument::Literal("-c".to_string()));
    command.push(Argument::Literal(format!(
      "({install} || {install} --user) && \"$0\" \"$@\""
    )));
  }

  command.push(Argument::Literal("sh".to_string()));
  command.push(Argument::Literal("-ec".to_string()));
  command.push(Argument::Literal(LAUNCHER.to_string()));
  command.push(Argument::Literal(program));
  Ok(command)
}

/// Container args matching the launcher's flags.
pub(crate) fn arguments(ports: &[Port], returns: &[ReturnField]) -> Vec<Argument> {
  let mut args = Vec::new();

  for port in ports {
    let (name, value, optional) = match port {
      Port::Value { input, optional, .. } => (input, Argument::InputValue(input.clone()), *optional),
      Port::InputPath { input, optional, .. } => (input, Argument::InputPath(input.clone()), *optional),
      Port::OutputPath { output, .. } => (output, Argument::OutputPath(output.clone()), false),
    };
    let pair = vec![Argument::Literal(flag(name)), value];

    if optional {
      args.push(Argument::IfPresent {
        input: name.clone(),
        then: pair,
      });
    } else {
      args.extend(pair);
    }
  }

  if !returns.is_empty() {
    args.push(Argument::Literal("----output-paths".to_string()));
    args.extend(returns.iter().map(|field| Argument::OutputPath(field.name.clone())));
  }

  args
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::component::spec::{ports, return_fields};
  use crate::python::describe_module;

  const TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/components/python-function-component/component.py"
  ));

  fn template_parts() -> (FunctionDescriptor, Vec<Port>, Vec<ReturnField>) {
    let module = describe_module(TEMPLATE).unwrap();
    let function = module.function("filter_text").unwrap().clone();
    let ports = ports(&function).unwrap();
    let returns = return_fields(&function, &module);
    (function, ports, returns)
  }

  #[test]
  fn header_strips_annotations() {
    let (function, _, _) = template_parts();
    assert_eq!(header(&function), "def filter_text(text_path, filtered_text_path, pattern=\".*\"):");

    let module = describe_module("def f(a: int, *, b: str = 'x'):\n    pass\n").unwrap();
    assert_eq!(header(&module.functions[0]), "def f(a, *, b='x'):");
  }

  #[test]
  fn program_for_template() {
    let (function, ports, returns) = template_parts();
    let program = generate(&function, "Filter text", Some("Filters text."), &ports, &returns);

    assert!(program.starts_with("def _make_parent_dirs_and_return_path"));
    assert!(program.contains("    return (source_line_count, result_line_count)\n"));
    assert!(program.contains(
      "_parser.add_argument(\"--text\", dest=\"text_path\", type=str, required=True, default=argparse.SUPPRESS)"
    ));
    assert!(program.contains(
      "_parser.add_argument(\"--pattern\", dest=\"pattern\", type=str, required=False, default=argparse.SUPPRESS)"
    ));
    assert!(program.contains("dest=\"filtered_text_path\", type=_make_parent_dirs_and_return_path, required=True"));
    assert!(program.contains("nargs=2"));
    assert!(!program.contains("_outputs = [_outputs]"));
  }

  #[test]
  fn single_output_is_wrapped() {
    let module = describe_module("def total(values: list) -> dict:\n    return {}\n").unwrap();
    let function = &module.functions[0];
    let ports = ports(function).unwrap();
    let returns = return_fields(function, &module);
    let program = generate(function, "Total", None, &ports, &returns);

    assert!(program.contains("_outputs = [_outputs]"));
    assert!(program.contains("type=_deserialize_json"));
    assert!(program.contains("    _serialize_json,\n"));
    assert!(!program.contains("_make_parent_dirs_and_return_path"));
  }

  #[test]
  fn args_for_template() {
    let (_, ports, returns) = template_parts();
    let args = arguments(&ports, &returns);

    assert_eq!(
      args,
      vec![
        Argument::Literal("--text".to_string()),
        Argument::InputPath("text".to_string()),
        Argument::Literal("--filtered-text".to_string()),
        Argument::OutputPath("filtered_text".to_string()),
        Argument::IfPresent {
          input: "pattern".to_string(),
          then: vec![
            Argument::Literal("--pattern".to_string()),
            Argument::InputValue("pattern".to_string()),
          ],
        },
        Argument::Literal("----output-paths".to_string()),
        Argument::OutputPath("source_line_count".to_string()),
        Argument::OutputPath("result_line_count".to_string()),
      ]
    );
  }

  #[test]
  fn command_installs_dependencies_first() {
    let command = command(&["requests>=2".to_string(), "it's".to_string()], "print(1)".to_string()).unwrap();
    assert_eq!(command.len(), 7);
    assert_eq!(command[0], Argument::Literal("sh".to_string()));
    let Argument::Literal(install) = &command[2] else {
      panic!("expected literal");
    };
    assert!(install.starts_with("(PIP_DISABLE_PIP_VERSION_CHECK=1 python3 -m pip install"));
    assert!(install.contains("'requests>=2'"));
    let words = shlex::split(install).unwrap();
    assert!(words.iter().any(|w| w == "requests>=2"));
    assert!(words.iter().any(|w| w == "it's"));
    assert!(install.ends_with("--user) && \"$0\" \"$@\""));
    assert_eq!(command[6], Argument::Literal("print(1)".to_string()));
  }

  #[test]
  fn command_without_dependencies() {
    let command = command(&[], "print(1)".to_string()).unwrap();
    assert_eq!(command.len(), 4);
    assert_eq!(command[1], Argument::Literal("-ec".to_string()));
  }
}
