//! The `component.yaml` model and its derivation from a function descriptor.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::RegenerateError;
use super::annotations::Annotations;
use super::program;
use crate::python::docstring::Docstring;
use crate::python::function::inline_named_tuple;
use crate::python::{FunctionDescriptor, ModuleDescriptor, ParameterIo, ParameterKind, is_literal};

/// Name of the single output of a function returning a plain value.
pub const SINGLE_OUTPUT_NAME: &str = "Output";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSpec {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub metadata: Metadata,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub inputs: Vec<InputSpec>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub outputs: Vec<OutputSpec>,
  pub implementation: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
  pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
  pub name: String,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub type_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSpec {
  pub name: String,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub type_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Implementation {
  pub container: ContainerImplementation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerImplementation {
  pub image: String,
  pub command: Vec<Argument>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub args: Vec<Argument>,
}

/// One element of a container command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
  Literal(String),
  InputValue(String),
  InputPath(String),
  OutputPath(String),
  /// Arguments passed only when the named input is provided
  IfPresent { input: String, then: Vec<Argument> },
}

impl Serialize for Argument {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    struct IsPresent<'a>(&'a str);
    impl Serialize for IsPresent<'_> {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("isPresent", self.0)?;
        map.end()
      }
    }

    struct Condition<'a>(&'a str, &'a [Argument]);
    impl Serialize for Condition<'_> {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("cond", &IsPresent(self.0))?;
        map.serialize_entry("then", self.1)?;
        map.end()
      }
    }

    let (key, name) = match self {
      Argument::Literal(text) => return serializer.serialize_str(text),
      Argument::InputValue(name) => ("inputValue", name),
      Argument::InputPath(name) => ("inputPath", name),
      Argument::OutputPath(name) => ("outputPath", name),
      Argument::IfPresent { input, then } => {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("if", &Condition(input, then))?;
        return map.end();
      }
    };
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, name)?;
    map.end()
  }
}

/// Python annotation reduced to its base name: `typing.List[int]` becomes `List`.
pub(crate) fn base_type(annotation: &str) -> &str {
  let annotation = annotation.trim();
  let annotation = annotation
    .strip_prefix("Optional[")
    .or_else(|| annotation.strip_prefix("typing.Optional["))
    .and_then(|inner| inner.strip_suffix(']'))
    .unwrap_or(annotation)
    .trim()
    .trim_matches(['\'', '"']);
  let head = annotation.split('[').next().unwrap_or(annotation).trim();
  head.strip_prefix("typing.").unwrap_or(head)
}

/// Component type name for a Python annotation.
pub fn component_type(annotation: &str) -> String {
  let base = base_type(annotation);
  match base {
    "str" => "String",
    "int" => "Integer",
    "float" => "Float",
    "bool" => "Boolean",
    "list" | "List" => "JsonArray",
    "dict" | "Dict" => "JsonObject",
    _ => base,
  }
  .to_string()
}

/// `filter_text` becomes `Filter text`.
pub fn component_name(function_name: &str) -> String {
  let words: Vec<&str> = function_name.split('_').filter(|w| !w.is_empty()).collect();
  let joined = words.join(" ");
  let mut chars = joined.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => function_name.to_string(),
  }
}

/// Component port name for a path parameter: a trailing `_path` or `_file` is dropped.
pub fn path_port_name(parameter: &str) -> &str {
  for suffix in ["_path", "_file"] {
    if let Some(stripped) = parameter.strip_suffix(suffix)
      && !stripped.is_empty()
    {
      return stripped;
    }
  }
  parameter
}

/// The value recorded as an input default, or `None` for a `None` default.
fn default_value(source: &str) -> Option<String> {
  let source = source.trim();
  if source == "None" {
    return None;
  }
  Some(crate::python::scanner::string_literal_value(source).unwrap_or_else(|| source.to_string()))
}

/// How a parameter or return field surfaces in the component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Port {
  /// Value input passed as `--flag <value>`
  Value {
    parameter: String,
    input: String,
    annotation: Option<String>,
    optional: bool,
  },
  InputPath { parameter: String, input: String, optional: bool },
  OutputPath { parameter: String, output: String },
}

/// A field of the function's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReturnField {
  pub name: String,
  pub annotation: Option<String>,
}

/// Map each parameter to a port, rejecting shapes that can't be called from a command line.
pub(crate) fn ports(function: &FunctionDescriptor) -> Result<Vec<Port>, RegenerateError> {
  if function.is_async {
    return Err(RegenerateError::AsyncFunction {
      function: function.name.clone(),
    });
  }

  function
    .parameters
    .iter()
    .map(|parameter| {
      if matches!(parameter.kind, ParameterKind::VarPositional | ParameterKind::VarKeyword) {
        return Err(RegenerateError::UnsupportedParameter {
          function: function.name.clone(),
          parameter: parameter.name.clone(),
        });
      }
      // The generated program doesn't carry the module's globals.
      if let Some(default) = parameter.default.as_deref().filter(|d| !is_literal(d)) {
        return Err(RegenerateError::UnsupportedDefault {
          function: function.name.clone(),
          parameter: parameter.name.clone(),
          default: default.to_string(),
        });
      }
      let optional = parameter.default.is_some();
      Ok(match parameter.io() {
        ParameterIo::InputPath { .. } => Port::InputPath {
          parameter: parameter.name.clone(),
          input: path_port_name(&parameter.name).to_string(),
          optional,
        },
        ParameterIo::OutputPath { .. } => Port::OutputPath {
          parameter: parameter.name.clone(),
          output: path_port_name(&parameter.name).to_string(),
        },
        ParameterIo::Value => Port::Value {
          parameter: parameter.name.clone(),
          input: parameter.name.clone(),
          annotation: parameter.annotation.clone(),
          optional,
        },
      })
    })
    .collect()
}

/// Outputs produced by the return value.
pub(crate) fn return_fields(function: &FunctionDescriptor, module: &ModuleDescriptor) -> Vec<ReturnField> {
  let Some(returns) = function.returns.as_deref().map(str::trim) else {
    return Vec::new();
  };
  if returns == "None" {
    return Vec::new();
  }

  let named_tuple = module
    .named_tuple(returns)
    .cloned()
    .or_else(|| inline_named_tuple(returns));
  match named_tuple {
    Some(named_tuple) => named_tuple
      .fields
      .into_iter()
      .map(|(name, annotation)| ReturnField { name, annotation })
      .collect(),
    None => vec![ReturnField {
      name: SINGLE_OUTPUT_NAME.to_string(),
      annotation: Some(returns.to_string()),
    }],
  }
}

/// Build the component spec for `function`.
pub fn build(
  function: &FunctionDescriptor,
  module: &ModuleDescriptor,
  image: &str,
  dependencies: &[String],
  annotations: Annotations,
) -> Result<ComponentSpec, RegenerateError> {
  let ports = ports(function)?;
  let returns = return_fields(function, module);
  let docstring = function.docstring.as_deref().map(Docstring::parse).unwrap_or_default();
  let describe = |parameter: &str| docstring.args.get(parameter).cloned();

  let mut inputs = Vec::new();
  let mut outputs = Vec::new();
  for port in &ports {
    match port {
      Port::Value {
        parameter,
        input,
        annotation,
        optional,
      } => {
        let source_default = function
          .parameters
          .iter()
          .find(|p| &p.name == parameter)
          .and_then(|p| p.default.as_deref());
        inputs.push(InputSpec {
          name: input.clone(),
          type_name: annotation.as_deref().map(component_type),
          description: describe(parameter),
          default: source_default.and_then(default_value),
          optional: *optional,
        });
      }
      Port::InputPath {
        parameter,
        input,
        optional,
      } => inputs.push(InputSpec {
        name: input.clone(),
        type_name: path_type(function, parameter),
        description: describe(parameter),
        default: None,
        optional: *optional,
      }),
      Port::OutputPath { parameter, output } => outputs.push(OutputSpec {
        name: output.clone(),
        type_name: path_type(function, parameter),
        description: describe(parameter),
      }),
    }
  }
  for field in &returns {
    outputs.push(OutputSpec {
      name: field.name.clone(),
      type_name: field.annotation.as_deref().map(component_type),
      description: None,
    });
  }

  let name = component_name(&function.name);
  let source = program::generate(function, &name, docstring.description.as_deref(), &ports, &returns);

  Ok(ComponentSpec {
    name,
    description: docstring.description.clone(),
    metadata: Metadata { annotations },
    inputs,
    outputs,
    implementation: Implementation {
      container: ContainerImplementation {
        image: image.to_string(),
        command: program::command(dependencies, source)?,
        args: program::arguments(&ports, &returns),
      },
    },
  })
}

fn path_type(function: &FunctionDescriptor, parameter: &str) -> Option<String> {
  let parameter = function.parameters.iter().find(|p| p.name == parameter)?;
  match parameter.io() {
    ParameterIo::InputPath { type_name } | ParameterIo::OutputPath { type_name } => {
      type_name.as_deref().map(component_type)
    }
    ParameterIo::Value => None,
  }
}
