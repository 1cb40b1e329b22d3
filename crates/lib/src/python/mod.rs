//! Static inspection of Python component modules.
//!
//! Modules are never imported or executed. The source is split into logical
//! lines and only the top level is interpreted: `def`/`async def` statements
//! become [`FunctionDescriptor`]s and `NamedTuple` declarations become
//! [`NamedTupleDescriptor`]s. Everything else is ignored.
//!
//! A `def` whose header can't be read doesn't fail the module; it is kept
//! as an [`UnreadableFunction`] so the error surfaces only if it is needed.

pub mod discovery;
pub mod docstring;
pub mod function;
pub mod pyproject;
pub mod scanner;
pub mod version;

use thiserror::Error;
use tracing::debug;

pub use discovery::{Discovery, discover};
pub use function::{FunctionDescriptor, NamedTupleDescriptor, Parameter, ParameterIo, ParameterKind, is_literal};
pub use pyproject::{ManifestError, dependencies_from_pyproject};
pub use version::PythonVersion;

/// Source that could not be split into statements.
///
/// Line numbers are 1-based.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
  #[error("unterminated string literal starting on line {line}")]
  UnterminatedString { line: usize },

  #[error("unexpected '{bracket}' on line {line}")]
  UnbalancedBracket { line: usize, bracket: char },

  #[error("'{bracket}' opened on line {line} is never closed")]
  UnclosedBracket { line: usize, bracket: char },

  #[error("malformed function definition on line {line}")]
  MalformedDef { line: usize },
}

/// A top-level function whose header could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableFunction {
  pub name: String,
  pub error: ScanError,
}

/// Top-level definitions found in a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDescriptor {
  /// Functions in source order. A redefined name keeps only the last definition.
  pub functions: Vec<FunctionDescriptor>,
  pub unreadable: Vec<UnreadableFunction>,
  pub named_tuples: Vec<NamedTupleDescriptor>,
}

impl ModuleDescriptor {
  pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn unreadable_function(&self, name: &str) -> Option<&UnreadableFunction> {
    self.unreadable.iter().find(|f| f.name == name)
  }

  fn forget_function(&mut self, name: &str) {
    self.functions.retain(|f| f.name != name);
    self.unreadable.retain(|f| f.name != name);
  }

  pub fn named_tuple(&self, name: &str) -> Option<&NamedTupleDescriptor> {
    self.named_tuples.iter().find(|t| t.name == name)
  }

  pub fn function_names(&self) -> Vec<&str> {
    self.functions.iter().map(|f| f.name.as_str()).collect()
  }
}

/// Describe the top-level functions and `NamedTuple`s of `source`.
pub fn describe_module(source: &str) -> Result<ModuleDescriptor, ScanError> {
  let lines = scanner::logical_lines(source)?;
  let physical: Vec<&str> = source.lines().collect();
  let mut module = ModuleDescriptor::default();

  let mut index = 0;
  while index < lines.len() {
    let line = &lines[index];
    // Block extent: following logical lines indented deeper than this one.
    let block_end = lines[index + 1..]
      .iter()
      .position(|next| next.indent <= line.indent)
      .map_or(lines.len(), |offset| index + 1 + offset);

    if line.indent == 0 {
      if function::is_def(&line.code) {
        match function::parse_function(line, &lines[index + 1..block_end], &physical) {
          Ok(descriptor) => {
            debug!(name = %descriptor.name, line = descriptor.line, "found function");
            module.forget_function(&descriptor.name);
            module.functions.push(descriptor);
          }
          Err(error) => {
            let Some(name) = function::def_name(&line.code) else {
              return Err(error);
            };
            debug!(name, %error, "skipping unreadable function");
            module.forget_function(name);
            module.unreadable.push(UnreadableFunction {
              name: name.to_string(),
              error,
            });
          }
        }
      } else if let Some(named_tuple) = function::parse_named_tuple(line, &lines[index + 1..block_end]) {
        debug!(name = %named_tuple.name, "found NamedTuple");
        module.named_tuples.retain(|t| t.name != named_tuple.name);
        module.named_tuples.push(named_tuple);
      }
    }

    index = block_end;
  }

  Ok(module)
}
