//! Function and `NamedTuple` descriptors built from logical lines.

use super::ScanError;
use super::scanner::{self, LogicalLine};

/// A top-level `def` or `async def`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
  pub name: String,
  pub is_async: bool,
  /// 1-based line of the `def` keyword
  pub line: usize,
  pub parameters: Vec<Parameter>,
  /// Return annotation source, e.g. `Outputs` or `int`. A string annotation is unquoted.
  pub returns: Option<String>,
  pub docstring: Option<String>,
  /// Body source as written, including its indentation and docstring
  pub body: String,
}

impl FunctionDescriptor {
  pub fn arity(&self) -> usize {
    self.parameters.len()
  }

  pub fn is_public(&self) -> bool {
    !self.name.starts_with('_')
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
  Positional,
  KeywordOnly,
  /// `*args`
  VarPositional,
  /// `**kwargs`
  VarKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
  pub name: String,
  pub kind: ParameterKind,
  /// Annotation source, e.g. `str` or `components.InputPath("CSV")`. A string annotation is unquoted.
  pub annotation: Option<String>,
  /// Default value source, e.g. `".*"` or `None`
  pub default: Option<String>,
}

/// How a parameter exchanges data with the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterIo {
  /// Receives a local path to read the input from
  InputPath { type_name: Option<String> },
  /// Receives a local path to write the output to
  OutputPath { type_name: Option<String> },
  /// Receives the value itself
  Value,
}

impl Parameter {
  /// Classify the parameter by its `InputPath(...)`/`OutputPath(...)` annotation.
  pub fn io(&self) -> ParameterIo {
    let Some(annotation) = self.annotation.as_deref().map(str::trim) else {
      return ParameterIo::Value;
    };

    let (callee, arguments) = match annotation.find('(') {
      Some(open) => {
        let arguments = scanner::matching_close(annotation, open).map(|close| &annotation[open + 1..close - 1]);
        (&annotation[..open], arguments)
      }
      None => (annotation, None),
    };
    let marker = callee.trim().rsplit('.').next().unwrap_or_default();
    let type_name = arguments.and_then(path_type_argument);

    match marker {
      "InputPath" => ParameterIo::InputPath { type_name },
      "OutputPath" => ParameterIo::OutputPath { type_name },
      _ => ParameterIo::Value,
    }
  }
}

/// First positional or `type=` argument of `InputPath(...)`.
fn path_type_argument(arguments: &str) -> Option<String> {
  let first = scanner::split_top_level(arguments, ',').into_iter().next()?;
  let first = first.trim();
  let first = first.strip_prefix("type=").map_or(first, str::trim);
  if first.is_empty() || first == "None" {
    return None;
  }
  Some(scanner::string_literal_value(first).unwrap_or_else(|| first.to_string()))
}

/// A `NamedTuple` declared with class syntax or the functional form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTupleDescriptor {
  pub name: String,
  /// Field names with their type annotation source
  pub fields: Vec<(String, Option<String>)>,
}

pub(crate) fn is_def(code: &str) -> bool {
  code.starts_with("def ") || code.strip_prefix("async").is_some_and(|rest| rest.trim_start().starts_with("def "))
}

fn identifier(text: &str) -> &str {
  let end = text
    .char_indices()
    .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
    .map_or(text.len(), |(i, _)| i);
  &text[..end]
}

fn is_identifier(text: &str) -> bool {
  !text.is_empty() && identifier(text) == text && !text.starts_with(|c: char| c.is_ascii_digit())
}

/// Annotation text with a forward reference such as `'Outputs'` unquoted.
fn annotation_text(raw: &str) -> String {
  let raw = raw.trim();
  match scanner::string_literal_value(raw) {
    Some(quoted) => quoted.trim().to_string(),
    None => raw.to_string(),
  }
}

/// Name declared by a `def`/`async def` header, if it can be read.
pub(crate) fn def_name(code: &str) -> Option<&str> {
  let rest = code.strip_prefix("async").map_or(code, str::trim_start);
  let name = identifier(rest.strip_prefix("def")?.trim_start());
  is_identifier(name).then_some(name)
}

/// Whether `text` is a literal that evaluates the same without the module's globals.
///
/// Accepts numbers, strings, `True`/`False`/`None` and list, tuple, set or
/// dict displays made of those.
pub fn is_literal(text: &str) -> bool {
  let text = text.trim();
  if matches!(text, "None" | "True" | "False") || is_number(text) || scanner::string_literal_value(text).is_some() {
    return true;
  }

  let Some(open) = text.chars().next().filter(|c| matches!(c, '[' | '(' | '{')) else {
    return false;
  };
  if scanner::matching_close(text, 0) != Some(text.len()) {
    return false;
  }
  scanner::split_top_level(&text[1..text.len() - 1], ',')
    .iter()
    .map(|item| item.trim())
    .filter(|item| !item.is_empty())
    .all(|item| match scanner::find_top_level(item, ':') {
      Some(colon) if open == '{' => is_literal(&item[..colon]) && is_literal(&item[colon + 1..]),
      _ => is_literal(item),
    })
}

fn is_number(text: &str) -> bool {
  let digits = text.strip_prefix(['-', '+']).unwrap_or(text).replace('_', "");
  let lower = digits.to_ascii_lowercase();
  for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
    if let Some(rest) = lower.strip_prefix(prefix) {
      return !rest.is_empty() && u128::from_str_radix(rest, radix).is_ok();
    }
  }
  digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
    && digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    && digits.parse::<f64>().is_ok()
}

/// Build a descriptor from a `def` header and the logical lines of its body.
pub(crate) fn parse_function(
  header: &LogicalLine,
  body: &[LogicalLine],
  physical: &[&str],
) -> Result<FunctionDescriptor, ScanError> {
  let malformed = || ScanError::MalformedDef {
    line: header.start_line + 1,
  };

  let code = header.code.as_str();
  let is_async = code.starts_with("async");
  let name = def_name(code).ok_or_else(malformed)?;
  let rest = code.strip_prefix("async").map_or(code, str::trim_start);
  let rest = rest.strip_prefix("def").ok_or_else(malformed)?.trim_start();

  let mut signature = rest[name.len()..].trim_start();
  // PEP 695 type parameters: `def first[T](items: list[T]) -> T:`
  if signature.starts_with('[') {
    let close = scanner::matching_close(signature, 0).ok_or_else(malformed)?;
    signature = signature[close..].trim_start();
  }
  if !signature.starts_with('(') {
    return Err(malformed());
  }
  let close = scanner::matching_close(signature, 0).ok_or_else(malformed)?;
  let parameters = parse_parameters(&signature[1..close - 1]).ok_or_else(malformed)?;

  let tail = signature[close..].trim_start();
  let (returns, after_colon) = match tail.strip_prefix("->") {
    Some(annotation) => {
      let colon = scanner::find_top_level(annotation, ':').ok_or_else(malformed)?;
      let returns = annotation[..colon].trim();
      if returns.is_empty() {
        return Err(malformed());
      }
      (Some(annotation_text(returns)), &annotation[colon + 1..])
    }
    None => (None, tail.strip_prefix(':').ok_or_else(malformed)?),
  };
  let inline_body = after_colon.trim();

  let (body_text, docstring) = match (body.first(), body.last()) {
    (Some(first), Some(last)) => {
      let end = (last.end_line + 1).min(physical.len());
      let text = physical.get(first.start_line..end).ok_or_else(malformed)?.join("\n");
      (text, scanner::string_literal_value(&first.code))
    }
    _ if !inline_body.is_empty() => (format!("    {}", inline_body), None),
    _ => return Err(malformed()),
  };

  Ok(FunctionDescriptor {
    name: name.to_string(),
    is_async,
    line: header.start_line + 1,
    parameters,
    returns,
    docstring,
    body: body_text,
  })
}

fn parse_parameters(text: &str) -> Option<Vec<Parameter>> {
  let mut parameters = Vec::new();
  let mut keyword_only = false;

  for raw in scanner::split_top_level(text, ',') {
    let raw = raw.trim();
    if raw.is_empty() || raw == "/" {
      continue;
    }
    if raw == "*" {
      keyword_only = true;
      continue;
    }

    let (kind, raw) = if let Some(rest) = raw.strip_prefix("**") {
      (ParameterKind::VarKeyword, rest)
    } else if let Some(rest) = raw.strip_prefix('*') {
      keyword_only = true;
      (ParameterKind::VarPositional, rest)
    } else if keyword_only {
      (ParameterKind::KeywordOnly, raw)
    } else {
      (ParameterKind::Positional, raw)
    };

    let (head, default) = match scanner::find_top_level(raw, '=') {
      Some(eq) => (&raw[..eq], Some(raw[eq + 1..].trim().to_string())),
      None => (raw, None),
    };
    let (name, annotation) = match scanner::find_top_level(head, ':') {
      Some(colon) => (head[..colon].trim(), Some(head[colon + 1..].trim().to_string())),
      None => (head.trim(), None),
    };
    if !is_identifier(name) {
      return None;
    }

    parameters.push(Parameter {
      name: name.to_string(),
      kind,
      annotation: annotation.filter(|a| !a.is_empty()).map(|a| annotation_text(&a)),
      default,
    });
  }

  Some(parameters)
}

/// Recognise `class X(NamedTuple): ...` or `X = NamedTuple("X", [...])`.
pub(crate) fn parse_named_tuple(header: &LogicalLine, body: &[LogicalLine]) -> Option<NamedTupleDescriptor> {
  let code = header.code.as_str();

  if let Some(rest) = code.strip_prefix("class ") {
    let rest = rest.trim_start();
    let name = identifier(rest);
    let bases = rest[name.len()..].trim_start();
    if !is_identifier(name) || !bases.starts_with('(') {
      return None;
    }
    let close = scanner::matching_close(bases, 0)?;
    let is_named_tuple = scanner::split_top_level(&bases[1..close - 1], ',')
      .iter()
      .any(|base| base.trim().rsplit('.').next() == Some("NamedTuple"));
    if !is_named_tuple {
      return None;
    }

    let field_indent = body.first()?.indent;
    let fields = body
      .iter()
      .filter(|line| line.indent == field_indent)
      .filter_map(|line| {
        let colon = scanner::find_top_level(&line.code, ':')?;
        let field = line.code[..colon].trim();
        if !is_identifier(field) || is_def(&line.code) {
          return None;
        }
        let annotation = &line.code[colon + 1..];
        let annotation = match scanner::find_top_level(annotation, '=') {
          Some(eq) => &annotation[..eq],
          None => annotation,
        };
        Some((field.to_string(), Some(annotation_text(annotation))))
      })
      .collect();

    return Some(NamedTupleDescriptor {
      name: name.to_string(),
      fields,
    });
  }

  let eq = scanner::find_top_level(code, '=')?;
  let target = code[..eq].trim();
  if !is_identifier(target) {
    return None;
  }
  let mut descriptor = inline_named_tuple(&code[eq + 1..])?;
  descriptor.name = target.to_string();
  Some(descriptor)
}

/// Parse the functional form `NamedTuple("Name", [("field", type), ...])`.
pub fn inline_named_tuple(text: &str) -> Option<NamedTupleDescriptor> {
  let text = text.trim();
  let open = text.find('(')?;
  if text[..open].trim().rsplit('.').next() != Some("NamedTuple") {
    return None;
  }
  let close = scanner::matching_close(text, open)?;
  if close != text.len() {
    return None;
  }

  let arguments = scanner::split_top_level(&text[open + 1..close - 1], ',');
  let name = scanner::string_literal_value(arguments.first()?)?;
  let items = arguments.get(1)?.trim();
  let items = items
    .strip_prefix('[')
    .and_then(|s| s.strip_suffix(']'))
    .or_else(|| items.strip_prefix('(').and_then(|s| s.strip_suffix(')')))?;

  let mut fields = Vec::new();
  for item in scanner::split_top_level(items, ',') {
    let item = item.trim();
    if item.is_empty() {
      continue;
    }
    let pair = item.strip_prefix('(')?.strip_suffix(')')?;
    let parts = scanner::split_top_level(pair, ',');
    let field = scanner::string_literal_value(parts.first()?)?;
    let type_name = parts.get(1).map(|t| {
      let t = t.trim();
      scanner::string_literal_value(t).unwrap_or_else(|| t.to_string())
    });
    fields.push((field, type_name));
  }

  Some(NamedTupleDescriptor { name, fields })
}
