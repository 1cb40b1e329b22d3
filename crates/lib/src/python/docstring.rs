//! Google-style docstring parsing.

use std::collections::BTreeMap;

/// A docstring split into its description and per-argument descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docstring {
  pub description: Option<String>,
  pub args: BTreeMap<String, String>,
}

const SECTION_HEADERS: &[&str] = &[
  "Args",
  "Arguments",
  "Parameters",
  "Returns",
  "Return",
  "Yields",
  "Raises",
  "Example",
  "Examples",
  "Note",
  "Notes",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
  Description,
  Args,
  Other,
}

impl Docstring {
  pub fn parse(raw: &str) -> Self {
    let text = clean(raw);
    let mut description = Vec::new();
    let mut args: BTreeMap<String, String> = BTreeMap::new();
    let mut section = Section::Description;
    let mut section_indent = 0;
    let mut entry_indent: Option<usize> = None;
    let mut current_arg: Option<String> = None;

    for line in text.lines() {
      let trimmed = line.trim();
      let indent = line.len() - line.trim_start().len();

      if let Some(header) = trimmed.strip_suffix(':')
        && SECTION_HEADERS.contains(&header)
      {
        section = if matches!(header, "Args" | "Arguments" | "Parameters") {
          Section::Args
        } else {
          Section::Other
        };
        section_indent = indent;
        entry_indent = None;
        current_arg = None;
        continue;
      }

      match section {
        Section::Description => description.push(line),
        Section::Args => {
          if trimmed.is_empty() {
            continue;
          }
          if indent <= section_indent {
            section = Section::Other;
            continue;
          }
          let entry_level = *entry_indent.get_or_insert(indent);
          if indent <= entry_level
            && let Some((name, desc)) = arg_entry(trimmed)
          {
            args.insert(name.clone(), desc);
            current_arg = Some(name);
          } else if let Some(existing) = current_arg.as_ref().and_then(|name| args.get_mut(name)) {
            if !existing.is_empty() {
              existing.push(' ');
            }
            existing.push_str(trimmed);
          }
        }
        Section::Other => {}
      }
    }

    let description = description.join("\n").trim().to_string();
    Self {
      description: (!description.is_empty()).then_some(description),
      args,
    }
  }
}

/// `name: description` or `name (type): description`.
fn arg_entry(line: &str) -> Option<(String, String)> {
  let (head, desc) = line.split_once(':')?;
  let name = head.split_once('(').map_or(head, |(name, _)| name).trim();
  if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
    return None;
  }
  Some((name.to_string(), desc.trim().to_string()))
}

/// Dedent a docstring the way `inspect.cleandoc` does.
pub fn clean(raw: &str) -> String {
  let mut lines: Vec<&str> = raw.lines().collect();
  if lines.is_empty() {
    return String::new();
  }

  let margin = lines[1..]
    .iter()
    .filter(|line| !line.trim().is_empty())
    .map(|line| line.len() - line.trim_start().len())
    .min()
    .unwrap_or(0);

  let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
  cleaned.push(lines.remove(0).trim().to_string());
  for line in lines {
    cleaned.push(line.get(margin..).unwrap_or("").trim_end().to_string());
  }

  while cleaned.first().is_some_and(|l| l.is_empty()) {
    cleaned.remove(0);
  }
  while cleaned.last().is_some_and(|l| l.is_empty()) {
    cleaned.pop();
  }
  cleaned.join("\n")
}
