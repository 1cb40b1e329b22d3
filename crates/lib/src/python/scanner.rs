//! Splits Python source into logical lines.
//!
//! Only as much of the lexical grammar is understood as is needed to find
//! statement boundaries: string literals (including triple-quoted and
//! prefixed ones), comments, bracket nesting and backslash continuations.

use super::ScanError;

/// A logical line: one statement header or simple statement, possibly
/// spanning several physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
  /// Column of the first character on its first physical line
  pub indent: usize,
  /// Zero-based index of the first physical line
  pub start_line: usize,
  /// Zero-based index of the last physical line
  pub end_line: usize,
  /// Source text with comments removed and continuations joined
  pub code: String,
}

pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, ScanError> {
  let chars: Vec<char> = source.chars().collect();
  let mut lines = Vec::new();

  let mut i = 0;
  let mut line = 0;
  let mut column = 0;
  let mut depth: Vec<(char, usize)> = Vec::new();
  let mut current: Option<LogicalLine> = None;

  while i < chars.len() {
    let c = chars[i];

    if current.is_none() {
      match c {
        ' ' | '\t' | '\r' | '\x0c' => {
          i += 1;
          column += 1;
          continue;
        }
        '\n' => {
          i += 1;
          line += 1;
          column = 0;
          continue;
        }
        '#' => {
          i = skip_comment(&chars, i);
          continue;
        }
        _ => {
          current = Some(LogicalLine {
            indent: column,
            start_line: line,
            end_line: line,
            code: String::new(),
          });
        }
      }
    }

    let Some(logical) = current.as_mut() else {
      continue;
    };

    match c {
      '#' => {
        i = skip_comment(&chars, i);
        continue;
      }
      '"' | '\'' => {
        let start_line = line;
        let end = string_end(&chars, i).ok_or(ScanError::UnterminatedString { line: start_line + 1 })?;
        for &ch in &chars[i..end] {
          logical.code.push(ch);
          if ch == '\n' {
            line += 1;
            column = 0;
          } else {
            column += 1;
          }
        }
        i = end;
        continue;
      }
      '\\' if chars.get(i + 1) == Some(&'\n') => {
        logical.code.push(' ');
        i += 2;
        line += 1;
        column = 0;
        continue;
      }
      '(' | '[' | '{' => depth.push((c, line)),
      ')' | ']' | '}' => match depth.pop() {
        Some((open, _)) if matches!((open, c), ('(', ')') | ('[', ']') | ('{', '}')) => {}
        _ => return Err(ScanError::UnbalancedBracket { line: line + 1, bracket: c }),
      },
      '\n' if depth.is_empty() => {
        logical.end_line = line;
        trim_end_in_place(&mut logical.code);
        if let Some(done) = current.take() {
          lines.push(done);
        }
        i += 1;
        line += 1;
        column = 0;
        continue;
      }
      _ => {}
    }

    logical.code.push(c);
    if c == '\n' {
      line += 1;
      column = 0;
    } else {
      column += 1;
    }
    i += 1;
  }

  if let Some((bracket, open_line)) = depth.pop() {
    return Err(ScanError::UnclosedBracket {
      line: open_line + 1,
      bracket,
    });
  }

  if let Some(mut logical) = current {
    logical.end_line = line;
    trim_end_in_place(&mut logical.code);
    lines.push(logical);
  }

  Ok(lines)
}

/// Index of the `\n` ending the comment that starts at `start` (or EOF).
fn skip_comment(chars: &[char], start: usize) -> usize {
  let mut i = start;
  while i < chars.len() && chars[i] != '\n' {
    i += 1;
  }
  i
}

/// Index one past the closing quote of the string literal opening at `start`.
pub(crate) fn string_end(chars: &[char], start: usize) -> Option<usize> {
  let quote = chars[start];
  let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
  let mut i = if triple { start + 3 } else { start + 1 };

  while i < chars.len() {
    let c = chars[i];
    if c == '\\' {
      i += 2;
      continue;
    }
    if triple {
      if c == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
        return Some(i + 3);
      }
    } else if c == quote {
      return Some(i + 1);
    } else if c == '\n' {
      return None;
    }
    i += 1;
  }
  None
}

fn trim_end_in_place(s: &mut String) {
  let trimmed = s.trim_end().len();
  s.truncate(trimmed);
}

/// Split `text` on `separator` where it appears outside strings and brackets.
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
  let chars: Vec<char> = text.chars().collect();
  let mut parts = Vec::new();
  let mut current = String::new();
  let mut depth = 0usize;
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];
    match c {
      '"' | '\'' => {
        let end = string_end(&chars, i).unwrap_or(chars.len());
        current.extend(&chars[i..end]);
        i = end;
        continue;
      }
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth = depth.saturating_sub(1),
      _ if c == separator && depth == 0 => {
        parts.push(std::mem::take(&mut current));
        i += 1;
        continue;
      }
      _ => {}
    }
    current.push(c);
    i += 1;
  }
  parts.push(current);
  parts
}

/// Byte offset of the first top-level `target` in `text`.
///
/// For `=` an occurrence that is part of `==`, `<=`, `>=` or `!=` is skipped.
pub fn find_top_level(text: &str, target: char) -> Option<usize> {
  let chars: Vec<(usize, char)> = text.char_indices().collect();
  let plain: Vec<char> = chars.iter().map(|&(_, c)| c).collect();
  let mut depth = 0usize;
  let mut i = 0;

  while i < chars.len() {
    let (offset, c) = chars[i];
    match c {
      '"' | '\'' => {
        i = string_end(&plain, i).unwrap_or(chars.len());
        continue;
      }
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth = depth.saturating_sub(1),
      _ if c == target && depth == 0 => {
        let part_of_operator = target == '='
          && (matches!(plain.get(i + 1), Some('='))
            || matches!(i.checked_sub(1).map(|p| plain[p]), Some('=' | '<' | '>' | '!')));
        if !part_of_operator {
          return Some(offset);
        }
      }
      _ => {}
    }
    i += 1;
  }
  None
}

/// Byte offset just past the bracket matching the one at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
  let chars: Vec<(usize, char)> = text.char_indices().collect();
  let plain: Vec<char> = chars.iter().map(|&(_, c)| c).collect();
  let start = chars.iter().position(|&(offset, _)| offset == open)?;
  let mut depth = 0usize;
  let mut i = start;

  while i < chars.len() {
    let (offset, c) = chars[i];
    match c {
      '"' | '\'' => {
        i = string_end(&plain, i)?;
        continue;
      }
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(offset + c.len_utf8());
        }
      }
      _ => {}
    }
    i += 1;
  }
  None
}

/// The value of a plain string literal such as `'abc'`, `"""doc"""` or `r"x"`.
///
/// Escapes are left as written. Returns `None` if `text` is not a single
/// string literal or is a bytes/f-string.
pub fn string_literal_value(text: &str) -> Option<String> {
  let text = text.trim();
  let prefix_len = text
    .chars()
    .take_while(|c| c.is_ascii_alphabetic())
    .count();
  if prefix_len > 2 {
    return None;
  }
  let prefix = text[..prefix_len].to_ascii_lowercase();
  if !matches!(prefix.as_str(), "" | "r" | "u") {
    return None;
  }

  let body: Vec<char> = text[prefix_len..].chars().collect();
  if body.is_empty() || !matches!(body[0], '"' | '\'') {
    return None;
  }
  let end = string_end(&body, 0)?;
  if end != body.len() {
    return None;
  }

  let quote_len = if body.len() >= 6 && body[1] == body[0] && body[2] == body[0] {
    3
  } else {
    1
  };
  Some(body[quote_len..body.len() - quote_len].iter().collect())
}
