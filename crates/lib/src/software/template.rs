//! Variable templates used inside software definitions.
//!
//! Definition strings (source URLs, relative paths, build commands) may
//! reference variables that are only known once a target platform, install
//! directory and version have been chosen.
//!
//! # Format
//!
//! - `%{name}` - the value of variable `name`
//!
//! Variable names consist of ASCII letters, digits and `_`.
//!
//! # Shell Text
//!
//! A lone `%` passes through unchanged, so `printf '%s'` or `%PATH%` work
//! without escaping.
//!
//! # Escaping
//!
//! Use `%%{` to produce a literal `%{`.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use softdef_lib::software::template::substitute;
//!
//! let vars = BTreeMap::from([("version".to_string(), "40.9.0".to_string())]);
//! let url = substitute("https://github.com/pypa/setuptools/archive/v%{version}.tar.gz", &vars).unwrap();
//! assert_eq!(url, "https://github.com/pypa/setuptools/archive/v40.9.0.tar.gz");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no variables)
  Literal(String),

  /// A variable reference to be resolved
  Var(String),
}

/// Errors that can occur during template parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed variable reference at position {0}")]
  Unclosed(usize),

  #[error("invalid variable name: '{0}'")]
  InvalidName(String),

  #[error("undefined variable: {0}")]
  Undefined(String),
}

/// Looks up variable values during substitution.
pub trait Resolver {
  fn resolve_var(&self, name: &str) -> Result<&str, TemplateError>;
}

impl Resolver for BTreeMap<String, String> {
  fn resolve_var(&self, name: &str) -> Result<&str, TemplateError> {
    self
      .get(name)
      .map(|s| s.as_str())
      .ok_or_else(|| TemplateError::Undefined(name.to_string()))
  }
}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a template into segments.
///
/// # Errors
///
/// Returns an error for unclosed references and invalid variable names.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '%' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '%')) => {
        chars.next();
        if let Some((_, '{')) = chars.peek() {
          // %%{ -> %{
          chars.next();
          literal.push_str("%{");
        } else {
          literal.push_str("%%");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(TemplateError::Unclosed(pos));
        }
        if !is_valid_name(&name) {
          return Err(TemplateError::InvalidName(name));
        }

        segments.push(Segment::Var(name));
      }
      _ => literal.push('%'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Substitute all variables in a string using the provided resolver.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, TemplateError> {
  let segments = parse(input)?;
  let mut result = String::with_capacity(input.len());

  for segment in &segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Var(name) => result.push_str(resolver.resolve_var(name)?),
    }
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn parse_plain_text() {
    assert_eq!(
      parse("setup.py install").unwrap(),
      vec![Segment::Literal("setup.py install".to_string())]
    );
  }

  #[test]
  fn parse_mixed_segments() {
    assert_eq!(
      parse("setuptools-%{version}/src").unwrap(),
      vec![
        Segment::Literal("setuptools-".to_string()),
        Segment::Var("version".to_string()),
        Segment::Literal("/src".to_string()),
      ]
    );
  }

  #[test]
  fn lone_percent_passes_through() {
    let result = substitute("printf '%s' %PATH%", &vars(&[])).unwrap();
    assert_eq!(result, "printf '%s' %PATH%");
  }

  #[test]
  fn escaped_reference_is_literal() {
    let result = substitute("echo %%{version} %{version}", &vars(&[("version", "1.0")])).unwrap();
    assert_eq!(result, "echo %{version} 1.0");
  }

  #[test]
  fn double_percent_without_brace_is_kept() {
    let result = substitute("100%% done", &vars(&[])).unwrap();
    assert_eq!(result, "100%% done");
  }

  #[test]
  fn unclosed_reference_is_error() {
    assert_eq!(parse("v%{version"), Err(TemplateError::Unclosed(1)));
  }

  #[test]
  fn invalid_name_is_error() {
    assert_eq!(parse("%{}"), Err(TemplateError::InvalidName(String::new())));
    assert_eq!(
      parse("%{install dir}"),
      Err(TemplateError::InvalidName("install dir".to_string()))
    );
  }

  #[test]
  fn undefined_variable_is_error() {
    assert_eq!(
      substitute("%{python_bin} bootstrap.py", &vars(&[])),
      Err(TemplateError::Undefined("python_bin".to_string()))
    );
  }

  #[test]
  fn windows_paths_survive_substitution() {
    let result = substitute(
      "%{python3_embedded}\\python.exe",
      &vars(&[("python3_embedded", "C:\\opt\\agent\\embedded3")]),
    )
    .unwrap();
    assert_eq!(result, "C:\\opt\\agent\\embedded3\\python.exe");
  }
}
