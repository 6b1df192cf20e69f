//! Definitions shipped with the library.

use super::types::{DefinitionError, SoftwareDef};

const SETUPTOOLS3: &str = include_str!("../../software/setuptools3.toml");

const BUILTINS: &[&str] = &[SETUPTOOLS3];

/// setuptools for the embedded Python 3 runtime.
pub fn setuptools3() -> Result<SoftwareDef, DefinitionError> {
  SoftwareDef::from_toml_str(SETUPTOOLS3)
}

/// Parse all built-in definitions.
pub fn builtins() -> Result<Vec<SoftwareDef>, DefinitionError> {
  BUILTINS
    .iter()
    .map(|source| SoftwareDef::from_toml_str(source))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::Os;
  use crate::software::{BuildContext, ExtractMethod, resolve};

  mod setuptools3 {
    use super::*;

    #[test]
    fn declares_pinned_source() {
      let def = setuptools3().unwrap();
      assert_eq!(def.name, "setuptools3");
      assert_eq!(def.default_version, "40.9.0");
      assert_eq!(def.license, "PSFL");
      assert!(def.skip_transitive_dependency_licensing);
      assert_eq!(def.dependencies, vec!["python3".to_string()]);

      let source = def.source.unwrap();
      assert_eq!(
        source.sha256,
        "9ef6623c057d6e46ada8156bb48dc72ef6dbe721768720cc66966cca4097061c"
      );
      assert_eq!(source.extract, ExtractMethod::SevenZip);
    }

    #[test]
    fn windows_uses_embedded_python_exe() {
      let ctx = BuildContext::new(Os::Windows, "C:/opt/datadog-agent");
      let resolved = resolve(&setuptools3().unwrap(), &ctx).unwrap();

      let embedded = resolved.vars["python3_embedded"].clone();
      assert_eq!(embedded, "C:\\opt\\datadog-agent\\embedded3");
      assert!(resolved.vars["python_bin"].ends_with("\\python.exe"));
      assert_eq!(resolved.vars["python_prefix"], embedded);
      assert_eq!(
        resolved.steps[1].command,
        format!("{}\\python.exe setup.py install --prefix={}", embedded, embedded)
      );
    }

    #[test]
    fn other_platforms_use_embedded_bin_python3() {
      for os in [Os::Linux, Os::MacOs] {
        let ctx = BuildContext::new(os, "/opt/datadog-agent");
        let resolved = resolve(&setuptools3().unwrap(), &ctx).unwrap();

        assert_eq!(resolved.vars["python_bin"], "/opt/datadog-agent/embedded/bin/python3");
        assert_eq!(resolved.vars["python_prefix"], "/opt/datadog-agent/embedded");
      }
    }

    #[test]
    fn bootstrap_runs_before_install() {
      let ctx = BuildContext::new(Os::Linux, "/opt/datadog-agent");
      let resolved = resolve(&setuptools3().unwrap(), &ctx).unwrap();

      let commands: Vec<_> = resolved.steps.iter().map(|s| s.command.as_str()).collect();
      assert_eq!(
        commands,
        vec![
          "/opt/datadog-agent/embedded/bin/python3 bootstrap.py",
          "/opt/datadog-agent/embedded/bin/python3 setup.py install --prefix=/opt/datadog-agent/embedded",
        ]
      );
    }

    #[test]
    fn version_only_changes_url_and_relative_path() {
      let def = setuptools3().unwrap();
      let base = BuildContext::new(Os::Linux, "/opt/datadog-agent");

      let pinned = resolve(&def, &base).unwrap();
      let bumped = resolve(&def, &base.clone().with_version("41.0.1")).unwrap();

      assert_eq!(
        pinned.source.as_ref().unwrap().url,
        "https://github.com/pypa/setuptools/archive/v40.9.0.tar.gz"
      );
      assert_eq!(
        bumped.source.as_ref().unwrap().url,
        "https://github.com/pypa/setuptools/archive/v41.0.1.tar.gz"
      );
      assert_eq!(pinned.relative_path.as_deref(), Some("setuptools-40.9.0"));
      assert_eq!(bumped.relative_path.as_deref(), Some("setuptools-41.0.1"));

      assert_eq!(pinned.steps, bumped.steps);
      assert_eq!(pinned.dependencies, bumped.dependencies);
      assert_eq!(pinned.license, bumped.license);
      assert_eq!(pinned.definition_hash, bumped.definition_hash);
      assert_eq!(
        pinned.source.as_ref().unwrap().sha256,
        bumped.source.as_ref().unwrap().sha256
      );
    }
  }

  #[test]
  fn every_builtin_parses() {
    let defs = builtins().unwrap();
    let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["setuptools3"]);
  }
}
