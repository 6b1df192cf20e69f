//! Platform resolution of software definitions.
//!
//! A [`SoftwareDef`] is platform-neutral. Resolving it against a
//! [`BuildContext`] picks the effective version, computes the built-in
//! variables for the target platform and install directory, selects the
//! `windows` or `default` variable table, and substitutes every template.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Os;
use crate::platform::paths::{unix_path, windows_safe_path};
use crate::util::hash::{HashError, Hashable, ObjectHash};

use super::template::{self, TemplateError};
use super::types::{ExtractMethod, SoftwareDef};

/// Variables every definition can reference without declaring them.
pub const BUILTIN_VARS: &[&str] = &["name", "version", "platform", "install_dir", "embedded_dir", "python3_embedded"];

/// The target a definition is resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  pub platform: Os,
  pub install_dir: PathBuf,
  /// Overrides the definition's `default_version` when set.
  pub version: Option<String>,
}

impl BuildContext {
  pub fn new(platform: Os, install_dir: impl Into<PathBuf>) -> Self {
    Self {
      platform,
      install_dir: install_dir.into(),
      version: None,
    }
  }

  pub fn with_version(mut self, version: &str) -> Self {
    self.version = Some(version.to_string());
    self
  }
}

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("{name}: {field}: {source}")]
  Template {
    name: String,
    field: String,
    #[source]
    source: TemplateError,
  },

  #[error("{name}: platform variable '{var}' shadows a built-in variable")]
  ShadowedBuiltin { name: String, var: String },

  #[error("failed to hash definition: {0}")]
  Hash(#[from] HashError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
  pub url: String,
  pub sha256: String,
  pub extract: ExtractMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStep {
  pub command: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub env: Option<BTreeMap<String, String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cwd: Option<String>,
}

/// A definition with every template substituted for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSoftware {
  pub name: String,
  pub version: String,
  pub platform: Os,
  pub license: String,
  pub skip_transitive_dependency_licensing: bool,
  pub dependencies: Vec<String>,
  pub relative_path: Option<String>,
  pub source: Option<ResolvedSource>,
  pub steps: Vec<ResolvedStep>,
  pub vars: BTreeMap<String, String>,
  pub definition_hash: ObjectHash,
}

impl Hashable for ResolvedSoftware {}

fn join(base: &str, segment: &str, sep: char) -> String {
  if base.ends_with(sep) {
    format!("{}{}", base, segment)
  } else {
    format!("{}{}{}", base, sep, segment)
  }
}

/// Compute the built-in variables for a definition and target.
pub fn builtin_vars(def: &SoftwareDef, version: &str, platform: Os, install_dir: &Path) -> BTreeMap<String, String> {
  let (install, embedded, python3_embedded) = if platform.is_windows() {
    let install = windows_safe_path(install_dir);
    let embedded = join(&install, "embedded", '\\');
    let python3 = join(&install, "embedded3", '\\');
    (install, embedded, python3)
  } else {
    let install = unix_path(install_dir);
    let embedded = join(&install, "embedded", '/');
    (install, embedded.clone(), embedded)
  };

  BTreeMap::from([
    ("name".to_string(), def.name.clone()),
    ("version".to_string(), version.to_string()),
    ("platform".to_string(), platform.as_str().to_string()),
    ("install_dir".to_string(), install),
    ("embedded_dir".to_string(), embedded),
    ("python3_embedded".to_string(), python3_embedded),
  ])
}

/// Resolve a definition for the given context.
pub fn resolve(def: &SoftwareDef, ctx: &BuildContext) -> Result<ResolvedSoftware, ResolveError> {
  let version = ctx.version.clone().unwrap_or_else(|| def.default_version.clone());
  let builtins = builtin_vars(def, &version, ctx.platform, &ctx.install_dir);

  let subst = |field: &str, value: &str, vars: &BTreeMap<String, String>| {
    template::substitute(value, vars).map_err(|source| ResolveError::Template {
      name: def.name.clone(),
      field: field.to_string(),
      source,
    })
  };

  // Platform variables see only the built-ins.
  let mut vars = builtins.clone();
  for (key, value) in def.vars.table(ctx.platform.vars_key()) {
    if builtins.contains_key(key) {
      return Err(ResolveError::ShadowedBuiltin {
        name: def.name.clone(),
        var: key.clone(),
      });
    }
    let resolved = subst(&format!("vars.{}", key), value, &builtins)?;
    vars.insert(key.clone(), resolved);
  }

  let source = match &def.source {
    Some(spec) => Some(ResolvedSource {
      url: subst("source.url", &spec.url, &builtins)?,
      sha256: spec.sha256.clone(),
      extract: spec.extract,
    }),
    None => None,
  };

  let relative_path = match &def.relative_path {
    Some(path) => Some(subst("relative_path", path, &builtins)?),
    None => None,
  };

  let mut steps = Vec::with_capacity(def.build.len());
  for (index, step) in def.build.iter().enumerate() {
    let field = format!("build[{}]", index);
    let command = subst(&format!("{}.command", field), &step.command, &vars)?;

    let env = match &step.env {
      Some(env) => {
        let mut resolved = BTreeMap::new();
        for (key, value) in env {
          resolved.insert(key.clone(), subst(&format!("{}.env.{}", field, key), value, &vars)?);
        }
        Some(resolved)
      }
      None => None,
    };

    let cwd = match &step.cwd {
      Some(cwd) => Some(subst(&format!("{}.cwd", field), cwd, &vars)?),
      None => None,
    };

    steps.push(ResolvedStep { command, env, cwd });
  }

  Ok(ResolvedSoftware {
    name: def.name.clone(),
    version,
    platform: ctx.platform,
    license: def.license.clone(),
    skip_transitive_dependency_licensing: def.skip_transitive_dependency_licensing,
    dependencies: def.dependencies.clone(),
    relative_path,
    source,
    steps,
    vars,
    definition_hash: def.compute_hash()?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::software::types::{BuildStep, PlatformVars};

  fn def_with_vars() -> SoftwareDef {
    SoftwareDef {
      name: "pkg".to_string(),
      default_version: "1.0".to_string(),
      license: "MIT".to_string(),
      skip_transitive_dependency_licensing: false,
      dependencies: vec![],
      relative_path: None,
      source: None,
      vars: PlatformVars {
        windows: BTreeMap::from([("bin".to_string(), "%{install_dir}\\bin\\tool.exe".to_string())]),
        default: BTreeMap::from([("bin".to_string(), "%{install_dir}/bin/tool".to_string())]),
      },
      build: vec![BuildStep::new("%{bin} --version")],
    }
  }

  #[test]
  fn default_table_used_off_windows() {
    let ctx = BuildContext::new(Os::MacOs, "/opt/agent");
    let resolved = resolve(&def_with_vars(), &ctx).unwrap();
    assert_eq!(resolved.steps[0].command, "/opt/agent/bin/tool --version");
  }

  #[test]
  fn windows_table_used_on_windows() {
    let ctx = BuildContext::new(Os::Windows, "C:/opt/agent");
    let resolved = resolve(&def_with_vars(), &ctx).unwrap();
    assert_eq!(resolved.steps[0].command, "C:\\opt\\agent\\bin\\tool.exe --version");
  }

  #[test]
  fn version_override_wins() {
    let ctx = BuildContext::new(Os::Linux, "/opt/agent").with_version("2.0");
    let resolved = resolve(&def_with_vars(), &ctx).unwrap();
    assert_eq!(resolved.version, "2.0");
    assert_eq!(resolved.vars["version"], "2.0");
  }

  #[test]
  fn builtin_dirs_on_unix() {
    let vars = builtin_vars(&def_with_vars(), "1.0", Os::Linux, Path::new("/opt/agent/"));
    assert_eq!(vars["install_dir"], "/opt/agent");
    assert_eq!(vars["embedded_dir"], "/opt/agent/embedded");
    assert_eq!(vars["python3_embedded"], "/opt/agent/embedded");
  }

  #[test]
  fn builtin_dirs_on_windows() {
    let vars = builtin_vars(&def_with_vars(), "1.0", Os::Windows, Path::new("C:/opt/agent"));
    assert_eq!(vars["install_dir"], "C:\\opt\\agent");
    assert_eq!(vars["embedded_dir"], "C:\\opt\\agent\\embedded");
    assert_eq!(vars["python3_embedded"], "C:\\opt\\agent\\embedded3");
  }

  #[test]
  fn root_install_dir_does_not_double_separator() {
    let vars = builtin_vars(&def_with_vars(), "1.0", Os::Linux, Path::new("/"));
    assert_eq!(vars["embedded_dir"], "/embedded");
  }

  #[test]
  fn platform_var_cannot_shadow_builtin() {
    let mut def = def_with_vars();
    def
      .vars
      .default
      .insert("install_dir".to_string(), "/elsewhere".to_string());

    let result = resolve(&def, &BuildContext::new(Os::Linux, "/opt/agent"));
    assert!(matches!(result, Err(ResolveError::ShadowedBuiltin { var, .. }) if var == "install_dir"));
  }

  #[test]
  fn undefined_variable_names_the_field() {
    let mut def = def_with_vars();
    def.build.push(BuildStep::new("%{missing}"));

    let err = resolve(&def, &BuildContext::new(Os::Linux, "/opt/agent")).unwrap_err();
    assert!(err.to_string().contains("build[1].command"), "got: {}", err);
  }

  #[test]
  fn step_env_and_cwd_are_substituted() {
    let mut def = def_with_vars();
    def.build = vec![
      BuildStep::new("make")
        .with_env(BTreeMap::from([("PREFIX".to_string(), "%{embedded_dir}".to_string())]))
        .with_cwd("%{install_dir}/src"),
    ];

    let resolved = resolve(&def, &BuildContext::new(Os::Linux, "/opt/agent")).unwrap();
    let step = &resolved.steps[0];
    assert_eq!(step.env.as_ref().unwrap()["PREFIX"], "/opt/agent/embedded");
    assert_eq!(step.cwd.as_deref(), Some("/opt/agent/src"));
  }

  #[test]
  fn resolved_hash_depends_on_platform() {
    let def = def_with_vars();
    let linux = resolve(&def, &BuildContext::new(Os::Linux, "/opt/agent")).unwrap();
    let darwin = resolve(&def, &BuildContext::new(Os::MacOs, "/opt/agent")).unwrap();
    assert_ne!(linux.compute_hash().unwrap(), darwin.compute_hash().unwrap());
  }
}
