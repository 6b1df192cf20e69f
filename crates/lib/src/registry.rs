//! Registry of known software definitions.
//!
//! The registry maps names to definitions and answers the one graph question
//! a build needs: in which order must a target and everything it depends on
//! be built.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::software::{DefinitionError, SoftwareDef, catalog};

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("unknown software: {0}")]
  UnknownSoftware(String),

  #[error("{software} depends on '{dependency}', which is not defined")]
  MissingDependency { software: String, dependency: String },

  #[error("dependency cycle detected involving {0}")]
  CycleDetected(String),

  #[error("failed to read software directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid definition {path}: {source}")]
  Definition {
    path: PathBuf,
    #[source]
    source: DefinitionError,
  },

  #[error("invalid built-in definition: {0}")]
  Builtin(#[source] DefinitionError),
}

#[derive(Debug, Default, Clone)]
pub struct Registry {
  defs: BTreeMap<String, SoftwareDef>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry pre-populated with the library's built-in definitions.
  pub fn with_builtins() -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    for def in catalog::builtins().map_err(RegistryError::Builtin)? {
      registry.insert(def);
    }
    Ok(registry)
  }

  /// Add a definition, replacing any existing one with the same name.
  pub fn insert(&mut self, def: SoftwareDef) -> Option<SoftwareDef> {
    let previous = self.defs.insert(def.name.clone(), def);
    if let Some(prev) = &previous {
      warn!(name = %prev.name, "replacing existing software definition");
    }
    previous
  }

  /// Load every `*.toml` file in `dir`, in file name order.
  ///
  /// Returns the number of definitions loaded.
  pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
    let dir = dunce::canonicalize(dir).map_err(|source| RegistryError::ReadDir {
      path: dir.to_path_buf(),
      source,
    })?;
    let read_err = |source| RegistryError::ReadDir {
      path: dir.clone(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(read_err)? {
      let path = entry.map_err(read_err)?.path();
      if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
        files.push(path);
      }
    }
    files.sort();

    for path in &files {
      debug!(path = ?path, "loading software definition");
      let def = SoftwareDef::from_file(path).map_err(|source| RegistryError::Definition {
        path: path.clone(),
        source,
      })?;
      self.insert(def);
    }

    info!(dir = ?dir, count = files.len(), "loaded software definitions");
    Ok(files.len())
  }

  pub fn get(&self, name: &str) -> Option<&SoftwareDef> {
    self.defs.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.defs.contains_key(name)
  }

  /// All definitions, sorted by name.
  pub fn definitions(&self) -> impl Iterator<Item = &SoftwareDef> {
    self.defs.values()
  }

  pub fn len(&self) -> usize {
    self.defs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.defs.is_empty()
  }

  /// The target and its transitive dependencies, dependencies first.
  ///
  /// # Errors
  ///
  /// - `UnknownSoftware` if the target is not defined
  /// - `MissingDependency` if anything reachable depends on an undefined name
  /// - `CycleDetected` if the dependencies form a cycle
  pub fn build_order(&self, target: &str) -> Result<Vec<&SoftwareDef>, RegistryError> {
    let root = self
      .get(target)
      .ok_or_else(|| RegistryError::UnknownSoftware(target.to_string()))?;

    // Edges point from dependency to dependent.
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    nodes.insert(root.name.as_str(), graph.add_node(root.name.as_str()));
    let mut stack = vec![root];

    while let Some(def) = stack.pop() {
      let dependent_idx = nodes[def.name.as_str()];

      for dependency in &def.dependencies {
        let dep_def = self.get(dependency).ok_or_else(|| RegistryError::MissingDependency {
          software: def.name.clone(),
          dependency: dependency.clone(),
        })?;

        let dep_idx = match nodes.get(dep_def.name.as_str()) {
          Some(&idx) => idx,
          None => {
            let idx = graph.add_node(dep_def.name.as_str());
            nodes.insert(dep_def.name.as_str(), idx);
            stack.push(dep_def);
            idx
          }
        };

        graph.add_edge(dep_idx, dependent_idx, ());
      }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| RegistryError::CycleDetected(graph[cycle.node_id()].to_string()))?;

    Ok(sorted.into_iter().filter_map(|idx| self.defs.get(graph[idx])).collect())
  }
}
