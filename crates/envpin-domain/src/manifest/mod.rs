//! The `environment.yml` model.
//!
//! The whole document is kept as an ordered YAML mapping so keys other than
//! `dependencies` (`channels`, `prefix`, `variables`, ...) survive a rewrite in
//! their original order. Comments are not preserved.

mod io;

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::spec::{CondaSpec, PipSpec};

pub use io::{read_manifest, write_atomic, write_manifest};

const NAME_KEY: &str = "name";
const DEPENDENCIES_KEY: &str = "dependencies";
/// Key of the nested secondary-tool list inside `dependencies`.
pub const SECONDARY_KEY: &str = "pip";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("[EP101] manifest {} does not exist", .path.display())]
    Missing { path: PathBuf },
    #[error("[EP101] failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("[EP102] failed to parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("[EP102] {} is not a valid YAML mapping", .path.display())]
    NotAMapping { path: PathBuf },
    #[error("[EP103] {} must contain a top-level 'dependencies:' list", .path.display())]
    MissingDependencies { path: PathBuf },
    #[error("[EP110] failed to serialize manifest: {0}")]
    Serialize(serde_yaml::Error),
    #[error("[EP111] failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Mapping,
    dependencies: Vec<DependencyEntry>,
}

impl Manifest {
    /// Parse manifest text; `origin` is only used in error messages.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ManifestError> {
        let value: Value = serde_yaml::from_str(contents).map_err(|source| ManifestError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;
        let Value::Mapping(document) = value else {
            return Err(ManifestError::NotAMapping {
                path: origin.to_path_buf(),
            });
        };
        let Some(Value::Sequence(items)) = document.get(DEPENDENCIES_KEY) else {
            return Err(ManifestError::MissingDependencies {
                path: origin.to_path_buf(),
            });
        };
        let dependencies = items.iter().map(DependencyEntry::from_value).collect();
        Ok(Self {
            document,
            dependencies,
        })
    }

    /// The environment name declared by the manifest, if any.
    pub fn name(&self) -> Option<&str> {
        self.document
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn dependencies(&self) -> &[DependencyEntry] {
        &self.dependencies
    }

    #[must_use]
    pub fn with_dependencies(&self, dependencies: Vec<DependencyEntry>) -> Self {
        Self {
            document: self.document.clone(),
            dependencies,
        }
    }

    /// Render the manifest back to YAML, `dependencies` in its original slot.
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        let mut document = self.document.clone();
        let dependencies = self
            .dependencies
            .iter()
            .map(DependencyEntry::to_value)
            .collect();
        document.insert(
            Value::String(DEPENDENCIES_KEY.to_string()),
            Value::Sequence(dependencies),
        );
        serde_yaml::to_string(&Value::Mapping(document)).map_err(ManifestError::Serialize)
    }
}

/// One item of the `dependencies` list.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyEntry {
    Conda(CondaSpec),
    Secondary(SecondaryList),
    /// Anything this tool does not understand; written back untouched.
    Other(Value),
}

impl DependencyEntry {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => CondaSpec::parse(raw)
                .map_or_else(|| Self::Other(value.clone()), Self::Conda),
            Value::Mapping(mapping) => match mapping.get(SECONDARY_KEY) {
                Some(Value::Sequence(items)) => Self::Secondary(SecondaryList {
                    mapping: mapping.clone(),
                    entries: items.iter().map(SecondaryEntry::from_value).collect(),
                }),
                _ => Self::Other(value.clone()),
            },
            _ => Self::Other(value.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Conda(spec) => Value::String(spec.raw().to_string()),
            Self::Secondary(list) => list.to_value(),
            Self::Other(value) => value.clone(),
        }
    }
}

/// The `- pip: [...]` mapping nested in `dependencies`.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryList {
    mapping: Mapping,
    entries: Vec<SecondaryEntry>,
}

impl SecondaryList {
    pub fn entries(&self) -> &[SecondaryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn with_entries(&self, entries: Vec<SecondaryEntry>) -> Self {
        Self {
            mapping: self.mapping.clone(),
            entries,
        }
    }

    fn to_value(&self) -> Value {
        let mut mapping = self.mapping.clone();
        let entries = self.entries.iter().map(SecondaryEntry::to_value).collect();
        mapping.insert(
            Value::String(SECONDARY_KEY.to_string()),
            Value::Sequence(entries),
        );
        Value::Mapping(mapping)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryEntry {
    Pip(PipSpec),
    Other(Value),
}

impl SecondaryEntry {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => {
                PipSpec::parse(raw).map_or_else(|| Self::Other(value.clone()), Self::Pip)
            }
            _ => Self::Other(value.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Pip(spec) => Value::String(spec.raw().to_string()),
            Self::Other(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"name: health-ai
channels:
  - conda-forge
  - defaults
dependencies:
  - python=3.11
  - numpy
  - conda-forge::pandas>=2
  - pip:
      - fastapi
      - uvicorn[standard]
prefix: /opt/conda/envs/health-ai
";

    fn origin() -> &'static Path {
        Path::new("environment.yml")
    }

    #[test]
    fn parses_entries_in_order() {
        let manifest = Manifest::parse(SAMPLE, origin()).expect("parse manifest");
        assert_eq!(manifest.name(), Some("health-ai"));
        let deps = manifest.dependencies();
        assert_eq!(deps.len(), 4);
        let names: Vec<&str> = deps
            .iter()
            .filter_map(|entry| match entry {
                DependencyEntry::Conda(spec) => Some(spec.name()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["python", "numpy", "pandas"]);
        let DependencyEntry::Secondary(pip) = &deps[3] else {
            panic!("expected pip sub-list");
        };
        assert_eq!(pip.entries().len(), 2);
    }

    #[test]
    fn rendering_keeps_key_order() {
        let manifest = Manifest::parse(SAMPLE, origin()).expect("parse manifest");
        let rendered = manifest.to_yaml().expect("render");
        let name_at = rendered.find("name:").expect("name key");
        let channels_at = rendered.find("channels:").expect("channels key");
        let deps_at = rendered.find("dependencies:").expect("dependencies key");
        let prefix_at = rendered.find("prefix:").expect("prefix key");
        assert!(name_at < channels_at && channels_at < deps_at && deps_at < prefix_at);
    }

    #[test]
    fn rendering_round_trips() {
        let manifest = Manifest::parse(SAMPLE, origin()).expect("parse manifest");
        let rendered = manifest.to_yaml().expect("render");
        let reparsed = Manifest::parse(&rendered, origin()).expect("reparse");
        assert_eq!(manifest, reparsed);
        assert_eq!(rendered, reparsed.to_yaml().expect("render again"));
    }

    #[test]
    fn keeps_unknown_entries() {
        let text = "dependencies:\n  - 42\n  - {foo: bar}\n  - pip: not-a-list\n";
        let manifest = Manifest::parse(text, origin()).expect("parse manifest");
        assert!(manifest
            .dependencies()
            .iter()
            .all(|entry| matches!(entry, DependencyEntry::Other(_))));
        assert_eq!(manifest.name(), None);
    }

    #[test]
    fn rejects_documents_without_dependency_list() {
        let err = Manifest::parse("name: demo\n", origin()).expect_err("missing deps");
        assert!(matches!(err, ManifestError::MissingDependencies { .. }));

        let err = Manifest::parse("name: demo\ndependencies: numpy\n", origin())
            .expect_err("scalar deps");
        assert!(matches!(err, ManifestError::MissingDependencies { .. }));
    }

    #[test]
    fn rejects_non_mapping_and_malformed_documents() {
        let err = Manifest::parse("- numpy\n- scipy\n", origin()).expect_err("sequence root");
        assert!(matches!(err, ManifestError::NotAMapping { .. }));

        let err = Manifest::parse("", origin()).expect_err("empty document");
        assert!(matches!(err, ManifestError::NotAMapping { .. }));

        let err = Manifest::parse("name: [unterminated\n", origin()).expect_err("bad yaml");
        assert!(matches!(err, ManifestError::Yaml { .. }));
        assert!(err.to_string().contains("environment.yml"));
    }
}
