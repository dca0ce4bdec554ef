use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_package_name;

/// One package reported by an environment listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build: None,
            channel: None,
        }
    }

    #[must_use]
    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }
}

/// Installed packages keyed by normalized name, in listing order.
///
/// The first record wins when a listing repeats a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSet {
    packages: IndexMap<String, InstalledPackage>,
}

impl InstalledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: InstalledPackage) {
        let key = normalize_package_name(&package.name);
        self.packages.entry(key).or_insert(package);
    }

    /// Look up a package by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(&normalize_package_name(name))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<InstalledPackage> for InstalledSet {
    fn from_iter<T: IntoIterator<Item = InstalledPackage>>(iter: T) -> Self {
        let mut set = Self::new();
        for package in iter {
            set.insert(package);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_normalized() {
        let set: InstalledSet = [InstalledPackage::new("package-name", "1.0")]
            .into_iter()
            .collect();
        assert_eq!(set.get("Package_Name").map(|p| p.version.as_str()), Some("1.0"));
        assert_eq!(set.get("package.name").map(|p| p.version.as_str()), Some("1.0"));
        assert!(set.get("other").is_none());
    }

    #[test]
    fn first_record_wins() {
        let set: InstalledSet = [
            InstalledPackage::new("numpy", "1.26.4"),
            InstalledPackage::new("NumPy", "2.0.0"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("numpy").map(|p| p.version.as_str()), Some("1.26.4"));
    }
}
