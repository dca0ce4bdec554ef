use serde_json::{json, Value};

use crate::installed::InstalledSet;
use crate::manifest::{DependencyEntry, Manifest, SecondaryEntry, SecondaryList};
use crate::normalize::normalize_package_name;
use crate::spec::{CondaSpec, PipSpec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinOptions {
    /// Write `python` without a version instead of pinning it.
    pub keep_python_unpinned: bool,
    /// Append the installed build string to conda pins.
    pub include_build: bool,
}

/// Which namespace an entry belongs to. The two are never merged: a conda
/// entry only matches conda records and a pip entry only matches pip records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinScope {
    Conda,
    Pip,
}

impl PinScope {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PinScope::Conda => "conda",
            PinScope::Pip => "pip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedEntry {
    pub name: String,
    pub scope: PinScope,
    pub from: String,
    pub to: String,
}

impl PinnedEntry {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "scope": self.scope.as_str(),
            "from": self.from,
            "to": self.to,
        })
    }

    #[must_use]
    pub fn short_label(&self) -> String {
        let mut label = self.to.clone();
        if self.scope == PinScope::Pip {
            label.push_str(" (pip)");
        }
        label
    }
}

/// An entry with no installed counterpart; left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpinnedEntry {
    pub name: String,
    pub scope: PinScope,
    pub requested: String,
}

impl UnpinnedEntry {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "scope": self.scope.as_str(),
            "requested": self.requested,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreserveReason {
    DirectReference,
    Directive,
    KeepPythonUnpinned,
    SecondaryNotInspected,
}

impl PreserveReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PreserveReason::DirectReference => "direct-reference",
            PreserveReason::Directive => "directive",
            PreserveReason::KeepPythonUnpinned => "keep-python-unpinned",
            PreserveReason::SecondaryNotInspected => "pip-not-inspected",
        }
    }
}

/// An entry deliberately not pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedEntry {
    pub name: String,
    pub scope: PinScope,
    pub spec: String,
    pub reason: PreserveReason,
}

impl PreservedEntry {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "scope": self.scope.as_str(),
            "spec": self.spec,
            "reason": self.reason.as_str(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinReport {
    pub pinned: Vec<PinnedEntry>,
    pub unpinned: Vec<UnpinnedEntry>,
    pub preserved: Vec<PreservedEntry>,
}

impl PinReport {
    /// `N entries left unpinned: a, b` when anything went unmatched.
    #[must_use]
    pub fn warning_summary(&self) -> Option<String> {
        if self.unpinned.is_empty() {
            return None;
        }
        let names = self
            .unpinned
            .iter()
            .map(|entry| match entry.scope {
                PinScope::Conda => entry.name.clone(),
                PinScope::Pip => format!("{} (pip)", entry.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if self.unpinned.len() == 1 {
            "entry"
        } else {
            "entries"
        };
        Some(format!(
            "{} {noun} left unpinned: {names}",
            self.unpinned.len()
        ))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "pinned": self.pinned.iter().map(PinnedEntry::to_json).collect::<Vec<_>>(),
            "unpinned": self.unpinned.iter().map(UnpinnedEntry::to_json).collect::<Vec<_>>(),
            "preserved": self.preserved.iter().map(PreservedEntry::to_json).collect::<Vec<_>>(),
        })
    }
}

pub struct PinResult {
    pub manifest: Manifest,
    pub report: PinReport,
}

/// Pin every manifest entry that has an installed counterpart.
///
/// `secondary` is `None` when pip packages were not inspected; the `pip:`
/// sub-list is then copied through untouched.
pub fn pin_manifest(
    manifest: &Manifest,
    conda: &InstalledSet,
    secondary: Option<&InstalledSet>,
    options: PinOptions,
) -> PinResult {
    let mut report = PinReport::default();
    let dependencies = manifest
        .dependencies()
        .iter()
        .map(|entry| match entry {
            DependencyEntry::Conda(spec) => pin_conda_entry(spec, conda, options, &mut report),
            DependencyEntry::Secondary(list) => {
                DependencyEntry::Secondary(pin_secondary_list(list, secondary, &mut report))
            }
            DependencyEntry::Other(value) => DependencyEntry::Other(value.clone()),
        })
        .collect();
    PinResult {
        manifest: manifest.with_dependencies(dependencies),
        report,
    }
}

fn pin_conda_entry(
    spec: &CondaSpec,
    conda: &InstalledSet,
    options: PinOptions,
    report: &mut PinReport,
) -> DependencyEntry {
    if options.keep_python_unpinned && normalize_package_name(spec.name()) == "python" {
        report.preserved.push(PreservedEntry {
            name: spec.name().to_string(),
            scope: PinScope::Conda,
            spec: spec.raw().to_string(),
            reason: PreserveReason::KeepPythonUnpinned,
        });
        return conda_entry(spec.bare());
    }

    let Some(installed) = conda.get(spec.name()) else {
        tracing::warn!(name = spec.name(), spec = spec.raw(), "no installed conda package matches");
        report.unpinned.push(UnpinnedEntry {
            name: spec.name().to_string(),
            scope: PinScope::Conda,
            requested: spec.raw().to_string(),
        });
        return DependencyEntry::Conda(spec.clone());
    };

    let build = if options.include_build {
        installed.build.as_deref()
    } else {
        None
    };
    let token = spec.pinned(&installed.version, build);
    report.pinned.push(PinnedEntry {
        name: spec.name().to_string(),
        scope: PinScope::Conda,
        from: spec.raw().to_string(),
        to: token.clone(),
    });
    conda_entry(token)
}

fn conda_entry(token: String) -> DependencyEntry {
    DependencyEntry::from_value(&serde_yaml::Value::String(token))
}

fn pin_secondary_list(
    list: &SecondaryList,
    secondary: Option<&InstalledSet>,
    report: &mut PinReport,
) -> SecondaryList {
    let entries = list
        .entries()
        .iter()
        .map(|entry| match entry {
            SecondaryEntry::Pip(spec) => pin_pip_entry(spec, secondary, report),
            SecondaryEntry::Other(value) => SecondaryEntry::Other(value.clone()),
        })
        .collect();
    list.with_entries(entries)
}

fn pin_pip_entry(
    spec: &PipSpec,
    secondary: Option<&InstalledSet>,
    report: &mut PinReport,
) -> SecondaryEntry {
    let preserve = |reason: PreserveReason, report: &mut PinReport| {
        report.preserved.push(PreservedEntry {
            name: spec.name().to_string(),
            scope: PinScope::Pip,
            spec: spec.raw().to_string(),
            reason,
        });
        SecondaryEntry::Pip(spec.clone())
    };

    let Some(secondary) = secondary else {
        return preserve(PreserveReason::SecondaryNotInspected, report);
    };
    if spec.is_directive() {
        return preserve(PreserveReason::Directive, report);
    }
    if spec.is_direct_reference() {
        return preserve(PreserveReason::DirectReference, report);
    }

    let Some(installed) = secondary.get(spec.name()) else {
        tracing::warn!(name = spec.name(), spec = spec.raw(), "no installed pip package matches");
        report.unpinned.push(UnpinnedEntry {
            name: spec.name().to_string(),
            scope: PinScope::Pip,
            requested: spec.raw().to_string(),
        });
        return SecondaryEntry::Pip(spec.clone());
    };

    let token = spec.pinned(&installed.version);
    report.pinned.push(PinnedEntry {
        name: spec.name().to_string(),
        scope: PinScope::Pip,
        from: spec.raw().to_string(),
        to: token.clone(),
    });
    SecondaryEntry::from_value(&serde_yaml::Value::String(token))
}
