//! Parsing of individual dependency strings.
//!
//! Only the parts needed to identify and re-pin an entry are extracted; the
//! original text is kept verbatim so unmatched entries round-trip unchanged.

use crate::normalize::{is_name_char, normalize_package_name};

/// A conda match spec such as `numpy`, `scikit-learn=1.2.0` or
/// `conda-forge::pandas>=2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondaSpec {
    raw: String,
    channel: Option<String>,
    name: String,
    constraint: Option<String>,
}

impl CondaSpec {
    /// Returns `None` when no package name can be found in `raw`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (channel, rest) = match trimmed.split_once("::") {
            Some((channel, rest)) => (Some(channel.trim().to_string()), rest.trim_start()),
            None => (None, trimmed),
        };
        let name_len = rest.find(|ch: char| !is_name_char(ch)).unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let name = rest[..name_len].to_string();
        let constraint = Some(rest[name_len..].trim())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        Some(Self {
            raw: raw.to_string(),
            channel,
            name,
            constraint,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    pub fn normalized_name(&self) -> String {
        normalize_package_name(&self.name)
    }

    /// `[channel::]name=version[=build]`
    pub fn pinned(&self, version: &str, build: Option<&str>) -> String {
        let mut token = format!("{}={version}", self.name);
        if let Some(build) = build.filter(|build| !build.is_empty()) {
            token.push('=');
            token.push_str(build);
        }
        self.with_channel(token)
    }

    /// `[channel::]name` with any constraint dropped.
    pub fn bare(&self) -> String {
        self.with_channel(self.name.clone())
    }

    fn with_channel(&self, token: String) -> String {
        match &self.channel {
            Some(channel) => format!("{channel}::{token}"),
            None => token,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipSpecKind {
    Requirement,
    DirectReference,
    Directive,
}

/// A requirement line from the `pip:` sub-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipSpec {
    raw: String,
    name: String,
    extras: Option<String>,
    marker: Option<String>,
    kind: PipSpecKind,
}

impl PipSpec {
    /// Returns `None` when the line names no package at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with('-') {
            // `-e ./pkg`, `-r other.txt`, `--index-url ...`
            return Some(Self {
                raw: raw.to_string(),
                name: trimmed.to_string(),
                extras: None,
                marker: None,
                kind: PipSpecKind::Directive,
            });
        }

        let (requirement, marker) = match trimmed.split_once(';') {
            Some((requirement, marker)) => (requirement.trim(), Some(marker.trim().to_string())),
            None => (trimmed, None),
        };
        let name_len = requirement
            .find(|ch: char| !is_name_char(ch))
            .unwrap_or(requirement.len());
        if name_len == 0 {
            return None;
        }
        let name = requirement[..name_len].to_string();
        let rest = requirement[name_len..].trim_start();
        let extras = if rest.starts_with('[') {
            rest.find(']').map(|end| rest[..=end].to_string())
        } else {
            None
        };
        // `name @ url` has no version to replace; `==` pins are re-pinned.
        let kind = if requirement.contains('@') {
            PipSpecKind::DirectReference
        } else {
            PipSpecKind::Requirement
        };
        Some(Self {
            raw: raw.to_string(),
            name,
            extras,
            marker: marker.filter(|value| !value.is_empty()),
            kind,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extras(&self) -> Option<&str> {
        self.extras.as_deref()
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn normalized_name(&self) -> String {
        normalize_package_name(&self.name)
    }

    /// `name @ url` requirements, which carry no version to replace.
    pub fn is_direct_reference(&self) -> bool {
        self.kind == PipSpecKind::DirectReference
    }

    /// Installer directives such as `-e` or `-r` lines.
    pub fn is_directive(&self) -> bool {
        self.kind == PipSpecKind::Directive
    }

    /// `name[extras]==version[; marker]`
    pub fn pinned(&self, version: &str) -> String {
        let mut token = format!(
            "{}{}=={version}",
            self.name,
            self.extras.as_deref().unwrap_or_default()
        );
        if let Some(marker) = &self.marker {
            token.push_str("; ");
            token.push_str(marker);
        }
        token
    }
}
