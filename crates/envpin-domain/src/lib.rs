#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod installed;
pub mod manifest;
pub mod normalize;
pub mod pin;
pub mod spec;

pub use installed::{InstalledPackage, InstalledSet};
pub use manifest::{
    read_manifest, write_atomic, write_manifest, DependencyEntry, Manifest, ManifestError,
    SecondaryEntry, SecondaryList, SECONDARY_KEY,
};
pub use normalize::normalize_package_name;
pub use pin::{
    pin_manifest, PinOptions, PinReport, PinResult, PinScope, PinnedEntry, PreserveReason,
    PreservedEntry, UnpinnedEntry,
};
pub use spec::{CondaSpec, PipSpec};
