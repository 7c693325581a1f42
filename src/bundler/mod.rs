//! Release build and ZIP bundling.
//!
//! - [`builder`] runs `cargo build --release` into a fresh, timestamped target
//!   directory and locates the required binaries.
//! - [`archive`] stages binaries, optional project files and a launcher, then
//!   deflates them into `<name>-<version>-<platform>.zip`.
//!
//! The packaging shape is fixed: one archive, two named executables.

pub mod archive;
pub mod builder;
pub mod launcher;
pub mod platform;
mod staging;

pub use archive::{PackageRequest, package_zip};
pub use builder::{BuildArtifactSet, BuildRequest, build, find_artifacts};
pub use staging::StagingDir;
