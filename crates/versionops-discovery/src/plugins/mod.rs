//! Built-in discovery plugins
//!
//! | Plugin | Method | Source |
//! |--------|--------|--------|
//! | [`PackageManagerScanner`] | `package-manager` | dpkg, rpm or pacman database |
//! | [`ServiceManagerExtractor`] | `service-manager` | running systemd units |
//! | [`BinaryProber`] | `binary-prober` | executables run with a version flag |
//! | [`CustomPlugin`] | `custom` | operator or backend supplied definitions |

mod binary;
mod custom;
mod package;
mod service;

pub use binary::{BinaryProbe, BinaryProber, default_probes};
pub use custom::CustomPlugin;
pub use package::{PackageDatabase, PackageManagerScanner};
pub use service::ServiceManagerExtractor;
