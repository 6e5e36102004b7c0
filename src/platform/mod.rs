//! Platform resolution.
//!
//! Maps the host's operating system and CPU architecture to the canonical
//! platform identifier used to name compiler archives.

mod detection;
mod identifier;

pub use detection::{HostDetector, PlatformDetector};
pub use identifier::{Arch, OsFamily, PlatformIdentifier};
