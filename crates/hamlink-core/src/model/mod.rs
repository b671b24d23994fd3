// ── Domain model ──
//
// Plain value types shared by every component. Nothing here performs I/O.

pub mod descriptor;
pub mod identity;
pub mod interface_type;
pub mod meaning;
pub mod software_version;

pub use descriptor::{DeviceDescriptor, DeviceFeatures};
pub use identity::{DeviceAddress, MacAddress};
pub use interface_type::InterfaceType;
pub use meaning::ValueMeaning;
pub use software_version::{SoftwareVersion, VersionRange};
