//! Device enumeration and selection

mod enumerator;
mod filter;

pub use enumerator::{DeviceCatalog, DeviceEnumerator, DeviceInfo, Direction};
pub use filter::DeviceFilter;
