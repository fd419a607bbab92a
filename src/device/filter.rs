//! Matching device names against the enumerated lists

use crate::device::DeviceInfo;

/// Name lookups over an ordered device list
pub struct DeviceFilter;

impl DeviceFilter {
    /// Index of the device called `name`, or 0 if it is no longer present
    ///
    /// Exact matches win over case-insensitive ones.
    pub fn resolve(devices: &[DeviceInfo], name: &str) -> usize {
        devices
            .iter()
            .position(|d| d.name == name)
            .or_else(|| devices.iter().position(|d| d.name.eq_ignore_ascii_case(name)))
            .unwrap_or(0)
    }

    /// Index of the first device whose name contains `query`, ignoring case
    pub fn find(devices: &[DeviceInfo], query: &str) -> Option<usize> {
        let query_lower = query.to_lowercase();
        devices
            .iter()
            .position(|d| d.name == query)
            .or_else(|| {
                devices
                    .iter()
                    .position(|d| d.name.to_lowercase().contains(&query_lower))
            })
    }
}
