//! Built-in scratchpad capabilities
//!
//! These two are serviced inline by the execution loop (no policy check, no
//! retry) and are always part of a step's manifest, whatever its whitelist.

use crate::descriptor::CapabilityDescriptor;
use schemars::JsonSchema;
use serde::Deserialize;

/// Read the task scratchpad
pub const READ_SCRATCHPAD: &str = "read_scratchpad";

/// Append to the task scratchpad
pub const WRITE_SCRATCHPAD: &str = "write_scratchpad";

/// Check if a name belongs to the built-in pair
#[inline]
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    name == READ_SCRATCHPAD || name == WRITE_SCRATCHPAD
}

/// Arguments of `write_scratchpad`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WriteScratchpadArgs {
    /// The full data to append. Include all raw details, names, values and sources.
    pub content: String,
}

/// Descriptor of `read_scratchpad`
#[must_use]
pub fn read_scratchpad() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        READ_SCRATCHPAD,
        "Read the current task scratchpad to see details from previous steps.",
        serde_json::json!({ "type": "object", "properties": {} }),
    )
}

/// Descriptor of `write_scratchpad`
#[must_use]
pub fn write_scratchpad() -> CapabilityDescriptor {
    CapabilityDescriptor::for_args::<WriteScratchpadArgs>(
        WRITE_SCRATCHPAD,
        "Append detailed data to the task scratchpad for later steps. \
         Write the full, untruncated output of your capabilities; do not summarize.",
    )
}

/// Both built-in descriptors, read first
#[must_use]
pub fn descriptors() -> [CapabilityDescriptor; 2] {
    [read_scratchpad(), write_scratchpad()]
}
