//! Sentinel, identity and numeric field extraction.

use crate::manage::CommandOutput;

/// Reported when the queried VM or medium is unknown to VirtualBox.
pub const OBJECT_NOT_FOUND: &str = "VBOX_E_OBJECT_NOT_FOUND";

/// Reported when a medium file cannot be opened or is not registered.
pub const FILE_ERROR: &str = "VBOX_E_FILE_ERROR";

const OWNER_MARKER: &str = "(UUID: ";
const PROCESS_ID_MARKER: &str = "Process ID: ";
const COUNTER_MARKER: &str = "c=\"";

/// VM info query outcome: the VM exists.
pub fn vm_exists(output: &CommandOutput) -> bool {
    output.success() && !output.text.contains(OBJECT_NOT_FOUND)
}

/// Disk info query outcome: the medium is in the media registry.
pub fn medium_known(output: &CommandOutput) -> bool {
    output.success() && !output.text.contains(FILE_ERROR) && !output.text.contains(OBJECT_NOT_FOUND)
}

/// Identity of the VM that owns a medium, from `showhdinfo` output.
///
/// ```text
/// In use by VMs:        test2 (UUID: 000ab2be-1254-4c6a-9fdc-1536a478f601)
/// ```
pub fn owner_uuid(text: &str) -> Option<&str> {
    let start = text.find(OWNER_MARKER)? + OWNER_MARKER.len();
    let len = text[start..].find(')')?;
    let uuid = text[start..start + len].trim();
    (!uuid.is_empty()).then_some(uuid)
}

/// Host process id of the VM, from `showvminfo --log 0` output.
///
/// ```text
/// 00:00:06.015 Process ID: 6128
/// ```
pub fn process_id(text: &str) -> Option<u32> {
    let start = text.find(PROCESS_ID_MARKER)? + PROCESS_ID_MARKER.len();
    let line = text[start..].lines().next()?;
    line.trim().parse().ok()
}

/// Sum of every `c="<n>"` counter in a `debugvm statistics` dump.
///
/// ```text
/// <Counter c="9423150" unit="bytes" name="/Devices/PCNet0/ReceiveBytes"/>
/// <Counter c="256" unit="bytes" name="/Devices/PCNet1/ReceiveBytes"/>
/// ```
///
/// A dump with no counters sums to zero.
pub fn sum_counters(text: &str) -> f64 {
    let mut total = 0.0;
    let mut rest = text;
    while let Some(pos) = rest.find(COUNTER_MARKER) {
        let attr_start = pos == 0 || !is_name_char(rest[..pos].chars().next_back());
        let value_start = pos + COUNTER_MARKER.len();
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        if attr_start {
            match rest[value_start..value_start + len].trim().parse::<f64>() {
                Ok(value) => total += value,
                Err(_) => tracing::debug!(
                    value = &rest[value_start..value_start + len],
                    "Skipping non-numeric counter"
                ),
            }
        }
        rest = &rest[value_start + len..];
    }
    total
}

fn is_name_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
