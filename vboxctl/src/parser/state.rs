//! Fields of `showvminfo --machinereadable`.

const VM_STATE_FIELD: &str = "VMState=\"";

/// Machine states in which the VM still holds its resources.
///
/// Taken from what VBoxManage actually reports rather than the documented
/// `MachineState_FirstOnline..LastOnline` range, which misses some of them.
pub const ACTIVE_STATES: &[&str] = &[
    "running",
    "paused",
    "gurumeditation",
    "livesnapshotting",
    "teleporting",
    "starting",
    "stopping",
    "saving",
    "restoring",
    "teleportingpausedvm",
    "teleportingin",
    "restoringsnapshot",
    "deletingsnapshot",
    "deletingsnapshotlive",
];

/// Token of the `VMState="..."` field, if present and terminated.
pub fn vm_state(text: &str) -> Option<&str> {
    let start = text.find(VM_STATE_FIELD)? + VM_STATE_FIELD.len();
    let len = text[start..].find('"')?;
    Some(&text[start..start + len])
}

pub fn is_active_state(token: &str) -> bool {
    ACTIVE_STATES.contains(&token)
}

/// True if the output reports a state that occupies resources.
pub fn is_running(text: &str) -> bool {
    vm_state(text).is_some_and(is_active_state)
}

/// Value of a `key=value` line, surrounding quotes stripped.
pub fn machine_field<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    text.lines().find_map(|line| {
        let value = line.strip_prefix(key)?.strip_prefix('=')?;
        Some(value.trim().trim_matches('"'))
    })
}

/// Cable state of the first NIC.
pub fn cable_connected(text: &str) -> Option<bool> {
    match machine_field(text, "cableconnected1")? {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}
