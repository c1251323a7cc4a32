//! Extraction rules for VBoxManage output.
//!
//! VBoxManage prints free-form text with no schema. Each rule here is a pure
//! function over captured output:
//!
//! | Rule             | Command                            | Strategy                 |
//! |------------------|------------------------------------|--------------------------|
//! | `vm_state`       | `showvminfo --machinereadable`     | scalar field             |
//! | `machine_field`  | `showvminfo --machinereadable`     | scalar field             |
//! | `vm_exists`      | `showvminfo`                       | sentinel absence         |
//! | `medium_known`   | `showhdinfo`                       | sentinel absence         |
//! | `owner_uuid`     | `showhdinfo`                       | parenthesized identity   |
//! | `process_id`     | `showvminfo --log 0`               | scalar field             |
//! | `sum_counters`   | `debugvm statistics`               | repeated-counter sum     |
//!
//! Missing fields come back as `None` (or zero for counters), never a panic.

mod fields;
mod state;

pub use fields::{
    FILE_ERROR, OBJECT_NOT_FOUND, medium_known, owner_uuid, process_id, sum_counters, vm_exists,
};
pub use state::{
    ACTIVE_STATES, cable_connected, is_active_state, is_running, machine_field, vm_state,
};
