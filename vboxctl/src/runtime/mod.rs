//! Runtime configuration.

pub mod options;

pub use options::{ControllerOptions, ManageOptions, SettleOptions, VmOptions};
