/// UI layer: dashboard pages rendered on top of the data pipeline. All
/// widgets read and mutate session state, then ask the state to recompute;
/// nothing in here touches records directly except to display them.
pub mod charts;
pub mod consultations;
pub mod dashboard;
pub mod inventory;
pub mod tables;
