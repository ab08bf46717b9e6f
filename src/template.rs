pub mod builtin;
pub mod contract;
pub mod registry;
pub mod variables;
