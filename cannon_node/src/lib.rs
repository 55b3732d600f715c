pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::ports::Overlay;
pub use frameworks::server::{NodeError, NodeHandle, NodeSettings, run_with_config, start};
