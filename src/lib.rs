pub mod config;
pub mod git;
pub mod roots;
pub mod shell_exec;
pub mod status;
pub mod styling;
pub mod sync;

pub use config::EngineConfig;
pub use roots::RootStore;
pub use status::{Aggregator, NodeList, StatusCache};
