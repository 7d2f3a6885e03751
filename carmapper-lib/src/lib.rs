pub mod date;
pub mod hooks;
pub mod mapper;
pub mod tree;
pub mod types;

pub use date::*;
pub use hooks::*;
pub use mapper::*;
pub use tree::*;
pub use types::*;
