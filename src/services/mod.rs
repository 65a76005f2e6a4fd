pub mod archive;
pub mod browser;
pub mod collation;
pub mod memory_queue;
pub mod process;
pub mod queue;
pub mod validation;
