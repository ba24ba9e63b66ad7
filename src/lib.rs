pub mod command;
pub mod common;
pub mod demux;
pub mod fileformat;
pub mod insertions;
pub mod runtime;
pub mod utils;
