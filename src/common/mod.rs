mod consts;
mod read;

pub use consts::*;
pub use read::FastqRead;
