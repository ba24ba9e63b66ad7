mod filename;

pub use filename::convert_to_filename;
