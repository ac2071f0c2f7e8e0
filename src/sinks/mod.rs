//! Functions that turn their input into files.

pub mod delimited;
pub mod disk;

pub use delimited::GenerateDelimited;
pub use disk::WriteToDisk;
