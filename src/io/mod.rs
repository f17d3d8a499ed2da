pub mod compression;
pub mod file_writer;
pub mod fs;
