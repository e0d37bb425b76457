pub mod file;

pub use file::FileRouteSource;
