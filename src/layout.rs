pub mod fit;
pub mod format;
