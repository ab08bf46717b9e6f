pub mod capture;
pub mod filename;
pub mod pipeline;
pub mod raster;
