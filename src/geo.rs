pub mod projection;
pub mod sphere;
