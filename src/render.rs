pub mod renderer;
pub mod tree;
