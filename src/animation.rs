pub mod camera;
pub mod ease;
pub mod sequencer;
