pub mod controls;
pub mod scene;
pub mod waveform;
