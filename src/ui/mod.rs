pub mod canvas;
pub mod controls;
pub mod spectrogram;

pub use canvas::{EguiCanvas, TextureCache};
pub use controls::{ControlAction, ControlsPanel};
pub use spectrogram::SpectrogramView;
