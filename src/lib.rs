pub mod config_loader;
pub mod orchestrator;
pub mod playback;
pub mod styles;
pub mod synthesis;
pub mod turn;
