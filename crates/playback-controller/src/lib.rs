//! Queue-driven playback control on top of a pluggable audio engine.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod observer;
mod queue;
pub mod resource;
pub mod session;
pub mod silent;

pub use config::ControllerConfig;
pub use controller::PlaybackController;
pub use engine::{AudioEngine, Completion};
pub use error::{ControllerError, EngineError};
pub use observer::{ChannelObserver, PlaybackObserver};
pub use playback_types::{ControllerStatus, PlaybackEndReason, PlaybackEvent, PlaybackState};
pub use resource::{IntoResource, ResourceId};
pub use silent::{SilentEngine, SilentEngineConfig};
