//! Image-to-text web UI backed by a hosted multimodal model.
//!
//! A user uploads a JPEG or PNG, optionally types a prompt and gets back the
//! text the model generates. The pieces:
//!
//! * [`model`]: the [`GenerativeModel`] seam and the inference call itself
//! * [`gemini`]: the Gemini REST implementation of that seam
//! * [`engine`]: the worker thread that owns the configured model
//! * [`shell`] and [`render`]: the page state machine and its HTML
//! * [`server`]: the axum routes tying it all together

pub mod config;
pub mod engine;
pub mod gemini;
pub mod messages;
pub mod mock;
pub mod model;
pub mod prompt;
pub mod render;
pub mod server;
pub mod shell;
pub mod upload;

pub use config::Config;
pub use engine::{EngineError, InfernumEngine, InfernumEngineResponse, InfernumEngineState};
pub use gemini::{GeminiClient, GeminiError};
pub use model::{Content, ContentMode, GenerativeModel, RequestMetadata, get_response};
pub use prompt::Prompt;
pub use shell::{ShellState, Warning};
pub use upload::{ImageError, ImageFormat, UploadedImage};
