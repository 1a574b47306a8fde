//! The page's state machine.
//!
//! Every request to the page builds a [`ShellState`] from the submitted
//! widgets and moves it forward with [`ShellState::submit`]:
//!
//! ```text
//! Idle ──submit──▶ Idle (warning, no call)
//! Ready ──submit──▶ Displayed (one call)
//! Displayed ──submit──▶ Ready ──▶ Displayed
//! ```

use crate::{engine::InfernumEngineResponse, prompt::Prompt, upload::UploadedImage};

/// Result of the single inference made from `Ready`; errors are kept as display text.
pub type Outcome = Result<InfernumEngineResponse, String>;

/// Non-fatal notices shown above the controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Submitted without any image.
    MissingImage,
    /// The uploaded file was refused (wrong extension, corrupt content).
    RejectedUpload(String),
    /// The form itself could not be read, e.g. the body was too large.
    UnreadableForm(String),
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Warning::MissingImage => "Please upload an image first.".to_string(),
            Warning::RejectedUpload(reason) => format!("Could not use that file: {reason}"),
            Warning::UnreadableForm(reason) => format!("Could not read the submitted form: {reason}"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ShellState {
    /// No image held.
    Idle {
        prompt: Prompt,
        warning: Option<Warning>,
    },
    /// An image is held and the page is ready to analyze it.
    Ready { prompt: Prompt, image: UploadedImage },
    /// A response (or failure) is shown below the live controls.
    Displayed {
        prompt: Prompt,
        image: UploadedImage,
        outcome: Outcome,
    },
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    /// Fresh page load.
    pub fn new() -> Self {
        Self::Idle {
            prompt: Prompt::default(),
            warning: None,
        }
    }

    /// State implied by the current widget contents.
    pub fn from_inputs(prompt: Prompt, image: Option<UploadedImage>) -> Self {
        match image {
            Some(image) => Self::Ready { prompt, image },
            None => Self::Idle {
                prompt,
                warning: None,
            },
        }
    }

    /// Idle with the reason an upload was refused.
    pub fn rejected(prompt: Prompt, warning: Warning) -> Self {
        Self::Idle {
            prompt,
            warning: Some(warning),
        }
    }

    /// Handles a press of the analyze button.
    ///
    /// `infer` runs exactly once when an image is held and never otherwise.
    pub fn submit<F>(self, infer: F) -> Self
    where
        F: FnOnce(Prompt, UploadedImage) -> Outcome,
    {
        match self {
            Self::Idle { prompt, .. } => Self::Idle {
                prompt,
                warning: Some(Warning::MissingImage),
            },
            Self::Ready { prompt, image } => {
                let outcome = infer(prompt.clone(), image.clone());
                Self::Displayed {
                    prompt,
                    image,
                    outcome,
                }
            }
            Self::Displayed { prompt, image, .. } => Self::Ready { prompt, image }.submit(infer),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::Ready { .. } => "ready",
            Self::Displayed { .. } => "displayed",
        }
    }

    pub fn prompt(&self) -> &Prompt {
        match self {
            Self::Idle { prompt, .. } | Self::Ready { prompt, .. } | Self::Displayed { prompt, .. } => {
                prompt
            }
        }
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            Self::Idle { .. } => None,
            Self::Ready { image, .. } | Self::Displayed { image, .. } => Some(image),
        }
    }

    pub fn warning(&self) -> Option<&Warning> {
        match self {
            Self::Idle { warning, .. } => warning.as_ref(),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Displayed { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}
