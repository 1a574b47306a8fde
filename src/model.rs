use crate::{prompt::Prompt, upload::UploadedImage};

/// What gets sent to the remote model for one submission.
///
/// The remote API treats "image + text" and "image only" as distinct calls,
/// so the two shapes are kept apart here. Both always carry an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// The image alone; the prompt was blank.
    ImageOnly(UploadedImage),
    /// The untrimmed prompt, followed by the image.
    PromptAndImage { prompt: String, image: UploadedImage },
}

impl Content {
    /// Picks the call shape from the prompt: a blank prompt is dropped.
    pub fn new(prompt: &Prompt, image: UploadedImage) -> Self {
        match prompt.text() {
            Some(text) => Self::PromptAndImage {
                prompt: text.to_string(),
                image,
            },
            None => Self::ImageOnly(image),
        }
    }

    pub fn image(&self) -> &UploadedImage {
        match self {
            Self::ImageOnly(image) | Self::PromptAndImage { image, .. } => image,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::ImageOnly(_) => None,
            Self::PromptAndImage { prompt, .. } => Some(prompt),
        }
    }

    pub fn mode(&self) -> ContentMode {
        match self {
            Self::ImageOnly(_) => ContentMode::ImageOnly,
            Self::PromptAndImage { .. } => ContentMode::PromptAndImage,
        }
    }
}

/// Which of the two call shapes was used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentMode {
    ImageOnly,
    PromptAndImage,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentMode::ImageOnly => "image_only",
            ContentMode::PromptAndImage => "prompt_and_image",
        }
    }
}

/// Lightweight description of a request, kept alongside its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMetadata {
    pub prompt: Option<String>,
    pub mode: ContentMode,
    pub mime_type: &'static str,
    pub image_size: (u32, u32),
}

impl RequestMetadata {
    /// Describes the call [`get_response`] will make for these inputs.
    pub fn new(prompt: &Prompt, image: &UploadedImage) -> Self {
        let text = prompt.text();
        Self {
            prompt: text.map(str::to_string),
            mode: if text.is_some() {
                ContentMode::PromptAndImage
            } else {
                ContentMode::ImageOnly
            },
            mime_type: image.mime_type(),
            image_size: image.size(),
        }
    }
}

/// A hosted multimodal model that turns an image, and optionally text, into text.
///
/// Implementations are built once at startup and then owned by the
/// [`InfernumEngine`](crate::InfernumEngine) worker thread.
pub trait GenerativeModel {
    /// The error type that can be returned by the remote call.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name of the remote model, shown in the page header.
    fn model_id(&self) -> &str;

    /// Sends `content` to the model and returns the generated text verbatim.
    fn generate_content(&mut self, content: Content) -> Result<String, Self::Error>;
}

/// Runs one inference: image-only when the prompt is blank, prompt and image otherwise.
pub fn get_response<M: GenerativeModel>(
    model: &mut M,
    prompt: &Prompt,
    image: UploadedImage,
) -> Result<String, M::Error> {
    let content = Content::new(prompt, image);
    log::debug!("Sending {} request to {}", content.mode().as_str(), model.model_id());
    model.generate_content(content)
}
