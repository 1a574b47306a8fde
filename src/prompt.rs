/// Free-form text typed next to the uploaded image.
///
/// The prompt is kept exactly as typed. Whitespace is only trimmed to decide
/// whether the prompt counts as present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Wraps the raw text of the prompt field.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The text as typed, untrimmed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the prompt holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The untrimmed text, or `None` when the prompt is blank.
    pub fn text(&self) -> Option<&str> {
        (!self.is_blank()).then_some(self.0.as_str())
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self(text)
    }
}
