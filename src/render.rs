use crate::shell::{ShellState, Warning};
use minijinja::{Environment, Value};
use serde::Serialize;

const PAGE: &str = "page.html";

/// Error raised while building or rendering the page template.
#[derive(Debug, thiserror::Error)]
#[error("page template error: {0}")]
pub struct RenderError(#[from] minijinja::Error);

/// Renders the single page of the UI.
///
/// The template is registered under an `.html` name, so every value
/// interpolated into it is HTML-escaped.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(PAGE, include_str!("templates/page.html"))?;
        Ok(Self { env })
    }

    /// Renders the whole page for `state`.
    pub fn page(&self, model_id: &str, state: &ShellState) -> Result<String, RenderError> {
        let template = self.env.get_template(PAGE)?;
        Ok(template.render(PageView::new(model_id, state))?)
    }
}

/// Everything the template reads, flattened out of a [`ShellState`].
#[derive(Serialize)]
struct PageView<'a> {
    model: &'a str,
    state: &'static str,
    prompt: &'a str,
    image: Option<ImageView>,
    warning: Option<String>,
    response: Option<ResponseView<'a>>,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct ImageView {
    // base64 output needs no escaping and must round-trip through the form untouched
    data_uri: Value,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct ResponseView<'a> {
    id: u64,
    text: &'a str,
    mode: String,
    seconds: String,
}

impl<'a> PageView<'a> {
    fn new(model: &'a str, state: &'a ShellState) -> Self {
        let image = state.image().map(|image| {
            let (width, height) = image.size();
            ImageView {
                data_uri: Value::from_safe_string(image.to_data_uri()),
                width,
                height,
            }
        });

        let (response, error) = match state.outcome() {
            Some(Ok(response)) => (
                Some(ResponseView {
                    id: response.id,
                    text: &response.response,
                    mode: response.request_metadata.mode.as_str().replace('_', " "),
                    seconds: format!("{:.2}", response.duration.as_secs_f64()),
                }),
                None,
            ),
            Some(Err(message)) => (None, Some(message.as_str())),
            None => (None, None),
        };

        Self {
            model,
            state: state.name(),
            prompt: state.prompt().as_str(),
            image,
            warning: state.warning().map(Warning::message),
            response,
            error,
        }
    }
}
