use crate::{
    engine::{EngineError, InfernumEngine},
    messages::{DescribeResponse, ErrorResponse, StatusResponse},
    model::GenerativeModel,
    prompt::Prompt,
    render::{PageRenderer, RenderError},
    shell::{ShellState, Warning},
    upload::{ImageError, UploadedImage},
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Room for the multipart framing and the prompt field.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Errors raised while serving a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("malformed form data: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("malformed form data: {}", .0.body_text())]
    Form(#[from] MultipartRejection),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("please upload an image first")]
    MissingImage,

    #[error("{0}")]
    Model(String),

    #[error("inference engine is not running")]
    Unavailable,

    #[error("inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::Multipart(e) => e.status(),
            SubmissionError::Form(e) => e.status(),
            SubmissionError::Image(_) | SubmissionError::MissingImage => StatusCode::BAD_REQUEST,
            SubmissionError::Model(_) => StatusCode::BAD_GATEWAY,
            SubmissionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            SubmissionError::Task(_) | SubmissionError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl<E: std::error::Error + 'static> From<EngineError<E>> for SubmissionError {
    fn from(err: EngineError<E>) -> Self {
        match err {
            EngineError::Stopped => SubmissionError::Unavailable,
            EngineError::Model(e) => SubmissionError::Model(e.to_string()),
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Shared handler state: the one engine built at startup and the page template.
pub struct AppState<M: GenerativeModel + Send + 'static> {
    engine: Arc<InfernumEngine<M>>,
    renderer: Arc<PageRenderer>,
    max_upload_bytes: usize,
}

impl<M: GenerativeModel + Send + 'static> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            renderer: self.renderer.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl<M: GenerativeModel + Send + 'static> AppState<M> {
    fn page(&self, shell: &ShellState) -> Result<Html<String>, RenderError> {
        Ok(Html(self.renderer.page(self.engine.model_id(), shell)?))
    }
}

/// Builds the application routes around `engine`.
///
/// Each uploaded image may be up to `max_upload_bytes`. The request body may
/// be larger, since the page posts the previous image back as a data URI.
pub fn router<M: GenerativeModel + Send + 'static>(
    engine: Arc<InfernumEngine<M>>,
    max_upload_bytes: usize,
) -> Result<Router, RenderError> {
    let state = AppState {
        engine,
        renderer: Arc::new(PageRenderer::new()?),
        max_upload_bytes,
    };

    Ok(Router::new()
        .route("/", get(get_page::<M>).post(post_page::<M>))
        .route("/api/describe", post(post_describe::<M>))
        .route("/status", get(get_status::<M>))
        .layer(DefaultBodyLimit::max(body_limit(max_upload_bytes)))
        .with_state(state))
}

/// Largest form body: a fresh upload, the retained image in base64 and the framing.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    let retained = max_upload_bytes.div_ceil(3).saturating_mul(4);
    max_upload_bytes
        .saturating_add(retained)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

/// Serves `app` until Ctrl+C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            log::info!("Shutting down");
        })
        .await
}

async fn get_page<M: GenerativeModel + Send + 'static>(
    State(state): State<AppState<M>>,
) -> Result<Html<String>, SubmissionError> {
    Ok(state.page(&ShellState::new())?)
}

async fn post_page<M: GenerativeModel + Send + 'static>(
    State(state): State<AppState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, SubmissionError> {
    let submission = match read_submission(multipart, state.max_upload_bytes).await {
        Ok(submission) => submission,
        Err(e) => {
            log::warn!("Unreadable form: {}", e);
            let reason = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                "the upload is too large".to_string()
            } else {
                e.to_string()
            };
            let shell = ShellState::rejected(Prompt::default(), Warning::UnreadableForm(reason));
            return Ok((e.status(), state.page(&shell)?).into_response());
        }
    };

    let shell = match submission.image {
        Some(Err(e)) => {
            log::warn!("Rejected upload: {}", e);
            ShellState::rejected(submission.prompt, Warning::RejectedUpload(e.to_string()))
        }
        Some(Ok(image)) => {
            let engine = state.engine.clone();
            let ready = ShellState::from_inputs(submission.prompt, Some(image));
            tokio::task::spawn_blocking(move || {
                ready.submit(|prompt, image| {
                    engine
                        .infer(prompt, image)
                        .map_err(|e| SubmissionError::from(e).to_string())
                })
            })
            .await?
        }
        None => {
            log::warn!("Submission without an image");
            ShellState::from_inputs(submission.prompt, None).submit(|_, _| {
                Err(SubmissionError::MissingImage.to_string())
            })
        }
    };

    Ok(state.page(&shell)?.into_response())
}

async fn post_describe<M: GenerativeModel + Send + 'static>(
    State(state): State<AppState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DescribeResponse>, SubmissionError> {
    let submission = read_submission(multipart, state.max_upload_bytes).await?;
    let image = submission.image.ok_or(SubmissionError::MissingImage)??;

    let engine = state.engine.clone();
    let prompt = submission.prompt;
    let result = tokio::task::spawn_blocking(move || engine.infer(prompt, image))
        .await?
        .map_err(SubmissionError::from)
        .inspect_err(|e| log::error!("Describe request failed: {}", e))?;

    log::info!("Inference #{} answered in {:?}", result.id, result.duration);
    Ok(Json(result.into()))
}

async fn get_status<M: GenerativeModel + Send + 'static>(
    State(state): State<AppState<M>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.engine.state().as_str().to_string(),
        model: state.engine.model_id().to_string(),
    })
}

/// The widget values of one form post.
struct Submission {
    prompt: Prompt,
    /// A fresh upload wins over the retained one; `None` when neither was sent.
    image: Option<Result<UploadedImage, ImageError>>,
}

async fn read_submission(
    multipart: Result<Multipart, MultipartRejection>,
    max_upload_bytes: usize,
) -> Result<Submission, SubmissionError> {
    let mut multipart = multipart?;
    let mut prompt = Prompt::default();
    let mut upload = None;
    let mut retained = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => prompt = Prompt::new(field.text().await?),
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                upload = Some(if bytes.len() > max_upload_bytes {
                    Err(ImageError::TooLarge {
                        size: bytes.len(),
                        limit: max_upload_bytes,
                    })
                } else {
                    UploadedImage::from_upload(&file_name, bytes.to_vec())
                });
            }
            Some("retained_image") => {
                let uri = field.text().await?;
                if !uri.trim().is_empty() {
                    retained = Some(UploadedImage::from_data_uri(&uri));
                }
            }
            _ => {}
        }
    }

    Ok(Submission {
        prompt,
        image: upload.or(retained),
    })
}
