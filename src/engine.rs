use crate::{
    model::{GenerativeModel, RequestMetadata, get_response},
    prompt::Prompt,
    upload::UploadedImage,
};
use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

type Reply<E> = mpsc::Sender<Result<InfernumEngineResponse, E>>;

/// Represents the current state of the inference engine.
#[derive(Clone, Debug, PartialEq)]
pub enum InfernumEngineState {
    /// The engine is idle and ready to accept new inference requests.
    Idle,
    /// The engine is currently waiting on the remote model.
    Processing,
}

impl InfernumEngineState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfernumEngineState::Idle => "idle",
            InfernumEngineState::Processing => "processing",
        }
    }
}

/// Errors returned by [`InfernumEngine::infer`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError<E: std::error::Error + 'static> {
    /// The worker thread is gone, either stopped or never answered.
    #[error("inference engine is not running")]
    Stopped,

    /// The remote model call failed.
    #[error(transparent)]
    Model(E),
}

/// Internal request wrapper used by the engine to track inference requests.
struct InfernumEngineRequest<E> {
    id: u64,
    prompt: Prompt,
    image: UploadedImage,
    reply_tx: Reply<E>,
}

/// Response returned by the engine containing both the model's text and telemetry data.
#[derive(Clone, Debug)]
pub struct InfernumEngineResponse {
    /// Unique identifier of the request, increasing per engine.
    pub id: u64,
    /// Timestamp when the inference started.
    pub start_time: Instant,
    /// Total time taken for the inference.
    pub duration: Duration,
    /// Lightweight metadata extracted from the original request.
    pub request_metadata: RequestMetadata,
    /// The text generated by the model, verbatim.
    pub response: String,
}

/// Owns the configured model on a dedicated worker thread.
///
/// The model client is built once, moved into the worker by [`InfernumEngine::new`]
/// and lives there until the engine is stopped or dropped. Requests are processed
/// one at a time, in the order they arrive.
pub struct InfernumEngine<M: GenerativeModel + Send + 'static> {
    model_id: String,
    state: Arc<Mutex<InfernumEngineState>>,
    req_tx: Option<mpsc::Sender<InfernumEngineRequest<M::Error>>>,
    inference_handle: Option<JoinHandle<()>>,
    id_counter: AtomicU64,
}

impl<M: GenerativeModel + Send + 'static> InfernumEngine<M> {
    /// Creates a new inference engine with the given model.
    ///
    /// The engine spawns a background thread that owns the model and serves
    /// every request made through [`InfernumEngine::infer`].
    pub fn new(mut model: M) -> Self {
        let model_id = model.model_id().to_string();
        let (req_tx, req_rx) = mpsc::channel::<InfernumEngineRequest<M::Error>>();
        let state = Arc::new(Mutex::new(InfernumEngineState::Idle));

        let inference_handle = std::thread::spawn({
            let state = state.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Scheduling inference #{}", req.id);

                    // Extract lightweight metadata before the image moves into the model
                    let request_metadata = RequestMetadata::new(&req.prompt, &req.image);

                    set_state(&state, InfernumEngineState::Processing);
                    let start_time = Instant::now();

                    let result = get_response(&mut model, &req.prompt, req.image);
                    let duration = start_time.elapsed();

                    set_state(&state, InfernumEngineState::Idle);

                    let reply = match result {
                        Ok(response) => {
                            log::debug!("Inference #{} completed in {:?}", req.id, duration);
                            Ok(InfernumEngineResponse {
                                id: req.id,
                                start_time,
                                duration,
                                request_metadata,
                                response,
                            })
                        }
                        Err(e) => {
                            log::error!("Inference #{} failed: {}", req.id, e);
                            Err(e)
                        }
                    };

                    if req.reply_tx.send(reply).is_err() {
                        log::warn!("Caller of inference #{} went away", req.id);
                    }
                }
                log::debug!("Inference worker shutting down");
            }
        });

        Self {
            model_id,
            state,
            req_tx: Some(req_tx),
            inference_handle: Some(inference_handle),
            id_counter: AtomicU64::new(0),
        }
    }

    /// Name of the model the worker owns.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns the current state of the inference engine.
    pub fn state(&self) -> InfernumEngineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs one inference and blocks until the worker answers.
    ///
    /// Must not be called from an async context; wrap it in
    /// `tokio::task::spawn_blocking` there.
    pub fn infer(
        &self,
        prompt: Prompt,
        image: UploadedImage,
    ) -> Result<InfernumEngineResponse, EngineError<M::Error>> {
        let tx = self.req_tx.as_ref().ok_or(EngineError::Stopped)?;
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = mpsc::channel();

        tx.send(InfernumEngineRequest {
            id,
            prompt,
            image,
            reply_tx,
        })
        .map_err(|_| EngineError::Stopped)?;

        reply_rx
            .recv()
            .map_err(|_| EngineError::Stopped)?
            .map_err(EngineError::Model)
    }

    /// Stops the inference engine and shuts down the background thread.
    ///
    /// Closes the request channel and waits for the worker to finish any
    /// request already queued.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.inference_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<M: GenerativeModel + Send + 'static> Drop for InfernumEngine<M> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_state(state: &Mutex<InfernumEngineState>, next: InfernumEngineState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}
