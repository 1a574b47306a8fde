use argh::FromArgs;
use infernum_lens::{Config, GeminiClient, InfernumEngine, server};
use std::sync::Arc;

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Infernum Lens: upload an image and let a hosted multimodal model describe it.
struct LensArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// the Gemini model to query (overrides GEMINI_MODEL)
    #[argh(option, short = 'm')]
    model: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: LensArgs = argh::from_env();

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    log::debug!("{:?}", config);

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    // the blocking client is built here, outside the async runtime, and then
    // lives on the engine's worker thread
    let model = GeminiClient::new(&config)?;
    let engine = Arc::new(InfernumEngine::new(model));
    let app = server::router(engine, config.max_upload_bytes)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        log::info!("🚀 Starting the server");
        log::info!("🔥 Listening on: {}", addr);
        log::info!("🔧 Press Ctrl+C to stop the server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        server::serve(listener, app).await
    })?;

    Ok(())
}
