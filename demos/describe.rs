use argh::FromArgs;
use infernum_lens::messages::{DescribeResponse, ErrorResponse, StatusResponse};
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Infernum Lens client for describing images and checking the server
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "describe" or "status"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Describe(DescribeCommand),
    Status(StatusCommand),
}

#[derive(FromArgs)]
/// Upload an image, with an optional prompt, and print the generated text
#[argh(subcommand, name = "describe")]
struct DescribeCommand {
    /// the path to the image (jpg, jpeg or png)
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// the prompt to use; omit to send the image alone
    #[argh(option, short = 'p', default = "String::new()")]
    prompt: String,
}

#[derive(FromArgs)]
/// Check whether the engine is idle or processing
#[argh(subcommand, name = "status")]
struct StatusCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    match args.command {
        ClientCommands::Describe(describe) => {
            let file_name = describe
                .image_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("image")
                .to_string();
            let bytes = tokio::fs::read(&describe.image_path).await?;

            let form = Form::new()
                .text("prompt", describe.prompt)
                .part("image", Part::bytes(bytes).file_name(file_name));

            let response = client
                .post(format!("http://{}/api/describe", addr))
                .multipart(form)
                .send()
                .await?;

            if response.status().is_success() {
                let result = response.json::<DescribeResponse>().await?;
                println!("Result: {}", serde_json::to_string_pretty(&result)?);
            } else {
                let status = response.status();
                let error = response.json::<ErrorResponse>().await?;
                return Err(format!("{}: {}", status, error.error).into());
            }
        }
        ClientCommands::Status(_) => {
            let result = client
                .get(format!("http://{}/status", addr))
                .send()
                .await?
                .json::<StatusResponse>()
                .await?;
            println!("Engine is {} ({})", result.status, result.model);
        }
    }

    Ok(())
}
