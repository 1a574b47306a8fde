use infernum_lens::{
    ContentMode, InfernumEngine,
    messages::{DescribeResponse, ErrorResponse, StatusResponse},
    mock::RecordingModel,
    server,
};
use reqwest::multipart::{Form, Part};
use std::{io::Cursor, sync::Arc};
use tokio::net::TcpListener;

fn encoded(format: image::ImageFormat) -> Vec<u8> {
    let bitmap = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    bitmap
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode test image");
    bytes
}

fn jpeg_part() -> Part {
    Part::bytes(encoded(image::ImageFormat::Jpeg))
        .file_name("photo.jpg")
        .mime_str("image/jpeg")
        .expect("mime")
}

fn png_part() -> Part {
    Part::bytes(encoded(image::ImageFormat::Png))
        .file_name("shot.png")
        .mime_str("image/png")
        .expect("mime")
}

/// A PNG of pseudo-random pixels, so it barely compresses.
fn noisy_png(side: u32, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let bitmap = image::RgbImage::from_fn(side, side, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });
    let mut bytes = Vec::new();
    bitmap
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode noisy image");
    bytes
}

async fn spawn_app(model: RecordingModel) -> String {
    spawn_app_with_limit(model, 1024 * 1024).await
}

async fn spawn_app_with_limit(model: RecordingModel, max_upload_bytes: usize) -> String {
    let engine = Arc::new(InfernumEngine::new(model));
    let app = server::router(engine, max_upload_bytes).expect("router");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{addr}")
}

async fn post_page(base: &str, form: Form) -> (reqwest::StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("{base}/"))
        .multipart(form)
        .send()
        .await
        .expect("post page");
    let status = response.status();
    (status, response.text().await.expect("page body"))
}

async fn submit_page(base: &str, form: Form) -> String {
    let (status, html) = post_page(base, form).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    html
}

fn retained_image(html: &str) -> String {
    let marker = "name=\"retained_image\" value=\"";
    let start = html.find(marker).expect("retained image field") + marker.len();
    let end = html[start..].find('"').expect("closing quote") + start;
    html[start..end].to_string()
}

#[tokio::test]
async fn test_get_page_starts_idle() {
    let base = spawn_app(RecordingModel::new(vec!["unused".to_string()])).await;

    let html = reqwest::get(format!("{base}/"))
        .await
        .expect("get page")
        .text()
        .await
        .expect("body");

    assert!(html.contains("📷 Image to Text Generator"));
    assert!(html.contains("data-state=\"idle\""));
    assert!(html.contains("mock-model"));
}

#[tokio::test]
async fn test_submit_without_image_warns() {
    let model = RecordingModel::new(vec!["unused".to_string()]);
    let base = spawn_app(model.clone()).await;

    let html = submit_page(&base, Form::new().text("prompt", "anything")).await;

    assert!(html.contains("⚠️ Please upload an image first."));
    assert!(html.contains("value=\"anything\""));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_empty_prompt_sends_image_only() {
    let model = RecordingModel::new(vec!["A red <square>.".to_string()]);
    let base = spawn_app(model.clone()).await;

    let form = Form::new().text("prompt", "").part("image", jpeg_part());
    let html = submit_page(&base, form).await;

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, ContentMode::ImageOnly);
    assert_eq!(calls[0].mime_type, "image/jpeg");
    assert!(html.contains("data-state=\"displayed\""));
    assert!(html.contains("A red &lt;square&gt;."));
}

#[tokio::test]
async fn test_prompt_and_png_are_both_sent() {
    let model = RecordingModel::new(vec!["It is red.".to_string()]);
    let base = spawn_app(model.clone()).await;

    let form = Form::new()
        .text("prompt", "Describe this photo")
        .part("image", png_part());
    submit_page(&base, form).await;

    let calls = model.calls();
    assert_eq!(calls[0].mode, ContentMode::PromptAndImage);
    assert_eq!(calls[0].prompt.as_deref(), Some("Describe this photo"));
    assert_eq!(calls[0].mime_type, "image/png");
}

#[tokio::test]
async fn test_whitespace_prompt_is_image_only() {
    let model = RecordingModel::new(vec!["ok".to_string()]);
    let base = spawn_app(model.clone()).await;

    let form = Form::new().text("prompt", "   ").part("image", png_part());
    submit_page(&base, form).await;

    assert_eq!(model.calls()[0].mode, ContentMode::ImageOnly);
}

#[tokio::test]
async fn test_resubmit_reuses_retained_image() {
    let model = RecordingModel::new(vec!["first".to_string(), "second".to_string()]);
    let base = spawn_app(model.clone()).await;

    let first = submit_page(&base, Form::new().text("prompt", "").part("image", png_part())).await;
    let retained = retained_image(&first);
    assert!(retained.starts_with("data:image/png;base64,"));

    let form = Form::new()
        .text("prompt", "What colour is it?")
        .part("image", Part::bytes(Vec::new()).file_name(""))
        .text("retained_image", retained);
    let second = submit_page(&base, form).await;

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].mode, ContentMode::PromptAndImage);
    assert_eq!(calls[1].image_len, calls[0].image_len);
    assert!(second.contains("second"));
}

#[tokio::test]
async fn test_new_upload_takes_precedence_over_retained_image() {
    let model = RecordingModel::new(vec!["first".to_string(), "second".to_string()]);
    let base = spawn_app(model.clone()).await;

    let first = submit_page(&base, Form::new().part("image", png_part())).await;
    let form = Form::new()
        .text("prompt", "And this one?")
        .part("image", jpeg_part())
        .text("retained_image", retained_image(&first));
    let second = submit_page(&base, form).await;

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].mime_type, "image/png");
    assert_eq!(calls[1].mime_type, "image/jpeg");
    assert!(retained_image(&second).starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_rejected_upload_does_not_fall_back_to_retained_image() {
    let model = RecordingModel::new(vec!["first".to_string(), "second".to_string()]);
    let base = spawn_app(model.clone()).await;

    let first = submit_page(&base, Form::new().part("image", png_part())).await;
    let gif = Part::bytes(b"GIF89a".to_vec()).file_name("anim.gif");
    let form = Form::new()
        .part("image", gif)
        .text("retained_image", retained_image(&first));
    let html = submit_page(&base, form).await;

    assert_eq!(model.calls().len(), 1);
    assert!(html.contains("data-state=\"idle\""));
    assert!(html.contains("unsupported file type: .gif"));
    assert!(!html.contains("retained_image"));
}

#[tokio::test]
async fn test_corrupt_images_are_rejected() {
    let model = RecordingModel::new(vec!["unused".to_string()]);
    let base = spawn_app(model.clone()).await;

    let mut truncated = encoded(image::ImageFormat::Jpeg);
    truncated.truncate(40);
    let broken_jpeg = Part::bytes(truncated).file_name("broken.jpg");
    let html = submit_page(&base, Form::new().part("image", broken_jpeg)).await;
    assert!(html.contains("data-state=\"idle\""));
    assert!(html.contains("Could not use that file: could not decode image"));

    let fake_png = Part::bytes(b"not an image".to_vec()).file_name("fake.png");
    let html = submit_page(&base, Form::new().part("image", fake_png)).await;
    assert!(html.contains("file content is not a JPEG or PNG image"));

    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_second_upload_fits_alongside_retained_image() {
    let model = RecordingModel::new(vec!["first".to_string(), "second".to_string()]);
    let limit = 64 * 1024;
    let base = spawn_app_with_limit(model.clone(), limit).await;

    let (first_bytes, second_bytes) = (noisy_png(128, 1), noisy_png(128, 2));
    assert!(first_bytes.len() < limit && second_bytes.len() < limit);

    let first = submit_page(
        &base,
        Form::new().part("image", Part::bytes(first_bytes).file_name("first.png")),
    )
    .await;
    let form = Form::new()
        .part("image", Part::bytes(second_bytes.clone()).file_name("second.png"))
        .text("retained_image", retained_image(&first));
    let second = submit_page(&base, form).await;

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].image_len, second_bytes.len());
    assert!(second.contains("data-state=\"displayed\""));
}

#[tokio::test]
async fn test_image_over_upload_limit_is_rejected() {
    let model = RecordingModel::new(vec!["unused".to_string()]);
    let base = spawn_app_with_limit(model.clone(), 16 * 1024).await;

    let big = Part::bytes(noisy_png(128, 3)).file_name("big.png");
    let html = submit_page(&base, Form::new().text("prompt", "hi").part("image", big)).await;

    assert!(html.contains("over the 16384 byte upload limit"));
    assert!(html.contains("value=\"hi\""));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_oversized_form_renders_page_warning() {
    let model = RecordingModel::new(vec!["unused".to_string()]);
    let base = spawn_app_with_limit(model.clone(), 16 * 1024).await;

    let huge = Part::bytes(noisy_png(256, 4)).file_name("huge.png");
    let (status, html) = post_page(&base, Form::new().part("image", huge)).await;

    assert_eq!(status, reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    assert!(html.contains("data-state=\"idle\""));
    assert!(html.contains("Could not read the submitted form: the upload is too large"));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let model = RecordingModel::new(vec!["unused".to_string()]);
    let base = spawn_app(model.clone()).await;

    let gif = Part::bytes(b"GIF89a".to_vec()).file_name("anim.gif");
    let html = submit_page(&base, Form::new().text("prompt", "x").part("image", gif)).await;

    assert!(html.contains("unsupported file type: .gif"));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_shown_on_page() {
    let model = RecordingModel::failing("quota exhausted");
    let base = spawn_app(model).await;

    let html = submit_page(&base, Form::new().part("image", png_part())).await;

    assert!(html.contains("class=\"error\""));
    assert!(html.contains("quota exhausted"));
}

#[tokio::test]
async fn test_describe_api_returns_json() {
    let model = RecordingModel::new(vec!["A red square.".to_string()]);
    let base = spawn_app(model).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/describe"))
        .multipart(Form::new().text("prompt", "What is it?").part("image", jpeg_part()))
        .send()
        .await
        .expect("post describe");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: DescribeResponse = response.json().await.expect("json");
    assert!(!body.response.is_empty());
    assert_eq!(body.mode, "prompt_and_image");
    assert_eq!(body.prompt.as_deref(), Some("What is it?"));
    assert_eq!(body.image.mime_type, "image/jpeg");
    assert_eq!((body.image.width, body.image.height), (4, 4));
}

#[tokio::test]
async fn test_describe_api_errors() {
    let base = spawn_app(RecordingModel::failing("API key not valid")).await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{base}/api/describe"))
        .multipart(Form::new().text("prompt", "anything"))
        .send()
        .await
        .expect("post describe");
    assert_eq!(missing.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorResponse = missing.json().await.expect("json");
    assert!(body.error.contains("upload an image"));

    let failed = client
        .post(format!("{base}/api/describe"))
        .multipart(Form::new().part("image", png_part()))
        .send()
        .await
        .expect("post describe");
    assert_eq!(failed.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = failed.json().await.expect("json");
    assert!(body.error.contains("API key not valid"));
}

#[tokio::test]
async fn test_status_reports_idle_engine() {
    let base = spawn_app(RecordingModel::new(vec![]).with_model_id("gemini-test")).await;

    let status: StatusResponse = reqwest::get(format!("{base}/status"))
        .await
        .expect("get status")
        .json()
        .await
        .expect("json");

    assert_eq!(status.status, "idle");
    assert_eq!(status.model, "gemini-test");
}
