mod common;

use analysis_service::services::providers::mock::{MockBehavior, MockProvider};
use base64::Engine;
use common::{analyze_form, image_part, png_bytes, spawn_app, spawn_app_with, test_config};
use reqwest::multipart::{Form, Part};

const PIXTRAL_ID: &str = "mistralai/pixtral-12b";
const LLAMA_ID: &str = "meta-llama/llama-3-2-11b-vision-instruct";

async fn error_message(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "error");
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn missing_image_is_rejected() {
    let app = spawn_app().await;

    let form = Form::new().text("prompt", "Describe the findings");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "No image file provided");
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn non_multipart_body_gets_json_error() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/analyze"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("prompt=describe")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json")));
    assert_eq!(error_message(response).await, "No image file provided");
}

#[tokio::test]
async fn missing_prompt_is_rejected() {
    let app = spawn_app().await;

    let form = Form::new().part("image", image_part(png_bytes(8, 8), "scan.png"));
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "No analysis prompt provided");
}

#[tokio::test]
async fn image_without_file_name_is_rejected() {
    let app = spawn_app().await;

    let form = Form::new()
        .part("image", Part::bytes(png_bytes(8, 8)))
        .text("prompt", "Describe the findings");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "No image file selected");
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let app = spawn_app().await;

    let form = Form::new()
        .part("image", image_part(b"plain text".to_vec(), "notes.txt"))
        .text("prompt", "Describe the findings");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 400);
    assert_eq!(
        error_message(response).await,
        "Unsupported file type. Allowed: png, jpg, jpeg, gif, bmp, webp"
    );
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn undecodable_image_is_a_processing_error() {
    let app = spawn_app().await;

    let form = Form::new()
        .part("image", image_part(b"definitely not a png".to_vec(), "scan.png"))
        .text("prompt", "Describe the findings");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 500);
    assert!(error_message(response)
        .await
        .starts_with("Image processing failed"));
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn large_image_is_downscaled_and_sent_to_every_model() {
    let provider = MockProvider::new()
        .with_behavior(PIXTRAL_ID, MockBehavior::Reply("Pixtral sees a lesion.".to_string()))
        .with_behavior(LLAMA_ID, MockBehavior::Reply("Llama sees a lesion.".to_string()));
    let app = spawn_app_with(test_config(), provider).await;

    let form = Form::new()
        .part("image", image_part(png_bytes(4000, 3000), "dermatology.PNG"))
        .text("prompt", "Describe the lesion");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "success");
    assert_eq!(body["prompt"], "Describe the lesion");

    let results = body["results"].as_object().expect("results object");
    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["pixtral", "llama_vision"]);
    assert_eq!(results["pixtral"]["status"], "success");
    assert_eq!(results["pixtral"]["model_name"], "Pixtral 12B");
    assert_eq!(results["pixtral"]["response"], "Pixtral sees a lesion.");
    assert_eq!(results["llama_vision"]["response"], "Llama sees a lesion.");

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.max_tokens, 300);
        assert!(call.message.text().contains("Describe the lesion"));
    }

    // Both models receive the same normalized JPEG.
    let first: Vec<String> = calls[0].message.image_urls().map(str::to_string).collect();
    let second: Vec<String> = calls[1].message.image_urls().map(str::to_string).collect();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);

    let payload = first[0]
        .strip_prefix("data:image/jpeg;base64,")
        .expect("jpeg data uri");
    let jpeg = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .expect("valid base64");
    let decoded = image::load_from_memory(&jpeg).expect("decodable jpeg");
    assert_eq!((decoded.width(), decoded.height()), (2048, 1536));
}

#[tokio::test]
async fn one_failing_model_does_not_fail_the_request() {
    let provider = MockProvider::new()
        .with_behavior(PIXTRAL_ID, MockBehavior::Reply("Looks benign.".to_string()))
        .with_behavior(LLAMA_ID, MockBehavior::Fail("model overloaded".to_string()));
    let app = spawn_app_with(test_config(), provider).await;

    let response = app.post_analyze(analyze_form("Is this benign?")).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["results"]["pixtral"]["status"], "success");
    assert_eq!(body["results"]["llama_vision"]["status"], "error");
    assert_eq!(body["results"]["llama_vision"]["model_name"], "Llama 3.2 11B Vision");
    assert!(body["results"]["llama_vision"]["error"]
        .as_str()
        .is_some_and(|e| e.contains("model overloaded")));
    assert!(body["results"]["llama_vision"].get("response").is_none());
}

#[tokio::test]
async fn models_field_selects_a_subset() {
    let app = spawn_app().await;

    let form = analyze_form("Describe the findings").text("models", "llama_vision");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let results = body["results"].as_object().expect("results object");
    assert_eq!(results.len(), 1);
    assert!(results.contains_key("llama_vision"));

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model_id, LLAMA_ID);
}

#[tokio::test]
async fn unknown_model_is_rejected() {
    let app = spawn_app().await;

    let form = analyze_form("Describe the findings").text("models", "pixtral, gpt-vision");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 400);
    let message = error_message(response).await;
    assert!(message.contains("gpt-vision"));
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn analysis_without_credentials_is_not_initialized() {
    let app = spawn_app_with(test_config(), MockProvider::unavailable()).await;

    let response = app.post_analyze(analyze_form("Describe the findings")).await;

    assert_eq!(response.status(), 500);
    assert_eq!(error_message(response).await, "Inference models not initialized");
}

#[tokio::test]
async fn oversized_upload_is_rejected_with_413() {
    let mut config = test_config();
    config.limits.max_upload_bytes = 1024 * 1024;
    let app = spawn_app_with(config, MockProvider::new()).await;

    let form = Form::new()
        .part("image", image_part(vec![0u8; 1024 * 1024 + 256 * 1024], "huge.png"))
        .text("prompt", "Describe the findings");
    let response = app.post_analyze(form).await;

    assert_eq!(response.status(), 413);
    assert_eq!(
        error_message(response).await,
        "File too large. Maximum size is 1MB."
    );
    assert!(app.provider.calls().is_empty());
}
