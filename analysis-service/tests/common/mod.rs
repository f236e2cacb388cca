//! Shared setup for analysis-service integration tests.
//!
//! Every test gets its own server on a random port, backed by a scripted
//! `MockProvider` instead of watsonx.ai.

#![allow(dead_code)]

use analysis_service::config::AnalysisConfig;
use analysis_service::services::providers::mock::MockProvider;
use analysis_service::services::providers::InferenceProvider;
use analysis_service::startup::Application;
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub provider: Arc<MockProvider>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_analyze(&self, form: Form) -> reqwest::Response {
        self.client
            .post(self.url("/api/analyze"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send analyze request")
    }

    pub async fn post_chat(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .expect("Failed to send chat request")
    }
}

/// Defaults on loopback with an OS-assigned port.
pub fn test_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.common.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.common.port = 0;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), MockProvider::new()).await
}

pub async fn spawn_app_with(config: AnalysisConfig, provider: MockProvider) -> TestApp {
    let provider = Arc::new(provider);
    let dyn_provider: Arc<dyn InferenceProvider> = provider.clone();

    let app = Application::build_with_provider(config, dyn_provider)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    TestApp {
        address,
        client: Client::new(),
        provider,
    }
}

/// Solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 40, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    out.into_inner()
}

pub fn image_part(bytes: Vec<u8>, file_name: &str) -> Part {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .expect("Invalid mime type")
}

/// Multipart form with a small PNG and the given prompt.
pub fn analyze_form(prompt: &str) -> Form {
    Form::new()
        .part("image", image_part(png_bytes(64, 48), "scan.png"))
        .text("prompt", prompt.to_string())
}
