//! Instruction templates wrapped around user prompts.

use crate::models::{ContentPart, ImageUrl, ModelMessage};
use crate::services::image_normalizer::EncodedImage;

/// Message for the full analysis flow, with the image inlined when present.
pub fn compose(prompt: &str, image: Option<&EncodedImage>) -> ModelMessage {
    match image {
        Some(image) => ModelMessage::user(vec![
            ContentPart::Text {
                text: format!(
                    "You are a medical AI assistant. Analyze this medical image and respond to: {prompt}. \
                     Provide a detailed, professional medical assessment."
                ),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_uri(),
                },
            },
        ]),
        None => ModelMessage::user(vec![ContentPart::Text {
            text: format!(
                "You are a medical AI assistant. The user asks: \"{prompt}\"\n\n\
                 Provide a helpful, professional response with these guidelines:\n\
                 - Be concise but informative\n\
                 - Focus on medical accuracy\n\
                 - For specific medical advice, recommend consulting a professional\n\
                 - If the question is about image analysis, guide them to upload an image"
            ),
        }]),
    }
}

/// Message for the abbreviated chat flow.
pub fn compose_chat(message: &str) -> ModelMessage {
    ModelMessage::user(vec![ContentPart::Text {
        text: format!(
            "Provide a concise medical response to: \"{message}\"\n\n\
             Guidelines:\n\
             - Respond in 2-3 sentences maximum\n\
             - Focus on key medical facts\n\
             - For complex cases, recommend professional consultation\n\
             - If image analysis needed, request upload"
        ),
    }])
}
