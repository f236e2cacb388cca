//! Chat-style message structure sent to hosted models.
//!
//! Serializes in the OpenAI-compatible shape accepted by the watsonx.ai chat
//! endpoint: role-tagged turns whose content is an ordered list of typed parts.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

/// Instruction handed to every model of a request. Built once, shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelMessage {
    turns: Vec<Turn>,
}

impl ModelMessage {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            turns: vec![Turn {
                role: Role::User,
                content,
            }],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Concatenated text parts, for logging and assertions.
    pub fn text(&self) -> String {
        self.turns
            .iter()
            .flat_map(|turn| turn.content.iter())
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .flat_map(|turn| turn.content.iter())
            .filter_map(|part| match part {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                ContentPart::Text { .. } => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_chat_turns() {
        let message = ModelMessage::user(vec![
            ContentPart::Text {
                text: "describe".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/jpeg;base64,AAAA".to_string(),
                },
            },
        ]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!([{
                "role": "user",
                "content": [
                    { "type": "text", "text": "describe" },
                    { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAAA" } }
                ]
            }])
        );
    }
}
