//! Prompt text and reply schema for the vision model.

use serde::Deserialize;

pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert culinary assistant. Your task is to identify the food
ingredient shown in a photo.

Rules:
1. Name the single most prominent ingredient using its common English name.
2. Estimate how certain you are as a number between 0 and 1.
3. If no food ingredient is visible, answer with your best guess and a
   confidence close to 0.
4. Reply with ONLY a JSON object of the form
   {\"ingredientName\": \"<name>\", \"confidence\": <number>}.";

pub const USER_INSTRUCTION: &str = "Identify the ingredient in this photo.";

/// Reply body requested from the model.  `name` is accepted as an alias
/// because some models shorten the key.
#[derive(Debug, Deserialize)]
pub struct RecognitionReply {
    #[serde(rename = "ingredientName", alias = "name")]
    pub ingredient_name: String,
    pub confidence: f32,
}

/// Chat message list for one image, given as a data URI.
pub fn build_messages(image_data_uri: &str) -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({ "role": "system", "content": SYSTEM_INSTRUCTION }),
        serde_json::json!({
            "role": "user",
            "content": [
                { "type": "text", "text": USER_INSTRUCTION },
                { "type": "image_url", "image_url": { "url": image_data_uri } }
            ]
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_image_as_data_uri() {
        let messages = build_messages("data:image/jpeg;base64,AAAA");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(
            messages[1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn reply_accepts_name_alias() {
        let reply: RecognitionReply =
            serde_json::from_str(r#"{"name": "Basil", "confidence": 0.4}"#).unwrap();
        assert_eq!(reply.ingredient_name, "Basil");
    }
}
