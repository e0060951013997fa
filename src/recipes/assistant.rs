//! `RecipeAssistant` trait and the chat-backed `ApiRecipeAssistant`.
//!
//! The assistant consumes the confirmed ingredient list; it never feeds back
//! into the scan session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::chat::{parse_json_reply, ChatClient, ChatEndpoint, ChatError};
use crate::config::RecipeConfig;

use super::prompt::RecipePromptBuilder;

/// Recipes and rewritten instructions are long; leave the model room.
const MAX_REPLY_TOKENS: u32 = 2048;

// ---------------------------------------------------------------------------
// RecipeError
// ---------------------------------------------------------------------------

/// Errors that can occur during a recipe request.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// HTTP transport, connection or service error.
    #[error("recipe request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("recipe request timed out")]
    Timeout,

    /// The reply was not the expected JSON.
    #[error("failed to parse recipe response: {0}")]
    Parse(String),

    /// The reply had no usable content.
    #[error("recipe service returned an empty response")]
    EmptyResponse,

    /// `suggest` was called with no ingredients.
    #[error("no ingredients to suggest recipes for")]
    NoIngredients,
}

impl From<ChatError> for RecipeError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Request(msg) => RecipeError::Request(msg),
            ChatError::Timeout => RecipeError::Timeout,
            ChatError::Status { status, message } => {
                RecipeError::Request(format!("service returned {status}: {message}"))
            }
            ChatError::Parse(msg) => RecipeError::Parse(msg),
            ChatError::EmptyResponse => RecipeError::EmptyResponse,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Cooking experience the instructions are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestRecipesRequest {
    pub ingredients: Vec<String>,
    pub dietary_restrictions: Option<String>,
    pub cuisine_preferences: Option<String>,
}

impl SuggestRecipesRequest {
    pub fn new(ingredients: Vec<String>) -> Self {
        Self {
            ingredients,
            dietary_restrictions: None,
            cuisine_preferences: None,
        }
    }
}

/// A suggested recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomizeRecipeRequest {
    pub recipe: String,
    pub dietary_restrictions: String,
    pub skill_level: Option<SkillLevel>,
    /// Empty means "not specified".
    pub available_tools: Vec<String>,
}

impl CustomizeRecipeRequest {
    pub fn new(recipe: impl Into<String>, dietary_restrictions: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            dietary_restrictions: dietary_restrictions.into(),
            skill_level: None,
            available_tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptInstructionsRequest {
    pub recipe: String,
    pub skill_level: SkillLevel,
    pub available_tools: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SuggestReply {
    recipes: Vec<Recipe>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomizeReply {
    customized_recipe: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptReply {
    adapted_instructions: String,
}

/// Parse a `{"recipes": [...]}` reply.  Recipes without a name are dropped.
pub fn parse_suggestions(content: &str) -> Result<Vec<Recipe>, RecipeError> {
    let reply: SuggestReply =
        parse_json_reply(content).map_err(|e| RecipeError::Parse(e.to_string()))?;
    Ok(reply
        .recipes
        .into_iter()
        .filter(|r| !r.name.trim().is_empty())
        .collect())
}

pub fn parse_customized(content: &str) -> Result<String, RecipeError> {
    let reply: CustomizeReply =
        parse_json_reply(content).map_err(|e| RecipeError::Parse(e.to_string()))?;
    non_empty(reply.customized_recipe)
}

pub fn parse_adapted(content: &str) -> Result<String, RecipeError> {
    let reply: AdaptReply =
        parse_json_reply(content).map_err(|e| RecipeError::Parse(e.to_string()))?;
    non_empty(reply.adapted_instructions)
}

fn non_empty(text: String) -> Result<String, RecipeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(RecipeError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// RecipeAssistant trait
// ---------------------------------------------------------------------------

/// Async trait for recipe generation.
///
/// Implementors must be `Send + Sync` so they can be shared with spawned
/// tasks behind an `Arc<dyn RecipeAssistant>`.
#[async_trait]
pub trait RecipeAssistant: Send + Sync {
    /// Suggest recipes that use the given ingredients.
    async fn suggest(&self, request: &SuggestRecipesRequest) -> Result<Vec<Recipe>, RecipeError>;

    /// Rewrite a recipe for dietary restrictions.
    async fn customize(&self, request: &CustomizeRecipeRequest) -> Result<String, RecipeError>;

    /// Rewrite instructions for a skill level and tool set.
    async fn adapt(&self, request: &AdaptInstructionsRequest) -> Result<String, RecipeError>;
}

// ---------------------------------------------------------------------------
// ApiRecipeAssistant
// ---------------------------------------------------------------------------

pub struct ApiRecipeAssistant {
    chat: ChatClient,
}

impl ApiRecipeAssistant {
    pub fn from_config(config: &RecipeConfig) -> Self {
        Self {
            chat: ChatClient::new(ChatEndpoint::from(config)),
        }
    }

    pub fn endpoint(&self) -> &ChatEndpoint {
        self.chat.endpoint()
    }

    async fn ask(&self, (system, user): (String, String)) -> Result<String, RecipeError> {
        let messages = vec![
            json!({ "role": "system", "content": system }),
            json!({ "role": "user",   "content": user   }),
        ];
        Ok(self.chat.complete(messages, MAX_REPLY_TOKENS).await?)
    }
}

#[async_trait]
impl RecipeAssistant for ApiRecipeAssistant {
    async fn suggest(&self, request: &SuggestRecipesRequest) -> Result<Vec<Recipe>, RecipeError> {
        if request.ingredients.is_empty() {
            return Err(RecipeError::NoIngredients);
        }
        log::debug!(
            "recipes: suggesting for {} ingredients",
            request.ingredients.len()
        );
        let content = self.ask(RecipePromptBuilder::suggest(request)).await?;
        let recipes = parse_suggestions(&content)?;
        log::info!("recipes: {} suggestions", recipes.len());
        Ok(recipes)
    }

    async fn customize(&self, request: &CustomizeRecipeRequest) -> Result<String, RecipeError> {
        log::debug!("recipes: customizing for {:?}", request.dietary_restrictions);
        let content = self.ask(RecipePromptBuilder::customize(request)).await?;
        parse_customized(&content)
    }

    async fn adapt(&self, request: &AdaptInstructionsRequest) -> Result<String, RecipeError> {
        log::debug!("recipes: adapting for {} cooks", request.skill_level);
        let content = self.ask(RecipePromptBuilder::adapt(request)).await?;
        parse_adapted(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suggestions() {
        let content = r#"{"recipes": [
            {"name": "Caprese", "ingredients": ["Tomato", "Mozzarella", "Basil"], "instructions": "Slice and layer."},
            {"name": "  ", "ingredients": [], "instructions": ""}
        ]}"#;
        let recipes = parse_suggestions(content).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "Caprese");
        assert_eq!(recipes[0].ingredients.len(), 3);
    }

    #[test]
    fn suggestion_fields_default_when_missing() {
        let recipes = parse_suggestions("```json\n{\"recipes\": [{\"name\": \"Toast\"}]}\n```").unwrap();
        assert_eq!(recipes[0].name, "Toast");
        assert!(recipes[0].ingredients.is_empty());
    }

    #[test]
    fn malformed_suggestions_are_parse_errors() {
        assert!(matches!(
            parse_suggestions("Here are some recipes!"),
            Err(RecipeError::Parse(_))
        ));
    }

    #[test]
    fn parses_customized_and_adapted() {
        assert_eq!(
            parse_customized(r#"{"customizedRecipe": " Vegan caprese "}"#).unwrap(),
            "Vegan caprese"
        );
        assert_eq!(
            parse_adapted(r#"{"adaptedInstructions": "Use a knife."}"#).unwrap(),
            "Use a knife."
        );
    }

    #[test]
    fn blank_text_is_empty_response() {
        assert!(matches!(
            parse_customized(r#"{"customizedRecipe": "  "}"#),
            Err(RecipeError::EmptyResponse)
        ));
    }

    #[test]
    fn skill_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SkillLevel::Advanced).unwrap(), "\"advanced\"");
        assert_eq!(SkillLevel::Intermediate.to_string(), "intermediate");
    }

    #[test]
    fn chat_status_maps_to_request() {
        let e = RecipeError::from(ChatError::Status {
            status: 500,
            message: "boom".into(),
        });
        assert!(matches!(e, RecipeError::Request(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn empty_ingredient_list_is_rejected_locally() {
        let config = RecipeConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..RecipeConfig::default()
        };
        let assistant = ApiRecipeAssistant::from_config(&config);
        let result = assistant.suggest(&SuggestRecipesRequest::new(vec![])).await;
        assert!(matches!(result, Err(RecipeError::NoIngredients)));
    }

    #[test]
    fn assistant_is_object_safe() {
        let assistant: Box<dyn RecipeAssistant> =
            Box::new(ApiRecipeAssistant::from_config(&RecipeConfig::default()));
        drop(assistant);
    }
}
