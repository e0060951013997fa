//! Recipe assistant: turns the confirmed ingredient list into recipes.
//!
//! This module provides:
//! * [`RecipeAssistant`]: async trait with `suggest`, `customize`, `adapt`.
//! * [`ApiRecipeAssistant`]: OpenAI-compatible chat backend.
//! * [`RecipePromptBuilder`]: prompt construction for all three operations.
//! * [`RecipeError`]: error variants for a recipe request.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ingredient_scanner::config::AppConfig;
//! use ingredient_scanner::recipes::{ApiRecipeAssistant, RecipeAssistant, SuggestRecipesRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let assistant = ApiRecipeAssistant::from_config(&config.recipes);
//!
//!     let request = SuggestRecipesRequest::new(vec!["Tomato".into(), "Basil".into()]);
//!     match assistant.suggest(&request).await {
//!         Ok(recipes) => recipes.iter().for_each(|r| println!("{}", r.name)),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod assistant;
pub mod prompt;

pub use assistant::{
    AdaptInstructionsRequest, ApiRecipeAssistant, CustomizeRecipeRequest, Recipe, RecipeAssistant,
    RecipeError, SkillLevel, SuggestRecipesRequest,
};
pub use prompt::RecipePromptBuilder;
