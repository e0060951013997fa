//! Prompt builder for the recipe assistant.
//!
//! Every prompt is a `(system_msg, user_msg)` pair for an OpenAI-compatible
//! chat endpoint running in JSON mode.  Each system instruction names the
//! exact JSON shape the reply must have.

use std::fmt::Write as _;

use super::assistant::{AdaptInstructionsRequest, CustomizeRecipeRequest, SuggestRecipesRequest};

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const SUGGEST_INSTRUCTION: &str = "\
You are a helpful cooking assistant that suggests recipes based on available ingredients.
Reply with ONLY a JSON object of the form
{\"recipes\": [{\"name\": string, \"ingredients\": [string], \"instructions\": string}]}.
Instructions are step by step in a single string.";

const CUSTOMIZE_INSTRUCTION: &str = "\
You are a culinary expert, adept at modifying recipes to suit various dietary needs and preferences.
Adjust the recipe to the dietary restrictions and, when given, the skill level and available tools.
Reply with ONLY a JSON object of the form {\"customizedRecipe\": string}.";

const ADAPT_INSTRUCTION: &str = "\
You are a cooking assistant that adapts recipes to the user's skill level and available tools.
Give detailed instructions for beginners, simplify for intermediate cooks and offer advanced techniques for advanced cooks.
If a tool is unavailable, suggest an alternative.
Reply with ONLY a JSON object of the form {\"adaptedInstructions\": string}.";

// ---------------------------------------------------------------------------
// RecipePromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat prompts for the three recipe operations.
///
/// # Example
/// ```rust
/// use ingredient_scanner::recipes::{RecipePromptBuilder, SuggestRecipesRequest};
///
/// let request = SuggestRecipesRequest::new(vec!["Tomato".into(), "Basil".into()]);
/// let (system, user) = RecipePromptBuilder::suggest(&request);
/// assert!(system.contains("\"recipes\""));
/// assert!(user.contains("- Tomato"));
/// ```
pub struct RecipePromptBuilder;

impl RecipePromptBuilder {
    pub fn suggest(request: &SuggestRecipesRequest) -> (String, String) {
        let mut user = String::with_capacity(256);
        user.push_str("Ingredients:\n");
        for ingredient in &request.ingredients {
            let _ = writeln!(user, "- {ingredient}");
        }
        if let Some(diet) = non_blank(request.dietary_restrictions.as_deref()) {
            let _ = writeln!(user, "\nDietary restrictions: {diet}");
        }
        if let Some(cuisine) = non_blank(request.cuisine_preferences.as_deref()) {
            let _ = writeln!(user, "\nCuisine preferences: {cuisine}");
        }
        user.push_str("\nSuggest recipes that can be made using these ingredients.");

        (SUGGEST_INSTRUCTION.to_string(), user)
    }

    pub fn customize(request: &CustomizeRecipeRequest) -> (String, String) {
        let mut user = String::with_capacity(request.recipe.len() + 256);
        let _ = writeln!(user, "Original recipe:\n{}\n", request.recipe.trim());
        let _ = writeln!(
            user,
            "Dietary restrictions/preferences: {}",
            request.dietary_restrictions.trim()
        );
        if let Some(level) = request.skill_level {
            let _ = writeln!(user, "User skill level: {level}");
        }
        if !request.available_tools.is_empty() {
            let _ = writeln!(user, "Available tools: {}", request.available_tools.join(", "));
        }

        (CUSTOMIZE_INSTRUCTION.to_string(), user)
    }

    pub fn adapt(request: &AdaptInstructionsRequest) -> (String, String) {
        let tools = if request.available_tools.is_empty() {
            "none listed".to_string()
        } else {
            request.available_tools.join(", ")
        };

        let mut user = String::with_capacity(request.recipe.len() + 128);
        let _ = writeln!(user, "Recipe:\n{}\n", request.recipe.trim());
        let _ = writeln!(user, "Skill level: {}", request.skill_level);
        let _ = writeln!(user, "Available tools: {tools}");

        (ADAPT_INSTRUCTION.to_string(), user)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
