//! Ingredient sourcing: the third stage. Finds one standard product per
//! missing ingredient, across all nearby stores.

use crate::generate::{CatalogTool, TextGenerator};
use crate::sanitize::parse_generator_json;
use crate::state::{PlanningState, StageName, StageOutcome};
use crate::validate::validate_sourcing;

use super::{errored, prompts, skipped};

/// Run ingredient sourcing and write `sourced_ingredients`.
pub async fn run_ingredient_sourcing(
    generator: &dyn TextGenerator,
    state: &mut PlanningState,
) -> StageOutcome {
    const STAGE: StageName = StageName::IngredientSourcing;

    if state.missing_ingredients.is_empty() {
        return skipped(STAGE, "no missing ingredients");
    }

    tracing::info!(
        request_id = %state.request_id,
        stage = %STAGE,
        missing = state.missing_ingredients.len(),
        "running ingredient sourcing"
    );

    let prompt = prompts::sourcing_prompt(&state.missing_ingredients.join(", "));
    let reply = match generator
        .generate(
            &prompt,
            &[CatalogTool::SearchProducts, CatalogTool::ProductDetails],
        )
        .await
    {
        Ok(reply) => reply,
        Err(e) => return errored(STAGE, format!("generator call failed: {e}")),
    };

    let value = match parse_generator_json(&reply) {
        Ok(value) => value,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let sourced = match validate_sourcing(&value) {
        Ok(sourced) => sourced,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let summary = format!(
        "sourced {} of {} missing ingredients",
        sourced.len(),
        state.missing_ingredients.len()
    );
    tracing::info!(request_id = %state.request_id, stage = %STAGE, "{summary}");

    state.sourced_ingredients = sourced;

    StageOutcome::Success {
        stage: STAGE,
        summary,
    }
}
