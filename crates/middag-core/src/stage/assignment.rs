//! Meal assignment: the second stage. Chooses a single store, plans the
//! week's dinners from its deals, and lists what is still missing.

use crate::generate::TextGenerator;
use crate::sanitize::parse_generator_json;
use crate::state::{PlanningState, StageName, StageOutcome};
use crate::validate::validate_assignment;

use super::{errored, prompts, skipped};

/// Dinners planned per week.
const PLANNED_MEALS: usize = 7;

/// Run meal assignment and write `chosen_store` / `meal_plan` /
/// `missing_ingredients`.
///
/// Enforces the single-store invariant: deals the generator placed in a
/// meal despite belonging to another store are silently dropped from that
/// meal; the meal itself is kept.
pub async fn run_meal_assignment(
    generator: &dyn TextGenerator,
    state: &mut PlanningState,
) -> StageOutcome {
    const STAGE: StageName = StageName::MealAssignment;

    if state.found_deals.is_empty() {
        return skipped(STAGE, "no deals to plan from");
    }

    tracing::info!(
        request_id = %state.request_id,
        stage = %STAGE,
        deals = state.found_deals.len(),
        "running meal assignment"
    );

    let deals_json =
        serde_json::to_string_pretty(&state.found_deals).unwrap_or_else(|_| "[]".to_owned());
    let on_hand_list = if state.on_hand_ingredients.is_empty() {
        "None".to_owned()
    } else {
        state.on_hand_ingredients.join(", ")
    };

    let prompt = prompts::assignment_prompt(&deals_json, &on_hand_list);
    let reply = match generator.generate(&prompt, &[]).await {
        Ok(reply) => reply,
        Err(e) => return errored(STAGE, format!("generator call failed: {e}")),
    };

    let value = match parse_generator_json(&reply) {
        Ok(value) => value,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let mut payload = match validate_assignment(&value) {
        Ok(payload) => payload,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    // The generator is not trusted to have respected the single-store
    // constraint.
    let mut dropped = 0usize;
    for meal in &mut payload.meal_plan {
        let before = meal.deals_used.len();
        meal.deals_used
            .retain(|deal| deal.store == payload.chosen_store);
        dropped += before - meal.deals_used.len();
    }
    if dropped > 0 {
        tracing::warn!(
            request_id = %state.request_id,
            stage = %STAGE,
            dropped,
            chosen_store = %payload.chosen_store,
            "dropped deals from non-chosen stores"
        );
    }

    if payload.meal_plan.len() != PLANNED_MEALS {
        tracing::warn!(
            request_id = %state.request_id,
            stage = %STAGE,
            planned = payload.meal_plan.len(),
            "meal plan does not cover {PLANNED_MEALS} days"
        );
    }

    let summary = format!(
        "chose {} with {} meals, {} missing ingredients",
        payload.chosen_store,
        payload.meal_plan.len(),
        payload.missing_ingredients.len()
    );
    tracing::info!(request_id = %state.request_id, stage = %STAGE, "{summary}");

    state.chosen_store = Some(payload.chosen_store);
    state.meal_plan = payload.meal_plan;
    state.missing_ingredients = payload.missing_ingredients;

    StageOutcome::Success {
        stage: STAGE,
        summary,
    }
}
