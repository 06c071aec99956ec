//! List consolidation: the final stage. Merges deal items and sourced
//! staples into one shopping list keyed by the chosen store.

use crate::generate::TextGenerator;
use crate::sanitize::parse_generator_json;
use crate::state::{Deal, PlanningState, ShoppingList, ShoppingListItem, StageName, StageOutcome};
use crate::validate::{RawShoppingItem, validate_consolidation};

use super::{errored, prompts, skipped};

/// Run list consolidation and write `shopping_list`.
///
/// Normalizes the generator's mapping to contain exactly the chosen-store
/// key: items the generator filed under other store names are re-keyed,
/// never discarded. Every final item carries `notes` and `image_url`.
pub async fn run_list_consolidation(
    generator: &dyn TextGenerator,
    state: &mut PlanningState,
) -> StageOutcome {
    const STAGE: StageName = StageName::ListConsolidation;

    let Some(chosen_store) = state.chosen_store.clone() else {
        return skipped(STAGE, "no store chosen");
    };
    if state.meal_plan.is_empty() {
        return skipped(STAGE, "meal plan is empty");
    }

    tracing::info!(
        request_id = %state.request_id,
        stage = %STAGE,
        chosen_store = %chosen_store,
        "running list consolidation"
    );

    let meal_plan_json =
        serde_json::to_string_pretty(&state.meal_plan).unwrap_or_else(|_| "[]".to_owned());
    let sourced_json = serde_json::to_string_pretty(&state.sourced_ingredients)
        .unwrap_or_else(|_| "[]".to_owned());

    let prompt = prompts::consolidation_prompt(&chosen_store, &meal_plan_json, &sourced_json);
    let reply = match generator.generate(&prompt, &[]).await {
        Ok(reply) => reply,
        Err(e) => return errored(STAGE, format!("generator call failed: {e}")),
    };

    let value = match parse_generator_json(&reply) {
        Ok(value) => value,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let grouped = match validate_consolidation(&value) {
        Ok(grouped) => grouped,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    // Merge every list into the chosen store's: misfiled items are
    // re-keyed, not dropped.
    let mut misfiled = 0usize;
    let mut raw_items: Vec<RawShoppingItem> = Vec::new();
    for (store, items) in grouped {
        if store != chosen_store {
            misfiled += items.len();
        }
        raw_items.extend(items);
    }
    if misfiled > 0 {
        tracing::warn!(
            request_id = %state.request_id,
            stage = %STAGE,
            misfiled,
            chosen_store = %chosen_store,
            "re-keyed items filed under other stores"
        );
    }

    let items: Vec<ShoppingListItem> = raw_items
        .into_iter()
        .map(|raw| finalize_item(raw, &state.found_deals))
        .collect();

    let summary = format!("{} items to buy at {}", items.len(), chosen_store);
    tracing::info!(request_id = %state.request_id, stage = %STAGE, "{summary}");

    let mut shopping_list = ShoppingList::new();
    if !items.is_empty() {
        shopping_list.insert(chosen_store, items);
    }
    state.shopping_list = shopping_list;

    StageOutcome::Success {
        stage: STAGE,
        summary,
    }
}

/// Apply the field defaults the generator may have omitted: `image_url`
/// stays null, `notes` is inferred from whether the name matches a known
/// deal.
fn finalize_item(raw: RawShoppingItem, known_deals: &[Deal]) -> ShoppingListItem {
    let notes = raw.notes.unwrap_or_else(|| {
        if matches_known_deal(&raw.name, known_deals) {
            "Deal item".to_owned()
        } else {
            "Staple item".to_owned()
        }
    });
    ShoppingListItem {
        name: raw.name,
        price: raw.price,
        currency: raw.currency,
        notes,
        image_url: raw.image_url,
    }
}

/// Case-insensitive containment either way counts as a match.
fn matches_known_deal(name: &str, deals: &[Deal]) -> bool {
    let needle = name.to_lowercase();
    deals.iter().any(|deal| {
        let deal_name = deal.name.to_lowercase();
        deal_name.contains(&needle) || needle.contains(&deal_name)
    })
}
