//! Prompt composition for the stage executors.
//!
//! Every prompt instructs the generator to answer with bare JSON; the
//! sanitizer copes with the fenced replies it sends anyway.

/// Deal discovery: generate search terms, call the search tool per term,
/// collect every deal it returns.
pub fn discovery_prompt(initial_query: &str) -> String {
    format!(
        "You are the deal hunter for a weekly dinner planner. Your goal is to find \
Norwegian grocery products with recent price drops suitable for common dinners.\n\
\n\
Follow these steps strictly:\n\
1. Based on the user's request below, generate a diverse list of 15-20 specific \
Norwegian dinner-related search terms (e.g. 'svinekoteletter', 'torsk', \
'kyllingfilet', 'kjøttdeig', 'gulrot', 'potet', 'pasta', 'ris'). Prioritize \
common ingredients suitable for multiple meals.\n\
2. Call the `search_products` tool for each term. The tool returns only \
products with an actual price drop.\n\
3. Collect ALL deals returned across all terms; do not filter further.\n\
4. Respond ONLY with a JSON object of the form:\n\
{{\"search_terms\": [\"torsk\", ...], \"found_deals\": [{{\"id\": 123, \"name\": \"...\", \
\"current_price\": 45.5, \"previous_price\": 52.9, \"price_drop_percentage\": 13.99, \
\"currency\": \"NOK\", \"store\": \"SPAR\", \"image_url\": null}}, ...]}}\n\
Do not add explanations or conversational text.\n\
\n\
User request: {initial_query}"
    )
}

/// Meal assignment: pick one store, plan 7 dinners from its deals and the
/// on-hand ingredients, list what is still missing.
pub fn assignment_prompt(deals_json: &str, on_hand_list: &str) -> String {
    format!(
        "You are the meal strategist for a weekly dinner planner. Below are grocery \
deals found earlier and the ingredients the user already has on hand. Choose ONE \
store with a good cluster of deals, create a 7-day dinner plan for 2 people using \
those deals plus on-hand items, and identify essential ingredients still missing.\n\
\n\
Deals:\n```json\n{deals_json}\n```\n\
Ingredients on hand: {on_hand_list}\n\
\n\
Rules:\n\
1. Use ONLY deals from the single chosen store; never mix stores. The store name \
must match the `store` field of the deals exactly.\n\
2. Plan exactly 7 dinners, one per day. Leftover days with no deals are fine.\n\
3. Each meal item must include `meal_name`, a `deals_used` list holding the full \
deal objects, an `on_hand_used` list of names, and a `notes` field (\"Likely \
leftovers\" or \"Serves 2\").\n\
4. List at most 5-7 generic missing essentials (e.g. \"salt\", \"butter\", \"milk\") \
that are neither on hand nor among the chosen store's deals.\n\
5. Respond ONLY with a JSON object:\n\
{{\"chosen_store\": \"SPAR\", \"meal_plan\": [ ...7 items... ], \
\"missing_ingredients\": [\"milk\", \"flour\"]}}"
    )
}

/// Ingredient sourcing: find one standard, reasonably priced option per
/// missing ingredient, across all nearby stores.
pub fn sourcing_prompt(missing_ingredients: &str) -> String {
    format!(
        "You are the bargain scout for a weekly dinner planner. For each missing \
ingredient below, find one standard, reasonably priced product, looking across \
all available nearby stores.\n\
\n\
Missing ingredients: {missing_ingredients}\n\
\n\
For each ingredient:\n\
1. Call `search_products` with the ingredient name and `filter_by_price_drop` \
set to false.\n\
2. Pick 2-4 candidates that look like the standard form of the ingredient \
(prefer 'Løk 1kg' over 'Sprøstekt Løk').\n\
3. Call `get_product_details` for each candidate and select the single best \
option: standard packaging first, then lowest current price.\n\
4. Skip the ingredient if nothing suitable is found.\n\
\n\
Respond ONLY with a JSON list; one entry per sourced ingredient:\n\
[{{\"ingredient_name\": \"butter\", \"product_id\": 456, \"product_name\": \"...\", \
\"store\": \"KIWI\", \"current_price\": 39.9, \"unit\": \"stk\"}}, ...]\n\
If no options were found at all, respond with `[]`."
    )
}

/// List consolidation: one shopping list for the chosen store only.
pub fn consolidation_prompt(
    chosen_store: &str,
    meal_plan_json: &str,
    sourced_json: &str,
) -> String {
    format!(
        "You are the list consolidator for a weekly dinner planner. Build the final \
shopping list for ONLY the chosen store.\n\
\n\
Chosen store: {chosen_store}\n\
Meal plan (with the deal items used per meal):\n```json\n{meal_plan_json}\n```\n\
Sourced staples for missing ingredients (may be from other stores):\n\
```json\n{sourced_json}\n```\n\
\n\
Follow these steps:\n\
1. Take every deal item from the `deals_used` lists whose store matches the \
chosen store exactly.\n\
2. Take sourced staples from the chosen store only; ignore the rest.\n\
3. Respond ONLY with a JSON object holding a single key -- the chosen store -- \
mapping to the combined item list. Each item must carry `name`, `price`, \
`currency`, `notes` (\"Deal item\" or \"Staple item for <ingredient>\") and \
`image_url` (null when unknown):\n\
{{\"{chosen_store}\": [{{\"name\": \"...\", \"price\": 49.9, \"currency\": \"NOK\", \
\"notes\": \"Deal item\", \"image_url\": null}}, ...]}}\n\
If there is nothing to buy, respond with `{{}}`."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_their_inputs() {
        assert!(discovery_prompt("cheap dinners").contains("cheap dinners"));
        assert!(assignment_prompt("[]", "salt, pepper").contains("salt, pepper"));
        assert!(sourcing_prompt("butter, milk").contains("butter, milk"));
        let prompt = consolidation_prompt("SPAR", "[]", "[]");
        assert!(prompt.contains("Chosen store: SPAR"));
        assert!(prompt.contains("{\"SPAR\":"));
    }
}
