//! Per-stage schema validation: turns a decoded JSON value into the
//! stage's typed payload, or a [`ValidationError`] when the structural
//! requirements are not met.
//!
//! Granularity differs per stage. Structural failures (wrong top-level
//! shape, a meal item without `deals_used`) reject the whole stage
//! result. Individual malformed list elements are dropped with a warning
//! and do not fail the stage.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::state::{Deal, MealPlanItem, SourcedIngredient};

/// Placeholder applied when a generator omits a meal item's `notes`.
/// Downstream consumers require the field to be present.
pub const DEFAULT_MEAL_NOTES: &str = "Serves 2";

/// Errors that reject an entire stage result.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed discovery payload")]
    MalformedDiscovery,

    #[error("malformed assignment payload: {0}")]
    MalformedAssignment(String),

    #[error("sourcing payload is not a list")]
    MalformedSourcing,

    #[error("shopping list payload is not an object")]
    MalformedConsolidation,
}

// ---------------------------------------------------------------------------
// Lenient element decoding
// ---------------------------------------------------------------------------

/// Decode each element of a deal list individually, dropping malformed
/// entries instead of failing the stage.
fn lenient_deals(values: &[Value]) -> Vec<Deal> {
    values
        .iter()
        .filter_map(|v| match serde_json::from_value::<Deal>(v.clone()) {
            Ok(deal) => Some(deal),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed deal object");
                None
            }
        })
        .collect()
}

/// Keep only string elements, dropping the rest with a warning.
fn lenient_strings(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|v| match v.as_str() {
            Some(s) => Some(s.to_owned()),
            None => {
                tracing::warn!(value = %v, "dropping non-string list element");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Deal discovery
// ---------------------------------------------------------------------------

/// Validated output of the deal-discovery stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryPayload {
    pub search_terms: Vec<String>,
    pub found_deals: Vec<Deal>,
}

/// The payload must be an object with a `search_terms` string list and a
/// `found_deals` object list.
pub fn validate_discovery(value: &Value) -> Result<DiscoveryPayload, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::MalformedDiscovery)?;

    let terms = obj
        .get("search_terms")
        .filter(|v| v.is_array())
        .ok_or(ValidationError::MalformedDiscovery)?;
    let deals = obj
        .get("found_deals")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MalformedDiscovery)?;

    Ok(DiscoveryPayload {
        search_terms: lenient_strings(terms),
        found_deals: lenient_deals(deals),
    })
}

// ---------------------------------------------------------------------------
// Meal assignment
// ---------------------------------------------------------------------------

/// Validated output of the meal-assignment stage.
///
/// Store filtering of `deals_used` has not yet happened here; the
/// assignment executor applies the single-store invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPayload {
    pub chosen_store: String,
    pub meal_plan: Vec<MealPlanItem>,
    pub missing_ingredients: Vec<String>,
}

/// The payload must be an object with a non-empty `chosen_store` string
/// and a `meal_plan` list whose every item carries a `deals_used` list.
///
/// A meal item without `deals_used` fails the whole stage (fail-closed):
/// downstream stages assume a usable plan, so a partially-shaped one is
/// rejected rather than patched.
pub fn validate_assignment(value: &Value) -> Result<AssignmentPayload, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::MalformedAssignment("payload is not an object".into()))?;

    let chosen_store = obj
        .get("chosen_store")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ValidationError::MalformedAssignment("missing or empty chosen_store".into())
        })?
        .to_owned();

    let plan_values = obj
        .get("meal_plan")
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::MalformedAssignment("meal_plan is not a list".into()))?;

    let mut meal_plan = Vec::with_capacity(plan_values.len());
    for (index, item) in plan_values.iter().enumerate() {
        let item_obj = item.as_object().ok_or_else(|| {
            ValidationError::MalformedAssignment(format!("meal item {index} is not an object"))
        })?;

        let deals_value = item_obj
            .get("deals_used")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ValidationError::MalformedAssignment(format!(
                    "meal item {index} is missing a deals_used list"
                ))
            })?;

        if let Some(on_hand) = item_obj.get("on_hand_used") {
            if !on_hand.is_array() && !on_hand.is_null() {
                return Err(ValidationError::MalformedAssignment(format!(
                    "meal item {index} has a non-list on_hand_used"
                )));
            }
        }

        meal_plan.push(MealPlanItem {
            meal_name: item_obj
                .get("meal_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            deals_used: lenient_deals(deals_value),
            on_hand_used: item_obj
                .get("on_hand_used")
                .map(lenient_strings)
                .unwrap_or_default(),
            notes: item_obj
                .get("notes")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| DEFAULT_MEAL_NOTES.to_owned()),
        });
    }

    let missing_ingredients = match obj.get("missing_ingredients") {
        None | Some(Value::Null) => Vec::new(),
        Some(v @ Value::Array(_)) => lenient_strings(v),
        Some(_) => {
            return Err(ValidationError::MalformedAssignment(
                "missing_ingredients is not a list".into(),
            ));
        }
    };

    Ok(AssignmentPayload {
        chosen_store,
        meal_plan,
        missing_ingredients,
    })
}

// ---------------------------------------------------------------------------
// Ingredient sourcing
// ---------------------------------------------------------------------------

/// Keys every sourced-ingredient element must carry. `unit` may be null
/// but the key itself is required.
const SOURCED_KEYS: [&str; 6] = [
    "ingredient_name",
    "product_id",
    "product_name",
    "store",
    "current_price",
    "unit",
];

/// The payload must be a list. Elements missing required keys (or failing
/// to decode) are dropped individually; only a non-list top level fails
/// the stage.
pub fn validate_sourcing(value: &Value) -> Result<Vec<SourcedIngredient>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::MalformedSourcing)?;

    let mut sourced = Vec::with_capacity(items.len());
    for item in items {
        let has_all_keys = item
            .as_object()
            .is_some_and(|obj| SOURCED_KEYS.iter().all(|k| obj.contains_key(*k)));
        if !has_all_keys {
            tracing::warn!(item = %item, "dropping sourced ingredient with missing keys");
            continue;
        }
        match serde_json::from_value::<SourcedIngredient>(item.clone()) {
            Ok(ingredient) => sourced.push(ingredient),
            Err(e) => {
                tracing::warn!(error = %e, item = %item, "dropping undecodable sourced ingredient");
            }
        }
    }

    Ok(sourced)
}

// ---------------------------------------------------------------------------
// List consolidation
// ---------------------------------------------------------------------------

/// A shopping list line as the generator produced it; `notes` and
/// `image_url` defaults are applied by the consolidation executor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawShoppingItem {
    pub name: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// The payload must be an object mapping store names to item lists.
///
/// Generators sometimes substitute `[]` (or `null`) for `{}`; a decoded
/// empty sequence is treated as an empty mapping. A non-empty sequence is
/// still a shape failure.
pub fn validate_consolidation(
    value: &Value,
) -> Result<BTreeMap<String, Vec<RawShoppingItem>>, ValidationError> {
    let map = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Array(items) if items.is_empty() => return Ok(BTreeMap::new()),
        Value::Object(map) => map,
        _ => return Err(ValidationError::MalformedConsolidation),
    };

    let mut grouped = BTreeMap::new();
    for (store, items_value) in map {
        let items = items_value
            .as_array()
            .ok_or(ValidationError::MalformedConsolidation)?;
        let decoded: Vec<RawShoppingItem> = items
            .iter()
            .filter_map(
                |item| match serde_json::from_value::<RawShoppingItem>(item.clone()) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        tracing::warn!(error = %e, store = %store, "dropping malformed shopping list item");
                        None
                    }
                },
            )
            .collect();
        grouped.insert(store.clone(), decoded);
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- discovery ---------------------------------------------------------

    #[test]
    fn discovery_accepts_terms_and_deals() {
        let value = json!({
            "search_terms": ["torsk", "laks"],
            "found_deals": [{
                "id": 1, "name": "Torskefilet", "current_price": 97.9,
                "previous_price": 99.9, "price_drop_percentage": 2.0,
                "currency": "NOK", "store": "SPAR"
            }]
        });
        let payload = validate_discovery(&value).unwrap();
        assert_eq!(payload.search_terms.len(), 2);
        assert_eq!(payload.found_deals.len(), 1);
        assert_eq!(payload.found_deals[0].store, "SPAR");
    }

    #[test]
    fn discovery_rejects_missing_keys() {
        assert!(validate_discovery(&json!({"search_terms": []})).is_err());
        assert!(validate_discovery(&json!({"found_deals": []})).is_err());
        assert!(validate_discovery(&json!({"search_terms": "torsk", "found_deals": []})).is_err());
        assert!(validate_discovery(&json!([])).is_err());
    }

    #[test]
    fn discovery_drops_malformed_deal_elements() {
        let value = json!({
            "search_terms": [],
            "found_deals": [
                {"id": 1, "name": "ok", "current_price": 10.0, "currency": "NOK", "store": "SPAR"},
                {"name": "missing id"},
                "not even an object"
            ]
        });
        let payload = validate_discovery(&value).unwrap();
        assert_eq!(payload.found_deals.len(), 1);
    }

    // -- assignment ----------------------------------------------------------

    fn assignment_value() -> Value {
        json!({
            "chosen_store": "SPAR",
            "meal_plan": [
                {
                    "meal_name": "Day 1: Torsk",
                    "deals_used": [{"id": 1, "name": "Torskefilet", "current_price": 97.9,
                                     "currency": "NOK", "store": "SPAR"}],
                    "on_hand_used": ["potatoes"],
                    "notes": "Likely leftovers"
                },
                {
                    "meal_name": "Day 2: Leftovers",
                    "deals_used": []
                }
            ],
            "missing_ingredients": ["butter", "milk"]
        })
    }

    #[test]
    fn assignment_accepts_valid_payload() {
        let payload = validate_assignment(&assignment_value()).unwrap();
        assert_eq!(payload.chosen_store, "SPAR");
        assert_eq!(payload.meal_plan.len(), 2);
        assert_eq!(payload.missing_ingredients, vec!["butter", "milk"]);
    }

    #[test]
    fn assignment_defaults_missing_notes() {
        let payload = validate_assignment(&assignment_value()).unwrap();
        assert_eq!(payload.meal_plan[0].notes, "Likely leftovers");
        assert_eq!(payload.meal_plan[1].notes, DEFAULT_MEAL_NOTES);
    }

    #[test]
    fn assignment_rejects_empty_chosen_store() {
        let mut value = assignment_value();
        value["chosen_store"] = json!("");
        assert!(validate_assignment(&value).is_err());
        value["chosen_store"] = json!(null);
        assert!(validate_assignment(&value).is_err());
    }

    #[test]
    fn meal_item_without_deals_used_fails_the_stage() {
        let value = json!({
            "chosen_store": "SPAR",
            "meal_plan": [{"meal_name": "Day 1", "on_hand_used": []}],
            "missing_ingredients": []
        });
        let err = validate_assignment(&value).unwrap_err();
        assert!(err.to_string().contains("deals_used"));
    }

    #[test]
    fn assignment_rejects_non_list_meal_plan() {
        let value = json!({"chosen_store": "SPAR", "meal_plan": {}, "missing_ingredients": []});
        assert!(validate_assignment(&value).is_err());
    }

    #[test]
    fn assignment_tolerates_absent_missing_ingredients() {
        let value = json!({"chosen_store": "SPAR", "meal_plan": []});
        let payload = validate_assignment(&value).unwrap();
        assert!(payload.missing_ingredients.is_empty());
    }

    // -- sourcing ------------------------------------------------------------

    #[test]
    fn sourcing_drops_items_missing_keys_but_keeps_the_rest() {
        let value = json!([
            {
                "ingredient_name": "butter", "product_id": 456,
                "product_name": "Meierismør", "store": "KIWI",
                "current_price": 39.9, "unit": "stk"
            },
            {"ingredient_name": "milk", "product_id": 9},
            {
                "ingredient_name": "flour", "product_id": 7,
                "product_name": "Hvetemel", "store": "SPAR",
                "current_price": 21.5, "unit": null
            }
        ]);
        let sourced = validate_sourcing(&value).unwrap();
        assert_eq!(sourced.len(), 2);
        assert_eq!(sourced[0].ingredient_name, "butter");
        assert_eq!(sourced[1].unit, None);
    }

    #[test]
    fn sourcing_rejects_non_list_top_level() {
        assert!(validate_sourcing(&json!({"ingredient_name": "butter"})).is_err());
        assert!(validate_sourcing(&json!("butter")).is_err());
    }

    #[test]
    fn sourcing_accepts_empty_list() {
        assert!(validate_sourcing(&json!([])).unwrap().is_empty());
    }

    // -- consolidation ---------------------------------------------------------

    #[test]
    fn consolidation_accepts_store_mapping() {
        let value = json!({
            "SPAR": [
                {"name": "Torskefilet", "price": 97.9, "currency": "NOK",
                 "notes": "Deal item", "image_url": null},
                {"name": "Meierismør", "price": 39.9, "currency": "NOK"}
            ]
        });
        let grouped = validate_consolidation(&value).unwrap();
        assert_eq!(grouped["SPAR"].len(), 2);
        assert_eq!(grouped["SPAR"][1].notes, None);
    }

    #[test]
    fn consolidation_treats_empty_sequence_as_empty_mapping() {
        assert!(validate_consolidation(&json!([])).unwrap().is_empty());
        assert!(validate_consolidation(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn consolidation_rejects_non_empty_sequence() {
        assert!(validate_consolidation(&json!([{"name": "x"}])).is_err());
        assert!(validate_consolidation(&json!("SPAR")).is_err());
    }

    #[test]
    fn consolidation_drops_malformed_items() {
        let value = json!({
            "SPAR": [
                {"name": "ok", "price": 10.0, "currency": "NOK"},
                {"name": "no price"}
            ]
        });
        let grouped = validate_consolidation(&value).unwrap();
        assert_eq!(grouped["SPAR"].len(), 1);
    }
}
