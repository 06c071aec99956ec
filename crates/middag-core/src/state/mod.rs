//! The planning record threaded through all pipeline stages, and the data
//! model it owns.
//!
//! Each stage exclusively owns writing its designated fields; no stage
//! reads fields written by a later stage. The state lives for exactly one
//! planning request and is never persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Stage names and outcomes
// ---------------------------------------------------------------------------

/// The four pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    DealDiscovery,
    MealAssignment,
    IngredientSourcing,
    ListConsolidation,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DealDiscovery => "deal_discovery",
            Self::MealAssignment => "meal_assignment",
            Self::IngredientSourcing => "ingredient_sourcing",
            Self::ListConsolidation => "list_consolidation",
        };
        f.write_str(s)
    }
}

impl FromStr for StageName {
    type Err = StageNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deal_discovery" => Ok(Self::DealDiscovery),
            "meal_assignment" => Ok(Self::MealAssignment),
            "ingredient_sourcing" => Ok(Self::IngredientSourcing),
            "list_consolidation" => Ok(Self::ListConsolidation),
            other => Err(StageNameParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`StageName`] string.
#[derive(Debug, Clone)]
pub struct StageNameParseError(pub String);

impl fmt::Display for StageNameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid stage name: {:?}", self.0)
    }
}

impl std::error::Error for StageNameParseError {}

/// Diagnostic outcome of the most recently executed stage.
///
/// A `Skipped` outcome is not an error: it means the stage's required
/// input was structurally absent and the stage completed with empty
/// output. `Errored` means the stage's collaborator call or output
/// handling failed; the rest of the pipeline still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Success { stage: StageName, summary: String },
    Skipped { stage: StageName, reason: String },
    Errored { stage: StageName, detail: String },
}

impl StageOutcome {
    pub fn stage(&self) -> StageName {
        match self {
            Self::Success { stage, .. }
            | Self::Skipped { stage, .. }
            | Self::Errored { stage, .. } => *stage,
        }
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Errored { .. })
    }
}

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A catalog product with a detected price drop.
///
/// When `previous_price` is present it is strictly greater than
/// `current_price` and `price_drop_percentage` is the rounded drop in
/// `(0, 100]`. Deals produced without drop filtering carry neither field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub name: String,
    pub current_price: f64,
    #[serde(default)]
    pub previous_price: Option<f64>,
    #[serde(default)]
    pub price_drop_percentage: Option<f64>,
    pub currency: String,
    pub store: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One dinner in the 7-day plan.
///
/// Invariant (enforced by the assignment stage): every deal in
/// `deals_used` has `store` equal to the plan's chosen store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanItem {
    #[serde(default)]
    pub meal_name: String,
    pub deals_used: Vec<Deal>,
    #[serde(default)]
    pub on_hand_used: Vec<String>,
    pub notes: String,
}

/// A staple sourced for one originally-missing ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedIngredient {
    pub ingredient_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub store: String,
    pub current_price: f64,
    pub unit: Option<String>,
}

/// One line of the final shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub notes: String,
    pub image_url: Option<String>,
}

/// Final shopping list, grouped by store name.
///
/// The consolidation stage guarantees at most one key, equal to the
/// chosen store.
pub type ShoppingList = BTreeMap<String, Vec<ShoppingListItem>>;

// ---------------------------------------------------------------------------
// Planning state
// ---------------------------------------------------------------------------

/// The single mutable record threaded through all four stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningState {
    /// Correlation id for logs; one per request.
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub initial_query: String,
    pub on_hand_ingredients: Vec<String>,
    /// Written by deal discovery.
    pub search_terms: Vec<String>,
    /// Written by deal discovery; store-filtered copies live in the plan.
    pub found_deals: Vec<Deal>,
    /// Written by meal assignment.
    pub chosen_store: Option<String>,
    /// Written by meal assignment.
    pub meal_plan: Vec<MealPlanItem>,
    /// Written by meal assignment.
    pub missing_ingredients: Vec<String>,
    /// Written by ingredient sourcing.
    pub sourced_ingredients: Vec<SourcedIngredient>,
    /// Written by list consolidation.
    pub shopping_list: ShoppingList,
    /// Outcome of the most recently executed stage.
    pub last_stage_outcome: Option<StageOutcome>,
}

impl PlanningState {
    /// Create a fresh state for one planning request: all collections
    /// empty, no store chosen.
    pub fn new(initial_query: impl Into<String>, on_hand_ingredients: Vec<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            created_at: Utc::now(),
            initial_query: initial_query.into(),
            on_hand_ingredients,
            search_terms: Vec::new(),
            found_deals: Vec::new(),
            chosen_store: None,
            meal_plan: Vec::new(),
            missing_ingredients: Vec::new(),
            sourced_ingredients: Vec::new(),
            shopping_list: ShoppingList::new(),
            last_stage_outcome: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = PlanningState::new("dinner deals", vec!["salt".into()]);
        assert!(state.search_terms.is_empty());
        assert!(state.found_deals.is_empty());
        assert!(state.chosen_store.is_none());
        assert!(state.meal_plan.is_empty());
        assert!(state.missing_ingredients.is_empty());
        assert!(state.sourced_ingredients.is_empty());
        assert!(state.shopping_list.is_empty());
        assert!(state.last_stage_outcome.is_none());
        assert_eq!(state.initial_query, "dinner deals");
        assert_eq!(state.on_hand_ingredients, vec!["salt".to_string()]);
    }

    #[test]
    fn stage_name_roundtrip() {
        for stage in [
            StageName::DealDiscovery,
            StageName::MealAssignment,
            StageName::IngredientSourcing,
            StageName::ListConsolidation,
        ] {
            let parsed: StageName = stage.to_string().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert!("dinner".parse::<StageName>().is_err());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = StageOutcome::Skipped {
            stage: StageName::MealAssignment,
            reason: "no deals".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["stage"], "meal_assignment");
        assert!(!outcome.is_errored());
    }

    #[test]
    fn deal_deserializes_without_optional_fields() {
        let deal: Deal = serde_json::from_str(
            r#"{"id": 7, "name": "Torskefilet", "current_price": 97.9,
                "currency": "NOK", "store": "SPAR"}"#,
        )
        .unwrap();
        assert_eq!(deal.previous_price, None);
        assert_eq!(deal.price_drop_percentage, None);
        assert_eq!(deal.image_url, None);
    }
}
