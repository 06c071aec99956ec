//! Pipeline phase machine and orchestrator.
//!
//! The four stages run in fixed order against one owned
//! [`PlanningState`]. The phase machine enforces the transition graph:
//!
//! ```text
//! pending             -> deal_discovery
//! deal_discovery      -> meal_assignment
//! meal_assignment     -> ingredient_sourcing
//! ingredient_sourcing -> list_consolidation
//! list_consolidation  -> done
//! <any stage phase>   -> errored   (absorbing)
//! ```
//!
//! A skipped stage is a success state with empty output. An errored stage
//! sends the phase to `errored`, where it stays; the remaining executors
//! still run against the unchanged state, so an upstream glitch never
//! loses downstream-independent results, and the final response surfaces
//! whatever partial state exists.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::generate::TextGenerator;
use crate::stage::{
    run_deal_discovery, run_ingredient_sourcing, run_list_consolidation, run_meal_assignment,
};
use crate::state::{MealPlanItem, PlanningState, ShoppingList, StageName};

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

/// Phases of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Pending,
    DealDiscovery,
    MealAssignment,
    IngredientSourcing,
    ListConsolidation,
    Done,
    Errored,
}

impl PipelinePhase {
    /// Check whether a transition from `from` to `to` is a valid edge in
    /// the phase graph.
    pub fn is_valid_transition(from: PipelinePhase, to: PipelinePhase) -> bool {
        matches!(
            (from, to),
            (Self::Pending, Self::DealDiscovery)
                | (Self::DealDiscovery, Self::MealAssignment)
                | (Self::MealAssignment, Self::IngredientSourcing)
                | (Self::IngredientSourcing, Self::ListConsolidation)
                | (Self::ListConsolidation, Self::Done)
                | (Self::DealDiscovery, Self::Errored)
                | (Self::MealAssignment, Self::Errored)
                | (Self::IngredientSourcing, Self::Errored)
                | (Self::ListConsolidation, Self::Errored)
        )
    }

    /// The phase in which a given stage executes.
    pub fn for_stage(stage: StageName) -> PipelinePhase {
        match stage {
            StageName::DealDiscovery => Self::DealDiscovery,
            StageName::MealAssignment => Self::MealAssignment,
            StageName::IngredientSourcing => Self::IngredientSourcing,
            StageName::ListConsolidation => Self::ListConsolidation,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::DealDiscovery => "deal_discovery",
            Self::MealAssignment => "meal_assignment",
            Self::IngredientSourcing => "ingredient_sourcing",
            Self::ListConsolidation => "list_consolidation",
            Self::Done => "done",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

impl FromStr for PipelinePhase {
    type Err = PhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "deal_discovery" => Ok(Self::DealDiscovery),
            "meal_assignment" => Ok(Self::MealAssignment),
            "ingredient_sourcing" => Ok(Self::IngredientSourcing),
            "list_consolidation" => Ok(Self::ListConsolidation),
            "done" => Ok(Self::Done),
            "errored" => Ok(Self::Errored),
            other => Err(PhaseParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PipelinePhase`] string.
#[derive(Debug, Clone)]
pub struct PhaseParseError(pub String);

impl fmt::Display for PhaseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pipeline phase: {:?}", self.0)
    }
}

impl std::error::Error for PhaseParseError {}

// ---------------------------------------------------------------------------
// Request / response contract
// ---------------------------------------------------------------------------

/// The externally observable input of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub query: String,
    #[serde(default)]
    pub on_hand_ingredients: Vec<String>,
}

/// The externally observable result of one planning run. Partial or
/// empty on internal stage failure, never a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub chosen_store: Option<String>,
    pub meal_plan: Vec<MealPlanItem>,
    pub missing_ingredients: Vec<String>,
    pub shopping_list: ShoppingList,
}

impl From<&PlanningState> for PlanResponse {
    fn from(state: &PlanningState) -> Self {
        Self {
            chosen_store: state.chosen_store.clone(),
            meal_plan: state.meal_plan.clone(),
            missing_ingredients: state.missing_ingredients.clone(),
            shopping_list: state.shopping_list.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Result of one pipeline run: the final phase plus the full state.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub phase: PipelinePhase,
    pub state: PlanningState,
}

impl PipelineRun {
    pub fn response(&self) -> PlanResponse {
        PlanResponse::from(&self.state)
    }
}

/// Runs the four stages in fixed order for one request at a time.
///
/// The orchestrator is shared across concurrent requests; each run owns
/// its own state and the generator is the only shared collaborator.
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Run one planning request to completion.
    ///
    /// Never fails for business-logic reasons: stage errors are absorbed
    /// into the phase machine and `last_stage_outcome`, and the
    /// best-effort state is always returned.
    pub async fn run(&self, request: PlanRequest) -> PipelineRun {
        let mut state = PlanningState::new(request.query, request.on_hand_ingredients);
        let mut phase = PipelinePhase::Pending;

        tracing::info!(
            request_id = %state.request_id,
            query = %state.initial_query,
            on_hand = state.on_hand_ingredients.len(),
            "pipeline started"
        );

        for stage in [
            StageName::DealDiscovery,
            StageName::MealAssignment,
            StageName::IngredientSourcing,
            StageName::ListConsolidation,
        ] {
            // Once errored, the phase is absorbing; the executors still
            // run so later stages can salvage what input they have.
            if phase != PipelinePhase::Errored {
                let next = PipelinePhase::for_stage(stage);
                debug_assert!(PipelinePhase::is_valid_transition(phase, next));
                phase = next;
            }

            let outcome = match stage {
                StageName::DealDiscovery => {
                    run_deal_discovery(self.generator.as_ref(), &mut state).await
                }
                StageName::MealAssignment => {
                    run_meal_assignment(self.generator.as_ref(), &mut state).await
                }
                StageName::IngredientSourcing => {
                    run_ingredient_sourcing(self.generator.as_ref(), &mut state).await
                }
                StageName::ListConsolidation => {
                    run_list_consolidation(self.generator.as_ref(), &mut state).await
                }
            };

            if outcome.is_errored() {
                phase = PipelinePhase::Errored;
            }
            state.last_stage_outcome = Some(outcome);
        }

        if phase != PipelinePhase::Errored {
            debug_assert!(PipelinePhase::is_valid_transition(
                phase,
                PipelinePhase::Done
            ));
            phase = PipelinePhase::Done;
        }

        tracing::info!(
            request_id = %state.request_id,
            phase = %phase,
            deals = state.found_deals.len(),
            meals = state.meal_plan.len(),
            "pipeline finished"
        );

        PipelineRun { phase, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_valid() {
        use PipelinePhase::*;
        let chain = [
            Pending,
            DealDiscovery,
            MealAssignment,
            IngredientSourcing,
            ListConsolidation,
            Done,
        ];
        for pair in chain.windows(2) {
            assert!(
                PipelinePhase::is_valid_transition(pair[0], pair[1]),
                "{} -> {} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn every_stage_phase_can_error() {
        use PipelinePhase::*;
        for phase in [
            DealDiscovery,
            MealAssignment,
            IngredientSourcing,
            ListConsolidation,
        ] {
            assert!(PipelinePhase::is_valid_transition(phase, Errored));
        }
    }

    #[test]
    fn errored_is_absorbing() {
        use PipelinePhase::*;
        for to in [
            Pending,
            DealDiscovery,
            MealAssignment,
            IngredientSourcing,
            ListConsolidation,
            Done,
            Errored,
        ] {
            assert!(!PipelinePhase::is_valid_transition(Errored, to));
        }
    }

    #[test]
    fn no_skipping_ahead() {
        use PipelinePhase::*;
        assert!(!PipelinePhase::is_valid_transition(Pending, MealAssignment));
        assert!(!PipelinePhase::is_valid_transition(DealDiscovery, Done));
        assert!(!PipelinePhase::is_valid_transition(Pending, Errored));
    }

    #[test]
    fn phase_roundtrip() {
        use PipelinePhase::*;
        for phase in [
            Pending,
            DealDiscovery,
            MealAssignment,
            IngredientSourcing,
            ListConsolidation,
            Done,
            Errored,
        ] {
            let parsed: PipelinePhase = phase.to_string().parse().unwrap();
            assert_eq!(parsed, phase);
        }
        assert!("paused".parse::<PipelinePhase>().is_err());
    }

    #[test]
    fn plan_request_tolerates_missing_on_hand() {
        let request: PlanRequest = serde_json::from_str(r#"{"query": "dinner"}"#).unwrap();
        assert!(request.on_hand_ingredients.is_empty());
    }
}
