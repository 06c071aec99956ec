//! Deal discovery: the first stage. Asks the generator to search the
//! catalog for dinner-related price drops and collect the results.

use crate::generate::{CatalogTool, TextGenerator};
use crate::sanitize::parse_generator_json;
use crate::state::{PlanningState, StageName, StageOutcome};
use crate::validate::validate_discovery;

use super::{errored, prompts};

/// Run deal discovery and write `search_terms` / `found_deals`.
pub async fn run_deal_discovery(
    generator: &dyn TextGenerator,
    state: &mut PlanningState,
) -> StageOutcome {
    const STAGE: StageName = StageName::DealDiscovery;

    tracing::info!(
        request_id = %state.request_id,
        stage = %STAGE,
        query = %state.initial_query,
        "running deal discovery"
    );

    let prompt = prompts::discovery_prompt(&state.initial_query);
    let reply = match generator
        .generate(&prompt, &[CatalogTool::SearchProducts])
        .await
    {
        Ok(reply) => reply,
        Err(e) => return errored(STAGE, format!("generator call failed: {e}")),
    };

    let value = match parse_generator_json(&reply) {
        Ok(value) => value,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let payload = match validate_discovery(&value) {
        Ok(payload) => payload,
        Err(e) => return errored(STAGE, e.to_string()),
    };

    let summary = format!(
        "found {} deals across {} search terms",
        payload.found_deals.len(),
        payload.search_terms.len()
    );
    tracing::info!(request_id = %state.request_id, stage = %STAGE, "{summary}");

    state.search_terms = payload.search_terms;
    state.found_deals = payload.found_deals;

    StageOutcome::Success {
        stage: STAGE,
        summary,
    }
}
