use anyhow::{Context, Result};

use middag_core::pipeline::{Pipeline, PipelinePhase, PlanRequest};

/// Execute the `middag plan` command: run one planning request and print
/// the response as pretty JSON.
pub async fn run_plan(pipeline: &Pipeline, query: String, on_hand: Vec<String>) -> Result<()> {
    let run = pipeline
        .run(PlanRequest {
            query,
            on_hand_ingredients: on_hand,
        })
        .await;

    if run.phase == PipelinePhase::Errored {
        if let Some(outcome) = &run.state.last_stage_outcome {
            eprintln!("warning: planning finished with an errored stage ({outcome:?})");
        }
    }

    let json =
        serde_json::to_string_pretty(&run.response()).context("failed to render plan response")?;
    println!("{json}");
    Ok(())
}

/// Parse the `--on-hand` flag: a comma-separated ingredient list.
pub fn parse_on_hand(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use middag_test_utils::ScriptedGenerator;

    use super::*;

    #[test]
    fn on_hand_splits_and_trims() {
        assert_eq!(
            parse_on_hand(Some("rice , pasta,, onions")),
            vec!["rice", "pasta", "onions"]
        );
        assert!(parse_on_hand(None).is_empty());
        assert!(parse_on_hand(Some("  ")).is_empty());
    }

    #[tokio::test]
    async fn run_plan_accepts_a_prebuilt_pipeline() {
        let generator = ScriptedGenerator::new()
            .reply(r#"{"search_terms": [], "found_deals": []}"#);
        let pipeline = Pipeline::new(Arc::new(generator));

        let result = run_plan(&pipeline, "plan my week".to_owned(), Vec::new()).await;
        assert!(result.is_ok());
    }
}
