//! The chat-completions generator with a local tool-execution loop.

use std::sync::Arc;

use async_trait::async_trait;
use middag_core::catalog::ProductCatalog;
use middag_core::generate::{CatalogTool, GenerateError, TextGenerator};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::OpenAiConfig;
use crate::wire::{ChatResponse, ToolCallMsg};

const ERROR_BODY_LIMIT: usize = 200;

pub struct OpenAiGenerator {
    http: reqwest::Client,
    config: OpenAiConfig,
    catalog: Arc<dyn ProductCatalog>,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            catalog,
        }
    }

    async fn chat(&self, messages: &[Value], tools: &[Value]) -> Result<ChatResponse, GenerateError> {
        let mut body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerateError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(GenerateError::Backend(format!("HTTP {status}: {body}")));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|err| GenerateError::Backend(format!("undecodable reply: {err}")))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, tools: &[CatalogTool]) -> Result<String, GenerateError> {
        let tool_defs: Vec<Value> = tools.iter().map(tool_definition).collect();
        let mut messages = vec![json!({"role": "system", "content": prompt})];

        for round in 0..=self.config.max_tool_rounds {
            let reply = self.chat(&messages, &tool_defs).await?;
            let Some(choice) = reply.choices.into_iter().next() else {
                return Err(GenerateError::Backend("reply had no choices".to_owned()));
            };

            let message = choice.message;
            match message.tool_calls {
                Some(calls) if !calls.is_empty() => {
                    debug!(round, calls = calls.len(), "executing tool calls");
                    messages.push(assistant_echo(message.content.as_deref(), &calls));
                    for call in calls {
                        let result =
                            run_tool(self.catalog.as_ref(), &call.function.name, &call.function.arguments)
                                .await;
                        messages.push(json!({
                            "role": "tool",
                            "tool_call_id": call.id,
                            "content": result,
                        }));
                    }
                }
                _ => {
                    return message.content.ok_or_else(|| {
                        GenerateError::Backend("reply had no content".to_owned())
                    });
                }
            }
        }

        Err(GenerateError::Backend(format!(
            "tool loop exceeded {} rounds",
            self.config.max_tool_rounds
        )))
    }
}

/// Rebuilds the assistant turn so the backend sees its own tool calls on
/// the next round.
fn assistant_echo(content: Option<&str>, calls: &[ToolCallMsg]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|call| {
            json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.function.name,
                    "arguments": call.function.arguments,
                },
            })
        })
        .collect();
    json!({"role": "assistant", "content": content, "tool_calls": calls})
}

fn tool_definition(tool: &CatalogTool) -> Value {
    match tool {
        CatalogTool::SearchProducts => json!({
            "type": "function",
            "function": {
                "name": tool.to_string(),
                "description": "Search the grocery catalog for products matching a term.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "search": {
                            "type": "string",
                            "description": "Search term, e.g. a product or ingredient name."
                        },
                        "filter_by_price_drop": {
                            "type": "boolean",
                            "description": "Only return products whose price recently dropped."
                        }
                    },
                    "required": ["search"]
                }
            }
        }),
        CatalogTool::ProductDetails => json!({
            "type": "function",
            "function": {
                "name": tool.to_string(),
                "description": "Fetch details for a single product by id.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "integer",
                            "description": "Numeric product id from a search result."
                        }
                    },
                    "required": ["product_id"]
                }
            }
        }),
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    search: String,
    #[serde(default)]
    filter_by_price_drop: bool,
}

#[derive(Deserialize)]
struct DetailArgs {
    product_id: i64,
}

/// Executes one tool call against the catalog. Failures are reported back
/// to the model as text rather than failing the generation, so the model
/// can recover or move on.
async fn run_tool(catalog: &dyn ProductCatalog, name: &str, arguments: &str) -> String {
    let tool: CatalogTool = match name.parse() {
        Ok(tool) => tool,
        Err(err) => {
            warn!(name, "model called unknown tool");
            return format!("error: {err}");
        }
    };

    let result = match tool {
        CatalogTool::SearchProducts => match serde_json::from_str::<SearchArgs>(arguments) {
            Ok(args) => catalog
                .search_products(&args.search, args.filter_by_price_drop)
                .await
                .map_err(|err| err.to_string())
                .and_then(|deals| serde_json::to_string(&deals).map_err(|err| err.to_string())),
            Err(err) => Err(format!("bad arguments: {err}")),
        },
        CatalogTool::ProductDetails => match serde_json::from_str::<DetailArgs>(arguments) {
            Ok(args) => catalog
                .product_details(args.product_id)
                .await
                .map_err(|err| err.to_string())
                .and_then(|detail| serde_json::to_string(&detail).map_err(|err| err.to_string())),
            Err(err) => Err(format!("bad arguments: {err}")),
        },
    };

    match result {
        Ok(body) => body,
        Err(detail) => {
            warn!(tool = %tool, detail, "tool call failed");
            format!("error: {detail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use middag_test_utils::{deal_fixture, FakeCatalog};

    use super::*;

    #[test]
    fn tool_definitions_carry_required_parameters() {
        let def = tool_definition(&CatalogTool::SearchProducts);
        assert_eq!(def["function"]["name"], "search_products");
        assert_eq!(def["function"]["parameters"]["required"][0], "search");

        let def = tool_definition(&CatalogTool::ProductDetails);
        assert_eq!(def["function"]["name"], "get_product_details");
    }

    #[tokio::test]
    async fn search_tool_returns_deals_as_json() {
        let catalog = FakeCatalog::new().with_deals("laks", vec![deal_fixture(1, "Laks", "SPAR")]);
        let reply = run_tool(
            &catalog,
            "search_products",
            r#"{"search": "laks", "filter_by_price_drop": true}"#,
        )
        .await;
        let deals: Vec<Value> = serde_json::from_str(&reply).unwrap();
        assert_eq!(deals[0]["name"], "Laks");
    }

    #[tokio::test]
    async fn details_tool_returns_product_as_json() {
        let catalog = FakeCatalog::new().with_detail(middag_core::catalog::ProductDetail {
            id: 456,
            name: "Meierismør 500g".to_owned(),
            current_price: Some(39.9),
            store: Some("KIWI".to_owned()),
            unit_measure_name: Some("stk".to_owned()),
            image_url: None,
        });
        let reply = run_tool(&catalog, "get_product_details", r#"{"product_id": 456}"#).await;
        let detail: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(detail["name"], "Meierismør 500g");
        assert_eq!(detail["current_price"], 39.9);
    }

    #[tokio::test]
    async fn unknown_tool_reports_error_text() {
        let catalog = FakeCatalog::new();
        let reply = run_tool(&catalog, "browse_web", "{}").await;
        assert!(reply.starts_with("error:"));
    }

    #[tokio::test]
    async fn bad_arguments_report_error_text() {
        let catalog = FakeCatalog::new();
        let reply = run_tool(&catalog, "get_product_details", r#"{"product_id": "x"}"#).await;
        assert!(reply.starts_with("error: bad arguments"));
    }

    #[tokio::test]
    async fn missing_product_reports_error_text() {
        let catalog = FakeCatalog::new();
        let reply = run_tool(&catalog, "get_product_details", r#"{"product_id": 42}"#).await;
        assert!(reply.starts_with("error:"));
    }

    #[test]
    fn assistant_echo_preserves_call_ids() {
        let calls = vec![ToolCallMsg {
            id: "call_1".to_owned(),
            function: crate::wire::FunctionCall {
                name: "search_products".to_owned(),
                arguments: "{}".to_owned(),
            },
        }];
        let echoed = assistant_echo(None, &calls);
        assert_eq!(echoed["tool_calls"][0]["id"], "call_1");
        assert_eq!(echoed["role"], "assistant");
    }
}
