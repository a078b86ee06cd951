use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{DrawUseCase, GeneratorUseCase, HistoryUseCase};

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

impl Tool {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

fn user_properties() -> Value {
    json!({
        "birth_date": {
            "type": "string",
            "description": "Birth date as 8 digits, YYYYMMDD"
        },
        "gender": {
            "type": "string",
            "description": "male or female"
        }
    })
}

fn constraint_properties() -> Value {
    json!({
        "exclude": {
            "type": "array",
            "items": {"type": "integer", "minimum": 1, "maximum": 45},
            "description": "Numbers that must not appear"
        },
        "include": {
            "type": "array",
            "items": {"type": "integer", "minimum": 1, "maximum": 45},
            "maxItems": 6,
            "description": "Numbers that must appear in every set"
        },
        "prevent_consecutive": {
            "type": "boolean",
            "description": "Reject sets containing two consecutive numbers"
        }
    })
}

fn target_properties() -> Value {
    json!({
        "winning_numbers": {
            "type": "array",
            "items": {"type": "integer", "minimum": 1, "maximum": 45},
            "minItems": 6,
            "maxItems": 6,
            "description": "The six winning numbers"
        },
        "bonus_number": {
            "type": "integer",
            "minimum": 1,
            "maximum": 45,
            "description": "Bonus number, distinct from the winning numbers"
        }
    })
}

fn filter_properties() -> Value {
    json!({
        "birth_date": {"type": "string", "description": "Only entries for this birth date"},
        "gender": {"type": "string", "description": "Only entries for this gender"},
        "mode": {"type": "string", "enum": ["all", "normal", "game"]}
    })
}

fn merge(parts: &[Value]) -> Value {
    let mut merged = serde_json::Map::new();
    for part in parts {
        if let Some(object) = part.as_object() {
            merged.extend(object.clone());
        }
    }
    Value::Object(merged)
}

fn id_properties() -> Value {
    json!({
        "id": {"type": "string", "description": "History entry id"}
    })
}

pub struct MCPHandler {
    generator_use_case: Arc<GeneratorUseCase>,
    history_use_case: Arc<HistoryUseCase>,
    draw_use_case: Arc<DrawUseCase>,
}

impl MCPHandler {
    pub fn new(
        generator_use_case: Arc<GeneratorUseCase>,
        history_use_case: Arc<HistoryUseCase>,
        draw_use_case: Arc<DrawUseCase>,
    ) -> Self {
        Self {
            generator_use_case,
            history_use_case,
            draw_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse::failure(
                        None,
                        PARSE_ERROR,
                        "Parse error".to_string(),
                        Some(json!(e.to_string())),
                    );
                    writeln!(writer, "{}", serde_json::to_string(&error_response)?)?;
                    writer.flush()?;
                    continue;
                }
            };

            let is_notification =
                request.id.is_none() || request.method.starts_with("notifications/");
            if is_notification {
                if request.method == "notifications/initialized" {
                    info!("🎰 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            writeln!(writer, "{}", serde_json::to_string(&response)?)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.get_tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse::failure(
                Some(request.id.unwrap_or(json!(1))),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎰 Initializing lotto MCP server");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto-mcp-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(
                Some(id.unwrap_or(json!(1))),
                INVALID_PARAMS,
                "Missing params".to_string(),
                None,
            );
        };

        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(
                Some(id.unwrap_or(json!(1))),
                INVALID_PARAMS,
                "Missing tool name".to_string(),
                None,
            );
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> = match serde_json::from_value(arguments) {
            Ok(map) => map,
            Err(e) => {
                return JsonRpcResponse::failure(
                    Some(id.unwrap_or(json!(1))),
                    INVALID_PARAMS,
                    format!("Arguments must be an object: {}", e),
                    None,
                );
            }
        };

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool failed");
                JsonRpcResponse::failure(
                    Some(id.unwrap_or(json!(1))),
                    INTERNAL_ERROR,
                    format!("Tool execution error: {}", e),
                    None,
                )
            }
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "generate_numbers" => self.generator_use_case.generate_numbers(arguments).await,
            "estimate_chance" => self.generator_use_case.estimate_chance(arguments).await,
            "evaluate_rank" => self.generator_use_case.evaluate_rank(arguments).await,
            "play_game" => self.generator_use_case.play_game(arguments).await,
            "get_history" => self.history_use_case.get_history(arguments).await,
            "get_history_summary" => self.history_use_case.get_history_summary(arguments).await,
            "delete_history_entry" => self.history_use_case.delete_history_entry(arguments).await,
            "clear_history" => self.history_use_case.clear_history(arguments).await,
            "check_history_entry" => self.history_use_case.check_history_entry(arguments).await,
            "get_game_state" => self.history_use_case.get_game_state(arguments).await,
            "save_game_target" => self.history_use_case.save_game_target(arguments).await,
            "reset_game_mode" => self.history_use_case.reset_game_mode(arguments).await,
            "import_draw_json" => self.draw_use_case.import_draw_json(arguments).await,
            "get_latest_draw" => self.draw_use_case.get_latest_draw(arguments).await,
            "get_recent_draws" => self.draw_use_case.get_recent_draws(arguments).await,
            "get_next_draw" => self.draw_use_case.get_next_draw(arguments).await,
            "get_number_frequency" => self.draw_use_case.get_number_frequency(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "generate_numbers",
                "Generate five 6-number sets for the next draw from a birth-date seed and store the run",
                json!({
                    "type": "object",
                    "properties": merge(&[user_properties(), constraint_properties()]),
                    "required": ["birth_date", "gender"]
                }),
            ),
            Tool::new(
                "estimate_chance",
                "Estimate the decorative personal winning chance (1-20%)",
                json!({
                    "type": "object",
                    "properties": user_properties(),
                    "required": ["birth_date", "gender"]
                }),
            ),
            Tool::new(
                "evaluate_rank",
                "Rank one 6-number set against winning numbers and a bonus number",
                json!({
                    "type": "object",
                    "properties": merge(&[
                        json!({
                            "numbers": {
                                "type": "array",
                                "items": {"type": "integer", "minimum": 1, "maximum": 45},
                                "minItems": 6,
                                "maxItems": 6
                            }
                        }),
                        target_properties(),
                    ]),
                    "required": ["numbers", "winning_numbers", "bonus_number"]
                }),
            ),
            Tool::new(
                "play_game",
                "Generate five sets against a chosen target, rank them and store the game run",
                json!({
                    "type": "object",
                    "properties": merge(&[user_properties(), constraint_properties(), target_properties()]),
                    "required": ["birth_date", "gender", "winning_numbers", "bonus_number"]
                }),
            ),
            Tool::new(
                "get_history",
                "List stored runs, newest first",
                json!({
                    "type": "object",
                    "properties": merge(&[
                        filter_properties(),
                        json!({"limit": {"type": "integer", "description": "Maximum entries to return"}}),
                    ])
                }),
            ),
            Tool::new(
                "get_history_summary",
                "Count stored runs by mode and winning game runs",
                json!({
                    "type": "object",
                    "properties": filter_properties()
                }),
            ),
            Tool::new(
                "delete_history_entry",
                "Delete one stored run by id",
                json!({
                    "type": "object",
                    "properties": id_properties(),
                    "required": ["id"]
                }),
            ),
            Tool::new(
                "clear_history",
                "Delete every stored run",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::new(
                "check_history_entry",
                "Rank a stored run against its draw (normal mode) or its target (game mode)",
                json!({
                    "type": "object",
                    "properties": id_properties(),
                    "required": ["id"]
                }),
            ),
            Tool::new(
                "get_game_state",
                "Current game-mode target and last generated game sets",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::new(
                "save_game_target",
                "Remember a game-mode target without generating",
                json!({
                    "type": "object",
                    "properties": target_properties(),
                    "required": ["winning_numbers", "bonus_number"]
                }),
            ),
            Tool::new(
                "reset_game_mode",
                "Forget the game-mode target and last game sets",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::new(
                "import_draw_json",
                "Parse one official drawing result JSON document and store it",
                json!({
                    "type": "object",
                    "properties": {
                        "raw_json": {
                            "type": "string",
                            "description": "Raw JSON string containing one drawing result"
                        }
                    },
                    "required": ["raw_json"]
                }),
            ),
            Tool::new(
                "get_latest_draw",
                "Most recent stored drawing result",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::new(
                "get_recent_draws",
                "Most recent stored drawing results, newest first",
                json!({
                    "type": "object",
                    "properties": {
                        "count": {
                            "type": "integer",
                            "description": "Number of draws to return (default: 10)"
                        }
                    }
                }),
            ),
            Tool::new(
                "get_next_draw",
                "Number and date of the next draw",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::new(
                "get_number_frequency",
                "How often each number came up over recent stored draws",
                json!({
                    "type": "object",
                    "properties": {
                        "count": {
                            "type": "integer",
                            "description": "Number of recent draws to analyse (default: 50)"
                        }
                    }
                }),
            ),
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}
