//! MCP server speaking newline-delimited JSON-RPC 2.0 over stdio.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, Write};

use crate::tools::{self, Dispatcher};

pub const SERVER_NAME: &str = "ansible-mcp";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct Server {
    dispatcher: Dispatcher,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve requests from `input` until EOF, writing one response line per request.
    pub fn serve<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        tracing::info!(
            config = ?self.dispatcher.store().path(),
            projects = self.dispatcher.store().config().projects.len(),
            "server started"
        );

        let mut line = Vec::new();
        loop {
            line.clear();
            let read = input
                .read_until(b'\n', &mut line)
                .context("Failed to read request")?;
            if read == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if let Some(response) = self.handle_line(&line) {
                let encoded =
                    serde_json::to_string(&response).context("Failed to encode response")?;
                writeln!(output, "{encoded}").context("Failed to write response")?;
                output.flush().context("Failed to write response")?;
            }
        }

        tracing::info!("input closed, shutting down");
        Ok(())
    }

    fn handle_line(&mut self, line: &[u8]) -> Option<Response> {
        let mut message: Value = match serde_json::from_slice(line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "unparseable request");
                return Some(Response::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {err}"),
                ));
            }
        };

        let Some(object) = message.as_object_mut() else {
            return Some(Response::failure(
                Value::Null,
                INVALID_REQUEST,
                "Request must be a JSON object",
            ));
        };

        // Only a missing id marks a notification; an explicit null is answered.
        let Some(id) = object.remove("id") else {
            tracing::debug!(method = ?object.get("method"), "notification");
            return None;
        };

        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(err) => {
                return Some(Response::failure(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {err}"),
                ))
            }
        };

        tracing::debug!(method = %request.method, "request");
        Some(self.handle_request(id, &request.method, request.params))
    }

    fn handle_request(&mut self, id: Value, method: &str, params: Value) -> Response {
        match method {
            "initialize" => Response::success(id, initialize_result(&params)),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(id, json!({"tools": tools::catalog()})),
            "tools/call" => self.call_tool(id, params),
            _ => Response::failure(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
        }
    }

    fn call_tool(&mut self, id: Value, params: Value) -> Response {
        let params: CallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                return Response::failure(id, INVALID_PARAMS, format!("Invalid params: {err}"))
            }
        };

        match self.dispatcher.call(&params.name, params.arguments) {
            Ok(text) => Response::success(id, tool_result(text, false)),
            Err(err) if err.is_request_error() => {
                Response::failure(id, INVALID_PARAMS, err.to_string())
            }
            Err(err) => {
                tracing::error!(tool = %params.name, error = %err, "tool failed");
                Response::success(id, tool_result(err.to_string(), true))
            }
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
    })
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfiguration;
    use crate::tools::testing::{config_with, dispatcher, project, RecordingRunner};
    use tempfile::TempDir;

    fn exchange(server: &mut Server, input: impl AsRef<[u8]>) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_ref(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn server(temp: &TempDir, config: ServerConfiguration) -> (Server, RecordingRunner) {
        let runner = RecordingRunner::default();
        let server = Server::new(dispatcher(temp.path(), config, &runner));
        (server, runner)
    }

    #[test]
    fn test_initialize_and_notifications() {
        let temp = TempDir::new().unwrap();
        let (mut server, _) = server(&temp, ServerConfiguration::default());

        let responses = exchange(
            &mut server,
            concat!(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                "\n\n",
                r#"{"jsonrpc":"2.0","id":"two","method":"ping"}"#,
                "\n",
            ),
        );

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(responses[1]["id"], "two");
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[test]
    fn test_initialize_default_protocol_version() {
        assert_eq!(
            initialize_result(&Value::Null)["protocolVersion"],
            PROTOCOL_VERSION
        );
    }

    #[test]
    fn test_tools_list() {
        let temp = TempDir::new().unwrap();
        let (mut server, _) = server(&temp, ServerConfiguration::default());

        let responses = exchange(
            &mut server,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
        );
        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), tools::catalog().len());
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[test]
    fn test_tools_call() {
        let temp = TempDir::new().unwrap();
        let (mut server, runner) = server(&temp, config_with(project("web", temp.path())));
        runner.respond(0, "web1 | SUCCESS", "");

        let responses = exchange(
            &mut server,
            concat!(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"ansible_ping","arguments":{}}}"#,
                "\n"
            ),
        );

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        let payload: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["stdout"], "web1 | SUCCESS");
        assert_eq!(runner.last().args, vec!["all", "-i", "hosts.ini", "-m", "ping"]);
    }

    #[test]
    fn test_errors() {
        let temp = TempDir::new().unwrap();
        let (mut server, _) = server(&temp, ServerConfiguration::default());

        let responses = exchange(
            &mut server,
            concat!(
                "not json\n",
                r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope"}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"ansible_task","arguments":{"hosts":"all"}}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{}}"#,
                "\n",
            ),
        );

        assert_eq!(responses.len(), 5);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[3]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[4]["error"]["code"], INVALID_PARAMS);
        assert!(responses.iter().all(|r| r.get("result").is_none()));
    }

    #[test]
    fn test_invalid_utf8_line_keeps_serving() {
        let temp = TempDir::new().unwrap();
        let (mut server, _) = server(&temp, ServerConfiguration::default());

        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"\xff\"}\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");

        let responses = exchange(&mut server, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[test]
    fn test_invalid_requests() {
        let temp = TempDir::new().unwrap();
        let (mut server, _) = server(&temp, ServerConfiguration::default());

        let responses = exchange(
            &mut server,
            concat!(
                r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
                "\n",
                "[]\n",
                "\"x\"\n",
                r#"{"jsonrpc":"2.0","id":5}"#,
                "\n",
            ),
        );

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["error"]["code"], INVALID_REQUEST);
        assert_eq!(responses[2]["error"]["code"], INVALID_REQUEST);
        assert_eq!(responses[3]["id"], 5);
        assert_eq!(responses[3]["error"]["code"], INVALID_REQUEST);
    }
}
