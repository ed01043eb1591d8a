//! Line-delimited JSON-RPC 2.0 over stdin/stdout.
//!
//! Requests are read one per line. `tools/call` runs on its own task; every
//! response goes through a single writer task so lines never interleave.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::server::protocol::{
    CallToolParams, CallToolResult, EmptyResult, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, RpcResult, ServerCapabilities, ServerInfo, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::handlers::ToolHandlers;
use crate::utils::constants::SERVER_NAME;

const OUTBOUND_BUFFER: usize = 64;

pub async fn serve_stdio(handlers: ToolHandlers) -> Result<()> {
    info!("serving tools on stdio");
    serve(handlers, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Runs until `reader` hits EOF and every in-flight call has answered.
pub async fn serve<R, W>(handlers: ToolHandlers, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOUND_BUFFER);
    let writer_task = tokio::spawn(write_loop(rx, writer));

    // raw bytes: a line that is not UTF-8 is a parse error, not the end of the session
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("reading request line")?;
        if read == 0 {
            break;
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        if let Some(response) = handle_line(&handlers, line, &tx) {
            if tx.send(response).await.is_err() {
                warn!("response writer stopped, ending session");
                break;
            }
        }
    }

    debug!("input closed, waiting for in-flight calls");
    drop(tx);
    writer_task.await.context("response writer panicked")?
}

async fn write_loop<W>(mut rx: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_vec(&message).context("encoding response")?;
        line.push(b'\n');
        writer.write_all(&line).await.context("writing response")?;
        writer.flush().await.context("flushing response")?;
    }
    Ok(())
}

/// Immediate response for `line`, if any. Tool calls answer later through `tx`.
fn handle_line(
    handlers: &ToolHandlers,
    line: &[u8],
    tx: &mpsc::Sender<JsonRpcResponse>,
) -> Option<JsonRpcResponse> {
    let message: Value = match serde_json::from_slice(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("unparsable request: {}", e);
            return Some(JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}")));
        }
    };
    let request = match JsonRpcRequest::deserialize(&message) {
        Ok(request) => request,
        Err(e) => {
            let id = message.get("id").and_then(|id| RequestId::deserialize(id).ok());
            return Some(JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {e}")));
        }
    };

    // notifications never get an answer
    let Some(id) = request.id else {
        debug!(method = %request.method, "notification received");
        return None;
    };

    debug!(method = %request.method, "request received");
    let result = match request.method.as_str() {
        "initialize" => RpcResult::Initialize(InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
        }),
        "ping" => RpcResult::Empty(EmptyResult {}),
        "tools/list" => RpcResult::ListTools(ListToolsResult {
            tools: handlers.definitions(),
        }),
        "tools/call" => {
            let params = match CallToolParams::deserialize(&request.params) {
                Ok(params) => params,
                Err(e) => {
                    return Some(JsonRpcResponse::error(
                        Some(id),
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    ));
                }
            };
            let handlers = handlers.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = call_tool(&handlers, params).await;
                if tx
                    .send(JsonRpcResponse::result(id, RpcResult::CallTool(result)))
                    .await
                    .is_err()
                {
                    error!("response writer gone, dropping tool result");
                }
            });
            return None;
        }
        other => {
            return Some(JsonRpcResponse::error(
                Some(id),
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ));
        }
    };
    Some(JsonRpcResponse::result(id, result))
}

/// Tool failures are results with `isError`, never protocol errors.
async fn call_tool(handlers: &ToolHandlers, params: CallToolParams) -> CallToolResult {
    match handlers.call(&params.name, params.arguments).await {
        Ok(text) => CallToolResult::text(text),
        Err(err) => {
            warn!(tool = %params.name, kind = err.kind(), "tool call failed: {}", err);
            CallToolResult::error(format!("Error: {err}"))
        }
    }
}
