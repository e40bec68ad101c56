//! Chat completions client (`POST {base_url}/chat/completions`).

use std::collections::BTreeMap;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use pdfqa_shared::{Credential, PdfQaError, Result};

use crate::types::{
    ChatMessage, Completion, CompletionResponse, StreamResponse, ToolCall, ToolDefinition,
};
use crate::{USER_AGENT, endpoint};

/// Receives content fragments as they stream in.
pub type DeltaSink = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

/// An OpenAI-compatible chat client bound to one credential and model.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    credential: Credential,
    model: String,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| PdfQaError::Model(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credential,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One non-streaming completion.
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        let response = self.send(messages, tools, false).await?;
        let data: CompletionResponse = response
            .json()
            .await
            .map_err(|e| PdfQaError::Model(format!("invalid completion response: {e}")))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PdfQaError::Model("completion response has no choices".into()))?;

        debug!(
            tool_calls = choice.message.tool_calls.len(),
            finish_reason = ?choice.finish_reason,
            "completion received"
        );
        Ok(Completion {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
            finish_reason: choice.finish_reason,
        })
    }

    /// One streaming completion over SSE.
    ///
    /// Content fragments are forwarded to `on_delta` as they arrive. Tool call
    /// fragments are stitched together by index. The returned [`Completion`]
    /// has the same shape as [`ChatClient::complete`].
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        on_delta: Option<&DeltaSink>,
    ) -> Result<Completion> {
        let response = self.send(messages, tools, true).await?;
        read_events(response.bytes_stream(), on_delta).await
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<reqwest::Response> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| PdfQaError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PdfQaError::Model(format!("HTTP {status}: {text}")));
        }
        Ok(response)
    }
}

/// Fold an SSE byte stream into a [`Completion`].
///
/// Lines are cut on raw `\n` bytes before decoding, so a multi-byte character
/// split across network chunks is never mangled.
async fn read_events<S, B, E>(stream: S, on_delta: Option<&DeltaSink>) -> Result<Completion>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut acc = StreamAccumulator::default();
    let mut buffer: Vec<u8> = Vec::new();

    'read: while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PdfQaError::Model(format!("stream read failed: {e}")))?;
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if acc.push_line(decode_line(&line)?, on_delta)? {
                break 'read;
            }
        }
    }
    let tail = decode_line(&buffer)?;
    if !tail.is_empty() {
        acc.push_line(tail, on_delta)?;
    }

    Ok(acc.finish())
}

fn decode_line(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|e| PdfQaError::Model(format!("stream line is not valid UTF-8: {e}")))
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("credential", &self.credential)
            .finish()
    }
}

/// Folds SSE `data:` lines into a [`Completion`].
#[derive(Default)]
struct StreamAccumulator {
    content: String,
    saw_content: bool,
    tool_calls: BTreeMap<usize, ToolCall>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    /// Feed one line. Returns `true` once the stream is done.
    fn push_line(&mut self, line: &str, on_delta: Option<&DeltaSink>) -> Result<bool> {
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            return Ok(false);
        };
        if data == "[DONE]" {
            return Ok(true);
        }

        let parsed: StreamResponse = serde_json::from_str(data)
            .map_err(|e| PdfQaError::Model(format!("invalid stream event: {e}")))?;

        for choice in parsed.choices {
            if let Some(fragment) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.saw_content = true;
                self.content.push_str(&fragment);
                if let Some(sink) = on_delta {
                    sink(&fragment);
                }
            }
            for delta in choice.delta.tool_calls {
                let call = self
                    .tool_calls
                    .entry(delta.index)
                    .or_insert_with(|| ToolCall::new("", "", ""));
                if let Some(id) = delta.id {
                    call.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        call.function.name.push_str(&name);
                    }
                    if let Some(args) = function.arguments {
                        call.function.arguments.push_str(&args);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }
        Ok(false)
    }

    fn finish(self) -> Completion {
        Completion {
            content: self.saw_content.then_some(self.content),
            tool_calls: self.tool_calls.into_values().collect(),
            finish_reason: self.finish_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: &str) -> ChatClient {
        ChatClient::new(server.uri(), Credential::new(key), "mixtral-8x7b-32768").unwrap()
    }

    fn text_reply(text: &str) -> serde_json::Value {
        json!({
            "choices": [{
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn sends_bearer_credential_and_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer k1"))
            .and(body_partial_json(json!({"model": "mixtral-8x7b-32768", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Step 3 is...")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server, "k1")
            .complete(&[ChatMessage::user("What is step 3?")], &[])
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("Step 3 is..."));
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn concurrent_clients_keep_their_own_keys() {
        let server = MockServer::start().await;
        for key in ["k1", "k2"] {
            Mock::given(method("POST"))
                .and(header("authorization", format!("Bearer {key}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(key)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let c1 = client(&server, "k1");
        let c2 = client(&server, "k2");
        let msgs = [ChatMessage::user("hi")];
        let (a, b) = tokio::join!(c1.complete(&msgs, &[]), c2.complete(&msgs, &[]));
        assert_eq!(a.unwrap().content.as_deref(), Some("k1"));
        assert_eq!(b.unwrap().content.as_deref(), Some("k2"));
    }

    #[tokio::test]
    async fn http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client(&server, "bad")
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PdfQaError::Model(_)));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[tokio::test]
    async fn tools_are_sent_when_offered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "tool_choice": "auto",
                "tools": [{"type": "function", "function": {"name": "search_knowledge_base"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let tool = ToolDefinition::function(
            "search_knowledge_base",
            "Search the document",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        );
        client(&server, "k1")
            .complete(&[ChatMessage::user("hi")], &[tool])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stream_accumulates_content_and_tool_calls() {
        let server = MockServer::start().await;
        let sse = [
            r#"data: {"choices":[{"delta":{"role":"assistant","content":"Step "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"3 is..."}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search_knowledge_base","arguments":"{\"qu"}}]}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"ery\":\"step 3\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n\n");
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink_seen = seen.clone();
        let sink: DeltaSink = Arc::new(move |d: &str| sink_seen.lock().unwrap().push(d.to_string()));

        let reply = client(&server, "k1")
            .complete_stream(&[ChatMessage::user("hi")], &[], Some(&sink))
            .await
            .unwrap();

        assert_eq!(reply.content.as_deref(), Some("Step 3 is..."));
        assert_eq!(*seen.lock().unwrap(), vec!["Step ", "3 is..."]);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].id, "call_1");
        assert_eq!(reply.tool_calls[0].function.arguments, r#"{"query":"step 3"}"#);
        assert_eq!(reply.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[tokio::test]
    async fn stream_keeps_characters_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"ผัดไทย\"}}]}\n\ndata: [DONE]\n\n";
        let bytes = line.as_bytes();
        // Cut inside the first three-byte character.
        let cut = line.find('ผ').unwrap() + 1;
        let chunks = vec![
            Ok::<_, std::io::Error>(bytes[..cut].to_vec()),
            Ok(bytes[cut..].to_vec()),
        ];

        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = seen.clone();
        let sink: DeltaSink = Arc::new(move |d: &str| sink_seen.lock().unwrap().push_str(d));

        let reply = read_events(futures::stream::iter(chunks), Some(&sink))
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("ผัดไทย"));
        assert_eq!(*seen.lock().unwrap(), "ผัดไทย");
    }

    #[tokio::test]
    async fn stream_rejects_invalid_utf8_line() {
        let mut bytes = b"data: {\"choices\":[{\"delta\":{\"content\":\"".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\"}}]}\n");

        let err = read_events(
            futures::stream::iter(vec![Ok::<_, std::io::Error>(bytes)]),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PdfQaError::Model(_)));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn debug_hides_credential() {
        let c = ChatClient::new("https://api.groq.com/openai/v1", Credential::new("gsk_x"), "m")
            .unwrap();
        assert!(!format!("{c:?}").contains("gsk_x"));
    }
}
