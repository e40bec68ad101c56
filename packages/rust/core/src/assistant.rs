//! Tool-calling assistant over a knowledge base and a chat history.
//!
//! [`KnowledgeAssistant::run`] sends the question to the chat model together
//! with the tools its options allow, executes whatever tool calls come back,
//! and repeats until the model answers in plain text. The finished turn is
//! written to the history store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use pdfqa_llm::{ChatClient, ChatMessage, Completion, DeltaSink, ToolCall, ToolDefinition};
use pdfqa_shared::{AssistantOptions, ChatTurn, PdfQaError, Result, SessionId};

use crate::collaborators::{Assistant, HistoryStore, KnowledgeBase};

pub const SEARCH_TOOL: &str = "search_knowledge_base";
pub const HISTORY_TOOL: &str = "get_chat_history";

const DEFAULT_NUM_CHATS: u64 = 3;

/// Answers questions about a knowledge base, remembering the conversation.
pub struct KnowledgeAssistant<K, H> {
    knowledge: Arc<K>,
    history: H,
    chat: ChatClient,
    options: AssistantOptions,
    session_id: SessionId,
    delta_sink: Option<DeltaSink>,
}

impl<K: KnowledgeBase, H: HistoryStore> KnowledgeAssistant<K, H> {
    pub fn new(
        knowledge: Arc<K>,
        history: H,
        chat: ChatClient,
        options: AssistantOptions,
        session_id: SessionId,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            knowledge,
            history,
            chat,
            options,
            session_id,
            delta_sink: None,
        })
    }

    /// Forward streamed content fragments to `sink` when running with `stream = true`.
    pub fn with_delta_sink(mut self, sink: DeltaSink) -> Self {
        self.delta_sink = Some(sink);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.options
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let mut tools = Vec::new();
        if self.options.search_knowledge {
            tools.push(ToolDefinition::function(
                SEARCH_TOOL,
                "Search the knowledge base for passages relevant to a query.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "What to look for."}
                    },
                    "required": ["query"]
                }),
            ));
        }
        if self.options.read_chat_history {
            tools.push(ToolDefinition::function(
                HISTORY_TOOL,
                "Read the most recent question and answer pairs from this conversation.",
                json!({
                    "type": "object",
                    "properties": {
                        "num_chats": {
                            "type": "integer",
                            "description": "How many previous exchanges to return.",
                            "default": DEFAULT_NUM_CHATS
                        }
                    }
                }),
            ));
        }
        tools
    }

    fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are a helpful assistant that answers questions about documents in a knowledge base.",
        );
        if self.options.search_knowledge {
            prompt.push_str(&format!(
                "\nAlways call `{SEARCH_TOOL}` first to find information relevant to the question, \
                 and base your answer on what it returns."
            ));
        }
        if self.options.read_chat_history {
            prompt.push_str(&format!(
                "\nIf the question refers to earlier messages, call `{HISTORY_TOOL}` to see them."
            ));
        }
        prompt.push_str(
            "\nIf the knowledge base does not contain the answer, say so instead of guessing.\
             \nUse markdown to format your answers.",
        );
        prompt
    }

    /// One model round. Content goes into `transcript` as it arrives.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
        transcript: &Arc<Mutex<Transcript>>,
    ) -> Result<Completion> {
        if stream {
            let shared = Arc::clone(transcript);
            let sink: DeltaSink = Arc::new(move |delta: &str| lock(&shared).push(delta));
            self.chat.complete_stream(messages, tools, Some(&sink)).await
        } else {
            let completion = self.chat.complete(messages, tools).await?;
            if let Some(content) = &completion.content {
                lock(transcript).push(content);
            }
            Ok(completion)
        }
    }

    /// Run one tool call.
    ///
    /// Unknown tools and bad arguments come back as `Ok` error text for the
    /// model to read. Retrieval and storage failures are real errors.
    async fn execute_tool(&self, call: &ToolCall) -> Result<String> {
        let args = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(message) => return Ok(message),
        };

        match call.function.name.as_str() {
            SEARCH_TOOL if self.options.search_knowledge => {
                let Some(query) = args.get("query").and_then(Value::as_str) else {
                    return Ok(format!("Error: {SEARCH_TOOL} requires a string `query`"));
                };
                let passages = self
                    .knowledge
                    .search(query, self.options.search_limit as usize)
                    .await?;
                debug!(query, hits = passages.len(), "knowledge searched");
                if passages.is_empty() {
                    return Ok("No documents found".to_string());
                }
                serde_json::to_string(&passages)
                    .map_err(|e| PdfQaError::query(format!("encoding search results: {e}")))
            }
            HISTORY_TOOL if self.options.read_chat_history => {
                let requested = match args.get("num_chats") {
                    None | Some(Value::Null) => DEFAULT_NUM_CHATS,
                    Some(v) => match v.as_u64() {
                        Some(n) => n,
                        None => {
                            return Ok(format!(
                                "Error: {HISTORY_TOOL} `num_chats` must be a non-negative integer"
                            ));
                        }
                    },
                };
                let limit = requested.min(self.options.history_turns as u64) as usize;
                let turns = self.history.recent_turns(&self.session_id, limit).await?;
                let exchanges: Vec<Value> = turns
                    .iter()
                    .flat_map(|t| {
                        [
                            json!({"role": "user", "content": t.question}),
                            json!({"role": "assistant", "content": t.answer}),
                        ]
                    })
                    .collect();
                Ok(Value::Array(exchanges).to_string())
            }
            other => {
                warn!(tool = other, "model called an unavailable tool");
                Ok(format!("Error: unknown tool `{other}`"))
            }
        }
    }
}

impl<K: KnowledgeBase, H: HistoryStore> Assistant for KnowledgeAssistant<K, H> {
    #[instrument(skip_all, fields(session = %self.session_id, model = %self.options.model_id, stream))]
    async fn run(&self, question: &str, stream: bool) -> Result<String> {
        let tools = self.tools();
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(question),
        ];
        let sink = if stream { self.delta_sink.clone() } else { None };
        let transcript = Arc::new(Mutex::new(Transcript::new(sink)));
        let mut calls = 0usize;

        for round in 1..=self.options.max_tool_rounds {
            lock(&transcript).start_round();
            let completion = self.complete(&messages, &tools, stream, &transcript).await?;

            if completion.tool_calls.is_empty() {
                let answer = lock(&transcript).text.clone();

                let turn = ChatTurn::new(
                    &self.session_id,
                    &self.options.model_id,
                    question,
                    answer.as_str(),
                );
                self.history
                    .append_turn(&turn)
                    .await
                    .map_err(|e| PdfQaError::query(format!("saving chat history: {e}")))?;

                info!(round, tool_calls = calls, "answer ready");
                return Ok(answer);
            }

            messages.push(ChatMessage::assistant(
                completion.content,
                completion.tool_calls.clone(),
            ));
            for call in &completion.tool_calls {
                calls += 1;
                if self.options.show_tool_calls {
                    lock(&transcript).tool_line(&describe_call(call));
                }
                let output = self.execute_tool(call).await?;
                messages.push(ChatMessage::tool(call.id.as_str(), output));
            }
        }

        Err(PdfQaError::query(format!(
            "model did not answer within {} tool rounds",
            self.options.max_tool_rounds
        )))
    }
}

/// The answer as it is built up across rounds.
///
/// Every piece appended here is also forwarded to the delta sink, so a
/// streamed answer reads exactly like the returned one.
struct Transcript {
    text: String,
    sink: Option<DeltaSink>,
    /// A paragraph break is owed before the next content.
    break_pending: bool,
}

impl Transcript {
    fn new(sink: Option<DeltaSink>) -> Self {
        Self {
            text: String::new(),
            sink,
            break_pending: false,
        }
    }

    fn start_round(&mut self) {
        if !self.text.is_empty() {
            self.break_pending = true;
        }
    }

    /// Model content.
    fn push(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        if self.break_pending {
            self.break_pending = false;
            let gap = if self.text.ends_with('\n') { "\n" } else { "\n\n" };
            self.write(gap);
        }
        self.write(content);
    }

    /// One ` - Running: ...` line.
    fn tool_line(&mut self, line: &str) {
        self.break_pending = false;
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.write("\n");
        }
        self.write(line);
        self.write("\n");
        self.break_pending = true;
    }

    fn write(&mut self, piece: &str) {
        self.text.push_str(piece);
        if let Some(sink) = &self.sink {
            sink(piece);
        }
    }
}

fn lock(transcript: &Mutex<Transcript>) -> MutexGuard<'_, Transcript> {
    transcript.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parse_arguments(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Error: tool arguments must be a JSON object".to_string()),
        Err(e) => Err(format!("Error: could not parse tool arguments: {e}")),
    }
}

/// ` - Running: name(arg=value, ...)`
fn describe_call(call: &ToolCall) -> String {
    let args = match serde_json::from_str::<Value>(&call.function.arguments) {
        Ok(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => call.function.arguments.clone(),
    };
    format!(" - Running: {}({args})", call.function.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pdfqa_shared::{Credential, IndexOutcome, Passage};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct FixedKnowledge {
        queries: Mutex<Vec<String>>,
    }

    impl KnowledgeBase for FixedKnowledge {
        async fn ensure_indexed(&self, _force: bool) -> Result<Vec<IndexOutcome>> {
            Ok(Vec::new())
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(vec![Passage {
                source_url: "https://example.com/doc.pdf".into(),
                chunk_index: 2,
                content: "Step 3: add tamarind".into(),
                score: 0.9,
            }]
            .into_iter()
            .take(limit)
            .collect())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryHistory {
        turns: Arc<Mutex<Vec<ChatTurn>>>,
        limits: Arc<Mutex<Vec<usize>>>,
        fail_append: bool,
    }

    impl HistoryStore for MemoryHistory {
        async fn recent_turns(&self, session: &SessionId, limit: usize) -> Result<Vec<ChatTurn>> {
            self.limits.lock().unwrap().push(limit);
            let turns = self.turns.lock().unwrap();
            let mine: Vec<_> = turns
                .iter()
                .filter(|t| t.session_id == session.to_string())
                .cloned()
                .collect();
            Ok(mine[mine.len().saturating_sub(limit)..].to_vec())
        }

        async fn append_turn(&self, turn: &ChatTurn) -> Result<()> {
            if self.fail_append {
                return Err(PdfQaError::Storage("disk full".into()));
            }
            self.turns.lock().unwrap().push(turn.clone());
            Ok(())
        }
    }

    fn options() -> AssistantOptions {
        AssistantOptions {
            model_id: "mixtral-8x7b-32768".into(),
            show_tool_calls: true,
            search_knowledge: true,
            read_chat_history: true,
            max_tool_rounds: 5,
            history_turns: 3,
            search_limit: 5,
        }
    }

    fn assistant(
        server: &MockServer,
        history: MemoryHistory,
        options: AssistantOptions,
    ) -> KnowledgeAssistant<FixedKnowledge, MemoryHistory> {
        let chat = ChatClient::new(server.uri(), Credential::new("k1"), &options.model_id).unwrap();
        KnowledgeAssistant::new(
            Arc::new(FixedKnowledge::default()),
            history,
            chat,
            options,
            SessionId::new(),
        )
        .unwrap()
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        }))
    }

    fn tool_reply(name: &str, arguments: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
    }

    /// First request gets `first`; any request carrying a tool result gets `then`.
    async fn script(server: &MockServer, first: ResponseTemplate, then: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("tool_call_id"))
            .respond_with(then)
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(first)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn searches_then_answers_with_tool_call_prefix() {
        let server = MockServer::start().await;
        script(
            &server,
            tool_reply(SEARCH_TOOL, r#"{"query":"step 3"}"#),
            text_reply("Step 3 is adding tamarind."),
        )
        .await;

        let history = MemoryHistory::default();
        let assistant = assistant(&server, history.clone(), options());
        let answer = assistant.run("What is step 3?", false).await.unwrap();

        assert_eq!(
            answer,
            " - Running: search_knowledge_base(query=step 3)\n\nStep 3 is adding tamarind."
        );
        assert_eq!(*assistant.knowledge.queries.lock().unwrap(), vec!["step 3"]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let second = String::from_utf8_lossy(&requests[1].body);
        assert!(second.contains("Step 3: add tamarind"));

        let saved = history.turns.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].question, "What is step 3?");
        assert_eq!(saved[0].answer, answer);
    }

    #[tokio::test]
    async fn hidden_tool_calls_and_no_tools_offered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("Plain answer"))
            .expect(1)
            .mount(&server)
            .await;

        let opts = AssistantOptions {
            show_tool_calls: false,
            search_knowledge: false,
            read_chat_history: false,
            ..options()
        };
        let answer = assistant(&server, MemoryHistory::default(), opts)
            .run("hi", false)
            .await
            .unwrap();
        assert_eq!(answer, "Plain answer");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model() {
        let server = MockServer::start().await;
        script(
            &server,
            tool_reply("delete_everything", "{}"),
            text_reply("Sorry, I cannot do that."),
        )
        .await;

        let answer = assistant(&server, MemoryHistory::default(), options())
            .run("wipe it", false)
            .await
            .unwrap();
        assert!(answer.ends_with("Sorry, I cannot do that."));
        assert!(answer.starts_with(" - Running: delete_everything()"));

        let requests = server.received_requests().await.unwrap();
        let second = String::from_utf8_lossy(&requests[1].body);
        assert!(second.contains("unknown tool"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_reported_to_model() {
        let server = MockServer::start().await;
        script(
            &server,
            tool_reply(SEARCH_TOOL, "{not json"),
            text_reply("Let me try again later."),
        )
        .await;

        let assistant = assistant(&server, MemoryHistory::default(), options());
        assistant.run("q", false).await.unwrap();
        assert!(assistant.knowledge.queries.lock().unwrap().is_empty());

        let requests = server.received_requests().await.unwrap();
        let second = String::from_utf8_lossy(&requests[1].body);
        assert!(second.contains("could not parse tool arguments"));
    }

    #[tokio::test]
    async fn history_tool_is_capped() {
        let server = MockServer::start().await;
        script(
            &server,
            tool_reply(HISTORY_TOOL, r#"{"num_chats":10}"#),
            text_reply("You asked about noodles."),
        )
        .await;

        let history = MemoryHistory::default();
        let assistant = assistant(&server, history.clone(), options());
        for q in ["one", "two", "three", "four"] {
            history
                .turns
                .lock()
                .unwrap()
                .push(ChatTurn::new(assistant.session_id(), "m", q, "a"));
        }

        let answer = assistant.run("what did I ask?", false).await.unwrap();
        assert!(answer.contains("get_chat_history(num_chats=10)"));
        assert_eq!(*history.limits.lock().unwrap(), vec![3]);

        let requests = server.received_requests().await.unwrap();
        let second = String::from_utf8_lossy(&requests[1].body);
        assert!(second.contains("four"));
        assert!(!second.contains(r#"\"content\":\"one\""#));
    }

    #[tokio::test]
    async fn exhausting_tool_rounds_is_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(tool_reply(SEARCH_TOOL, r#"{"query":"x"}"#))
            .expect(2)
            .mount(&server)
            .await;

        let opts = AssistantOptions {
            max_tool_rounds: 2,
            ..options()
        };
        let err = assistant(&server, MemoryHistory::default(), opts)
            .run("loop forever", false)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfQaError::Query { .. }));
        assert!(err.to_string().contains("2 tool rounds"));
    }

    #[tokio::test]
    async fn history_write_failure_is_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("fine"))
            .mount(&server)
            .await;

        let history = MemoryHistory {
            fail_append: true,
            ..Default::default()
        };
        let err = assistant(&server, history, options())
            .run("q", false)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfQaError::Query { .. }));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn streaming_matches_blocking_shape() {
        let server = MockServer::start().await;
        let sse = [
            r#"data: {"choices":[{"delta":{"content":"Step 3 "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"is..."},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n\n");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = seen.clone();
        let assistant = assistant(&server, MemoryHistory::default(), options())
            .with_delta_sink(Arc::new(move |d: &str| sink_seen.lock().unwrap().push_str(d)));

        let answer = assistant.run("What is step 3?", true).await.unwrap();
        assert_eq!(answer, "Step 3 is...");
        assert_eq!(*seen.lock().unwrap(), "Step 3 is...");
    }

    fn sse_reply(events: &[&str]) -> ResponseTemplate {
        let mut body: Vec<String> = events.iter().map(|e| format!("data: {e}")).collect();
        body.push("data: [DONE]".into());
        body.push(String::new());
        ResponseTemplate::new(200).set_body_raw(body.join("\n\n"), "text/event-stream")
    }

    #[tokio::test]
    async fn streamed_output_includes_tool_call_lines() {
        let server = MockServer::start().await;
        script(
            &server,
            sse_reply(&[
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search_knowledge_base","arguments":"{\"query\":\"step 3\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            ]),
            sse_reply(&[
                r#"{"choices":[{"delta":{"content":"Step 3 is "}}]}"#,
                r#"{"choices":[{"delta":{"content":"adding tamarind."},"finish_reason":"stop"}]}"#,
            ]),
        )
        .await;

        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = seen.clone();
        let history = MemoryHistory::default();
        let assistant = assistant(&server, history.clone(), options())
            .with_delta_sink(Arc::new(move |d: &str| sink_seen.lock().unwrap().push_str(d)));

        let answer = assistant.run("What is step 3?", true).await.unwrap();
        assert_eq!(
            answer,
            " - Running: search_knowledge_base(query=step 3)\n\nStep 3 is adding tamarind."
        );
        assert_eq!(*seen.lock().unwrap(), answer);
        assert_eq!(history.turns.lock().unwrap()[0].answer, answer);
    }

    #[tokio::test]
    async fn content_before_tool_calls_is_kept_in_both_modes() {
        let preamble = ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Let me look that up.",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": SEARCH_TOOL, "arguments": r#"{"query":"step 3"}"#}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));
        let expected = "Let me look that up.\n - Running: search_knowledge_base(query=step 3)\n\nAdd tamarind.";

        let server = MockServer::start().await;
        script(&server, preamble, text_reply("Add tamarind.")).await;
        let blocking = assistant(&server, MemoryHistory::default(), options())
            .run("q", false)
            .await
            .unwrap();
        assert_eq!(blocking, expected);

        let server = MockServer::start().await;
        script(
            &server,
            sse_reply(&[
                r#"{"choices":[{"delta":{"content":"Let me look that up."}}]}"#,
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search_knowledge_base","arguments":"{\"query\":\"step 3\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            ]),
            sse_reply(&[r#"{"choices":[{"delta":{"content":"Add tamarind."},"finish_reason":"stop"}]}"#]),
        )
        .await;
        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = seen.clone();
        let streamed = assistant(&server, MemoryHistory::default(), options())
            .with_delta_sink(Arc::new(move |d: &str| sink_seen.lock().unwrap().push_str(d)))
            .run("q", true)
            .await
            .unwrap();
        assert_eq!(streamed, expected);
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[test]
    fn transcript_separates_rounds() {
        let mut t = Transcript::new(None);
        t.start_round();
        t.tool_line(" - Running: a()");
        t.start_round();
        t.tool_line(" - Running: b()");
        t.start_round();
        t.push("done");
        assert_eq!(t.text, " - Running: a()\n - Running: b()\n\ndone");

        let mut hidden = Transcript::new(None);
        hidden.start_round();
        hidden.push("thinking");
        hidden.start_round();
        hidden.push("answer");
        assert_eq!(hidden.text, "thinking\n\nanswer");
    }

    #[test]
    fn describes_calls() {
        let call = ToolCall::new("c", SEARCH_TOOL, r#"{"query":"pad thai","limit":2}"#);
        assert_eq!(
            describe_call(&call),
            " - Running: search_knowledge_base(limit=2, query=pad thai)"
        );
        let raw = ToolCall::new("c", "x", "oops");
        assert_eq!(describe_call(&raw), " - Running: x(oops)");
    }
}
