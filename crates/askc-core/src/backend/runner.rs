//! Process runner -- drives one backend invocation from spawn to resolution.
//!
//! ```text
//! Spawning --spawn error--> Rejected(Spawn)
//!    |
//!    v
//! Running   stdout chunks -> LineBuffer / document -> translate -> fold + callbacks
//!    |      stderr lines  -> debug log
//!    | process exit
//!    v
//! Draining  read what stdout already holds, flush trailing fragment (streaming)
//!    |
//!    +--non-zero exit-------------> Rejected(Exit)
//!    +--bad / failed document-----> Rejected(Protocol)   (single-shot)
//!    +--------------------------- > Resolved(QueryResult)
//! ```
//!
//! All aggregation state is owned by one [`Session`] and touched only from
//! the task reading stdout, so callbacks fire strictly one at a time in
//! arrival order.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr};
use tracing::{debug, warn};

use super::error::QueryError;
use super::events::{CanonicalEvent, QueryResult, ToolEvent};
use super::line_buffer::LineBuffer;
use super::trait_def::{Backend, OutputMode};

/// Size of each read from the backend's stdout.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Number of trailing stderr lines kept for [`QueryError::Exit`].
const STDERR_TAIL_LINES: usize = 20;

/// How long a timed-out backend gets to exit after SIGTERM before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// How long to keep reading stdout once the process has exited.
const STDOUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How long to wait for the stderr reader once the process has exited.
const STDERR_DRAIN_GRACE: Duration = Duration::from_secs(1);

pub type TextHook<'a> = Box<dyn FnMut(&str) + Send + 'a>;
pub type ToolHook<'a> = Box<dyn FnMut(&ToolEvent) + Send + 'a>;
pub type RawHook<'a> = Box<dyn FnMut(&Value) + Send + 'a>;

/// Optional hooks notified as canonical events arrive.
///
/// Hooks are called synchronously, one at a time, in the order the events
/// were produced. Every hook is independently optional.
#[derive(Default)]
pub struct QueryCallbacks<'a> {
    pub on_text_delta: Option<TextHook<'a>>,
    pub on_thinking: Option<TextHook<'a>>,
    pub on_tool_use: Option<ToolHook<'a>>,
    pub on_tool_result: Option<ToolHook<'a>>,
    /// Every decoded native record before translation. Only called when
    /// [`QueryOptions::debug`] is set.
    pub on_raw_event: Option<RawHook<'a>>,
}

impl<'a> QueryCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text_delta(mut self, hook: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_text_delta = Some(Box::new(hook));
        self
    }

    pub fn on_thinking(mut self, hook: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_thinking = Some(Box::new(hook));
        self
    }

    pub fn on_tool_use(mut self, hook: impl FnMut(&ToolEvent) + Send + 'a) -> Self {
        self.on_tool_use = Some(Box::new(hook));
        self
    }

    pub fn on_tool_result(mut self, hook: impl FnMut(&ToolEvent) + Send + 'a) -> Self {
        self.on_tool_result = Some(Box::new(hook));
        self
    }

    pub fn on_raw_event(mut self, hook: impl FnMut(&Value) + Send + 'a) -> Self {
        self.on_raw_event = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for QueryCallbacks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCallbacks")
            .field("on_text_delta", &self.on_text_delta.is_some())
            .field("on_thinking", &self.on_thinking.is_some())
            .field("on_tool_use", &self.on_tool_use.is_some())
            .field("on_tool_result", &self.on_tool_result.is_some())
            .field("on_raw_event", &self.on_raw_event.is_some())
            .finish()
    }
}

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Pass every decoded native record to [`QueryCallbacks::on_raw_event`].
    pub debug: bool,
    /// Kill the backend and reject the query if it runs longer than this.
    pub timeout: Option<Duration>,
}

/// Run `question` through `backend` and resolve the aggregated result.
///
/// Exactly one of `Ok` / `Err` is returned per call. A non-zero exit always
/// rejects, discarding whatever was aggregated; callbacks may already have
/// fired for those events.
pub async fn run_query(
    backend: &dyn Backend,
    question: &str,
    callbacks: &mut QueryCallbacks<'_>,
    options: &QueryOptions,
) -> Result<QueryResult, QueryError> {
    let name = backend.name().to_string();
    let invocation = backend.invocation(question);

    let mut child = invocation
        .command()
        .spawn()
        .map_err(|source| QueryError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
    debug!(backend = %name, pid = ?child.id(), "backend spawned");

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(&name, io::Error::other("stdout was not captured")))?;
    let mut stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(drain_stderr(stderr, name.clone())));

    let mut session = Session::new(backend, callbacks, options.debug);

    let drive = async {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        let mut stdout_open = true;
        let status = loop {
            tokio::select! {
                read = stdout.read(&mut chunk), if stdout_open => {
                    match read? {
                        0 => stdout_open = false,
                        n => session.feed(&chunk[..n]),
                    }
                }
                status = child.wait() => break status?,
            }
        };

        // A helper the backend left running may still hold the pipe open, so
        // only collect what was written before exit.
        if stdout_open {
            let drained = tokio::time::timeout(STDOUT_DRAIN_GRACE, async {
                loop {
                    match stdout.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => session.feed(&chunk[..n]),
                        Err(e) => {
                            warn!(error = %e, "error reading backend stdout after exit");
                            break;
                        }
                    }
                }
            })
            .await;
            if drained.is_err() {
                debug!(backend = %name, "stdout still open after exit, resolving without it");
            }
        }
        Ok::<_, io::Error>(status)
    };

    let waited = match options.timeout {
        Some(limit) => {
            let outcome = tokio::time::timeout(limit, drive).await;
            match outcome {
                Ok(waited) => waited,
                Err(_) => {
                    warn!(backend = %name, timeout_secs = limit.as_secs(), "backend timed out, terminating");
                    terminate(&mut child).await;
                    if let Some(task) = stderr_task.take() {
                        task.abort();
                    }
                    return Err(QueryError::Timeout {
                        backend: name,
                        after: limit,
                    });
                }
            }
        }
        None => drive.await,
    };
    let status = waited.map_err(|source| io_error(&name, source))?;

    session.drain();

    let stderr_tail = match stderr_task.as_mut() {
        Some(task) => match tokio::time::timeout(STDERR_DRAIN_GRACE, &mut *task).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                task.abort();
                String::new()
            }
        },
        None => String::new(),
    };

    if !status.success() {
        debug!(backend = %name, code = ?status.code(), "backend exited unsuccessfully");
        return Err(QueryError::Exit {
            backend: name,
            code: status.code(),
            stderr: stderr_tail,
        });
    }

    let result = session
        .resolve()
        .map_err(|message| QueryError::Protocol {
            backend: name.clone(),
            message,
        })?;
    debug!(
        backend = %name,
        answer_chars = result.answer.chars().count(),
        tool_events = result.tool_events.len(),
        cost = ?result.cost,
        "query resolved"
    );
    Ok(result)
}

fn io_error(backend: &str, source: io::Error) -> QueryError {
    QueryError::Io {
        backend: backend.to_string(),
        source,
    }
}

/// Read the backend's stderr to EOF, logging each line and keeping the tail.
async fn drain_stderr(mut stderr: ChildStderr, backend: String) -> String {
    let mut lines = LineBuffer::new();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut keep = |line: String| {
        debug!(backend = %backend, line = %line, "backend stderr");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    };

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => lines.push(&chunk[..n]).into_iter().for_each(&mut keep),
            Err(e) => {
                warn!(error = %e, "error reading backend stderr");
                break;
            }
        }
    }
    if let Some(last) = lines.finish() {
        keep(last);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

/// Stop a running backend: SIGTERM, a short grace period, then SIGKILL.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a child we spawned and have not yet reaped.
        let ret = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if ret != 0 {
            warn!(pid, "SIGTERM failed, proceeding to SIGKILL");
        }
    }

    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(Ok(_status)) => debug!("backend exited after SIGTERM"),
        _ => {
            debug!("backend did not exit after SIGTERM, sending SIGKILL");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill backend");
            }
        }
    }
}

/// Mutable state of one invocation: reassembly, aggregation, dispatch.
struct Session<'r, 'c> {
    backend: &'r dyn Backend,
    callbacks: &'r mut QueryCallbacks<'c>,
    debug: bool,
    lines: LineBuffer,
    /// Verbatim stdout of a single-shot backend.
    document: Vec<u8>,
    result: QueryResult,
}

impl<'r, 'c> Session<'r, 'c> {
    fn new(backend: &'r dyn Backend, callbacks: &'r mut QueryCallbacks<'c>, debug: bool) -> Self {
        Self {
            backend,
            callbacks,
            debug,
            lines: LineBuffer::new(),
            document: Vec::new(),
            result: QueryResult::default(),
        }
    }

    /// Consume one chunk of stdout.
    fn feed(&mut self, chunk: &[u8]) {
        match self.backend.mode() {
            OutputMode::SingleShot => self.document.extend_from_slice(chunk),
            OutputMode::Streaming => {
                for record in self.lines.push(chunk) {
                    self.process_record(&record);
                }
            }
        }
    }

    /// Flush the trailing unterminated record, if any.
    fn drain(&mut self) {
        if let Some(record) = self.lines.finish() {
            debug!(backend = self.backend.name(), "flushing unterminated final record");
            self.process_record(&record);
        }
    }

    /// Decode and translate one streaming record. Undecodable records are
    /// dropped.
    fn process_record(&mut self, record: &str) {
        let trimmed = record.trim();
        if trimmed.is_empty() {
            return;
        }
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(e) => {
                debug!(backend = self.backend.name(), error = %e, "dropping undecodable record");
                return;
            }
        };
        self.observe_raw(&value);
        for event in self.backend.translate(&value) {
            self.emit(event);
        }
    }

    fn observe_raw(&mut self, value: &Value) {
        if !self.debug {
            return;
        }
        if let Some(hook) = self.callbacks.on_raw_event.as_mut() {
            hook(value);
        }
    }

    /// Fold one canonical event into the aggregate and notify its hook.
    fn emit(&mut self, event: CanonicalEvent) {
        match event {
            CanonicalEvent::TextDelta { text } => {
                if let Some(hook) = self.callbacks.on_text_delta.as_mut() {
                    hook(&text);
                }
                self.result.answer.push_str(&text);
            }
            CanonicalEvent::Thinking { text } => {
                if let Some(hook) = self.callbacks.on_thinking.as_mut() {
                    hook(&text);
                }
            }
            CanonicalEvent::ToolUse { id, tool, input } => {
                let event = ToolEvent::ToolUse { id, tool, input };
                if let Some(hook) = self.callbacks.on_tool_use.as_mut() {
                    hook(&event);
                }
                self.result.tool_events.push(event);
            }
            CanonicalEvent::ToolResult { id, output } => {
                let event = ToolEvent::ToolResult { id, output };
                if let Some(hook) = self.callbacks.on_tool_result.as_mut() {
                    hook(&event);
                }
                self.result.tool_events.push(event);
            }
            CanonicalEvent::CostUpdate { total_cost_usd } => {
                self.result.cost = Some(total_cost_usd);
            }
        }
    }

    /// Produce the final result after a successful exit.
    ///
    /// Single-shot backends have their document parsed and translated here;
    /// the error string becomes [`QueryError::Protocol`].
    fn resolve(mut self) -> Result<QueryResult, String> {
        if self.backend.mode() == OutputMode::SingleShot {
            let document: Value = serde_json::from_slice(&self.document)
                .map_err(|e| format!("unparsable output document: {e}"))?;
            self.observe_raw(&document);
            if let Some(message) = self.backend.document_error(&document) {
                return Err(message);
            }
            for event in self.backend.translate(&document) {
                self.emit(event);
            }
        }
        Ok(self.result)
    }
}
