//! Optional OS-level process sandbox.
//!
//! Gated behind the `sandbox` feature, grounded on
//! `DrapNard-vulkan_browser_engine`'s own `sandbox = ["dep:nix",
//! "dep:seccomp-sys"]` feature shape. Only the `nix`-backed half of that
//! shape is implemented here; see `DESIGN.md` for why syscall-level
//! filtering (`seccomp-sys`) is left as a named follow-up rather than
//! hand-rolled.
//!
//! Each `ProcessSandbox` owns one child worker process for the lifetime of
//! one `CompiledScript`: the worker hosts exactly one compiled function per
//! sandboxee process, transitioning through `{Empty, Compiling, Ready,
//! Executing}` and rejecting a second `Compile` with *failed-precondition*.

use std::{
    io::{Read, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use serde::{Deserialize, Serialize};

use auction_core::{AuctionError, models::FunctionRole};

/// One request frame sent to the worker.
#[derive(Debug, Serialize, Deserialize)]
pub enum SandboxRequest {
    /// Compile and warm up a function. Legal only from `Empty`.
    Compile {
        /// The function's stable identity, echoed back in diagnostics.
        uri: String,
        /// Which calling convention this function follows.
        role: FunctionRole,
        /// The script text to compile.
        source: String,
    },
    /// Invoke the hosted function once with the given JSON arguments.
    /// Legal only from `Ready` (or `Executing`, serialized).
    Execute {
        /// Positional JSON arguments, already shaped for the configured
        /// argument-passing mode.
        args: Vec<serde_json::Value>,
        /// `kAsyncWait` in milliseconds.
        async_wait_ms: u64,
    },
    /// Terminate the worker.
    Exit,
}

/// One response frame returned by the worker.
#[derive(Debug, Serialize, Deserialize)]
pub enum SandboxResponse {
    /// `Compile` succeeded; the worker is now `Ready`.
    Compiled,
    /// `Execute` succeeded, carrying the JSON-serialized return value.
    Executed(serde_json::Value),
    /// The request was rejected; carries the classified error kind (by
    /// name) and message so the parent can reconstruct an [`AuctionError`].
    Failed {
        /// One of the `ErrorKind` display strings (`invalid-argument`, ...).
        kind: String,
        /// Human-readable diagnostic.
        message: String,
    },
}

/// The worker-process state machine.
#[cfg(feature = "sandbox")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Empty,
    Ready,
}

#[cfg(feature = "sandbox")]
fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

#[cfg(feature = "sandbox")]
fn read_frame<R: Read>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_bytes) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e);
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Apply the worker process's resource limits. A minimal system-call policy
/// is approximated here by resource *limits*; see `DESIGN.md` for the
/// syscall-filtering gap.
#[cfg(feature = "sandbox")]
fn apply_resource_limits() {
    use nix::sys::resource::{Resource, setrlimit};

    // 512 MiB address space, generous enough for a warmed-up isolate but
    // bounded so a leaking script cannot exhaust the host.
    let _ = setrlimit(Resource::RLIMIT_AS, 512 * 1024 * 1024, 512 * 1024 * 1024);
    // A compiled function has no legitimate reason to open files beyond the
    // worker's own stdio.
    let _ = setrlimit(Resource::RLIMIT_NOFILE, 8, 8);
    // CPU-seconds backstop in case the wall-clock deadline's cooperative
    // checks are starved by a tight synchronous loop.
    let _ = setrlimit(Resource::RLIMIT_CPU, 30, 30);
}

/// Entry point for the worker side of a process sandbox. `auctiond` calls
/// this early in `main` when it detects it was re-exec'd as a sandbox
/// worker, before doing anything else (argument parsing, tracing init,
/// etc. for the worker is intentionally minimal: it only speaks the frame
/// protocol over stdio).
///
/// Runs until an `Exit` request or EOF on stdin.
#[cfg(feature = "sandbox")]
pub fn run_worker() -> std::io::Result<()> {
    apply_resource_limits();

    let engine = crate::engine::InProcessSandbox::new();
    let default_options = auction_core::ports::EngineOptions::default();

    let mut stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut state = WorkerState::Empty;
    let mut compiled: Option<auction_core::models::CompiledScript> = None;

    while let Some(payload) = read_frame(&mut stdin)? {
        let request: SandboxRequest = match serde_json::from_slice(&payload) {
            Ok(r) => r,
            Err(e) => {
                respond_failed(&mut stdout, "invalid-argument", &e.to_string())?;
                continue;
            }
        };

        match request {
            SandboxRequest::Compile { uri, role, source } => {
                if state != WorkerState::Empty {
                    respond_failed(
                        &mut stdout,
                        "failed-precondition",
                        "a second Compile was requested on an already-compiled sandboxee",
                    )?;
                    continue;
                }
                match auction_core::ports::ScriptEngine::compile(
                    &engine,
                    &uri,
                    role,
                    &source,
                    &default_options,
                ) {
                    Ok(script) => {
                        compiled = Some(script);
                        state = WorkerState::Ready;
                        write_response(&mut stdout, &SandboxResponse::Compiled)?;
                    }
                    Err(e) => respond_failed(&mut stdout, &e.kind().to_string(), e.message())?,
                }
            }
            SandboxRequest::Execute { args, async_wait_ms } => {
                let Some(script) = compiled.as_ref().filter(|_| state == WorkerState::Ready) else {
                    respond_failed(
                        &mut stdout,
                        "failed-precondition",
                        "Execute requested before a successful Compile",
                    )?;
                    continue;
                };
                let options = auction_core::ports::EngineOptions {
                    async_wait: std::time::Duration::from_millis(async_wait_ms),
                    ..default_options
                };
                match execute_raw(&engine, script, args, &options) {
                    Ok(value) => write_response(&mut stdout, &SandboxResponse::Executed(value))?,
                    Err(e) => respond_failed(&mut stdout, &e.kind().to_string(), e.message())?,
                }
            }
            SandboxRequest::Exit => break,
        }
    }

    Ok(())
}

#[cfg(feature = "sandbox")]
fn execute_raw(
    engine: &crate::engine::InProcessSandbox,
    script: &auction_core::models::CompiledScript,
    args: Vec<serde_json::Value>,
    options: &auction_core::ports::EngineOptions,
) -> Result<serde_json::Value, AuctionError> {
    // The worker only ever hosts one function; role-specific shape
    // validation happens on the parent side before the args are sent, so
    // the worker only needs the engine's raw invoke path, not the typed
    // `invoke_bidder`/`invoke_scorer` wrappers.
    let _ = engine;
    crate::engine::invoke(script.source(), script.role(), args, options)
}

#[cfg(feature = "sandbox")]
fn respond_failed<W: Write>(writer: &mut W, kind: &str, message: &str) -> std::io::Result<()> {
    write_response(
        writer,
        &SandboxResponse::Failed {
            kind: kind.to_string(),
            message: message.to_string(),
        },
    )
}

#[cfg(feature = "sandbox")]
fn write_response<W: Write>(writer: &mut W, response: &SandboxResponse) -> std::io::Result<()> {
    let payload = serde_json::to_vec(response).expect("SandboxResponse always serializes");
    write_frame(writer, &payload)
}

/// The parent-process half: one child worker per `CompiledScript`,
/// communicating over the same frame protocol.
#[cfg(feature = "sandbox")]
pub struct ProcessSandbox {
    child: std::sync::Mutex<Option<WorkerHandle>>,
}

#[cfg(feature = "sandbox")]
struct WorkerHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

#[cfg(feature = "sandbox")]
impl ProcessSandbox {
    /// Spawn a fresh worker, re-exec'ing the current binary with
    /// `--sandbox-worker`.
    pub fn spawn() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let mut child = Command::new(exe)
            .arg("--sandbox-worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        Ok(Self {
            child: std::sync::Mutex::new(Some(WorkerHandle { child, stdin, stdout })),
        })
    }

    fn roundtrip(&self, request: &SandboxRequest) -> Result<SandboxResponse, AuctionError> {
        let mut guard = self.child.lock().expect("sandbox worker mutex poisoned");
        let handle = guard
            .as_mut()
            .ok_or_else(|| AuctionError::internal("sandbox worker already exited"))?;

        let payload = serde_json::to_vec(request)
            .map_err(|e| AuctionError::internal(format!("encoding sandbox request: {e}")))?;
        write_frame(&mut handle.stdin, &payload)
            .map_err(|e| AuctionError::internal(format!("writing to sandbox worker: {e}")))?;

        let response = read_frame(&mut handle.stdout)
            .map_err(|e| AuctionError::internal(format!("reading from sandbox worker: {e}")))?
            .ok_or_else(|| AuctionError::internal("sandbox worker closed its stdout"))?;

        serde_json::from_slice(&response)
            .map_err(|e| AuctionError::internal(format!("decoding sandbox response: {e}")))
    }
}

#[cfg(feature = "sandbox")]
impl Drop for ProcessSandbox {
    fn drop(&mut self) {
        if let Some(mut handle) = self.child.lock().ok().and_then(|mut g| g.take()) {
            let _ = write_frame(&mut handle.stdin, &serde_json::to_vec(&SandboxRequest::Exit).unwrap());
            let _ = handle.child.wait();
        }
    }
}

#[cfg(feature = "sandbox")]
fn response_to_error(kind: &str, message: &str) -> AuctionError {
    match kind {
        "invalid-argument" => AuctionError::invalid_argument(message),
        "not-found" => AuctionError::not_found(message),
        "permission-denied" => AuctionError::permission_denied(message),
        "unavailable" => AuctionError::unavailable(message),
        "failed-precondition" => AuctionError::failed_precondition(message),
        _ => AuctionError::internal(message),
    }
}

#[cfg(feature = "sandbox")]
impl auction_core::ports::ScriptEngine for ProcessSandbox {
    fn compile(
        &self,
        uri: &str,
        role: FunctionRole,
        source: &str,
        _options: &auction_core::ports::EngineOptions,
    ) -> Result<auction_core::models::CompiledScript, AuctionError> {
        match self.roundtrip(&SandboxRequest::Compile {
            uri: uri.to_string(),
            role,
            source: source.to_string(),
        })? {
            SandboxResponse::Compiled => Ok(auction_core::models::CompiledScript::new(uri, role, source)),
            SandboxResponse::Failed { kind, message } => Err(response_to_error(&kind, &message)),
            SandboxResponse::Executed(_) => Err(AuctionError::internal(
                "sandbox worker returned Executed for a Compile request",
            )),
        }
    }

    fn invoke_bidder(
        &self,
        script: &auction_core::models::CompiledScript,
        input: &auction_core::models::BiddingFunctionInput,
        options: &auction_core::ports::EngineOptions,
    ) -> Result<auction_core::models::BiddingFunctionOutput, AuctionError> {
        let _ = script;
        let args = if options.flatten_arguments {
            crate::flatten::FlattenArgs::flatten_args(input)?
        } else {
            vec![serde_json::to_value(input)
                .map_err(|e| AuctionError::internal(format!("{e}")))?]
        };
        let value = self.execute(args, options)?;
        serde_json::from_value(value).map_err(|_| {
            AuctionError::failed_precondition("Unable to convert the bidding function output from JSON")
        })
    }

    fn invoke_scorer(
        &self,
        script: &auction_core::models::CompiledScript,
        input: &auction_core::models::AdScoringFunctionInput,
        options: &auction_core::ports::EngineOptions,
    ) -> Result<auction_core::models::AdScoringFunctionOutput, AuctionError> {
        let _ = script;
        let args = if options.flatten_arguments {
            crate::flatten::FlattenArgs::flatten_args(input)?
        } else {
            vec![serde_json::to_value(input)
                .map_err(|e| AuctionError::internal(format!("{e}")))?]
        };
        let value = self.execute(args, options)?;
        serde_json::from_value(value).map_err(|_| {
            AuctionError::failed_precondition(
                "Unable to convert the ad scoring function output from JSON",
            )
        })
    }
}

#[cfg(feature = "sandbox")]
impl ProcessSandbox {
    fn execute(
        &self,
        args: Vec<serde_json::Value>,
        options: &auction_core::ports::EngineOptions,
    ) -> Result<serde_json::Value, AuctionError> {
        match self.roundtrip(&SandboxRequest::Execute {
            args,
            async_wait_ms: options.async_wait.as_millis() as u64,
        })? {
            SandboxResponse::Executed(value) => Ok(value),
            SandboxResponse::Failed { kind, message } => Err(response_to_error(&kind, &message)),
            SandboxResponse::Compiled => Err(AuctionError::internal(
                "sandbox worker returned Compiled for an Execute request",
            )),
        }
    }
}
