//! nlp-shell - natural language to shell commands.
//!
//! This library turns a free-form request into a single command for the
//! user's operating system and shell, asks before running it, and runs it
//! through the native shell. It supports:
//!
//! - **Environment detection** of the OS family and shell dialect
//! - **Command generation** via the Gemini API
//! - **Sanitization** of model replies into one command line
//! - **Confirmation** before anything is executed
//! - **Voice** input and output through external speech tools
//!
//! # Architecture
//!
//! - [`environment`] - OS/shell detection and the immutable session
//! - [`prompt`] - Instruction text sent to the generation service
//! - [`http_client`] - HTTP client abstraction
//! - [`llm_generator`] - Gemini and mock command generators
//! - [`sanitizer`] - Reply clean-up
//! - [`gate`] - Confirm-before-run decisions
//! - [`executor`] - Runs approved commands through the shell
//! - [`channel`] - Query sources, confirmation input and notices
//! - [`voice`] - Speech output and transcriber-backed input
//! - [`orchestrator`] - The interactive state machine
//! - [`config`] - Credential storage and first-run setup
//!
//! # Example
//!
//! ```ignore
//! use nlp_shell::channel::{ConsoleSource, StdinReader, TextSink};
//! use nlp_shell::environment::{Credential, Session};
//! use nlp_shell::executor::Executor;
//! use nlp_shell::gate::{ConfirmationMode, ExecutionGate};
//! use nlp_shell::llm_generator::MockGenerator;
//! use nlp_shell::orchestrator::{Channels, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::detect(Credential::new("your-key"));
//!     let mut orchestrator = Orchestrator::new(
//!         session,
//!         Box::new(MockGenerator::new()),
//!         ExecutionGate::new(ConfirmationMode::Interactive),
//!         Executor::new(),
//!         Channels {
//!             queries: Box::new(ConsoleSource::stdin()),
//!             confirmations: Box::new(StdinReader),
//!             notices: Box::new(TextSink),
//!         },
//!     );
//!     orchestrator.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```

pub mod channel;
pub mod config;
pub mod environment;
pub mod executor;
pub mod gate;
pub mod http_client;
pub mod llm_generator;
pub mod orchestrator;
pub mod prompt;
pub mod sanitizer;
pub mod voice;
