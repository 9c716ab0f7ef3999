//! The read → generate → sanitize → confirm → execute loop.
//!
//! Each query walks the [`State`] machine from `AwaitInput` back to
//! `AwaitInput` (or to `Terminated`). Every failure along the way degrades to
//! "no command executed this round"; only an exit keyword, the end of input,
//! or the shutdown signal ends the loop. An input source that keeps failing
//! counts as ended input.

use crate::channel::{LineReader, Notice, NoticeSink, QuerySource, Utterance};
use crate::environment::Session;
use crate::executor::{ExecutionOutcome, Executor};
use crate::gate::ExecutionGate;
use crate::llm_generator::CommandGenerator;
use crate::prompt::PromptBuilder;
use crate::sanitizer::sanitize;
use anyhow::Result;
use std::future::Future;
use tracing::{debug, info, warn};

/// Words that end the session when entered as a query.
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "stop"];

/// Consecutive input failures after which input is treated as closed.
pub const MAX_INPUT_FAILURES: u32 = 3;

pub fn is_exit_keyword(input: &str) -> bool {
    let word = input.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&word.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    AwaitInput,
    Generating(String),
    Sanitizing(String),
    Gating(String),
    Executing(String),
    Terminated,
}

/// How one pass through the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Empty or unrecognized input; nothing happened.
    Skipped,
    /// The service or the sanitizer produced no command.
    GenerationFailed,
    /// The gate rejected the command.
    Cancelled,
    Executed(ExecutionOutcome),
    Exit,
}

/// I/O collaborators of the loop.
pub struct Channels {
    pub queries: Box<dyn QuerySource>,
    pub confirmations: Box<dyn LineReader>,
    pub notices: Box<dyn NoticeSink>,
}

pub struct Orchestrator {
    session: Session,
    generator: Box<dyn CommandGenerator>,
    gate: ExecutionGate,
    executor: Executor,
    channels: Channels,
    input_failures: u32,
}

impl Orchestrator {
    pub fn new(
        session: Session,
        generator: Box<dyn CommandGenerator>,
        gate: ExecutionGate,
        executor: Executor,
        channels: Channels,
    ) -> Self {
        Self {
            session,
            generator,
            gate,
            executor,
            channels,
            input_failures: 0,
        }
    }

    /// Runs until an exit keyword, the end of input, or `shutdown` completes.
    ///
    /// When `shutdown` wins, the in-flight iteration is dropped where it
    /// stands: a pending confirmation never turns into an execution and a
    /// running child is killed.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Interrupted, shutting down");
                    break;
                }
                iteration = self.run_iteration() => {
                    if iteration? == Iteration::Exit {
                        break;
                    }
                }
            }
        }

        self.channels.notices.notify(&Notice::Farewell).await;
        Ok(())
    }

    /// Processes one query from `AwaitInput` until the machine is back there
    /// or has terminated.
    pub async fn run_iteration(&mut self) -> Result<Iteration> {
        let mut state = State::AwaitInput;
        loop {
            let (next, finished) = self.advance(state).await?;
            if let Some(iteration) = finished {
                return Ok(iteration);
            }
            state = next;
        }
    }

    /// Performs one transition. The second value is set when the transition
    /// closes an iteration.
    pub async fn advance(&mut self, state: State) -> Result<(State, Option<Iteration>)> {
        debug!("State: {:?}", state);
        match state {
            State::AwaitInput => self.await_input().await,
            State::Generating(query) => {
                let prompt = PromptBuilder::build(&self.session, &query);
                match self.generator.generate(&self.session, &prompt).await {
                    Ok(raw) => Ok((State::Sanitizing(raw), None)),
                    Err(e) => {
                        warn!("Generation failed: {}", e);
                        Ok(self.generation_failed(e.to_string()).await)
                    }
                }
            }
            State::Sanitizing(raw) => {
                let command = sanitize(&raw);
                if command.is_empty() {
                    warn!("Reply contained no command: {:?}", raw);
                    return Ok(self.generation_failed("the reply contained no command".to_string()).await);
                }
                self.channels.notices.notify(&Notice::GeneratedCommand(command.clone())).await;
                Ok((State::Gating(command), None))
            }
            State::Gating(command) => {
                let response = if self.gate.requires_confirmation() {
                    self.channels
                        .confirmations
                        .read_line(self.gate.question())
                        .await
                        .unwrap_or_else(|e| {
                            warn!("Could not read confirmation: {}", e);
                            None
                        })
                } else {
                    None
                };

                if self.gate.decide(response.as_deref()) {
                    Ok((State::Executing(command), None))
                } else {
                    self.channels.notices.notify(&Notice::Cancelled).await;
                    Ok((State::AwaitInput, Some(Iteration::Cancelled)))
                }
            }
            State::Executing(command) => {
                self.channels.notices.notify(&Notice::Executing(command.clone())).await;
                let outcome = self.executor.run(&self.session, &command).await;
                self.channels.notices.notify(&Notice::Finished(outcome)).await;
                Ok((State::AwaitInput, Some(Iteration::Executed(outcome))))
            }
            State::Terminated => Ok((State::Terminated, Some(Iteration::Exit))),
        }
    }

    async fn await_input(&mut self) -> Result<(State, Option<Iteration>)> {
        let utterance = match self.channels.queries.next_utterance().await {
            Ok(utterance) => {
                self.input_failures = 0;
                utterance
            }
            Err(e) => {
                self.input_failures += 1;
                warn!("Reading input failed ({}/{}): {:#}", self.input_failures, MAX_INPUT_FAILURES, e);
                self.channels.notices.notify(&Notice::UnreadableInput(e.to_string())).await;
                if self.input_failures >= MAX_INPUT_FAILURES {
                    return Ok((State::Terminated, None));
                }
                return Ok((State::AwaitInput, Some(Iteration::Skipped)));
            }
        };

        match utterance {
            Utterance::EndOfInput => {
                info!("Input closed");
                Ok((State::Terminated, None))
            }
            Utterance::Unrecognized => {
                self.channels.notices.notify(&Notice::Unrecognized).await;
                Ok((State::AwaitInput, Some(Iteration::Skipped)))
            }
            Utterance::Text(text) => {
                let query = text.trim();
                if query.is_empty() {
                    debug!("Empty query ignored");
                    Ok((State::AwaitInput, Some(Iteration::Skipped)))
                } else if is_exit_keyword(query) {
                    info!("Exit keyword received");
                    Ok((State::Terminated, None))
                } else {
                    info!("Processing query: {}", query);
                    Ok((State::Generating(query.to_string()), None))
                }
            }
        }
    }

    async fn generation_failed(&mut self, reason: String) -> (State, Option<Iteration>) {
        self.channels.notices.notify(&Notice::GenerationFailed(reason)).await;
        (State::AwaitInput, Some(Iteration::GenerationFailed))
    }
}
