//! Input sources and output sinks for the interactive loop.
//!
//! Queries come from a [`QuerySource`] (the command line, the console, or the
//! voice channel), confirmation answers from a [`LineReader`], and everything
//! the user should see or hear goes to a [`NoticeSink`].

use crate::executor::ExecutionOutcome;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// One unit of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utterance {
    Text(String),
    /// Input arrived but could not be understood (e.g. unclear audio).
    Unrecognized,
    /// The source is exhausted.
    EndOfInput,
}

#[async_trait]
pub trait QuerySource: Send {
    async fn next_utterance(&mut self) -> Result<Utterance>;
}

#[async_trait]
pub trait LineReader: Send {
    /// Shows `prompt` and reads one line without its line ending.
    ///
    /// Returns `None` at end of input.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Something worth telling the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Listening,
    Heard(String),
    Unrecognized,
    /// The query source failed; the reason is shown to the user.
    UnreadableInput(String),
    GeneratedCommand(String),
    Executing(String),
    GenerationFailed(String),
    Cancelled,
    Finished(ExecutionOutcome),
    Farewell,
}

impl Notice {
    /// Printed form, if any.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Notice::Listening => "🎤 Listening... (Speak your shell request)".to_string(),
            Notice::Heard(text) => format!("🗣️ You said: {}", text),
            Notice::Unrecognized => "Could not understand audio.".to_string(),
            Notice::UnreadableInput(reason) => format!("⚠️ Could not read input: {}", reason),
            Notice::GeneratedCommand(command) => format!("🧠 AI Command: {}", command),
            Notice::Executing(_) => return None,
            Notice::GenerationFailed(reason) => format!("⚠️ Failed to generate command: {}", reason),
            Notice::Cancelled => "Command execution cancelled.".to_string(),
            Notice::Finished(outcome) => match (outcome.succeeded, outcome.exit_code) {
                (true, _) => return None,
                (false, Some(code)) => format!("⚠️ Command exited with status {}", code),
                (false, None) if outcome.attempted => "❌ Command could not be run to completion.".to_string(),
                (false, None) => return None,
            },
            Notice::Farewell => "👋 Exiting...".to_string(),
        };
        Some(text)
    }

    /// Spoken form for the voice channel, if any.
    pub fn spoken(&self) -> Option<String> {
        let spoken = match self {
            Notice::Listening => "Listening for your command.".to_string(),
            Notice::Unrecognized => "Sorry, I didn't catch that.".to_string(),
            Notice::UnreadableInput(_) => "Sorry, I could not read that.".to_string(),
            Notice::Executing(command) => format!("Executing: {}", command),
            Notice::GenerationFailed(_) => "Sorry, I could not generate a command.".to_string(),
            Notice::Cancelled => "Command cancelled.".to_string(),
            Notice::Finished(outcome) if !outcome.succeeded => "The command failed.".to_string(),
            Notice::Farewell => "Exiting. Goodbye!".to_string(),
            _ => return None,
        };
        Some(spoken)
    }

    pub fn is_failure(&self) -> bool {
        match self {
            Notice::GenerationFailed(_) | Notice::Unrecognized | Notice::UnreadableInput(_) => true,
            Notice::Finished(outcome) => !outcome.succeeded,
            _ => false,
        }
    }
}

/// Receives notices. Implementations may take time (speech), so the loop
/// awaits them where an interrupt can still win.
#[async_trait]
pub trait NoticeSink: Send {
    async fn notify(&mut self, notice: &Notice);
}

/// Prints notices; failures go to stderr.
pub struct TextSink;

#[async_trait]
impl NoticeSink for TextSink {
    async fn notify(&mut self, notice: &Notice) {
        if let Some(text) = notice.text() {
            if notice.is_failure() {
                eprintln!("{}", text);
            } else {
                println!("{}", text);
            }
        }
    }
}

/// Reads lines from the process's stdin.
///
/// Each read happens on a detached thread, so an interrupt racing a pending
/// read is never held up by it.
pub struct StdinReader;

#[async_trait]
impl LineReader for StdinReader {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let read = io::stdin().lock().read_until(b'\n', &mut bytes);
            let result = match read {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(bytes)),
                Err(e) => Err(e),
            };
            let _ = tx.send(result);
        });

        let bytes = rx.await.map_err(|_| anyhow!("stdin reader stopped unexpectedly"))??;
        // The whole line is consumed even when it is rejected.
        bytes.map(decode_line).transpose()
    }
}

fn decode_line(bytes: Vec<u8>) -> Result<String> {
    let line = String::from_utf8(bytes).map_err(|_| anyhow!("input was not valid UTF-8"))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Typed queries from the console.
pub struct ConsoleSource {
    reader: Box<dyn LineReader>,
}

impl ConsoleSource {
    pub const PROMPT: &'static str = "🗨️ Enter your command ('exit' to quit): ";

    pub fn new(reader: Box<dyn LineReader>) -> Self {
        Self { reader }
    }

    pub fn stdin() -> Self {
        Self::new(Box::new(StdinReader))
    }
}

#[async_trait]
impl QuerySource for ConsoleSource {
    async fn next_utterance(&mut self) -> Result<Utterance> {
        Ok(match self.reader.read_line(Self::PROMPT).await? {
            Some(line) => Utterance::Text(line.trim().to_string()),
            None => Utterance::EndOfInput,
        })
    }
}

/// Yields the query given on the command line once, then defers to `rest`.
pub struct ArgumentSource {
    initial: Option<String>,
    rest: Box<dyn QuerySource>,
}

impl ArgumentSource {
    pub fn new(words: &[String], rest: Box<dyn QuerySource>) -> Self {
        let joined = words.join(" ");
        let initial = if joined.trim().is_empty() { None } else { Some(joined) };
        Self { initial, rest }
    }
}

#[async_trait]
impl QuerySource for ArgumentSource {
    async fn next_utterance(&mut self) -> Result<Utterance> {
        match self.initial.take() {
            Some(query) => Ok(Utterance::Text(query)),
            None => self.rest.next_utterance().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedReader {
        lines: VecDeque<Option<String>>,
        prompts: Vec<String>,
    }

    #[async_trait]
    impl LineReader for ScriptedReader {
        async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop_front().flatten())
        }
    }

    fn reader(lines: &[Option<&str>]) -> ScriptedReader {
        ScriptedReader {
            lines: lines.iter().map(|l| l.map(str::to_string)).collect(),
            prompts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_console_source_trims_and_detects_end() {
        let mut source = ConsoleSource::new(Box::new(reader(&[Some("  list files  "), None])));
        assert_eq!(source.next_utterance().await.unwrap(), Utterance::Text("list files".to_string()));
        assert_eq!(source.next_utterance().await.unwrap(), Utterance::EndOfInput);
    }

    #[tokio::test]
    async fn test_argument_source_joins_words_once() {
        let rest = ConsoleSource::new(Box::new(reader(&[Some("exit")])));
        let words = vec!["show".to_string(), "disk".to_string(), "usage".to_string()];
        let mut source = ArgumentSource::new(&words, Box::new(rest));

        assert_eq!(source.next_utterance().await.unwrap(), Utterance::Text("show disk usage".to_string()));
        assert_eq!(source.next_utterance().await.unwrap(), Utterance::Text("exit".to_string()));
    }

    #[tokio::test]
    async fn test_argument_source_without_words_defers_immediately() {
        let rest = ConsoleSource::new(Box::new(reader(&[Some("pwd")])));
        let mut source = ArgumentSource::new(&[], Box::new(rest));
        assert_eq!(source.next_utterance().await.unwrap(), Utterance::Text("pwd".to_string()));
    }

    #[test]
    fn test_notice_texts() {
        assert_eq!(
            Notice::GeneratedCommand("ls -la".to_string()).text().unwrap(),
            "🧠 AI Command: ls -la"
        );
        assert!(Notice::Finished(ExecutionOutcome::exited(Some(0))).text().is_none());
        assert!(Notice::Finished(ExecutionOutcome::exited(Some(2))).text().unwrap().contains("status 2"));
        assert!(Notice::Finished(ExecutionOutcome::start_failure()).is_failure());
        assert!(Notice::Executing("ls".to_string()).text().is_none());
    }

    #[test]
    fn test_decode_line_strips_line_ending() {
        assert_eq!(decode_line(b"list files\r\n".to_vec()).unwrap(), "list files");
        assert_eq!(decode_line(b"pwd".to_vec()).unwrap(), "pwd");
    }

    #[test]
    fn test_decode_line_rejects_invalid_utf8() {
        let err = decode_line(b"\xff\xfe list\n".to_vec()).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_every_failure_has_a_spoken_form() {
        let failures = [
            Notice::UnreadableInput("input was not valid UTF-8".to_string()),
            Notice::GenerationFailed("API error: 500 - x".to_string()),
            Notice::Unrecognized,
            Notice::Finished(ExecutionOutcome::exited(Some(1))),
            Notice::Finished(ExecutionOutcome::start_failure()),
        ];
        for notice in failures {
            assert!(notice.is_failure());
            assert!(notice.spoken().is_some(), "{:?}", notice);
            assert!(notice.text().is_some(), "{:?}", notice);
        }
        assert_eq!(Notice::Farewell.spoken().unwrap(), "Exiting. Goodbye!");
    }
}
