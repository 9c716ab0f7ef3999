//! Voice channel: spoken output through the platform's speech command and
//! spoken input through an external transcriber.
//!
//! Both sides shell out. Speech goes to `say`, `espeak` and friends;
//! transcription is whatever command the user configured, whose stdout is
//! taken as the transcript.

use crate::channel::{LineReader, Notice, NoticeSink, QuerySource, TextSink, Utterance};
use crate::environment::{OsFamily, Session};
use crate::executor::ShellInvocation;
use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};
use which::which;

/// A located text-to-speech program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesizer {
    /// `say <text>` (macOS).
    Say,
    /// System.Speech through PowerShell (Windows).
    PowerShell,
    /// `espeak`, `espeak-ng` or `spd-say` (Linux and other Unix).
    Program(String),
}

impl Synthesizer {
    /// Finds a synthesizer for `os`, if one is installed.
    pub fn detect(os: OsFamily) -> Option<Self> {
        match os {
            OsFamily::Windows => Some(Synthesizer::PowerShell),
            OsFamily::MacOs if which("say").is_ok() => Some(Synthesizer::Say),
            _ => ["espeak-ng", "espeak", "spd-say"]
                .iter()
                .find(|program| which(program).is_ok())
                .map(|program| Synthesizer::Program(program.to_string())),
        }
    }

    pub fn invocation(&self, text: &str) -> ShellInvocation {
        let (program, args) = match self {
            Synthesizer::Say => ("say".to_string(), vec![text.to_string()]),
            Synthesizer::PowerShell => {
                let script = format!(
                    "Add-Type -AssemblyName System.Speech; \
                     (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
                    text.replace('\'', "''")
                );
                ("powershell".to_string(), vec!["-Command".to_string(), script])
            }
            Synthesizer::Program(program) => (program.clone(), vec![text.to_string()]),
        };
        ShellInvocation { program, args }
    }
}

/// Speaks text; the returned future completes once it has been said.
#[derive(Debug, Clone)]
pub struct Speaker {
    synthesizer: Option<Synthesizer>,
}

impl Speaker {
    pub fn new(synthesizer: Option<Synthesizer>) -> Self {
        if synthesizer.is_none() {
            warn!("No speech synthesizer found; voice output will only be printed");
        }
        Self { synthesizer }
    }

    pub async fn speak(&self, text: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };
        let invocation = synthesizer.invocation(text);
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        if let Err(e) = status {
            warn!("Speech synthesis with {} failed: {}", invocation.program, e);
        }
    }
}

/// Prints every notice and speaks its spoken form.
pub struct VoiceSink {
    text: TextSink,
    speaker: Speaker,
}

impl VoiceSink {
    pub fn new(speaker: Speaker) -> Self {
        Self { text: TextSink, speaker }
    }
}

#[async_trait]
impl NoticeSink for VoiceSink {
    async fn notify(&mut self, notice: &Notice) {
        self.text.notify(notice).await;
        if let Some(spoken) = notice.spoken() {
            self.speaker.speak(&spoken).await;
        }
    }
}

/// Where voice input comes from.
pub enum Transcriber {
    /// Runs a command through the session shell; its stdout is the transcript.
    Command(String),
    /// No transcriber configured: typed lines stand in for speech.
    Typed(Box<dyn LineReader>),
}

/// Query source for `--voice`.
pub struct VoiceInput {
    session: Session,
    transcriber: Transcriber,
    sink: VoiceSink,
}

impl VoiceInput {
    pub fn new(session: Session, transcriber: Transcriber, speaker: Speaker) -> Self {
        if matches!(transcriber, Transcriber::Typed(_)) {
            warn!("No transcriber_command configured; reading voice queries as typed text");
        }
        Self {
            session,
            transcriber,
            sink: VoiceSink::new(speaker),
        }
    }
}

async fn transcribe(session: &Session, command: &str) -> Result<Utterance> {
    let invocation = ShellInvocation::for_session(session, command);
    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        warn!("Transcriber exited with {}", output.status);
        return Ok(Utterance::Unrecognized);
    }
    Ok(transcript_utterance(&String::from_utf8_lossy(&output.stdout)))
}

fn transcript_utterance(transcript: &str) -> Utterance {
    let text = transcript.trim();
    if text.is_empty() {
        Utterance::Unrecognized
    } else {
        Utterance::Text(text.to_string())
    }
}

#[async_trait]
impl QuerySource for VoiceInput {
    async fn next_utterance(&mut self) -> Result<Utterance> {
        self.sink.notify(&Notice::Listening).await;

        match &mut self.transcriber {
            Transcriber::Command(command) => {
                let utterance = transcribe(&self.session, command).await?;
                if let Utterance::Text(text) = &utterance {
                    debug!("Transcribed: {}", text);
                    self.sink.notify(&Notice::Heard(text.clone())).await;
                }
                Ok(utterance)
            }
            // Typed text is already on screen; no need to echo it.
            Transcriber::Typed(reader) => Ok(match reader.read_line("> ").await? {
                Some(line) => transcript_utterance(&line),
                None => Utterance::EndOfInput,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Credential, ShellDialect};

    #[test]
    fn test_say_passes_text_as_argument() {
        let invocation = Synthesizer::Say.invocation("Executing: ls -la");
        assert_eq!(invocation.program, "say");
        assert_eq!(invocation.args, vec!["Executing: ls -la"]);
    }

    #[test]
    fn test_powershell_escapes_single_quotes() {
        let invocation = Synthesizer::PowerShell.invocation("it's done");
        assert_eq!(invocation.program, "powershell");
        assert_eq!(invocation.args[0], "-Command");
        assert!(invocation.args[1].contains("Speak('it''s done')"));
    }

    #[test]
    fn test_windows_always_has_a_synthesizer() {
        assert_eq!(Synthesizer::detect(OsFamily::Windows), Some(Synthesizer::PowerShell));
    }

    #[test]
    fn test_blank_transcript_is_unrecognized() {
        assert_eq!(transcript_utterance(" \n"), Utterance::Unrecognized);
        assert_eq!(transcript_utterance("list files\n"), Utterance::Text("list files".to_string()));
    }

    #[tokio::test]
    async fn test_silent_speaker_does_nothing() {
        Speaker::new(None).speak("nothing to hear").await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transcriber_command_output_becomes_query() {
        let session = Session::new(OsFamily::Linux, ShellDialect::Bash, Credential::new("k"));
        let mut input = VoiceInput::new(
            session,
            Transcriber::Command("echo 'show disk usage'".to_string()),
            Speaker::new(None),
        );
        assert_eq!(
            input.next_utterance().await.unwrap(),
            Utterance::Text("show disk usage".to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_transcriber_is_unrecognized() {
        let session = Session::new(OsFamily::Linux, ShellDialect::Bash, Credential::new("k"));
        let mut input = VoiceInput::new(session, Transcriber::Command("exit 1".to_string()), Speaker::new(None));
        assert_eq!(input.next_utterance().await.unwrap(), Utterance::Unrecognized);
    }
}
