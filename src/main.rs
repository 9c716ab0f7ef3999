use clap::{Arg, ArgAction, Command};
use nlp_shell::channel::{ArgumentSource, ConsoleSource, NoticeSink, QuerySource, StdinReader, TextSink};
use nlp_shell::config::{credential_or_setup, run_setup, FileConfigProvider};
use nlp_shell::environment::Session;
use nlp_shell::executor::Executor;
use nlp_shell::gate::{ConfirmationMode, ExecutionGate};
use nlp_shell::http_client::ReqwestHttpClient;
use nlp_shell::llm_generator::{CommandGenerator, GeminiGenerator, MockGenerator, REQUEST_TIMEOUT};
use nlp_shell::orchestrator::{Channels, Orchestrator};
use nlp_shell::voice::{Speaker, Synthesizer, Transcriber, VoiceInput, VoiceSink};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("nlsh")
        .about("Convert natural language to shell commands using Gemini AI")
        .arg(Arg::new("query")
            .help("Natural language query to convert to a shell command")
            .num_args(1..))
        .arg(Arg::new("no-confirm")
            .long("no-confirm")
            .help("Execute commands without confirmation")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("setup")
            .long("setup")
            .help("Set up or reconfigure the API key")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("voice")
            .long("voice")
            .help("Use voice input and output")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .get_matches();

    let provider = FileConfigProvider::new()?;

    if matches.get_flag("setup") {
        run_setup(&provider)?;
        return Ok(ExitCode::SUCCESS);
    }

    if matches.get_flag("config") {
        provider.show_config_info()?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(credential) = credential_or_setup(&provider)? else {
        eprintln!("Error: No API key configured. Run with --setup to configure.");
        return Ok(ExitCode::from(1));
    };

    let session = Session::detect(credential);
    let config = provider.load()?;

    let generator: Box<dyn CommandGenerator> = if config.use_mock {
        info!("Mock mode enabled");
        Box::new(MockGenerator::new())
    } else {
        let client = ReqwestHttpClient::with_timeout(REQUEST_TIMEOUT)?;
        Box::new(GeminiGenerator::new(Box::new(client)))
    };

    let mode = if matches.get_flag("no-confirm") {
        ConfirmationMode::Unconditional
    } else {
        ConfirmationMode::Interactive
    };

    let (queries, notices): (Box<dyn QuerySource>, Box<dyn NoticeSink>) = if matches.get_flag("voice") {
        let speaker = Speaker::new(Synthesizer::detect(session.os_family()));
        let transcriber = match config.transcriber_command {
            Some(command) => Transcriber::Command(command),
            None => Transcriber::Typed(Box::new(StdinReader)),
        };
        (
            Box::new(VoiceInput::new(session.clone(), transcriber, speaker.clone())),
            Box::new(VoiceSink::new(speaker)),
        )
    } else {
        (Box::new(ConsoleSource::stdin()), Box::new(TextSink))
    };

    let words: Vec<String> = matches
        .get_many::<String>("query")
        .unwrap_or_default()
        .cloned()
        .collect();

    let mut orchestrator = Orchestrator::new(
        session,
        generator,
        ExecutionGate::new(mode),
        Executor::new(),
        Channels {
            queries: Box::new(ArgumentSource::new(&words, queries)),
            confirmations: Box::new(StdinReader),
            notices,
        },
    );

    orchestrator
        .run_until(async {
            // No handler installed: never interrupt.
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}
