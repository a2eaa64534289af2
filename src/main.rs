use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use voxcoach::config_loader;
use voxcoach::orchestrator::SpeechOrchestrator;
use voxcoach::playback::{AudioSession, MutedSession, RodioSession};
use voxcoach::styles::CoachingStyle;
use voxcoach::synthesis::RemoteSynthesizer;
use voxcoach::turn::TurnNotifier;

#[derive(Parser)]
#[command(name = "voxcoach", version, about = "Voice delivery for the coaching assistant")]
struct Cli {
    /// Utterance to deliver; omit for an interactive stdin loop
    #[arg(short, long)]
    text: Option<String>,

    /// Coaching tone for the delivery
    #[arg(short, long, value_enum, default_value = "motivational")]
    style: CoachingStyle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let (url, model, api_key, audio_enabled, volume, timeout) = {
        let settings = config_loader::SETTINGS.read().unwrap();
        (
            settings.synthesis_url.clone(),
            settings.synthesis_model.clone(),
            settings.api_key.clone(),
            settings.enable_audio,
            settings.playback_volume,
            settings.request_timeout_secs,
        )
    };

    let synth = Arc::new(RemoteSynthesizer::new(&url, &model, &api_key, timeout));
    let session: Arc<dyn AudioSession> = if audio_enabled {
        Arc::new(RodioSession::new(volume))
    } else {
        println!("Audio output disabled; deliveries will be silent");
        Arc::new(MutedSession)
    };
    let notifier = TurnNotifier::new();

    // The conversation controller would subscribe here; for the CLI we
    // just log when the listening phase may begin.
    let mut turns = notifier.subscribe();
    tokio::spawn(async move {
        while turns.recv().await.is_ok() {
            println!("Speech finished; ready to listen");
        }
    });

    let orchestrator = SpeechOrchestrator::new(&api_key, synth, session, notifier);

    if let Some(text) = cli.text {
        speak_and_wait(&orchestrator, &text, cli.style).await;
        return Ok(());
    }

    println!("voxcoach interactive mode. Type an utterance, Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        speak_and_wait(&orchestrator, &line, cli.style).await;
    }

    Ok(())
}

async fn speak_and_wait(orchestrator: &SpeechOrchestrator, text: &str, style: CoachingStyle) {
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    orchestrator.deliver(text, style, move |success| {
        let _ = done_tx.send(success);
    });

    match done_rx.await {
        Ok(true) => {}
        Ok(false) => eprintln!("Delivery failed"),
        Err(_) => eprintln!("Delivery was cancelled"),
    }
}
