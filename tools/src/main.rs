//! safe-shell: headless UI shell for the safe.
//!
//! Reads one JSON command per line on stdin and answers with one JSON
//! state line on stdout. Timer expiries arrive on their own and produce
//! unsolicited state lines.
//!
//! Usage:
//!   safe-shell --data-dir ./data
//!   safe-shell --db safe.db --seed 42

use anyhow::Result;
use safebox_core::{
    clock::SystemClock,
    config::SafeConfig,
    engine::{DispatchReport, SafeEngine},
    rng::{EntropyRng, RandomSource, SeededRng},
    schedule::{TimerScheduler, TokioTimer, Wake},
    settings::SettingsForm,
    snapshot::{EmbeddedImage, SafeSnapshot, SafeState},
    store::SafeStore,
    types::Timestamp,
};
use std::env;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    /// Current settings as a pre-filled form, for the settings dialog.
    GetSettings,
    EditText {
        text: String,
    },
    AttachImage {
        mime:        String,
        data_base64: String,
    },
    RemoveImage,
    Settings {
        form: SettingsForm,
    },
    Close {
        pin:     String,
        confirm: String,
    },
    Open {
        pin: String,
    },
    StartNew,
    Resume,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    state:              SafeState,
    snapshot:           &'a SafeSnapshot,
    image_data_url:     Option<String>,
    attempts_remaining: Option<u32>,
    destruct_in_ms:     Option<Timestamp>,
    timer_armed:        bool,
    processed:          Vec<&'static str>,
    respawned:          bool,
    survived:           bool,
    warning:            Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = arg_value(&args, "--data-dir").unwrap_or(".");
    let seed = arg_value(&args, "--seed").and_then(|s| s.parse::<u64>().ok());

    let mut config = SafeConfig::load(data_dir)?;
    if let Some(db) = arg_value(&args, "--db") {
        config.db_path = db.to_string();
    }
    log::info!("safe-shell: db={} key={}", config.db_path, config.storage_key);

    let store = SafeStore::open(&config.db_path)?;
    store.migrate()?;

    let rng: Box<dyn RandomSource> = match seed {
        Some(s) => Box::new(SeededRng::new(s)),
        None => Box::new(EntropyRng),
    };

    let (wake_tx, mut wake_rx) = mpsc::unbounded_channel();
    let timer = TokioTimer::new(wake_tx);
    let (mut engine, report) = SafeEngine::start(config, store, rng, Box::new(SystemClock), timer);
    emit_state(&engine, &report)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break }; // EOF
                if line.trim().is_empty() {
                    continue;
                }
                let cmd: IpcCommand = match serde_json::from_str(&line) {
                    Ok(c) => c,
                    Err(e) => {
                        emit_error(&e.to_string())?;
                        continue;
                    }
                };
                match handle_command(&mut engine, cmd) {
                    Ok(Reply::State(report)) => emit_state(&engine, &report)?,
                    Ok(Reply::Form(form)) => emit_form(&form)?,
                    Ok(Reply::Quit) => break,
                    Err(e) => emit_error(&e.to_string())?,
                }
            }
            Some(wake) = wake_rx.recv() => {
                let report = engine.on_wake(wake);
                emit_state(&engine, &report)?;
            }
        }
    }
    Ok(())
}

enum Reply {
    State(DispatchReport),
    Form(SettingsForm),
    Quit,
}

fn handle_command(engine: &mut SafeEngine<TokioTimer>, cmd: IpcCommand) -> Result<Reply> {
    let report = match cmd {
        IpcCommand::Quit => return Ok(Reply::Quit),
        IpcCommand::GetSettings => {
            return Ok(Reply::Form(SettingsForm::from_settings(&engine.snapshot().settings)));
        }
        IpcCommand::GetState => DispatchReport::default(),
        IpcCommand::EditText { text } => engine.edit_text(&text),
        IpcCommand::AttachImage { mime, data_base64 } => {
            let image = EmbeddedImage { mime, data_base64 };
            if image.decoded_len().is_none() {
                anyhow::bail!("image payload is not valid base64");
            }
            engine.attach_image(image)
        }
        IpcCommand::RemoveImage => engine.remove_image(),
        IpcCommand::Settings { form } => engine.apply_settings(&form)?,
        IpcCommand::Close { pin, confirm } => engine.close_with_pin(&pin, &confirm)?,
        IpcCommand::Open { pin } => engine.try_open(&pin),
        IpcCommand::StartNew => engine.start_new(),
        IpcCommand::Resume => engine.on_wake(Wake::Resumed),
    };
    Ok(Reply::State(report))
}

fn emit_state(engine: &SafeEngine<TokioTimer>, report: &DispatchReport) -> Result<()> {
    let snapshot = engine.snapshot();
    let now = engine.now_ms();

    let attempts_remaining = match snapshot.state() {
        SafeState::Closed => snapshot
            .settings
            .pin_attempts_limit
            .map(|limit| limit.saturating_sub(snapshot.runtime.attempts_made)),
        _ => None,
    };

    let state = UiState {
        state: snapshot.state(),
        snapshot,
        image_data_url: snapshot.content.image.as_ref().map(EmbeddedImage::to_data_url),
        attempts_remaining,
        destruct_in_ms: snapshot.runtime.destruct_at.map(|at| (at - now).max(0)),
        timer_armed: engine.timer().armed().is_some(),
        processed: report.processed.iter().map(|e| e.kind()).collect(),
        respawned: report.respawned,
        survived: report.survived,
        warning: report.persist_warning.clone(),
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
    stdout.flush()?;
    Ok(())
}

fn emit_form(form: &SettingsForm) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::json!({ "settings_form": form }))?;
    stdout.flush()?;
    Ok(())
}

fn emit_error(message: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::json!({ "error": message }))?;
    stdout.flush()?;
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
