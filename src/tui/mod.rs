//! Interactive wizard
//!
//! The driver owns the terminal and multiplexes four sources with
//! `crossbeam::select!`: key presses, module events, the frame tick and upload
//! completion. Every input goes through [`App::update`]; the returned effects
//! are executed here and nowhere else.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use console::Term;
use crossbeam::channel::{Sender, select, tick, unbounded};
use tokio::runtime::Handle;

pub mod animation;
pub mod app;
pub mod form;
pub mod terminal;
pub mod view;

pub use app::{App, Effect, Input};

use crate::config::WizardConfig;
use crate::engine::{EVENT_BUFFER, EventBus, EventSender, Module, ModuleRunner, ProgressTrace};
use crate::upload::{PwndocClient, UploadPipeline, UploadSummary};
use terminal::{KeyReader, Screen};

/// Redraw interval, roughly 60 frames per second
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Run the wizard until the user quits
///
/// Starts in the configuration form when `config_path` does not exist yet or
/// `reconfigure` is set.
pub fn run(config_path: &Path, reconfigure: bool, runtime: Handle) -> Result<()> {
    let first_run = !config_path.exists();
    let config = WizardConfig::load(config_path)?;
    let mut app = App::new(config, first_run || reconfigure);

    let term = Term::stdout();
    let mut screen = Screen::open(term.clone())?;
    let keys = KeyReader::spawn(term)?;
    let frames = tick(FRAME_INTERVAL);
    let (events_tx, events_rx) = EventBus::channel(EVENT_BUFFER);
    let (upload_tx, upload_rx) = unbounded();

    tracing::info!("Wizard started with {}", config_path.display());

    loop {
        screen.draw(&view::render(&app, screen.width()))?;

        // Our own senders keep the bus and upload channels open
        let input = select! {
            recv(keys.keys()) -> key => key.ok().map(Input::Key),
            recv(events_rx) -> event => event.ok().map(Input::Module),
            recv(frames) -> _ => Some(Input::Tick),
            recv(upload_rx) -> outcome => outcome.ok().map(Input::UploadFinished),
        };
        let Some(input) = input else {
            tracing::warn!("Key reader stopped, leaving the wizard");
            return Ok(());
        };

        let from_key = matches!(input, Input::Key(_));
        let (next, effects) = app.update(input);
        app = next;

        for effect in effects {
            match effect {
                Effect::SaveConfig(config) => {
                    let feedback = match config.save_to_file(config_path) {
                        Ok(()) => {
                            tracing::info!("Saved configuration to {}", config_path.display());
                            Input::ConfigSaved
                        }
                        Err(e) => {
                            tracing::error!("{:#}", e);
                            Input::ConfigFailed(format!("{e:#}"))
                        }
                    };
                    app = app.update(feedback).0;
                }
                Effect::StartModules { modules, report_root } => {
                    tracing::info!(
                        "Starting {} modules against {}",
                        modules.len(),
                        report_root.display()
                    );
                    // Detached; completion arrives as Complete events
                    let _ = ModuleRunner::new(events_tx.clone(), ProgressTrace::default())
                        .spawn(modules, report_root);
                }
                Effect::StartUpload { config, modules } => {
                    let (events, done) = (events_tx.clone(), upload_tx.clone());
                    start_upload(config, modules, events, done, runtime.clone())?;
                }
                Effect::Quit => {
                    tracing::info!("Wizard closed");
                    return Ok(());
                }
            }
        }

        if from_key {
            keys.resume();
        }
    }
}

fn start_upload(
    config: WizardConfig,
    modules: Vec<Module>,
    events: EventSender,
    done: Sender<Result<String, String>>,
    runtime: Handle,
) -> Result<()> {
    thread::Builder::new()
        .name("upload".to_string())
        .spawn(move || {
            let outcome = runtime
                .block_on(upload(config, modules, events))
                .map(|summary| summary.to_string())
                .map_err(|e| {
                    tracing::error!("Upload failed: {:#}", e);
                    format!("{e:#}")
                });
            let _ = done.send(outcome);
        })
        .context("Failed to start upload")?;
    Ok(())
}

async fn upload(
    config: WizardConfig,
    modules: Vec<Module>,
    events: EventSender,
) -> Result<UploadSummary> {
    let client = PwndocClient::connect(&config).await?;
    UploadPipeline::new(client, config, events).run(&modules).await
}
