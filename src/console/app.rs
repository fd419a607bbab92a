//! Interactive console application driving the sidetone engine

use crate::audio::{AudioBackend, EngineConfig, Event, Flow, SidetoneEngine, StreamHealth};
use crate::config::{Preferences, PreferencesStore, RunOverrides};
use crate::console::commands::{self, ConsoleCommand, HELP};
use crate::console::status::StatusLine;
use crate::device::{DeviceCatalog, DeviceEnumerator, DeviceFilter, Direction};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::thread;
use tracing::{debug, info, warn};

/// Console front end: device lists, volume and mute over stdin
pub struct ConsoleApp<B: AudioBackend> {
    engine: SidetoneEngine<B>,
    status: StatusLine,
    health: Option<StreamHealth>,
}

impl<B: AudioBackend> ConsoleApp<B> {
    /// Enumerate devices and build the engine from saved preferences
    ///
    /// Nothing is opened yet; [`ConsoleApp::run`] makes the initial
    /// connection attempt.
    pub fn new(backend: B, store: PreferencesStore, overrides: &RunOverrides) -> Self {
        let catalog = DeviceEnumerator::new(&backend).catalog();
        let prefs = apply_overrides(store.load(), overrides, &catalog);

        let mut status = StatusLine::default();
        status.show(catalog.summary());

        let config = EngineConfig {
            buffer_frames: overrides.buffer_frames.unwrap_or(prefs.buffer_frames),
        };
        let engine = SidetoneEngine::new(backend, catalog, &prefs, config).with_store(store);

        Self {
            engine,
            status,
            health: None,
        }
    }

    /// Report stream errors from this slot on `status`
    pub fn with_health(mut self, health: StreamHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn engine(&self) -> &SidetoneEngine<B> {
        &self.engine
    }

    /// Run until quit, Ctrl+C or end of input
    ///
    /// Startup order is fixed: the engine makes its one initial
    /// connection attempt before any input is read.
    pub fn run(mut self) -> crate::Result<()> {
        self.engine.start();

        println!("{}", self.devices_text());
        if let Some(message) = self.status.current() {
            println!("{}", message);
        }
        println!("{}", self.engine.describe());
        println!("Type 'help' for commands.");

        let (command_tx, command_rx) = bounded::<ConsoleCommand>(64);

        let ctrlc_tx = command_tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = ctrlc_tx.send(ConsoleCommand::Quit);
        }) {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }

        spawn_stdin_reader(command_tx);
        self.run_loop(&command_rx);

        Ok(())
    }

    fn run_loop(&mut self, command_rx: &Receiver<ConsoleCommand>) {
        loop {
            let command = match command_rx.recv() {
                Ok(command) => command,
                Err(_) => {
                    info!("Command channel disconnected");
                    ConsoleCommand::Quit
                }
            };

            if self.dispatch(command) == Flow::Exit {
                break;
            }
        }
    }

    /// Apply one console command; returns `Flow::Exit` once shut down
    pub fn dispatch(&mut self, command: ConsoleCommand) -> Flow {
        match command {
            ConsoleCommand::Engine(event) => {
                let flow = self.engine.handle(event);
                if let Some(message) = self.selection_message(event) {
                    self.status.show(message);
                }
                println!("{}", self.engine.describe());
                flow
            }
            ConsoleCommand::Devices => {
                self.status.show(self.engine.catalog().summary());
                println!("{}", self.devices_text());
                if let Some(message) = self.status.current() {
                    println!("{}", message);
                }
                Flow::Continue
            }
            ConsoleCommand::Status => {
                println!("{}", self.status_text());
                Flow::Continue
            }
            ConsoleCommand::Help => {
                println!("{}", HELP);
                Flow::Continue
            }
            ConsoleCommand::Quit => {
                println!("Stopping...");
                self.engine.handle(Event::ShuttingDown)
            }
        }
    }

    /// Status message after a device selector moved
    fn selection_message(&self, event: Event) -> Option<String> {
        let (label, device, open) = match event {
            Event::InputSelected(_) => (
                "Input",
                self.engine.selected_input_device(),
                self.engine.input_handle().is_some(),
            ),
            Event::OutputSelected(_) => (
                "Output",
                self.engine.selected_output_device(),
                self.engine.output_handle().is_some(),
            ),
            _ => return None,
        };

        let name = device.map(|d| d.name.as_str()).unwrap_or("-");
        Some(if open {
            format!("{}: {}", label, name)
        } else {
            format!("{}: {} (could not open)", label, name)
        })
    }

    /// Numbered device lists with the current selections marked
    pub fn devices_text(&self) -> String {
        let catalog = self.engine.catalog();
        let mut text = String::new();
        text.push_str(&device_list(
            catalog,
            Direction::Input,
            self.engine.selected_input(),
        ));
        text.push('\n');
        text.push_str(&device_list(
            catalog,
            Direction::Output,
            self.engine.selected_output(),
        ));
        text
    }

    /// Route description plus any transient message and stream error
    pub fn status_text(&self) -> String {
        let mut text = self.engine.describe();
        if let Some(message) = self.status.current() {
            text.push_str("\n  ");
            text.push_str(message);
        }
        if let Some(error) = self.health.as_ref().and_then(|h| h.last_error()) {
            text.push_str("\n  last stream error: ");
            text.push_str(&error);
        }
        text
    }
}

/// Forward parsed stdin lines to the event thread; end of input quits
fn spawn_stdin_reader(command_tx: Sender<ConsoleCommand>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };

            match commands::parse(&line) {
                Ok(Some(command)) => {
                    if command_tx.send(command).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{} (type 'help')", e),
            }
        }

        debug!("End of input");
        let _ = command_tx.send(ConsoleCommand::Quit);
    });
}

/// Merge command line overrides into the saved preferences
///
/// Device overrides match by name substring against the catalog; a name
/// that matches nothing is ignored. The buffer size override only applies
/// to the engine config, so it never reaches the preferences file.
pub fn apply_overrides(
    mut prefs: Preferences,
    overrides: &RunOverrides,
    catalog: &DeviceCatalog,
) -> Preferences {
    if let Some(query) = &overrides.input {
        match DeviceFilter::find(&catalog.inputs, query) {
            Some(index) => prefs.input_device = catalog.inputs[index].name.clone(),
            None => warn!("No input device matching '{}'", query),
        }
    }
    if let Some(query) = &overrides.output {
        match DeviceFilter::find(&catalog.outputs, query) {
            Some(index) => prefs.output_device = catalog.outputs[index].name.clone(),
            None => warn!("No output device matching '{}'", query),
        }
    }
    if let Some(volume) = overrides.volume {
        prefs.volume = volume;
    }
    if overrides.unmute {
        prefs.muted = false;
    }
    prefs
}

fn device_list(catalog: &DeviceCatalog, direction: Direction, selected: usize) -> String {
    let title = match direction {
        Direction::Input => "Inputs:",
        Direction::Output => "Outputs:",
    };

    let mut text = String::from(title);
    for (i, device) in catalog.devices(direction).iter().enumerate() {
        let marker = if i == selected { '*' } else { ' ' };
        text.push_str(&format!("\n {} {}. {}", marker, i + 1, device));
    }
    text
}
