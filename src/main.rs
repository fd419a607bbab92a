//! sidetone - route a microphone to headphones CLI

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sidetone::audio::CpalBackend;
use sidetone::config::{Args, Command, PreferencesStore, RunOverrides};
use sidetone::console::ConsoleApp;
use sidetone::device::{DeviceEnumerator, DeviceFilter, DeviceInfo, Direction};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    let store = match &args.config {
        Some(path) => PreferencesStore::new(path),
        None => PreferencesStore::default_location(),
    };

    // Execute command
    match args.command.unwrap_or_default() {
        Command::List { inputs, outputs } => cmd_list(inputs, outputs),
        Command::Run(overrides) => cmd_run(store, &overrides),
        Command::Info { name } => cmd_info(&name),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(log_file) = &args.log {
        let file = std::fs::File::create(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        // Keep stdout for the console UI
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

/// List available audio devices
fn cmd_list(inputs_only: bool, outputs_only: bool) -> Result<()> {
    let backend = CpalBackend::new();
    let enumerator = DeviceEnumerator::new(&backend);

    println!("Audio host: {}\n", backend.host_name());

    if !outputs_only {
        print_devices("Input devices", &enumerator.enumerate(Direction::Input));
    }
    if !inputs_only {
        print_devices("Output devices", &enumerator.enumerate(Direction::Output));
    }

    Ok(())
}

fn print_devices(title: &str, devices: &[DeviceInfo]) {
    println!("{}:", title);
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}", i + 1, device);
    }
    println!();
}

/// Route the microphone until quit
fn cmd_run(store: PreferencesStore, overrides: &RunOverrides) -> Result<()> {
    println!("sidetone - microphone to headphones\n");
    info!("Preferences file: {:?}", store.path());

    let backend = CpalBackend::new();
    let health = backend.health();

    let app = ConsoleApp::new(backend, store, overrides).with_health(health);
    app.run()?;

    println!("Stopped.");
    Ok(())
}

/// Show detailed device information
fn cmd_info(name: &str) -> Result<()> {
    let backend = CpalBackend::new();
    let catalog = DeviceEnumerator::new(&backend).catalog();

    let device = DeviceFilter::find(&catalog.inputs, name)
        .map(|i| &catalog.inputs[i])
        .or_else(|| DeviceFilter::find(&catalog.outputs, name).map(|i| &catalog.outputs[i]));

    match device {
        Some(dev) => {
            println!("Device Information:\n");
            println!("  Name:      {}", dev.name);
            println!("  Direction: {}", dev.direction);
            println!("  Format:    {}", dev.format);
            println!("  Default:   {}", if dev.is_default { "Yes" } else { "No" });
            if dev.is_fallback {
                println!("  (placeholder - no device reported by the host)");
            }
        }
        None => {
            println!("Device not found: {}", name);
            println!("\nUse 'sidetone list' to see available devices.");
        }
    }

    Ok(())
}
