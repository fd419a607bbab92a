//! Sidetone engine - device selection and reconnection state machine
//!
//! All transitions run on the event thread. The engine owns at most one
//! input handle and one output handle; the connection (input streaming into
//! output) exists exactly when both are present.

use crate::audio::backend::{AudioBackend, InputStream, OutputStream};
use crate::audio::VolumeState;
use crate::config::{Preferences, PreferencesStore, DEFAULT_BUFFER_FRAMES};
use crate::device::{DeviceCatalog, DeviceFilter, DeviceInfo, Direction};
use tracing::{debug, info, warn};

/// Capture gain; the input side always runs wide open
const INPUT_VOLUME: f32 = 1.0;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capture buffer size in frames
    pub buffer_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

/// User events driving the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Input selector moved to this index
    InputSelected(usize),
    /// Output selector moved to this index
    OutputSelected(usize),
    /// Volume slider moved, 0-100
    VolumeChanged(u8),
    /// Mute checkbox set or cleared
    MuteToggled(bool),
    /// Application is closing
    ShuttingDown,
}

/// Whether the event loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Which handles are currently open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Idle,
    InputOnly,
    OutputOnly,
    Connected,
}

/// Routes one input device into one output device
pub struct SidetoneEngine<B: AudioBackend> {
    backend: B,
    catalog: DeviceCatalog,
    config: EngineConfig,
    store: Option<PreferencesStore>,
    selected_input: usize,
    selected_output: usize,
    volume: VolumeState,
    /// Buffer size read from preferences, saved back unchanged
    saved_buffer_frames: u32,
    input: Option<B::Input>,
    output: Option<B::Output>,
    shut_down: bool,
}

impl<B: AudioBackend> SidetoneEngine<B> {
    /// Create an idle engine with selections restored from `prefs`
    ///
    /// Device names that are no longer present resolve to the first device.
    pub fn new(backend: B, catalog: DeviceCatalog, prefs: &Preferences, config: EngineConfig) -> Self {
        let selected_input = DeviceFilter::resolve(&catalog.inputs, &prefs.input_device);
        let selected_output = DeviceFilter::resolve(&catalog.outputs, &prefs.output_device);

        debug!(
            "Restored selection: input #{} output #{} volume {} muted {}",
            selected_input, selected_output, prefs.volume, prefs.muted
        );

        Self {
            backend,
            catalog,
            config,
            store: None,
            selected_input,
            selected_output,
            volume: prefs.volume_state(),
            saved_buffer_frames: prefs.buffer_frames,
            input: None,
            output: None,
            shut_down: false,
        }
    }

    /// Persist preferences to this store on shutdown
    pub fn with_store(mut self, store: PreferencesStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Initial connection attempt
    ///
    /// When starting muted nothing is opened; the first unmute opens the
    /// selected devices.
    pub fn start(&mut self) {
        if self.volume.is_muted() {
            info!("Starting muted, devices open on unmute");
            return;
        }
        self.open_selected();
    }

    /// Apply one user event
    pub fn handle(&mut self, event: Event) -> Flow {
        if self.shut_down {
            debug!("Ignoring {:?} after shutdown", event);
            return Flow::Exit;
        }

        debug!("Event: {:?}", event);
        match event {
            Event::InputSelected(index) => self.select_input(index),
            Event::OutputSelected(index) => self.select_output(index),
            Event::VolumeChanged(level) => self.volume_changed(level),
            Event::MuteToggled(muted) => self.mute_toggled(muted),
            Event::ShuttingDown => return self.shutdown(),
        }
        Flow::Continue
    }

    pub fn state(&self) -> RouteState {
        match (self.input.is_some(), self.output.is_some()) {
            (false, false) => RouteState::Idle,
            (true, false) => RouteState::InputOnly,
            (false, true) => RouteState::OutputOnly,
            (true, true) => RouteState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RouteState::Connected
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn selected_input(&self) -> usize {
        self.selected_input
    }

    pub fn selected_output(&self) -> usize {
        self.selected_output
    }

    pub fn selected_input_device(&self) -> Option<&DeviceInfo> {
        self.catalog.get(Direction::Input, self.selected_input)
    }

    pub fn selected_output_device(&self) -> Option<&DeviceInfo> {
        self.catalog.get(Direction::Output, self.selected_output)
    }

    pub fn volume(&self) -> VolumeState {
        self.volume
    }

    /// Gain currently set on the output handle, if one is open
    pub fn output_gain(&self) -> Option<f32> {
        self.output.as_ref().map(|o| o.volume())
    }

    pub fn input_handle(&self) -> Option<&B::Input> {
        self.input.as_ref()
    }

    pub fn output_handle(&self) -> Option<&B::Output> {
        self.output.as_ref()
    }

    /// Snapshot of the selections to persist
    ///
    /// The buffer size is the one loaded from preferences, not a session
    /// override held in [`EngineConfig`].
    pub fn preferences(&self) -> Preferences {
        let name = |device: Option<&DeviceInfo>| {
            device
                .map(|d| d.name.clone())
                .unwrap_or_else(|| crate::config::UNKNOWN_DEVICE.to_string())
        };

        Preferences {
            input_device: name(self.selected_input_device()),
            output_device: name(self.selected_output_device()),
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            buffer_frames: self.saved_buffer_frames,
        }
    }

    /// One-line description of the route
    pub fn describe(&self) -> String {
        let input = self.input.as_ref().map(|i| i.device_name()).unwrap_or("-");
        let output = self.output.as_ref().map(|o| o.device_name()).unwrap_or("-");
        let volume = if self.volume.is_muted() {
            format!("muted ({})", self.volume.level())
        } else {
            format!("volume {}", self.volume.level())
        };
        format!("{:?}: {} -> {}, {}", self.state(), input, output, volume)
    }

    fn select_input(&mut self, index: usize) {
        let Some(info) = self.catalog.get(Direction::Input, index).cloned() else {
            warn!("No input device at index {}", index);
            return;
        };

        self.disconnect();
        // Release the old capture before opening the new one
        self.input = None;
        self.selected_input = index;

        self.input = match self.backend.open_input(&info) {
            Ok(mut input) => {
                input.set_volume(INPUT_VOLUME);
                input.set_buffer_size(self.config.buffer_frames);
                info!("Input device: {}", info.name);
                Some(input)
            }
            Err(e) => {
                warn!("Failed to open input {}: {}", info.name, e);
                None
            }
        };

        self.reconnect();
    }

    fn select_output(&mut self, index: usize) {
        let Some(info) = self.catalog.get(Direction::Output, index).cloned() else {
            warn!("No output device at index {}", index);
            return;
        };

        self.disconnect();
        self.output = None;
        self.selected_output = index;

        self.output = match self.backend.open_output(&info) {
            Ok(mut output) => {
                // reconnect sets the real volume
                output.set_volume(0.0);
                info!("Output device: {}", info.name);
                Some(output)
            }
            Err(e) => {
                warn!("Failed to open output {}: {}", info.name, e);
                None
            }
        };

        self.reconnect();
    }

    /// Open both selected devices, as if each selector had just been chosen
    fn open_selected(&mut self) {
        self.select_input(self.selected_input);
        self.select_output(self.selected_output);
    }

    /// Stop output first so it never pulls from a dying input
    fn disconnect(&mut self) {
        if let Some(output) = self.output.as_mut() {
            output.stop();
        }
        if let Some(input) = self.input.as_mut() {
            input.stop();
        }
    }

    /// Splice input into output if both exist
    ///
    /// A handle whose stream fails to start is dropped, so a present pair
    /// always means a live connection.
    fn reconnect(&mut self) {
        let (Some(input), Some(output)) = (self.input.as_mut(), self.output.as_mut()) else {
            return;
        };

        let sink = match output.start() {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Failed to start output {}: {}", output.device_name(), e);
                output.stop();
                self.output = None;
                return;
            }
        };

        if let Err(e) = input.start(sink) {
            warn!("Failed to start input {}: {}", input.device_name(), e);
            output.stop();
            input.stop();
            self.input = None;
            return;
        }

        info!("Connected {} -> {}", input.device_name(), output.device_name());
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        let gain = self.volume.effective_gain();
        if let Some(output) = self.output.as_mut() {
            output.set_volume(gain);
            debug!("Output gain {:.2}", gain);
        }
    }

    fn volume_changed(&mut self, level: u8) {
        self.volume.set_level(level);
        if self.volume.is_muted() {
            // Moving the slider means the user wants to hear it
            self.mute_toggled(false);
        } else {
            self.apply_volume();
        }
    }

    fn mute_toggled(&mut self, muted: bool) {
        self.volume.set_muted(muted);
        if !muted && self.input.is_none() && self.output.is_none() {
            self.open_selected();
        }
        self.apply_volume();
    }

    /// Tear down both handles and persist selections, once
    fn shutdown(&mut self) -> Flow {
        self.shut_down = true;
        self.release();

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.preferences()) {
                warn!("Failed to save preferences: {}", e);
            }
        }

        info!("Sidetone engine shut down");
        Flow::Exit
    }

    fn release(&mut self) {
        self.disconnect();
        self.output = None;
        self.input = None;
    }
}

impl<B: AudioBackend> Drop for SidetoneEngine<B> {
    fn drop(&mut self) {
        if !self.shut_down {
            self.release();
        }
    }
}
