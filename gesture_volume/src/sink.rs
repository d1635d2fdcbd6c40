//! Volume sink selection and the MIDI channel-volume sink.

use tracing::{info, warn};
use volume_map::{AmixerSink, LogSink, OsascriptSink, SinkError, VolumeSink};

use crate::settings::{Settings, SinkKind};

/// MIDI Control Change 7, channel volume.
const CC_CHANNEL_VOLUME: u8 = 7;

// ════════════════════════════════════════════════════════════════════════════
// MidiVolumeSink — midir backend
// ════════════════════════════════════════════════════════════════════════════

/// Sends the volume as CC 7 on one channel, scaled to 0–127.
pub struct MidiVolumeSink {
    conn:    midir::MidiOutputConnection,
    channel: u8,
}

impl MidiVolumeSink {
    /// Open an output port.  A port whose name contains `port_hint`
    /// (case-insensitive) is preferred, otherwise the first port is used.
    pub fn open(port_hint: Option<&str>, channel: u8) -> Result<Self, SinkError> {
        let midi_out = midir::MidiOutput::new("gesture_volume")
            .map_err(|e| SinkError::Midi(e.to_string()))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(SinkError::Midi("no MIDI output ports found".into()));
        }

        let port_idx = port_hint
            .map(str::to_lowercase)
            .and_then(|hint| {
                ports.iter().position(|p| {
                    midi_out.port_name(p)
                        .map(|n| n.to_lowercase().contains(&hint))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(0);

        let port = &ports[port_idx];
        let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".to_string());
        info!("opening MIDI port: {}", name);

        let conn = midi_out.connect(port, "gesture-volume")
            .map_err(|e| SinkError::Midi(e.to_string()))?;
        Ok(MidiVolumeSink { conn, channel: channel & 0x0F })
    }
}

/// 0–100 percent → 0–127 controller value.
pub fn midi_value(percent: u8) -> u8 {
    (u16::from(percent.min(100)) * 127 / 100) as u8
}

impl VolumeSink for MidiVolumeSink {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        self.conn
            .send(&[0xB0 | self.channel, CC_CHANNEL_VOLUME, midi_value(percent)])
            .map_err(|e| SinkError::Midi(e.to_string()))
    }
    fn name(&self) -> &'static str { "midi" }
}

// ════════════════════════════════════════════════════════════════════════════
// build_sink
// ════════════════════════════════════════════════════════════════════════════

/// Replace [`SinkKind::Auto`] with the platform's command sink.
pub fn resolve_kind(kind: SinkKind) -> SinkKind {
    match kind {
        SinkKind::Auto if cfg!(target_os = "macos") => SinkKind::Osascript,
        SinkKind::Auto if cfg!(target_os = "linux") => SinkKind::Amixer,
        SinkKind::Auto => SinkKind::Log,
        other => other,
    }
}

/// Build the configured sink.  A MIDI port that cannot be opened falls back
/// to [`LogSink`] so the controller still runs.
pub fn build_sink(settings: &Settings) -> Box<dyn VolumeSink> {
    let sink: Box<dyn VolumeSink> = match resolve_kind(settings.sink) {
        SinkKind::Osascript => Box::new(OsascriptSink),
        SinkKind::Amixer    => Box::new(AmixerSink::default()),
        SinkKind::Midi => {
            match MidiVolumeSink::open(settings.midi_port.as_deref(), settings.midi_channel) {
                Ok(s)  => Box::new(s),
                Err(e) => {
                    warn!("{}; using log output", e);
                    Box::new(LogSink::default())
                }
            }
        }
        SinkKind::Log | SinkKind::Auto => Box::new(LogSink::default()),
    };
    info!("volume sink: {}", sink.name());
    sink
}
