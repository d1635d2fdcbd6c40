//! Top-level application loop.
//!
//! `AppState` owns the [`VolumeEngine`] and everything the HUD needs.  It
//! consumes [`FrameEvent`]s from whichever source was chosen and, with a
//! window, renders after every batch.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;
use volume_map::{Application, VolumeSink};

use crate::engine::{FrameClock, FrameOutcome, VolumeEngine};
use crate::frame::{
    spawn_frame_source, FrameEvent, FrameSource, HandFrame, JsonLinesSource, SimHandSource, SimInput,
};
use crate::hud::{Hud, HudView};
use crate::settings::Settings;
use crate::sink::build_sink;

const SIM_FRAME_PERIOD: Duration = Duration::from_millis(33);

// ════════════════════════════════════════════════════════════════════════════
// SourceKind
// ════════════════════════════════════════════════════════════════════════════

/// Where hand frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Keyboard-driven synthetic hands (needs the HUD window).
    Sim,
    /// JSON lines on stdin.
    Stdin,
    /// JSON lines from a file.
    File(PathBuf),
    /// LeapMotion controller.
    #[cfg(feature = "leap")]
    Leap,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sim"   => Ok(SourceKind::Sim),
            "stdin" | "-" => Ok(SourceKind::Stdin),
            #[cfg(feature = "leap")]
            "leap"  => Ok(SourceKind::Leap),
            #[cfg(not(feature = "leap"))]
            "leap"  => Err("built without the `leap` feature".into()),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(SourceKind::File(PathBuf::from(path))),
                _ => Err(format!("unknown source {other:?} (sim, stdin, file:<path>, leap)")),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub source:   SourceKind,
    /// No window; frames are processed as they arrive until the source ends.
    pub headless: bool,
}

/// Counters reported when the loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames:  u64,
    pub toggles: u32,
    pub applied: u64,
    pub locked:  bool,
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<S: VolumeSink> {
    engine:     VolumeEngine<S>,
    clock:      FrameClock,
    view:       HudView,
    last_frame: Option<HandFrame>,
    summary:    RunSummary,
}

impl<S: VolumeSink> AppState<S> {
    pub fn new(engine: VolumeEngine<S>, hold_secs: f32, clock: FrameClock) -> Self {
        AppState {
            engine,
            clock,
            view: HudView { hold_secs, ..HudView::default() },
            last_frame: None,
            summary: RunSummary::default(),
        }
    }

    // ── process one frame ─────────────────────────────────────────────────

    pub fn handle_frame(&mut self, frame: HandFrame) -> FrameOutcome {
        let now = self.clock.stamp(&frame);
        let outcome = self.engine.process(&frame, now);

        self.summary.frames += 1;
        self.summary.locked = outcome.lock.locked;
        if outcome.lock.toggled {
            self.summary.toggles += 1;
        }

        self.view.locked   = outcome.lock.locked;
        self.view.progress = outcome.lock.progress;
        // The display follows the hand even when the sink rejects the value.
        if let Some(control) = &outcome.control {
            match control.application {
                Application::Applied(_) => {
                    self.summary.applied += 1;
                    self.view.volume = Some(control.level);
                }
                Application::Failed(_) => self.view.volume = Some(control.level),
                Application::Locked    => {}
            }
        }

        self.last_frame = Some(frame);
        outcome
    }

    /// Drain everything queued on `rx`.  Returns false once the source quit
    /// or went away.
    pub fn drain(&mut self, rx: &Receiver<FrameEvent>) -> bool {
        loop {
            match rx.try_recv() {
                Ok(FrameEvent::Frame(frame))    => { self.handle_frame(frame); }
                Ok(FrameEvent::Quit)            => return false,
                Err(TryRecvError::Empty)        => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn view(&self)       -> &HudView           { &self.view }
    pub fn last_frame(&self) -> Option<&HandFrame> { self.last_frame.as_ref() }
    pub fn summary(&self)    -> RunSummary         { self.summary }
    pub fn engine(&self)     -> &VolumeEngine<S>   { &self.engine }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

fn open_source(
    kind:     &SourceKind,
    settings: &Settings,
    sim_rx:   Option<Receiver<SimInput>>,
) -> Result<Box<dyn FrameSource>> {
    let min_score = settings.min_detection_score;
    Ok(match kind {
        SourceKind::Sim => {
            let rx = sim_rx.context("simulation source needs the HUD window")?;
            Box::new(SimHandSource {
                rx,
                height: settings.frame_height as f32,
                period: SIM_FRAME_PERIOD,
            })
        }
        SourceKind::Stdin => Box::new(JsonLinesSource::stdin(min_score)),
        SourceKind::File(path) => Box::new(
            JsonLinesSource::open(path, min_score)
                .with_context(|| format!("failed to open landmark feed {}", path.display()))?,
        ),
        #[cfg(feature = "leap")]
        SourceKind::Leap => Box::new(crate::frame::LeapFrameSource),
    })
}

/// Run the controller until the source ends or the window closes.
pub fn run(settings: Settings, opts: RunOptions) -> Result<RunSummary> {
    settings.validate()?;

    if opts.headless && opts.source == SourceKind::Sim {
        bail!("the keyboard simulation needs the HUD; pick another --source or drop --headless");
    }

    let sink = build_sink(&settings);
    let engine = VolumeEngine::from_settings(&settings, sink);
    let mut app = AppState::new(engine, settings.hold_secs, FrameClock::start());

    if opts.headless {
        let source = open_source(&opts.source, &settings, None)?;
        let rx = spawn_frame_source(source);
        for event in rx {
            match event {
                FrameEvent::Frame(frame) => { app.handle_frame(frame); }
                FrameEvent::Quit         => break,
            }
        }
    } else {
        // ── Sim channel (only wired when the keyboard drives the hands) ──
        let (sim_tx, sim_rx) = match opts.source {
            SourceKind::Sim => {
                let (tx, rx) = mpsc::channel::<SimInput>();
                (Some(tx), Some(rx))
            }
            _ => (None, None),
        };

        let mut hud = Hud::new(sim_tx).context("failed to open HUD window")?;
        let rx = spawn_frame_source(open_source(&opts.source, &settings, sim_rx)?);

        while hud.is_open() {
            if !hud.poll_input() { break; }
            if !app.drain(&rx) { break; }
            hud.render(app.last_frame(), app.view());
        }
    }

    let summary = app.summary();
    info!(
        "processed {} frames, {} lock toggles, {} volume updates, finished {}",
        summary.frames, summary.toggles, summary.applied,
        if summary.locked { "locked" } else { "unlocked" },
    );
    Ok(summary)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
