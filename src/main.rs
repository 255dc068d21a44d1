// What you SEE:
// • The video frame, with the selected hitboxes outlined in their palette colors.
// • Move the mouse over the frame: yellow guides and an "X: .., Y: .." readout in
//   hitbox coordinates.
// • A status strip at the bottom: frame, play state, loop, scene, button history.
// Keys: Space play/pause, arrows step (Shift = 10), PgUp/PgDn scene, F1-F12 frame
// buttons, 1-0 hitboxes (Shift for the next 12 / 10), A/D all/none, Ctrl+WASD
// nudge, R reset, L stop loop, H clear history, I info, P snapshot, Esc quit.
// Prompts (type numbers, Enter): G goto frame, K loop "START END",
// B frame button #, T hitbox #.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{CommandFactory, Parser, error::ErrorKind};

use hitbox_viewer::compositor::Compositor;
use hitbox_viewer::config::ViewerPrefs;
use hitbox_viewer::engine::{IntervalScheduler, PlaybackEngine};
use hitbox_viewer::error::{ViewerError, ViewerResult};
use hitbox_viewer::logging::init_logging;
use hitbox_viewer::scaler::{CoordinateScaler, ScaleConfig};
use hitbox_viewer::scene::{Scene, fallback_scenes, try_load_scenes};
use hitbox_viewer::session::ViewerSession;
use hitbox_viewer::video::{PatternSource, VideoSource, ffmpeg_available};
use hitbox_viewer::window::{Command, StatusText, ViewerWindow, compose_screen};

/// How long an error stays in the status strip.
const ALERT_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DisplaySize {
    width: u32,
    height: u32,
}

fn parse_display_size(s: &str) -> Result<DisplaySize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if width == 0 || height == 0 {
        return Err("display size must be positive".to_string());
    }
    Ok(DisplaySize { width, height })
}

#[derive(Parser, Debug)]
#[command(name = "hitbox-viewer", version, about = "Frame-accurate video viewer with hitbox overlays")]
struct Cli {
    /// Video file (defaults to the last one opened).
    #[arg(long)]
    video: Option<PathBuf>,

    /// Scene JSON file (defaults to the last one opened).
    #[arg(long)]
    scenes: Option<PathBuf>,

    /// Scene to select first (0-based).
    #[arg(long, default_value_t = 0)]
    scene: usize,

    /// Jump to this frame after loading (pauses playback).
    #[arg(long, allow_negative_numbers = true)]
    goto: Option<i64>,

    /// Loop between two frames, inclusive.
    #[arg(long = "loop", num_args = 2, value_names = ["START", "END"], allow_negative_numbers = true)]
    loop_range: Option<Vec<i64>>,

    /// Display size the hitbox space is scaled onto.
    #[arg(long, value_parser = parse_display_size, default_value = "720x576")]
    display: DisplaySize,

    /// Play a generated test pattern with this many frames instead of a video.
    #[arg(long, conflicts_with = "video")]
    pattern: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut prefs = ViewerPrefs::load();

    let cfg = ScaleConfig {
        display_width: cli.display.width,
        display_height: cli.display.height,
        ..ScaleConfig::default()
    };
    let scaler = CoordinateScaler::new(cfg)?;
    let (sx, sy) = scaler.scale();
    tracing::info!(
        virtual_w = cfg.virtual_width,
        virtual_h = cfg.virtual_height,
        display_w = cfg.display_width,
        display_h = cfg.display_height,
        sx,
        sy,
        "coordinate scale"
    );

    /* --- Video --- */
    let mut engine = PlaybackEngine::new(Compositor::new(scaler));
    let title = match cli.pattern {
        Some(frames) => {
            let (w, h) = scaler.display_size();
            engine.open_with(Path::new("pattern"), |_| {
                Ok(Box::new(PatternSource::new(frames, w, h)) as Box<dyn VideoSource>)
            });
            format!("Hitbox Viewer | test pattern ({frames} frames)")
        }
        None => {
            let Some(video) = cli.video.clone().or_else(|| prefs.last_video()) else {
                Cli::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "no --video given and no previously opened video to fall back to",
                    )
                    .exit();
            };
            if !ffmpeg_available() {
                tracing::warn!("ffmpeg/ffprobe not found on PATH; video decoding will fail");
            }
            if engine.open(&video) {
                prefs.set_last_video_path(&video);
            }
            format!("Hitbox Viewer | {}", video.display())
        }
    };

    /* --- Scenes --- */
    let scene_path = cli.scenes.clone().or_else(|| prefs.last_scenes());
    let scenes = match (&scene_path, cli.pattern) {
        (Some(path), _) => open_scenes(path, &mut prefs),
        (None, Some(_)) => fallback_scenes(),
        (None, None) => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "no --scenes given and no previously opened scene file to fall back to",
            )
            .exit(),
    };
    prefs.save();

    let mut session = ViewerSession::new(scenes);
    if !session.select_scene(cli.scene, &mut engine) {
        tracing::warn!(scene = cli.scene, count = session.scenes().len(), "no such scene; using the first");
        session.select_scene(0, &mut engine);
    }

    let mut alert: Option<(String, Instant)> = None;
    if let Some(bounds) = &cli.loop_range {
        if let [start, end] = bounds.as_slice() {
            if let Err(e) = session.play_manual_loop(*start, *end, &mut engine) {
                raise(&mut alert, &e);
            }
        }
    }
    if let Some(frame) = cli.goto {
        if let Err(e) = session.goto_frame(frame, &mut engine) {
            raise(&mut alert, &e);
        }
    }

    /* --- Window --- */
    let (dw, dh) = scaler.display_size();
    let (dw, dh) = (dw as usize, dh as usize);
    let mut window = ViewerWindow::new(&title, dw, dh).context("open viewer window")?;
    let mut scheduler = IntervalScheduler::default();

    /* ------------------------------ Main loop ------------------------------ */
    'main: while window.is_open() {
        // 1) Pointer first so the readout tracks this iteration's frame.
        engine.set_pointer(window.pointer());

        // 2) Keys
        for cmd in window.commands() {
            let result = match cmd {
                Ok(Command::Quit) => break 'main,
                Ok(cmd) => apply(cmd, &mut engine, &mut session),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                raise(&mut alert, &e);
            }
        }

        // 3) Advance playback by however many periods have elapsed.
        engine.pump(&mut scheduler);

        // 4) Present.
        if alert.as_ref().is_some_and(|(_, at)| at.elapsed() > ALERT_TTL) {
            alert = None;
        }
        let mut status = status_text(&engine, &session, alert.as_ref().map(|(m, _)| m.clone()));
        if let Some(prompt) = window.entry_prompt() {
            status.detail = prompt;
        }
        let screen = compose_screen(engine.display(), dw, dh, &status);
        window.present(&screen)?;
    }

    Ok(())
}

/// Scenes from `path`. Only a file that parses is remembered for next time.
fn open_scenes(path: &Path, prefs: &mut ViewerPrefs) -> Vec<Scene> {
    match try_load_scenes(path) {
        Ok(scenes) => {
            tracing::info!(path = %path.display(), count = scenes.len(), "scenes loaded");
            prefs.set_last_scene_path(path);
            scenes
        }
        Err(e) => {
            tracing::warn!(error = %e, "using built-in fallback scene");
            fallback_scenes()
        }
    }
}

fn raise(alert: &mut Option<(String, Instant)>, err: &ViewerError) {
    tracing::warn!(error = %err, "request rejected");
    *alert = Some((err.to_string(), Instant::now()));
}

fn apply(cmd: Command, engine: &mut PlaybackEngine, session: &mut ViewerSession) -> ViewerResult<()> {
    match cmd {
        Command::TogglePlay => session.toggle_play_pause(engine),
        Command::Seek(delta) => engine.seek_relative(delta),
        Command::PrevScene => {
            session.prev_scene(engine);
        }
        Command::NextScene => {
            session.next_scene(engine);
        }
        Command::FrameButton(i) => {
            session.activate_frame_button(i, engine);
        }
        Command::ToggleHitbox(i) => {
            if engine.toggle_visible(i) && engine.hitboxes().is_visible(i) {
                if let Some(hb) = engine.hitboxes().displayed(i) {
                    tracing::info!("{}", hb.describe(i));
                }
            }
        }
        Command::SelectAll => engine.select_all(),
        Command::DeselectAll => engine.deselect_all(),
        Command::Nudge(dx, dy) => {
            let (ox, oy) = engine.offset();
            engine.set_offset(ox.saturating_add(dx), oy.saturating_add(dy));
        }
        Command::ResetOffset => engine.set_offset(0, 0),
        Command::StopLoop => session.stop_loop(engine),
        Command::ResetHistory => session.reset_history(),
        Command::Goto(frame) => session.goto_frame(frame, engine)?,
        Command::ManualLoop(start, end) => session.play_manual_loop(start, end, engine)?,
        Command::ShowInfo => match engine.video_info() {
            Some(info) => tracing::info!(
                path = %info.path.display(),
                width = info.width,
                height = info.height,
                fps = info.fps,
                frames = info.total_frames,
                duration = %info.duration_label(),
                "video info"
            ),
            None => tracing::warn!("no video loaded"),
        },
        Command::Snapshot => {
            let path = PathBuf::from(format!("snapshot_{:06}.png", engine.current_frame_number()));
            engine.save_snapshot(&path)?;
        }
        Command::Prompt(_) | Command::Quit => {}
    }
    Ok(())
}

fn status_text(engine: &PlaybackEngine, session: &ViewerSession, alert: Option<String>) -> StatusText {
    let loop_part = match engine.loop_range() {
        Some(r) => format!("LOOP {}-{}", r.start, r.end),
        None => "LOOP -".to_string(),
    };
    let scene = session
        .current_scene()
        .map(|s| s.label())
        .unwrap_or_else(|| "NO SCENE".to_string());
    let summary = format!(
        "FRAME {}/{} | {} | {} | {}",
        engine.current_frame_number(),
        engine.total_frames(),
        engine.state().label(),
        loop_part,
        scene
    );

    let button = session
        .active_button()
        .and_then(|i| session.frame_ranges().get(i).map(|r| r.label(i)))
        .unwrap_or_else(|| "-".to_string());
    let (ox, oy) = engine.offset();
    let visible: Vec<String> = (0..engine.hitboxes().len())
        .filter(|i| engine.hitboxes().is_visible(*i))
        .map(|i| (i + 1).to_string())
        .collect();
    let detail = format!(
        "BUTTON {} | HISTORY {} | OFFSET {},{} | SHOWN {}",
        button,
        session.history_label(),
        ox,
        oy,
        if visible.is_empty() { "-".to_string() } else { visible.join(",") }
    );

    StatusText { summary, detail, alert }
}
