use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use hitbox_viewer::engine::{LoopRange, PlaybackEngine, PlaybackState};
use hitbox_viewer::hitbox::palette_color;
use hitbox_viewer::scene::load_scenes;
use hitbox_viewer::session::ViewerSession;
use hitbox_viewer::types::PointerSample;
use hitbox_viewer::video::{FfmpegSource, PatternSource, VideoSource, ffmpeg_available};
use hitbox_viewer::ViewerError;

fn pattern_engine(frames: u64) -> PlaybackEngine {
    let mut engine = PlaybackEngine::default();
    let opened = engine.open_with(Path::new("pattern"), |_| {
        Ok(Box::new(PatternSource::new(frames, 720, 576)) as Box<dyn VideoSource>)
    });
    assert!(opened);
    engine
}

fn shown(engine: &PlaybackEngine) -> u64 {
    engine
        .raw_frame()
        .and_then(PatternSource::index_of)
        .expect("a decoded frame")
}

#[test]
fn scene_file_drives_loops_and_overlay() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"id": 4, "offset": "0x0040",
              "hitboxes": [{{"rect": {{"x0": 54, "y0": 34, "x1": 122, "y1": 73}}}},
                           {{"rect": {{"x0": 176, "y0": 35, "x1": 243, "y1": 78}}, "points": 200}}],
              "frames": [{{"from": 100, "to": 103}}, {{"from": 10, "to": 12}}]}}
        ]"#
    )
    .unwrap();

    let mut engine = pattern_engine(500);
    let mut session = ViewerSession::new(load_scenes(file.path()));
    assert!(session.select_scene(0, &mut engine));
    assert_eq!(engine.state(), PlaybackState::Looping);
    assert_eq!(shown(&engine), 100);

    for _ in 0..5 {
        engine.tick();
    }
    // 101, 102, 103, then back to 100, 101
    assert_eq!(shown(&engine), 101);

    session.activate_frame_button(1, &mut engine);
    assert_eq!(engine.loop_range(), Some(LoopRange { start: 10, end: 12 }));
    assert_eq!(session.history_label(), "#2");

    engine.set_visible(1, true);
    let frame = engine.display().unwrap();
    // (176,35)-(243,78) at 2.25 -> origin (396,79)
    assert_eq!(frame.get(396, 79), Some(palette_color(1)));

    engine.set_offset(2, 0);
    let frame = engine.display().unwrap();
    assert_eq!(frame.get(400, 79), Some(palette_color(1)));
    assert_eq!(engine.hitboxes().displayed(1).map(|h| h.x0), Some(178));
}

#[test]
fn bad_scene_file_still_gives_a_usable_session() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "this is not json").unwrap();

    let mut engine = pattern_engine(20_000);
    let mut session = ViewerSession::new(load_scenes(file.path()));
    assert_eq!(session.scenes().len(), 1);
    session.select_scene(0, &mut engine);
    assert_eq!(engine.hitboxes().len(), 2);
    assert_eq!(session.frame_ranges().len(), 2);
    assert_eq!(
        engine.loop_range(),
        Some(LoopRange {
            start: 10821,
            end: 13405
        })
    );
}

#[test]
fn boundary_checks_happen_before_the_engine() {
    let mut engine = pattern_engine(50);
    let mut session = ViewerSession::new(load_scenes(Path::new("/no/such/scenes.json")));
    session.select_scene(0, &mut engine);

    assert!(matches!(
        session.play_manual_loop(9, 3, &mut engine),
        Err(ViewerError::InvalidLoop { start: 9, end: 3 })
    ));
    assert!(matches!(
        session.goto_frame(50, &mut engine),
        Err(ViewerError::FrameOutOfRange { frame: 50, total: 50 })
    ));

    session.goto_frame(49, &mut engine).unwrap();
    assert_eq!(engine.state(), PlaybackState::Paused);
    assert_eq!(shown(&engine), 49);
}

#[test]
fn pointer_readout_follows_the_mouse() {
    let mut engine = pattern_engine(5);
    engine.set_pointer(Some(PointerSample::new(360, 288)));
    let frame = engine.display().unwrap();
    assert_eq!(frame.get(5, 288), Some(0x00_FF_FF_00));
    assert_eq!(frame.get(360, 500), Some(0x00_FF_FF_00));
    engine.set_pointer(None);
    assert_eq!(engine.display(), engine.raw_frame());
}

#[test]
fn nonexistent_video_leaves_engine_closed() {
    let mut engine = PlaybackEngine::default();
    assert!(!engine.open(Path::new("/definitely/missing/clip.mp4")));
    assert_eq!(engine.state(), PlaybackState::Closed);
    assert_eq!(engine.total_frames(), 0);
    engine.goto_absolute(10);
    assert_eq!(engine.current_frame_number(), 0);
    assert!(engine.video_info().is_none());
}

fn make_clip(path: &Path) -> bool {
    Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x48:rate=25:duration=2",
            "-c:v",
            "mpeg4",
            // keyframe every 10 frames so seeks land between keyframes
            "-g",
            "10",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[test]
fn ffmpeg_source_seeks_and_plays() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    if !make_clip(&clip) {
        eprintln!("skipping: could not generate a test clip");
        return;
    }

    let mut engine = PlaybackEngine::default();
    assert!(engine.open(&clip));
    let info = engine.video_info().unwrap();
    assert_eq!((info.width, info.height), (64, 48));
    assert_eq!(info.total_frames, 50);
    assert!((info.fps - 25.0).abs() < 1e-6);

    let frame = engine.display().unwrap();
    assert_eq!((frame.width, frame.height), (720, 576));

    engine.goto_absolute(30);
    assert_eq!(engine.current_frame_number(), 30);
    engine.play();
    engine.tick();
    engine.tick();
    assert_eq!(engine.current_frame_number(), 32);
    assert_eq!(engine.state(), PlaybackState::Playing);

    // running off the end pauses on the last good frame
    engine.goto_absolute(49);
    engine.tick();
    engine.tick();
    assert_eq!(engine.state(), PlaybackState::Paused);
    assert!(engine.display().is_some());

    let shot = dir.path().join("shot.png");
    engine.save_snapshot(&shot).unwrap();
    assert!(shot.is_file());
}

#[test]
fn ffmpeg_seek_lands_on_the_same_frame_as_playing_through() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    if !make_clip(&clip) {
        eprintln!("skipping: could not generate a test clip");
        return;
    }

    let mut through = FfmpegSource::open(&clip, (64, 48)).unwrap();
    let mut played = Vec::new();
    for _ in 0..=34 {
        played.push(through.read_frame().unwrap());
    }
    assert_eq!(through.decoder_starts(), 1);
    assert_ne!(played[32], played[33]);

    for target in [33u64, 7, 20, 34] {
        let mut seeker = FfmpegSource::open(&clip, (64, 48)).unwrap();
        seeker.set_position(target);
        let frame = seeker.read_frame().unwrap();
        assert!(frame == played[target as usize], "seek to {target} decoded a different frame");
    }

    // settle: read, step back, re-read, then keep playing on the same decoder
    let mut src = FfmpegSource::open(&clip, (64, 48)).unwrap();
    src.set_position(33);
    src.read_frame().unwrap();
    src.set_position(33);
    assert!(src.read_frame().unwrap() == played[33]);
    assert!(src.read_frame().unwrap() == played[34]);
    assert_eq!(src.decoder_starts(), 1);
    assert_eq!(src.position(), 35);

    src.set_position(5);
    assert!(src.read_frame().unwrap() == played[5]);
    assert_eq!(src.decoder_starts(), 2);
}
