// The viewer window: composited frame on top, a two-line status strip below.
// Keyboard input is turned into `Command`s here so main only dispatches.

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use crate::draw::{draw_line, draw_text_5x7, fill_rect, measure_text_5x7};
use crate::error::{ViewerError, ViewerResult};
use crate::types::{FrameBuffer, PointerSample};

/// Height of the status strip under the frame.
pub const STATUS_HEIGHT: usize = 26;
const STATUS_BG: u32 = 0x00_10_10_10;
const STATUS_RULE: u32 = 0x00_50_50_50;
const STATUS_TEXT: u32 = 0x00_E0_E0_E0;
const STATUS_ALERT: u32 = 0x00_FF_60_40;
const EMPTY_BG: u32 = 0x00_18_18_20;

/// One user intent decoded from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    Seek(i64),
    PrevScene,
    NextScene,
    /// 0-based frame button.
    FrameButton(usize),
    /// 0-based hitbox.
    ToggleHitbox(usize),
    SelectAll,
    DeselectAll,
    Nudge(i32, i32),
    ResetOffset,
    StopLoop,
    ResetHistory,
    /// Open the number prompt.
    Prompt(EntryKind),
    Goto(i64),
    ManualLoop(i64, i64),
    ShowInfo,
    Snapshot,
    Quit,
}

impl Command {
    /// Held keys keep firing for these.
    pub fn repeats(self) -> bool {
        matches!(self, Command::Seek(_) | Command::Nudge(_, _))
    }
}

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
];

const DIGIT_KEYS: [Key; 10] = [
    Key::Key1,
    Key::Key2,
    Key::Key3,
    Key::Key4,
    Key::Key5,
    Key::Key6,
    Key::Key7,
    Key::Key8,
    Key::Key9,
    Key::Key0,
];

const NUMPAD_KEYS: [Key; 10] = [
    Key::NumPad0,
    Key::NumPad1,
    Key::NumPad2,
    Key::NumPad3,
    Key::NumPad4,
    Key::NumPad5,
    Key::NumPad6,
    Key::NumPad7,
    Key::NumPad8,
    Key::NumPad9,
];

/// Key binding table. Ctrl turns W/A/S/D into offset nudges; Shift moves
/// F-keys to buttons 13-24 and digits to hitboxes 11-20.
pub fn command_for(key: Key, shift: bool, ctrl: bool) -> Option<Command> {
    let page = usize::from(shift);
    if let Some(i) = FUNCTION_KEYS.iter().position(|k| *k == key) {
        return Some(Command::FrameButton(page * FUNCTION_KEYS.len() + i));
    }
    if let Some(i) = DIGIT_KEYS.iter().position(|k| *k == key) {
        return Some(Command::ToggleHitbox(page * DIGIT_KEYS.len() + i));
    }
    let step = if shift { 10 } else { 1 };
    let cmd = match (key, ctrl) {
        (Key::W, true) => Command::Nudge(0, -1),
        (Key::S, true) => Command::Nudge(0, 1),
        (Key::A, true) => Command::Nudge(-1, 0),
        (Key::D, true) => Command::Nudge(1, 0),
        (Key::A, false) => Command::SelectAll,
        (Key::D, false) => Command::DeselectAll,
        (Key::Space, _) => Command::TogglePlay,
        (Key::Left, _) => Command::Seek(-step),
        (Key::Right, _) => Command::Seek(step),
        (Key::PageUp, _) => Command::PrevScene,
        (Key::PageDown, _) => Command::NextScene,
        (Key::R, _) => Command::ResetOffset,
        (Key::L, _) => Command::StopLoop,
        (Key::H, _) => Command::ResetHistory,
        (Key::G, false) => Command::Prompt(EntryKind::Goto),
        (Key::K, false) => Command::Prompt(EntryKind::Loop),
        (Key::B, false) => Command::Prompt(EntryKind::Button),
        (Key::T, false) => Command::Prompt(EntryKind::Hitbox),
        (Key::I, _) => Command::ShowInfo,
        (Key::P, _) => Command::Snapshot,
        (Key::Escape, _) => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// What the number prompt is collecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Goto,
    Loop,
    /// 1-based, any frame button of the scene.
    Button,
    /// 1-based, any hitbox of the scene.
    Hitbox,
}

impl EntryKind {
    fn title(self) -> &'static str {
        match self {
            EntryKind::Goto => "GOTO FRAME",
            EntryKind::Loop => "LOOP START END",
            EntryKind::Button => "FRAME BUTTON #",
            EntryKind::Hitbox => "HITBOX #",
        }
    }
}

const ENTRY_MAX_LEN: usize = 32;

/// Text typed at the prompt. Enter turns it into a command, Esc drops it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberEntry {
    kind: EntryKind,
    text: String,
}

impl NumberEntry {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            text: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Digits, '-' and ' ' only; anything else is ignored.
    pub fn push(&mut self, ch: char) {
        let allowed = ch.is_ascii_digit() || ch == '-' || ch == ' ';
        if allowed && self.text.len() < ENTRY_MAX_LEN {
            self.text.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn prompt(&self) -> String {
        format!("{}: {}_  (ENTER ok, ESC cancel)", self.kind.title(), self.text)
    }

    pub fn finish(&self) -> ViewerResult<Command> {
        let numbers = self
            .text
            .split_whitespace()
            .map(|t| {
                t.parse::<i64>()
                    .map_err(|_| ViewerError::input(format!("'{t}' is not a number")))
            })
            .collect::<ViewerResult<Vec<i64>>>()?;
        match (self.kind, numbers.as_slice()) {
            (EntryKind::Goto, [frame]) => Ok(Command::Goto(*frame)),
            (EntryKind::Loop, [start, end]) => Ok(Command::ManualLoop(*start, *end)),
            (EntryKind::Button, [n]) => one_based(*n).map(Command::FrameButton),
            (EntryKind::Hitbox, [n]) => one_based(*n).map(Command::ToggleHitbox),
            (EntryKind::Loop, _) => Err(ViewerError::input("a loop needs START and END")),
            (kind, _) => Err(ViewerError::input(format!(
                "{} takes exactly one number",
                kind.title()
            ))),
        }
    }
}

fn one_based(n: i64) -> ViewerResult<usize> {
    usize::try_from(n)
        .ok()
        .and_then(|u| u.checked_sub(1))
        .ok_or_else(|| ViewerError::input(format!("numbers start at 1, got {n}")))
}

fn entry_char(key: Key) -> Option<char> {
    if let Some(i) = DIGIT_KEYS.iter().position(|k| *k == key) {
        return char::from_digit(((i + 1) % 10) as u32, 10);
    }
    if let Some(i) = NUMPAD_KEYS.iter().position(|k| *k == key) {
        return char::from_digit(i as u32, 10);
    }
    match key {
        Key::Minus | Key::NumPadMinus => Some('-'),
        Key::Space | Key::Comma => Some(' '),
        _ => None,
    }
}

/// Turns key presses into commands. While a prompt is open every key goes to it.
#[derive(Debug, Default)]
pub struct KeyInput {
    entry: Option<NumberEntry>,
}

impl KeyInput {
    pub fn entry(&self) -> Option<&NumberEntry> {
        self.entry.as_ref()
    }

    /// `repeat` is true for auto-repeat of a held key.
    pub fn press(
        &mut self,
        key: Key,
        shift: bool,
        ctrl: bool,
        repeat: bool,
    ) -> Option<ViewerResult<Command>> {
        if let Some(entry) = self.entry.as_mut() {
            match key {
                Key::Backspace => entry.backspace(),
                _ if repeat => {}
                Key::Enter | Key::NumPadEnter => {
                    let done = entry.finish();
                    self.entry = None;
                    return Some(done);
                }
                Key::Escape => self.entry = None,
                _ => {
                    if let Some(ch) = entry_char(key) {
                        entry.push(ch);
                    }
                }
            }
            return None;
        }
        match command_for(key, shift, ctrl)? {
            Command::Prompt(kind) if !repeat => {
                self.entry = Some(NumberEntry::new(kind));
                None
            }
            cmd if cmd.repeats() || !repeat => Some(Ok(cmd)),
            _ => None,
        }
    }
}

/// Status strip contents; `alert` replaces the second line in a warning color.
#[derive(Clone, Debug, Default)]
pub struct StatusText {
    pub summary: String,
    pub detail: String,
    pub alert: Option<String>,
}

/// Build the full window image: frame (or a notice), then the status strip.
pub fn compose_screen(
    frame: Option<&FrameBuffer>,
    frame_w: usize,
    frame_h: usize,
    status: &StatusText,
) -> FrameBuffer {
    let mut screen = FrameBuffer::filled(frame_w, frame_h + STATUS_HEIGHT, EMPTY_BG);

    match frame {
        Some(f) => {
            let cols = f.width.min(frame_w);
            for y in 0..f.height.min(frame_h) {
                let src = &f.pixels[y * f.width..y * f.width + cols];
                screen.pixels[y * frame_w..y * frame_w + cols].copy_from_slice(src);
            }
        }
        None => {
            let notice = "NO VIDEO LOADED";
            let (tw, th) = measure_text_5x7(notice, 3);
            let x = (frame_w as i32 - tw) / 2;
            let y = (frame_h as i32 - th) / 2;
            draw_text_5x7(&mut screen, x, y, notice, STATUS_TEXT, 3);
        }
    }

    let top = frame_h as i32;
    let right = frame_w as i32 - 1;
    fill_rect(&mut screen, 0, top, right, top + STATUS_HEIGHT as i32 - 1, STATUS_BG);
    draw_line(&mut screen, 0, top, right, top, STATUS_RULE);
    draw_text_5x7(&mut screen, 6, top + 4, &status.summary, STATUS_TEXT, 1);
    match &status.alert {
        Some(msg) => draw_text_5x7(&mut screen, 6, top + 15, msg, STATUS_ALERT, 1),
        None => draw_text_5x7(&mut screen, 6, top + 15, &status.detail, STATUS_TEXT, 1),
    }
    screen
}

pub struct ViewerWindow {
    window: Window,
    frame_h: usize,
    input: KeyInput,
}

impl ViewerWindow {
    /// Window sized for a `frame_w x frame_h` frame plus the status strip.
    pub fn new(title: &str, frame_w: usize, frame_h: usize) -> ViewerResult<Self> {
        let mut window = Window::new(
            title,
            frame_w,
            frame_h + STATUS_HEIGHT,
            WindowOptions::default(),
        )
        .map_err(|e| ViewerError::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self {
            window,
            frame_h,
            input: KeyInput::default(),
        })
    }

    pub fn present(&mut self, screen: &FrameBuffer) -> ViewerResult<()> {
        self.window
            .update_with_buffer(&screen.pixels, screen.width, screen.height)
            .map_err(|e| ViewerError::WindowUpdate(e.to_string()))
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Pointer over the frame area; `None` outside the window or over the strip.
    pub fn pointer(&self) -> Option<PointerSample> {
        let (x, y) = self.window.get_mouse_pos(MouseMode::Discard)?;
        let (x, y) = (x.floor() as i32, y.floor() as i32);
        if x < 0 || y < 0 || y as usize >= self.frame_h {
            return None;
        }
        Some(PointerSample::new(x, y))
    }

    /// Open prompt line, if any.
    pub fn entry_prompt(&self) -> Option<String> {
        self.input.entry().map(NumberEntry::prompt)
    }

    /// Commands for keys pressed since the last update. A prompt that does
    /// not parse comes back as an error.
    pub fn commands(&mut self) -> Vec<ViewerResult<Command>> {
        let shift = self.window.is_key_down(Key::LeftShift) || self.window.is_key_down(Key::RightShift);
        let ctrl = self.window.is_key_down(Key::LeftCtrl) || self.window.is_key_down(Key::RightCtrl);
        let fresh = self.window.get_keys_pressed(KeyRepeat::No);
        let keys = self.window.get_keys_pressed(KeyRepeat::Yes);
        keys.into_iter()
            .filter_map(|key| self.input.press(key, shift, ctrl, !fresh.contains(&key)))
            .collect()
    }
}
