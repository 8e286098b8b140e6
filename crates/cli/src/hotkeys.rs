//! Global hotkeys.
//!
//! Combinations use the `<ctrl>+<shift>+s` notation from the configuration.
//! A background thread runs `rdev::listen`, tracks modifier state and maps
//! matching presses to [`HotkeyEvent`]s for the pipeline.

use ai_glance_core::config::HotkeyBindings;
use ai_glance_core::{HotkeyEvent, OrchestratorHandle};
use anyhow::{Context, Result, anyhow, bail};
use rdev::{EventType, Key};
use std::fmt;
use std::str::FromStr;
use std::thread;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Updates the flag for `key`. Returns false if `key` is not a modifier.
    fn update(&mut self, key: Key, pressed: bool) -> bool {
        let flag = match key {
            Key::ControlLeft | Key::ControlRight => &mut self.ctrl,
            Key::ShiftLeft | Key::ShiftRight => &mut self.shift,
            Key::Alt | Key::AltGr => &mut self.alt,
            Key::MetaLeft | Key::MetaRight => &mut self.meta,
            _ => return false,
        };
        *flag = pressed;
        true
    }
}

/// One modifier set plus one trigger key.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCombo {
    modifiers: Modifiers,
    key: Key,
    label: String,
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        let names = [(m.ctrl, "Ctrl"), (m.shift, "Shift"), (m.alt, "Alt"), (m.meta, "Super")];
        for (on, name) in names {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&self.label)
    }
}

impl FromStr for KeyCombo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut modifiers = Modifiers::default();
        let mut trigger: Option<(Key, String)> = None;

        for token in s.split('+').map(|t| t.trim().to_ascii_lowercase()) {
            let bare = token.trim_start_matches('<').trim_end_matches('>');
            match bare {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                "cmd" | "super" | "meta" | "win" => modifiers.meta = true,
                "" => bail!("empty key in hotkey '{}'", s),
                name => {
                    if trigger.is_some() {
                        bail!("hotkey '{}' has more than one non-modifier key", s);
                    }
                    let key = key_from_name(name)
                        .ok_or_else(|| anyhow!("unknown key '{}' in hotkey '{}'", name, s))?;
                    trigger = Some((key, name.to_ascii_uppercase()));
                }
            }
        }

        let (key, label) = trigger.ok_or_else(|| anyhow!("hotkey '{}' has no trigger key", s))?;
        Ok(Self { modifiers, key, label })
    }
}

fn key_from_name(name: &str) -> Option<Key> {
    const LETTERS: [Key; 26] = [
        Key::KeyA, Key::KeyB, Key::KeyC, Key::KeyD, Key::KeyE, Key::KeyF, Key::KeyG,
        Key::KeyH, Key::KeyI, Key::KeyJ, Key::KeyK, Key::KeyL, Key::KeyM, Key::KeyN,
        Key::KeyO, Key::KeyP, Key::KeyQ, Key::KeyR, Key::KeyS, Key::KeyT, Key::KeyU,
        Key::KeyV, Key::KeyW, Key::KeyX, Key::KeyY, Key::KeyZ,
    ];
    const DIGITS: [Key; 10] = [
        Key::Num0, Key::Num1, Key::Num2, Key::Num3, Key::Num4,
        Key::Num5, Key::Num6, Key::Num7, Key::Num8, Key::Num9,
    ];
    const FUNCTION: [Key; 12] = [
        Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
        Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
    ];

    if let [c] = name.as_bytes() {
        return match c {
            b'a'..=b'z' => Some(LETTERS[(c - b'a') as usize]),
            b'0'..=b'9' => Some(DIGITS[(c - b'0') as usize]),
            _ => None,
        };
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        return (1..=12).contains(&n).then(|| FUNCTION[n - 1]);
    }

    match name {
        "space" => Some(Key::Space),
        "esc" | "escape" => Some(Key::Escape),
        "enter" | "return" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        _ => None,
    }
}

/// Maps raw key events to pipeline events.
pub struct HotkeyMatcher {
    bindings: Vec<(KeyCombo, HotkeyEvent)>,
    modifiers: Modifiers,
    /// Non-modifier keys currently down; repeats of these are ignored.
    held: Vec<Key>,
}

impl HotkeyMatcher {
    pub fn from_bindings(bindings: &HotkeyBindings) -> Result<Self> {
        let table = [
            (&bindings.scan, HotkeyEvent::ScanRequested),
            (&bindings.toggle, HotkeyEvent::ToggleOverlay),
            (&bindings.region, HotkeyEvent::RegionSelectRequested),
            (&bindings.reset, HotkeyEvent::ResetContext),
            (&bindings.quit, HotkeyEvent::QuitRequested),
        ];

        let mut parsed: Vec<(KeyCombo, HotkeyEvent)> = Vec::with_capacity(table.len());
        for (notation, event) in table {
            let combo: KeyCombo = notation
                .parse()
                .with_context(|| format!("Invalid binding for {}", event))?;
            if let Some((_, other)) = parsed.iter().find(|(c, _)| *c == combo) {
                bail!("{} is bound to both {} and {}", combo, other, event);
            }
            parsed.push((combo, event));
        }

        Ok(Self {
            bindings: parsed,
            modifiers: Modifiers::default(),
            held: Vec::new(),
        })
    }

    pub fn combo_for(&self, event: HotkeyEvent) -> Option<&KeyCombo> {
        self.bindings.iter().find(|(_, e)| *e == event).map(|(c, _)| c)
    }

    /// One line per binding, for the overlay footer.
    pub fn cheat_sheet(&self) -> String {
        self.bindings
            .iter()
            .map(|(combo, event)| format!("{} {}", combo, event))
            .collect::<Vec<_>>()
            .join("  ·  ")
    }

    pub fn handle(&mut self, event: &EventType) -> Option<HotkeyEvent> {
        match event {
            &EventType::KeyPress(key) => {
                if self.modifiers.update(key, true) || self.held.contains(&key) {
                    return None;
                }
                self.held.push(key);
                let modifiers = self.modifiers;
                self.bindings
                    .iter()
                    .find(|(combo, _)| combo.key == key && combo.modifiers == modifiers)
                    .map(|(_, hotkey)| *hotkey)
            }
            &EventType::KeyRelease(key) => {
                if !self.modifiers.update(key, false) {
                    self.held.retain(|k| *k != key);
                }
                None
            }
            _ => None,
        }
    }
}

/// Starts the global listener on its own thread.
pub fn spawn_listener(mut matcher: HotkeyMatcher, handle: OrchestratorHandle) -> Result<()> {
    thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                if let Some(hotkey) = matcher.handle(&event.event_type) {
                    log::debug!("hotkey: {}", hotkey);
                    handle.on_hotkey(hotkey);
                }
            });
            if let Err(e) = result {
                log::error!("global hotkey listener stopped: {:?}", e);
            }
        })
        .context("Failed to start hotkey listener")?;
    Ok(())
}
