use anyhow::Result;

use crate::commands::SessionHandle;
use crate::state::ShortcutSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    TogglePause,
    NextBlock,
    PreviousBlock,
    Stop,
    ToggleContrast,
    Quit,
}

impl HotkeyAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TogglePause => "pause/play",
            Self::NextBlock => "next block",
            Self::PreviousBlock => "previous block",
            Self::Stop => "stop",
            Self::ToggleContrast => "high contrast",
            Self::Quit => "quit",
        }
    }
}

/// Configured key bindings, matched case-insensitively
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(String, HotkeyAction)>,
}

impl Keymap {
    pub fn from_settings(shortcuts: &ShortcutSettings) -> Self {
        let bindings = [
            (&shortcuts.toggle_pause, HotkeyAction::TogglePause),
            (&shortcuts.next, HotkeyAction::NextBlock),
            (&shortcuts.previous, HotkeyAction::PreviousBlock),
            (&shortcuts.stop, HotkeyAction::Stop),
            (&shortcuts.toggle_contrast, HotkeyAction::ToggleContrast),
            (&shortcuts.quit, HotkeyAction::Quit),
        ]
        .into_iter()
        .filter_map(|(key, action)| {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                tracing::warn!("No key bound to {}", action.label());
                None
            } else {
                Some((key, action))
            }
        })
        .collect();
        Self { bindings }
    }

    pub fn action_for(&self, key: &str) -> Option<HotkeyAction> {
        let key = key.trim().to_lowercase();
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, action)| *action)
    }

    /// One-line summary such as `p pause/play | n next block | ...`
    pub fn help_line(&self) -> String {
        self.bindings
            .iter()
            .map(|(key, action)| format!("{} {}", key, action.label()))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

pub fn handle_hotkey(handle: &SessionHandle, action: HotkeyAction) -> Result<()> {
    tracing::debug!("Hotkey: {}", action.label());
    match action {
        HotkeyAction::TogglePause => handle.toggle_pause()?,
        HotkeyAction::NextBlock => handle.next_block()?,
        HotkeyAction::PreviousBlock => handle.previous_block()?,
        HotkeyAction::Stop => handle.stop()?,
        HotkeyAction::ToggleContrast => handle.toggle_contrast()?,
        HotkeyAction::Quit => handle.shutdown()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::SessionCommand;
    use tokio::sync::mpsc;

    #[test]
    fn keys_map_to_actions() {
        let mut shortcuts = ShortcutSettings::default();
        shortcuts.next = "J".to_string();
        shortcuts.toggle_contrast = "  ".to_string();
        let keymap = Keymap::from_settings(&shortcuts);

        assert_eq!(keymap.action_for(" j\n"), Some(HotkeyAction::NextBlock));
        assert_eq!(keymap.action_for("p"), Some(HotkeyAction::TogglePause));
        assert_eq!(keymap.action_for("c"), None);
        assert!(keymap.help_line().starts_with("p pause/play | j next block"));
    }

    #[test]
    fn hotkeys_enqueue_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx);
        handle_hotkey(&handle, HotkeyAction::PreviousBlock).unwrap();
        handle_hotkey(&handle, HotkeyAction::Quit).unwrap();

        assert!(matches!(rx.try_recv(), Ok(SessionCommand::Previous)));
        assert!(matches!(rx.try_recv(), Ok(SessionCommand::Shutdown)));

        drop(rx);
        assert!(handle_hotkey(&handle, HotkeyAction::Stop).is_err());
    }
}
