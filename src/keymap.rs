use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::ListAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    #[default]
    Default,
    Vim,
    Arrows,
}

#[derive(Clone, Copy, Debug)]
pub struct ListKeyBindings {
    profile: KeymapProfile,
}

impl Default for ListKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl ListKeyBindings {
    pub const fn new() -> Self {
        Self {
            profile: KeymapProfile::Default,
        }
    }

    pub const fn with_profile(profile: KeymapProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    pub const fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
    }

    pub fn resolve<C>(&self, key: KeyEvent) -> Option<ListAction<C>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            // Ctrl+1..9 pastes the n-th visible entry.
            if let KeyCode::Char(c @ '1'..='9') = key.code {
                return c
                    .to_digit(10)
                    .and_then(|n| u8::try_from(n).ok())
                    .map(ListAction::ExecuteShortcut);
            }
            return None;
        }

        let nav_action = match self.profile {
            KeymapProfile::Default => Self::resolve_default_nav(key),
            KeymapProfile::Vim => Self::resolve_vim_nav(key),
            KeymapProfile::Arrows => Self::resolve_arrow_nav(key),
        };
        if nav_action.is_some() {
            return nav_action;
        }

        Self::resolve_common(key)
    }

    pub fn resolve_with<C, F>(&self, key: KeyEvent, custom: F) -> Option<ListAction<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        if let Some(action) = custom(key) {
            return Some(ListAction::Custom(action));
        }

        self.resolve(key)
    }

    const fn resolve_default_nav<C>(key: KeyEvent) -> Option<ListAction<C>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(ListAction::SelectPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(ListAction::SelectNext),
            _ => None,
        }
    }

    const fn resolve_vim_nav<C>(key: KeyEvent) -> Option<ListAction<C>> {
        match key.code {
            KeyCode::Char('k') => Some(ListAction::SelectPrev),
            KeyCode::Char('j') => Some(ListAction::SelectNext),
            KeyCode::Char('g') => Some(ListAction::SelectFirst),
            KeyCode::Char('G') => Some(ListAction::SelectLast),
            _ => None,
        }
    }

    const fn resolve_arrow_nav<C>(key: KeyEvent) -> Option<ListAction<C>> {
        match key.code {
            KeyCode::Up => Some(ListAction::SelectPrev),
            KeyCode::Down => Some(ListAction::SelectNext),
            _ => None,
        }
    }

    const fn resolve_common<C>(key: KeyEvent) -> Option<ListAction<C>> {
        match key.code {
            KeyCode::Enter => Some(ListAction::Execute),
            KeyCode::Delete => Some(ListAction::Delete),
            KeyCode::Tab => Some(ListAction::CycleTypeFilter),
            KeyCode::Home => Some(ListAction::SelectFirst),
            KeyCode::End => Some(ListAction::SelectLast),
            KeyCode::PageUp => Some(ListAction::PageUp),
            KeyCode::PageDown => Some(ListAction::PageDown),
            _ => None,
        }
    }
}
