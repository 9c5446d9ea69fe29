use crate::config::ListConfig;
use crate::item::ListKind;
use crate::manager::ListManager;

/// Which list is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListTab {
    #[default]
    History,
    QuickTexts,
}

/// Owns both lists and knows which one is active.
///
/// Keyboard navigation and other modules borrow the active list from here
/// instead of reaching for a shared global.
#[derive(Debug)]
pub struct ListRegistry {
    history: ListManager,
    quick_texts: ListManager,
    active: ListTab,
}

impl ListRegistry {
    pub fn new(config: ListConfig, group_order: Vec<String>) -> Self {
        Self {
            history: ListManager::new(ListKind::History, config),
            quick_texts: ListManager::new(ListKind::QuickTexts { group_order }, config),
            active: ListTab::History,
        }
    }

    #[inline]
    pub const fn active_tab(&self) -> ListTab {
        self.active
    }

    pub const fn get(&self, tab: ListTab) -> &ListManager {
        match tab {
            ListTab::History => &self.history,
            ListTab::QuickTexts => &self.quick_texts,
        }
    }

    pub const fn get_mut(&mut self, tab: ListTab) -> &mut ListManager {
        match tab {
            ListTab::History => &mut self.history,
            ListTab::QuickTexts => &mut self.quick_texts,
        }
    }

    pub const fn active(&self) -> &ListManager {
        self.get(self.active)
    }

    pub const fn active_mut(&mut self) -> &mut ListManager {
        self.get_mut(self.active)
    }

    /// Activates `tab`. The newly shown list starts from the top.
    pub fn switch_tab(&mut self, tab: ListTab) -> bool {
        if tab == self.active {
            return false;
        }
        tracing::debug!(from = ?self.active, to = ?tab, "tab switched");
        self.active = tab;
        self.active_mut().tab_switched();
        true
    }
}
