//! Navigation Controller: which single screen is active.
//!
//! [`Navigator::select_screen`] is the only transition. Each successful
//! selection bumps an epoch and hands back a [`ScreenVisit`]; the caller
//! fires the screen's refresh exactly once with it, and completions check
//! [`Navigator::is_current`] before touching anything.

use std::fmt;

/// Every screen the console knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Screen {
    Dashboard,
    Demographics,
    Geography,
    Categories,
    Temporal,
    Search,
    Chat,
    Investigate,
}

impl Screen {
    pub const ALL: [Screen; 8] = [
        Screen::Dashboard,
        Screen::Demographics,
        Screen::Geography,
        Screen::Categories,
        Screen::Temporal,
        Screen::Search,
        Screen::Chat,
        Screen::Investigate,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Screen::Dashboard => "dashboard",
            Screen::Demographics => "demographics",
            Screen::Geography => "geography",
            Screen::Categories => "categories",
            Screen::Temporal => "temporal",
            Screen::Search => "search",
            Screen::Chat => "chat",
            Screen::Investigate => "investigate",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Dashboard => "Overview Dashboard",
            Screen::Demographics => "Demographic Analysis",
            Screen::Geography => "Geographic Analysis",
            Screen::Categories => "Complaint Categories",
            Screen::Temporal => "Temporal Analysis",
            Screen::Search => "Semantic Search",
            Screen::Chat => "AI Investigation Chat",
            Screen::Investigate => "Full Investigation Report",
        }
    }

    pub fn from_id(id: &str) -> Option<Screen> {
        let id = id.trim();
        Screen::ALL
            .into_iter()
            .find(|s| s.id().eq_ignore_ascii_case(id))
    }

    /// Whether selecting this screen fetches data from the backend.
    pub fn refreshes(self) -> bool {
        !matches!(self, Screen::Search | Screen::Chat | Screen::Investigate)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One activation of a screen. Refresh results carry it back so a response
/// that lands after the user navigated away can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenVisit {
    pub screen: Screen,
    pub epoch: u64,
}

#[derive(Debug)]
pub struct Navigator {
    active: Option<Screen>,
    epoch: u64,
    title: &'static str,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            active: None,
            epoch: 0,
            title: "Sentinel",
        }
    }

    /// Deactivate everything, then activate `screen_id`.
    ///
    /// Unknown ids leave no screen active and return `None`: no refresh, no
    /// title change.
    pub fn select_screen(&mut self, screen_id: &str) -> Option<ScreenVisit> {
        self.active = None;
        self.epoch += 1;

        let screen = Screen::from_id(screen_id)?;
        self.active = Some(screen);
        self.title = screen.title();
        Some(ScreenVisit {
            screen,
            epoch: self.epoch,
        })
    }

    pub fn active(&self) -> Option<Screen> {
        self.active
    }

    pub fn title(&self) -> &str {
        self.title
    }

    /// True while `visit` is still the screen on display.
    pub fn is_current(&self, visit: &ScreenVisit) -> bool {
        self.active == Some(visit.screen) && self.epoch == visit.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_ids_round_trip() {
        for screen in Screen::ALL {
            assert_eq!(Screen::from_id(screen.id()), Some(screen));
        }
        assert_eq!(Screen::from_id(" Geography "), Some(Screen::Geography));
        assert_eq!(Screen::from_id("settings"), None);
    }

    #[test]
    fn each_selection_activates_exactly_one_screen_and_one_refresh() {
        let mut nav = Navigator::new();
        let mut refreshes = Vec::new();

        for id in ["dashboard", "geography", "geography", "temporal", "chat"] {
            if let Some(visit) = nav.select_screen(id) {
                refreshes.push(visit);
            }
            let active: Vec<_> = Screen::ALL
                .into_iter()
                .filter(|s| nav.active() == Some(*s))
                .collect();
            assert_eq!(active.len(), 1);
        }

        assert_eq!(refreshes.len(), 5);
        // re-selecting the same screen is a new visit
        assert_ne!(refreshes[1].epoch, refreshes[2].epoch);
    }

    #[test]
    fn unknown_screen_is_tolerated() {
        let mut nav = Navigator::new();
        nav.select_screen("categories");
        assert_eq!(nav.title(), "Complaint Categories");

        assert_eq!(nav.select_screen("bogus"), None);
        assert_eq!(nav.active(), None);
        assert_eq!(nav.title(), "Complaint Categories");
    }

    #[test]
    fn leaving_a_screen_makes_its_visit_stale() {
        let mut nav = Navigator::new();
        let first = nav.select_screen("demographics").unwrap();
        assert!(nav.is_current(&first));

        nav.select_screen("geography");
        assert!(!nav.is_current(&first));

        let back = nav.select_screen("demographics").unwrap();
        assert!(!nav.is_current(&first));
        assert!(nav.is_current(&back));
    }
}
