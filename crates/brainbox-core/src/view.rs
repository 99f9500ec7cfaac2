//! Client UI state: sidebar, overlay, theme and dashboard visibility.
//!
//! Transitions are pure functions on [`ViewState`]; [`ViewState::render`]
//! derives what each element should look like.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Unknown names fall back to dark.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("light") {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Glyph shown on the theme toggle.
    pub fn glyph(self) -> &'static str {
        match self {
            Theme::Dark => "🌙",
            Theme::Light => "☀️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub sidebar_open: bool,
    pub overlay_visible: bool,
    pub theme: Theme,
    pub dashboard_open: bool,
}

/// Rendered classes per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub body_classes: Vec<&'static str>,
    pub sidebar_classes: Vec<&'static str>,
    pub overlay_classes: Vec<&'static str>,
    pub dashboard_classes: Vec<&'static str>,
    pub theme_toggle: &'static str,
}

impl ViewState {
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn open_sidebar(self) -> Self {
        Self {
            sidebar_open: true,
            overlay_visible: true,
            ..self
        }
    }

    pub fn close_sidebar(self) -> Self {
        Self {
            sidebar_open: false,
            overlay_visible: false,
            ..self
        }
    }

    pub fn toggle_sidebar(self) -> Self {
        if self.sidebar_open {
            self.close_sidebar()
        } else {
            self.open_sidebar()
        }
    }

    /// Clicking the overlay dismisses the sidebar.
    pub fn overlay_clicked(self) -> Self {
        self.close_sidebar()
    }

    pub fn toggle_theme(self) -> Self {
        Self {
            theme: self.theme.toggled(),
            ..self
        }
    }

    pub fn open_dashboard(self) -> Self {
        Self {
            dashboard_open: true,
            ..self
        }
    }

    pub fn close_dashboard(self) -> Self {
        Self {
            dashboard_open: false,
            ..self
        }
    }

    /// State after a session reset. The theme survives.
    pub fn reset(self) -> Self {
        Self::with_theme(self.theme)
    }

    pub fn render(&self) -> ViewModel {
        let shown = |on: bool| if on { vec!["show"] } else { Vec::new() };
        ViewModel {
            body_classes: match self.theme {
                Theme::Light => vec!["light"],
                Theme::Dark => Vec::new(),
            },
            sidebar_classes: shown(self.sidebar_open),
            overlay_classes: shown(self.overlay_visible),
            dashboard_classes: if self.dashboard_open {
                Vec::new()
            } else {
                vec!["hidden"]
            },
            theme_toggle: self.theme.glyph(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidebar_and_overlay_move_together() {
        let state = ViewState::default().open_sidebar();
        assert!(state.sidebar_open);
        assert!(state.overlay_visible);

        let state = state.overlay_clicked();
        assert!(!state.sidebar_open);
        assert!(!state.overlay_visible);

        let state = state.toggle_sidebar().toggle_sidebar();
        assert_eq!(state, ViewState::default());
    }

    #[test]
    fn test_theme_toggle_renders_glyph_and_body_class() {
        let state = ViewState::default();
        assert_eq!(state.render().theme_toggle, "🌙");
        assert!(state.render().body_classes.is_empty());

        let state = state.toggle_theme();
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.render().theme_toggle, "☀️");
        assert_eq!(state.render().body_classes, vec!["light"]);

        assert_eq!(state.toggle_theme().theme, Theme::Dark);
    }

    #[test]
    fn test_dashboard_hidden_by_default() {
        let state = ViewState::default();
        assert_eq!(state.render().dashboard_classes, vec!["hidden"]);
        let state = state.open_dashboard();
        assert!(state.render().dashboard_classes.is_empty());
        assert!(!state.close_dashboard().dashboard_open);
    }

    #[test]
    fn test_reset_keeps_theme() {
        let state = ViewState::with_theme(Theme::Light)
            .open_sidebar()
            .open_dashboard()
            .reset();
        assert_eq!(state, ViewState::with_theme(Theme::Light));
    }

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("LIGHT"), Theme::Light);
        assert_eq!(Theme::from_name("dark"), Theme::Dark);
        assert_eq!(Theme::from_name("system"), Theme::Dark);
    }
}
