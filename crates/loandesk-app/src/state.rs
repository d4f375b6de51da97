// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, TabKind};

pub const SESSION_EXPIRED: &str = "session expired -- log in again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: TabKind,
    pub show_dashboard: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: TabKind::Dashboard,
            show_dashboard: true,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    OpenSearch,
    OpenForm(FormKind),
    OpenConfirm,
    OpenDetail,
    OpenStatusPicker,
    Back,
    ExitToNav,
    RequireLogin,
    LoggedIn,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(TabKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(show_dashboard: bool) -> Self {
        Self {
            active_tab: if show_dashboard {
                TabKind::Dashboard
            } else {
                TabKind::Applications
            },
            show_dashboard,
            ..Self::default()
        }
    }

    pub fn visible_tabs(&self) -> Vec<TabKind> {
        TabKind::ALL
            .into_iter()
            .filter(|tab| self.show_dashboard || *tab != TabKind::Dashboard)
            .collect()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::OpenSearch => self.enter(AppMode::Search),
            AppCommand::OpenForm(kind) => self.enter(AppMode::Form(kind)),
            AppCommand::OpenConfirm => self.enter(AppMode::Confirm),
            AppCommand::OpenDetail => self.enter(AppMode::Detail),
            AppCommand::OpenStatusPicker => {
                if self.mode != AppMode::Detail || self.active_tab != TabKind::Applications {
                    return vec![self.set_status("open an application first")];
                }
                self.enter(AppMode::StatusPicker)
            }
            AppCommand::Back => {
                let target = match self.mode {
                    AppMode::StatusPicker => AppMode::Detail,
                    AppMode::Login => AppMode::Login,
                    _ => AppMode::Nav,
                };
                self.enter(target)
            }
            AppCommand::ExitToNav => {
                if self.mode == AppMode::Login {
                    return Vec::new();
                }
                self.enter(AppMode::Nav)
            }
            AppCommand::RequireLogin => {
                self.mode = AppMode::Login;
                vec![
                    AppEvent::ModeChanged(self.mode),
                    self.set_status(SESSION_EXPIRED),
                ]
            }
            AppCommand::LoggedIn => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode), self.set_status("logged in")]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn enter(&mut self, mode: AppMode) -> Vec<AppEvent> {
        if self.mode == mode {
            return Vec::new();
        }
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.mode != AppMode::Nav {
            return Vec::new();
        }
        let tabs = self.visible_tabs();
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![AppEvent::TabChanged(self.active_tab)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState, SESSION_EXPIRED};
    use crate::{AppMode, FormKind, TabKind};

    #[test]
    fn tab_rotation_wraps() {
        let mut state = AppState {
            active_tab: TabKind::Customers,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, TabKind::Dashboard);
        assert_eq!(events, vec![AppEvent::TabChanged(TabKind::Dashboard)]);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, TabKind::Customers);
    }

    #[test]
    fn hidden_dashboard_is_skipped() {
        let mut state = AppState::new(false);
        assert_eq!(state.active_tab, TabKind::Applications);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, TabKind::Customers);
        state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, TabKind::Applications);
    }

    #[test]
    fn tabs_do_not_move_outside_nav() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenSearch);
        assert!(state.dispatch(AppCommand::NextTab).is_empty());
        assert_eq!(state.active_tab, TabKind::Dashboard);
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::OpenForm(FormKind::LoanType));
        assert_eq!(state.mode, AppMode::Form(FormKind::LoanType));

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn status_picker_needs_application_detail() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::OpenStatusPicker);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("open an application first".to_owned())]
        );

        state.active_tab = TabKind::Applications;
        state.dispatch(AppCommand::OpenDetail);
        state.dispatch(AppCommand::OpenStatusPicker);
        assert_eq!(state.mode, AppMode::StatusPicker);

        state.dispatch(AppCommand::Back);
        assert_eq!(state.mode, AppMode::Detail);
        state.dispatch(AppCommand::Back);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn require_login_switches_view_and_reports_expiry() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenDetail);

        let events = state.dispatch(AppCommand::RequireLogin);
        assert_eq!(state.mode, AppMode::Login);
        assert_eq!(
            events,
            vec![
                AppEvent::ModeChanged(AppMode::Login),
                AppEvent::StatusUpdated(SESSION_EXPIRED.to_owned()),
            ]
        );

        assert!(state.dispatch(AppCommand::ExitToNav).is_empty());
        assert_eq!(state.mode, AppMode::Login);

        state.dispatch(AppCommand::LoggedIn);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(state.status_line.as_deref(), Some("logged in"));
    }
}
