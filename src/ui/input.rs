//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. While a login
//! attempt is pending, the form is non-interactive: every key except the
//! global quit is swallowed until the outcome arrives.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{
    can_add_email_char, can_add_password_char, App, AppState, LoginFocus, Screen, Section,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Logout confirmation takes priority over everything else
    if matches!(app.state, AppState::ConfirmingLogout) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.confirm_logout();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.cancel_logout();
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.screen {
        Screen::Login => handle_login_input(app, key),
        Screen::Dashboard => handle_dashboard_input(app, key),
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Inputs are disabled during the simulated round trip
    if app.login_pending {
        if key.code == KeyCode::Esc {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            let left = app.login_focus;
            app.login_focus = left.next();
            app.validate_on_blur(left);
        }
        KeyCode::Up | KeyCode::BackTab => {
            let left = app.login_focus;
            app.login_focus = left.prev();
            app.validate_on_blur(left);
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => {
                app.validate_on_blur(LoginFocus::Email);
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password => {
                app.validate_on_blur(LoginFocus::Password);
                app.login_focus = LoginFocus::Button;
            }
            LoginFocus::Remember => {
                app.login_focus = LoginFocus::Button;
            }
            LoginFocus::Button => {
                app.submit_login();
            }
        },
        KeyCode::Char(' ') if app.login_focus == LoginFocus::Remember => {
            app.login_remember = !app.login_remember;
        }
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
                app.clear_field_error(LoginFocus::Email);
            }
            LoginFocus::Password => {
                app.login_password.pop();
                app.clear_field_error(LoginFocus::Password);
            }
            _ => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.len(), c) {
                    app.login_email.push(c);
                    app.clear_field_error(LoginFocus::Email);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.len(), c) {
                    app.login_password.push(c);
                    app.clear_field_error(LoginFocus::Password);
                }
            }
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            // Quitting keeps the stored session; only logout erases it
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.request_logout();
        }
        KeyCode::Char('1') => app.section = Section::Overview,
        KeyCode::Char('2') => app.section = Section::Profile,
        KeyCode::Char('3') => app.section = Section::Settings,
        KeyCode::Char('4') => app.section = Section::Help,
        KeyCode::Right => app.section = app.section.next(),
        KeyCode::Left => app.section = app.section.prev(),
        _ => {}
    }

    // Any dashboard interaction re-checks the session so an expired
    // record bounces back to login instead of lingering on screen
    if app.screen == Screen::Dashboard && app.state == AppState::Normal {
        app.refresh_dashboard_session();
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{RoundTrip, SessionGate, SessionStore};
    use crate::config::Config;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};
    use tempfile::TempDir;

    fn test_app() -> (App, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();
        let gate = SessionGate::new(store).with_round_trip(RoundTrip::instant());
        (App::for_tests(Config::default(), gate), temp)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_typing_fills_focused_field() {
        let (mut app, _temp) = test_app();
        app.login_focus = LoginFocus::Email;

        for c in "a@b.co".chars() {
            handle_input(&mut app, press(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(app.login_email, "a@b.co");

        handle_input(&mut app, press(KeyCode::Tab)).unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);

        for c in "secret".chars() {
            handle_input(&mut app, press(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(app.login_password, "secret");
    }

    #[test]
    fn test_blur_validation_on_tab() {
        let (mut app, _temp) = test_app();
        app.login_email = "bogus".to_string();
        app.login_focus = LoginFocus::Email;

        handle_input(&mut app, press(KeyCode::Tab)).unwrap();
        assert!(app.email_error.is_some());

        // Typing clears the error again
        handle_input(&mut app, press(KeyCode::Backspace)).unwrap();
        assert!(app.email_error.is_none());
    }

    #[test]
    fn test_space_toggles_remember() {
        let (mut app, _temp) = test_app();
        app.login_focus = LoginFocus::Remember;

        handle_input(&mut app, press(KeyCode::Char(' '))).unwrap();
        assert!(app.login_remember);
        handle_input(&mut app, press(KeyCode::Char(' '))).unwrap();
        assert!(!app.login_remember);
    }

    #[test]
    fn test_keys_swallowed_while_pending() {
        let (mut app, _temp) = test_app();
        app.login_pending = true;
        app.login_focus = LoginFocus::Email;

        handle_input(&mut app, press(KeyCode::Char('x'))).unwrap();
        assert!(app.login_email.is_empty());

        handle_input(&mut app, press(KeyCode::Tab)).unwrap();
        assert_eq!(app.login_focus, LoginFocus::Email);
    }

    #[test]
    fn test_logout_confirmation_flow() {
        let (mut app, _temp) = test_app();
        app.screen = Screen::Dashboard;

        handle_input(&mut app, press(KeyCode::Char('l'))).unwrap();
        assert_eq!(app.state, AppState::ConfirmingLogout);

        // 'n' keeps the session and stays on the dashboard
        handle_input(&mut app, press(KeyCode::Char('n'))).unwrap();
        assert_eq!(app.state, AppState::Normal);
    }

    #[test]
    fn test_dashboard_section_keys() {
        // Park a session in the shared store so the post-input refresh
        // doesn't bounce us back to login
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();
        let record = crate::auth::SessionRecord::issue(crate::auth::UserInfo {
            email: "admin@test.com".to_string(),
            name: "Administrator".to_string(),
        });
        store.write(&record, crate::auth::Durability::Ephemeral).unwrap();

        let gate = SessionGate::new(store).with_round_trip(RoundTrip::instant());
        let mut app = App::for_tests(Config::default(), gate);
        app.screen = Screen::Dashboard;

        handle_input(&mut app, press(KeyCode::Char('3'))).unwrap();
        assert_eq!(app.section, Section::Settings);
        assert_eq!(app.screen, Screen::Dashboard);

        handle_input(&mut app, press(KeyCode::Right)).unwrap();
        assert_eq!(app.section, Section::Help);
    }
}
