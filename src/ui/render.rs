use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, LoginFocus, NoticeKind, Screen, Section};

use super::styles;

/// Visible width of the email/password input boxes
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::Login => render_login_screen(frame, app),
        Screen::Dashboard => render_dashboard(frame, app),
    }

    if matches!(app.state, AppState::ConfirmingLogout) {
        render_logout_overlay(frame);
    }
}

// ============================================================================
// Login screen
// ============================================================================

fn render_login_screen(frame: &mut Frame, app: &App) {
    let mut height = 15;
    if app.email_error.is_some() {
        height += 1;
    }
    if app.password_error.is_some() {
        height += 1;
    }
    if app.notice.is_some() {
        height += 2;
    }
    let area = centered_rect_fixed(46, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![];

    // ASCII art logo (centered for 46-width box)
    lines.push(Line::from(Span::styled(
        "          ╦  ╔═╗╔╦╗╔═╗╦ ╦╦╔═╔═╗╦ ╦",
        styles::title_style(),
    )));
    lines.push(Line::from(Span::styled(
        "          ║  ╠═╣ ║ ║  ╠═╣╠╩╗║╣ ╚╦╝",
        styles::title_style(),
    )));
    lines.push(Line::from(Span::styled(
        "          ╩═╝╩ ╩ ╩ ╚═╝╩ ╩╩ ╩╚═╝ ╩",
        styles::title_style(),
    )));
    lines.push(Line::from(Span::styled(
        "                demo sign-in",
        styles::muted_style(),
    )));
    lines.push(Line::from(""));

    // Email field
    let email_focused = app.login_focus == LoginFocus::Email && !app.login_pending;
    lines.push(input_line(
        "Email:    ",
        &tail(&app.login_email, FIELD_WIDTH),
        email_focused,
        app.login_pending,
    ));
    if let Some(error) = app.email_error {
        lines.push(Line::from(Span::styled(
            format!("            {}", error),
            styles::error_style(),
        )));
    }

    // Password field (masked)
    let password_focused = app.login_focus == LoginFocus::Password && !app.login_pending;
    let masked = "*".repeat(app.login_password.chars().count().min(FIELD_WIDTH));
    lines.push(input_line("Password: ", &masked, password_focused, app.login_pending));
    if let Some(error) = app.password_error {
        lines.push(Line::from(Span::styled(
            format!("            {}", error),
            styles::error_style(),
        )));
    }

    // Remember me toggle
    let remember_focused = app.login_focus == LoginFocus::Remember && !app.login_pending;
    let mark = if app.login_remember { "x" } else { " " };
    let remember_style = if remember_focused {
        styles::selected_style()
    } else if app.login_pending {
        styles::muted_style()
    } else {
        styles::field_style()
    };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("[{}] Remember me", mark), remember_style),
    ]));

    // Submit button
    lines.push(Line::from(""));
    let button_focused = app.login_focus == LoginFocus::Button && !app.login_pending;
    let button_style = if button_focused {
        styles::selected_style()
    } else if app.login_pending {
        styles::muted_style()
    } else {
        styles::field_style()
    };
    let button_label = if app.login_pending {
        " Signing in...  "
    } else if button_focused {
        " ▶ Sign In ◀    "
    } else {
        "   Sign In      "
    };
    lines.push(Line::from(vec![
        Span::raw("             ["),
        Span::styled(button_label, button_style),
        Span::raw("]"),
    ]));

    // Notification line
    if let Some(ref notice) = app.notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", notice.text),
            notice_style(notice.kind),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "     Tab next field · Enter submit · Esc quit",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn input_line(label: &str, value: &str, focused: bool, pending: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else if pending {
        styles::muted_style()
    } else {
        styles::field_style()
    };
    let cursor = if focused { "▌" } else { "" };
    let display = format!("{:<width$}", format!("{}{}", value, cursor), width = FIELD_WIDTH);
    Line::from(vec![
        Span::raw("  "),
        Span::styled(label.to_string(), styles::muted_style()),
        Span::styled("[", styles::muted_style()),
        Span::styled(display, style),
        Span::styled("]", styles::muted_style()),
    ])
}

/// Last `max` characters of a field, so long input stays visible.
fn tail(value: &str, max: usize) -> String {
    let count = value.chars().count();
    if count <= max {
        value.to_string()
    } else {
        value.chars().skip(count - max).collect()
    }
}

fn notice_style(kind: NoticeKind) -> Style {
    match kind {
        NoticeKind::Success => styles::success_style(),
        NoticeKind::Error => styles::error_style(),
        NoticeKind::Info => styles::highlight_style(),
    }
}

// ============================================================================
// Dashboard screen
// ============================================================================

fn render_dashboard(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Section tabs
            Constraint::Min(8),    // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_sections(frame, app, chunks[1]);
    render_section_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Latchkey";
    let user_text = match app.current_user {
        Some(ref user) => format!("{} <{}>  ", user.name, user.email),
        None => String::new(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + user_text.len()),
        )),
        Span::styled(user_text, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_sections(frame: &mut Frame, app: &App, area: Rect) {
    let sections = [
        ("[1] Overview", Section::Overview),
        ("[2] Profile", Section::Profile),
        ("[3] Settings", Section::Settings),
        ("[4] Help", Section::Help),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, section)) in sections.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(
            *label,
            styles::section_style(app.section == *section),
        ));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_section_content(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref user) = app.current_user else {
        return;
    };

    let lines = match app.section {
        Section::Overview => {
            let login_time = app
                .login_time
                .map(|t| t.format("%B %e, %Y %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let last_access = app
                .last_access
                .map(|t| t.format("%B %e, %Y %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            vec![
                Line::from(""),
                Line::from(vec![
                    Span::raw("  Welcome back, "),
                    Span::styled(user.name.clone(), styles::highlight_style()),
                    Span::raw("!"),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Signed in:   ", styles::muted_style()),
                    Span::raw(login_time),
                ]),
                Line::from(vec![
                    Span::styled("  Last access: ", styles::muted_style()),
                    Span::raw(last_access),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  This is a demo shell. Nothing here talks to a real backend.",
                    styles::muted_style(),
                )),
            ]
        }
        Section::Profile => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Name:  ", styles::muted_style()),
                Span::raw(user.name.clone()),
            ]),
            Line::from(vec![
                Span::styled("  Email: ", styles::muted_style()),
                Span::raw(user.email.clone()),
            ]),
        ],
        Section::Settings => {
            let remembered = app
                .config
                .last_email
                .clone()
                .unwrap_or_else(|| "none".to_string());
            vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Remembered email:  ", styles::muted_style()),
                    Span::raw(remembered),
                ]),
                Line::from(vec![
                    Span::styled("  Session lifetime:  ", styles::muted_style()),
                    Span::raw("24 hours"),
                ]),
            ]
        }
        Section::Help => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  1-4     ", styles::help_key_style()),
                Span::styled("Switch sections", styles::help_desc_style()),
            ]),
            Line::from(vec![
                Span::styled("  ←/→     ", styles::help_key_style()),
                Span::styled("Prev/next section", styles::help_desc_style()),
            ]),
            Line::from(vec![
                Span::styled("  l       ", styles::help_key_style()),
                Span::styled("Sign out", styles::help_desc_style()),
            ]),
            Line::from(vec![
                Span::styled("  q       ", styles::help_key_style()),
                Span::styled("Quit (session is kept)", styles::help_desc_style()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "  Demo accounts: admin@test.com / admin123",
                styles::muted_style(),
            )),
        ],
    };

    let block = Block::default()
        .borders(Borders::NONE)
        .title(Span::styled(
            format!(" {} ", app.section.title()),
            styles::highlight_style(),
        ));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(ref notice) = app.notice {
        format!(" {} ", notice.text)
    } else {
        match app.current_user {
            Some(ref user) => format!(" Signed in as {} ", user.email),
            None => String::new(),
        }
    };
    let right_text = " [l]ogout | [q]uit ";

    let padding = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);

    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

// ============================================================================
// Overlays
// ============================================================================

fn render_logout_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 7, frame.area());

    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "        Sign out of Latchkey?",
            styles::field_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("        "),
            Span::styled("[y]", styles::help_key_style()),
            Span::raw(" sign out   "),
            Span::styled("[n]", styles::help_key_style()),
            Span::raw(" stay"),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
