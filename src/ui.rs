// ═══════════════════════════════════════════════════════════════════════════════
//  UI Rendering
// ═══════════════════════════════════════════════════════════════════════════════

use client::{ArmingState, UsbDeviceType};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, ConfigField, Focus};

/// Colour set for one theme.
pub struct Palette {
    pub accent: Color,
    pub dim: Color,
    pub border: Color,
    pub bg: Color,
    pub bg_hl: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub ok: Color,
    pub warn: Color,
    pub err: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        accent: Color::Rgb(255, 200, 0),
        dim: Color::Rgb(160, 125, 0),
        border: Color::Rgb(90, 75, 20),
        bg: Color::Rgb(16, 16, 20),
        bg_hl: Color::Rgb(40, 36, 20),
        fg: Color::Rgb(225, 225, 215),
        fg_dim: Color::Rgb(130, 130, 120),
        ok: Color::Rgb(90, 220, 90),
        warn: Color::Rgb(255, 170, 40),
        err: Color::Rgb(255, 70, 50),
    };

    pub const LIGHT: Palette = Palette {
        accent: Color::Rgb(170, 95, 0),
        dim: Color::Rgb(150, 120, 60),
        border: Color::Rgb(190, 175, 140),
        bg: Color::Rgb(250, 248, 240),
        bg_hl: Color::Rgb(238, 228, 200),
        fg: Color::Rgb(30, 30, 30),
        fg_dim: Color::Rgb(110, 110, 100),
        ok: Color::Rgb(20, 130, 40),
        warn: Color::Rgb(190, 110, 0),
        err: Color::Rgb(190, 30, 20),
    };

    pub fn for_theme(dark: bool) -> &'static Palette {
        if dark { &Self::DARK } else { &Self::LIGHT }
    }
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let p = Palette::for_theme(app.dark);
    f.render_widget(Block::new().style(Style::new().bg(p.bg).fg(p.fg)), f.area());

    let [header, body, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(4),
    ])
    .areas(f.area());

    let [editor, config] =
        Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(body);

    draw_header(f, header, app, p);
    draw_editor(f, editor, app, p);
    draw_config(f, config, app, p);
    draw_status(f, status, app, p);
}

// ─── Header ─────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App, p: &Palette) {
    let block = Block::bordered()
        .border_type(BorderType::Double)
        .border_style(Style::new().fg(p.accent));

    let line = Line::from(vec![
        Span::styled(" DUCKY PANEL ", Style::new().fg(p.accent).bold()),
        Span::styled("│ ", Style::new().fg(p.dim)),
        Span::styled(app.device_url.clone(), Style::new().fg(p.fg)),
        Span::styled(
            if app.dark { "   ☾ dark" } else { "   ☀ light" },
            Style::new().fg(p.fg_dim),
        ),
    ]);

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center).block(block), area);
}

// ─── Script Editor ──────────────────────────────────────────────────────────

fn focus_border(app: &App, focus: Focus, p: &Palette) -> Style {
    if app.focus == focus {
        Style::new().fg(p.accent)
    } else {
        Style::new().fg(p.border)
    }
}

fn draw_editor(f: &mut Frame, area: Rect, app: &mut App, p: &Palette) {
    let title = if app.editor.is_dirty() {
        " Script ● unsaved "
    } else {
        " Script "
    };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(focus_border(app, Focus::Script, p))
        .title(Span::styled(title, Style::new().fg(p.accent).bold()));

    let inner = block.inner(area);
    let gutter = 4u16;
    let height = inner.height as usize;
    let top = app.editor.scroll_for(height);
    let (row, col) = app.editor.cursor();

    let lines: Vec<Line> = app
        .editor
        .lines()
        .iter()
        .enumerate()
        .skip(top)
        .take(height)
        .map(|(i, text)| {
            let number_style = if i == row {
                Style::new().fg(p.accent)
            } else {
                Style::new().fg(p.fg_dim)
            };
            Line::from(vec![
                Span::styled(format!("{:>3} ", i + 1), number_style),
                Span::styled(text.clone(), Style::new().fg(p.fg)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);

    if app.focus == Focus::Script {
        if let Some(position) = cursor_position(inner, gutter, row, col, top) {
            f.set_cursor_position(position);
        }
    }
}

/// Screen cell for the editor cursor, or `None` when it falls outside `inner`.
fn cursor_position(inner: Rect, gutter: u16, row: usize, col: usize, top: usize) -> Option<(u16, u16)> {
    let col = u16::try_from(col).ok()?;
    let line = u16::try_from(row.checked_sub(top)?).ok()?;
    let x = inner.x.checked_add(gutter)?.checked_add(col)?;
    let y = inner.y.checked_add(line)?;
    (x < inner.right() && y < inner.bottom()).then_some((x, y))
}

// ─── Device Config ──────────────────────────────────────────────────────────

fn draw_config(f: &mut Frame, area: Rect, app: &App, p: &Palette) {
    let title = if app.config_dirty {
        " Device Config ● unsaved "
    } else {
        " Device Config "
    };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(focus_border(app, Focus::Config, p))
        .title(Span::styled(title, Style::new().fg(p.accent).bold()));

    let selected = |field: ConfigField| app.focus == Focus::Config && app.config_sel == field;

    let mut lines = vec![Line::default()];
    lines.extend(selector_lines(
        "Arming state",
        &app.arming_state.to_string(),
        arming_hint(app.arming_state),
        selected(ConfigField::Arming),
        p,
    ));
    lines.push(Line::default());
    lines.extend(selector_lines(
        "USB device",
        &app.usb_device_type.to_string(),
        usb_hint(app.usb_device_type),
        selected(ConfigField::Usb),
        p,
    ));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "  ↑↓ Field  ←→ Change  Ctrl+G Save",
        Style::new().fg(p.dim),
    )));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn selector_lines(label: &str, value: &str, hint: &str, selected: bool, p: &Palette) -> Vec<Line<'static>> {
    let (marker, value_style) = if selected {
        ("▶ ", Style::new().fg(p.accent).bg(p.bg_hl).bold())
    } else {
        ("  ", Style::new().fg(p.fg))
    };
    vec![
        Line::from(vec![
            Span::styled(marker, Style::new().fg(p.accent)),
            Span::styled(format!("{label}: "), Style::new().fg(p.fg_dim)),
            Span::styled(format!("◀ {value} ▶"), value_style),
        ]),
        Line::from(Span::styled(format!("    {hint}"), Style::new().fg(p.fg_dim).italic())),
    ]
}

fn arming_hint(state: ArmingState) -> &'static str {
    match state {
        ArmingState::Unarmed => "Stored script is not run at boot",
        ArmingState::SingleRun => "Run stored script at next boot, then disarm",
        ArmingState::Persistent => "Run stored script at every boot",
    }
}

fn usb_hint(kind: UsbDeviceType) -> &'static str {
    match kind {
        UsbDeviceType::SerialJtag => "Debug console only, no keystrokes",
        UsbDeviceType::Hid => "Enumerates as a keyboard",
        UsbDeviceType::Msd => "Mass storage (firmware falls back to JTAG)",
        UsbDeviceType::HidMsd => "Keyboard plus mass storage",
    }
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App, p: &Palette) {
    let focus_span = match app.focus {
        Focus::Script => Span::styled(" SCRIPT ", Style::new().fg(p.bg).bg(p.accent).bold()),
        Focus::Config => Span::styled(" CONFIG ", Style::new().fg(p.bg).bg(p.warn).bold()),
    };

    let sc = if app.err {
        p.err
    } else if app.status.contains('✓') {
        p.ok
    } else {
        p.fg_dim
    };

    let help = " Tab Focus │ Ctrl+R Run │ Ctrl+S Save │ Ctrl+L Load │ Ctrl+G Save config │ Ctrl+T Theme │ Esc Quit ";

    let lines = vec![
        Line::from(vec![
            focus_span,
            Span::raw(" "),
            Span::styled(app.status.clone(), Style::new().fg(sc)),
        ]),
        Line::from(Span::styled(help, Style::new().fg(p.fg_dim))),
    ];

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(p.border));

    f.render_widget(Paragraph::new(lines).block(block), area);
}
