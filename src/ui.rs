use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{
    App, CHECKIN_REWARD_BH, DURATION_COST, ENERGY_COST, ENERGY_PACK, ENERGY_RATE, HASH_RATE_COST,
    Tab,
};
use crate::engine::BlockStatus;
use crate::notify::{Notification, NotificationKind};
use crate::price::CHECKIN_COST_USD;
use crate::timefmt::{format_clock, format_eth, format_wait, shorten_address};

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(5),
        ])
        .split(f.size());

    draw_header(f, chunks[0], app);
    draw_status_cards(f, chunks[1], app);
    draw_entry_line(f, chunks[2], app);
    draw_tab_bar(f, chunks[3], app);
    match app.tab {
        Tab::Mining => draw_mining_tab(f, chunks[4], app),
        Tab::Intervals => draw_intervals_tab(f, chunks[4], app),
    }
    draw_footer(f, chunks[5], app);

    if app.show_notifications {
        draw_notifications(f, app);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(
            " BASEHASH ",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let unread = app.notifications.unread();
    let bell = if unread > 0 {
        Span::styled(
            format!("🔔 {}", unread),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("🔔", Style::default().fg(Color::DarkGray))
    };

    let mut spans = vec![bell, Span::raw("  |  ")];
    if let Some(address) = app.wallet.address() {
        spans.push(Span::styled(
            shorten_address(address),
            Style::default().fg(Color::LightCyan),
        ));
        if let Some(eth) = app.wallet.balance_eth() {
            spans.push(Span::styled(
                format!("  {:.4} ETH", eth),
                Style::default().fg(Color::LightGreen),
            ));
        }
        spans.push(Span::styled(
            "  [C] disconnect",
            Style::default().fg(Color::Gray),
        ));
    } else {
        spans.push(Span::styled(
            "wallet disconnected  [C] connect",
            Style::default().fg(Color::Gray),
        ));
    }
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("block #{}", app.block.height),
        Style::default().fg(Color::White),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Left);
    f.render_widget(paragraph, inner);
}

fn draw_status_cards(f: &mut Frame<'_>, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(28),
            Constraint::Percentage(44),
        ])
        .split(area);

    draw_balance_card(f, columns[0], app);
    draw_energy_card(f, columns[1], app);
    draw_checkin_card(f, columns[2], app);
}

fn draw_balance_card(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title("Balance")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let lines = vec![
        Line::from(Span::styled(
            format!("{} BH", app.balance),
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            shorten_address(&app.user_id),
            Style::default().fg(Color::Gray),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_energy_card(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title("Energy")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let color = if app.energy <= app.max_energy / 5 {
        Color::LightRed
    } else if app.energy <= app.max_energy / 2 {
        Color::Yellow
    } else {
        Color::LightGreen
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("{} / {}", app.energy, app.max_energy),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("-{}/sec while mining", ENERGY_RATE),
            Style::default().fg(Color::Gray),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_checkin_card(f: &mut Frame<'_>, area: Rect, app: &App) {
    let border = if app.can_checkin {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .title("📅 Daily Check-in")
        .borders(Borders::ALL)
        .border_style(border);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let cost = match app.checkin_cost() {
        Some(cost) => format!("≈ {} (${})", format_eth(cost), CHECKIN_COST_USD),
        None => "⏳ Getting price...".to_string(),
    };
    let top = Line::from(vec![
        Span::styled(
            format!("+{} BH", CHECKIN_REWARD_BH),
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(cost, Style::default().fg(Color::Gray)),
    ]);

    let status = if app.can_checkin {
        Span::styled("✅ Available [D]", Style::default().fg(Color::LightGreen))
    } else {
        Span::styled(
            format!("⏳ {}", format_wait(app.checkin_wait_ms)),
            Style::default().fg(Color::Yellow),
        )
    };
    let mut bottom = vec![status];
    if let Some(price) = app.eth_price {
        bottom.push(Span::styled(
            format!("  ETH ${:.2}", price),
            Style::default().fg(Color::Gray),
        ));
    }

    let paragraph = Paragraph::new(vec![top, Line::from(bottom)]).wrap(Wrap { trim: true });
    f.render_widget(paragraph, inner);
}

fn draw_entry_line(f: &mut Frame<'_>, area: Rect, app: &App) {
    let gate = if app.can_mine {
        Span::styled("✅ Can mine", Style::default().fg(Color::LightGreen))
    } else {
        Span::styled(
            format!("⏳ Next entry in {}", format_wait(app.mining_wait_ms)),
            Style::default().fg(Color::Yellow),
        )
    };
    let line = Line::from(vec![
        Span::styled("Entry every ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}h", app.current_interval),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  |  "),
        gate,
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_tab_bar(f: &mut Frame<'_>, area: Rect, app: &App) {
    let line = Line::from(vec![
        tab_label(" MINING ", app.tab == Tab::Mining),
        Span::raw("│"),
        tab_label(" INTERVALS ", app.tab == Tab::Intervals),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn tab_label(label: &'static str, current: bool) -> Span<'static> {
    if current {
        Span::styled(
            label,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

fn draw_mining_tab(f: &mut Frame<'_>, area: Rect, app: &App) {
    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);

    draw_block_grid(f, segments[0], app);
    draw_session_gauge(f, segments[1], app);
    draw_rig(f, segments[2], app);
    draw_pool(f, segments[3], app);
}

fn draw_block_grid(f: &mut Frame<'_>, area: Rect, app: &App) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let block_value = match app.block.status {
        BlockStatus::Mining => format!("#{}  {}s", app.block.height, app.block.time_left),
        BlockStatus::Mined => format!("#{}  ⛏ mined", app.block.height),
    };
    let reward = if app.block.reward > 0 {
        format!("{} BH", app.block.reward)
    } else {
        "?".to_string()
    };

    draw_grid_cell(f, cells[0], "Block", block_value, Color::White);
    draw_grid_cell(
        f,
        cells[1],
        "Difficulty",
        format!("{}K", app.block.difficulty),
        Color::Yellow,
    );
    draw_grid_cell(f, cells[2], "Reward", reward, Color::LightCyan);
    draw_grid_cell(
        f,
        cells[3],
        "Online",
        format!("{} ({} BH/s)", app.block.online, app.block.total_hash_rate),
        Color::LightGreen,
    );
}

fn draw_grid_cell(f: &mut Frame<'_>, area: Rect, title: &str, value: String, color: Color) {
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(Color::Gray)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let paragraph = Paragraph::new(Line::from(Span::styled(
        value,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(paragraph, inner);
}

fn draw_session_gauge(f: &mut Frame<'_>, area: Rect, app: &App) {
    let title = if app.mining {
        format!("Session  ⚡ -{}/sec", ENERGY_RATE)
    } else {
        "Session".to_string()
    };
    let label = if app.session.active {
        format!(
            "{} / {}",
            format_clock(app.session_time_left),
            format_clock(app.session.total)
        )
    } else if app.session_earned > 0 {
        "session ended".to_string()
    } else {
        "idle".to_string()
    };
    let ratio = (app.session.progress / 100.0).clamp(0.0, 1.0);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .ratio(ratio)
        .gauge_style(
            Style::default()
                .fg(if app.mining {
                    Color::Green
                } else {
                    Color::DarkGray
                })
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .label(label);
    f.render_widget(gauge, area);
}

fn draw_rig(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title("Rig")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let stats = Line::from(vec![
        Span::styled("Hash Rate ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{} BH/sec", app.hash_rate),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  |  Shares "),
        Span::styled(format!("{}", app.shares), Style::default().fg(Color::White)),
        Span::raw("  |  Income "),
        Span::styled(
            format!("+{} BH", app.session_earned),
            Style::default().fg(Color::LightGreen),
        ),
    ]);

    let upgrades = Line::from(vec![
        upgrade_label(
            format!("⚡ [H] +1 BH/sec {} BH", HASH_RATE_COST),
            app.balance >= HASH_RATE_COST,
        ),
        Span::raw("   "),
        upgrade_label(
            format!("⏱ [U] +2 hours {} BH", DURATION_COST),
            app.balance >= DURATION_COST,
        ),
        Span::raw("   "),
        upgrade_label(
            format!("🔋 [E] +{} energy {} BH", ENERGY_PACK, ENERGY_COST),
            app.balance >= ENERGY_COST,
        ),
    ]);

    let hint = if !app.wallet.is_connected() {
        Span::styled(
            "→ [C] CONNECT WALLET ←",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        )
    } else if app.mining {
        Span::styled(
            "⚡ MINING ⚡",
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
    } else if app.energy <= 0 {
        Span::styled(
            "🔋 NO ENERGY",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )
    } else if !app.can_mine {
        Span::styled(
            format!("⏳ NEXT ENTRY {}", format_wait(app.mining_wait_ms)),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Span::styled(
            "→ [S] START MINING ←",
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
    };

    let lines = vec![stats, upgrades, Line::from(hint)];
    f.render_widget(Paragraph::new(lines), inner);
}

fn upgrade_label(label: String, affordable: bool) -> Span<'static> {
    Span::styled(
        label,
        Style::default().fg(if affordable {
            Color::White
        } else {
            Color::DarkGray
        }),
    )
}

fn draw_pool(f: &mut Frame<'_>, area: Rect, app: &App) {
    let title = match &app.block.mined_by {
        Some(winner) => format!("Pool · mined by {}", shorten_address(winner)),
        None => "Pool".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let miners = app.engine.miners();
    if miners.is_empty() {
        let placeholder = Paragraph::new("No miners on this block yet.").wrap(Wrap { trim: true });
        f.render_widget(placeholder, inner);
        return;
    }

    let items: Vec<ListItem> = miners
        .iter()
        .map(|miner| {
            let uptime = (app.clock - miner.start_time).max(0);
            let mut spans = vec![
                Span::styled(
                    shorten_address(&miner.user_id),
                    Style::default().fg(Color::LightCyan),
                ),
                Span::raw(format!("  {} BH/sec", miner.hash_rate)),
                Span::raw(format!("  {} shares", miner.shares)),
                Span::styled(
                    format!("  up {}", format_clock(uptime)),
                    Style::default().fg(Color::Gray),
                ),
            ];
            if miner.user_id == app.user_id {
                spans.push(Span::styled("  (you)", Style::default().fg(Color::Yellow)));
            }
            ListItem::new(vec![Line::from(spans)])
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::NONE));
    f.render_widget(list, inner);
}

fn draw_intervals_tab(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block("Entry Intervals", !app.show_notifications);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Current interval ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} hours", app.current_interval),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            "Longer intervals widen the gap between session starts.",
            Style::default().fg(Color::Gray),
        )),
    ]);
    f.render_widget(header, segments[0]);

    let tiers = app.purchasable_intervals();
    let items: Vec<ListItem> = tiers
        .iter()
        .map(|tier| {
            let mut spans = vec![Span::styled(
                format!("{:>2} hours", tier.hours),
                Style::default().fg(Color::White),
            )];
            if tier.purchased && tier.hours == app.current_interval {
                spans.push(Span::styled(
                    "  CURRENT",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            if tier.purchased {
                spans.push(Span::styled(
                    "  ✅ purchased",
                    Style::default().fg(Color::LightGreen),
                ));
            } else {
                spans.push(Span::styled(
                    format!("  {} BH", tier.cost),
                    Style::default().fg(if app.balance >= tier.cost {
                        Color::LightCyan
                    } else {
                        Color::DarkGray
                    }),
                ));
            }
            ListItem::new(vec![Line::from(spans)])
        })
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(app.selected_interval.min(tiers.len().saturating_sub(1))));
    f.render_stateful_widget(list, segments[1], &mut state);

    let note = Paragraph::new(Span::styled(
        "💡 Maximum interval: 12 hours   ↑↓ select   Enter buy",
        Style::default().fg(Color::Gray),
    ));
    f.render_widget(note, segments[2]);
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Keys & Feed")
        .border_style(Style::default().fg(Color::Gray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let instruction_lines = vec![
        Line::from("Tab switch view | N alerts | C wallet | Q quit"),
        Line::from("S start mining  D daily check-in  Ctrl+R wipe save"),
        Line::from("Upgrades: H hash rate  U duration  E energy"),
    ];
    let instruction = Paragraph::new(instruction_lines).wrap(Wrap { trim: true });
    f.render_widget(instruction, columns[0]);

    let mut message_lines: Vec<Line> = Vec::new();
    for entry in app.notifications.iter().take(3) {
        message_lines.push(Line::from(vec![
            Span::styled(entry.stamp.clone(), Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(
                entry.message.clone(),
                Style::default().fg(kind_color(entry.kind)),
            ),
        ]));
    }
    if message_lines.is_empty() {
        message_lines.push(Line::from(Span::styled(
            "Nothing to report yet.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let feed = Paragraph::new(message_lines).wrap(Wrap { trim: true });
    f.render_widget(feed, columns[1]);
}

fn draw_notifications(f: &mut Frame<'_>, app: &App) {
    let area = popup_area(f.size(), 70, 60);
    f.render_widget(Clear, area);
    let block = pane_block("Notifications", true);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    if app.notifications.is_empty() {
        let placeholder = Paragraph::new("No notifications.").wrap(Wrap { trim: true });
        f.render_widget(placeholder, segments[0]);
    } else {
        let items: Vec<ListItem> = app
            .notifications
            .iter()
            .map(build_notification_item)
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::NONE));
        f.render_widget(list, segments[0]);
    }

    let hint = Paragraph::new(Span::styled(
        "M mark all read   X clear   N close",
        Style::default().fg(Color::Gray),
    ));
    f.render_widget(hint, segments[1]);
}

fn build_notification_item(entry: &Notification) -> ListItem<'static> {
    let mut style = Style::default().fg(kind_color(entry.kind));
    if !entry.read {
        style = style.add_modifier(Modifier::BOLD);
    }
    let mut spans = vec![
        Span::styled(entry.stamp.clone(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(entry.message.clone(), style),
    ];
    if entry.reward > 0 {
        spans.push(Span::styled(
            format!("  +{} BH", entry.reward),
            Style::default().fg(Color::LightGreen),
        ));
    }
    ListItem::new(vec![Line::from(spans)])
}

fn kind_color(kind: NotificationKind) -> Color {
    match kind {
        NotificationKind::System => Color::LightCyan,
        NotificationKind::Error => Color::LightRed,
        NotificationKind::Upgrade => Color::Yellow,
        NotificationKind::Success => Color::LightGreen,
    }
}

fn popup_area(base: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(base);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

fn pane_block<'a>(title: &'a str, focused: bool) -> Block<'a> {
    let border_style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default()
        .title(Span::styled(title, Style::default().fg(Color::White)))
        .borders(Borders::ALL)
        .border_style(border_style)
}
