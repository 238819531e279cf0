use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

mod detail;
pub mod layout;
pub mod widgets;

use crate::app::{App, InscriptionCard, StatusLevel, Tab};
use crate::domain::format::{
    capitalize_first_letter, relative_time, status_tone, truncate, Status, StatusTone,
    DEFAULT_TRUNCATE,
};
use crate::domain::{BlockRecord, FeedState, FeedStatus, TxRecord, RANGE_PREVIEW_LEAD};

pub fn draw(f: &mut Frame, app: &mut App) {
    let areas = layout::areas(f.size());
    let now = Utc::now();

    draw_header(f, areas.header, app);
    if let Some(pane) = app.detail.as_ref() {
        detail::draw_detail(f, areas.main, pane, now);
        draw_status_line(f, areas.status_line, app);
        draw_command_line(f, areas.command_line, app);
        return;
    }
    match app.current_tab {
        Tab::Home => draw_home(f, areas.main, app, now),
        Tab::Blocks => draw_block_feed(f, areas.main, "Blocks", &app.blocks, now, true),
        Tab::Transactions => draw_tx_feed(f, areas.main, "Transactions", &app.txs, now, true),
        Tab::Validators => draw_validators(f, areas.main, app),
    }
    draw_status_line(f, areas.status_line, app);
    draw_command_line(f, areas.command_line, app);
}

pub fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Success => Color::LightGreen,
        StatusTone::Danger => Color::LightYellow,
        StatusTone::Error => Color::LightRed,
        StatusTone::Neutral => Color::Gray,
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut spans = vec![
        Span::styled(
            "Surge",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
    ];
    for tab in Tab::ALL {
        let style = if tab == app.current_tab {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightCyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(
            format!(" {} {} ", tab.shortcut(), tab.title()),
            style,
        ));
        spans.push(Span::raw(" "));
    }
    let left = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    let (chain, height) = match app.node.as_ref() {
        Some(node) => (node.chain_id.clone(), node.latest_height.to_string()),
        None => ("--".to_string(), "--".to_string()),
    };
    let link = if app.connected {
        Span::styled("live", Style::default().fg(Color::LightGreen))
    } else {
        Span::styled("offline", Style::default().fg(Color::LightRed))
    };
    let right = Paragraph::new(Line::from(vec![
        Span::styled("Chain ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{chain}  ")),
        Span::styled("Height ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{height}  ")),
        link,
    ]))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Left);

    f.render_widget(left, chunks[0]);
    f.render_widget(right, chunks[1]);
}

fn draw_home(f: &mut Frame, area: Rect, app: &App, now: DateTime<Utc>) {
    let home = layout::home_areas(area);

    let latest = app
        .node
        .as_ref()
        .map(|n| n.latest_height.to_string())
        .unwrap_or_else(|| "--".to_string());
    let block_time = app
        .node
        .as_ref()
        .and_then(|n| n.latest_time)
        .map(|t| relative_time(t, now, false))
        .unwrap_or_else(|| "--".to_string());
    let activity = widgets::tx_activity(app.home_blocks.records(), home.stats.width as usize / 2);
    let stats = vec![
        Line::from(vec![
            Span::styled("Latest block ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{latest} ({block_time})  ")),
            Span::styled("Transactions ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}  ", app.home_txs.total_count())),
            Span::styled("Inscriptions ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.inscriptions.total.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Txs/block ", Style::default().fg(Color::DarkGray)),
            Span::styled(activity, Style::default().fg(Color::LightCyan)),
        ]),
    ];
    let stats = Paragraph::new(stats).block(
        Block::default()
            .borders(Borders::ALL)
            .title(app.endpoint.as_str()),
    );
    f.render_widget(stats, home.stats);

    draw_block_feed(f, home.blocks, "Latest Blocks", &app.home_blocks, now, false);
    draw_tx_feed(f, home.txs, "Latest Transactions", &app.home_txs, now, false);
    draw_cards(f, home.cards, app, now);
}

fn draw_block_feed(
    f: &mut Frame,
    area: Rect,
    title: &str,
    feed: &FeedState<BlockRecord>,
    now: DateTime<Utc>,
    paged: bool,
) {
    let items: Vec<ListItem> = feed
        .records()
        .iter()
        .map(|block| block_item(block, now))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(feed_title(title, feed, paged)),
    );
    f.render_widget(list, area);
}

fn draw_tx_feed(
    f: &mut Frame,
    area: Rect,
    title: &str,
    feed: &FeedState<TxRecord>,
    now: DateTime<Utc>,
    paged: bool,
) {
    let items: Vec<ListItem> = feed
        .records()
        .iter()
        .map(|tx| ListItem::new(tx_line(tx, now)))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(feed_title(title, feed, paged)),
    );
    f.render_widget(list, area);
}

fn feed_title<R>(title: &str, feed: &FeedState<R>, paged: bool) -> String
where
    R: crate::domain::ChainRecord,
{
    let mut text = format!(" {title} ");
    if paged {
        let page = feed.page();
        text.push_str(&format!(
            "· page {}/{} ",
            page.page(),
            page.page_count(feed.total_count())
        ));
    }
    match feed.status() {
        FeedStatus::Loading => text.push_str("· loading "),
        FeedStatus::Failed => text.push_str("· failed "),
        FeedStatus::Ready if feed.is_live() && feed.page().is_first() => {
            text.push_str("· auto updates ")
        }
        FeedStatus::Ready | FeedStatus::Idle => {}
    }
    text
}

fn block_item(block: &BlockRecord, now: DateTime<Utc>) -> ListItem<'static> {
    let age = block
        .timestamp
        .map(|t| relative_time(t, now, true))
        .unwrap_or_else(|| "--".to_string());
    let line = Line::from(vec![
        Span::styled(
            format!("{:>9}", block.height),
            Style::default().fg(Color::White),
        ),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::raw(truncate(&block.hash, DEFAULT_TRUNCATE)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:>3}", block.tx_count),
            Style::default().fg(Color::LightCyan),
        ),
        Span::styled(" txs │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(age, Style::default().fg(Color::DarkGray)),
    ]);
    ListItem::new(line)
}

fn tx_line(tx: &TxRecord, now: DateTime<Utc>) -> Line<'static> {
    let age = tx
        .timestamp
        .map(|t| relative_time(t, now, true))
        .unwrap_or_else(|| "--".to_string());
    let label = tx.status.label();
    let status = Span::styled(
        capitalize_first_letter(label),
        Style::default().fg(tone_color(status_tone(Status::Label(label)))),
    );
    let kind = if tx.tx_type.is_empty() {
        "-".to_string()
    } else {
        tx.tx_type.clone()
    };
    Line::from(vec![
        Span::raw(format!("{}  ", truncate(&tx.hash, DEFAULT_TRUNCATE))),
        Span::styled(format!("{kind:<14}"), Style::default().fg(Color::LightCyan)),
        Span::raw(format!(
            "  {} -> {}  ",
            truncate(&tx.from_address, DEFAULT_TRUNCATE),
            truncate(&tx.to_address, DEFAULT_TRUNCATE)
        )),
        Span::styled(
            format!("#{}  ", tx.height),
            Style::default().fg(Color::DarkGray),
        ),
        status,
        Span::styled(format!("  {age}"), Style::default().fg(Color::DarkGray)),
    ])
}

fn draw_cards(f: &mut Frame, area: Rect, app: &App, now: DateTime<Utc>) {
    let cards: Vec<&InscriptionCard> = app
        .cards
        .iter()
        .filter(|card| card.inscription.is_some())
        .collect();
    if cards.is_empty() {
        let empty = Paragraph::new("Waiting for inscriptions")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Recent Inscriptions "),
            );
        f.render_widget(empty, area);
        return;
    }
    for (card, rect) in cards.iter().zip(layout::card_areas(area, cards.len())) {
        let paragraph = Paragraph::new(card_lines(card, now))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Inscription "));
        f.render_widget(paragraph, rect);
    }
}

fn card_lines(card: &InscriptionCard, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let Some(inscription) = card.inscription.as_ref() else {
        return Vec::new();
    };
    let mut lines = vec![Line::from(vec![
        Span::styled("Reveal ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            truncate(&inscription.reveal_tx, DEFAULT_TRUNCATE),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("  {}-{}", inscription.start_block, inscription.end_block),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    let Some(blocks) = card
        .blocks
        .get(inscription.start_block, inscription.end_block)
    else {
        lines.push(Line::styled(
            "loading blocks…",
            Style::default().fg(Color::DarkGray),
        ));
        return lines;
    };

    let (last, lead) = match blocks.split_last() {
        Some((last, lead)) if !lead.is_empty() => (Some(last), lead),
        _ => (None, blocks),
    };
    for block in lead {
        lines.push(card_block_line(block, now));
    }
    let hidden = inscription
        .block_span()
        .saturating_sub(RANGE_PREVIEW_LEAD + 1);
    if hidden > 0 {
        let unit = if hidden == 1 { "Block" } else { "Blocks" };
        lines.push(Line::styled(
            format!("  +{hidden} {unit}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(last) = last {
        lines.push(card_block_line(last, now));
    }
    lines
}

fn card_block_line(block: &BlockRecord, now: DateTime<Utc>) -> Line<'static> {
    let age = block
        .timestamp
        .map(|t| relative_time(t, now, true))
        .unwrap_or_default();
    Line::from(vec![
        Span::raw(format!("  #{:<8}", block.height)),
        Span::styled(
            format!("{:>3} txs  ", block.tx_count),
            Style::default().fg(Color::LightCyan),
        ),
        Span::styled(age, Style::default().fg(Color::DarkGray)),
    ])
}

fn draw_validators(f: &mut Frame, area: Rect, app: &App) {
    let total = app.validators.total_power().max(1);
    let items: Vec<ListItem> = app
        .validators
        .records
        .iter()
        .enumerate()
        .map(|(rank, validator)| {
            let share = validator.voting_power as f64 * 100.0 / total as f64;
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>3}. ", rank + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(format!("{}  ", truncate(&validator.address, 8))),
                Span::styled(
                    format!("{:>12}", validator.voting_power),
                    Style::default().fg(Color::LightCyan),
                ),
                Span::raw(format!("  {share:>6.2}%  ")),
                Span::styled(
                    format!("prio {}", validator.proposer_priority),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let mut title = format!(" Validators ({}) ", app.validators.records.len());
    if app.validators.loading {
        title.push_str("· loading ");
    } else if app.validators.error.is_some() {
        title.push_str("· failed ");
    }
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let latest = app
        .node
        .as_ref()
        .map(|n| n.latest_height.to_string())
        .unwrap_or_else(|| "--".to_string());
    let moniker = app
        .node
        .as_ref()
        .map(|n| n.moniker.clone())
        .unwrap_or_else(|| "--".to_string());
    let line = Line::from(vec![
        Span::styled("Latest ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{latest}  ")),
        Span::styled("Node ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{moniker}  ")),
        Span::styled("Tab ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.current_tab.title()),
    ]);
    let paragraph = Paragraph::new(line)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = if let Some(input) = app.search_input.as_deref() {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::LightCyan)),
            Span::raw(input.to_string()),
            Span::styled("█", Style::default().fg(Color::Gray)),
            Span::styled(
                "  height, tx hash or address · Enter search · Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if let Some((text, level)) = app.status_text() {
        let color = match level {
            StatusLevel::Info => Color::LightGreen,
            StatusLevel::Warn => Color::LightYellow,
            StatusLevel::Error => Color::LightRed,
        };
        Line::from(vec![
            Span::styled("msg: ", Style::default().fg(Color::DarkGray)),
            Span::styled(text.to_string(), Style::default().fg(color)),
        ])
    } else {
        action_hints(app)
    };
    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn action_hints(app: &App) -> Line<'static> {
    let mut hints = vec![("1-4/Tab", "view"), ("/", "search"), ("r", "reload"), ("q", "quit")];
    if app.detail.is_some() {
        hints.insert(1, ("Esc", "close"));
    } else if matches!(app.current_tab, Tab::Blocks | Tab::Transactions) {
        hints.insert(1, ("n/p", "page"));
    }
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().fg(Color::LightCyan),
        ));
        spans.push(Span::styled(
            format!(" {label}  "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}
