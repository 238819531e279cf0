//! Search result pane

use chrono::{DateTime, SecondsFormat, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::{tone_color, tx_line};
use crate::app::{DetailPane, DetailState};
use crate::domain::format::{capitalize_first_letter, status_tone, Status};
use crate::domain::{BlockRecord, Detail, SearchTarget, TxRecord};

pub(super) fn draw_detail(f: &mut Frame, area: Rect, pane: &DetailPane, now: DateTime<Utc>) {
    let lines = match &pane.state {
        DetailState::Loading => vec![muted("Loading…")],
        DetailState::Failed(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::LightRed),
        ))],
        DetailState::Ready(detail) => detail_lines(detail, now),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title(&pane.target));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn title(target: &SearchTarget) -> String {
    match target {
        SearchTarget::Block(height) => format!(" Block #{height} "),
        SearchTarget::Tx(hash) => format!(" Transaction {hash} "),
        SearchTarget::Account(address) => format!(" Account {address} "),
    }
}

fn detail_lines(detail: &Detail, now: DateTime<Utc>) -> Vec<Line<'static>> {
    match detail {
        Detail::Block { block, txs } => block_lines(block, txs, now),
        Detail::Tx(tx) => tx_lines(tx),
        Detail::Account { address, txs } => {
            let mut lines = vec![
                field("Address", address.clone()),
                field("Sent txs", txs.total_count.to_string()),
                Line::default(),
            ];
            if txs.is_empty() {
                lines.push(muted("No transactions"));
            }
            lines.extend(txs.records.iter().map(|tx| tx_line(tx, now)));
            lines
        }
    }
}

fn block_lines(block: &BlockRecord, txs: &[TxRecord], now: DateTime<Utc>) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("Height", block.height.to_string()),
        field("Hash", block.hash.clone()),
        field("App hash", block.app_hash.clone()),
        field("Proposer", block.proposer.clone()),
        field("Time", time(block.timestamp)),
        field("Txs", block.tx_count.to_string()),
    ];
    if block.tx_hashes.is_empty() {
        return lines;
    }
    lines.push(Line::default());
    for hash in &block.tx_hashes {
        match txs.iter().find(|tx| &tx.hash == hash) {
            Some(tx) => lines.push(tx_line(tx, now)),
            None => lines.push(Line::from(Span::raw(hash.clone()))),
        }
    }
    lines
}

fn tx_lines(tx: &TxRecord) -> Vec<Line<'static>> {
    let label = tx.status.label();
    let status = Line::from(vec![
        label_span("Status"),
        Span::styled(
            format!("{} (code {})", capitalize_first_letter(label), tx.status.code),
            Style::default().fg(tone_color(status_tone(Status::Label(label)))),
        ),
    ]);
    vec![
        field("Hash", tx.hash.clone()),
        field("Height", tx.height.to_string()),
        field("Index", tx.index.to_string()),
        status,
        field("Type", or_dash(&tx.tx_type)),
        field("From", or_dash(&tx.from_address)),
        field("To", or_dash(&tx.to_address)),
        field("Gas", format!("{} / {}", tx.gas_used, tx.gas_wanted)),
        field("Messages", tx.message_count.to_string()),
        field("Memo", or_dash(&tx.memo)),
        field("Time", time(tx.timestamp)),
    ]
}

fn field(name: &'static str, value: String) -> Line<'static> {
    Line::from(vec![label_span(name), Span::raw(value)])
}

fn label_span(name: &'static str) -> Span<'static> {
    Span::styled(
        format!("{name:<10}"),
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    )
}

fn muted(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxStatus;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn tx(hash: &str) -> TxRecord {
        TxRecord {
            height: 7,
            hash: hash.to_string(),
            index: 0,
            timestamp: None,
            from_address: "surge1from".to_string(),
            to_address: String::new(),
            tx_type: "MsgSend".to_string(),
            status: TxStatus::SUCCESS,
            gas_wanted: 100,
            gas_used: 80,
            memo: String::new(),
            message_count: 1,
        }
    }

    #[test]
    fn block_lists_every_tx_hash() {
        let block = BlockRecord {
            height: 7,
            hash: "B7".to_string(),
            app_hash: "A7".to_string(),
            timestamp: None,
            tx_count: 2,
            proposer: "P".to_string(),
            tx_hashes: vec!["AA11".to_string(), "BB22".to_string()],
        };
        let lines = text(&block_lines(&block, &[tx("BB22")], Utc::now()));
        assert!(lines[0].ends_with('7'));
        assert!(lines.contains(&"AA11".to_string()));
        assert!(lines.iter().any(|l| l.contains("BB22") && l.contains("MsgSend")));
    }

    #[test]
    fn tx_fields_fall_back_to_dash() {
        let lines = text(&tx_lines(&tx("CC33")));
        assert!(lines.iter().any(|l| l.starts_with("To") && l.ends_with('-')));
        assert!(lines.iter().any(|l| l.contains("Success (code 0)")));
        assert!(lines.iter().any(|l| l.ends_with("80 / 100")));
    }
}
