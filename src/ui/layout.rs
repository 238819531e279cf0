use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone, Copy)]
pub struct UiAreas {
    pub size: Rect,
    pub header: Rect,
    pub main: Rect,
    pub status_line: Rect,
    pub command_line: Rect,
}

/// Home tab: stats strip on top, feeds on the left, inscription cards right
#[derive(Debug, Clone, Copy)]
pub struct HomeAreas {
    pub stats: Rect,
    pub blocks: Rect,
    pub txs: Rect,
    pub cards: Rect,
}

pub fn areas(size: Rect) -> UiAreas {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(size);

    UiAreas {
        size,
        header: vertical[0],
        main: vertical[1],
        status_line: vertical[2],
        command_line: vertical[3],
    }
}

pub fn home_areas(main: Rect) -> HomeAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(main);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[1]);

    let feeds = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(columns[0]);

    HomeAreas {
        stats: rows[0],
        blocks: feeds[0],
        txs: feeds[1],
        cards: columns[1],
    }
}

/// Split the card column into `count` equal boxes
pub fn card_areas(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let constraints: Vec<Constraint> = (0..count)
        .map(|_| Constraint::Ratio(1, count as u32))
        .collect();
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area)
        .to_vec()
}
