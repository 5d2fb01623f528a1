use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::document::Stripe;
use crate::domain::{CMDMode, Config};
use crate::model::{HeaderView, UIData};
use crate::sorter::SortDirection;

// Border (2), search line, table header and status line.
pub const CHROME_HEIGHT: usize = 5;
pub const COLUMN_SPACING: u16 = 1;

// Background of the stripe classes.
const ROW_CLASS_COLORS: [(&str, Color); 2] = [
    ("bg-light", Color::Rgb(48, 52, 60)),
    ("bg-white", Color::Rgb(30, 32, 38)),
];

pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new(_cfg: &Config) -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        // Pages above home show how deep the drill-down goes
        let title = if uidata.depth > 1 {
            Line::from(vec![
                format!(" {} ", "›".repeat(uidata.depth - 1)).dark_gray(),
                format!("{} ", uidata.name).bold(),
            ])
        } else {
            Line::from(format!(" {} ", uidata.name).bold())
        };
        let instructions = Line::from(vec![
            " Search ".into(),
            "</>".blue().bold(),
            " Sort ".into(),
            "<s,1-9>".blue().bold(),
            " Category ".into(),
            "<c>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);

        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [search_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(Self::search_line(uidata), search_area);
        self.render_table(uidata, frame, table_area);
        frame.render_widget(Self::status_line(uidata), status_area);

        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, frame);
        }
    }

    fn search_line(uidata: &UIData) -> Paragraph<'_> {
        let line = match (uidata.active_cmdinput, uidata.cmd_mode, &uidata.search_box) {
            (true, Some(CMDMode::Category), _) => Line::from(vec![
                "Category: ".yellow().bold(),
                Self::input_spans(uidata),
                "█".into(),
            ]),
            (true, Some(CMDMode::Search), Some((id, _))) => Line::from(vec![
                format!("{id}: ").yellow().bold(),
                Self::input_spans(uidata),
                "█".into(),
            ]),
            (_, _, Some((id, value))) => Line::from(vec![
                format!("{id}: ").dark_gray(),
                Span::raw(value.clone()),
            ]),
            _ => Line::from("no search on this page".dark_gray()),
        };
        Paragraph::new(line)
    }

    fn input_spans(uidata: &UIData) -> Span<'static> {
        Span::raw(uidata.cmdinput.input.clone())
    }

    fn header_title(header: &HeaderView) -> Line<'static> {
        let arrow = match (header.active, header.direction) {
            (true, Some(SortDirection::Ascending)) => " ▲",
            (true, Some(SortDirection::Descending)) => " ▼",
            _ => "",
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if header.active {
            style = style.fg(Color::Yellow);
        }
        if header.selected {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Line::styled(format!("{}{}", header.title, arrow), style)
    }

    fn stripe_style(stripe: Option<Stripe>) -> Style {
        let class = stripe.map(|s| s.class_name());
        ROW_CLASS_COLORS
            .iter()
            .find(|(name, _)| Some(*name) == class)
            .map(|(_, color)| Style::default().bg(*color))
            .unwrap_or_default()
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let widths: Vec<Constraint> = uidata
            .headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let longest = uidata
                    .rows
                    .iter()
                    .filter_map(|r| r.cells.get(idx))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0);
                Constraint::Min((longest.max(h.title.chars().count() + 2)).min(40) as u16)
            })
            .collect();

        let header = Row::new(
            uidata
                .headers
                .iter()
                .map(|h| Cell::from(Self::header_title(h))),
        );
        let rows = uidata.rows.iter().map(|r| {
            Row::new(r.cells.iter().map(|c| Cell::from(c.as_str())))
                .style(Self::stripe_style(r.stripe))
        });

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        self.table_state.select(if uidata.rows.is_empty() {
            None
        } else {
            Some(uidata.selected_row)
        });
        *self.table_state.offset_mut() = 0;
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn status_line(uidata: &UIData) -> Paragraph<'_> {
        let counts = if uidata.nrows_visible == uidata.nrows_total {
            format!(" {} rows ", uidata.nrows_total)
        } else {
            format!(" {}/{} rows ", uidata.nrows_visible, uidata.nrows_total)
        };
        let position = if uidata.nrows_visible > 0 {
            format!("{}/{} ", uidata.abs_selected_row + 1, uidata.nrows_visible)
        } else {
            String::new()
        };
        Paragraph::new(Line::from(vec![
            counts.black().on_cyan(),
            " ".into(),
            position.cyan(),
            uidata.status_message.as_str().into(),
        ]))
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let lines = message.lines().count() as u16 + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::vertical([Constraint::Length(lines)])
            .flex(Flex::Center)
            .areas(area);
        let popup = Paragraph::new(Text::from(message))
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Help ".bold()).border_set(border::ROUNDED));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripes_get_their_class_background() {
        let even = TableUI::stripe_style(Some(Stripe::Even));
        let odd = TableUI::stripe_style(Some(Stripe::Odd));
        assert_eq!(even.bg, Some(ROW_CLASS_COLORS[0].1));
        assert_eq!(odd.bg, Some(ROW_CLASS_COLORS[1].1));
        assert_eq!(TableUI::stripe_style(None), Style::default());
    }
}
