use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::{Marker, border},
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table, Wrap,
    },
};

use crate::charts::{ChartKind, ChartSpec};
use crate::model::{Model, Modus};

pub const HEADER_HEIGHT: u16 = 3;
pub const STATUSLINE_HEIGHT: u16 = 1;

pub struct TrendsUI;

impl TrendsUI {
    pub fn new() -> Self {
        TrendsUI
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [header, body, statusline] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        self.draw_header(model, frame, header);
        match model.modus() {
            Modus::PREVIEW => self.draw_preview(model, frame, body),
            Modus::FILTERS => self.draw_filters(model, frame, body),
            Modus::STATS => self.draw_stats(model, frame, body),
            Modus::BAR => self.draw_bar(model, frame, body),
            Modus::PIE => self.draw_pie(model, frame, body),
            Modus::TREND => self.draw_trend(model, frame, body),
            Modus::POPUP | Modus::CMDINPUT => {
                // Keep the previous data view underneath.
                self.draw_preview(model, frame, body);
            }
        }
        self.draw_statusline(model, frame, statusline);

        if let Some(message) = model.popup() {
            self.draw_popup(frame, message);
        }
    }

    fn draw_header(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut title = vec![
            " Shopping Trends Analyzer ".bold(),
            format!(" {} ", model.file_name()).yellow(),
        ];
        if let Some(banner) = model.banner() {
            title.push(format!(" [{} / {} frames] ", banner.name, banner.frames).green());
        } else if let Some(warning) = model.banner_warning() {
            title.push(format!(" {warning} ").red());
        }
        let keys = Line::from(vec![
            " d".blue().bold(),
            "ata ".into(),
            "f".blue().bold(),
            "ilters ".into(),
            "s".blue().bold(),
            "tats ".into(),
            "b".blue().bold(),
            "ar pie".into(),
            "(c)".blue().bold(),
            " ".into(),
            "t".blue().bold(),
            "rend ".into(),
            "e".blue().bold(),
            "xport ".into(),
            "?".blue().bold(),
            " help ".into(),
        ]);
        let block = Block::bordered()
            .title(Line::from(title))
            .title_bottom(keys.centered())
            .border_set(border::THICK);
        frame.render_widget(block, area);
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let line = if let Some(input) = model.cmd_input() {
            let mut text = input.input.clone();
            let byte = text
                .char_indices()
                .nth(input.cursor)
                .map(|(idx, _)| idx)
                .unwrap_or(text.len());
            text.insert(byte, '▏');
            Line::from(vec![" Visualize column: ".bold(), text.into()])
        } else {
            let (filtered, total) = model.record_counts();
            Line::from(vec![
                format!(" Records: {filtered}/{total} ").bold(),
                "| ".dark_gray(),
                model.status_message().to_string().into(),
            ])
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_preview(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let columns = model.preview_columns();
        if columns.is_empty() {
            let empty = Paragraph::new("No records match the current filters.")
                .block(Block::bordered().title(" Data Preview "));
            frame.render_widget(empty, area);
            return;
        }

        let nrows = columns[0].data.len();
        let visible = area.height.saturating_sub(3) as usize;
        let rbegin = model.preview_offset().min(nrows.saturating_sub(1));
        let rend = (rbegin + visible).min(nrows);

        let header = Row::new(
            columns
                .iter()
                .map(|c| truncated(&c.name, c.width))
                .collect::<Vec<String>>(),
        )
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

        let rows: Vec<Row> = (rbegin..rend)
            .map(|ridx| {
                Row::new(
                    columns
                        .iter()
                        .map(|c| truncated(&c.data[ridx], c.width))
                        .collect::<Vec<String>>(),
                )
            })
            .collect();

        let widths: Vec<Constraint> = columns
            .iter()
            .map(|c| Constraint::Length(c.width as u16))
            .collect();

        let title = format!(" Data Preview [{}-{}/{}] ", rbegin + 1, rend, nrows);
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(Block::bordered().title(title));
        frame.render_widget(table, area);
    }

    fn draw_filters(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let selections = model.selections();
        let cursor = model.filter_cursor();

        let rows: Vec<Row> = model
            .filter_entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let selection = &selections.columns[entry.column_idx];
                let mark = if selection.is_selected(&entry.value) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let row = Row::new(vec![
                    mark.to_string(),
                    selection.column.clone(),
                    entry.value.clone(),
                ]);
                if idx == cursor {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();

        let header = Row::new(vec!["", "Column", "Value"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = vec![
            Constraint::Length(3),
            Constraint::Length(12),
            Constraint::Min(8),
        ];
        let table = Table::new(rows, widths).header(header).block(
            Block::bordered().title(" Filters (space toggles, r resets) "),
        );
        frame.render_widget(table, area);
    }

    fn draw_stats(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let header = Row::new(vec![
            "Column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = model
            .stats()
            .iter()
            .map(|s| {
                Row::new(vec![
                    s.name.clone(),
                    s.count.to_string(),
                    format!("{:.2}", s.mean),
                    format!("{:.2}", s.std),
                    format!("{:.2}", s.min),
                    format!("{:.2}", s.q25),
                    format!("{:.2}", s.median),
                    format!("{:.2}", s.q75),
                    format!("{:.2}", s.max),
                ])
            })
            .collect();

        let mut widths = vec![Constraint::Min(16)];
        widths.extend(std::iter::repeat_n(Constraint::Length(9), 8));
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title(" Summary Statistics (numeric columns) "));
        frame.render_widget(table, area);
    }

    fn draw_bar(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(spec) = model.bar() else {
            let info = Paragraph::new("No text column available to visualize.")
                .block(Block::bordered().title(" Bar Chart "));
            frame.render_widget(info, area);
            return;
        };

        let labels: Vec<String> = spec
            .categories
            .iter()
            .map(|c| truncated(c, 10))
            .collect();
        let data: Vec<(&str, u64)> = labels
            .iter()
            .map(|l| l.as_str())
            .zip(spec.values.iter().copied())
            .collect();

        let title = format!(
            " {} ({}) ",
            spec.title,
            spec.y_label.as_deref().unwrap_or("Count")
        );
        let chart = BarChart::default()
            .data(&data)
            .bar_width(11)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
            .block(Block::bordered().title(title));
        frame.render_widget(chart, area);
    }

    fn draw_pie(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(spec) = model.pie() else {
            let info = Paragraph::new("No 'Category' column in this file.")
                .block(Block::bordered().title(" Category Breakdown "));
            frame.render_widget(info, area);
            return;
        };

        let gauge_width = area.width.saturating_sub(30) as f64;
        let lines: Vec<Line> = spec
            .categories
            .iter()
            .zip(spec.percents.iter())
            .zip(pie_colors())
            .map(|((category, percent), color)| {
                let filled = (percent / 100.0 * gauge_width).round() as usize;
                Line::from(vec![
                    Span::styled(format!("{:<14}", truncated(category, 14)), color),
                    Span::raw(format!("{percent:>5.1}% ")),
                    Span::styled("█".repeat(filled), color),
                ])
            })
            .collect();

        let paragraph = Paragraph::new(lines)
            .block(Block::bordered().title(format!(" {} ", spec.title)))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_trend(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(spec) = model.trend() else {
            let note = model.trend_note().unwrap_or("No trend available.");
            let info =
                Paragraph::new(note).block(Block::bordered().title(" Monthly Shopping Trend "));
            frame.render_widget(info, area);
            return;
        };
        self.draw_trend_chart(spec, frame, area);
    }

    fn draw_trend_chart(&self, spec: &ChartSpec, frame: &mut Frame, area: Rect) {
        let points: Vec<(f64, f64)> = spec
            .values
            .iter()
            .enumerate()
            .map(|(idx, &count)| (idx as f64, count as f64))
            .collect();
        let max_y = spec.values.iter().copied().max().unwrap_or(1).max(1) as f64;
        let max_x = (spec.categories.len().saturating_sub(1)).max(1) as f64;

        let marker = match spec.kind {
            ChartKind::Line { markers: true } => Marker::Dot,
            _ => Marker::Braille,
        };
        let dataset = Dataset::default()
            .name("purchases")
            .marker(marker)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&points);

        let x_labels: Vec<String> = match spec.categories.len() {
            0 => vec![],
            1 => vec![spec.categories[0].clone()],
            n => vec![
                spec.categories[0].clone(),
                spec.categories[n / 2].clone(),
                spec.categories[n - 1].clone(),
            ],
        };
        let y_labels = vec!["0".to_string(), format!("{:.0}", max_y)];

        let chart = Chart::new(vec![dataset])
            .block(Block::bordered().title(format!(" {} ", spec.title)))
            .x_axis(
                Axis::default()
                    .title("Month")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, max_x])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(spec.y_label.clone().unwrap_or_default())
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, max_y])
                    .labels(y_labels),
            );
        frame.render_widget(chart, area);
    }

    fn draw_popup(&self, frame: &mut Frame, message: &str) {
        let area = centered_rect(frame.area(), 60, 70);
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(message)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Help (Esc closes) "));
        frame.render_widget(popup, area);
    }
}

fn truncated(name: &str, width: usize) -> String {
    if width < 3 {
        return String::new();
    }
    if name.chars().count() > width {
        let mut reduced: String = name.chars().take(width - 3).collect();
        reduced.push_str("...");
        reduced
    } else {
        name.to_string()
    }
}

fn pie_colors() -> impl Iterator<Item = Style> {
    [
        Color::Cyan,
        Color::Magenta,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Red,
        Color::LightCyan,
        Color::LightMagenta,
    ]
    .into_iter()
    .cycle()
    .map(|c| Style::default().fg(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_appends_ellipsis() {
        assert_eq!(truncated("Purchase Amount", 10), "Purchas...");
        assert_eq!(truncated("Age", 10), "Age");
        assert_eq!(truncated("Age", 2), "");
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
