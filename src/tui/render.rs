use super::state::ChartView;
use crate::chart::{edges_at, layer_color};
use crate::chart::png::y_max;
use crate::engine::Granularity;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph},
    Frame,
};

/// Samples per terminal column; braille cells are two dots wide.
const SAMPLES_PER_COLUMN: usize = 2;

pub fn draw(f: &mut Frame, view: &ChartView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    draw_chart(f, view, chunks[0]);
    draw_footer(f, view, chunks[1]);
}

/// Stacked layer points, top layer first so lower layers paint over it.
///
/// Each layer is drawn as bars from zero up to its cumulative edge, which leaves
/// the visible band between its edge and the edge of the layer below.
pub fn layer_points(view: &ChartView, samples: usize) -> Vec<Vec<(f64, f64)>> {
    let series = &view.series;
    if series.is_empty() || series.layers.is_empty() {
        return vec![Vec::new(); series.layers.len()];
    }
    let stacked = series.stacked();
    let span = (series.dates[series.dates.len() - 1] - series.dates[0]).num_days() as f64;
    let samples = samples.max(2);

    let mut points = vec![Vec::with_capacity(samples); stacked.len()];
    for i in 0..samples {
        let t = i as f64 / (samples - 1) as f64;
        for (layer, edge) in edges_at(series, &stacked, t).into_iter().enumerate() {
            points[layer].push((t * span, edge));
        }
    }
    points.reverse();
    points
}

fn draw_chart(f: &mut Frame, view: &ChartView, area: Rect) {
    let series = &view.series;
    let samples = (area.width as usize).saturating_mul(SAMPLES_PER_COLUMN);
    let points = layer_points(view, samples);

    let datasets: Vec<Dataset> = points
        .iter()
        .zip(series.layers.iter().enumerate().rev())
        .map(|(data, (i, layer))| {
            let (r, g, b) = layer_color(i);
            Dataset::default()
                .name(layer.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Bar)
                .style(Style::default().fg(Color::Rgb(r, g, b)))
                .data(data)
        })
        .collect();

    let span = match (series.dates.first(), series.dates.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days() as f64,
        _ => 0.0,
    };
    let x_labels: Vec<Span> = match (series.dates.first(), series.dates.last()) {
        (Some(first), Some(last)) => {
            let mid = *first + chrono::Duration::days((span / 2.0) as i64);
            vec![
                Span::raw(first.format("%b %d").to_string()),
                Span::raw(mid.format("%b %d").to_string()),
                Span::raw(last.format("%b %d").to_string()),
            ]
        }
        _ => Vec::new(),
    };

    let y_top = y_max(series);
    let y_title = if series.percentages { "% of total" } else { "cases" };
    let y_labels = vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", y_top / 2.0)),
        Span::raw(format!("{:.0}", y_top)),
    ];

    let x_title = match series.granularity {
        Granularity::Daily => "day",
        Granularity::Weekly => "week ending",
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(
                    format!(" {} ", view.title),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title(x_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, span.max(1.0)])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(y_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_top])
                .labels(y_labels),
        )
        .legend_position(if view.show_legend { Some(LegendPosition::TopRight) } else { None })
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}

fn draw_footer(f: &mut Frame, view: &ChartView, area: Rect) {
    let line = Line::from(vec![
        Span::styled("  [q]", Style::default().fg(Color::Yellow)),
        Span::raw("uit  "),
        Span::styled("[l]", Style::default().fg(Color::Yellow)),
        Span::raw("egend  "),
        Span::styled(
            format!(
                "{} records, {} points, {}",
                view.record_count,
                view.series.dates.len(),
                view.date_span()
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChartSeries, Layer};
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn view() -> ChartView {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let series = ChartSeries {
            dates: vec![start, start + chrono::Duration::days(10)],
            layers: vec![
                Layer { label: "65-74 years".to_string(), values: vec![60.0, 20.0] },
                Layer { label: "75-84 years".to_string(), values: vec![40.0, 80.0] },
            ],
            granularity: Granularity::Daily,
            percentages: true,
        };
        ChartView::new("Florida Covid-19 Positives".to_string(), series, 42)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_layer_points_top_layer_first() {
        let pts = layer_points(&view(), 3);
        assert_eq!(pts.len(), 2);
        // Top layer is the cumulative total: always 100 in a percentage chart.
        assert!(pts[0].iter().all(|(_, y)| (*y - 100.0).abs() < 1e-9));
        assert_eq!(pts[1][0], (0.0, 60.0));
        assert_eq!(pts[1][1], (5.0, 40.0));
        assert_eq!(pts[1][2], (10.0, 20.0));
    }

    #[test]
    fn test_draw_shows_title_legend_and_footer() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let v = view();
        terminal.draw(|f| draw(f, &v)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Florida Covid-19 Positives"));
        assert!(text.contains("75-84 years"));
        assert!(text.contains("42 records, 2 points, 2020-03-01 .. 2020-03-11"));
    }

    #[test]
    fn test_hidden_legend() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut v = view();
        v.toggle_legend();
        terminal.draw(|f| draw(f, &v)).unwrap();
        assert!(!screen_text(&terminal).contains("65-74 years"));
    }

    #[test]
    fn test_draw_empty_series() {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let mut v = view();
        v.series.dates.clear();
        for layer in &mut v.series.layers {
            layer.values.clear();
        }
        terminal.draw(|f| draw(f, &v)).unwrap();
        assert!(screen_text(&terminal).contains("no data"));
    }
}
