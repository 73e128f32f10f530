// Ranking report for a locality.
// Sorts models by live orders and repurchase score and renders them as text tables.

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::widgets::{Block, Borders, Row, Table, Widget};
use unicode_width::UnicodeWidthStr;

/// Shown as the average when a model has no live order count.
pub const NOT_APPLICABLE: &str = "N/A";

const COLUMN_SPACING: u16 = 2;

/// One line of a ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedModel {
    pub rank: usize,
    pub model: String,
    pub value: i64,
}

/// Per-model metrics for one locality.
#[derive(Debug, Clone, Default)]
pub struct Report {
    counts: HashMap<String, u64>,
    scores: HashMap<String, i64>,
}

impl Report {
    pub fn new(counts: HashMap<String, u64>, scores: HashMap<String, i64>) -> Self {
        Self { counts, scores }
    }

    /// Top `top` models by live order count.
    pub fn by_orders(&self, top: usize) -> Vec<RankedModel> {
        rank(
            self.counts
                .iter()
                .map(|(model, count)| (model.as_str(), i64::try_from(*count).unwrap_or(i64::MAX))),
            top,
        )
    }

    /// Top `top` models by repurchase score.
    pub fn by_score(&self, top: usize) -> Vec<RankedModel> {
        rank(
            self.scores.iter().map(|(model, score)| (model.as_str(), *score)),
            top,
        )
    }

    /// Average score per live order for a model.
    pub fn average(&self, model: &str) -> String {
        let score = self.scores.get(model).copied().unwrap_or(0);
        format_average(score, self.counts.get(model).copied())
    }

    /// Render both rankings as text tables.
    pub fn render(&self, top: usize) -> String {
        let orders: Vec<Vec<String>> = self
            .by_orders(top)
            .into_iter()
            .map(|m| vec![m.rank.to_string(), m.model, m.value.to_string()])
            .collect();

        let scores: Vec<Vec<String>> = self
            .by_score(top)
            .into_iter()
            .map(|m| {
                let average = self.average(&m.model);
                vec![m.rank.to_string(), m.model, m.value.to_string(), average]
            })
            .collect();

        let mut out = render_table("Live orders by model", &["Rank", "Model", "Live orders"], &orders);
        out.push('\n');
        out.push_str(&render_table(
            "Repurchase score by model",
            &["Rank", "Model", "Score", "Avg score"],
            &scores,
        ));
        out
    }
}

/// Sort descending by value (ties by model name) and keep the first `top`.
pub fn rank<'a>(metrics: impl IntoIterator<Item = (&'a str, i64)>, top: usize) -> Vec<RankedModel> {
    let mut sorted: Vec<(&str, i64)> = metrics.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
        .into_iter()
        .take(top)
        .enumerate()
        .map(|(i, (model, value))| RankedModel {
            rank: i + 1,
            model: model.to_string(),
            value,
        })
        .collect()
}

/// Score divided by count with two decimals, or N/A for a missing or zero count.
pub fn format_average(score: i64, count: Option<u64>) -> String {
    match count {
        Some(count) if count > 0 => format!("{:.2}", score as f64 / count as f64),
        _ => NOT_APPLICABLE.to_string(),
    }
}

fn render_table(title: &str, header: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<u16> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].width())
                .chain(std::iter::once(header[col].width()))
                .max()
                .unwrap_or(0) as u16
        })
        .collect();

    let spacing = COLUMN_SPACING * (widths.len().saturating_sub(1)) as u16;
    let title = format!(" {} ", title);
    let inner_width = (widths.iter().sum::<u16>() + spacing).max(title.width() as u16);
    let area = Rect::new(0, 0, inner_width + 2, rows.len() as u16 + 3);

    let table = Table::new(
        rows.iter().map(|row| Row::new(row.iter().map(String::as_str))),
        widths.iter().map(|w| Constraint::Length(*w)),
    )
    .header(Row::new(header.iter().copied()))
    .column_spacing(COLUMN_SPACING)
    .block(Block::default().borders(Borders::ALL).title(title));

    let mut buffer = Buffer::empty(area);
    table.render(area, &mut buffer);
    buffer_text(&buffer)
}

/// Plain text of a rendered buffer, one line per row.
fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        let mut skip = 0;
        for x in area.left()..area.right() {
            // Cells covered by a wide character carry no symbol of their own
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let symbol = buffer[(x, y)].symbol();
            line.push_str(symbol);
            skip = symbol.width().saturating_sub(1);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries.iter().map(|(m, c)| (m.to_string(), *c)).collect()
    }

    fn scores(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(m, s)| (m.to_string(), *s)).collect()
    }

    #[test]
    fn test_rank_top_two() {
        let report = Report::new(counts(&[("A", 5), ("B", 3), ("C", 8)]), HashMap::new());

        let ranked = report.by_orders(2);
        assert_eq!(
            ranked,
            vec![
                RankedModel {
                    rank: 1,
                    model: "C".to_string(),
                    value: 8
                },
                RankedModel {
                    rank: 2,
                    model: "A".to_string(),
                    value: 5
                },
            ]
        );
    }

    #[test]
    fn test_rank_ties_by_name() {
        let ranked = rank([("b", 1), ("a", 1), ("c", 2)], 10);
        let models: Vec<&str> = ranked.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(models, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(120, Some(0)), NOT_APPLICABLE);
        assert_eq!(format_average(120, None), NOT_APPLICABLE);
        assert_eq!(format_average(100, Some(4)), "25.00");
        assert_eq!(format_average(10, Some(3)), "3.33");
    }

    #[test]
    fn test_average_uses_order_counts() {
        let report = Report::new(counts(&[("Han", 4)]), scores(&[("Han", 100), ("Qin", 30)]));

        assert_eq!(report.average("Han"), "25.00");
        assert_eq!(report.average("Qin"), NOT_APPLICABLE);
    }

    #[test]
    fn test_render() {
        let report = Report::new(
            counts(&[("Model 3", 4), ("秦PLUS", 2)]),
            scores(&[("Model 3", 100), ("秦PLUS", 30), ("Qin", 5)]),
        );

        let text = report.render(2);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("Live orders by model"));
        assert!(lines[1].contains("Rank") && lines[1].contains("Live orders"));
        assert!(lines[2].contains("1") && lines[2].contains("Model 3") && lines[2].contains("4"));
        assert!(lines[3].contains("2") && lines[3].contains("秦PLUS"));

        let score_line = lines
            .iter()
            .find(|line| line.contains("Model 3") && line.contains("25.00"))
            .expect("score row for Model 3");
        assert!(score_line.contains("100"));
        assert!(text.contains("15.00"));
        assert!(!text.contains("Qin"));
    }
}
