use crate::chart::ChartData;
use crate::engine::Answer;
use crate::error::Result;
use crate::utils::format_amount;
use serde::{Deserialize, Serialize};

pub const REPORT_TITLE: &str = "CFO Copilot Report";
pub const TRANSCRIPT_TITLE: &str = "CFO Copilot Conversation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub query: String,
    pub answer: Answer,
}

/// Questions and answers of the current session, in order. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    exchanges: Vec<Exchange>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, query: impl Into<String>, answer: Answer) {
        self.exchanges.push(Exchange {
            query: query.into(),
            answer,
        });
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Turns answers into something a user can read or download.
pub trait Renderer {
    type Output;

    fn render_answer(&self, query: &str, answer: &Answer) -> Self::Output;

    fn render_transcript(&self, transcript: &Transcript) -> Self::Output;
}

/// Markdown export. Charts become tables of their data.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn write_exchange(&self, out: &mut String, query: &str, answer: &Answer) {
        out.push_str(&format!("**Question:** {}\n\n", query));
        out.push_str(&answer.summary);
        out.push_str("\n\n");
        if let Some(chart) = &answer.chart {
            out.push_str(&chart_table(chart));
            out.push('\n');
        }
    }
}

impl Renderer for MarkdownRenderer {
    type Output = String;

    fn render_answer(&self, query: &str, answer: &Answer) -> String {
        let mut out = format!("# {}\n\n", REPORT_TITLE);
        self.write_exchange(&mut out, query, answer);
        out
    }

    fn render_transcript(&self, transcript: &Transcript) -> String {
        let mut out = format!("# {}\n\n", TRANSCRIPT_TITLE);
        if transcript.is_empty() {
            out.push_str("_No questions asked yet._\n");
            return out;
        }

        for (idx, exchange) in transcript.exchanges().iter().enumerate() {
            if idx > 0 {
                out.push_str("---\n\n");
            }
            self.write_exchange(&mut out, &exchange.query, &exchange.answer);
        }
        out
    }
}

fn chart_table(chart: &ChartData) -> String {
    let mut out = format!("**{}**\n\n", chart.title);

    let header: Vec<&str> = std::iter::once("")
        .chain(chart.series.iter().map(|s| s.name.as_str()))
        .collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("|{}\n", "---|".repeat(header.len())));

    for (idx, label) in chart.labels.iter().enumerate() {
        let cells: Vec<String> = chart
            .series
            .iter()
            .map(|s| match s.values.get(idx).copied().flatten() {
                Some(value) => format_amount(value),
                None => String::new(),
            })
            .collect();
        out.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;

    fn sample_answer() -> Answer {
        Answer::with_chart(
            "**Revenue for June 2025:**",
            ChartData::new(
                ChartKind::Bar,
                "Revenue vs. Budget for June 2025",
                vec!["Actual".to_string(), "Budget".to_string()],
            )
            .with_series("Revenue", vec![100_000.0, 90_000.0]),
        )
    }

    #[test]
    fn test_render_single_answer() {
        let markdown = MarkdownRenderer.render_answer("June revenue vs budget?", &sample_answer());

        assert!(markdown.starts_with("# CFO Copilot Report"));
        assert!(markdown.contains("**Question:** June revenue vs budget?"));
        assert!(markdown.contains("| Actual | 100,000.00 |"));
        assert!(markdown.contains("| Budget | 90,000.00 |"));
    }

    #[test]
    fn test_render_transcript() {
        let mut transcript = Transcript::new();
        transcript.record("June revenue vs budget?", sample_answer());
        transcript.record("Capital of France?", Answer::text("Sorry"));

        let markdown = MarkdownRenderer.render_transcript(&transcript);
        assert!(markdown.starts_with("# CFO Copilot Conversation"));
        assert_eq!(markdown.matches("**Question:**").count(), 2);
        assert!(markdown.contains("---"));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_empty_transcript() {
        let markdown = MarkdownRenderer.render_transcript(&Transcript::new());
        assert!(markdown.contains("No questions asked yet"));
    }

    #[test]
    fn test_sparse_series_leave_blank_cells() {
        let chart = ChartData::new(
            ChartKind::Line,
            "Cash",
            vec!["Jan 2025".to_string(), "Feb 2025".to_string()],
        )
        .with_sparse_series("Historical Cash", vec![Some(10.0), None])
        .with_sparse_series("Projected", vec![None, Some(5.0)]);

        let table = chart_table(&chart);
        assert!(table.contains("| Jan 2025 | 10.00 |  |"));
        assert!(table.contains("| Feb 2025 |  | 5.00 |"));
    }

    #[test]
    fn test_clear_starts_a_new_session() {
        let mut transcript = Transcript::new();
        transcript.record("q", sample_answer());
        transcript.clear();

        assert!(transcript.is_empty());
        assert!(MarkdownRenderer
            .render_transcript(&transcript)
            .contains("No questions asked yet"));
    }

    #[test]
    fn test_transcript_json() {
        let mut transcript = Transcript::new();
        transcript.record("q", Answer::text("a"));
        let json = transcript.to_json().unwrap();
        assert!(json.contains("\"query\": \"q\""));
        assert!(json.contains("\"chart\": null"));
    }
}
