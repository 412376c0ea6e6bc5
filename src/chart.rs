use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    #[serde(rename = "barh")]
    #[schemars(description = "Horizontal bars; labels run down the vertical axis")]
    BarH,
    Line,
    Pie,
    #[schemars(description = "Signed bars building up to a total in the last category")]
    Waterfall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartSeries {
    pub name: String,

    #[schemars(description = "One value per chart label; null where the series has no point")]
    pub values: Vec<Option<f64>>,
}

/// Everything a renderer needs to draw a chart. No pixels, no styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,

    #[schemars(description = "Horizontal reference line, e.g. zero cash")]
    pub baseline: Option<f64>,
}

impl ChartData {
    pub fn new(kind: ChartKind, title: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            x_label: None,
            y_label: None,
            labels,
            series: Vec::new(),
            baseline: None,
        }
    }

    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.push(ChartSeries {
            name: name.into(),
            values: values.into_iter().map(Some).collect(),
        });
        self
    }

    pub fn with_sparse_series(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.series.push(ChartSeries {
            name: name.into(),
            values,
        });
        self
    }

    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = Some(label.into());
        self
    }

    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = Some(label.into());
        self
    }

    pub fn with_baseline(mut self, value: f64) -> Self {
        self.baseline = Some(value);
        self
    }

    /// Values of the first series with gaps dropped.
    pub fn values(&self) -> Vec<f64> {
        self.series
            .first()
            .map(|s| s.values.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(ChartData))
    }
}
