use serde::Deserialize;

/// One case-line row, reduced to the attributes the analysis reads.
/// Dates are epoch milliseconds; any of them may be null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "County", default)]
    pub county: Option<String>,
    #[serde(rename = "Age_group", default)]
    pub age_group: Option<String>,
    #[serde(rename = "Died", default)]
    pub died: Option<String>,
    #[serde(rename = "Case_", default)]
    pub case_date: Option<i64>,
    #[serde(rename = "EventDate", default)]
    pub event_date: Option<i64>,
    #[serde(rename = "ChartDate", default)]
    pub chart_date: Option<i64>,
}

impl CaseRecord {
    pub fn died(&self) -> bool {
        self.died.as_deref() == Some("Yes")
    }
}

/// Result of one page request, after the body has been decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Records(Vec<CaseRecord>),
    /// The service answered 200 but the body carried an `error` object.
    ServerError(String),
    /// No `features` (or no `attributes` within them): the dataset is exhausted.
    End,
}

/// FeatureServer `query` response body (`f=json`).
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    /// Kept loose: any `error` object means back off and retry, whatever its shape.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Vec<String>>,
}

impl QueryError {
    /// Best-effort reading of an `error` value; unexpected shapes give an empty error.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn describe(&self) -> String {
        let mut message = self
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "unspecified server error".to_string());
        if let Some(code) = self.code {
            message = format!("{} (code {})", message, code);
        }
        match self.details.as_deref() {
            Some(details) if !details.is_empty() => format!("{}: {}", message, details.join("; ")),
            _ => message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Option<CaseRecord>,
}
