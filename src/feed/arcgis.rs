use super::types::*;
use super::FeatureSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::SourceConfig;

/// ArcGIS FeatureServer layer, queried with `resultOffset`/`resultRecordCount` paging.
pub struct ArcGisSource {
    client: Client,
    query_url: String,
}

impl ArcGisSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            query_url: config.query_url.trim_end_matches('/').to_string(),
        })
    }

    fn query_params(offset: usize, count: usize) -> Vec<(&'static str, String)> {
        vec![
            ("where", "1=1".to_string()),
            ("outFields", "*".to_string()),
            ("resultType", "none".to_string()),
            ("returnGeometry", "false".to_string()),
            ("returnIdsOnly", "false".to_string()),
            ("returnCountOnly", "false".to_string()),
            ("returnDistinctValues", "false".to_string()),
            ("cacheHint", "false".to_string()),
            ("sqlFormat", "none".to_string()),
            ("resultOffset", offset.to_string()),
            ("resultRecordCount", count.to_string()),
            ("f", "json".to_string()),
        ]
    }
}

/// Decode a `query` response body.
pub fn parse_page(body: &str) -> Result<Page> {
    let resp: QueryResponse = serde_json::from_str(body)
        .context("failed to parse feature service response")?;

    if let Some(err) = resp.error {
        return Ok(Page::ServerError(QueryError::from_value(err).describe()));
    }

    let Some(features) = resp.features else {
        return Ok(Page::End);
    };
    if features.is_empty() {
        return Ok(Page::Records(Vec::new()));
    }

    let records: Vec<CaseRecord> = features.into_iter().filter_map(|f| f.attributes).collect();
    if records.is_empty() {
        return Ok(Page::End);
    }
    Ok(Page::Records(records))
}

#[async_trait]
impl FeatureSource for ArcGisSource {
    async fn fetch_page(&mut self, offset: usize, count: usize) -> Result<Page> {
        let resp = self
            .client
            .get(&self.query_url)
            .query(&Self::query_params(offset, count))
            .send()
            .await
            .with_context(|| format!("feature service request failed at offset {}", offset))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("feature service query failed ({}): {}", status, body);
        }

        let body = resp.text().await.context("failed to read feature service response")?;
        parse_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let body = r#"{
            "objectIdFieldName": "ObjectId",
            "exceededTransferLimit": true,
            "features": [
                {"attributes": {"County": "Orange", "Age_group": "65-74 years", "Died": "Yes",
                                "Case_": 1583841600000, "EventDate": 1584014400000, "ChartDate": null,
                                "Gender": "Female", "ObjectId": 1}},
                {"attributes": {"County": "Dade", "Age_group": "85+ years", "Died": null,
                                "Case_": 1583841600000, "EventDate": 1584014400000, "ChartDate": 1584273600000}}
            ]
        }"#;
        let Page::Records(records) = parse_page(body).unwrap() else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].county.as_deref(), Some("Orange"));
        assert!(records[0].died());
        assert_eq!(records[0].chart_date, None);
        assert!(!records[1].died());
        assert_eq!(records[1].chart_date, Some(1_584_273_600_000));
    }

    #[test]
    fn test_parse_error_object() {
        let body = r#"{"error": {"code": 400, "message": "Cannot perform query. Invalid query parameters.", "details": ["Unable to perform query"]}}"#;
        match parse_page(body).unwrap() {
            Page::ServerError(msg) => {
                assert!(msg.starts_with("Cannot perform query"));
                assert!(msg.contains("code 400"));
                assert!(msg.contains("Unable to perform query"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_with_null_fields_still_retries() {
        let body = r#"{"error":{"code":500,"message":"Error performing query operation","details":null}}"#;
        assert_eq!(
            parse_page(body).unwrap(),
            Page::ServerError("Error performing query operation (code 500)".to_string())
        );

        let body = r#"{"error":{"code":504,"message":null}}"#;
        assert_eq!(
            parse_page(body).unwrap(),
            Page::ServerError("unspecified server error (code 504)".to_string())
        );
    }

    #[test]
    fn test_parse_error_with_unexpected_shape() {
        assert!(matches!(parse_page(r#"{"error":{}}"#).unwrap(), Page::ServerError(_)));
        assert!(matches!(parse_page(r#"{"error":"timeout"}"#).unwrap(), Page::ServerError(_)));
        assert!(matches!(
            parse_page(r#"{"error":{"code":"500","details":[{"field":"x"}]}}"#).unwrap(),
            Page::ServerError(_)
        ));
    }

    #[test]
    fn test_parse_without_features_is_end() {
        assert_eq!(parse_page(r#"{"fields": []}"#).unwrap(), Page::End);
        assert_eq!(parse_page(r#"{"features": [{}]}"#).unwrap(), Page::End);
    }

    #[test]
    fn test_parse_empty_features() {
        assert_eq!(parse_page(r#"{"features": []}"#).unwrap(), Page::Records(vec![]));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_page("<html>502 Bad Gateway</html>").is_err());
    }

    #[test]
    fn test_query_params_carry_paging() {
        let params = ArcGisSource::query_params(4000, 2000);
        assert!(params.contains(&("resultOffset", "4000".to_string())));
        assert!(params.contains(&("resultRecordCount", "2000".to_string())));
        assert!(params.contains(&("f", "json".to_string())));
    }
}
