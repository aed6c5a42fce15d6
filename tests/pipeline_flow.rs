// End-to-end pipeline tests against an in-memory feature service

#[cfg(test)]
mod tests {
    use agemix::config::Config;
    use agemix::engine::{Granularity, Selection};
    use agemix::feed::arcgis::parse_page;
    use agemix::feed::types::Page;
    use agemix::feed::FeatureSource;
    use agemix::pipeline::{self, AnalysisRequest};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Serves JSON bodies like the real layer would, paging through a fixed row set.
    struct FakeLayer {
        rows: Vec<serde_json::Value>,
        /// Offsets that answer with an `error` body once before succeeding.
        flaky_offsets: Vec<usize>,
        calls: usize,
    }

    #[async_trait]
    impl FeatureSource for FakeLayer {
        async fn fetch_page(&mut self, offset: usize, count: usize) -> Result<Page> {
            self.calls += 1;
            if let Some(pos) = self.flaky_offsets.iter().position(|o| *o == offset) {
                self.flaky_offsets.remove(pos);
                return parse_page(r#"{"error":{"code":500,"message":"Error performing query operation","details":[]}}"#);
            }
            let features: Vec<serde_json::Value> = self
                .rows
                .iter()
                .skip(offset)
                .take(count)
                .map(|attrs| serde_json::json!({ "attributes": attrs }))
                .collect();
            parse_page(&serde_json::json!({ "features": features }).to_string())
        }
    }

    fn noon_millis(m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(2020, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    fn row(county: &str, age: &str, died: &str, m: u32, d: u32) -> serde_json::Value {
        serde_json::json!({
            "County": county,
            "Age_group": age,
            "Died": died,
            "Case_": noon_millis(m, d),
            "EventDate": noon_millis(m, d),
            "ChartDate": noon_millis(m, d),
            "Jurisdiction": "FL resident",
        })
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.source.batch_size = 2;
        config.source.error_backoff_s = 0;
        config.source.page_delay_ms = 0;
        config
    }

    fn layer() -> FakeLayer {
        FakeLayer {
            rows: vec![
                row("Orange", "65-74 years", "No", 3, 1),
                row("Orange", "75-84 years", "Yes", 3, 1),
                row("Dade", "85+ years", "No", 3, 2),
                row("Dade", "25-34 years", "No", 3, 2),
                row("Leon", "65-74 years", "Yes", 3, 9),
            ],
            flaky_offsets: vec![2],
            calls: 0,
        }
    }

    #[tokio::test]
    async fn test_statewide_daily_run() {
        let mut source = layer();
        let request = AnalysisRequest { selection: Selection::default(), percentages: true };
        let report = pipeline::run(&mut source, &test_config(), &request).await.unwrap();

        // 3 pages of data, 1 retried error, 1 terminating empty page.
        assert_eq!(source.calls, 5);
        assert_eq!(report.records_fetched, 5);
        assert_eq!(report.series.granularity, Granularity::Daily);
        // Mar 1 through Mar 9 inclusive.
        assert_eq!(report.series.dates.len(), 9);
        assert_eq!(report.series.layers[0].values[0], 50.0);
        assert_eq!(report.series.layers[1].values[0], 50.0);
        // Mar 2: the 25-34 record is outside the 65+ groups.
        assert_eq!(report.series.layers[2].values[1], 100.0);
        assert_eq!(report.counties, vec!["Dade", "Leon", "Orange"]);
        assert_eq!(report.timings[0].step, "fetch");
    }

    #[tokio::test]
    async fn test_deaths_counts_weekly_run() {
        let mut source = layer();
        let request = AnalysisRequest {
            selection: Selection { county: None, deaths_only: true },
            percentages: false,
        };
        let report = pipeline::run(&mut source, &test_config(), &request).await.unwrap();
        assert_eq!(report.series.granularity, Granularity::Weekly);
        assert_eq!(report.records_selected, 2);
        // Mar 1 closes ISO week 9; Mar 9 falls in week 11.
        assert_eq!(
            report.series.dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
            ]
        );
        assert_eq!(report.series.layers[0].values, vec![0.0, 1.0]);
        assert_eq!(report.series.layers[1].values, vec![1.0, 0.0]);
        assert_eq!(
            report.title.text(),
            "Florida Covid-19 Deaths By Age Bracket, Week's Total"
        );
    }

    #[tokio::test]
    async fn test_all_ages_config() {
        let mut source = layer();
        let mut config = test_config();
        config.analysis.older_only = false;
        let request = AnalysisRequest {
            selection: Selection { county: Some("Dade".to_string()), deaths_only: false },
            percentages: true,
        };
        let report = pipeline::run(&mut source, &config, &request).await.unwrap();
        assert_eq!(report.series.layers.len(), 10);
        let young = report.series.layers.iter().find(|l| l.label == "25-34 years").unwrap();
        assert_eq!(young.values, vec![50.0]);
    }

    #[tokio::test]
    async fn test_list_counties_survives_flaky_page() {
        let mut source = layer();
        let names = pipeline::list_counties(&mut source, &test_config()).await.unwrap();
        assert_eq!(names, vec!["Dade", "Leon", "Orange"]);
        assert_eq!(source.calls, 5);
    }
}
