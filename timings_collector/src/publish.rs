use crate::aggregate::AggregatedReportRow;
use crate::render;
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::try_join;
use shared::s3::{list_keys, ObjectStore};
use std::collections::BTreeSet;
use tracing::info;

pub const ROOT_PREFIX: &str = "lambda-benchmarks";
pub const LATENCY_SECTION: &str = "runtime-invocation-latency";

pub const LATEST_CACHE_CONTROL: &str = "public, max-age=10";
pub const TIMESTAMPED_CACHE_CONTROL: &str = "public, max-age=3600";
pub const INDEX_CACHE_CONTROL: &str = "public, max-age=10";

/// UTC date and hour a run is filed under, fixed at the start of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub date: String,
    pub hour: String,
}

impl Partition {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            date: time.format("%Y-%m-%d").to_string(),
            hour: time.format("%H").to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!("date={}/hour={}", self.date, self.hour)
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Html,
    Json,
    Csv,
}

impl Format {
    fn extension(&self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Format::Html => "text/html",
            Format::Json => "application/json",
            Format::Csv => "text/csv",
        }
    }
}

fn section_key(suffix: &str) -> String {
    format!("{}/{}/{}", ROOT_PREFIX, LATENCY_SECTION, suffix)
}

pub async fn publish_report<O>(
    store: &O,
    rows: &[AggregatedReportRow],
    partition: &Partition,
) -> Result<()>
where
    O: ObjectStore + ?Sized,
{
    let outputs = [
        (Format::Html, render::to_html(rows, partition)),
        (Format::Json, render::to_json(rows)?),
        (Format::Csv, render::to_csv(rows)?),
    ];

    for (format, body) in outputs {
        let timestamped = section_key(&format!(
            "{}/timings.{}",
            partition.path(),
            format.extension()
        ));
        let latest = section_key(&format!("latest.{}", format.extension()));
        info!(timestamped = %timestamped, latest = %latest, "Writing timings");

        try_join(
            store.put_object(
                &timestamped,
                body.clone().into_bytes(),
                format.content_type(),
                TIMESTAMPED_CACHE_CONTROL,
            ),
            store.put_object(
                &latest,
                body.into_bytes(),
                format.content_type(),
                LATEST_CACHE_CONTROL,
            ),
        )
        .await?;
    }

    Ok(())
}

/// Rewrites the root and section indexes, plus the index of the newest day.
/// Older day indexes are left as they were.
pub async fn update_indexes<O>(store: &O) -> Result<()>
where
    O: ObjectStore + ?Sized,
{
    write_index(store, &format!("{}/index.html", ROOT_PREFIX), render::root_index()).await?;

    let days = find_days_with_content(store).await?;
    info!(days = ?days, "Found days with content");
    write_index(store, &section_key("index.html"), render::latency_index(&days)).await?;

    if let Some(day) = days.first() {
        let hours = find_hours_with_content(store, day).await?;
        write_index(
            store,
            &section_key(&format!("date={}/index.html", day)),
            render::day_index(day, &hours),
        )
        .await?;
    }

    Ok(())
}

async fn write_index<O>(store: &O, key: &str, html: String) -> Result<()>
where
    O: ObjectStore + ?Sized,
{
    store
        .put_object(key, html.into_bytes(), "text/html", INDEX_CACHE_CONTROL)
        .await
}

pub async fn find_days_with_content<O>(store: &O) -> Result<Vec<String>>
where
    O: ObjectStore + ?Sized,
{
    distinct_segments(store, &section_key("date=")).await
}

pub async fn find_hours_with_content<O>(store: &O, day: &str) -> Result<Vec<String>>
where
    O: ObjectStore + ?Sized,
{
    distinct_segments(store, &section_key(&format!("date={}/hour=", day))).await
}

async fn distinct_segments<O>(store: &O, prefix: &str) -> Result<Vec<String>>
where
    O: ObjectStore + ?Sized,
{
    let keys = list_keys(store, prefix).await?;

    let segments: BTreeSet<&str> = keys
        .iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter_map(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .collect();

    Ok(segments.into_iter().rev().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{row, MemoryStore};
    use chrono::TimeZone;
    use shared::matrix::RuntimeKind;

    #[test]
    fn partition_uses_utc_date_and_padded_hour() {
        let time = Utc.with_ymd_and_hms(2019, 1, 5, 7, 59, 59).unwrap();
        let partition = Partition::at(time);

        assert_eq!(partition.date, "2019-01-05");
        assert_eq!(partition.hour, "07");
        assert_eq!(partition.path(), "date=2019-01-05/hour=07");
    }

    #[tokio::test]
    async fn report_is_written_to_latest_and_partition() {
        let store = MemoryStore::default();
        let partition = Partition {
            date: "2019-01-15".to_string(),
            hour: "09".to_string(),
        };
        let rows = vec![row("us-west-2", RuntimeKind::NodeJs8, 256, 0.3)];

        publish_report(&store, &rows, &partition).await.unwrap();

        assert_eq!(store.keys().len(), 6);
        for extension in ["html", "json", "csv"] {
            let timestamped = store
                .get(&format!(
                    "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/hour=09/timings.{extension}"
                ))
                .unwrap();
            let latest = store
                .get(&format!("lambda-benchmarks/runtime-invocation-latency/latest.{extension}"))
                .unwrap();

            assert_eq!(timestamped.body, latest.body);
            assert_eq!(timestamped.content_type, latest.content_type);
            assert_eq!(timestamped.cache_control, "public, max-age=3600");
            assert_eq!(latest.cache_control, "public, max-age=10");
        }

        let csv = store
            .get("lambda-benchmarks/runtime-invocation-latency/latest.csv")
            .unwrap();
        assert_eq!(csv.content_type, "text/csv");
        assert!(csv.body.starts_with("region,runtime,memory"));
    }

    #[tokio::test]
    async fn days_are_found_across_pages_newest_first() {
        let store = MemoryStore::with_keys(&[
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-14/hour=23/timings.json",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/hour=00/timings.json",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/hour=01/timings.csv",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/index.html",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-13/hour=12/timings.html",
            "lambda-benchmarks/runtime-invocation-latency/latest.json",
        ]);

        let days = find_days_with_content(&store).await.unwrap();
        assert_eq!(days, vec!["2019-01-15", "2019-01-14", "2019-01-13"]);

        let hours = find_hours_with_content(&store, "2019-01-15").await.unwrap();
        assert_eq!(hours, vec!["01", "00"]);
        assert!(store.list_calls() > 2);
    }

    #[tokio::test]
    async fn indexes_cover_newest_day_only() {
        let store = MemoryStore::with_keys(&[
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-14/hour=23/timings.json",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/hour=08/timings.json",
            "lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/hour=09/timings.json",
        ]);

        update_indexes(&store).await.unwrap();

        let root = store.get("lambda-benchmarks/index.html").unwrap();
        assert_eq!(root.content_type, "text/html");

        let section = store
            .get("lambda-benchmarks/runtime-invocation-latency/index.html")
            .unwrap();
        assert!(section.body.contains("date%3D2019-01-15/index.html"));
        assert!(section.body.contains("date%3D2019-01-14/index.html"));

        let day = store
            .get("lambda-benchmarks/runtime-invocation-latency/date=2019-01-15/index.html")
            .unwrap();
        assert!(day.body.contains("hour%3D09/timings.html"));
        assert!(day.body.contains("hour%3D08/timings.html"));

        assert!(store
            .get("lambda-benchmarks/runtime-invocation-latency/date=2019-01-14/index.html")
            .is_none());
    }

    #[tokio::test]
    async fn empty_bucket_skips_day_index() {
        let store = MemoryStore::default();

        update_indexes(&store).await.unwrap();

        assert_eq!(
            store.keys(),
            vec![
                "lambda-benchmarks/index.html".to_string(),
                "lambda-benchmarks/runtime-invocation-latency/index.html".to_string(),
            ]
        );
    }
}
