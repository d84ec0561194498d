use crate::aggregate::AggregatedReportRow;
use crate::publish::Partition;
use anyhow::Result;
use html_escape::encode_text;

pub const CSV_HEADER: [&str; 15] = [
    "region",
    "runtime",
    "memory",
    "packageSize",
    "vpc",
    "generatorID",
    "systemDuration",
    "userDuration",
    "totalDuration",
    "traceId",
    "startTime",
    "startFullDateTime",
    "minOtherSystemDurations",
    "maxOtherSystemDurations",
    "timingsCaptured",
];

pub fn to_json(rows: &[AggregatedReportRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Header is always written, even for an empty report.
pub fn to_csv(rows: &[AggregatedReportRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

pub fn to_html(rows: &[AggregatedReportRow], partition: &Partition) -> String {
    let link_prefix = format!("/runtime-invocation-latency/{}", partition.path());

    let table_rows: String = rows
        .iter()
        .map(|row| {
            let cells = [
                row.region.clone(),
                row.runtime.to_string(),
                row.memory.to_string(),
                row.package_size.clone(),
                if row.vpc { "yes" } else { "no" }.to_string(),
                row.system_duration.to_string(),
                row.user_duration.to_string(),
                row.total_duration.to_string(),
                row.start_full_date_time.clone(),
                row.generator_id.clone(),
            ];
            let cells: String = cells
                .iter()
                .map(|cell| format!("\n        <td>{}</td>", encode_text(cell)))
                .collect();
            format!("\n      <tr>{}\n      </tr>", cells)
        })
        .collect();

    page(&format!(
        r#"
    <h3>Lambda Benchmarking</h3>
    <p>
      Lambda benchmark data generated during the {hour}:00 hour on {date}.
      See <a href="/runtime-invocation-latency/index.html">here</a> for historical data.
    </p>
    <p>
      Machine readable versions are available in <a href="{link_prefix}/timings.json">JSON</a> and
      <a href="{link_prefix}/timings.csv">CSV</a>.
    </p>
    <table class="table table-striped table-condensed">
      <tr>
        <th>Region</th>
        <th>Runtime</th>
        <th>Memory</th>
        <th>Package Size</th>
        <th>Uses VPC?</th>
        <th>System Duration</th>
        <th>User Duration</th>
        <th>Total Duration</th>
        <th>Start Time</th>
        <th>Generator ID</th>
      </tr>{table_rows}
    </table>"#,
        hour = partition.hour,
        date = partition.date,
    ))
}

pub fn root_index() -> String {
    page(
        r#"
    <h1>Lambda Benchmarking</h1>
    <ul>
      <li><a href="/runtime-invocation-latency/index.html">Invocation Latency (Cold Start Analysis, etc.)</a></li>
    </ul>"#,
    )
}

/// `days` newest first. `=` is percent-encoded in links so that S3 website
/// hosting resolves the partition keys.
pub fn latency_index(days: &[String]) -> String {
    let items: String = days
        .iter()
        .map(|day| {
            let day = encode_text(day);
            format!("\n      <li><a href=\"date%3D{day}/index.html\">{day}</a></li>")
        })
        .collect();

    page(&format!(
        r#"
    <h1>Lambda Benchmarking</h1>
    <h2>Invocation Latency (for Cold Start analysis)</h2>
    <p><a href="latest.html"><b>Latest Timings</b></a>, also available in <a href="latest.json">JSON</a> and <a href="latest.csv">CSV</a></p>
    <p>Historical data available for the following dates:</p>
    <ul>{items}
    </ul>"#
    ))
}

pub fn day_index(day: &str, hours: &[String]) -> String {
    let table_rows: String = hours
        .iter()
        .map(|hour| {
            let hour = encode_text(hour);
            format!(
                r#"
    <tr>
      <td>{hour}:00</td>
      <td><a href="hour%3D{hour}/timings.html">HTML</a></td>
      <td><a href="hour%3D{hour}/timings.json">JSON</a></td>
      <td><a href="hour%3D{hour}/timings.csv">CSV</a></td>
    </tr>"#
            )
        })
        .collect();

    page(&format!(
        r#"
  <h3>Lambda Benchmarking</h3>
  <h2>Invocation Latency for {day} by hour</h2>
  <p>See <a href="/runtime-invocation-latency/index.html">here</a> for historical data.</p>
  <table class="table table-striped table-condensed">
    <tr>
      <th>Hour</th>
      <th>HTML</th>
      <th>JSON</th>
      <th>CSV</th>
    </tr>{table_rows}
  </table>"#,
        day = encode_text(day),
    ))
}

fn page(content: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Lambda Benchmarking</title>
    <link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/3.4.0/css/bootstrap.min.css" integrity="sha384-PmY9l28YgO4JwMKbTvgaS7XNZJ30MK9FAZjjzXtlqyZCqBY6X6bXIkM++IkyinN+" crossorigin="anonymous">
    <link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/3.4.0/css/bootstrap-theme.min.css" integrity="sha384-jzngWsPS6op3fgRCDTESqrEJwRKck+CILhJVO5VvaAZCq8JYf8HsR/HPpBOOPZfR" crossorigin="anonymous">
  </head>
  <body>
    <div class="container">{content}
    </div>
  </body>
</html>
"#
    )
}
