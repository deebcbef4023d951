use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use order_profile_core::{DateRange, Granularity, ResolvedNode};
use order_profile_system_cascade::OrderProfile;
use serde::Serialize;

/// Output encoding of a resolved profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    /// One line per node followed by a total footer.
    Text,
    /// A single JSON document.
    Json,
}

#[derive(Serialize)]
struct JsonReport {
    granularity: Granularity,
    range: DateRange,
    total: u64,
    nodes: Vec<ResolvedNode>,
}

/// Writes the deepest resolved level of `profile` to `out`.
pub(crate) fn write(
    profile: &OrderProfile,
    format: ReportFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        ReportFormat::Text => write_text(profile, out),
        ReportFormat::Json => write_json(profile, out),
    }
    .context("failed to write report")
}

fn write_text(profile: &OrderProfile, out: &mut impl Write) -> Result<()> {
    let mut sum = 0;
    for node in profile.nodes() {
        writeln!(out, "{}", describe(&node))?;
        sum += node.orders();
    }
    writeln!(out, "Total Orders: {sum}")?;
    Ok(())
}

fn write_json(profile: &OrderProfile, out: &mut impl Write) -> Result<()> {
    let report = JsonReport {
        granularity: profile.granularity(),
        range: profile.range(),
        total: profile.total(),
        nodes: profile.nodes(),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

fn describe(node: &ResolvedNode) -> String {
    match node {
        ResolvedNode::Year(year) => format!(
            "Year: {}, Year Probability: {:.4}, Orders {}",
            year.period().year(),
            year.conditional(),
            year.orders()
        ),
        ResolvedNode::Month(month) => format!(
            "Year: {}, Month: {}, Month Probability: {:.4}, Cumulative: {:.6}, Orders {}",
            month.period().year(),
            month.period().month(),
            month.conditional(),
            month.cumulative(),
            month.orders()
        ),
        ResolvedNode::Day(day) => {
            let period = day.period();
            format!(
                "Year: {}, Month: {}, Day of Week: {}, Day of Month: {}, Day Probability: {:.4}, Cumulative: {:.8}, Orders {}",
                period.year(),
                period.month(),
                period.weekday(),
                period.day_of_month(),
                day.conditional(),
                day.cumulative(),
                day.orders()
            )
        }
        ResolvedNode::Hour(hour) => {
            let day = hour.period().day_period();
            format!(
                "Year: {}, Month: {}, Day of Week: {}, Day of Month: {}, Hour: {}, Hour Probability: {:.4}, Cumulative: {:.10}, Orders {}",
                day.year(),
                day.month(),
                day.weekday(),
                day.day_of_month(),
                hour.period().hour(),
                hour.conditional(),
                hour.cumulative(),
                hour.orders()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use order_profile_core::{HourShape, MonthWeights};
    use order_profile_system_apportion::GaussianNoise;
    use order_profile_system_cascade::{resolve, ProfileRequest};

    fn profile(granularity: Granularity) -> OrderProfile {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).expect("start");
        let end = NaiveDate::from_ymd_opt(2025, 1, 2).expect("end");
        let request = ProfileRequest::new(DateRange::new(start, end).expect("range"), 1_000)
            .with_month_weights(MonthWeights::uniform())
            .with_hour_shape(HourShape::uniform());
        resolve(&request, granularity, &mut GaussianNoise::seeded(0)).expect("profile")
    }

    fn render(profile: &OrderProfile, format: ReportFormat) -> String {
        let mut out = Vec::new();
        write(profile, format, &mut out).expect("report");
        String::from_utf8(out).expect("utf-8 report")
    }

    #[test]
    fn text_footer_matches_total() {
        let text = render(&profile(Granularity::Day), ReportFormat::Text);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "Total Orders: 1000");
        assert!(
            lines[0].starts_with("Year: 2024, Month: 12, Day of Week: Mon, Day of Month: 30,"),
            "{}",
            lines[0]
        );
        assert!(lines[0].ends_with("Orders 250"), "{}", lines[0]);
    }

    #[test]
    fn year_lines_name_each_year() {
        let text = render(&profile(Granularity::Year), ReportFormat::Text);

        assert_eq!(
            text,
            "Year: 2024, Year Probability: 0.5000, Orders 500\n\
             Year: 2025, Year Probability: 0.5000, Orders 500\n\
             Total Orders: 1000\n"
        );
    }

    #[test]
    fn hour_lines_include_the_hour() {
        let text = render(&profile(Granularity::Hour), ReportFormat::Text);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 4 * 24 + 1);
        assert!(lines[13].contains("Hour: 13,"), "{}", lines[13]);
        assert_eq!(lines[96], "Total Orders: 1000");
    }

    #[test]
    fn json_report_lists_tagged_nodes() {
        let json = render(&profile(Granularity::Month), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");

        assert_eq!(value["granularity"], "month");
        assert_eq!(value["total"], 1000);
        assert_eq!(value["range"]["start"], "2024-12-30");
        let nodes = value["nodes"].as_array().expect("nodes");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["granularity"], "month");
        assert_eq!(nodes[0]["period"]["month"], 12);
        assert_eq!(nodes[1]["orders"], 500);
    }
}
