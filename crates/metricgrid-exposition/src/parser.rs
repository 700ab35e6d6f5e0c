//! Exposition text parser.
//!
//! Turns a scrape payload into a [`Snapshot`]. Parsing never fails:
//! anything that cannot be interpreted is skipped so that drift in an
//! exporter's output degrades to fewer samples instead of a failed scrape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::trace;

use metricgrid_core::{Labels, MetricMetadata, Sample, Snapshot};

use crate::labels::scan_label_block;

const HELP_PREFIX: &str = "# HELP ";
const TYPE_PREFIX: &str = "# TYPE ";

/// Parse a payload, stamping the snapshot with the current time.
pub fn parse(payload: &str) -> Snapshot {
    parse_at(payload, Utc::now())
}

/// Parse a payload retrieved at `retrieved_at`.
pub fn parse_at(payload: &str, retrieved_at: DateTime<Utc>) -> Snapshot {
    let mut samples = Vec::new();
    let mut metadata: BTreeMap<String, MetricMetadata> = BTreeMap::new();

    for raw in payload.split('\n') {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(HELP_PREFIX) {
            parse_help(rest, &mut metadata);
            continue;
        }

        if let Some(rest) = line.strip_prefix(TYPE_PREFIX) {
            parse_type(rest, &mut metadata);
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        match parse_sample(line) {
            Some(sample) => samples.push(sample),
            None => trace!(line, "skipping unparseable sample line"),
        }
    }

    Snapshot::new(samples, metadata, payload.to_string(), retrieved_at)
}

/// Split `"<name> <rest>"` into the name and the optional trimmed rest.
fn split_directive(rest: &str) -> Option<(&str, Option<&str>)> {
    let rest = rest.trim_start();
    let (name, tail) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, (!tail.is_empty()).then_some(tail)))
}

fn parse_help(rest: &str, metadata: &mut BTreeMap<String, MetricMetadata>) {
    let Some((name, help)) = split_directive(rest) else {
        return;
    };
    let entry = metadata.entry(name.to_string()).or_default();
    if let Some(help) = help {
        entry.help = Some(help.to_string());
    }
}

fn parse_type(rest: &str, metadata: &mut BTreeMap<String, MetricMetadata>) {
    let Some((name, Some(tail))) = split_directive(rest) else {
        return;
    };
    let metric_type = tail.split_whitespace().next().unwrap_or(tail);
    metadata.entry(name.to_string()).or_default().metric_type = Some(metric_type.to_string());
}

/// Parse `name[{labels}] value [timestamp]`.
fn parse_sample(line: &str) -> Option<Sample> {
    let (name, labels, rest) = split_series(line)?;

    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let mut tokens = rest.split_whitespace();
    let value = tokens.next()?;
    let timestamp = tokens.next().and_then(|token| token.parse::<i64>().ok());

    Some(Sample {
        name: name.to_string(),
        labels,
        value: value.to_string(),
        timestamp,
    })
}

/// Separate the series identifier from the value part of a sample line.
///
/// When a well-formed label block follows the name, the identifier ends at
/// its closing brace, so label values may contain spaces. Otherwise the line
/// is split at its first space and the whole left side becomes the name.
fn split_series(line: &str) -> Option<(&str, Labels, &str)> {
    let first_space = line.find(' ')?;
    if first_space == 0 {
        return None;
    }

    if let Some(open) = line[..first_space].find('{') {
        if open > 0 {
            if let Ok((labels, consumed)) = scan_label_block(&line[open + 1..]) {
                let end = open + 1 + consumed;
                if line[end..].starts_with(' ') {
                    return Some((&line[..open], labels, &line[end + 1..]));
                }
            }
        }
    }

    Some((&line[..first_space], Labels::new(), &line[first_space + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metadata_and_samples() {
        let payload = "# HELP my_counter Total items\n# TYPE my_counter counter\nmy_counter{status=\"ok\"} 5 123";
        let snapshot = parse(payload);

        assert_eq!(snapshot.samples().len(), 1);
        let sample = &snapshot.samples()[0];
        assert_eq!(sample.name, "my_counter");
        assert_eq!(sample.labels.get("status"), Some("ok"));
        assert_eq!(sample.labels.len(), 1);
        assert_eq!(sample.value, "5");
        assert_eq!(sample.timestamp, Some(123));

        let meta = snapshot.metadata_for("my_counter").unwrap();
        assert_eq!(meta.metric_type.as_deref(), Some("counter"));
        assert_eq!(meta.help.as_deref(), Some("Total items"));
    }

    #[test]
    fn handles_escaped_labels() {
        let payload = r#"demo_metric{path="/api/v1",note="line\nfeed",quote="\""} 1"#;
        let snapshot = parse(payload);

        assert_eq!(snapshot.samples().len(), 1);
        let sample = &snapshot.samples()[0];
        assert_eq!(sample.name, "demo_metric");
        assert_eq!(sample.labels.get("path"), Some("/api/v1"));
        assert_eq!(sample.labels.get("note"), Some("line\nfeed"));
        assert_eq!(sample.labels.get("quote"), Some("\""));
    }

    #[test]
    fn metadata_fields_merge_independently() {
        let payload = "# TYPE m gauge\n# HELP m Queue depth\n# TYPE m counter";
        let snapshot = parse(payload);
        let meta = snapshot.metadata_for("m").unwrap();
        assert_eq!(meta.metric_type.as_deref(), Some("counter"));
        assert_eq!(meta.help.as_deref(), Some("Queue depth"));
    }

    #[test]
    fn help_without_text_keeps_existing_help() {
        let payload = "# HELP m First\n# HELP m";
        let snapshot = parse(payload);
        assert_eq!(snapshot.metadata_for("m").unwrap().help.as_deref(), Some("First"));
    }

    #[test]
    fn help_keeps_inner_spacing() {
        let snapshot = parse("# HELP m   Number of   things  ");
        assert_eq!(
            snapshot.metadata_for("m").unwrap().help.as_deref(),
            Some("Number of   things")
        );
    }

    #[test]
    fn type_without_value_is_ignored() {
        let snapshot = parse("# TYPE m");
        assert!(snapshot.metadata_for("m").is_none());
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let payload = "\n# just a comment\n   \n#EOF\nup 1\n";
        let snapshot = parse(payload);
        assert_eq!(snapshot.samples().len(), 1);
        assert_eq!(snapshot.samples()[0].name, "up");
        assert!(snapshot.metadata().is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let snapshot = parse("# TYPE up gauge\r\nup 1\r\n");
        assert_eq!(snapshot.samples().len(), 1);
        assert_eq!(snapshot.samples()[0].value, "1");
    }

    #[test]
    fn lines_without_value_are_skipped() {
        let snapshot = parse("lonely_metric\nspaced_metric   \nok 2");
        assert_eq!(snapshot.samples().len(), 1);
        assert_eq!(snapshot.samples()[0].name, "ok");
    }

    #[test]
    fn value_kept_as_raw_token() {
        let snapshot = parse("a 1.50e+03\nb +Inf\nc NaN\nd 007");
        let values: Vec<&str> = snapshot.samples().iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["1.50e+03", "+Inf", "NaN", "007"]);
    }

    #[test]
    fn non_integer_timestamp_ignored_and_extra_tokens_dropped() {
        let snapshot = parse("a 1 12.5\nb 2 1700000000000 extra tokens");
        assert_eq!(snapshot.samples()[0].timestamp, None);
        assert_eq!(snapshot.samples()[1].timestamp, Some(1_700_000_000_000));
        assert_eq!(snapshot.samples()[1].value, "2");
    }

    #[test]
    fn malformed_labels_fall_back_to_literal_name() {
        let snapshot = parse("broken{a=1} 3\nunclosed{a=\"1\" 4");
        assert_eq!(snapshot.samples().len(), 2);
        assert_eq!(snapshot.samples()[0].name, "broken{a=1}");
        assert!(snapshot.samples()[0].labels.is_empty());
        assert_eq!(snapshot.samples()[0].value, "3");
        assert_eq!(snapshot.samples()[1].name, "unclosed{a=\"1\"");
        assert_eq!(snapshot.samples()[1].value, "4");
    }

    #[test]
    fn label_values_with_spaces() {
        let snapshot = parse(r#"build_info{version="1.2 beta",os="linux"} 1"#);
        let sample = &snapshot.samples()[0];
        assert_eq!(sample.name, "build_info");
        assert_eq!(sample.labels.get("version"), Some("1.2 beta"));
        assert_eq!(sample.value, "1");
    }

    #[test]
    fn empty_label_block() {
        let snapshot = parse("up{} 1");
        assert_eq!(snapshot.samples()[0].name, "up");
        assert!(snapshot.samples()[0].labels.is_empty());
    }

    #[test]
    fn samples_keep_payload_order() {
        let snapshot = parse("c 3\na 1\nb 2\na{x=\"y\"} 4");
        let names: Vec<&str> = snapshot.samples().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b", "a"]);
    }

    #[test]
    fn parsing_is_idempotent() {
        let payload = "# HELP req Requests\n# TYPE req counter\nreq{code=\"200\"} 10\nreq{code=\"500\"} 2 99\nmem 1024";
        let first = parse(payload);
        let second = parse(payload);
        assert_eq!(first.samples(), second.samples());
        assert_eq!(first.metadata(), second.metadata());
        assert_eq!(first.raw_payload(), payload);
    }

    #[test]
    fn parse_at_uses_given_timestamp() {
        let at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = parse_at("up 1", at);
        assert_eq!(snapshot.retrieved_at(), at);
    }
}
