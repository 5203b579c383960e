//! Presentation-only timeline reports.
//!
//! Two read-only consumers of per-node timelines: a span exporter that
//! flattens a timeline into normalized colored duration bars, and an HTML
//! table report with the same semantics. Neither touches scheduler state;
//! both render an empty timeline as one full-width continuous bar.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::scene::{Control, NodeId, Scene};
use crate::segment::SegmentKind;
use crate::timeline::Timeline;

/// One normalized duration bar: `x` and `width` are fractions of the
/// reported scene duration, clamped to `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SegmentKind,
    pub x: f64,
    pub width: f64,
}

/// Flatten a timeline into ordered spans over `[0, duration)`.
///
/// Time before the first declared segment is implicitly continuous, so a
/// leading `Cont` span is emitted when the first segment starts after 0
/// (or when the timeline is empty).
pub fn timeline_spans(timeline: &Timeline, duration: f64) -> Vec<Span> {
    let mut spans = Vec::new();
    if duration <= 0.0 {
        return spans;
    }
    let segments = timeline.segments();

    let first_start = segments.first().map_or(duration, |seg| seg.start_time);
    if first_start > 0.0 {
        push_span(&mut spans, SegmentKind::Cont, 0.0, first_start.min(duration), duration);
    }

    for (i, seg) in segments.iter().enumerate() {
        let end = segments
            .get(i + 1)
            .map_or(duration, |next| next.start_time);
        push_span(&mut spans, seg.kind, seg.start_time, end, duration);
    }
    spans
}

fn push_span(spans: &mut Vec<Span>, kind: SegmentKind, start: f64, end: f64, duration: f64) {
    let start = start.clamp(0.0, duration);
    let end = end.clamp(0.0, duration);
    if end > start {
        spans.push(Span {
            kind,
            x: start / duration,
            width: (end - start) / duration,
        });
    }
}

/// A labelled timeline row for the HTML report.
#[derive(Copy, Clone, Debug)]
pub struct ReportRow<'a> {
    pub label: &'a str,
    pub timeline: &'a Timeline,
}

/// Collect one report row per time-gated node, in scene traversal order.
pub fn scene_rows(scene: &Scene) -> Vec<ReportRow<'_>> {
    let mut rows = Vec::new();
    collect_rows(scene, scene.root(), &mut rows);
    rows
}

fn collect_rows<'a>(scene: &'a Scene, node_id: NodeId, rows: &mut Vec<ReportRow<'a>>) {
    let node = scene.node(node_id);
    if let Control::TimeGate(timeline) = &node.control {
        rows.push(ReportRow {
            label: &node.name,
            timeline,
        });
    }
    for &child in &node.children {
        collect_rows(scene, child, rows);
    }
}

const fn css_class(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Once => "once",
        SegmentKind::Noop => "norender",
        SegmentKind::Cont => "continuous",
    }
}

const HEADER: &str = "\
<!doctype html><html>
    <head>
        <style>
            body               { background-color:black; color:white; }
            table              { border-collapse: collapse; }
            table td           { padding:0; }
            td.bar             { width:100%; }
            td.nodename        { padding: 5px; }
            span.segment       { display:block; height:30px; float:left; }
            span.norender      { background-color:#ff5555; }
            span.continuous    { background-color:#5555ff; }
            span.once          { background-color:#555555; }
        </style>
    </head>
    <body>
        <table>
";

const FOOTER: &str = "\
        </table>
    </body>
</html>
";

/// Render the rows as a self-contained HTML table, one bar per row.
pub fn render_html(rows: &[ReportRow<'_>], duration: f64) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        let label = row.label.replace(' ', "&nbsp;");
        let _ = writeln!(
            out,
            "<tr><td class=\"nodename\">{label}</td><td class=\"bar\">"
        );
        for span in timeline_spans(row.timeline, duration) {
            let _ = writeln!(
                out,
                "<span class=\"segment {}\" style=\"width:{}%;\"></span>",
                css_class(span.kind),
                span.width * 100.0
            );
        }
        let _ = writeln!(out, "</td></tr>");
    }
    out.push_str(FOOTER);
    out
}
