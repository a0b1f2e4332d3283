//! Batch progress bar driven by completed outcomes.

use std::sync::Arc;

use indicatif::ProgressStyle;
use squeeze_engine::OutcomeCallback;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} {msg}";

/// Span carrying the batch progress bar; instrument the run with it.
pub fn progress_span(label: &str) -> Span {
    let span = info_span!("batch", indicatif.pb_show = true);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    span.pb_set_style(&style);
    span.pb_set_message(label);
    span
}

/// Callback advancing the bar of `span` as items complete.
pub fn outcome_reporter(span: Span) -> OutcomeCallback {
    Arc::new(move |outcome, completed, total| {
        span.pb_set_length(total as u64);
        span.pb_set_position(completed as u64);
        span.pb_set_message(&format!("{} {}", outcome.item.display_name(), outcome.status));
    })
}
