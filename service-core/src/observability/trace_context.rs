//! W3C trace-context propagation for outbound HTTP calls.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

/// `traceparent` value for the current span, if it belongs to a valid trace.
pub fn traceparent() -> Option<String> {
    let context = Span::current().context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if !span_context.is_valid() {
        return None;
    }

    // version-trace_id-span_id-flags
    Some(format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    ))
}

fn tracestate() -> Option<String> {
    let context = Span::current().context();
    let state = context.span().span_context().trace_state().header();
    (!state.is_empty()).then_some(state)
}

/// Attaches the current trace context to an outgoing reqwest request.
pub trait TracedRequestExt {
    fn with_trace_context(self) -> Self;
}

impl TracedRequestExt for reqwest::RequestBuilder {
    fn with_trace_context(self) -> Self {
        let mut request = self;
        if let Some(parent) = traceparent() {
            request = request.header(TRACEPARENT_HEADER, parent);
            if let Some(state) = tracestate() {
                request = request.header(TRACESTATE_HEADER, state);
            }
        }
        request
    }
}
