//! Span helpers for live sessions, tool calls and music streaming.

use tracing::Span;

/// Create a span covering one live session
///
/// # Arguments
/// * `provider` - Transport provider, e.g. `gemini`
/// * `model` - Model the session was opened for
///
/// # Example
/// ```
/// use mirror_telemetry::live_session_span;
/// let span = live_session_span("gemini", "models/gemini-2.5-flash-live-preview");
/// let _enter = span.enter();
/// ```
pub fn live_session_span(provider: &str, model: &str) -> Span {
    tracing::info_span!("live.session", live.provider = provider, model.name = model)
}

/// Create a span for tool execution
///
/// # Arguments
/// * `tool_name` - Name of the function being executed
/// * `call_id` - ID the model assigned to the call
///
/// # Example
/// ```
/// use mirror_telemetry::tool_execute_span;
/// let span = tool_execute_span("edit_image", "call-1");
/// let _enter = span.enter();
/// ```
pub fn tool_execute_span(tool_name: &str, call_id: &str) -> Span {
    tracing::info_span!("tool.execute", tool.name = tool_name, tool.call_id = call_id)
}

/// Create a span covering one music streaming session
pub fn music_session_span(model: &str) -> Span {
    tracing::info_span!("music.session", model.name = model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_are_named() {
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).finish(),
        );
        let live = live_session_span("mock", "m");
        let tool = tool_execute_span("edit_image", "1");
        let music = music_session_span("models/lyria-realtime-exp");

        assert_eq!(live.metadata().map(|m| m.name()), Some("live.session"));
        assert_eq!(tool.metadata().map(|m| m.name()), Some("tool.execute"));
        assert_eq!(music.metadata().map(|m| m.name()), Some("music.session"));
    }
}
