//! TwiML documents returned to Twilio's call webhooks.

const CONNECT_PROMPT: &str = "Please wait while I connect you to the AI agent.";
const FALLBACK_PROMPT: &str =
    "Sorry, I couldn't connect to the agent. Please try again later. Goodbye.";

/// Seconds Twilio waits on the fallback path after the stream ends.
const FALLBACK_PAUSE_SECONDS: u32 = 15;

/// Instruct Twilio to stream call media to `stream_url`.
///
/// The verbs after `<Connect>` only run if the stream ends or cannot be
/// opened.
pub fn connect_stream_twiml(stream_url: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<Response>",
            r#"<Connect><Stream url="{url}"/></Connect>"#,
            "<Say>{connect}</Say>",
            r#"<Pause length="{pause}"/>"#,
            "<Say>{fallback}</Say>",
            "<Hangup/>",
            "</Response>"
        ),
        url = escape_xml(stream_url),
        connect = escape_xml(CONNECT_PROMPT),
        pause = FALLBACK_PAUSE_SECONDS,
        fallback = escape_xml(FALLBACK_PROMPT),
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
