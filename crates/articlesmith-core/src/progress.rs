//! SSE progress protocol.
//!
//! The "SSE as async generator" pattern is expressed here as a closed set
//! of event types plus a rendering function; the transport layer is
//! responsible for draining whatever channel carries these and writing
//! them to the wire in `event:`/`data:` form.

use serde::{Deserialize, Serialize};

/// The nine pipeline stages, each with its fixed progress percentage
///. Order here is the fixed state-machine order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InputParse,
    Classify,
    QueryGen,
    Retrieve,
    Analyze,
    Outline,
    Contents,
    Quality,
    Assemble,
}

impl Stage {
    /// The fixed order the state machine transitions through.
    pub const ORDER: [Stage; 9] = [
        Stage::InputParse,
        Stage::Classify,
        Stage::QueryGen,
        Stage::Retrieve,
        Stage::Analyze,
        Stage::Outline,
        Stage::Contents,
        Stage::Quality,
        Stage::Assemble,
    ];

    /// The wire step name for this stage.
    #[must_use]
    pub const fn step_name(self) -> &'static str {
        match self {
            Self::InputParse => "input_parse",
            Self::Classify => "classify",
            Self::QueryGen => "query_gen",
            Self::Retrieve => "retrieve",
            Self::Analyze => "analyze",
            Self::Outline => "outline",
            Self::Contents => "contents",
            Self::Quality => "quality",
            Self::Assemble => "assemble",
        }
    }

    /// The fixed progress percentage reported for this stage.
    #[must_use]
    pub const fn percentage(self) -> u8 {
        match self {
            Self::InputParse => 10,
            Self::Classify => 20,
            Self::QueryGen => 30,
            Self::Retrieve => 45,
            Self::Analyze => 55,
            Self::Outline => 65,
            Self::Contents => 85,
            Self::Quality => 95,
            Self::Assemble => 100,
        }
    }
}

/// `event: progress` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: String,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Correlates this event to a single `generate`/`generate_stream` call.
    pub request_id: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn for_stage(stage: Stage, request_id: &str, message: Option<String>) -> Self {
        Self {
            step: stage.step_name().to_string(),
            percentage: stage.percentage(),
            message,
            request_id: request_id.to_string(),
        }
    }
}

/// `event: complete` envelope, the terminal event of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub markdown: String,
    pub draft_id: String,
}

/// `event: error` envelope, the terminal event of a failed or cancelled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// The taxonomy tag from [`crate::error::Error::error_type`].
    pub kind: String,
    pub message: String,
}

/// The full set of events a generation stream can emit. A stream is a
/// sequence of zero or more `Progress` followed by exactly one `Complete`
/// or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Complete(CompleteEvent),
    Error(ErrorEvent),
}

impl StreamEvent {
    /// Render as a line-delimited SSE envelope: `event: <kind>\ndata:
    /// <json>\n\n`. The actual socket write is the transport layer's job;
    /// this just produces the bytes it would write.
    #[must_use]
    pub fn to_sse_text(&self) -> String {
        let (event_name, data) = match self {
            Self::Progress(p) => ("progress", serde_json::to_string(p)),
            Self::Complete(c) => ("complete", serde_json::to_string(c)),
            Self::Error(e) => ("error", serde_json::to_string(e)),
        };
        let data = data.unwrap_or_else(|_| "{}".to_string());
        format!("event: {event_name}\ndata: {data}\n\n")
    }

    /// True for the two terminal variants.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_percentages_match_expected_values() {
        let expected = [10u8, 20, 30, 45, 55, 65, 85, 95, 100];
        for (stage, pct) in Stage::ORDER.iter().zip(expected) {
            assert_eq!(stage.percentage(), pct, "{stage:?}");
        }
    }

    #[test]
    fn stage_order_percentages_are_non_decreasing() {
        let mut last = 0u8;
        for stage in Stage::ORDER {
            assert!(stage.percentage() >= last);
            last = stage.percentage();
        }
    }

    #[test]
    fn sse_rendering_has_event_and_data_lines() {
        let ev = StreamEvent::Progress(ProgressEvent::for_stage(
            Stage::Retrieve,
            "req-1",
            None,
        ));
        let text = ev.to_sse_text();
        assert!(text.starts_with("event: progress\n"));
        assert!(text.contains("data: "));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn complete_and_error_are_terminal_progress_is_not() {
        assert!(!StreamEvent::Progress(ProgressEvent::for_stage(Stage::Classify, "r", None))
            .is_terminal());
        assert!(StreamEvent::Complete(CompleteEvent {
            markdown: String::new(),
            draft_id: String::new(),
        })
        .is_terminal());
        assert!(StreamEvent::Error(ErrorEvent {
            kind: "ErrTimeout".into(),
            message: String::new(),
        })
        .is_terminal());
    }
}
