//! Endpoint status line

use chrono::{Local, NaiveTime};
use serde::Serialize;

/// Status indicator color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Red,
}

/// Status indicator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    Dot,
    Ring,
}

/// A rendered status for display by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub color: StatusColor,
    pub shape: StatusShape,
    pub text: String,
}

/// Render a status line stamped with the local wall clock
pub fn render_status(connected: bool, last_in: Option<&str>, last_out: Option<&str>) -> Status {
    render_status_at(Local::now().time(), connected, last_in, last_out)
}

/// Render a status line stamped with `time`
pub fn render_status_at(
    time: NaiveTime,
    connected: bool,
    last_in: Option<&str>,
    last_out: Option<&str>,
) -> Status {
    let mut text = time.format("%H:%M:%S").to_string();
    if let Some(value) = last_in {
        text.push_str(" I: ");
        text.push_str(value);
    }
    if let Some(value) = last_out {
        text.push_str(" O: ");
        text.push_str(value);
    }

    let (color, shape) = if connected {
        (StatusColor::Green, StatusShape::Dot)
    } else {
        (StatusColor::Red, StatusShape::Ring)
    };

    Status { color, shape, text }
}

/// Connection state plus the latest values seen by one endpoint
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    connected: bool,
    last_in: Option<String>,
    last_out: Option<String>,
}

impl StatusTracker {
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            ..Default::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) -> Status {
        self.connected = connected;
        self.render()
    }

    pub fn record_input(&mut self, value: impl Into<String>) -> Status {
        self.last_in = Some(value.into());
        self.render()
    }

    pub fn record_output(&mut self, value: impl Into<String>) -> Status {
        self.last_out = Some(value.into());
        self.render()
    }

    pub fn render(&self) -> Status {
        render_status(
            self.connected,
            self.last_in.as_deref(),
            self.last_out.as_deref(),
        )
    }
}
