use mpparse_markup::Element;
use serde::{Deserialize, Serialize};

/// Props handed to the host's audio widget. Playback state stays in the widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioProps {
    pub src: String,
    pub title: String,
    pub desc: String,
}

impl AudioProps {
    pub fn from_element(element: &Element) -> Self {
        Self {
            src: element.attr("src").to_string(),
            title: element.attr("title").to_string(),
            desc: element.attr("desc").to_string(),
        }
    }
}

/// Playback position as `mm:ss`. Negative or non-finite input reads `00:00`.
pub fn format_playback_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", minutes, secs)
}
