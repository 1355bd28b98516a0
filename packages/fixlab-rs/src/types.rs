use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring removed from recording names when building session labels
pub const RECORDING_PREFIX: &str = "Recording";

/// Tracker-reported validity of one eye's reading.
///
/// Tobii exports either spell validity out (`Valid` / `Invalid`) or use the
/// older integer codes where 0 and 1 mean the eye was found and 2..=4 mean
/// increasingly uncertain or lost. Anything else is kept verbatim so it can be
/// reported, and is never treated as valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Validity {
    #[default]
    Valid,
    Invalid,
    Code(u8),
    Unrecognized(String),
}

impl Validity {
    /// Highest numeric code still counted as a usable reading
    pub const MAX_VALID_CODE: u8 = 1;

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "Valid" => Validity::Valid,
            "Invalid" => Validity::Invalid,
            _ => match trimmed.parse::<u8>() {
                Ok(code) => Validity::Code(code),
                Err(_) => Validity::Unrecognized(trimmed.to_string()),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Validity::Valid => true,
            Validity::Code(code) => *code <= Self::MAX_VALID_CODE,
            Validity::Invalid | Validity::Unrecognized(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// One eye's reading. `None` coordinates are the in-crate missing sentinel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EyeSample {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub pupil: Option<f64>,
    pub validity: Validity,
}

impl EyeSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            pupil: None,
            validity: Validity::Valid,
        }
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_pupil(mut self, pupil: f64) -> Self {
        self.pupil = Some(pupil);
        self
    }

    /// True when neither coordinate carries a reading
    pub fn is_missing(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

/// Binocular sample without session identity, as stored inside a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GazeSample {
    pub time: f64,
    pub left: EyeSample,
    pub right: EyeSample,
}

impl GazeSample {
    pub fn eye(&self, eye: Eye) -> &EyeSample {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    pub fn eye_mut(&mut self, eye: Eye) -> &mut EyeSample {
        match eye {
            Eye::Left => &mut self.left,
            Eye::Right => &mut self.right,
        }
    }
}

/// Sample after quality filtering. Same shape as the raw sample; rejected
/// eyes have both coordinates set to `None`.
pub type CleanedSample = GazeSample;

/// One row of the input table
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub participant_id: String,
    pub recording_id: String,
    pub sample: GazeSample,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub participant_id: String,
    pub recording_id: String,
}

impl SessionKey {
    pub fn new(participant_id: impl Into<String>, recording_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            recording_id: recording_id.into(),
        }
    }

    /// Lower-cased participant plus the recording name with `Recording` removed,
    /// e.g. ("A", "Recording1") -> "a_1".
    pub fn label(&self) -> String {
        format!(
            "{}_{}",
            self.participant_id.to_lowercase(),
            self.recording_id.replace(RECORDING_PREFIX, "")
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.participant_id, self.recording_id)
    }
}

/// Screen resolution in pixels, used as the plausibility bounds of gaze data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub xres: f64,
    pub yres: f64,
}

impl Resolution {
    pub fn new(xres: f64, yres: f64) -> Self {
        Self { xres, yres }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            xres: 1920.0,
            yres: 1080.0,
        }
    }
}

/// Fixation event as reported by I2MC. Field names on the wire follow the
/// library's output dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixation {
    /// Sample index of fixation onset
    pub start: usize,
    /// Sample index of fixation offset
    pub end: usize,
    #[serde(rename = "startT")]
    pub start_time: f64,
    #[serde(rename = "endT")]
    pub end_time: f64,
    #[serde(rename = "dur")]
    pub duration: f64,
    #[serde(rename = "xpos")]
    pub x: f64,
    #[serde(rename = "ypos")]
    pub y: f64,
    /// Clustering weight cutoff used for the whole session
    #[serde(default)]
    pub cutoff: Option<f64>,
    #[serde(rename = "flankdataloss", default)]
    pub flank_data_loss: Option<bool>,
    #[serde(rename = "fracinterped", default)]
    pub frac_interped: Option<f64>,
    #[serde(rename = "RMSxy", default)]
    pub rms_xy: Option<f64>,
    #[serde(rename = "BCEA", default)]
    pub bcea: Option<f64>,
    #[serde(rename = "fixRangeX", default)]
    pub range_x: Option<f64>,
    #[serde(rename = "fixRangeY", default)]
    pub range_y: Option<f64>,
}

/// Fixation tagged with the session it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFixation {
    pub session_label: String,
    #[serde(flatten)]
    pub fixation: Fixation,
}
