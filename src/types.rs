use std::fmt;
use std::str::FromStr;

/// A requested slice of a reference sequence, half-open and 0-based.
/// Missing bounds default to the start/end of the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRequest {
    pub sequence: String,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RegionRequest {
    pub fn whole(sequence: impl Into<String>) -> Self {
        RegionRequest {
            sequence: sequence.into(),
            start: None,
            end: None,
        }
    }
}

impl FromStr for RegionRequest {
    type Err = String;

    /// Parses `SEQ`, `SEQ:START-END`, `SEQ:START-` or `SEQ:-END`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((sequence, bounds)) = s.rsplit_once(':') else {
            if s.is_empty() {
                return Err("missing sequence ID".to_string());
            }
            return Ok(RegionRequest::whole(s));
        };
        if sequence.is_empty() {
            return Err("missing sequence ID".to_string());
        }

        let Some((start, end)) = bounds.split_once('-') else {
            return Err(format!(
                "invalid region bounds {bounds:?}, expected START-END"
            ));
        };
        let parse = |text: &str, what: &str| -> Result<Option<usize>, String> {
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<usize>()
                .map(Some)
                .map_err(|e| format!("invalid {what}: {e}"))
        };
        let start = parse(start, "start")?;
        let end = parse(end, "end")?;
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Err(format!(
                    "start must be less than end: got {start} >= {end}"
                ));
            }
        }

        Ok(RegionRequest {
            sequence: sequence.to_string(),
            start,
            end,
        })
    }
}

impl fmt::Display for RegionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "{}", self.sequence),
            (start, end) => write!(
                f,
                "{}:{}-{}",
                self.sequence,
                start.map(|v| v.to_string()).unwrap_or_default(),
                end.map(|v| v.to_string()).unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// One simulated read, ready for the output collaborator.
/// `sequence` and `quality` are always the same length.
#[derive(Debug, Clone)]
pub struct ReadRecord {
    pub id: String,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub strand: Strand,
}
