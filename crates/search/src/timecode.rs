//! Table of contents for timecoded media (interview videos and the like).

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocPart {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref_label: Option<String>,
    #[serde(deserialize_with = "seconds")]
    pub begin_time_in_seconds: f64,
    #[serde(deserialize_with = "seconds")]
    pub end_time_in_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_time_label: Option<String>,
}

impl TocPart {
    /// Half-open: `begin <= t < end`.
    #[must_use]
    pub fn contains(&self, seconds: f64) -> bool {
        self.begin_time_in_seconds <= seconds && seconds < self.end_time_in_seconds
    }
}

/// Timecodes come from RDF literals and may be serialized as strings.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid timecode '{text}'"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableOfContents {
    parts: Vec<TocPart>,
}

impl TableOfContents {
    #[must_use]
    pub fn new(parts: Vec<TocPart>) -> Self {
        Self { parts }
    }

    /// Accepts a single part object or an array of parts.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<TocPart>),
            One(TocPart),
        }

        let parts = match serde_json::from_value(value)? {
            OneOrMany::Many(parts) => parts,
            OneOrMany::One(part) => vec![part],
        };
        Ok(Self { parts })
    }

    #[must_use]
    pub fn parts(&self) -> &[TocPart] {
        &self.parts
    }

    /// First declared part containing `seconds`. Source timecodes overlap
    /// now and then; earlier parts win.
    #[must_use]
    pub fn part_at(&self, seconds: f64) -> Option<&TocPart> {
        self.parts.iter().find(|part| part.contains(seconds))
    }

    /// Index pairs of parts whose ranges overlap, in declaration order.
    #[must_use]
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.parts.iter().enumerate() {
            for (j, b) in self.parts.iter().enumerate().skip(i + 1) {
                if a.begin_time_in_seconds < b.end_time_in_seconds
                    && b.begin_time_in_seconds < a.end_time_in_seconds
                {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}
