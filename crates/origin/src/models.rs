//! Stream descriptor types shared across the pipeline.

use serde::{Deserialize, Serialize};

/// One rendition of the encoding ladder, as requested from the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Target bitrate in bits per second.
    pub bitrate_bps: u64,
}

impl ProfileSpec {
    pub fn new(name: impl Into<String>, width: u32, height: u32, bitrate_bps: u64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            bitrate_bps,
        }
    }
}

/// Rendition ladder used when the configuration does not override it.
pub fn default_ladder() -> Vec<ProfileSpec> {
    vec![
        ProfileSpec::new("720p", 1280, 720, 2_000_000),
        ProfileSpec::new("480p", 854, 480, 1_000_000),
        ProfileSpec::new("360p", 640, 360, 500_000),
    ]
}

/// A rendition together with its playback endpoint.
///
/// `remote_url` is set once by allocation and immutable afterwards; profiles
/// the origin returned without a playback endpoint keep `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bitrate_bps: u64,
    pub remote_url: Option<String>,
}

/// Everything the origin returned for one allocated stream. Read-only for the
/// rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    pub name: String,
    /// Endpoint the encoder pushes live media into.
    pub ingest_url: String,
    pub profiles: Vec<StreamProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ladder_is_ordered_high_to_low() {
        let ladder = default_ladder();
        assert_eq!(ladder.len(), 3);
        assert_eq!(ladder[0].name, "720p");
        assert_eq!(ladder[2].name, "360p");
        assert!(ladder[0].bitrate_bps > ladder[1].bitrate_bps);
        assert!(ladder[1].bitrate_bps > ladder[2].bitrate_bps);
    }
}
