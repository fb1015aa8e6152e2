/// Shaping of raw extractor JSON into the public `VideoInfo`.
use std::collections::HashSet;

use serde::Deserialize;

use mediagrab_shared::models::{FormatDescriptor, VideoInfo};

/// Subset of `yt-dlp --dump-single-json` output that Mediagrab reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub formats: Option<Vec<RawFormat>>,
}

/// One entry of the extractor's `formats` array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub format_note: Option<String>,
    pub filesize: Option<u64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub tbr: Option<f64>,
}

impl RawFormat {
    /// A missing codec field means "unknown", not absent.
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }

    /// Dedup key: `<resolution>_<ext>`, resolution defaulting to "audio".
    pub fn dedup_key(&self) -> String {
        format!(
            "{}_{}",
            self.resolution.as_deref().unwrap_or("audio"),
            self.ext.as_deref().unwrap_or_default()
        )
    }

    fn to_descriptor(&self) -> FormatDescriptor {
        FormatDescriptor {
            format_id: self.format_id.clone(),
            ext: self.ext.clone(),
            quality: self.format_note.clone().unwrap_or_else(|| "unknown".into()),
            filesize: self.filesize,
            vcodec: self.vcodec.clone().unwrap_or_else(|| "none".into()),
            acodec: self.acodec.clone().unwrap_or_else(|| "none".into()),
            resolution: self.resolution.clone().unwrap_or_else(|| "audio only".into()),
            fps: self.fps,
            tbr: self.tbr,
        }
    }
}

/// Keep the first format per (resolution, ext), in extractor order.
///
/// Formats carrying neither video nor audio (storyboards and the like) are
/// skipped without claiming their key.
pub fn dedupe_formats(formats: &[RawFormat]) -> Vec<FormatDescriptor> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for f in formats {
        if !(f.has_video() || f.has_audio()) {
            continue;
        }
        if seen.insert(f.dedup_key()) {
            out.push(f.to_descriptor());
        }
    }

    out
}

pub fn shape_info(raw: RawInfo) -> VideoInfo {
    let formats = raw
        .formats
        .as_deref()
        .map(dedupe_formats)
        .unwrap_or_default();

    VideoInfo {
        title: raw.title,
        thumbnail: raw.thumbnail,
        duration: raw.duration,
        uploader: raw.uploader,
        view_count: raw.view_count,
        formats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "title": "Sample clip",
        "thumbnail": "https://i.example.com/t.jpg",
        "duration": 212.5,
        "uploader": "someone",
        "view_count": 1234,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none",
             "resolution": "48x27", "format_note": "storyboard"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "resolution": "audio only", "format_note": "medium", "filesize": 3400000,
             "tbr": 129.5},
            {"format_id": "139", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.5",
             "resolution": "audio only", "format_note": "low"},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none",
             "resolution": "1920x1080", "fps": 30, "format_note": "1080p"},
            {"format_id": "248", "ext": "webm", "vcodec": "vp9", "acodec": "none",
             "resolution": "1920x1080", "fps": 30},
            {"format_id": "399", "ext": "mp4", "vcodec": "av01.0.08M.08", "acodec": "none",
             "resolution": "1920x1080", "fps": 30}
        ]
    }"#;

    fn sample() -> VideoInfo {
        shape_info(serde_json::from_str(SAMPLE).unwrap())
    }

    #[test]
    fn test_shape_metadata() {
        let info = sample();
        assert_eq!(info.title.as_deref(), Some("Sample clip"));
        assert_eq!(info.duration, Some(212.5));
        assert_eq!(info.view_count, Some(1234));
    }

    #[test]
    fn test_no_duplicate_resolution_ext_pairs() {
        let info = sample();
        let mut keys = HashSet::new();
        for f in &info.formats {
            assert!(keys.insert((f.resolution.clone(), f.ext.clone())));
        }
        let ids: Vec<_> = info.formats.iter().filter_map(|f| f.format_id.as_deref()).collect();
        assert_eq!(ids, vec!["140", "137", "248"]);
    }

    #[test]
    fn test_streamless_formats_skipped() {
        let info = sample();
        assert!(info.formats.iter().all(|f| f.format_id.as_deref() != Some("sb0")));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let raw = RawFormat {
            format_id: Some("18".into()),
            ext: Some("mp4".into()),
            ..Default::default()
        };
        assert!(raw.has_video() && raw.has_audio());
        assert_eq!(raw.dedup_key(), "audio_mp4");

        let d = dedupe_formats(&[raw]).remove(0);
        assert_eq!(d.quality, "unknown");
        assert_eq!(d.vcodec, "none");
        assert_eq!(d.acodec, "none");
        assert_eq!(d.resolution, "audio only");
    }

    #[test]
    fn test_info_without_formats() {
        let info = shape_info(serde_json::from_str(r#"{"title": "x"}"#).unwrap());
        assert!(info.formats.is_empty());
        assert!(info.uploader.is_none());
    }
}
