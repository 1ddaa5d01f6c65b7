//! Parsing of YouTube watch pages and timed-text documents.
//!
//! Everything here is pure so it can be tested against captured fixtures.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{CaptionTrack, FetchError, TranscriptSegment};

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PLAYABILITY_MARKER: &str = "\"playabilityStatus\":";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    #[serde(default)]
    name: TrackName,
    language_code: String,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    text: String,
}

impl TrackName {
    fn into_label(self) -> String {
        match self.simple_text {
            Some(text) => text,
            None => self.runs.into_iter().map(|run| run.text).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedSeg {
    #[serde(default)]
    utf8: String,
}

/// Returns the value YouTube expects in a `CONSENT` cookie when the page is the
/// cookie consent interstitial.
pub fn consent_value(html: &str) -> Option<String> {
    if !html.contains(CONSENT_FORM_MARKER) {
        return None;
    }

    let start = html.find("name=\"v\" value=\"")? + "name=\"v\" value=\"".len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}

pub fn is_consent_page(html: &str) -> bool {
    html.contains(CONSENT_FORM_MARKER)
}

/// Extract the caption tracks embedded in a watch page.
///
/// Manually created tracks come first, auto-generated ones after, each group in page order.
pub fn extract_caption_tracks(html: &str, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError> {
    let Some((_, after)) = html.split_once("\"captions\":") else {
        if html.contains(RECAPTCHA_MARKER) {
            return Err(FetchError::TooManyRequests {
                video_id: video_id.to_string(),
            });
        }
        if !html.contains(PLAYABILITY_MARKER) {
            return Err(FetchError::VideoUnavailable {
                video_id: video_id.to_string(),
            });
        }
        return Err(FetchError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    };

    let captions_json = after
        .split_once(",\"videoDetails")
        .map(|(captions, _)| captions)
        .unwrap_or(after)
        .replace('\n', "");

    let captions: Value =
        serde_json::from_str(&captions_json).map_err(|e| FetchError::MalformedResponse {
            video_id: video_id.to_string(),
            reason: format!("captions block is not valid JSON: {}", e),
        })?;

    let Some(renderer) = captions.get("playerCaptionsTracklistRenderer") else {
        return Err(FetchError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    };

    let raw_tracks: Vec<RawCaptionTrack> = match renderer.get("captionTracks") {
        Some(tracks) => serde_json::from_value(tracks.clone()).map_err(|e| {
            FetchError::MalformedResponse {
                video_id: video_id.to_string(),
                reason: format!("unexpected caption track layout: {}", e),
            }
        })?,
        None => Vec::new(),
    };

    if raw_tracks.is_empty() {
        return Err(FetchError::NoTranscriptAvailable {
            video_id: video_id.to_string(),
        });
    }

    let (manual, generated): (Vec<CaptionTrack>, Vec<CaptionTrack>) = raw_tracks
        .into_iter()
        .map(|raw| CaptionTrack {
            name: raw.name.into_label(),
            language_code: raw.language_code,
            is_generated: raw.kind.as_deref() == Some("asr"),
            is_translatable: raw.is_translatable,
            base_url: raw.base_url,
        })
        .partition(|track| !track.is_generated);

    Ok(manual.into_iter().chain(generated).collect())
}

/// Pick the track to download.
///
/// With no requested languages the first track wins. Otherwise languages are tried in
/// order, preferring a manually created track over a generated one for the same code.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
    video_id: &str,
) -> Result<&'a CaptionTrack, FetchError> {
    let found = if languages.is_empty() {
        tracks.first()
    } else {
        languages.iter().find_map(|code| {
            tracks
                .iter()
                .filter(|track| track.language_code == *code)
                .min_by_key(|track| track.is_generated)
        })
    };

    found.ok_or_else(|| FetchError::NoTranscriptFound {
        video_id: video_id.to_string(),
        requested: languages.to_vec(),
        available: tracks.iter().map(|t| t.language_code.clone()).collect(),
    })
}

/// Rewrite a track's base URL so the timed text comes back as JSON
pub fn timedtext_url(base_url: &str, video_id: &str) -> Result<String, FetchError> {
    let mut url = Url::parse(base_url).map_err(|e| FetchError::MalformedResponse {
        video_id: video_id.to_string(),
        reason: format!("invalid caption URL {}: {}", base_url, e),
    })?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url.to_string())
}

/// Parse a `json3` timed-text document into segments, keeping source order
pub fn parse_timed_text(body: &str, video_id: &str) -> Result<Vec<TranscriptSegment>, FetchError> {
    let document: TimedText =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            video_id: video_id.to_string(),
            reason: format!("timed text is not valid JSON: {}", e),
        })?;

    let segments = document
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            Some(TranscriptSegment {
                text: text.to_string(),
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}
