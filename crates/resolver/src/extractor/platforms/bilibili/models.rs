use serde::{Deserialize, Serialize};

/// Envelope shared by every API endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct NavData {
    pub wbi_img: Option<WbiImg>,
}

#[derive(Debug, Deserialize)]
pub struct WbiImg {
    pub img_url: String,
    pub sub_url: String,
}

/// One page (part) of a multi-part upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageInfo {
    pub cid: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub part: String,
    /// Seconds.
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayUrlData {
    pub quality: Option<u32>,
    pub format: Option<String>,
    pub timelength: Option<u64>,
    pub durl: Option<Vec<Durl>>,
    pub dash: Option<Dash>,
}

/// Progressive file entry.
#[derive(Debug, Deserialize)]
pub struct Durl {
    #[serde(default)]
    pub url: String,
    pub backup_url: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct Dash {
    pub video: Option<Vec<DashStream>>,
    pub audio: Option<Vec<DashStream>>,
}

/// A DASH representation.
///
/// The API emits most keys twice, in camelCase and snake_case, and not
/// always both. Each spelling gets its own optional field; the accessors
/// merge them. Serde aliases would reject the duplicated keys.
#[derive(Debug, Deserialize)]
pub struct DashStream {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "baseUrl")]
    base_url_camel: Option<String>,
    base_url: Option<String>,
    #[serde(rename = "backupUrl")]
    backup_url_camel: Option<Vec<String>>,
    backup_url: Option<Vec<String>>,
    #[serde(default)]
    pub bandwidth: u64,
    #[serde(rename = "mimeType")]
    mime_type_camel: Option<String>,
    mime_type: Option<String>,
    #[serde(default)]
    pub codecs: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "frameRate")]
    frame_rate_camel: Option<String>,
    frame_rate: Option<String>,
    #[serde(rename = "SegmentBase")]
    segment_base_camel: Option<SegmentBase>,
    segment_base: Option<SegmentBase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentBase {
    #[serde(alias = "Initialization")]
    pub initialization: String,
    #[serde(alias = "indexRange")]
    pub index_range: String,
}

impl DashStream {
    pub fn base_url(&self) -> Option<&str> {
        self.base_url_camel
            .as_deref()
            .or(self.base_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn backup_urls(&self) -> &[String] {
        self.backup_url_camel
            .as_deref()
            .or(self.backup_url.as_deref())
            .unwrap_or_default()
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type_camel
            .as_deref()
            .or(self.mime_type.as_deref())
            .unwrap_or_default()
    }

    pub fn frame_rate(&self) -> Option<&str> {
        self.frame_rate_camel
            .as_deref()
            .or(self.frame_rate.as_deref())
            .filter(|rate| !rate.is_empty())
    }

    pub fn segment_base(&self) -> Option<&SegmentBase> {
        self.segment_base_camel
            .as_ref()
            .or(self.segment_base.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_stream_with_both_spellings() {
        let json = r#"{
            "id": 80,
            "baseUrl": "https://upos-sz-mirrorcos.bilivideo.com/a.m4s",
            "base_url": "https://upos-sz-mirrorcos.bilivideo.com/a.m4s",
            "backupUrl": ["https://b.bilivideo.com/a.m4s"],
            "backup_url": ["https://b.bilivideo.com/a.m4s"],
            "bandwidth": 1572419,
            "mimeType": "video/mp4",
            "mime_type": "video/mp4",
            "codecs": "avc1.640032",
            "width": 1920,
            "height": 1080,
            "frameRate": "29.970",
            "frame_rate": "29.970",
            "SegmentBase": {"Initialization": "0-1015", "indexRange": "1016-1555"},
            "segment_base": {"initialization": "0-1015", "index_range": "1016-1555"},
            "codecid": 7
        }"#;
        let stream: DashStream = serde_json::from_str(json).unwrap();
        assert_eq!(
            stream.base_url(),
            Some("https://upos-sz-mirrorcos.bilivideo.com/a.m4s")
        );
        assert_eq!(stream.backup_urls().len(), 1);
        assert_eq!(stream.mime_type(), "video/mp4");
        assert_eq!(stream.frame_rate(), Some("29.970"));
        let base = stream.segment_base().unwrap();
        assert_eq!(base.initialization, "0-1015");
        assert_eq!(base.index_range, "1016-1555");
    }

    #[test]
    fn test_dash_stream_snake_case_only() {
        let json = r#"{
            "id": 30280,
            "base_url": "https://x.bilivideo.com/audio.m4s",
            "backup_url": null,
            "bandwidth": 319173,
            "codecs": "mp4a.40.2",
            "segment_base": {"initialization": "0-907", "index_range": "908-1243"}
        }"#;
        let stream: DashStream = serde_json::from_str(json).unwrap();
        assert_eq!(stream.base_url(), Some("https://x.bilivideo.com/audio.m4s"));
        assert!(stream.backup_urls().is_empty());
        assert!(stream.frame_rate().is_none());
        assert!(stream.segment_base().is_some());
    }

    #[test]
    fn test_play_url_data_tolerates_missing_sections() {
        let json = r#"{"code": -404, "message": "啥都木有", "ttl": 1}"#;
        let response: ApiResponse<PlayUrlData> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, -404);
        assert!(response.data.is_none());

        let json = r#"{"code": 0, "data": {"quality": 64, "format": "mp4720", "durl": null, "dash": null}}"#;
        let response: ApiResponse<PlayUrlData> = serde_json::from_str(json).unwrap();
        let data = response.data.unwrap();
        assert!(data.durl.is_none() && data.dash.is_none());
        assert_eq!(data.quality, Some(64));
    }
}
