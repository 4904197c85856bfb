//! Response types for the aria2 RPC methods the bot uses.
//!
//! aria2 encodes all numeric fields as JSON strings; the typed accessors
//! parse them with a zero fallback so a malformed field degrades to "no
//! progress" instead of a decode failure.

use serde::{Deserialize, Serialize};

/// One file inside a download (`aria2.tellStatus` / `tellActive`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadFile {
    #[serde(default)]
    pub path: String,
}

impl DownloadFile {
    /// Final path component, for user-facing listings.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Status of a single download job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStatus {
    #[serde(default)]
    pub gid: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub completed_length: String,
    #[serde(default)]
    pub total_length: String,
    #[serde(default)]
    pub files: Vec<DownloadFile>,
}

impl DownloadStatus {
    pub fn completed_bytes(&self) -> u64 {
        self.completed_length.parse().unwrap_or(0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_length.parse().unwrap_or(0)
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Global transfer statistics (`aria2.getGlobalStat`). Serializable so the
/// status dashboard can pass it through unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStat {
    #[serde(default)]
    pub download_speed: String,
    #[serde(default)]
    pub upload_speed: String,
    #[serde(default)]
    pub num_active: String,
    #[serde(default)]
    pub num_waiting: String,
    #[serde(default)]
    pub num_stopped: String,
}

impl GlobalStat {
    pub fn download_speed_bytes(&self) -> u64 {
        self.download_speed.parse().unwrap_or(0)
    }

    pub fn upload_speed_bytes(&self) -> u64 {
        self.upload_speed.parse().unwrap_or(0)
    }

    pub fn active(&self) -> u64 {
        self.num_active.parse().unwrap_or(0)
    }

    pub fn waiting(&self) -> u64 {
        self.num_waiting.parse().unwrap_or(0)
    }

    pub fn stopped(&self) -> u64 {
        self.num_stopped.parse().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.active() + self.waiting() + self.stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_status_decodes_aria2_shape() {
        let json = r#"{
            "gid": "2089b05ecca3d829",
            "status": "active",
            "completedLength": "52428800",
            "totalLength": "209715200",
            "files": [{"path": "/srv/downloads/u1/movie.mkv"}]
        }"#;
        let status: DownloadStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.gid, "2089b05ecca3d829");
        assert!(status.is_active());
        assert_eq!(status.completed_bytes(), 52_428_800);
        assert_eq!(status.total_bytes(), 209_715_200);
        assert_eq!(status.files[0].basename(), "movie.mkv");
    }

    #[test]
    fn test_malformed_numbers_fall_back_to_zero() {
        let json = r#"{"gid": "x", "status": "waiting", "completedLength": "nan"}"#;
        let status: DownloadStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.completed_bytes(), 0);
        assert_eq!(status.total_bytes(), 0);
    }

    #[test]
    fn test_global_stat_totals() {
        let json = r#"{
            "downloadSpeed": "1048576",
            "uploadSpeed": "2048",
            "numActive": "2",
            "numWaiting": "1",
            "numStopped": "4"
        }"#;
        let stat: GlobalStat = serde_json::from_str(json).unwrap();
        assert_eq!(stat.download_speed_bytes(), 1_048_576);
        assert_eq!(stat.total(), 7);
    }
}
