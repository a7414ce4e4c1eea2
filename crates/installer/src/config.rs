//! Configuration for install and uninstall runs

use std::path::PathBuf;
use std::time::Duration;

/// Steam application id of KINGDOM HEARTS HD 2.8 Final Chapter Prologue
pub const STEAM_APP_ID: u32 = 2552440;

const DEFAULT_RELEASE_URL: &str =
    "https://github.com/kh02-doblaje/kh02-doblaje-castellano/releases/download/v1.0.0";
const DEFAULT_VOLUME_COUNT: usize = 7;

/// Knobs for discovery, downloading, extraction and deployment
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Steam installation roots probed in order
    pub steam_roots: Vec<PathBuf>,
    /// Directories that hold Epic Games installs, probed after Steam
    pub epic_roots: Vec<PathBuf>,
    /// Query the registry / launcher manifests after the fixed roots
    pub query_install_metadata: bool,
    /// Ordered archive volume URLs, part 1 first
    pub volume_urls: Vec<String>,
    /// Directories searched, in order, for bundled assets
    pub asset_roots: Vec<PathBuf>,
    /// Directories searched, in order, for a bundled extraction tool
    pub tool_roots: Vec<PathBuf>,
    /// Parent for the per-run scratch directory (system temp when unset)
    pub scratch_root: Option<PathBuf>,
    /// Volumes transferred at once; later batches wait for the whole batch
    pub max_concurrent_downloads: usize,
    /// Minimum wall-clock gap between two download progress events
    pub progress_interval: Duration,
    /// Ceiling for a single volume transfer
    pub volume_timeout: Duration,
    /// Ceiling for each metadata (HEAD) request
    pub metadata_timeout: Duration,
    /// Ceiling for one extraction tool run
    pub extraction_timeout: Duration,
    /// Bytes of stdout/stderr kept per tool run
    pub tool_output_limit: usize,
    /// Share of the overall progress bar given to the download phase
    pub download_budget: u32,
    /// Share of the overall progress bar given to extraction
    pub extraction_budget: u32,
    pub user_agent: String,
    pub steam_app_id: u32,
}

impl InstallerConfig {
    pub fn with_steam_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.steam_roots = roots;
        self
    }

    pub fn with_epic_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.epic_roots = roots;
        self
    }

    pub fn with_install_metadata(mut self, enabled: bool) -> Self {
        self.query_install_metadata = enabled;
        self
    }

    pub fn with_volume_urls<S: Into<String>>(mut self, urls: impl IntoIterator<Item = S>) -> Self {
        self.volume_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_asset_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.asset_roots = roots;
        self
    }

    pub fn with_tool_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.tool_roots = roots;
        self
    }

    pub fn with_scratch_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Apply `KHDUB_*` environment overrides on top of `self`
    ///
    /// Asset and tool directories from the environment are searched before
    /// the built-in locations rather than replacing them.
    pub fn from_env(mut self) -> Self {
        if let Ok(urls) = std::env::var("KHDUB_ARCHIVE_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
            if !urls.is_empty() {
                self.volume_urls = urls;
            }
        }
        if let Ok(dir) = std::env::var("KHDUB_ASSETS_DIR") {
            self.asset_roots.insert(0, PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("KHDUB_TOOLS_DIR") {
            self.tool_roots.insert(0, PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("KHDUB_SCRATCH_DIR") {
            self.scratch_root = Some(PathBuf::from(dir));
        }
        if let Some(n) = std::env::var("KHDUB_MAX_CONCURRENT_DOWNLOADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            self.max_concurrent_downloads = n;
        }
        self
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let mut steam_roots = vec![
            PathBuf::from(r"C:\Program Files (x86)\Steam"),
            PathBuf::from(r"C:\Program Files\Steam"),
        ];
        if let Some(home) = std::env::var_os("USERPROFILE").or_else(|| std::env::var_os("HOME")) {
            steam_roots.push(PathBuf::from(home).join("AppData").join("Local").join("Steam"));
        }

        Self {
            steam_roots,
            epic_roots: vec![
                PathBuf::from(r"C:\Program Files\Epic Games"),
                PathBuf::from(r"C:\Program Files (x86)\Epic Games"),
            ],
            query_install_metadata: true,
            volume_urls: (1..=DEFAULT_VOLUME_COUNT)
                .map(|n| format!("{DEFAULT_RELEASE_URL}/DT.part{n}.rar"))
                .collect(),
            asset_roots: vec![
                exe_dir.join("resources").join("app").join("assets"),
                exe_dir.join("resources").join("assets"),
                exe_dir.join("assets"),
                cwd.join("assets"),
            ],
            tool_roots: vec![
                exe_dir.join("resources").join("tools"),
                exe_dir.join("tools"),
                cwd.join("tools"),
            ],
            scratch_root: None,
            max_concurrent_downloads: 3,
            progress_interval: Duration::from_millis(500),
            volume_timeout: Duration::from_secs(30 * 60),
            metadata_timeout: Duration::from_secs(30),
            extraction_timeout: Duration::from_secs(10 * 60),
            tool_output_limit: 64 * 1024,
            download_budget: 50,
            extraction_budget: 10,
            user_agent: format!("khdub-installer/{}", env!("CARGO_PKG_VERSION")),
            steam_app_id: STEAM_APP_ID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_seven_ordered_volumes() {
        let config = InstallerConfig::default();
        assert_eq!(config.volume_urls.len(), 7);
        assert!(config.volume_urls[0].ends_with("DT.part1.rar"));
        assert!(config.volume_urls[6].ends_with("DT.part7.rar"));
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.progress_interval, Duration::from_millis(500));
    }

    #[test]
    fn builder_overrides_volume_list() {
        let config = InstallerConfig::default().with_volume_urls(["http://a/x.part1.rar"]);
        assert_eq!(config.volume_urls, vec!["http://a/x.part1.rar".to_string()]);
    }
}
