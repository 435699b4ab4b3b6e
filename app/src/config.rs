use std::path::PathBuf;

use api_client::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use sync::mirror::DEFAULT_DOWNLOAD_ROOT;
use sync::HIGHLIGHT_KEYWORDS;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub oauth_redirect_port: u16,
    pub download_root: PathBuf,
    pub cache_path: PathBuf,
    pub page_size: i32,
    pub title_keywords: Vec<String>,
    pub api_base_url: String,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub oauth_redirect_port: Option<u16>,
    pub download_root: Option<PathBuf>,
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".albumgrab")
}

impl AppConfig {
    /// Load `~/.albumgrab/config` (or `path`) as TOML. Missing files and
    /// missing keys fall back to defaults.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| default_base_dir().join("config"));
        let cfg = config::Config::builder()
            .add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml)
                    .required(false),
            )
            .build()
            .unwrap_or_else(|e| {
                eprintln!("Ignoring unreadable config {:?}: {}", path, e);
                config::Config::default()
            });

        let log_level = cfg
            .get_string("log_level")
            .unwrap_or_else(|_| "info".to_string());
        let oauth_redirect_port = cfg.get_int("oauth_redirect_port").unwrap_or(8080) as u16;
        let download_root = cfg
            .get_string("download_root")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOWNLOAD_ROOT));
        let cache_path = cfg
            .get_string("cache_path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_base_dir());
        let page_size = cfg
            .get_int("page_size")
            .map(|n| n as i32)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let title_keywords = cfg
            .get::<Vec<String>>("title_keywords")
            .unwrap_or_else(|_| HIGHLIGHT_KEYWORDS.iter().map(|k| k.to_string()).collect());
        let api_base_url = cfg
            .get_string("api_base_url")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self {
            log_level,
            oauth_redirect_port,
            download_root,
            cache_path,
            page_size,
            title_keywords,
            api_base_url,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(p) = ov.oauth_redirect_port {
            self.oauth_redirect_port = p;
        }
        if let Some(root) = &ov.download_root {
            self.download_root = root.clone();
        }
        self
    }
}
