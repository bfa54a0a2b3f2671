use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const URL_ENV: &str = "CLUSTER_CONSOLE_URL";
pub const TOKEN_ENV: &str = "CLUSTER_CONSOLE_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the management backend
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Deepest level that still offers drill-down (0 = unlimited)
    pub max_depth: usize,

    /// Functions shown per category in the compact catalog view
    pub compact_category_limit: usize,

    /// How often the UI checks for completed fetches
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs for links, favorites and breadcrumbs
    pub use_glyphs: bool,

    /// Show row numbers in level tables
    pub show_row_numbers: bool,

    /// Text shown for null or missing cells
    pub null_text: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            compact_category_limit: 4,
            poll_interval_ms: 50,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            show_row_numbers: false,
            null_text: String::new(),
        }
    }
}

impl DisplayConfig {
    pub fn link_marker(&self) -> &'static str {
        if self.use_glyphs {
            "↳"
        } else {
            ">"
        }
    }

    pub fn favorite_marker(&self) -> &'static str {
        if self.use_glyphs {
            "★"
        } else {
            "*"
        }
    }

    pub fn breadcrumb_separator(&self) -> &'static str {
        if self.use_glyphs {
            " › "
        } else {
            " > "
        }
    }
}

impl Config {
    /// Load config from the default location, creating it on first run.
    /// Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let default_config = Self::default();
            default_config.save()?;
            default_config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cluster-console").join("config.toml"))
    }

    /// Override server settings from the environment. `lookup` is injected so
    /// tests do not touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.base_url = url.trim().to_string();
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.token = Some(token.trim().to_string());
        }
    }

    pub fn create_default_with_comments() -> String {
        r#"# Cluster Console Configuration File
# Location: ~/.config/cluster-console/config.toml (Linux)
#           ~/Library/Application Support/cluster-console/config.toml (macOS)
#           %APPDATA%\cluster-console\config.toml (Windows)

[server]
# Management backend serving /api/clusters/...
# Overridden by CLUSTER_CONSOLE_URL
base_url = "http://localhost:8081"

# Bearer token (overridden by CLUSTER_CONSOLE_TOKEN)
# token = "..."

# Request timeout in seconds
timeout_secs = 30

[browser]
# Deepest level that still offers drill-down; 0 means unlimited
max_depth = 0

# Functions shown per category before "show all"
compact_category_limit = 4

# How often the UI checks for completed fetches (milliseconds)
poll_interval_ms = 50

[display]
# Set to false for ASCII-only markers
use_glyphs = true

# Show row numbers in level tables
show_row_numbers = false

# Text shown for null or missing cells
null_text = ""
"#
        .to_string()
    }

    pub fn init_wizard() -> Result<Self> {
        println!("Cluster Console Configuration Setup");
        println!("===================================");

        let mut config = Config::default();

        let url = prompt(&format!("Backend URL [{}]: ", config.server.base_url))?;
        if !url.is_empty() {
            config.server.base_url = url;
        }

        let token = prompt("API token (leave empty for none): ")?;
        if !token.is_empty() {
            config.server.token = Some(token);
        }

        let glyphs = prompt("Does your terminal support Unicode glyphs? (y/n) [y]: ")?;
        config.display.use_glyphs = !glyphs.eq_ignore_ascii_case("n");

        config.save()?;

        println!("\nConfiguration saved to: {:?}", Config::get_config_path()?);
        println!("You can edit this file directly to customize further.");

        Ok(config)
    }
}

fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8081");
        assert_eq!(config.browser.compact_category_limit, 4);
        assert_eq!(config.browser.max_depth, 0);
        assert!(config.display.use_glyphs);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.token = Some("secret".to_string());
        config.browser.max_depth = 3;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[browser]\nmax_depth = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.browser.max_depth, 2);
        assert_eq!(config.browser.poll_interval_ms, 50);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_commented_default_parses() {
        let config: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            URL_ENV => Some("http://fe:9000 ".to_string()),
            TOKEN_ENV => Some("".to_string()),
            _ => None,
        });
        assert_eq!(config.server.base_url, "http://fe:9000");
        assert_eq!(config.server.token, None);
    }

    #[test]
    fn test_ascii_markers() {
        let display = DisplayConfig {
            use_glyphs: false,
            ..DisplayConfig::default()
        };
        assert_eq!(display.link_marker(), ">");
        assert_eq!(display.favorite_marker(), "*");
    }
}
