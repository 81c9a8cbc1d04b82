use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_place() -> String {
    "Berlin, Germany".to_string()
}
fn default_max_distance_m() -> f64 {
    50.0
}
fn default_close_match_m() -> f64 {
    10.0
}
fn default_data_file() -> PathBuf {
    PathBuf::from("data/berlin_trinkbrunnen_wfs.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_verbose() -> bool {
    false
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    /// Place name geocoded for the OpenStreetMap query
    #[serde(default = "default_place")]
    pub place: String,
    #[serde(default = "default_max_distance_m")]
    pub max_distance_m: f64,
    /// Matches at or below this distance count as "very close"; farther
    /// matches get a connector line on the comparison map
    #[serde(default = "default_close_match_m")]
    pub close_match_m: f64,
    /// Local copy of the BWB WFS FeatureCollection
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub wfs: WfsConfig,
    #[serde(default)]
    pub overpass: OverpassConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            place: default_place(),
            max_distance_m: default_max_distance_m(),
            close_match_m: default_close_match_m(),
            data_file: default_data_file(),
            output_dir: default_output_dir(),
            verbose: default_verbose(),
            wfs: WfsConfig::default(),
            overpass: OverpassConfig::default(),
        }
    }
}

fn default_wfs_url() -> String {
    "http://dservices-eu1.arcgis.com/A6FVvQQnrSyq47GD/arcgis/services/Trinkbrunnen_BWB/WFSServer"
        .to_string()
}
fn default_type_name() -> String {
    "Trinkbrunnen_BWB:Trinkbrunnen_BWB".to_string()
}
fn default_output_formats() -> Vec<String> {
    vec!["GEOJSON".to_string(), "ESRIGEOJSON".to_string()]
}
fn default_max_features() -> u32 {
    10000
}
fn default_wfs_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct WfsConfig {
    #[serde(default = "default_wfs_url")]
    pub url: String,
    #[serde(default = "default_type_name")]
    pub type_name: String,
    /// Tried in order until one yields a FeatureCollection
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    #[serde(default = "default_max_features")]
    pub max_features: u32,
    #[serde(default = "default_wfs_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            url: default_wfs_url(),
            type_name: default_type_name(),
            output_formats: default_output_formats(),
            max_features: default_max_features(),
            timeout_secs: default_wfs_timeout_secs(),
        }
    }
}

fn default_overpass_urls() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.private.coffee/api/interpreter".to_string(),
        "https://maps.mail.ru/osm/tools/overpass/api/interpreter".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    200
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl FileConfig {
    /// Load an explicitly requested config file. A missing file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {:?}", path);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Search the usual locations, first parseable file wins.
    ///
    /// Files that fail to parse are skipped; their errors come back alongside
    /// the result so they can be logged once the logger is up.
    pub fn load() -> (Option<Self>, Vec<String>) {
        load_first(&get_config_paths())
    }
}

fn load_first(paths: &[PathBuf]) -> (Option<FileConfig>, Vec<String>) {
    let mut warnings = Vec::new();
    for path in paths {
        if path.exists()
            && let Ok(contents) = std::fs::read_to_string(path)
        {
            match toml::from_str(&contents) {
                Ok(config) => return (Some(config), warnings),
                Err(e) => warnings.push(format!("Failed to parse config file {:?}: {}", path, e)),
            }
        }
    }
    (None, warnings)
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("trinkbrunnen.toml"));
    paths.push(PathBuf::from(".trinkbrunnen.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("trinkbrunnen").join("config.toml"));
        paths.push(config_dir.join("trinkbrunnen.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".trinkbrunnen.toml"));
        paths.push(home.join(".config").join("trinkbrunnen").join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.place, "Berlin, Germany");
        assert_eq!(config.max_distance_m, 50.0);
        assert_eq!(config.close_match_m, 10.0);
        assert_eq!(config.wfs.output_formats, vec!["GEOJSON", "ESRIGEOJSON"]);
        assert_eq!(config.overpass.max_retries, 3);
    }

    #[test]
    fn test_partial_config() {
        let config: FileConfig = toml::from_str(
            r#"
            max_distance_m = 25.0
            [overpass]
            urls = ["https://example.org/api/interpreter"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_distance_m, 25.0);
        assert_eq!(config.overpass.urls.len(), 1);
        assert_eq!(config.overpass.timeout_secs, 200);
        assert_eq!(config.wfs.max_features, 10000);
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trinkbrunnen.toml");
        fs::write(&path, "place = \"Potsdam, Germany\"\n").unwrap();

        let config = FileConfig::from_path(&path).unwrap();
        assert_eq!(config.place, "Potsdam, Germany");

        assert!(FileConfig::from_path(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_first_skips_broken_files() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        fs::write(&broken, "max_distance_m = \"far\"\n").unwrap();
        fs::write(&good, "max_distance_m = 30.0\n").unwrap();

        let paths = vec![dir.path().join("absent.toml"), broken.clone(), good];
        let (config, warnings) = load_first(&paths);

        assert_eq!(config.unwrap().max_distance_m, 30.0);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("broken.toml"));

        let (config, warnings) = load_first(&[broken]);
        assert!(config.is_none());
        assert_eq!(warnings.len(), 1);
    }
}
