use crate::core::schedule::DailySchedule;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SELLER_ID: &str = "VILJOEN";
pub const DEFAULT_CUSTOMER_NAME: &str = "SPAR NORTH RAND (11691)";
pub const DEFAULT_REMOTE_PREFIX: &str = "Vilbev-";
pub const DEFAULT_OUTPUT_PREFIX: &str = "Viljoenbev_";
/// 斜線日期先試月在前，日大於 12 時才會落到日在前的格式
pub const DEFAULT_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y%m%d",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub transform: Option<TransformConfig>,
    pub validation: Option<ValidationConfig>,
    pub load: LoadConfig,
    pub schedule: Option<ScheduleConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Sftp,
    Share,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// share 模式下的掛載根目錄
    pub root: Option<String>,
    pub remote_dir: String,
    pub file_prefix: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub raw_dir: String,
    pub extract_dir: Option<String>,
    pub zip_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub seller_id: Option<String>,
    pub default_customer_name: Option<String>,
    pub date_formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_dir: String,
    pub file_prefix: Option<String>,
    pub create_dir_if_missing: Option<bool>,
    pub delete_existing_csvs: Option<bool>,
    pub restrict_delete_to_prefix: Option<String>,
    pub lookback_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub daily_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl Default for IngestConfig {
    /// 沒有設定檔時的預設值，連線資訊全靠環境變數覆蓋
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                name: "viljoen-daily".to_string(),
                description: Some("Viljoen Beverages daily sales ingestion".to_string()),
            },
            source: SourceConfig {
                r#type: SourceType::Sftp,
                host: None,
                port: None,
                username: None,
                password: None,
                root: None,
                remote_dir: "/home/viljoenbev".to_string(),
                file_prefix: None,
                timeout_seconds: None,
                retry_attempts: None,
                retry_delay_seconds: None,
            },
            extract: ExtractConfig {
                raw_dir: "./data/raw".to_string(),
                extract_dir: None,
                zip_pattern: None,
            },
            transform: None,
            validation: None,
            load: LoadConfig {
                output_dir: "${OUTPUT_DIR}".to_string(),
                file_prefix: None,
                create_dir_if_missing: None,
                delete_existing_csvs: None,
                restrict_delete_to_prefix: None,
                lookback_days: None,
            },
            schedule: None,
            monitoring: None,
        }
    }
}

impl IngestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FTP_PASS})，找不到的變數原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 套用原本部署使用的環境變數: ftp_host, ftp_port, ftp_user, ftp_pass, BASE_DIR, OUTPUT_DIR
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ftp_host") {
            self.source.host = Some(host);
        }
        if let Some(port) = lookup("ftp_port") {
            let parsed = port
                .trim()
                .parse::<u16>()
                .map_err(|e| EtlError::InvalidConfigValueError {
                    field: "ftp_port".to_string(),
                    value: port.clone(),
                    reason: e.to_string(),
                })?;
            self.source.port = Some(parsed);
        }
        if let Some(user) = lookup("ftp_user") {
            self.source.username = Some(user);
        }
        if let Some(pass) = lookup("ftp_pass") {
            self.source.password = Some(pass);
        }
        if let Some(base_dir) = lookup("BASE_DIR") {
            self.extract.raw_dir = base_dir;
        }
        if let Some(output_dir) = lookup("OUTPUT_DIR") {
            self.load.output_dir = output_dir;
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        match self.source.r#type {
            SourceType::Sftp => {
                let host = validation::validate_required_field("source.host", &self.source.host)?;
                validation::validate_non_empty_string("source.host", host)?;
                validation::validate_resolved("source.host", host)?;
                let user =
                    validation::validate_required_field("source.username", &self.source.username)?;
                validation::validate_non_empty_string("source.username", user)?;
                validation::validate_resolved("source.username", user)?;
                let pass =
                    validation::validate_required_field("source.password", &self.source.password)?;
                validation::validate_resolved("source.password", pass)?;
                validation::validate_range("source.port", self.port(), 1, u16::MAX)?;
            }
            SourceType::Share => {
                let root = validation::validate_required_field("source.root", &self.source.root)?;
                validation::validate_path("source.root", root)?;
            }
        }
        validation::validate_path("source.remote_dir", &self.source.remote_dir)?;
        validation::validate_file_prefix("source.file_prefix", self.remote_file_prefix())?;
        validation::validate_positive_number(
            "source.timeout_seconds",
            self.timeout().as_secs() as usize,
            1,
        )?;

        validation::validate_path("extract.raw_dir", &self.extract.raw_dir)?;
        validation::validate_path("extract.extract_dir", self.extract_dir())?;
        validation::validate_glob_pattern("extract.zip_pattern", &self.zip_pattern())?;

        validation::validate_path("load.output_dir", &self.load.output_dir)?;
        validation::validate_file_prefix("load.file_prefix", self.output_file_prefix())?;
        if let Some(prefix) = &self.load.restrict_delete_to_prefix {
            validation::validate_file_prefix("load.restrict_delete_to_prefix", prefix)?;
        }
        validation::validate_range("load.lookback_days", self.lookback_days(), 0, 31)?;

        for format in self.date_formats() {
            validation::validate_non_empty_string("transform.date_formats", &format)?;
        }

        if self.schedule.is_some() {
            self.daily_schedule()?;
        }

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.source.port.unwrap_or(22)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(30))
    }

    pub fn retry_attempts(&self) -> u32 {
        self.source.retry_attempts.unwrap_or(2)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.source.retry_delay_seconds.unwrap_or(10))
    }

    pub fn remote_file_prefix(&self) -> &str {
        self.source
            .file_prefix
            .as_deref()
            .unwrap_or(DEFAULT_REMOTE_PREFIX)
    }

    pub fn extract_dir(&self) -> &str {
        self.extract.extract_dir.as_deref().unwrap_or("./data")
    }

    pub fn zip_pattern(&self) -> String {
        self.extract
            .zip_pattern
            .clone()
            .unwrap_or_else(|| format!("{}*.zip", self.remote_file_prefix()))
    }

    pub fn seller_id(&self) -> &str {
        self.transform
            .as_ref()
            .and_then(|t| t.seller_id.as_deref())
            .unwrap_or(DEFAULT_SELLER_ID)
    }

    pub fn default_customer_name(&self) -> &str {
        self.transform
            .as_ref()
            .and_then(|t| t.default_customer_name.as_deref())
            .unwrap_or(DEFAULT_CUSTOMER_NAME)
    }

    pub fn date_formats(&self) -> Vec<String> {
        self.transform
            .as_ref()
            .and_then(|t| t.date_formats.clone())
            .unwrap_or_else(|| DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect())
    }

    pub fn is_strict(&self) -> bool {
        self.validation
            .as_ref()
            .and_then(|v| v.strict)
            .unwrap_or(false)
    }

    pub fn output_file_prefix(&self) -> &str {
        self.load
            .file_prefix
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PREFIX)
    }

    pub fn lookback_days(&self) -> u32 {
        self.load.lookback_days.unwrap_or(3)
    }

    pub fn create_dir_if_missing(&self) -> bool {
        self.load.create_dir_if_missing.unwrap_or(true)
    }

    pub fn delete_existing_csvs(&self) -> bool {
        self.load.delete_existing_csvs.unwrap_or(true)
    }

    pub fn daily_schedule(&self) -> Result<DailySchedule> {
        let schedule = validation::validate_required_field("schedule", &self.schedule)?;
        DailySchedule::parse(&schedule.daily_at)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for IngestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[pipeline]
name = "viljoen-daily"

[source]
type = "sftp"
host = "sftp.example.com"
username = "viljoenbev"
password = "secret"
remote_dir = "/home/viljoenbev"

[extract]
raw_dir = "./data/raw"

[load]
output_dir = "./cleaned"

[schedule]
daily_at = "06:30"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = IngestConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.pipeline.name, "viljoen-daily");
        assert_eq!(config.source.r#type, SourceType::Sftp);
        assert_eq!(config.port(), 22);
        assert_eq!(config.retry_attempts(), 2);
        assert_eq!(config.zip_pattern(), "Vilbev-*.zip");
        assert_eq!(config.seller_id(), "VILJOEN");
        assert_eq!(config.output_file_prefix(), "Viljoenbev_");
        assert_eq!(config.lookback_days(), 3);
        assert!(!config.is_strict());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DAILY_INGEST_TEST_HOST", "sftp.internal");

        let toml_content = BASIC.replace("sftp.example.com", "${DAILY_INGEST_TEST_HOST}");
        let config = IngestConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.source.host.as_deref(), Some("sftp.internal"));

        std::env::remove_var("DAILY_INGEST_TEST_HOST");
    }

    #[test]
    fn test_unresolved_placeholder_fails_validation() {
        let toml_content = BASIC.replace("./cleaned", "${DAILY_INGEST_UNSET_OUTPUT}");
        let config = IngestConfig::from_toml_str(&toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("load.output_dir"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = IngestConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("ftp_host", "10.0.0.5"),
            ("ftp_port", "2222"),
            ("ftp_user", "viljoenbev"),
            ("ftp_pass", "pw"),
            ("BASE_DIR", "/srv/raw"),
            ("OUTPUT_DIR", "/srv/cleaned"),
        ]);

        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.source.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.port(), 2222);
        assert_eq!(config.extract.raw_dir, "/srv/raw");
        assert_eq!(config.load.output_dir, "/srv/cleaned");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = IngestConfig::default();
        let result = config.apply_overrides_from(|key| {
            (key == "ftp_port").then(|| "twenty-two".to_string())
        });
        assert!(matches!(
            result,
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_default_requires_output_dir() {
        let mut config = IngestConfig::default();
        config.source.host = Some("h".to_string());
        config.source.username = Some("u".to_string());
        config.source.password = Some("p".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_share_source_requires_root() {
        let toml_content = r#"
[pipeline]
name = "share"

[source]
type = "share"
remote_dir = "viljoen"

[extract]
raw_dir = "./data/raw"

[load]
output_dir = "./cleaned"
"#;
        let config = IngestConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let toml_content = BASIC.replace("06:30", "25:99");
        let config = IngestConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = IngestConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "viljoen-daily");
        assert_eq!(config.daily_schedule().unwrap().to_string(), "06:30:00");
    }
}
