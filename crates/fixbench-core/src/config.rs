//! Configuration for fixbench
//!
//! Stored as TOML, by default in `<config_dir>/fixbench/config.toml`.
//! Business details live here and are handed to the receipt and message
//! builders explicitly.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "fixbench";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "fixbench.db";

/// fixbench configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ticket number prefix (e.g., "FIX" gives FIX-000001)
    pub prefix: String,

    /// Database file; defaults to the platform data directory
    pub database: Option<PathBuf>,

    /// Business details printed on receipts and messages
    #[serde(default)]
    pub business: BusinessInfo,

    /// Receipt settings
    #[serde(default)]
    pub receipt: ReceiptConfig,

    /// WhatsApp settings
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "FIX".to_string(),
            database: None,
            business: BusinessInfo::default(),
            receipt: ReceiptConfig::default(),
            messaging: MessagingConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Business contact details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    pub name: String,
    pub slogan: String,
    pub hours: String,
    pub address: String,
    pub phone: String,
    pub mobile: String,
    pub email: String,
    /// Extra line appended to customer messages
    pub extra: String,
    pub currency_symbol: String,
}

impl Default for BusinessInfo {
    fn default() -> Self {
        Self {
            name: "FixBench".to_string(),
            slogan: String::new(),
            hours: "Monday to Friday 9:00-18:00".to_string(),
            address: String::new(),
            phone: String::new(),
            mobile: String::new(),
            email: String::new(),
            extra: String::new(),
            currency_symbol: "$".to_string(),
        }
    }
}

/// Receipt configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Where generated PDFs go; the system temp directory when unset
    pub output_dir: Option<PathBuf>,

    /// Intake date format on receipts (strftime format)
    pub date_format: String,

    /// Terms printed under the signature line
    pub terms: Vec<String>,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            date_format: "%d/%m/%Y".to_string(),
            terms: vec![
                "A diagnosis fee applies if the quote is not accepted".to_string(),
                "Quotes for repairs left more than 1 month may be revised".to_string(),
            ],
        }
    }
}

/// WhatsApp Web configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Country calling code added to local numbers
    pub country_code: String,

    /// Mobile prefix inserted after the country code for 10-digit numbers
    pub mobile_prefix: String,

    /// Area codes whose 10-digit numbers skip the mobile prefix
    pub mobile_prefix_exempt_areas: Vec<String>,

    /// Send endpoint
    pub base_url: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            country_code: "54".to_string(),
            mobile_prefix: "9".to_string(),
            mobile_prefix_exempt_areas: vec!["11".to_string()],
            base_url: "https://web.whatsapp.com/send".to_string(),
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use colors in output
    pub colors: bool,

    /// Date format for display
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot: the ticket prefix and both date formats
    pub fn validate(&self) -> crate::Result<()> {
        crate::number::validate_prefix(&self.prefix)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        validate_date_format("receipt.date_format", &self.receipt.date_format)?;
        validate_date_format("display.date_format", &self.display.date_format)?;
        Ok(())
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Database location: configured path or the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(default_database_path)
    }

    /// Directory for generated receipts
    pub fn receipt_dir(&self) -> PathBuf {
        self.receipt
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Generate a default config file with comments
    pub fn default_with_comments() -> String {
        r#"# fixbench configuration

# Ticket number prefix (FIX gives FIX-000001)
prefix = "FIX"

# Database file (defaults to the platform data directory)
# database = "/path/to/fixbench.db"

[business]
name = "FixBench"
slogan = ""
hours = "Monday to Friday 9:00-18:00"
address = ""
phone = ""
mobile = ""
email = ""
# Extra line appended to customer messages
extra = ""
currency_symbol = "$"

[receipt]
# Where generated PDFs go (defaults to the system temp directory)
# output_dir = "/path/to/receipts"

# Intake date format on receipts (strftime format)
date_format = "%d/%m/%Y"

# Terms printed under the signature line
terms = [
    "A diagnosis fee applies if the quote is not accepted",
    "Quotes for repairs left more than 1 month may be revised",
]

[messaging]
# Country calling code added to local numbers
country_code = "54"

# Mobile prefix inserted after the country code for 10-digit numbers
mobile_prefix = "9"

# Area codes whose 10-digit numbers skip the mobile prefix
mobile_prefix_exempt_areas = ["11"]

base_url = "https://web.whatsapp.com/send"

[display]
# Use colors in output
colors = true

# Date format for display (strftime format)
date_format = "%Y-%m-%d %H:%M"
"#
        .to_string()
    }
}

/// Reject strftime patterns chrono cannot render.
pub fn validate_date_format(key: &str, format: &str) -> crate::Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(crate::Error::Config(format!(
            "invalid date format for {}: {:?}",
            key, format
        )));
    }
    Ok(())
}

/// Format a timestamp with a configured pattern, falling back to ISO dates
/// when the pattern is invalid.
pub fn format_date<Tz>(at: &DateTime<Tz>, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    match write!(out, "{}", at.format(format)) {
        Ok(()) => out,
        Err(_) => at.format("%Y-%m-%d").to_string(),
    }
}

/// Returns the default config path: `<config_dir>/fixbench/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Returns the default database path: `<data_dir>/fixbench/fixbench.db`.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_default_matches_default() {
        let parsed: Config = toml::from_str(&Config::default_with_comments()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
prefix = "INF"

[business]
name = "InstaFix"
"#,
        )
        .unwrap();
        assert_eq!(parsed.prefix, "INF");
        assert_eq!(parsed.business.name, "InstaFix");
        assert_eq!(parsed.business.currency_symbol, "$");
        assert_eq!(parsed.messaging.country_code, "54");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.prefix = "SHOP".into();
        config.business.mobile = "+54 9 11 5555-0000".into();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_bad_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "prefix = \"FIX-\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_load_rejects_bad_date_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[receipt]\ndate_format = \"%d/%m/%Q\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(&err, crate::Error::Config(msg) if msg.contains("receipt.date_format")));

        std::fs::write(&path, "[display]\ndate_format = \"%Y-%Q\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_validate_date_format() {
        assert!(validate_date_format("display.date_format", "%Y-%m-%d %H:%M").is_ok());
        assert!(validate_date_format("display.date_format", "%d/%m/%Y").is_ok());
        assert!(validate_date_format("display.date_format", "%Q").is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_format_date_falls_back_on_bad_pattern() {
        use chrono::{TimeZone, Utc};
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap();
        assert_eq!(format_date(&at, "%d/%m/%Y"), "14/03/2026");
        assert_eq!(format_date(&at, "%d/%m/%Q"), "2026-03-14");
    }

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("fixbench/config.toml"));
        assert!(default_database_path().ends_with("fixbench/fixbench.db"));
    }
}
