use std::{
    ffi::OsStr,
    fmt, fs,
    net::{AddrParseError, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{
    builder::{BoolishValueParser, TypedValueParser},
    CommandFactory, Parser,
};
use octopus_client::{
    api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT},
    domain::MeterPoint,
};
use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_SCRAPE_PERIOD_SECS: u64 = 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("api-key (OCTOPUS_API_KEY) must be set")]
    MissingApiKey,
    #[error("mpan or mprn (OCTOPUS_MPAN or OCTOPUS_MPRN) must be set")]
    NoMeterPoints,
    #[error("electricity-meter (OCTOPUS_ELECTRICITY_METER) must be set if mpan is set")]
    MissingElectricityMeter,
    #[error("gas-meter (OCTOPUS_GAS_METER) must be set if mprn is set")]
    MissingGasMeter,
    #[error("invalid listen-address '{value}': {source}")]
    InvalidListenAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid {key} '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("request-timeout must be greater than zero")]
    ZeroTimeout,
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Command-line flags. Every flag can also be supplied through its
/// `OCTOPUS_*` environment variable; flags win over the environment.
///
/// Values are kept as strings so that an exported but empty variable
/// (`OCTOPUS_DEBUG=`) means "unset" instead of a parse failure. Typed parsing
/// happens in [`Settings::resolve`].
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "octopus-exporter", version, about = "Prometheus exporter for Octopus Energy consumption")]
pub struct Cli {
    /// The address to listen on for HTTP requests.
    #[arg(long, env = "OCTOPUS_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// The API key.
    #[arg(long, env = "OCTOPUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// The MPAN.
    #[arg(long, env = "OCTOPUS_MPAN")]
    pub mpan: Option<String>,

    /// The electricity meter serial number.
    #[arg(long, env = "OCTOPUS_ELECTRICITY_METER")]
    pub electricity_meter: Option<String>,

    /// The MPRN.
    #[arg(long, env = "OCTOPUS_MPRN")]
    pub mprn: Option<String>,

    /// The gas meter serial number.
    #[arg(long, env = "OCTOPUS_GAS_METER")]
    pub gas_meter: Option<String>,

    /// Time period between scrapes, in seconds.
    #[arg(long, env = "OCTOPUS_SCRAPE_PERIOD")]
    pub scrape_period: Option<String>,

    /// Sets log level to debug. Accepts `--debug` or `--debug=<bool>`.
    #[arg(
        long,
        env = "OCTOPUS_DEBUG",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub debug: Option<String>,

    /// Base URL of the Octopus REST API.
    #[arg(long, env = "OCTOPUS_API_URL")]
    pub api_url: Option<String>,

    /// Upstream request timeout, in seconds.
    #[arg(long, env = "OCTOPUS_REQUEST_TIMEOUT")]
    pub request_timeout: Option<String>,

    /// Optional TOML file providing defaults for any of the settings above.
    #[arg(long, env = "OCTOPUS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Settings read from the optional TOML file. Keys mirror the flag names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub listen_address: Option<String>,
    pub api_key: Option<String>,
    pub mpan: Option<String>,
    pub electricity_meter: Option<String>,
    pub mprn: Option<String>,
    pub gas_meter: Option<String>,
    pub scrape_period: Option<u64>,
    pub debug: Option<bool>,
    pub api_url: Option<String>,
    pub request_timeout: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated, immutable exporter settings.
#[derive(Clone)]
pub struct Settings {
    pub listen_address: SocketAddr,
    pub api_key: String,
    pub api_url: String,
    pub request_timeout: Duration,
    /// Electricity first, then gas.
    pub meters: Vec<MeterPoint>,
    /// Informational; the metrics collector owns the scrape schedule.
    pub scrape_period: Duration,
    pub debug: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("listen_address", &self.listen_address)
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .field("meters", &self.meters)
            .field("scrape_period", &self.scrape_period)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Settings {
    /// Parse the process arguments and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merge flags/environment over the file config and validate the result.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let api_key = pick(cli.api_key, file.api_key).ok_or(ConfigError::MissingApiKey)?;

        let mpan = pick(cli.mpan, file.mpan);
        let mprn = pick(cli.mprn, file.mprn);
        let electricity_meter = pick(cli.electricity_meter, file.electricity_meter);
        let gas_meter = pick(cli.gas_meter, file.gas_meter);

        if mpan.is_none() && mprn.is_none() {
            return Err(ConfigError::NoMeterPoints);
        }

        let mut meters = Vec::with_capacity(2);
        if let Some(mpan) = mpan {
            let meter = electricity_meter.ok_or(ConfigError::MissingElectricityMeter)?;
            meters.push(MeterPoint::electricity(mpan, meter));
        }
        if let Some(mprn) = mprn {
            let meter = gas_meter.ok_or(ConfigError::MissingGasMeter)?;
            meters.push(MeterPoint::gas(mprn, meter));
        }

        let listen_address = pick(cli.listen_address, file.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        let listen_address = parse_listen_address(&listen_address)?;

        let request_timeout = match parse_secs("request-timeout", cli.request_timeout)?.or(file.request_timeout) {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let scrape_period = Duration::from_secs(
            parse_secs("scrape-period", cli.scrape_period)?
                .or(file.scrape_period)
                .unwrap_or(DEFAULT_SCRAPE_PERIOD_SECS),
        );

        let debug = parse_bool("debug", cli.debug)?
            .or(file.debug)
            .unwrap_or(false);

        Ok(Self {
            listen_address,
            api_key,
            api_url: pick(cli.api_url, file.api_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout,
            meters,
            scrape_period,
            debug,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// First non-blank value; blank strings count as unset.
fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    non_blank(primary).or_else(|| non_blank(fallback))
}

fn parse_secs(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<u64>();
    match parsed {
        Ok(secs) => Ok(Some(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Same spellings clap accepts for boolean flags (`true`, `yes`, `on`, `1`, ...).
fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };
    let parsed = BoolishValueParser::new().parse_ref(&Cli::command(), None, OsStr::new(value.trim()));
    match parsed {
        Ok(flag) => Ok(Some(flag)),
        Err(_) => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Accepts `host:port` and the bare `:port` shorthand for all interfaces.
fn parse_listen_address(value: &str) -> Result<SocketAddr, ConfigError> {
    let value = value.trim();
    let candidate = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    candidate
        .parse()
        .map_err(|source| ConfigError::InvalidListenAddress {
            value: value.to_string(),
            source,
        })
}
