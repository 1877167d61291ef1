use std::str::FromStr;
use std::string::String;
use std::{env, fmt};

pub const DEFAULT_ENDPOINT: &str = "https://my.doover.dev";

#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: String,
    pub debug_mode: bool,
    pub verify_ssl: bool,
    pub profile: ProcessorProfile,
}

/// Device family a processor deployment handles.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ProcessorProfile {
    DigitalMatter,
    Rypar,
}

impl FromStr for ProcessorProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "DigitalMatter" => Ok(ProcessorProfile::DigitalMatter),
            "dm" => Ok(ProcessorProfile::DigitalMatter),
            "Rypar" => Ok(ProcessorProfile::Rypar),
            "rypar" => Ok(ProcessorProfile::Rypar),
            other => Err(format!("Invalid or Unsupported processor profile {}", other)),
        }
    }
}

impl fmt::Display for ProcessorProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn parse_bool(name: &str, value: String) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(format!("Error parsing {} to bool - {}", name, other)),
    }
}

impl Config {
    pub fn load_from_env() -> Result<Config, String> {
        let conf = Config {
            endpoint: env::var("DOOVER_API_ENDPOINT")
                .unwrap_or(DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            debug_mode: env::var("DOOVER_DEBUG")
                .map(|v| parse_bool("DOOVER_DEBUG", v))
                .unwrap_or(Ok(false))?,
            verify_ssl: env::var("DOOVER_VERIFY_SSL")
                .map(|v| parse_bool("DOOVER_VERIFY_SSL", v))
                .unwrap_or(Ok(true))?,
            profile: env::var("PROCESSOR_PROFILE")
                .unwrap_or("DigitalMatter".to_string())
                .parse::<ProcessorProfile>()?,
        };

        Ok(conf)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debug_mode: false,
            verify_ssl: true,
            profile: ProcessorProfile::DigitalMatter,
        }
    }
}
