use crate::{
    gateway::DEFAULT_ENDPOINT,
    identity::{
        DEFAULT_USERNAME,
        EnvIdentity,
        FixedIdentity,
        IdentityProvider,
        USERNAME_ENV,
    },
    progress::LevelUpRule,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const USAGE: &str = "Usage: tap-me [--endpoint <url>] [--username <name>] [--legacy-level-rule]\n\
     [--log-dir <path>] [--timeout-secs <n>]\n\
     \n\
     Flags:\n\
       --endpoint <url>       GraphQL endpoint holding player balances\n\
       --username <name>      Play as this display name (else $TAP_ME_USERNAME, else the default bot)\n\
       --legacy-level-rule    Let the bar rest at 100 and level up on `progress + 1 >= 100`\n\
       --log-dir <path>       Directory for the rolling log file\n\
       --timeout-secs <n>     HTTP request timeout in seconds\n\
     \n\
     Keys: space/enter or mouse click to tap, q/esc to quit";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub level_rule: LevelUpRule,
    pub log_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            level_rule: LevelUpRule::OnWrap,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn identity(&self) -> Box<dyn IdentityProvider> {
        match &self.username {
            Some(name) => Box::new(FixedIdentity::new(name.clone())),
            None => Box::new(EnvIdentity::new(
                USERNAME_ENV,
                Some(DEFAULT_USERNAME.to_string()),
            )),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Run(AppConfig),
    Help,
}

pub fn parse_cli_args<I>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = AppConfig::default();
    let mut endpoint: Option<String> = None;
    let mut log_dir: Option<PathBuf> = None;
    let mut timeout: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--endpoint" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--endpoint requires a URL argument"))?;
                if endpoint.is_some() {
                    return Err(eyre!("--endpoint may only be specified once"));
                }
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(eyre!("--endpoint must be an http(s) URL, got {url}"));
                }
                endpoint = Some(url);
            }
            "--username" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--username requires a name argument"))?;
                if config.username.is_some() {
                    return Err(eyre!("--username may only be specified once"));
                }
                if name.trim().is_empty() {
                    return Err(eyre!("--username must not be blank"));
                }
                config.username = Some(name);
            }
            "--legacy-level-rule" => config.level_rule = LevelUpRule::LegacyUnitProbe,
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                if log_dir.is_some() {
                    return Err(eyre!("--log-dir may only be specified once"));
                }
                log_dir = Some(PathBuf::from(dir));
            }
            "--timeout-secs" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--timeout-secs requires a number"))?;
                if timeout.is_some() {
                    return Err(eyre!("--timeout-secs may only be specified once"));
                }
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| eyre!("--timeout-secs expects a whole number, got {raw}"))?;
                if secs == 0 {
                    return Err(eyre!("--timeout-secs must be at least 1"));
                }
                timeout = Some(secs);
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    if let Some(url) = endpoint {
        config.endpoint = url;
    }
    if let Some(dir) = log_dir {
        config.log_dir = dir;
    }
    if let Some(secs) = timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    Ok(CliCommand::Run(config))
}
