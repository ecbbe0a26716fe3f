use anyhow::Context;
use core::time::Duration;

const DEFAULT_SECTIONS: &str = "network+,security+";
const DEFAULT_PG_PORT: u16 = 5432;

/// Startup parameters read from the environment.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    /// Discord bot token.
    pub token: String,
    /// Ed25519 key that signs incoming webhook requests.
    pub public_key: [u8; 32],
    pub pg_username: String,
    pub pg_password: String,
    pub pg_hostname: String,
    pub pg_database: String,
    pub pg_port: u16,
    /// Sections to load at startup. Never empty.
    pub sections: Vec<String>,
    /// Section assigned to new subscribers. Always one of `sections`.
    pub default_section: String,
    /// Time between two scheduler scans.
    pub tick: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("missing environment variable {key}"));

        let port = required("PORT")?.parse().context("PORT is not a valid port number")?;
        let token = required("TOKEN")?;

        let mut public_key = [0; 32];
        hex::decode_to_slice(required("PUB_KEY")?, &mut public_key).context("PUB_KEY is not a 32-byte hex string")?;

        let pg_port = match lookup("PG_PORT") {
            Some(port) => port.parse().context("PG_PORT is not a valid port number")?,
            None => DEFAULT_PG_PORT,
        };

        let sections: Vec<_> = lookup("SECTIONS")
            .as_deref()
            .unwrap_or(DEFAULT_SECTIONS)
            .split(',')
            .map(str::trim)
            .filter(|section| !section.is_empty())
            .map(String::from)
            .collect();
        let first = sections.first().context("SECTIONS does not name any section")?;
        let default_section = lookup("DEFAULT_SECTION").unwrap_or_else(|| first.clone());
        anyhow::ensure!(sections.contains(&default_section), "DEFAULT_SECTION {default_section} is not in SECTIONS");

        let tick = match lookup("TICK_SECS") {
            Some(secs) => secs.parse().context("TICK_SECS is not a number of seconds")?,
            None => api::scheduler::DEFAULT_PERIOD.as_secs(),
        };
        anyhow::ensure!(tick > 0, "TICK_SECS must be positive");

        Ok(Self {
            port,
            token,
            public_key,
            pg_username: required("PG_USERNAME")?,
            pg_password: required("PG_PASSWORD")?,
            pg_hostname: required("PG_HOSTNAME")?,
            pg_database: required("PG_DATABASE")?,
            pg_port,
            sections,
            default_section,
            tick: Duration::from_secs(tick),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn base() -> HashMap<&'static str, String> {
        [
            ("PORT", "3000"),
            ("TOKEN", "bot-token"),
            ("PUB_KEY", KEY),
            ("PG_USERNAME", "drill"),
            ("PG_PASSWORD", "secret"),
            ("PG_HOSTNAME", "localhost"),
            ("PG_DATABASE", "drill"),
        ]
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect()
    }

    fn load(vars: &HashMap<&'static str, String>) -> anyhow::Result<Config> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = load(&base()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.pg_port, 5432);
        assert_eq!(config.public_key[0], 0xd7);
        assert_eq!(config.sections, ["network+", "security+"]);
        assert_eq!(config.default_section, "network+");
        assert_eq!(config.tick, Duration::from_secs(300));
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = base();
        vars.insert("PG_PORT", "6543".into());
        vars.insert("SECTIONS", " a+ , b+,".into());
        vars.insert("DEFAULT_SECTION", "b+".into());
        vars.insert("TICK_SECS", "30".into());
        let config = load(&vars).unwrap();
        assert_eq!(config.pg_port, 6543);
        assert_eq!(config.sections, ["a+", "b+"]);
        assert_eq!(config.default_section, "b+");
        assert_eq!(config.tick, Duration::from_secs(30));
    }

    #[test]
    fn invalid_values_are_fatal() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("PUB_KEY", "abcd"),
            ("SECTIONS", " , "),
            ("DEFAULT_SECTION", "linux+"),
            ("TICK_SECS", "0"),
        ] {
            let mut vars = base();
            vars.insert(key, value.into());
            assert!(load(&vars).is_err(), "{key}={value} should be rejected");
        }

        let mut vars = base();
        vars.remove("TOKEN");
        assert!(load(&vars).is_err());
    }
}
