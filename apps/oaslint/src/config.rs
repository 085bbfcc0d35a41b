//! Configuration discovery and effective settings resolution.
//!
//! oaslint reads `oaslint.toml|yaml|yml` from the given root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `rules.disabled`: none; `rules.severity`: each rule's default
//! - `serve.transport`: `stdio`
//! - `serve.bind`: `0.0.0.0:8081`
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILES: [&str; 3] = ["oaslint.toml", "oaslint.yaml", "oaslint.yml"];
pub const DEFAULT_BIND: &str = "0.0.0.0:8081";

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
/// Rule selection under `[rules]`.
pub struct RulesCfg {
    pub disabled: Vec<String>,
    /// `[rules.severity]`: rule id -> `error|warning|info`.
    pub severity: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Server settings under `[serve]`.
pub struct ServeCfg {
    pub transport: Option<String>,
    pub bind: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `oaslint.toml|yaml`.
pub struct OaslintConfig {
    pub output: Option<String>,
    #[serde(default)]
    pub rules: RulesCfg,
    #[serde(default)]
    pub serve: ServeCfg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl Transport {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stdio" => Some(Transport::Stdio),
            "http" => Some(Transport::Http),
            _ => None,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => f.write_str("stdio"),
            Transport::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    /// Path of the config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
    pub output: String,
    pub rules: RulesCfg,
    pub transport: Transport,
    pub bind: String,
}

/// Walk upward from `start` to detect the project root.
///
/// Stops when an `oaslint.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `OaslintConfig` from the first config file present in `root`.
///
/// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, OaslintConfig)>> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<OaslintConfig>(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<OaslintConfig>(&text).map_err(|e| e.to_string())
        };
        let cfg = parsed.map_err(|message| ConfigError::Parse {
            path: path.clone(),
            message,
        })?;
        return Ok(Some((path, cfg)));
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_root: Option<&str>,
    cli_output: Option<&str>,
    cli_transport: Option<&str>,
    cli_bind: Option<&str>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_root.unwrap_or("."));
    let root = detect_root(&start);
    let (config_path, cfg) = match load_config(&root)? {
        Some((path, cfg)) => (Some(path), cfg),
        None => (None, OaslintConfig::default()),
    };

    let output = cli_output
        .map(str::to_string)
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if output != "human" && output != "json" {
        return Err(ConfigError::InvalidValue {
            key: "output".into(),
            value: output,
        });
    }

    let transport_src = cli_transport
        .map(str::to_string)
        .or(cfg.serve.transport)
        .unwrap_or_else(|| "stdio".to_string());
    let transport = Transport::parse(&transport_src).ok_or_else(|| ConfigError::InvalidValue {
        key: "serve.transport".into(),
        value: transport_src.clone(),
    })?;

    let bind = cli_bind
        .map(str::to_string)
        .or(cfg.serve.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    Ok(Effective {
        root,
        config_path,
        output,
        rules: cfg.rules,
        transport,
        bind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("oaslint.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"
[rules]
disabled = ["missing-operation-id"]
[rules.severity]
unused-component = "warning"
[serve]
transport = "http"
bind = "127.0.0.1:9000"
    "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.rules.disabled, vec!["missing-operation-id".to_string()]);
        assert_eq!(
            eff.rules.severity.get("unused-component").map(String::as_str),
            Some("warning")
        );
        assert_eq!(eff.transport, Transport::Http);
        assert_eq!(eff.bind, "127.0.0.1:9000");
        assert!(eff.config_path.is_some());
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("oaslint.yaml"), "rules:\n  disabled: [unused-component]\n").unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None).unwrap();
        assert_eq!(eff.output, "human");
        assert_eq!(eff.transport, Transport::Stdio);
        assert_eq!(eff.bind, DEFAULT_BIND);
        assert_eq!(eff.rules.disabled, vec!["unused-component".to_string()]);
        assert!(eff.rules.severity.is_empty());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("oaslint.toml"),
            "output = \"json\"\n[serve]\ntransport = \"http\"\n",
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), Some("human"), Some("stdio"), Some("127.0.0.1:1"))
            .unwrap();
        assert_eq!(eff.output, "human");
        assert_eq!(eff.transport, Transport::Stdio);
        assert_eq!(eff.bind, "127.0.0.1:1");
    }

    #[test]
    fn test_walks_up_to_git_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join(".git")).unwrap();
        let nested = root.join("specs/v1");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("oaslint.toml"), "output = [").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None, None, None),
            Err(ConfigError::Parse { .. })
        ));

        fs::write(root.join("oaslint.toml"), "output = \"xml\"").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None, None, None),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_no_config_is_not_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let eff = resolve_effective(dir.path().to_str(), None, None, None).unwrap();
        assert!(eff.config_path.is_none());
        assert_eq!(eff.output, "human");
    }
}
