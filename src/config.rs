//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BOOKING__*` 覆盖（双下划线表示嵌套，如
//! `BOOKING__BACKEND__TIMEOUT_SECS=20`），最后是部署平台惯用的变量名：
//! `LINE_CHANNEL_ACCESS_TOKEN`、`LINE_CHANNEL_SECRET`、`BACKEND_URL`（或 `GAS_URL`）、`PORT`。
//!
//! 频道凭证与后端地址缺失时 validate 失败，服务不应启动。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::backend::DEFAULT_TIMEOUT_SECS;
use crate::core::ConfigError;
use crate::dialogue::Keywords;
use crate::line::DEFAULT_API_BASE;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub line: LineSection,
    pub backend: BackendSection,
    pub session: SessionSection,
    pub keywords: Keywords,
}

/// [server] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// [line] 段：频道凭证
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineSection {
    pub channel_access_token: Option<String>,
    pub channel_secret: Option<String>,
    pub api_base_url: String,
}

impl Default for LineSection {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// [backend] 段：脚本 Web App 地址与等待上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// [session] 段：会话过期（不设 ttl_secs 即永不过期）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub ttl_secs: Option<u64>,
    pub sweep_interval_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            sweep_interval_secs: 300,
        }
    }
}

impl SessionSection {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// 校验通过后的必填项
#[derive(Debug, Clone)]
pub struct Credentials {
    pub channel_access_token: String,
    pub channel_secret: String,
    pub backend_url: String,
}

impl AppConfig {
    /// 必填项齐全才返回 Credentials
    pub fn validate(&self) -> Result<Credentials, ConfigError> {
        let channel_access_token = required(
            &self.line.channel_access_token,
            "line.channel_access_token (LINE_CHANNEL_ACCESS_TOKEN)",
        )?;
        let channel_secret = required(
            &self.line.channel_secret,
            "line.channel_secret (LINE_CHANNEL_SECRET)",
        )?;
        let backend_url = required(&self.backend.url, "backend.url (BACKEND_URL)")?;

        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "backend.url",
                reason: format!("not an http(s) URL: {backend_url}"),
            });
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "backend.timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Credentials {
            channel_access_token,
            channel_secret,
            backend_url,
        })
    }
}

fn required(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or(ConfigError::Missing(key))
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

/// 从 config 目录加载配置，环境变量可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在）
/// 3. 叠加环境变量 BOOKING__*
/// 4. 叠加 LINE_CHANNEL_ACCESS_TOKEN 等惯用变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{}.toml", name)).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BOOKING")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder
        .set_override_option(
            "line.channel_access_token",
            env_var(&["LINE_CHANNEL_ACCESS_TOKEN"]),
        )?
        .set_override_option("line.channel_secret", env_var(&["LINE_CHANNEL_SECRET"]))?
        .set_override_option("backend.url", env_var(&["BACKEND_URL", "GAS_URL"]))?;

    if let Some(port) = env_var(&["PORT"]) {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "PORT",
            reason: format!("not a port number: {port}"),
        })?;
        builder = builder.set_override("server.port", i64::from(port))?;
    }

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.line.channel_access_token = Some("token".into());
        cfg.line.channel_secret = Some("secret".into());
        cfg.backend.url = Some("https://script.google.com/macros/s/x/exec".into());
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.line.api_base_url, DEFAULT_API_BASE);
        assert!(cfg.session.ttl().is_none());
        assert_eq!(cfg.keywords, Keywords::default());
    }

    #[test]
    fn test_validate_complete() {
        let creds = complete().validate().unwrap();
        assert_eq!(creds.channel_secret, "secret");
    }

    #[test]
    fn test_validate_missing_secret() {
        let mut cfg = complete();
        cfg.line.channel_secret = Some("   ".into());
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(key)) if key.contains("channel_secret")));
    }

    #[test]
    fn test_validate_missing_backend_url() {
        let mut cfg = complete();
        cfg.backend.url = None;
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_load_from_explicit_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
timeout_secs = 12

[session]
ttl_secs = 1800

[keywords]
start_booking = "預約"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.backend.timeout_secs, 12);
        assert_eq!(cfg.session.ttl(), Some(Duration::from_secs(1800)));
        assert_eq!(cfg.keywords.start_booking, "預約");
        // 未写的关键词保持默认
        assert_eq!(cfg.keywords.abort, "放棄");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut cfg = complete();
        cfg.backend.url = Some("script.google.com".into());
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { key: "backend.url", .. })));
    }
}
