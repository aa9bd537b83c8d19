use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings profile the process runs under.
///
/// Selected by the `APP_SETTINGS` environment variable, e.g.
/// `export APP_SETTINGS=testing`. There is no default and no fallback: a
/// process without a profile has no configuration to run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Development,
    Testing,
    Production,
}

impl Profile {
    /// Debug profiles leave log handling to development tooling and accept
    /// local database defaults.
    pub fn is_debug(self) -> bool {
        matches!(self, Profile::Development | Profile::Testing)
    }
}

impl FromStr for Profile {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Profile::Development),
            "testing" => Ok(Profile::Testing),
            "production" => Ok(Profile::Production),
            other => Err(AppError::Configuration(format!(
                "unknown APP_SETTINGS profile '{}' (expected development, testing or production)",
                other
            ))),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Development => "development",
            Profile::Testing => "testing",
            Profile::Production => "production",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub profile: Profile,
    pub debug: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppSettings {
    /// Builds the settings for the profile named by `APP_SETTINGS`.
    ///
    /// Profile defaults are applied first, then per-variable environment
    /// overrides. Called once at startup; the result is shared through the
    /// application for the life of the process.
    pub fn from_env() -> Result<Self, AppError> {
        let selector = env::var("APP_SETTINGS").map_err(|_| {
            AppError::Configuration(
                "APP_SETTINGS must be set to one of: development, testing, production".to_string(),
            )
        })?;
        let profile: Profile = selector.parse()?;
        Self::for_profile(profile)
    }

    fn for_profile(profile: Profile) -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "scaffold".to_string());

        // Database config
        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => match profile {
                Profile::Development => "postgres://localhost/scaffold_dev".to_string(),
                Profile::Testing => "postgres://localhost/scaffold_test".to_string(),
                Profile::Production => {
                    return Err(AppError::Configuration(
                        "DATABASE_URL must be set for the production profile".to_string(),
                    ));
                }
            },
        };

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                AppError::Configuration(
                    "DATABASE_MAX_CONNECTIONS must be a valid number".to_string(),
                )
            })?,
            Err(_) => match profile {
                Profile::Testing => 5,
                _ => 10,
            },
        };

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| {
            match profile {
                Profile::Production => "0.0.0.0",
                _ => "127.0.0.1",
            }
            .to_string()
        });

        // SERVER_PORT wins; PORT covers platforms that inject it at deploy time.
        let server_port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| {
                AppError::Configuration("SERVER_PORT must be a valid port number".to_string())
            })?;

        // CORS origins
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        Ok(Self {
            app: AppConfig {
                name: app_name,
                profile,
                debug: profile.is_debug(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    // Environment variables are process-global; every test that touches them
    // holds this lock and restores the previous values on the way out.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const MANAGED: &[&str] = &[
        "APP_SETTINGS",
        "APP_NAME",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "SERVER_HOST",
        "SERVER_PORT",
        "PORT",
        "CORS_ORIGINS",
    ];

    fn with_vars<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<(&str, Option<String>)> =
            MANAGED.iter().map(|k| (*k, env::var(k).ok())).collect();
        for key in MANAGED {
            unsafe { env::remove_var(key) };
        }
        for (key, value) in vars {
            unsafe { env::set_var(key, value) };
        }
        let out = f();
        for (key, value) in saved {
            match value {
                Some(value) => unsafe { env::set_var(key, value) },
                None => unsafe { env::remove_var(key) },
            }
        }
        out
    }

    #[test]
    fn development_profile_defaults() {
        with_vars(&[("APP_SETTINGS", "development")], || {
            let settings = AppSettings::from_env().unwrap();
            assert_eq!(settings.app.name, "scaffold");
            assert_eq!(settings.app.profile, Profile::Development);
            assert!(settings.app.debug);
            assert_eq!(settings.database.url, "postgres://localhost/scaffold_dev");
            assert_eq!(settings.database.max_connections, 10);
            assert_eq!(settings.server.host, "127.0.0.1");
            assert_eq!(settings.server.port, 8080);
            assert_eq!(settings.server.cors_origins, vec!["*".to_string()]);
        });
    }

    #[test]
    fn testing_profile_defaults() {
        with_vars(&[("APP_SETTINGS", "testing")], || {
            let settings = AppSettings::from_env().unwrap();
            assert_eq!(settings.app.profile, Profile::Testing);
            assert!(settings.app.debug);
            assert_eq!(settings.database.url, "postgres://localhost/scaffold_test");
            assert_eq!(settings.database.max_connections, 5);
        });
    }

    #[test]
    fn production_profile_requires_database_url() {
        with_vars(&[("APP_SETTINGS", "production")], || {
            let err = AppSettings::from_env().unwrap_err();
            assert!(matches!(err, AppError::Configuration(_)));
        });
    }

    #[test]
    fn production_profile_with_database_url() {
        with_vars(
            &[
                ("APP_SETTINGS", "production"),
                ("DATABASE_URL", "postgres://db.internal/scaffold"),
            ],
            || {
                let settings = AppSettings::from_env().unwrap();
                assert_eq!(settings.app.profile, Profile::Production);
                assert!(!settings.app.debug);
                assert_eq!(settings.database.url, "postgres://db.internal/scaffold");
                assert_eq!(settings.server.host, "0.0.0.0");
            },
        );
    }

    #[test]
    fn environment_overrides_profile_defaults() {
        with_vars(
            &[
                ("APP_SETTINGS", "development"),
                ("APP_NAME", "scaffold-staging"),
                ("DATABASE_URL", "postgres://localhost/other"),
                ("DATABASE_MAX_CONNECTIONS", "25"),
                ("SERVER_HOST", "10.0.0.5"),
                ("SERVER_PORT", "9000"),
                ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ],
            || {
                let settings = AppSettings::from_env().unwrap();
                assert_eq!(settings.app.name, "scaffold-staging");
                assert_eq!(settings.database.url, "postgres://localhost/other");
                assert_eq!(settings.database.max_connections, 25);
                assert_eq!(settings.server.host, "10.0.0.5");
                assert_eq!(settings.server.port, 9000);
                assert_eq!(
                    settings.server.cors_origins,
                    vec!["https://a.example".to_string(), "https://b.example".to_string()]
                );
            },
        );
    }

    #[test]
    fn port_variable_is_used_when_server_port_is_unset() {
        with_vars(&[("APP_SETTINGS", "development"), ("PORT", "3000")], || {
            let settings = AppSettings::from_env().unwrap();
            assert_eq!(settings.server.port, 3000);
        });
    }

    #[test]
    fn unset_selector_is_a_configuration_error() {
        with_vars(&[], || {
            let err = AppSettings::from_env().unwrap_err();
            assert!(matches!(err, AppError::Configuration(_)));
        });
    }

    #[test]
    fn unknown_selector_is_a_configuration_error() {
        with_vars(&[("APP_SETTINGS", "staging")], || {
            let err = AppSettings::from_env().unwrap_err();
            assert!(matches!(err, AppError::Configuration(_)));
        });
    }

    #[test]
    fn malformed_port_is_a_configuration_error() {
        with_vars(
            &[("APP_SETTINGS", "development"), ("SERVER_PORT", "not-a-port")],
            || {
                let err = AppSettings::from_env().unwrap_err();
                assert!(matches!(err, AppError::Configuration(_)));
            },
        );
    }

    #[test]
    fn profile_parsing_round_trips_through_display() {
        for profile in [Profile::Development, Profile::Testing, Profile::Production] {
            let parsed: Profile = profile.to_string().parse().unwrap();
            assert_eq!(parsed, profile);
        }
    }

    #[test]
    fn profile_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Profile::Testing).unwrap(),
            serde_json::json!("testing")
        );
        let parsed: Profile = serde_json::from_value(serde_json::json!("production")).unwrap();
        assert_eq!(parsed, Profile::Production);
    }

    #[test]
    fn only_production_is_not_debug() {
        assert!(Profile::Development.is_debug());
        assert!(Profile::Testing.is_debug());
        assert!(!Profile::Production.is_debug());
    }
}
