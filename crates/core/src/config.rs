use std::env;

const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
const DEFAULT_NAMESPACE: &str = "dev";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BUILD_CACHE: bool = true;

/// Process-level configuration, resolved from environment variables with
/// sensible defaults. Components never read the environment themselves;
/// they receive this (or values derived from it) explicitly.
#[derive(Debug, Clone)]
pub struct CaravelConfig {
    /// Docker daemon endpoint, e.g. `unix:///var/run/docker.sock`.
    pub docker_host: String,
    /// Telemetry namespace used when a system has no owning manifest id.
    pub namespace: String,
    pub log_level: String,
    /// Default for `BuildOptions.cache`.
    pub build_cache: bool,
}

impl Default for CaravelConfig {
    fn default() -> Self {
        let docker_host = env::var("CARAVEL_DOCKER_HOST")
            .unwrap_or_else(|_| DEFAULT_DOCKER_HOST.to_string());

        let namespace =
            env::var("CARAVEL_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let log_level = env::var("CARAVEL_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let build_cache = env::var("CARAVEL_BUILD_CACHE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_BUILD_CACHE);

        Self {
            docker_host,
            namespace,
            log_level,
            build_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Defaults apply when the variables are not set; avoid mutating the
        // process environment in tests.
        let config = CaravelConfig {
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            build_cache: DEFAULT_BUILD_CACHE,
        };
        assert!(config.docker_host.starts_with("unix://"));
        assert_eq!(config.namespace, "dev");
        assert!(config.build_cache);
    }
}
