/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "SWARM_ADMISSION_CONFIG_PATH";

/// Prefix for environment overrides, e.g. `SWARM_ADMISSION__LIMITER__GLOBAL_CAPACITY`
pub const ENV_PREFIX: &str = "SWARM_ADMISSION";
pub const ENV_SEPARATOR: &str = "__";

/// Directory and file name under the platform configuration directory
pub const CONFIG_DIR_NAME: &str = "swarm-admission";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Example configuration
pub const DEFAULT_CONFIG: &str = r#"
# Logging configuration
[log]
# Level can be "error", "warn", "info", "debug", or "trace"
level = "info"

# How often the backpressure status is evaluated and logged, in milliseconds
[monitor]
interval_ms = 5000

# Admission limits
[limiter]
# Shared bucket every request draws from
global_capacity = 50
global_refill_rate = 10
global_refill_interval_ms = 1000

# Bucket created for each destination on first use
per_agent_capacity = 10
per_agent_refill_rate = 2
per_agent_refill_interval_ms = 1000

# Backpressure is reported once a bucket has less than this fraction of
# its capacity left
backpressure_threshold = 0.2
"#;
