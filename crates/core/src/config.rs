use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `PACING_REPORT__` on top of serde defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Static bearer token accepted by the API (development scheme).
    #[serde(default = "default_api_token")]
    pub token: String,
}

/// Tunables of the pacing computation itself. Every value has a
/// production default matching the sales-ops rulebook; the allocation
/// tolerance band is deliberately a setting rather than a constant.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Opportunities with a budget above this get the smaller buffer.
    #[serde(default = "default_big_budget_border")]
    pub big_budget_border: f64,
    /// Plan buffer multiplier for ordinary opportunities (2%).
    #[serde(default = "default_goal_factor")]
    pub goal_factor: f64,
    /// Plan buffer multiplier for big-budget opportunities (1%).
    #[serde(default = "default_big_goal_factor")]
    pub big_goal_factor: f64,
    /// Campaign goal-allocation sums must land in this inclusive band.
    #[serde(default = "default_min_allocation_sum")]
    pub min_allocation_sum: f64,
    #[serde(default = "default_max_allocation_sum")]
    pub max_allocation_sum: f64,
    /// Fallback rates used when no delivery exists to derive one from.
    #[serde(default = "default_cpm_rate")]
    pub default_cpm_rate: f64,
    #[serde(default = "default_cpv_rate")]
    pub default_cpv_rate: f64,
    /// Quality borders: (high, low) for margin, paired bands for pacing,
    /// (low, high) for view rate and CTR.
    #[serde(default = "default_margin_borders")]
    pub margin_borders: (f64, f64),
    #[serde(default = "default_pacing_borders")]
    pub pacing_borders: ((f64, f64), (f64, f64)),
    #[serde(default = "default_video_view_rate_borders")]
    pub video_view_rate_borders: (f64, f64),
    #[serde(default = "default_ctr_borders")]
    pub ctr_borders: (f64, f64),
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("PACING_REPORT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            token: default_api_token(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            big_budget_border: default_big_budget_border(),
            goal_factor: default_goal_factor(),
            big_goal_factor: default_big_goal_factor(),
            min_allocation_sum: default_min_allocation_sum(),
            max_allocation_sum: default_max_allocation_sum(),
            default_cpm_rate: default_cpm_rate(),
            default_cpv_rate: default_cpv_rate(),
            margin_borders: default_margin_borders(),
            pacing_borders: default_pacing_borders(),
            video_view_rate_borders: default_video_view_rate_borders(),
            ctr_borders: default_ctr_borders(),
        }
    }
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_api_token() -> String {
    "pr_dev_token".to_string()
}
fn default_big_budget_border() -> f64 {
    500_000.0
}
fn default_goal_factor() -> f64 {
    1.02
}
fn default_big_goal_factor() -> f64 {
    1.01
}
fn default_min_allocation_sum() -> f64 {
    90.0
}
fn default_max_allocation_sum() -> f64 {
    110.0
}
fn default_cpm_rate() -> f64 {
    6.25
}
fn default_cpv_rate() -> f64 {
    0.04
}
fn default_margin_borders() -> (f64, f64) {
    (0.40, 0.29)
}
fn default_pacing_borders() -> ((f64, f64), (f64, f64)) {
    ((0.8, 0.9), (1.1, 1.2))
}
fn default_video_view_rate_borders() -> (f64, f64) {
    (0.20, 0.30)
}
fn default_ctr_borders() -> (f64, f64) {
    (0.005, 0.0075)
}
