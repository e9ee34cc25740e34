/// Default upstream for schedules, standings and results.
const DEFAULT_F1_API_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";
/// Default IP-geolocation upstream.
const DEFAULT_GEO_API_BASE_URL: &str = "https://ipapi.co";
/// How often the next-race schedule is refetched when unset (seconds).
const DEFAULT_SCHEDULE_REFRESH_SECS: u64 = 30;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub f1_api_base_url: String,
    pub geo_api_base_url: String,
    pub user_agent: String,
    /// Period of the next-race refetch loop.
    pub schedule_refresh_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            f1_api_base_url: std::env::var("F1_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_F1_API_BASE_URL.to_string()),
            geo_api_base_url: std::env::var("GEO_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEO_API_BASE_URL.to_string()),
            user_agent: std::env::var("HTTP_USER_AGENT").unwrap_or_else(|_| {
                "PaddockApi/0.1 (+https://github.com/paddock-dashboard)".to_string()
            }),
            schedule_refresh_secs: std::env::var("SCHEDULE_REFRESH_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .expect("SCHEDULE_REFRESH_SECS must be a whole number of seconds")
                })
                .unwrap_or(DEFAULT_SCHEDULE_REFRESH_SECS)
                .max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // Env mutation races with other tests that read the same variables;
        // only this test touches them.
        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("F1_API_BASE_URL");
            std::env::remove_var("GEO_API_BASE_URL");
            std::env::remove_var("HTTP_USER_AGENT");
            std::env::remove_var("SCHEDULE_REFRESH_SECS");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.f1_api_base_url, "https://api.jolpi.ca/ergast/f1");
        assert_eq!(config.geo_api_base_url, "https://ipapi.co");
        assert!(config.user_agent.contains("PaddockApi"));
        assert_eq!(config.schedule_refresh_secs, 30);
    }
}
