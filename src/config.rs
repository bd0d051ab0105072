use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::NaiveTime;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub company: CompanySettings,
}

/// Process-wide company settings. Loaded once at startup, never mutated by
/// the core.
///
/// `work_start` and `work_end` are UTC clock times; attendance timestamps
/// are stored in UTC and compared against them directly, so a deployment in
/// another timezone sets WORK_START/WORK_END in UTC.
#[derive(Debug, Clone)]
pub struct CompanySettings {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub late_grace_minutes: i64,
    pub working_days_per_week: u32,
    pub default_overtime_rate: BigDecimal,
    pub default_casual_leave: i32,
    pub default_sick_leave: i32,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/hrcore".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "your-super-secret-jwt-key-change-this-in-production-12345".to_string()
            }),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            company: CompanySettings::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CompanySettings {
    pub fn from_env() -> Self {
        CompanySettings {
            work_start: parse_clock(env::var("WORK_START").ok().as_deref(), 9),
            work_end: parse_clock(env::var("WORK_END").ok().as_deref(), 17),
            late_grace_minutes: env_parse("LATE_GRACE_MINUTES", 15),
            working_days_per_week: env_parse("WORKING_DAYS_PER_WEEK", 5),
            default_overtime_rate: env::var("DEFAULT_OVERTIME_RATE")
                .ok()
                .and_then(|v| BigDecimal::from_str(&v).ok())
                .unwrap_or_else(|| BigDecimal::from(500)),
            default_casual_leave: env_parse("DEFAULT_CASUAL_LEAVE", 18),
            default_sick_leave: env_parse("DEFAULT_SICK_LEAVE", 12),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        }
    }

    /// Daily working hours derived from the configured start/end clock times.
    /// Falls back to 8.0 when the configured window is empty or inverted.
    pub fn standard_work_hours(&self) -> BigDecimal {
        let seconds = (self.work_end - self.work_start).num_seconds();
        if seconds <= 0 {
            return BigDecimal::from(8);
        }
        BigDecimal::from(seconds) / BigDecimal::from(3600)
    }

    /// Clock time after which a check-in counts as late.
    pub fn late_after(&self) -> NaiveTime {
        self.work_start + chrono::Duration::minutes(self.late_grace_minutes)
    }
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            late_grace_minutes: 15,
            working_days_per_week: 5,
            default_overtime_rate: BigDecimal::from(500),
            default_casual_leave: 18,
            default_sick_leave: 12,
            currency: "INR".to_string(),
        }
    }
}

fn parse_clock(value: Option<&str>, default_hour: u32) -> NaiveTime {
    value
        .and_then(|v| NaiveTime::parse_from_str(v, "%H:%M").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(default_hour, 0, 0).unwrap())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_work_hours_from_clock_window() {
        let settings = CompanySettings::default();
        assert_eq!(settings.standard_work_hours(), BigDecimal::from(8));
    }

    #[test]
    fn standard_work_hours_falls_back_on_inverted_window() {
        let settings = CompanySettings {
            work_start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ..CompanySettings::default()
        };
        assert_eq!(settings.standard_work_hours(), BigDecimal::from(8));
    }

    #[test]
    fn late_after_adds_grace_to_work_start() {
        let settings = CompanySettings::default();
        assert_eq!(
            settings.late_after(),
            NaiveTime::from_hms_opt(9, 15, 0).unwrap()
        );
    }
}
