use std::env;
use tracing::warn;

pub const DEFAULT_MIN_SPACING_MINUTES: i64 = 30;
/// Upper bound for the spacing; one day.
pub const MAX_MIN_SPACING_MINUTES: i64 = 24 * 60;
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    /// Minimum distance between two active appointments of the same doctor.
    pub min_spacing_minutes: i64,
    pub api_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            min_spacing_minutes: DEFAULT_MIN_SPACING_MINUTES,
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            min_spacing_minutes: spacing_or_default(
                env::var("APPOINTMENT_MIN_SPACING_MINUTES").ok(),
            ),
            api_port: parse_or_default(
                "API_PORT",
                env::var("API_PORT").ok(),
                DEFAULT_API_PORT,
            ),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - appointments will be kept in memory only");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }
}

fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("{} has invalid value '{}', using default {}", name, value, default);
                default
            }
        },
        None => default,
    }
}

/// A spacing outside `1..=MAX_MIN_SPACING_MINUTES` would disable or break the
/// double-booking rule, so it is replaced by the default.
fn spacing_or_default(raw: Option<String>) -> i64 {
    let spacing = parse_or_default(
        "APPOINTMENT_MIN_SPACING_MINUTES",
        raw,
        DEFAULT_MIN_SPACING_MINUTES,
    );

    if !(1..=MAX_MIN_SPACING_MINUTES).contains(&spacing) {
        warn!(
            "APPOINTMENT_MIN_SPACING_MINUTES must be between 1 and {}, got {}; using default {}",
            MAX_MIN_SPACING_MINUTES, spacing, DEFAULT_MIN_SPACING_MINUTES
        );
        return DEFAULT_MIN_SPACING_MINUTES;
    }

    spacing
}
