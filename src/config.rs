use std::env;

/// Base address of the backend instance, e.g. http://localhost:54321
pub const ENV_URL: &str = "NEXT_PUBLIC_SUPABASE_URL";

/// Public (anon) API key used for client construction
pub const ENV_ANON_KEY: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";

/// Direct database connection string; reported in diagnostics, never dialed
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Raw snapshot of the relevant environment variables.
///
/// An empty string counts the same as an unset variable: both required
/// values must be non-empty before a `Config` can be built.
#[derive(Debug, Clone)]
pub struct EnvReport {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub database_url: Option<String>,
}

impl EnvReport {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a report from an arbitrary lookup function so tests don't
    /// have to mutate process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            url: non_empty(ENV_URL),
            anon_key: non_empty(ENV_ANON_KEY),
            database_url: non_empty(ENV_DATABASE_URL),
        }
    }

    /// Names of required variables that are missing or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_none() {
            missing.push(ENV_URL);
        }
        if self.anon_key.is_none() {
            missing.push(ENV_ANON_KEY);
        }
        missing
    }

    /// Rows for the environment status table: (variable name, is set).
    pub fn rows(&self) -> [(&'static str, bool); 3] {
        [
            (ENV_URL, self.url.is_some()),
            (ENV_ANON_KEY, self.anon_key.is_some()),
            (ENV_DATABASE_URL, self.database_url.is_some()),
        ]
    }

    /// Validated configuration pair, or the list of missing variables.
    pub fn into_config(self) -> Result<Config, Vec<&'static str>> {
        match (self.url, self.anon_key) {
            (Some(url), Some(anon_key)) => Ok(Config { url, anon_key }),
            (url, anon_key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push(ENV_URL);
                }
                if anon_key.is_none() {
                    missing.push(ENV_ANON_KEY);
                }
                Err(missing)
            }
        }
    }
}

/// The configuration pair the client handle is constructed from.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub anon_key: String,
}
