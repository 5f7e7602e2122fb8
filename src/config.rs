use anyhow::Context;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Settings {
    /// Reads settings from the environment, after loading `.env` if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        load_env_file(dotenvy::dotenv().map(|_| ()))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        let max_connections = match lookup("GRADEHUB_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("GRADEHUB_MAX_CONNECTIONS must be a number, got `{value}`"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to the GradeHub Postgres instance")
    }
}

/// A missing `.env` is fine; one that exists but cannot be read or parsed is not.
fn load_env_file(result: Result<(), dotenvy::Error>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("failed to load .env file"),
    }
}
