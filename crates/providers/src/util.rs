use cueso_domain::config::AuthConfig;
use cueso_domain::Error;

pub(crate) fn from_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Http(err.to_string())
    }
}

/// Resolve an API key from config: an inline `key` wins, else read `env`.
pub(crate) fn resolve_api_key(auth: &AuthConfig) -> Result<String, Error> {
    if let Some(key) = &auth.key {
        return Ok(key.clone());
    }
    if let Some(var) = &auth.env {
        return std::env::var(var)
            .map_err(|_| Error::Config(format!("environment variable {var} is not set")));
    }
    Err(Error::Config("no API key configured (set auth.key or auth.env)".into()))
}
