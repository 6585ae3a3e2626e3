//! Request access validation.
//!
//! The engine consults its validator once, during lazy initialization,
//! against the request that triggered it. A rejection leaves the engine
//! uninitialized, so the next dispatch re-validates.

use crate::config::Config;
use crate::error::Error;
use crate::request::Request;
use tracing::warn;

/// Gatekeeper consulted by the engine before a top-level request is routed.
pub trait AccessValidator: Send + Sync {
    fn validate(&self, config: &Config, req: &Request) -> Result<(), Error>;
}

/// Validates a request param against the configured client secret.
///
/// When the configuration carries no secret the check is disabled and every
/// request passes.
pub struct SecretParamValidator {
    param_name: String,
}

impl SecretParamValidator {
    pub fn new() -> Self {
        SecretParamValidator {
            param_name: "client_secret".to_string(),
        }
    }

    pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = name.into();
        self
    }
}

impl Default for SecretParamValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessValidator for SecretParamValidator {
    fn validate(&self, config: &Config, req: &Request) -> Result<(), Error> {
        let Some(expected) = config.client_secret() else {
            return Ok(());
        };
        match req.param_str(&self.param_name) {
            Some(presented) if presented == expected => Ok(()),
            Some(_) => {
                warn!(path = %req.path(), param = %self.param_name, "client secret mismatch");
                Err(Error::unauthorized("client secret mismatch"))
            }
            None => {
                warn!(path = %req.path(), param = %self.param_name, "client secret missing");
                Err(Error::unauthorized("client secret missing"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_passes_when_no_secret_configured() {
        let config = Config::builder().build();
        let req = Request::new(Method::GET, "/anything");
        assert!(SecretParamValidator::new().validate(&config, &req).is_ok());
    }

    #[test]
    fn test_rejects_missing_and_wrong_secret() {
        let config = Config::builder().client_secret("s3cret").build();
        let validator = SecretParamValidator::new();

        let req = Request::new(Method::GET, "/x");
        let err = validator.validate(&config, &req).unwrap_err();
        assert_eq!(err.status(), 401);

        let mut req = Request::new(Method::GET, "/x");
        req.set_param("client_secret", "wrong");
        assert!(validator.validate(&config, &req).is_err());
    }

    #[test]
    fn test_accepts_matching_secret_under_custom_param() {
        let config = Config::builder().client_secret("s3cret").build();
        let validator = SecretParamValidator::new().with_param_name("token");
        let mut req = Request::new(Method::GET, "/x");
        req.set_param("token", "s3cret");
        assert!(validator.validate(&config, &req).is_ok());
    }
}
