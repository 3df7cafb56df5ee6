//! Provider configuration resolution
//!
//! Turns the raw `token` / `owner` inputs plus their environment fallbacks into a
//! validated [`ResolvedConfig`], or reports every problem found as [`Diagnostics`].
//!
//! Resolution runs in a fixed order and accumulates errors within each stage:
//!
//! 1. unknown values (stop here if any)
//! 2. defaults from `GITHUB_TOKEN` / `GITHUB_OWNER`, overridden by configured values
//! 3. emptiness checks for both attributes
//! 4. client construction

use std::env;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_BASE_URL;
use crate::github::GitHubClient;

/// Environment variable consulted when `token` is not configured
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Environment variable consulted when `owner` is not configured
pub const OWNER_ENV_VAR: &str = "GITHUB_OWNER";

/// A configuration value as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigValue {
    /// Not set at all
    #[default]
    Null,
    /// Set, but cannot be evaluated yet
    Unknown,
    /// Set to a concrete value
    Known(String),
}

impl ConfigValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ConfigValue::Unknown)
    }

    /// The concrete value, if there is one
    pub fn known(&self) -> Option<&str> {
        match self {
            ConfigValue::Known(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Option<&str>> for ConfigValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(ConfigValue::Null, |v| ConfigValue::Known(v.to_string()))
    }
}

/// Raw connection inputs supplied by the caller
#[derive(Clone, Default)]
pub struct ConnectionConfig {
    pub token: ConfigValue,
    pub owner: ConfigValue,
    /// API endpoint; the public GitHub API when absent
    pub base_url: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("token", &MaskedValue(&self.token))
            .field("owner", &self.owner)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A [`ConfigValue`] whose concrete value is rendered as `***`
struct MaskedValue<'a>(&'a ConfigValue);

impl fmt::Debug for MaskedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ConfigValue::Known(value) => f.debug_tuple("Known").field(&Masked(value)).finish(),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Environment-style fallback values for the two required attributes
#[derive(Clone, Default)]
pub struct EnvFallbacks {
    pub token: String,
    pub owner: String,
}

impl EnvFallbacks {
    /// Read fallbacks from `GITHUB_TOKEN` and `GITHUB_OWNER`; unset variables are empty
    pub fn from_env() -> Self {
        Self {
            token: env::var(TOKEN_ENV_VAR).unwrap_or_default(),
            owner: env::var(OWNER_ENV_VAR).unwrap_or_default(),
        }
    }
}

impl fmt::Debug for EnvFallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvFallbacks")
            .field("token", &Masked(&self.token))
            .field("owner", &self.owner)
            .finish()
    }
}

/// Provider attributes that diagnostics can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Token,
    Owner,
}

impl Attribute {
    /// Attribute name in the provider configuration
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Token => "token",
            Attribute::Owner => "owner",
        }
    }

    /// Environment variable that backs this attribute
    pub fn env_var(&self) -> &'static str {
        match self {
            Attribute::Token => TOKEN_ENV_VAR,
            Attribute::Owner => OWNER_ENV_VAR,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Attribute::Token => "GitHub token",
            Attribute::Owner => "GitHub organization name",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single configuration problem
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: {}", unknown_summary(.0), unknown_detail(.0))]
    UnknownValue(Attribute),

    #[error("{}: {}", missing_summary(.0), missing_detail(.0))]
    MissingValue(Attribute),

    #[error(
        "Unable to Create GitHub API Client: An unexpected error occurred when creating the \
         GitHub API client. If the error is not clear, please contact the provider developers. \
         GitHub Client Error: {0}"
    )]
    ClientConstruction(#[source] octocrab::Error),
}

fn unknown_summary(attribute: &Attribute) -> &'static str {
    match attribute {
        Attribute::Token => "Unknown GitHub API Token",
        Attribute::Owner => "Unknown GitHub Organization",
    }
}

fn unknown_detail(attribute: &Attribute) -> String {
    format!(
        "The provider cannot create the GitHub API client as there is an unknown configuration \
         value for the {}. Either apply the source of the value first, set the value statically \
         in the configuration, or use the {} environment variable.",
        attribute.description(),
        attribute.env_var()
    )
}

fn missing_summary(attribute: &Attribute) -> &'static str {
    match attribute {
        Attribute::Token => "Missing GitHub Token",
        Attribute::Owner => "Missing GitHub Organization",
    }
}

fn missing_detail(attribute: &Attribute) -> String {
    format!(
        "The provider cannot create the GitHub API client as there is a missing or empty value \
         for the {}. Set the {} value in the configuration or use the {} environment variable. \
         If either is already set, ensure the value is not empty.",
        attribute.description(),
        attribute.name(),
        attribute.env_var()
    )
}

impl ConfigError {
    /// The attribute this error is scoped to, if any
    pub fn attribute(&self) -> Option<Attribute> {
        match self {
            ConfigError::UnknownValue(attribute) | ConfigError::MissingValue(attribute) => {
                Some(*attribute)
            }
            ConfigError::ClientConstruction(_) => None,
        }
    }

    /// Short headline for the diagnostic
    pub fn summary(&self) -> &'static str {
        match self {
            ConfigError::UnknownValue(attribute) => unknown_summary(attribute),
            ConfigError::MissingValue(attribute) => missing_summary(attribute),
            ConfigError::ClientConstruction(_) => "Unable to Create GitHub API Client",
        }
    }
}

/// Every problem found during one resolution pass. Never empty.
#[derive(Debug)]
pub struct Diagnostics(Vec<ConfigError>);

impl Diagnostics {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigError> {
        self.0.iter()
    }

    /// Errors scoped to `attribute`
    pub fn for_attribute(&self, attribute: Attribute) -> impl Iterator<Item = &ConfigError> {
        self.0
            .iter()
            .filter(move |error| error.attribute() == Some(attribute))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            match error.attribute() {
                Some(attribute) => write!(f, "[{}] {}", attribute, error)?,
                None => write!(f, "{}", error)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a ConfigError;
    type IntoIter = std::slice::Iter<'a, ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Renders a secret as `***` in logs and debug output
pub struct Masked<'a>(pub &'a str);

impl fmt::Display for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Debug for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

/// Validated provider configuration, built once per activation
#[derive(Clone)]
pub struct ResolvedConfig {
    token: String,
    owner: String,
    client: GitHubClient,
}

impl ResolvedConfig {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("token", &Masked(&self.token))
            .field("owner", &self.owner)
            .field("client", &self.client)
            .finish()
    }
}

/// Run the first three resolution stages, returning the non-empty `(token, owner)` pair.
pub fn resolve_credentials(
    config: &ConnectionConfig,
    fallbacks: &EnvFallbacks,
) -> Result<(String, String), Diagnostics> {
    let mut errors = Vec::new();

    if config.token.is_unknown() {
        errors.push(ConfigError::UnknownValue(Attribute::Token));
    }
    if config.owner.is_unknown() {
        errors.push(ConfigError::UnknownValue(Attribute::Owner));
    }
    if !errors.is_empty() {
        return Err(Diagnostics(errors));
    }

    let token = config.token.known().unwrap_or(&fallbacks.token).to_string();
    let owner = config.owner.known().unwrap_or(&fallbacks.owner).to_string();

    if token.is_empty() {
        errors.push(ConfigError::MissingValue(Attribute::Token));
    }
    if owner.is_empty() {
        errors.push(ConfigError::MissingValue(Attribute::Owner));
    }
    if !errors.is_empty() {
        return Err(Diagnostics(errors));
    }

    Ok((token, owner))
}

/// Resolve the provider configuration and build the GitHub client.
pub fn resolve(
    config: &ConnectionConfig,
    fallbacks: &EnvFallbacks,
) -> Result<ResolvedConfig, Diagnostics> {
    debug!("Resolving provider configuration");

    let (token, owner) = resolve_credentials(config, fallbacks).inspect_err(|diagnostics| {
        warn!(
            problems = diagnostics.len(),
            "Provider configuration is invalid: {}", diagnostics
        )
    })?;
    let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

    debug!(
        github_token = %Masked(&token),
        github_owner = %owner,
        base_url,
        "Creating GitHub client"
    );

    let client = GitHubClient::new(&token, base_url).map_err(|e| {
        warn!(base_url, error = %e, "Failed to create GitHub client");
        Diagnostics(vec![ConfigError::ClientConstruction(e)])
    })?;

    info!(
        github_token = %Masked(&token),
        github_owner = %owner,
        success = true,
        "Configured GitHub client"
    );

    Ok(ResolvedConfig {
        token,
        owner,
        client,
    })
}
