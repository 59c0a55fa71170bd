/// Display name used when nothing else is configured.
pub const DEFAULT_USERNAME: &str = "@co3labUjjwal_bot";
/// Environment variable consulted by [`EnvIdentity`].
pub const USERNAME_ENV: &str = "TAP_ME_USERNAME";

/// Source of the display name a session plays under.
pub trait IdentityProvider {
    /// `None` (or an empty name) means no identity is available.
    fn display_name(&self) -> Option<String>;
}

#[derive(Clone, Debug)]
pub struct FixedIdentity(String);

impl FixedIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for FixedIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME)
    }
}

impl IdentityProvider for FixedIdentity {
    fn display_name(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the name from an environment variable, falling back to a fixed name.
#[derive(Clone, Debug)]
pub struct EnvIdentity {
    var: String,
    fallback: Option<String>,
}

impl EnvIdentity {
    pub fn new(var: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            var: var.into(),
            fallback,
        }
    }
}

impl IdentityProvider for EnvIdentity {
    fn display_name(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| self.fallback.clone())
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Box<T> {
    fn display_name(&self) -> Option<String> {
        (**self).display_name()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn fixed_identity__default__uses_bot_name() {
        assert_eq!(
            FixedIdentity::default().display_name().as_deref(),
            Some(DEFAULT_USERNAME)
        );
    }

    #[test]
    fn env_identity__unset_var__uses_fallback() {
        // given
        let identity = EnvIdentity::new(
            "TAP_ME_TEST_SURELY_UNSET_VARIABLE",
            Some("@fallback".to_string()),
        );

        // when
        let name = identity.display_name();

        // then
        assert_eq!(name.as_deref(), Some("@fallback"));
    }

    #[test]
    fn env_identity__unset_var_without_fallback__is_absent() {
        // given
        let identity = EnvIdentity::new("TAP_ME_TEST_SURELY_UNSET_VARIABLE", None);

        // then
        assert_eq!(identity.display_name(), None);
    }
}
