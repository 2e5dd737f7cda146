/// How `readActiveConsole` resolves stored keys for a queried URL.
///
/// Both behaviors exist in deployments of this pipeline; the policy is an
/// explicit configuration choice, pinned by tests rather than assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatchPolicy {
    /// Look up the exact full key; fall back to the origin key when the full
    /// key holds nothing.
    #[default]
    ExactWithOriginFallback,
    /// Collect every stored key containing the queried origin as a
    /// substring. Lines stored under both the full and origin keys appear
    /// twice under this policy.
    OriginSubstring,
}

impl KeyMatchPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(Self::ExactWithOriginFallback),
            "substring" => Some(Self::OriginSubstring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub match_policy: KeyMatchPolicy,
    /// Whether a successful `readActiveConsole` clears the matched entries.
    pub clear_on_read: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3201".to_string(),
            match_policy: KeyMatchPolicy::default(),
            clear_on_read: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("CONSOLE_SERVER_ADDR").unwrap_or(defaults.bind_addr);

        let match_policy = std::env::var("CONSOLE_MATCH_POLICY")
            .ok()
            .and_then(|v| KeyMatchPolicy::parse(&v))
            .unwrap_or(defaults.match_policy);

        let clear_on_read = std::env::var("CONSOLE_CLEAR_ON_READ")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.clear_on_read);

        Self {
            bind_addr,
            match_policy,
            clear_on_read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3201");
        assert_eq!(config.match_policy, KeyMatchPolicy::ExactWithOriginFallback);
        assert!(!config.clear_on_read);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            KeyMatchPolicy::parse("exact"),
            Some(KeyMatchPolicy::ExactWithOriginFallback)
        );
        assert_eq!(
            KeyMatchPolicy::parse("substring"),
            Some(KeyMatchPolicy::OriginSubstring)
        );
        assert_eq!(KeyMatchPolicy::parse("fuzzy"), None);
    }
}
