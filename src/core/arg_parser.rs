// src/core/arg_parser.rs

use crate::constants::CONFIG_SUFFIX;

/// The tokens that follow the mode name, split into flags and the trailing run
/// of configuration files. Whether the run has a legal length is decided by
/// the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    flags: &'a [String],
    config_files: &'a [String],
}

impl<'a> Classified<'a> {
    /// Partitions `tokens` (everything after the mode name).
    ///
    /// # Logic:
    /// - Scan backwards from the last token.
    /// - Every token ending in `.config` extends the configuration run.
    /// - The first token that does not ends the run; it and everything before
    ///   it are flags, whatever they look like.
    pub fn new(tokens: &'a [String]) -> Self {
        let config_count = tokens
            .iter()
            .rev()
            .take_while(|token| is_config_file(token))
            .count();
        let (flags, config_files) = tokens.split_at(tokens.len() - config_count);
        log::debug!(
            "Classified {} flag token(s) and {} config file(s)",
            flags.len(),
            config_files.len()
        );
        Self {
            flags,
            config_files,
        }
    }

    /// The flag tokens, in command-line order.
    pub fn flags(&self) -> &'a [String] {
        self.flags
    }

    /// The trailing configuration-file tokens, in command-line order.
    pub fn config_files(&self) -> &'a [String] {
        self.config_files
    }

    /// The number of trailing configuration-file tokens. Not capped.
    pub fn config_count(&self) -> usize {
        self.config_files.len()
    }

    /// The last configuration-file token, if any.
    pub fn last_config(&self) -> Option<&'a str> {
        self.config_files.last().map(String::as_str)
    }

    /// The second-to-last configuration-file token, if any.
    pub fn second_to_last_config(&self) -> Option<&'a str> {
        self.config_files
            .len()
            .checked_sub(2)
            .and_then(|i| self.config_files.get(i))
            .map(String::as_str)
    }
}

/// A token names a configuration file iff it ends with the fixed suffix.
pub fn is_config_file(token: &str) -> bool {
    token.ends_with(CONFIG_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_tokens(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_tokens() {
        let tokens = to_tokens(&[]);
        let classified = Classified::new(&tokens);
        assert!(classified.flags().is_empty());
        assert_eq!(classified.config_count(), 0);
        assert_eq!(classified.last_config(), None);
    }

    #[test]
    fn test_flags_only() {
        let tokens = to_tokens(&["--IDs", "0,1,2", "--IDType", "id"]);
        let classified = Classified::new(&tokens);
        assert_eq!(classified.flags(), tokens.as_slice());
        assert_eq!(classified.config_count(), 0);
    }

    #[test]
    fn test_trailing_configs_are_split_off() {
        let tokens = to_tokens(&["--Snap", "100", "global.config", "id.config"]);
        let classified = Classified::new(&tokens);
        assert_eq!(classified.flags(), &tokens[..2]);
        assert_eq!(classified.config_count(), 2);
        assert_eq!(classified.second_to_last_config(), Some("global.config"));
        assert_eq!(classified.last_config(), Some("id.config"));
    }

    #[test]
    fn test_scan_stops_at_first_non_config_token() {
        // The first `.config` token is not trailing, so it is treated as a flag value.
        let tokens = to_tokens(&["a.config", "--Snap", "100", "b.config"]);
        let classified = Classified::new(&tokens);
        assert_eq!(classified.flags(), &tokens[..3]);
        assert_eq!(classified.config_files(), &tokens[3..]);
    }

    #[test]
    fn test_count_is_not_capped() {
        let tokens = to_tokens(&["a.config", "b.config", "c.config"]);
        let classified = Classified::new(&tokens);
        assert!(classified.flags().is_empty());
        assert_eq!(classified.config_count(), 3);
    }

    #[test]
    fn test_suffix_must_be_exact() {
        assert!(is_config_file("my.id.config"));
        assert!(is_config_file(".config"));
        assert!(!is_config_file("global.config.bak"));
        assert!(!is_config_file("config"));
    }
}
