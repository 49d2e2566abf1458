//! Channel listing filters

/// Single filter applied when listing channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOption {
    /// Only channels whose peer is online
    ActiveOnly,
    /// Only channels whose peer is offline
    InactiveOnly,
    /// Only announced channels
    PublicOnly,
    /// Only unannounced channels
    PrivateOnly,
}

/// Merged channel filters, all unset by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelOptions {
    /// Active only
    pub active: bool,
    /// Inactive only
    pub inactive: bool,
    /// Public only
    pub public: bool,
    /// Private only
    pub private: bool,
}

impl ChannelOptions {
    /// Start from the defaults and apply each option in order
    pub fn new(options: &[ChannelOption]) -> Self {
        options.iter().copied().collect()
    }

    /// Apply a single option
    pub fn with(mut self, option: ChannelOption) -> Self {
        match option {
            ChannelOption::ActiveOnly => self.active = true,
            ChannelOption::InactiveOnly => self.inactive = true,
            ChannelOption::PublicOnly => self.public = true,
            ChannelOption::PrivateOnly => self.private = true,
        }
        self
    }
}

impl FromIterator<ChannelOption> for ChannelOptions {
    fn from_iter<T: IntoIterator<Item = ChannelOption>>(iter: T) -> Self {
        iter.into_iter().fold(Self::default(), Self::with)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_option_leaves_every_flag_unset() {
        assert_eq!(ChannelOptions::new(&[]), ChannelOptions::default());
    }

    #[test]
    fn test_options_are_merged() {
        let options = ChannelOptions::new(&[ChannelOption::ActiveOnly, ChannelOption::PrivateOnly]);

        assert!(options.active);
        assert!(!options.inactive);
        assert!(!options.public);
        assert!(options.private);
    }

    #[test]
    fn test_repeated_option_is_idempotent() {
        let once = ChannelOptions::new(&[ChannelOption::PublicOnly]);
        let twice = ChannelOptions::new(&[ChannelOption::PublicOnly, ChannelOption::PublicOnly]);

        assert_eq!(once, twice);
    }
}
