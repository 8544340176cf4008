//! Hub configuration.

/// Channel admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Any `sub` may create and join channels.
    #[default]
    None,
    /// Channels exist only via `sign`, and `sub` must present the channel
    /// token.
    Token,
}

/// Hub configuration.
///
/// Idle budgets are tick counts: the sweeper runs once per
/// `check_interval_secs`, so `polling_idles == polling_timeout_secs /
/// check_interval_secs` makes a parked subscriber live roughly one polling
/// timeout before it is nooped.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hard cap on concurrently live channels; slots are preallocated.
    pub max_channels: usize,
    /// Hard cap on parked subscribers per channel.
    pub max_subscribers_per_channel: usize,
    /// Ring capacity of each channel's recent-message buffer.
    pub channel_buffer_size: usize,
    /// Long-poll timeout in seconds, reported in `ping` and `sign` replies.
    pub polling_timeout: u32,
    /// Sweeper ticks a parked subscriber may sit before it is nooped.
    pub polling_idles: u32,
    /// Default channel lifetime in seconds, used when `sign` passes no
    /// usable `expires`.
    pub channel_timeout: i32,
    /// Sweeper ticks an empty channel may sit before it is freed; also the
    /// value a channel's idle counter is clamped to while it has
    /// subscribers.
    pub channel_idles: i32,
    /// Sweeper cadence in seconds; `sign` converts `expires` into ticks with
    /// this.
    pub check_interval: u32,
    /// Admission policy.
    pub auth: AuthMode,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_channels: 10_000,
            max_subscribers_per_channel: 64,
            channel_buffer_size: 10,
            polling_timeout: 60,
            polling_idles: 20,
            channel_timeout: 120,
            channel_idles: 40,
            check_interval: 3,
            auth: AuthMode::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets_line_up() {
        let config = HubConfig::default();
        assert_eq!(
            config.polling_idles,
            config.polling_timeout / config.check_interval
        );
        assert_eq!(
            config.channel_idles,
            config.channel_timeout / config.check_interval as i32
        );
    }
}
