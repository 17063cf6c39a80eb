//! Engine-wide tunables, built with the same fluent `Builder` shape the
//! endpoint/transaction layers in this codebase's lineage use.

use std::time::Duration;

/// RFC 3261 §17.1.1.1 retransmission base interval.
pub const T1: Duration = Duration::from_millis(500);
/// RFC 3261 §17.1.1.1 retransmission cap for non-INVITE and INVITE
/// response retransmissions over UDP.
pub const T2: Duration = Duration::from_secs(4);
/// RFC 3261 §17.1.2.2 non-INVITE final-response absorb interval (`timer_k`
/// default over UDP).
pub const T4: Duration = Duration::from_secs(5);

/// Immutable, cheaply-cloneable configuration for the routing and UAC
/// components. Build one with [`EngineConfigBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hard wall-clock transaction timeout (`call.trans_time`). Default
    /// `64 * T1` = 32s, matching RFC 3261 Timer B / Timer F.
    pub trans_time: Duration,
    /// INVITE provisional guard (`timer_c`). Default 180s.
    pub timer_c: Duration,
    /// Non-2xx final-response absorb interval over UDP (`timer_d`).
    /// Default 32s.
    pub timer_d: Duration,
    /// RFC 6026 2xx-absorb interval (`timer_m`). Default 32s.
    pub timer_m: Duration,
    /// Non-INVITE final-response absorb interval over UDP (`timer_k`).
    /// Default `T4` = 5s.
    pub timer_k: Duration,
    /// Retransmission base interval.
    pub t1: Duration,
    /// Retransmission interval cap.
    pub t2: Duration,
    /// Whether requests are proxied statelessly by default when the
    /// caller's options do not say either way.
    pub stateless_default: bool,
    /// How many `(msg_id, trans_id, dialog_id)` entries a [`crate::call::Call`]
    /// keeps in its recent-message log before evicting the oldest.
    pub msg_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trans_time: T1 * 64,
            timer_c: Duration::from_secs(180),
            timer_d: Duration::from_secs(32),
            timer_m: Duration::from_secs(32),
            timer_k: T4,
            t1: T1,
            t2: T2,
            stateless_default: false,
            msg_log_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Starts a builder seeded with the defaults above.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl EngineConfigBuilder {
    /// Overrides the hard wall-clock transaction timeout.
    pub fn trans_time(mut self, d: Duration) -> Self {
        self.config.trans_time = d;
        self
    }

    /// Overrides the INVITE provisional guard (`timer_c`).
    pub fn timer_c(mut self, d: Duration) -> Self {
        self.config.timer_c = d;
        self
    }

    /// Overrides the non-2xx absorb interval (`timer_d`).
    pub fn timer_d(mut self, d: Duration) -> Self {
        self.config.timer_d = d;
        self
    }

    /// Overrides the RFC 6026 2xx-absorb interval (`timer_m`).
    pub fn timer_m(mut self, d: Duration) -> Self {
        self.config.timer_m = d;
        self
    }

    /// Overrides the non-INVITE final-response absorb interval (`timer_k`).
    pub fn timer_k(mut self, d: Duration) -> Self {
        self.config.timer_k = d;
        self
    }

    /// Overrides the retransmission base interval.
    pub fn t1(mut self, d: Duration) -> Self {
        self.config.t1 = d;
        self
    }

    /// Overrides the retransmission interval cap.
    pub fn t2(mut self, d: Duration) -> Self {
        self.config.t2 = d;
        self
    }

    /// Sets the default statelessness used when callers don't specify.
    pub fn stateless_default(mut self, stateless: bool) -> Self {
        self.config.stateless_default = stateless;
        self
    }

    /// Overrides the recent-message log capacity.
    pub fn msg_log_capacity(mut self, n: usize) -> Self {
        self.config.msg_log_capacity = n;
        self
    }

    /// Freezes the builder into an immutable [`EngineConfig`].
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
