//! Cooldown system for rate limiting command usage

use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zibot_common::{ChannelId, GuildId, Origin, UserId};

/// What a cooldown window is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    /// One window shared by everybody.
    Global,
    /// One window per invoking user.
    User,
    /// One window per guild; direct messages count per channel.
    Group,
}

/// Identity a window is tracked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The global singleton.
    Global,
    /// A user.
    User(UserId),
    /// A guild.
    Guild(GuildId),
    /// A channel outside any guild.
    Channel(ChannelId),
}

/// Cooldown configuration for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Invocations allowed per window, at least 1
    pub max_invocations: u32,
    /// Length of the window
    pub window: Duration,
    /// What the window is counted against
    pub scope: CooldownScope,
    /// Guilds that never count against this cooldown
    pub exempt_groups: HashSet<GuildId>,
}

impl CooldownPolicy {
    /// Create a policy; `max_invocations` below 1 is raised to 1
    pub fn new(max_invocations: u32, window: Duration, scope: CooldownScope) -> Self {
        Self {
            max_invocations: max_invocations.max(1),
            window,
            scope,
            exempt_groups: HashSet::new(),
        }
    }

    /// Policy counted per invoking user
    pub fn per_user(max_invocations: u32, window: Duration) -> Self {
        Self::new(max_invocations, window, CooldownScope::User)
    }

    /// Policy counted per guild
    pub fn per_group(max_invocations: u32, window: Duration) -> Self {
        Self::new(max_invocations, window, CooldownScope::Group)
    }

    /// Policy shared by everybody
    pub fn global(max_invocations: u32, window: Duration) -> Self {
        Self::new(max_invocations, window, CooldownScope::Global)
    }

    /// Adds guilds exempt from this cooldown
    #[must_use]
    pub fn exempt<I: IntoIterator<Item = GuildId>>(mut self, groups: I) -> Self {
        self.exempt_groups.extend(groups);
        self
    }

    /// Derives the key a given invocation is counted under
    pub fn scope_key(&self, invoker: UserId, origin: &Origin) -> ScopeKey {
        match self.scope {
            CooldownScope::Global => ScopeKey::Global,
            CooldownScope::User => ScopeKey::User(invoker),
            CooldownScope::Group => origin
                .guild
                .map_or(ScopeKey::Channel(origin.channel), ScopeKey::Guild),
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The invocation may run and has been counted
    Admit,
    /// The window is full; nothing was counted
    Reject {
        /// How long until a slot frees up, always greater than zero
        retry_after: Duration,
    },
}

#[derive(Debug)]
struct CooldownWindow {
    window: Duration,
    hits: VecDeque<Instant>,
}

impl CooldownWindow {
    fn evict(&mut self, now: Instant) {
        let window = self.window;
        self.hits
            .retain(|hit| now.saturating_duration_since(*hit) < window);
    }
}

/// Fixed-window rate limiter keyed by (command, scope key)
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(String, ScopeKey), CooldownWindow>,
    exempt_groups: HashSet<GuildId>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rate limiter that admits every invocation from the given guilds
    pub fn with_exempt_groups<I: IntoIterator<Item = GuildId>>(groups: I) -> Self {
        Self {
            windows: DashMap::new(),
            exempt_groups: groups.into_iter().collect(),
        }
    }

    /// Whether an invocation from `origin` skips `policy` entirely
    pub fn is_exempt(&self, policy: &CooldownPolicy, origin: &Origin) -> bool {
        origin
            .guild
            .is_some_and(|guild| self.exempt_groups.contains(&guild) || policy.exempt_groups.contains(&guild))
    }

    /// Check an invocation and count it if admitted
    pub fn check(
        &self,
        command: &str,
        policy: &CooldownPolicy,
        invoker: UserId,
        origin: &Origin,
        now: Instant,
    ) -> Admission {
        if self.is_exempt(policy, origin) {
            debug!("Command '{}' is cooldown-exempt in {}", command, origin);
            return Admission::Admit;
        }

        self.check_key(command, policy, policy.scope_key(invoker, origin), now)
    }

    /// Check and count against an explicit scope key
    pub fn check_key(&self, command: &str, policy: &CooldownPolicy, key: ScopeKey, now: Instant) -> Admission {
        // The entry guard holds the shard lock, making check-and-record atomic per key.
        let mut entry = self
            .windows
            .entry((command.to_string(), key))
            .or_insert_with(|| CooldownWindow {
                window: policy.window,
                hits: VecDeque::new(),
            });
        let state = entry.value_mut();
        state.window = policy.window;
        state.evict(now);

        if state.hits.len() >= policy.max_invocations as usize {
            let earliest = state.hits.iter().min().copied().unwrap_or(now);
            let retry_after = policy.window - now.saturating_duration_since(earliest);
            debug!(
                "Command '{}' on cooldown for {:?} (retry after {:?})",
                command, key, retry_after
            );
            return Admission::Reject { retry_after };
        }

        state.hits.push_back(now);
        Admission::Admit
    }

    /// Number of invocations currently counted for a key
    pub fn in_window(&self, command: &str, key: ScopeKey, now: Instant) -> usize {
        self.windows.get(&(command.to_string(), key)).map_or(0, |entry| {
            entry
                .hits
                .iter()
                .filter(|hit| now.saturating_duration_since(**hit) < entry.window)
                .count()
        })
    }

    /// Get the number of tracked windows
    pub fn active_windows(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window that has fully elapsed at `now`
    pub fn evict_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, state| {
            state.evict(now);
            !state.hits.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!("Evicted {} expired cooldown windows", removed);
        }
        removed
    }

    /// Runs [`evict_expired`](Self::evict_expired) every `interval` until `shutdown` is cancelled
    pub fn spawn_evictor(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.evict_expired(Instant::now());
                    }
                }
            }
        })
    }
}
