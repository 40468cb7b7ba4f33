//! Uptime command reading the start time from the shared [`Data`].

use chrono::Utc;
use std::sync::Arc;

use crate::context::{Invocation, Reply};
use crate::framework::Data;
use crate::registry::CommandDescriptor;
use zibot_common::{format_duration, format_timestamp};

/// Shows bot uptime.
pub fn uptime(data: &Arc<Data>) -> CommandDescriptor {
    let data = data.clone();
    CommandDescriptor::new("uptime", move |_: Invocation| {
        let reply = uptime_text(&data);
        async move { Ok::<_, crate::context::CommandError>(Reply::Text(reply)) }
    })
    .aliases(["up"])
    .description("Show how long the bot has been running")
}

fn uptime_text(data: &Data) -> String {
    let elapsed = (Utc::now() - data.started_at).to_std().unwrap_or_default();
    format!(
        "Bot uptime: {} (since {})",
        format_duration(elapsed),
        format_timestamp(data.started_at)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::RateLimiter;
    use crate::paging::SessionSupervisor;
    use crate::testing::RecordingTransport;
    use chrono::Duration;
    use zibot_config::Config;

    #[tokio::test]
    async fn test_uptime_text() {
        let config = Config::default();
        let data = Data {
            supervisor: SessionSupervisor::new(Arc::new(RecordingTransport::new()), config.paging.clone()),
            config: Arc::new(config),
            started_at: Utc::now() - Duration::seconds(3_661),
            limiter: Arc::new(RateLimiter::new()),
        };

        let text = uptime_text(&data);
        assert!(text.starts_with("Bot uptime: 1h 1m"), "{text}");
    }
}
