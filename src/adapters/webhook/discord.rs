//! Discord webhook notification channel.
//!
//! Formats a floor-drop event as a single embed and POSTs it to one
//! webhook URL. Discord answers a successful webhook execution with
//! `204 No Content`; any other status counts as a failed delivery.
//! No retries: each target gets exactly one attempt per event.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::config::WebhookTarget;
use crate::domain::floor::{PriceChangeEvent, format_sats};
use crate::errors::DeliveryError;
use crate::ports::notifier::Notifier;

/// Embed color for discounted listings (red).
const EMBED_COLOR: u32 = 0xFF0000;

const EMBED_TITLE: &str = "Discounted Listing Detected 👀";

/// Footer text identifying the sender.
const FOOTER_TEXT: &str = "unisat-floor-monitor";

/// Webhook execution body.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl Embed {
    fn field(&mut self, name: &str, value: String, inline: bool) {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value,
            inline,
        });
    }
}

/// Build the webhook body for an event.
pub fn build_payload(event: &PriceChangeEvent) -> WebhookMessage {
    let mut embed = Embed {
        title: EMBED_TITLE.to_string(),
        description: format!("**{:.2}% off floor** 🚀", event.delta_pct),
        color: EMBED_COLOR,
        timestamp: event.observed_at.to_rfc3339(),
        fields: Vec::with_capacity(6),
        footer: EmbedFooter {
            text: FOOTER_TEXT.to_string(),
        },
    };

    embed.field(
        "Collection",
        format!("[**{}**]({})", event.tick, event.collection_url),
        false,
    );
    embed.field(
        "Old Floor 💸",
        format!("**{} sats**", format_sats(event.old_floor)),
        true,
    );
    embed.field(
        "New Listing 🤑",
        format!("**{} sats**", format_sats(event.new_floor)),
        true,
    );
    embed.field("Price 💰", format!("**{:.5} BTC**", event.price_btc), false);
    embed.field("Delta 📊", format!("**{:.2} USD**", event.delta_usd), true);
    embed.field(
        "Buy Now 🛒",
        format!("[**Open listing**]({})", event.listing_url),
        false,
    );

    WebhookMessage {
        embeds: vec![embed],
    }
}

/// Discord notification channel.
pub struct DiscordNotifier {
    client: Client,
}

impl DiscordNotifier {
    /// Create a new Discord notifier.
    ///
    /// The client carries no request timeout; delivery is bounded by
    /// the transport defaults only.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for DiscordNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(
        &self,
        target: &WebhookTarget,
        event: &PriceChangeEvent,
    ) -> Result<(), DeliveryError> {
        let payload = build_payload(event);

        let response = self
            .client
            .post(&target.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(target = %target.name, tick = %event.tick, "Discord webhook accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> PriceChangeEvent {
        PriceChangeEvent {
            tick: "ordi".to_string(),
            listing_id: "abc123i0".to_string(),
            old_floor: 100.0,
            new_floor: 94.0,
            price_btc: 0.094,
            delta_pct: 6.0,
            delta_usd: 0.003_78,
            collection_url: "https://unisat.io/market/brc20?tick=ordi".to_string(),
            listing_url: "https://unisat.io/inscription/abc123i0".to_string(),
            observed_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_build_payload() {
        let payload = serde_json::to_value(build_payload(&event())).unwrap();

        assert!(payload["embeds"].is_array());
        assert_eq!(payload["embeds"].as_array().unwrap().len(), 1);
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], EMBED_TITLE);
        assert_eq!(embed["description"], "**6.00% off floor** 🚀");
        assert_eq!(embed["color"], 0xFF0000);
        assert_eq!(embed["timestamp"], "2024-06-01T12:00:00+00:00");
        assert_eq!(embed["footer"]["text"], FOOTER_TEXT);

        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 6);
        assert_eq!(
            fields[0]["value"],
            "[**ordi**](https://unisat.io/market/brc20?tick=ordi)"
        );
        assert_eq!(fields[1]["value"], "**100 sats**");
        assert_eq!(fields[2]["value"], "**94 sats**");
        assert_eq!(fields[3]["value"], "**0.09400 BTC**");
        assert_eq!(fields[4]["value"], "**0.00 USD**");
        assert!(
            fields[5]["value"]
                .as_str()
                .unwrap()
                .contains("https://unisat.io/inscription/abc123i0")
        );
    }

    #[test]
    fn test_inline_layout() {
        let payload = build_payload(&event());
        let inline: Vec<bool> = payload.embeds[0].fields.iter().map(|f| f.inline).collect();
        assert_eq!(inline, [false, true, true, false, true, false]);
    }
}
