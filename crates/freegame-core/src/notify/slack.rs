//! Slack incoming-webhook channel.

use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{Notifier, NotifierSettings};
use crate::error::Result;
use crate::icons::icon_from_url;
use crate::offer::Offer;

const HTTP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug)]
pub struct SlackNotifier {
    endpoint: Option<String>,
    http: Client,
}

impl SlackNotifier {
    pub fn new(settings: &NotifierSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            http,
        })
    }

    /// Blocks-API payload for one offer.
    #[must_use]
    pub fn payload(offer: &Offer) -> Value {
        let mut section = json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": message_body(offer),
            },
        });

        let icon_source = offer.offer_link.as_deref().unwrap_or(&offer.origin_link);
        if let Some(icon_url) = icon_from_url(icon_source) {
            section["accessory"] = json!({
                "type": "image",
                "image_url": icon_url,
                "alt_text": "store logo",
            });
        }

        json!({
            "text": offer.title,
            "blocks": [section],
        })
    }
}

fn message_body(offer: &Offer) -> String {
    let mut body = format!("*{}*\n", offer.title);
    if let Some(good_through) = &offer.good_through_text {
        body.push_str(&format!("Offer good through {good_through}\n"));
    }

    body.push_str("\nLinks:\n");
    if let Some(offer_link) = &offer.offer_link {
        body.push_str(&format!("- <{offer_link}|Offer Redemption>\n"));
    }
    if let Some(store_link) = &offer.store_link {
        body.push_str(&format!("- <{store_link}|Steam Store Page for reference>\n"));
    }
    body.push_str(&format!("- <{}|Steam Announcement>\n", offer.origin_link));
    body
}

impl Notifier for SlackNotifier {
    fn send(&self, offer: &mut Offer) -> Result<bool> {
        let payload = Self::payload(offer);

        match &self.endpoint {
            Some(endpoint) => {
                self.http
                    .post(endpoint)
                    .json(&payload)
                    .send()?
                    .error_for_status()?;
            }
            None => {
                // Sentinel mode: no endpoint configured, delivery goes to the log.
                debug!(title = %offer.title, payload = %payload, "no webhook configured; logging payload");
            }
        }

        offer.posted_at = Some(Utc::now());
        Ok(true)
    }
}
