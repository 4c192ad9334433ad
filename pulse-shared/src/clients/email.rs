use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

/// Message stream an email is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryClass {
    /// Account mail: password resets, confirmations.
    Transactional,
    /// Bulk notifications such as periodic project reports.
    Broadcast,
}

impl DeliveryClass {
    pub fn stream(&self) -> &'static str {
        match self {
            Self::Transactional => "outbound",
            Self::Broadcast => "broadcast",
        }
    }
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateRequest<'a> {
    from: String,
    to: &'a str,
    template_alias: &'a str,
    template_model: &'a serde_json::Value,
    message_stream: &'static str,
}

impl EmailClient {
    pub fn new(
        api_url: &str,
        api_key: &str,
        from_email: &str,
        from_name: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        })
    }

    /// Send a provider-rendered template with the given model.
    pub async fn send_template(
        &self,
        to: &str,
        template: &str,
        model: &serde_json::Value,
        class: DeliveryClass,
    ) -> Result<(), String> {
        let request = TemplateRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to,
            template_alias: template,
            template_model: model,
            message_stream: class.stream(),
        };

        let response = self.client
            .post(format!("{}/email/withTemplate", self.api_url))
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, template = %template, stream = class.stream(), "email sent");
        Ok(())
    }
}
