use async_trait::async_trait;
use pulse_shared::clients::email::{DeliveryClass, EmailClient};

use super::{LetterTemplate, Mailer};
use crate::error::{TaskError, TaskResult};

#[async_trait]
impl Mailer for EmailClient {
    async fn send(
        &self,
        to: &str,
        template: LetterTemplate,
        payload: &serde_json::Value,
        class: DeliveryClass,
    ) -> TaskResult<()> {
        self.send_template(to, template.alias(), payload, class)
            .await
            .map_err(TaskError::MailDispatch)
    }
}
