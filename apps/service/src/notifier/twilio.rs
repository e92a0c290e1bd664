//! SMS delivery through the Twilio Messages API.

use async_trait::async_trait;

use super::{Notifier, NotifyError};
use crate::config::Twilio;

const MAX_MESSAGE_LEN: usize = 100;
const PHONE_LEN: usize = 10;

pub struct TwilioNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_phone: String,
}

impl TwilioNotifier {
    pub fn new(config: &Twilio) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_phone: config.from_phone.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

fn validate_phone(phone: &str) -> Result<&str, NotifyError> {
    let phone = phone.trim();
    if phone.len() == PHONE_LEN && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(phone)
    } else {
        Err(NotifyError::InvalidInput(format!(
            "phone must be {PHONE_LEN} digits"
        )))
    }
}

fn validate_message(message: &str) -> Result<&str, NotifyError> {
    let message = message.trim();
    if message.is_empty() || message.len() > MAX_MESSAGE_LEN {
        Err(NotifyError::InvalidInput(format!(
            "message must be 1..={MAX_MESSAGE_LEN} characters"
        )))
    } else {
        Ok(message)
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        let phone = validate_phone(phone)?;
        let message = validate_message(message)?;

        let to = format!("+1{phone}");
        let params = [
            ("From", self.from_phone.as_str()),
            ("To", to.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        match response.status().as_u16() {
            200 | 201 => Ok(()),
            status => Err(NotifyError::Rejected { status }),
        }
    }
}
