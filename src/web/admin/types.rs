use serde::Deserialize;

/// `?id_channel=N` on channel pages and their data endpoints.
#[derive(Default, Deserialize)]
pub struct ChannelQuery {
    pub id_channel: Option<String>,
}

impl ChannelQuery {
    pub fn channel_id(&self) -> Option<i32> {
        parse_id(self.id_channel.as_deref())
    }
}

/// `?id_user=N` on the member details page and its data endpoints.
#[derive(Default, Deserialize)]
pub struct UserQuery {
    pub id_user: Option<String>,
}

impl UserQuery {
    pub fn user_id(&self) -> Option<i32> {
        parse_id(self.id_user.as_deref())
    }
}

#[derive(Default, Deserialize)]
pub struct SelectConsoleForm {
    pub id_console: Option<String>,
}

impl SelectConsoleForm {
    pub fn console_id(&self) -> Option<i32> {
        parse_id(self.id_console.as_deref())
    }
}

/// Positive integer ids only; anything else is treated as missing.
pub fn parse_id(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .filter(|id| *id > 0)
}
