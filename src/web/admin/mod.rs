mod bot;
mod channels;
mod console;
mod help;
mod profile;
mod radio;
mod system;
mod types;
mod users;

use std::borrow::Cow;

use axum::response::Html;

pub use bot::{admin_page, status};
pub use channels::{
    channel_infos, channel_logs, channels, channels_page, log_channel_page, user_channel_infos,
    view_channel_page,
};
pub use console::{main_page, main_tree, select_console};
pub use help::help_page;
pub use profile::{profile_page, user_channels};
pub use radio::{current_song, next_tracks, radio_page, radio_status, remaining};
pub use system::{
    process_tree, processes, system_info, system_page, system_users, system_users_page,
};
pub use types::parse_id;
pub use users::{app_users, user_channel_details, user_details, users_page, view_user_page};

use crate::{
    access::Session,
    web::{
        AppState,
        templates::{ConsolePage, render_console_page},
    },
};

fn console_page(
    state: &AppState,
    title: &str,
    session: &Session,
    note_html: Cow<'_, str>,
    body_html: String,
) -> Html<String> {
    Html(render_console_page(ConsolePage {
        portal_name: &state.settings().portal_name,
        title,
        member: Some(session),
        note_html,
        body_html: Cow::Owned(body_html),
    }))
}
