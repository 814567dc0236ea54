use std::borrow::Cow;

use axum::{
    extract::State,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    export::Projection,
    web::{
        AppState, Xml, data,
        gate::{require_page, require_xml},
        templates::{facts_panel, grid_panel_linked},
    },
};

use super::console_page;

const MEMBER_CHANNELS_GRID: Projection =
    Projection::keyed("id_channel", &["name", "level", "greet", "automode"]);

pub async fn profile_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, None).await?;

    let mut body = facts_panel(
        "Mon compte",
        &[
            ("Nick", session.member_login.clone()),
            ("Niveau", session.member_level_description.clone()),
        ],
    );
    body.push('\n');
    body.push_str(&grid_panel_linked(
        "Mes channels",
        "/mbadm/xml/user-channels",
        &["Channel", "Niveau", "Greet", "Automode"],
        Some("/mbadm/viewchan?id_channel="),
    ));

    Ok(console_page(
        &state,
        "Profil",
        &session,
        Cow::Borrowed(""),
        body,
    ))
}

/// Channels of the logged-in member.
pub async fn user_channels(State(state): State<AppState>, jar: CookieJar) -> Xml {
    let session = match require_xml(&state, &jar, None).await {
        Ok(session) => session,
        Err(denied) => return denied,
    };

    Xml::from_query(
        data::fetch_member_channels(state.pool_ref(), session.member_id).await,
        &MEMBER_CHANNELS_GRID,
        "user-channels",
    )
}
