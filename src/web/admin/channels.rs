use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    access::{ChannelLevel, Level, Session},
    export::Projection,
    web::{
        AppState, Xml, data,
        gate::{channel_level, require_page, require_xml},
        models::ChannelRow,
        templates::{escape_html, facts_panel, grid_panel, grid_panel_linked},
    },
};

use super::{console_page, types::ChannelQuery};

const PROFILE_PATH: &str = "/mbadm/profile";

const CHANNELS_GRID: Projection = Projection::keyed(
    "id_channel",
    &[
        "id_channel",
        "name",
        "description",
        "channel_key",
        "chanmode",
        "auto_join",
    ],
);

const CHANNEL_INFOS_GRID: Projection = Projection::keyed(
    "id_channel",
    &["id_channel", "name", "description", "channel_key", "chanmode"],
);

const CHANNEL_MEMBERS_GRID: Projection = Projection::counted(
    "userChan",
    &[
        "id_user", "nickname", "level", "automode", "username", "info1", "info2",
    ],
);

const CHANNEL_LOGS_GRID: Projection = Projection::counted("channelLine", &["when", "line"]);

pub async fn channels_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;

    let body = grid_panel_linked(
        "Channels",
        "/mbadm/xml/channels",
        &["Id", "Nom", "Description", "Clé", "Modes", "Auto join"],
        Some("/mbadm/viewchan?id_channel="),
    );

    Ok(console_page(
        &state,
        "Channels",
        &session,
        Cow::Borrowed("Channels rejoints automatiquement en premier."),
        body,
    ))
}

pub async fn channels(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    Xml::from_query(
        data::fetch_channels(state.pool_ref()).await,
        &CHANNELS_GRID,
        "channels",
    )
}

pub async fn view_channel_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ChannelQuery>,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::User)).await?;
    let (channel, level) = accessible_channel(&state, &session, &query).await?;
    let id = channel.id_channel;

    let mut body = channel_facts(&channel, level);
    body.push('\n');
    body.push_str(&grid_panel(
        "Informations",
        &format!("/mbadm/xml/channel-infos?id_channel={id}"),
        &["Id", "Nom", "Description", "Clé", "Modes"],
    ));
    body.push('\n');
    body.push_str(&grid_panel(
        "Utilisateurs du channel",
        &format!("/mbadm/xml/user-channel-infos?id_channel={id}"),
        &["Id", "Nick", "Niveau", "Automode", "Username", "Info1", "Info2"],
    ));

    let note = format!(
        r#"<a href="/mbadm/logchan?id_channel={id}">Voir les logs de {name}</a>"#,
        name = escape_html(&channel.name),
    );
    Ok(console_page(
        &state,
        "Information sur le channel",
        &session,
        Cow::Owned(note),
        body,
    ))
}

pub async fn log_channel_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ChannelQuery>,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::User)).await?;
    let (channel, level) = accessible_channel(&state, &session, &query).await?;
    let id = channel.id_channel;

    let mut body = channel_facts(&channel, level);
    body.push('\n');
    body.push_str(&grid_panel(
        &format!(
            "Logs des {days} derniers jours",
            days = state.settings().channel_log_days
        ),
        &format!("/mbadm/xml/channel-logs?id_channel={id}"),
        &["Date Heure", "Évènement"],
    ));

    let note = format!(r#"<a href="/mbadm/viewchan?id_channel={id}">Retour au channel</a>"#);
    Ok(console_page(
        &state,
        "Logs du channel",
        &session,
        Cow::Owned(note),
        body,
    ))
}

pub async fn channel_infos(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ChannelQuery>,
) -> Xml {
    let id_channel = match channel_gate(&state, &jar, &query).await {
        Ok(id_channel) => id_channel,
        Err(answer) => return answer,
    };

    let channel = data::fetch_channel(state.pool_ref(), id_channel)
        .await
        .map(|channel| channel.into_iter().collect::<Vec<_>>());
    Xml::from_query(channel, &CHANNEL_INFOS_GRID, "channel-infos")
}

pub async fn user_channel_infos(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ChannelQuery>,
) -> Xml {
    let id_channel = match channel_gate(&state, &jar, &query).await {
        Ok(id_channel) => id_channel,
        Err(answer) => return answer,
    };

    Xml::from_query(
        data::fetch_channel_members(state.pool_ref(), id_channel).await,
        &CHANNEL_MEMBERS_GRID,
        "user-channel-infos",
    )
}

pub async fn channel_logs(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ChannelQuery>,
) -> Xml {
    let id_channel = match channel_gate(&state, &jar, &query).await {
        Ok(id_channel) => id_channel,
        Err(answer) => return answer,
    };

    let days = state.settings().channel_log_days;
    Xml::from_query(
        data::fetch_channel_logs(state.pool_ref(), id_channel, days).await,
        &CHANNEL_LOGS_GRID,
        "channel-logs",
    )
}

/// Channel pages send members without access to the channel back to their profile.
async fn accessible_channel(
    state: &AppState,
    session: &Session,
    query: &ChannelQuery,
) -> Result<(ChannelRow, ChannelLevel), Response> {
    let back = || Redirect::to(PROFILE_PATH).into_response();

    let id_channel = query.channel_id().ok_or_else(back)?;
    let level = channel_level(state, session, id_channel)
        .await
        .ok_or_else(back)?;

    match data::fetch_channel(state.pool_ref(), id_channel).await {
        Ok(Some(channel)) => Ok((channel, level)),
        Ok(None) => Err(back()),
        Err(err) => {
            error!(?err, id_channel, "failed to load channel");
            Err(back())
        }
    }
}

async fn channel_gate(state: &AppState, jar: &CookieJar, query: &ChannelQuery) -> Result<i32, Xml> {
    let session = require_xml(state, jar, Some(Level::User)).await?;
    let id_channel = query.channel_id().ok_or_else(Xml::empty_rows)?;
    match channel_level(state, &session, id_channel).await {
        Some(_) => Ok(id_channel),
        None => Err(Xml::denied()),
    }
}

fn channel_facts(channel: &ChannelRow, level: ChannelLevel) -> String {
    facts_panel(
        &channel.name,
        &[
            (
                "Description",
                channel.description.clone().unwrap_or_default(),
            ),
            ("Modes", channel.chanmode.clone().unwrap_or_default()),
            ("Votre niveau", level.to_string()),
        ],
    )
}
