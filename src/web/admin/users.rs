use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    access::Level,
    export::Projection,
    web::{
        AppState, Xml, data,
        gate::{require_page, require_xml},
        models::AppUserRow,
        templates::{grid_panel, grid_panel_linked},
    },
};

use super::{console_page, types::UserQuery};

const USERS_PATH: &str = "/mbadm/users";

const APP_USERS_GRID: Projection = Projection::keyed(
    "id_user",
    &[
        "id_user",
        "nickname",
        "hostmasks",
        "username",
        "level",
        "description",
        "info1",
        "info2",
        "has_password",
    ],
);

const APP_USERS_HEADERS: &[&str] = &[
    "Id",
    "Nick",
    "Hostmasks",
    "Username",
    "Niveau",
    "Description",
    "Info1",
    "Info2",
    "Mot de passe",
];

const USER_CHANNELS_GRID: Projection =
    Projection::keyed("id_channel", &["name", "level", "greet", "automode"]);

pub async fn users_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;

    let body = grid_panel_linked(
        "Utilisateurs du bot",
        "/mbadm/xml/app-users",
        APP_USERS_HEADERS,
        Some("/mbadm/viewuser?id_user="),
    );

    Ok(console_page(
        &state,
        "Utilisateurs",
        &session,
        Cow::Borrowed("Comptes connus du bot, du plus privilégié au moins privilégié."),
        body,
    ))
}

pub async fn app_users(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    Xml::from_query(
        data::fetch_app_users(state.pool_ref()).await,
        &APP_USERS_GRID,
        "app-users",
    )
}

/// Details of one bot account; unknown ids go back to the users list.
pub async fn view_user_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<UserQuery>,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;
    let back = || Redirect::to(USERS_PATH).into_response();

    let id_user = query.user_id().ok_or_else(back)?;
    let user = match data::fetch_app_user(state.pool_ref(), id_user).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(back()),
        Err(err) => {
            error!(?err, id_user, "failed to load bot account");
            return Err(back());
        }
    };

    Ok(console_page(
        &state,
        "Informations utilisateur",
        &session,
        Cow::Owned(format!(r#"<a href="{USERS_PATH}">Retour aux utilisateurs</a>"#)),
        user_details_body(&user),
    ))
}

fn user_details_body(user: &AppUserRow) -> String {
    let id = user.id_user;
    let mut body = grid_panel(
        &format!("Informations utilisateur en base : {}", user.nickname),
        &format!("/mbadm/xml/user-details?id_user={id}"),
        APP_USERS_HEADERS,
    );
    body.push('\n');
    body.push_str(&grid_panel_linked(
        "Channels",
        &format!("/mbadm/xml/user-channel-details?id_user={id}"),
        &["Channel", "Niveau", "Greet", "Automode"],
        Some("/mbadm/viewchan?id_channel="),
    ));
    body
}

pub async fn user_details(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<UserQuery>,
) -> Xml {
    let id_user = match user_gate(&state, &jar, &query).await {
        Ok(id_user) => id_user,
        Err(answer) => return answer,
    };

    let user = data::fetch_app_user(state.pool_ref(), id_user)
        .await
        .map(|user| user.into_iter().collect::<Vec<_>>());
    Xml::from_query(user, &APP_USERS_GRID, "user-details")
}

pub async fn user_channel_details(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<UserQuery>,
) -> Xml {
    let id_user = match user_gate(&state, &jar, &query).await {
        Ok(id_user) => id_user,
        Err(answer) => return answer,
    };

    Xml::from_query(
        data::fetch_member_channels(state.pool_ref(), id_user).await,
        &USER_CHANNELS_GRID,
        "user-channel-details",
    )
}

async fn user_gate(state: &AppState, jar: &CookieJar, query: &UserQuery) -> Result<i32, Xml> {
    require_xml(state, jar, Some(Level::Master)).await?;
    query.user_id().ok_or_else(Xml::empty_rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_page_links_channels_and_escapes_nickname() {
        let user = AppUserRow {
            id_user: 12,
            nickname: "<teuk>".to_string(),
            hostmasks: None,
            username: None,
            level: 1,
            description: "Master".to_string(),
            info1: None,
            info2: None,
            has_password: true,
        };
        let body = user_details_body(&user);

        assert!(body.contains("&lt;teuk&gt;"));
        assert!(!body.contains("<teuk>"));
        assert!(body.contains("/mbadm/xml/user-details?id_user=12"));
        assert!(body.contains("/mbadm/xml/user-channel-details?id_user=12"));
        assert!(body.contains(r#"data-row-link="/mbadm/viewchan?id_channel=""#));
    }
}
