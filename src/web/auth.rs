use std::net::SocketAddr;

use anyhow::{Context, Result};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{ConnectInfo, Form, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    access::Session,
    export::scalar_document,
    web::{
        AppState, Xml, data,
        models::SessionMemberRow,
        templates::render_login_page,
    },
};

pub const SESSION_COOKIE: &str = "mbadm_session";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub credential: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    if current_session(&state, &jar).await.is_some() {
        return Err(Redirect::to("/mbadm/main"));
    }

    Ok(Html(render_login_page(&state.settings().portal_name, None)))
}

pub async fn process_login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let portal_name = state.settings().portal_name.clone();
    let ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    let member_id = match authenticate(&state, &form, ip.as_deref()).await {
        Ok(Some(member_id)) => member_id,
        Ok(None) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Html(render_login_page(
                    &portal_name,
                    Some("Identifiant ou mot de passe incorrect."),
                )),
            ));
        }
        Err(err) => {
            error!(?err, "failed to authenticate console login");
            return Err(server_error(&portal_name));
        }
    };

    match open_session(&state, member_id, ip.as_deref()).await {
        Ok(cookie) => Ok((jar.add(cookie), Redirect::to("/mbadm/main"))),
        Err(err) => {
            error!(?err, "failed to create console session");
            Err(server_error(&portal_name))
        }
    }
}

/// Widget-driven login: answers `<authentication>1|0</authentication>` and sets the
/// session cookie on success.
pub async fn xml_auth(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Xml) {
    let ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    let member_id = match authenticate(&state, &form, ip.as_deref()).await {
        Ok(Some(member_id)) => member_id,
        Ok(None) => return (jar, Xml::unauthenticated()),
        Err(err) => {
            error!(?err, "failed to authenticate console login");
            return (jar, Xml::unauthenticated());
        }
    };

    match open_session(&state, member_id, ip.as_deref()).await {
        Ok(cookie) => (jar.add(cookie), Xml(scalar_document("authentication", "1"))),
        Err(err) => {
            error!(?err, "failed to create console session");
            (jar, Xml::unauthenticated())
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut jar = jar;

    if let Some(token) = session_token(&jar) {
        if let Err(err) = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(state.pool_ref())
            .await
        {
            error!(?err, "failed to remove session during logout");
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    (jar, Redirect::to("/mbadm"))
}

/// Resolves the browser's session cookie into the member it belongs to.
pub async fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let token = session_token(jar)?;

    match fetch_session_member(state.pool_ref(), token).await {
        Ok(member) => member.map(Session::from),
        Err(err) => {
            error!(?err, "failed to resolve console session");
            None
        }
    }
}

fn session_token(jar: &CookieJar) -> Option<Uuid> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok()
}

/// Checks the submitted credentials and records the attempt. Blank fields never reach
/// the store.
async fn authenticate(state: &AppState, form: &LoginForm, ip: Option<&str>) -> Result<Option<i32>> {
    let login = form.login.trim();
    if login.is_empty() || form.credential.is_empty() {
        return Ok(None);
    }

    let pool = state.pool_ref();
    let member = data::fetch_member_credentials(pool, login)
        .await
        .context("failed to fetch member credentials")?;

    let accepted = member.and_then(|member| {
        let hash = member.password.as_deref()?;
        verify_password(&form.credential, hash).then_some(member.id_user)
    });

    let recorded = data::record_login_attempt(pool, login, ip, accepted.is_some()).await;
    Ok(settle_login(login, ip, accepted, recorded))
}

/// Logs the outcome of a login. A weblog write failure is logged and never turns the
/// verdict around.
fn settle_login(
    login: &str,
    ip: Option<&str>,
    accepted: Option<i32>,
    recorded: sqlx::Result<()>,
) -> Option<i32> {
    if let Err(err) = recorded {
        error!(?err, login, "failed to record login attempt");
    }

    match accepted {
        Some(member_id) => info!(login, ip, member_id, "console login"),
        None => warn!(login, ip, "rejected console login"),
    }
    accepted
}

async fn open_session(
    state: &AppState,
    member_id: i32,
    ip: Option<&str>,
) -> Result<Cookie<'static>> {
    let ttl_hours = state.settings().session_ttl_hours;
    let token = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::hours(ttl_hours);

    sqlx::query("INSERT INTO sessions (token, id_user, ip, expires_at) VALUES ($1, $2, $3, $4)")
        .bind(token)
        .bind(member_id)
        .bind(ip)
        .bind(expires_at)
        .execute(state.pool_ref())
        .await
        .context("failed to insert session")?;

    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::hours(ttl_hours));
    Ok(cookie)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn fetch_session_member(
    pool: &PgPool,
    token: Uuid,
) -> sqlx::Result<Option<SessionMemberRow>> {
    sqlx::query_as::<_, SessionMemberRow>(
        "SELECT users.id_user, users.nickname, user_levels.level, user_levels.description
         FROM sessions
         JOIN users ON users.id_user = sessions.id_user
         JOIN user_levels ON user_levels.id_user_level = users.id_user_level
         WHERE sessions.token = $1 AND sessions.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

fn server_error(portal_name: &str) -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_login_page(
            portal_name,
            Some("Erreur serveur, veuillez réessayer plus tard."),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("change-me").unwrap();
        assert!(verify_password("change-me", &hash));
        assert!(!verify_password("Change-me", &hash));
    }

    #[test]
    fn legacy_or_garbage_hashes_never_verify() {
        assert!(!verify_password("secret", "*14E65567ABDB5135D0CFD9A70B3032C179A49EE7"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn weblog_failure_keeps_login_verdict() {
        let failed = || Err(sqlx::Error::PoolTimedOut);
        assert_eq!(settle_login("teuk", None, Some(7), failed()), Some(7));
        assert_eq!(settle_login("teuk", Some("127.0.0.1"), None, failed()), None);
        assert_eq!(settle_login("teuk", None, Some(7), Ok(())), Some(7));
    }

    #[test]
    fn session_token_requires_uuid_cookie() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not-a-token"));
        assert_eq!(session_token(&jar), None);

        let token = Uuid::new_v4();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, token.to_string()));
        assert_eq!(session_token(&jar), Some(token));
    }
}
