//! Web side of the access gate: resolves the cookie into a [`RequestContext`] and turns
//! gate failures into the answer each kind of endpoint expects.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};

use crate::{
    access::{AccessError, ChannelLevel, Level, RequestContext, Session},
    web::{AppState, Xml, auth::current_session, data, templates::render_denied_page},
};

pub const LOGIN_PATH: &str = "/mbadm";

pub async fn request_context(state: &AppState, jar: &CookieJar) -> RequestContext {
    RequestContext::new(current_session(state, jar).await)
}

/// Gate for HTML pages: unauthenticated visitors go back to the login page, members
/// above the ceiling get a 403 page.
pub async fn require_page(
    state: &AppState,
    jar: &CookieJar,
    ceiling: Option<Level>,
) -> Result<Session, Response> {
    let context = with_ceiling(request_context(state, jar).await, ceiling);
    context
        .check()
        .map(Session::clone)
        .map_err(|err| page_refusal(&state.settings().portal_name, &context, err))
}

/// Gate for XML data endpoints, answering the widget sentinels on failure.
pub async fn require_xml(
    state: &AppState,
    jar: &CookieJar,
    ceiling: Option<Level>,
) -> Result<Session, Xml> {
    let context = with_ceiling(request_context(state, jar).await, ceiling);
    context.check().map(Session::clone).map_err(xml_refusal)
}

fn with_ceiling(context: RequestContext, ceiling: Option<Level>) -> RequestContext {
    match ceiling {
        Some(ceiling) => context.require(ceiling),
        None => context,
    }
}

fn page_refusal(portal_name: &str, context: &RequestContext, err: AccessError) -> Response {
    match err {
        AccessError::Unauthenticated => Redirect::to(LOGIN_PATH).into_response(),
        AccessError::InsufficientPrivilege { .. } => {
            warn!(%err, "console page denied");
            (
                StatusCode::FORBIDDEN,
                Html(render_denied_page(portal_name, context.session())),
            )
                .into_response()
        }
    }
}

fn xml_refusal(err: AccessError) -> Xml {
    match err {
        AccessError::Unauthenticated => Xml::unauthenticated(),
        AccessError::InsufficientPrivilege { .. } => {
            warn!(%err, "console data request denied");
            Xml::denied()
        }
    }
}

/// Masters and above act as owners of every channel without a membership row.
fn global_channel_level(session: &Session) -> Option<ChannelLevel> {
    session
        .member_level
        .satisfies(Level::Master)
        .then_some(ChannelLevel::OWNER)
}

/// Authority of `session` over one channel: masters act as channel owners everywhere,
/// other members need a membership row.
pub async fn channel_level(
    state: &AppState,
    session: &Session,
    id_channel: i32,
) -> Option<ChannelLevel> {
    if let Some(level) = global_channel_level(session) {
        return Some(level);
    }

    match data::fetch_channel_membership(state.pool_ref(), session.member_id, id_channel).await {
        Ok(level) => level.and_then(ChannelLevel::new),
        Err(err) => {
            error!(?err, id_channel, "failed to read channel membership");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::header};

    use super::*;
    use crate::export::{denied_document, unauthenticated_document};

    fn member(level: Level) -> Session {
        Session {
            member_id: 7,
            member_login: "teuk".to_string(),
            member_level: level,
            member_level_description: level.label().to_string(),
        }
    }

    fn refusal(level: Level, ceiling: Level) -> AccessError {
        let context = RequestContext::new(Some(member(level))).require(ceiling);
        context.check().map(Session::clone).unwrap_err()
    }

    #[tokio::test]
    async fn user_on_master_page_gets_denied_page() {
        let context = RequestContext::new(Some(member(Level::User))).require(Level::Master);
        let err = refusal(Level::User, Level::Master);
        let response = page_refusal("Mediabot", &context, err);

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let expected = render_denied_page("Mediabot", context.session());
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), expected);
    }

    #[test]
    fn anonymous_page_request_redirects_to_login() {
        let context = RequestContext::new(None);
        let response = page_refusal("Mediabot", &context, AccessError::Unauthenticated);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[test]
    fn user_on_master_data_gets_null_document() {
        let xml = xml_refusal(refusal(Level::User, Level::Master));
        assert_eq!(xml.0, denied_document());
        assert_eq!(xml_refusal(AccessError::Unauthenticated).0, unauthenticated_document());
    }

    #[test]
    fn masters_own_every_channel() {
        assert_eq!(global_channel_level(&member(Level::Owner)), Some(ChannelLevel::OWNER));
        assert_eq!(global_channel_level(&member(Level::Master)), Some(ChannelLevel::OWNER));
        assert_eq!(global_channel_level(&member(Level::Administrator)), None);
        assert_eq!(global_channel_level(&member(Level::User)), None);
    }
}
