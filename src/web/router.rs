use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::web::{AppState, admin, auth, public};

const ROBOTS_TXT_BODY: &str = "User-agent: *\nDisallow: /mbadm\n";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(public::commands_page))
        .route("/xml/commands", get(public::commands))
        .route("/xml/current-song", get(public::current_song))
        .route("/xml/metadata", get(public::metadata))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .merge(console_routes())
        .with_state(state)
}

fn console_routes() -> Router<AppState> {
    Router::new()
        .route("/mbadm", get(auth::login_page))
        .route("/mbadm/login", post(auth::process_login))
        .route("/mbadm/logout", post(auth::logout))
        .route("/mbadm/xml/auth", post(auth::xml_auth))
        .route("/mbadm/main", get(admin::main_page))
        .route("/mbadm/xml/main-tree", get(admin::main_tree))
        .route("/mbadm/xml/select-console", post(admin::select_console))
        .route("/mbadm/users", get(admin::users_page))
        .route("/mbadm/xml/app-users", get(admin::app_users))
        .route("/mbadm/viewuser", get(admin::view_user_page))
        .route("/mbadm/xml/user-details", get(admin::user_details))
        .route(
            "/mbadm/xml/user-channel-details",
            get(admin::user_channel_details),
        )
        .route("/mbadm/channels", get(admin::channels_page))
        .route("/mbadm/xml/channels", get(admin::channels))
        .route("/mbadm/viewchan", get(admin::view_channel_page))
        .route("/mbadm/logchan", get(admin::log_channel_page))
        .route("/mbadm/xml/channel-infos", get(admin::channel_infos))
        .route("/mbadm/xml/user-channel-infos", get(admin::user_channel_infos))
        .route("/mbadm/xml/channel-logs", get(admin::channel_logs))
        .route("/mbadm/profile", get(admin::profile_page))
        .route("/mbadm/xml/user-channels", get(admin::user_channels))
        .route("/mbadm/admin", get(admin::admin_page))
        .route("/mbadm/xml/status", get(admin::status))
        .route("/mbadm/system", get(admin::system_page))
        .route("/mbadm/xml/system-info", get(admin::system_info))
        .route("/mbadm/xml/processes", get(admin::processes))
        .route("/mbadm/xml/process-tree", get(admin::process_tree))
        .route("/mbadm/system-users", get(admin::system_users_page))
        .route("/mbadm/xml/system-users", get(admin::system_users))
        .route("/mbadm/radio", get(admin::radio_page))
        .route("/mbadm/xml/radio/status", get(admin::radio_status))
        .route("/mbadm/xml/radio/current-song", get(admin::current_song))
        .route("/mbadm/xml/radio/remaining", get(admin::remaining))
        .route("/mbadm/xml/radio/next", get(admin::next_tracks))
        .route("/mbadm/help", get(admin::help_page))
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
