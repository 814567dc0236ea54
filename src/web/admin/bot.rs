use std::borrow::Cow;

use axum::{
    extract::State,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    access::Level,
    diagnostics::NOT_AVAILABLE,
    export::{Record, Row, RowSet},
    web::{
        AppState, Xml, data,
        gate::{require_page, require_xml},
        models::BotStatusRow,
        templates::grid_panel,
    },
};

use super::console_page;

const STATUS_COLUMNS: [&str; 8] = [
    "process_user",
    "pid",
    "ppid",
    "c",
    "stime",
    "tty",
    "cpu_time",
    "cmd",
];

pub async fn admin_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;

    let body = grid_panel(
        &format!("Processus {}", state.settings().bot_nickname),
        "/mbadm/xml/status",
        &["UID", "PID", "PPID", "C", "STIME", "TTY", "TIME", "CMD"],
    );

    Ok(console_page(
        &state,
        "Administration",
        &session,
        Cow::Borrowed("Dernier état publié par le bot."),
        body,
    ))
}

/// Bot process snapshot; every cell reads `N/A` when the bot has not reported yet.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    let snapshot = match data::fetch_bot_status(state.pool_ref()).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(?err, "failed to load bot status");
            None
        }
    };
    Xml(status_rows(snapshot.as_ref()).into_document())
}

fn status_rows(snapshot: Option<&BotStatusRow>) -> RowSet {
    let cells = STATUS_COLUMNS
        .iter()
        .map(|column| {
            snapshot
                .and_then(|row| row.field(column))
                .map(|value| value.into_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        })
        .collect();
    std::iter::once(Row::new("0", cells)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_is_all_placeholders() {
        let rows = status_rows(None);
        assert_eq!(rows.rows().len(), 1);
        assert!(rows.rows()[0].cells.iter().all(|cell| cell == NOT_AVAILABLE));
    }

    #[test]
    fn partial_snapshot_fills_gaps() {
        let snapshot = BotStatusRow {
            process_user: Some("mediabot".to_string()),
            pid: Some(4242),
            ppid: Some(1),
            c: None,
            stime: Some("08:15".to_string()),
            tty: Some(String::new()),
            cpu_time: Some("00:01:02".to_string()),
            cmd: Some("perl mediabot.pl".to_string()),
        };
        let rows = status_rows(Some(&snapshot));
        assert_eq!(
            rows.rows()[0].cells,
            [
                "mediabot",
                "4242",
                "1",
                "N/A",
                "08:15",
                "N/A",
                "00:01:02",
                "perl mediabot.pl"
            ]
        );
    }
}
