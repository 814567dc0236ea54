use std::borrow::Cow;

use axum::{
    extract::State,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};

use crate::{
    access::Level,
    diagnostics::{
        DiagnosticsClient, HarborSource, NOT_AVAILABLE, UNKNOWN_SONG, format_remaining,
        song_from_metadata,
    },
    export::{Row, RowSet, scalar_document},
    web::{
        AppState, Xml,
        gate::{require_page, require_xml},
        templates::{escape_html, grid_panel},
    },
};

use super::console_page;

/// What the stream process reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RadioStatus {
    uptime: Option<String>,
    source: Option<HarborSource>,
    on_air: Option<String>,
}

impl RadioStatus {
    async fn probe(diagnostics: &DiagnosticsClient) -> Self {
        let uptime = match diagnostics.uptime().await {
            Ok(uptime) => uptime,
            Err(err) => {
                warn!(?err, "stream diagnostics unreachable");
                return Self::default();
            }
        };

        let source = diagnostics
            .harbor_source()
            .await
            .map_err(|err| warn!(?err, "failed to read harbor status"))
            .ok();

        Self {
            uptime: Some(uptime),
            source,
            on_air: on_air_title(diagnostics).await,
        }
    }

    fn rows(&self) -> RowSet {
        let or_placeholder = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let state = if self.uptime.is_some() {
            "En ligne"
        } else {
            "Hors ligne"
        };

        [
            ("Statut", state.to_string()),
            ("Uptime", or_placeholder(self.uptime.clone())),
            (
                "Source",
                or_placeholder(self.source.as_ref().map(HarborSource::describe)),
            ),
            ("Requête à l'antenne", or_placeholder(self.on_air.clone())),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, (name, value))| {
            Row::new(format!("radioInfo{index}"), vec![name.to_string(), value])
        })
        .collect()
    }
}

async fn on_air_title(diagnostics: &DiagnosticsClient) -> Option<String> {
    let rid = diagnostics
        .on_air_request()
        .await
        .map_err(|err| warn!(?err, "failed to read on-air request"))
        .ok()
        .flatten()?;
    let metadata = diagnostics
        .request_metadata(&rid)
        .await
        .map_err(|err| warn!(?err, %rid, "failed to read request metadata"))
        .ok()?;
    song_from_metadata(&metadata, false)
}

pub async fn radio_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::User)).await?;

    let body = [
        grid_panel("Radio", "/mbadm/xml/radio/status", &["Information", "Valeur"]),
        grid_panel("En ce moment", "/mbadm/xml/radio/current-song", &["Titre"]),
        r#"        <section class="panel">
            <h2>Temps restant</h2>
            <p data-scalar-source="/mbadm/xml/radio/remaining"></p>
        </section>"#
            .to_string(),
        grid_panel("Prochains titres", "/mbadm/xml/radio/next", &["Fichier"]),
    ]
    .join("\n");

    let note = format!(
        "Diffusion pilotée par {}.",
        escape_html(&state.settings().bot_nickname)
    );
    Ok(console_page(
        &state,
        "Radio",
        &session,
        Cow::Owned(note),
        body,
    ))
}

pub async fn radio_status(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::User)).await {
        return denied;
    }

    let status = RadioStatus::probe(state.diagnostics()).await;
    Xml(status.rows().into_document())
}

pub async fn current_song(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::User)).await {
        return denied;
    }

    let song = state
        .diagnostics()
        .current_song()
        .await
        .unwrap_or_else(|err| {
            warn!(?err, "failed to read current song");
            UNKNOWN_SONG.to_string()
        });
    let rows: RowSet = std::iter::once(Row::new("currentSong", vec![song])).collect();
    Xml(rows.into_document())
}

pub async fn remaining(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::User)).await {
        return denied;
    }

    let remaining = match state.diagnostics().remaining_seconds().await {
        Ok(seconds) => format_remaining(seconds),
        Err(err) => {
            warn!(?err, "failed to read remaining time");
            NOT_AVAILABLE.to_string()
        }
    };
    Xml(scalar_document("remaining", &remaining))
}

pub async fn next_tracks(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::User)).await {
        return denied;
    }

    match state.diagnostics().next_tracks().await {
        Ok(tracks) => {
            let rows: RowSet = tracks
                .into_iter()
                .enumerate()
                .map(|(index, track)| Row::new(format!("nextTrack{index}"), vec![track]))
                .collect();
            Xml(rows.into_document())
        }
        Err(err) => {
            error!(?err, "failed to read upcoming tracks");
            Xml::empty_rows()
        }
    }
}
