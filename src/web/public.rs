//! Public front-end: the bot's command catalog and what the stream is playing.

use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::{
    diagnostics::{UNKNOWN_SONG, fetch_stream_title},
    export::{Projection, Row, RowSet, scalar_document},
    web::{
        AppState, Xml, admin::parse_id, data,
        models::{CommandCategoryRow, PublicCommandRow},
        templates::{ConsolePage, escape_html, grid_panel, render_console_page},
    },
};

const COMMANDS_GRID: Projection = Projection::counted("", &["command", "description", "action"]);

#[derive(Default, Deserialize)]
pub struct CommandsQuery {
    pub id_public_commands_category: Option<String>,
}

pub async fn commands_page(State(state): State<AppState>) -> Html<String> {
    let settings = state.settings();
    let categories = match data::fetch_command_categories(state.pool_ref()).await {
        Ok(categories) => categories,
        Err(err) => {
            error!(?err, "failed to load command categories");
            Vec::new()
        }
    };

    let note = format!(
        r#"Commandes publiques de {bot}, préfixées par « {prefix} ». En ce moment : <span data-scalar-source="/xml/metadata"></span>"#,
        bot = escape_html(&settings.bot_nickname),
        prefix = escape_html(&settings.command_char),
    );

    Html(render_console_page(ConsolePage {
        portal_name: &settings.portal_name,
        title: "Commandes",
        member: None,
        note_html: Cow::Owned(note),
        body_html: Cow::Owned(render_categories(&categories)),
    }))
}

fn render_categories(categories: &[CommandCategoryRow]) -> String {
    if categories.is_empty() {
        return r#"        <section class="panel"><p>Aucune commande publique pour le moment.</p></section>"#
            .to_string();
    }

    categories
        .iter()
        .map(|category| {
            grid_panel(
                &category.description,
                &format!(
                    "/xml/commands?id_public_commands_category={}",
                    category.id_public_commands_category
                ),
                &["Commande", "Description", "Action"],
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn commands(
    State(state): State<AppState>,
    Query(query): Query<CommandsQuery>,
) -> Xml {
    let Some(id_category) = parse_id(query.id_public_commands_category.as_deref()) else {
        return Xml::empty_rows();
    };

    let command_char = state.settings().command_char.clone();
    let commands = data::fetch_public_commands(state.pool_ref(), id_category)
        .await
        .map(|rows| {
            rows.into_iter()
                .map(|row| row.for_display(&command_char))
                .collect::<Vec<PublicCommandRow>>()
        });
    Xml::from_query(commands, &COMMANDS_GRID, "commands")
}

pub async fn current_song(State(state): State<AppState>) -> Xml {
    let title = stream_title(&state).await;
    let rows: RowSet = std::iter::once(Row::new("currentSong", vec![title])).collect();
    Xml(rows.into_document())
}

pub async fn metadata(State(state): State<AppState>) -> Xml {
    let title = stream_title(&state).await;
    Xml(scalar_document("metadata", &title))
}

async fn stream_title(state: &AppState) -> String {
    let url = &state.settings().icecast_status_url;
    match fetch_stream_title(state.http(), url).await {
        Ok(Some(title)) => title,
        Ok(None) => UNKNOWN_SONG.to_string(),
        Err(err) => {
            warn!(?err, "failed to read stream status");
            UNKNOWN_SONG.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_become_grids() {
        let html = render_categories(&[
            CommandCategoryRow {
                id_public_commands_category: 1,
                description: "Général".to_string(),
            },
            CommandCategoryRow {
                id_public_commands_category: 4,
                description: "Radio".to_string(),
            },
        ]);
        assert!(html.contains("/xml/commands?id_public_commands_category=1"));
        assert!(html.contains("/xml/commands?id_public_commands_category=4"));
        assert_eq!(html.matches("<table").count(), 2);
    }

    #[test]
    fn empty_catalog_has_a_message() {
        assert!(render_categories(&[]).contains("Aucune commande"));
    }
}
