use std::borrow::Cow;

use axum::{
    extract::State,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    access::{ChannelLevel, Level},
    web::{AppState, gate::require_page, templates::escape_html},
};

use super::console_page;

pub async fn help_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::User)).await?;
    let body = render_help(&state.settings().bot_nickname);

    Ok(console_page(
        &state,
        "Aide",
        &session,
        Cow::Borrowed(""),
        body,
    ))
}

fn render_help(bot_nickname: &str) -> String {
    let level_rows = Level::ALL
        .iter()
        .map(|level| {
            format!(
                "<tr><td>{name}</td><td>Niveau {label}</td><td>{rank}</td></tr>",
                name = level.label(),
                label = level.label().to_lowercase(),
                rank = level.rank(),
            )
        })
        .collect::<String>();
    let bot_nickname = escape_html(bot_nickname);
    let channel_max = ChannelLevel::MAX;

    format!(
        r#"        <section class="panel">
            <h2>{bot_nickname}</h2>
            <p>Le bot comprend une gestion d'utilisateurs et de channels.</p>
        </section>
        <section class="panel">
            <h2>Utilisateurs</h2>
            <p>Chaque utilisateur a un niveau global :</p>
            <table>
                <thead><tr><th>Niveau</th><th>Description</th><th>Valeur</th></tr></thead>
                <tbody>{level_rows}</tbody>
            </table>
            <p>Il a aussi, sur chaque channel, un niveau compris entre 0 et {channel_max}. Les deux échelles sont indépendantes.</p>
        </section>
        <section class="panel">
            <h2>Channels</h2>
            <p>Le propriétaire du channel a le niveau {channel_max}. C'est le premier utilisateur à pouvoir en ajouter d'autres sur le channel donné.</p>
            <p>Un channel est attribué par un utilisateur de niveau global Administrator ou plus.</p>
        </section>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_global_level() {
        let html = render_help("mediabot");
        for level in Level::ALL {
            assert!(html.contains(&format!("<td>{}</td>", level.label())));
        }
        assert!(html.contains("entre 0 et 500"));
    }
}
