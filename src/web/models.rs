use std::borrow::Cow;

use chrono::{DateTime, Local, Utc};
use sqlx::FromRow;

use crate::{
    access::{Level, Session},
    export::{AdjacencyIndex, Record, TreeEntry},
};

fn text(value: &Option<String>) -> Option<Cow<'_, str>> {
    value.as_deref().map(Cow::Borrowed)
}

fn number(value: impl ToString) -> Option<Cow<'static, str>> {
    Some(Cow::Owned(value.to_string()))
}

#[derive(Clone, FromRow)]
pub struct SessionMemberRow {
    pub id_user: i32,
    pub nickname: String,
    pub level: i16,
    pub description: String,
}

impl From<SessionMemberRow> for Session {
    fn from(row: SessionMemberRow) -> Self {
        Session {
            member_id: row.id_user,
            member_login: row.nickname,
            member_level: Level::from_rank(row.level).unwrap_or(Level::User),
            member_level_description: row.description,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct MemberCredentialRow {
    pub id_user: i32,
    pub password: Option<String>,
}

#[derive(Clone, FromRow)]
pub struct AppUserRow {
    pub id_user: i32,
    pub nickname: String,
    pub hostmasks: Option<String>,
    pub username: Option<String>,
    pub level: i16,
    pub description: String,
    pub info1: Option<String>,
    pub info2: Option<String>,
    pub has_password: bool,
}

impl Record for AppUserRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "id_user" => number(self.id_user),
            "nickname" => Some(Cow::Borrowed(self.nickname.as_str())),
            "hostmasks" => text(&self.hostmasks),
            "username" => text(&self.username),
            "level" => number(self.level),
            "description" => Some(Cow::Borrowed(self.description.as_str())),
            "info1" => text(&self.info1),
            "info2" => text(&self.info2),
            "has_password" => number(u8::from(self.has_password)),
            _ => None,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct ChannelRow {
    pub id_channel: i32,
    pub name: String,
    pub description: Option<String>,
    pub channel_key: Option<String>,
    pub chanmode: Option<String>,
    pub auto_join: bool,
}

impl Record for ChannelRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "id_channel" => number(self.id_channel),
            "name" => Some(Cow::Borrowed(self.name.as_str())),
            "description" => text(&self.description),
            "channel_key" => text(&self.channel_key),
            "chanmode" => text(&self.chanmode),
            "auto_join" => number(u8::from(self.auto_join)),
            _ => None,
        }
    }
}

/// A member of one channel, as listed on the channel page.
#[derive(Clone, FromRow)]
pub struct ChannelMemberRow {
    pub id_user: i32,
    pub nickname: String,
    pub level: i32,
    pub automode: Option<String>,
    pub username: Option<String>,
    pub info1: Option<String>,
    pub info2: Option<String>,
}

impl Record for ChannelMemberRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "id_user" => number(self.id_user),
            "nickname" => Some(Cow::Borrowed(self.nickname.as_str())),
            "level" => number(self.level),
            "automode" => text(&self.automode),
            "username" => text(&self.username),
            "info1" => text(&self.info1),
            "info2" => text(&self.info2),
            _ => None,
        }
    }
}

/// One channel of the logged-in member, as listed on the profile page.
#[derive(Clone, FromRow)]
pub struct MemberChannelRow {
    pub id_channel: i32,
    pub name: String,
    pub level: i32,
    pub greet: Option<String>,
    pub automode: Option<String>,
}

impl Record for MemberChannelRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "id_channel" => number(self.id_channel),
            "name" => Some(Cow::Borrowed(self.name.as_str())),
            "level" => number(self.level),
            "greet" => text(&self.greet),
            "automode" => text(&self.automode),
            _ => None,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct ChannelLogRow {
    pub id_channel_log: i64,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub nick: Option<String>,
    pub userhost: Option<String>,
    pub publictext: Option<String>,
}

impl ChannelLogRow {
    pub fn display_time(&self) -> String {
        self.ts
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string()
    }

    pub fn display_line(&self) -> String {
        let nick = self.nick.as_deref().unwrap_or_default();
        let userhost = self.userhost.as_deref().unwrap_or_default();
        let publictext = self.publictext.as_deref().unwrap_or_default();
        match self.event_type.as_str() {
            "public" => format!("[{nick}] {publictext}"),
            "join" => format!("Joins: {nick}({userhost})"),
            "part" => format!("Parts: {nick}({userhost})"),
            "mode" | "caction" => format!("{nick} {publictext}"),
            "kick" => publictext.to_string(),
            other => other.to_string(),
        }
    }
}

impl Record for ChannelLogRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "id_channel_log" => number(self.id_channel_log),
            "when" => Some(Cow::Owned(self.display_time())),
            "line" => Some(Cow::Owned(self.display_line())),
            _ => None,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct ConsoleRow {
    pub id_console: i32,
    pub id_parent: Option<i32>,
    pub level: i16,
    pub description: String,
    pub url: String,
}

impl ConsoleRow {
    /// Console level as a visibility ceiling. Values past `User` are open to everyone,
    /// negative ones are hidden from every member.
    pub fn min_level(&self) -> Option<Level> {
        if self.level < 0 {
            return None;
        }
        Level::from_rank(self.level.min(Level::User.rank()))
    }
}

/// Builds the menu hierarchy. Rows must arrive in display order; hidden entries take
/// their subtree with them.
pub fn console_index(rows: &[ConsoleRow]) -> AdjacencyIndex {
    rows.iter()
        .filter_map(|row| {
            let min_level = row.min_level()?;
            Some((
                row.id_parent.map(|parent| parent.to_string()),
                TreeEntry::new(row.id_console.to_string(), row.description.clone())
                    .restricted_to(min_level),
            ))
        })
        .collect()
}

/// Last process snapshot the bot wrote about itself.
#[derive(Clone, FromRow)]
pub struct BotStatusRow {
    pub process_user: Option<String>,
    pub pid: Option<i32>,
    pub ppid: Option<i32>,
    pub c: Option<i32>,
    pub stime: Option<String>,
    pub tty: Option<String>,
    pub cpu_time: Option<String>,
    pub cmd: Option<String>,
}

impl Record for BotStatusRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "process_user" => text(&self.process_user),
            "pid" => self.pid.and_then(number),
            "ppid" => self.ppid.and_then(number),
            "c" => self.c.and_then(number),
            "stime" => text(&self.stime),
            "tty" => text(&self.tty),
            "cpu_time" => text(&self.cpu_time),
            "cmd" => text(&self.cmd),
            _ => None,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct CommandCategoryRow {
    pub id_public_commands_category: i32,
    pub description: String,
}

#[derive(Clone, FromRow)]
pub struct PublicCommandRow {
    pub command: String,
    pub description: Option<String>,
    pub action: Option<String>,
}

impl PublicCommandRow {
    /// Rewrites the bot's internal notation into what a channel user would type or see.
    pub fn for_display(self, command_char: &str) -> Self {
        let action = self.action.map(|action| {
            action
                .replace("ACTION %c", "/me")
                .replace("PRIVMSG %c", "")
                .replace("%n", "nickname")
        });
        Self {
            command: format!("{command_char}{}", self.command),
            description: self.description,
            action,
        }
    }
}

impl Record for PublicCommandRow {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            "command" => Some(Cow::Borrowed(self.command.as_str())),
            "description" => text(&self.description),
            "action" => text(&self.action),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::export::{Projection, RootSelector, RowSet, TreeExporter};

    fn log(event_type: &str, text: Option<&str>) -> ChannelLogRow {
        ChannelLogRow {
            id_channel_log: 1,
            ts: Local
                .with_ymd_and_hms(2024, 3, 9, 21, 4, 5)
                .unwrap()
                .with_timezone(&Utc),
            event_type: event_type.to_string(),
            nick: Some("teuk".to_string()),
            userhost: Some("~teuk@host".to_string()),
            publictext: text.map(str::to_string),
        }
    }

    #[test]
    fn log_lines_follow_event_type() {
        assert_eq!(log("public", Some("hello")).display_line(), "[teuk] hello");
        assert_eq!(log("join", None).display_line(), "Joins: teuk(~teuk@host)");
        assert_eq!(log("part", None).display_line(), "Parts: teuk(~teuk@host)");
        assert_eq!(log("mode", Some("+o bob")).display_line(), "teuk +o bob");
        assert_eq!(log("caction", Some("waves")).display_line(), "teuk waves");
        assert_eq!(log("kick", Some("bob was kicked")).display_line(), "bob was kicked");
        assert_eq!(log("topic", Some("x")).display_line(), "topic");
    }

    #[test]
    fn log_time_uses_day_first_format() {
        assert_eq!(log("public", None).display_time(), "09/03/2024 21:04:05");
    }

    #[test]
    fn command_actions_are_rewritten() {
        let row = PublicCommandRow {
            command: "hug".to_string(),
            description: Some("Hug someone".to_string()),
            action: Some("ACTION %c hugs %n".to_string()),
        }
        .for_display("!");
        assert_eq!(row.command, "!hug");
        assert_eq!(row.action.as_deref(), Some("/me hugs nickname"));

        let row = PublicCommandRow {
            command: "hello".to_string(),
            description: None,
            action: Some("PRIVMSG %cHello %n".to_string()),
        }
        .for_display(".");
        assert_eq!(row.action.as_deref(), Some("Hello nickname"));
    }

    #[test]
    fn app_user_rows_project_in_grid_order() {
        const GRID: Projection = Projection::keyed(
            "id_user",
            &["id_user", "nickname", "level", "description", "has_password"],
        );
        let users = vec![AppUserRow {
            id_user: 5,
            nickname: "a&b".to_string(),
            hostmasks: None,
            username: None,
            level: 0,
            description: "Owner".to_string(),
            info1: None,
            info2: None,
            has_password: true,
        }];
        let set = RowSet::project(&users, &GRID);
        assert_eq!(set.rows()[0].id, "5");
        assert_eq!(set.rows()[0].cells, ["5", "a&b", "0", "Owner", "1"]);
    }

    #[test]
    fn console_menu_is_filtered_by_level() {
        let row = |id: i32, parent: Option<i32>, level: i16, description: &str| ConsoleRow {
            id_console: id,
            id_parent: parent,
            level,
            description: description.to_string(),
            url: "about:blank".to_string(),
        };
        let rows = vec![
            row(1, None, 3, "Accueil"),
            row(2, None, 1, "Administration"),
            row(3, Some(2), 1, "Utilisateurs"),
            row(4, Some(1), 9, "Profil"),
        ];
        let index = console_index(&rows);

        let user_tree = TreeExporter::new(&index)
            .visible_to(Level::User)
            .build(RootSelector::Orphans)
            .unwrap();
        assert_eq!(user_tree.len(), 1);
        assert_eq!(user_tree[0].children[0].label, "Profil");

        let master_tree = TreeExporter::new(&index)
            .visible_to(Level::Master)
            .build(RootSelector::Orphans)
            .unwrap();
        assert_eq!(master_tree.len(), 2);
        assert_eq!(master_tree[1].children.len(), 1);
    }

    #[test]
    fn negative_console_levels_are_hidden_from_everyone() {
        let row = |id: i32, parent: Option<i32>, level: i16| ConsoleRow {
            id_console: id,
            id_parent: parent,
            level,
            description: format!("entry {id}"),
            url: "about:blank".to_string(),
        };
        assert_eq!(row(1, None, -1).min_level(), None);
        assert_eq!(row(1, None, 0).min_level(), Some(Level::Owner));
        assert_eq!(row(1, None, 7).min_level(), Some(Level::User));

        let rows = vec![row(1, None, 3), row(2, None, -1), row(3, Some(2), 3)];
        let owner_tree = TreeExporter::new(&console_index(&rows))
            .visible_to(Level::Owner)
            .build(RootSelector::Orphans)
            .unwrap();
        let ids: Vec<_> = owner_tree.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["1"]);
        assert!(owner_tree[0].children.is_empty());
    }

    #[test]
    fn unknown_session_levels_fall_back_to_least_privileged() {
        let session: Session = SessionMemberRow {
            id_user: 1,
            nickname: "ghost".to_string(),
            level: 42,
            description: "?".to_string(),
        }
        .into();
        assert_eq!(session.member_level, Level::User);
    }
}
