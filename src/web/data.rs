use sqlx::PgPool;

use super::models::{
    AppUserRow, BotStatusRow, ChannelLogRow, ChannelMemberRow, ChannelRow, CommandCategoryRow,
    ConsoleRow, MemberChannelRow, MemberCredentialRow, PublicCommandRow,
};

pub async fn fetch_member_credentials(
    pool: &PgPool,
    nickname: &str,
) -> sqlx::Result<Option<MemberCredentialRow>> {
    sqlx::query_as::<_, MemberCredentialRow>(
        "SELECT id_user, password FROM users WHERE nickname = $1",
    )
    .bind(nickname)
    .fetch_optional(pool)
    .await
}

pub async fn record_login_attempt(
    pool: &PgPool,
    nickname: &str,
    ip: Option<&str>,
    success: bool,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO weblog (nickname, ip, logresult) VALUES ($1, $2, $3)")
        .bind(nickname)
        .bind(ip)
        .bind(success)
        .execute(pool)
        .await?;
    Ok(())
}

const APP_USER_SELECT: &str = "SELECT users.id_user, users.nickname, users.hostmasks, users.username,
        user_levels.level, user_levels.description, users.info1, users.info2,
        (users.password IS NOT NULL AND users.password <> '') AS has_password
 FROM users JOIN user_levels ON user_levels.id_user_level = users.id_user_level";

pub async fn fetch_app_users(pool: &PgPool) -> sqlx::Result<Vec<AppUserRow>> {
    let query = format!("{APP_USER_SELECT} ORDER BY user_levels.level, users.nickname");
    sqlx::query_as::<_, AppUserRow>(&query).fetch_all(pool).await
}

pub async fn fetch_app_user(pool: &PgPool, id_user: i32) -> sqlx::Result<Option<AppUserRow>> {
    let query = format!("{APP_USER_SELECT} WHERE users.id_user = $1");
    sqlx::query_as::<_, AppUserRow>(&query)
        .bind(id_user)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_channels(pool: &PgPool) -> sqlx::Result<Vec<ChannelRow>> {
    sqlx::query_as::<_, ChannelRow>(
        "SELECT id_channel, name, description, channel_key, chanmode, auto_join
         FROM channels ORDER BY auto_join DESC, name",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_channel(pool: &PgPool, id_channel: i32) -> sqlx::Result<Option<ChannelRow>> {
    sqlx::query_as::<_, ChannelRow>(
        "SELECT id_channel, name, description, channel_key, chanmode, auto_join
         FROM channels WHERE id_channel = $1",
    )
    .bind(id_channel)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_channel_members(
    pool: &PgPool,
    id_channel: i32,
) -> sqlx::Result<Vec<ChannelMemberRow>> {
    sqlx::query_as::<_, ChannelMemberRow>(
        "SELECT users.id_user, users.nickname, user_channels.level, user_channels.automode,
                users.username, users.info1, users.info2
         FROM user_channels JOIN users ON users.id_user = user_channels.id_user
         WHERE user_channels.id_channel = $1
         ORDER BY user_channels.level DESC, users.nickname",
    )
    .bind(id_channel)
    .fetch_all(pool)
    .await
}

pub async fn fetch_member_channels(
    pool: &PgPool,
    id_user: i32,
) -> sqlx::Result<Vec<MemberChannelRow>> {
    sqlx::query_as::<_, MemberChannelRow>(
        "SELECT channels.id_channel, channels.name, user_channels.level, user_channels.greet,
                user_channels.automode
         FROM user_channels JOIN channels ON channels.id_channel = user_channels.id_channel
         WHERE user_channels.id_user = $1
         ORDER BY channels.name",
    )
    .bind(id_user)
    .fetch_all(pool)
    .await
}

pub async fn fetch_channel_membership(
    pool: &PgPool,
    id_user: i32,
    id_channel: i32,
) -> sqlx::Result<Option<i32>> {
    sqlx::query_scalar(
        "SELECT level FROM user_channels WHERE id_user = $1 AND id_channel = $2",
    )
    .bind(id_user)
    .bind(id_channel)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_channel_logs(
    pool: &PgPool,
    id_channel: i32,
    days: i64,
) -> sqlx::Result<Vec<ChannelLogRow>> {
    sqlx::query_as::<_, ChannelLogRow>(
        "SELECT id_channel_log, ts, event_type, nick, userhost, publictext
         FROM channel_logs
         WHERE id_channel = $1 AND ts BETWEEN NOW() - make_interval(days => $2) AND NOW()
         ORDER BY ts, id_channel_log",
    )
    .bind(id_channel)
    .bind(i32::try_from(days).unwrap_or(i32::MAX))
    .fetch_all(pool)
    .await
}

pub async fn fetch_console_entries(pool: &PgPool) -> sqlx::Result<Vec<ConsoleRow>> {
    sqlx::query_as::<_, ConsoleRow>(
        "SELECT id_console, id_parent, level, description, url
         FROM console ORDER BY position, id_console",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_console_entry(
    pool: &PgPool,
    id_console: i32,
) -> sqlx::Result<Option<ConsoleRow>> {
    sqlx::query_as::<_, ConsoleRow>(
        "SELECT id_console, id_parent, level, description, url
         FROM console WHERE id_console = $1",
    )
    .bind(id_console)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_bot_status(pool: &PgPool) -> sqlx::Result<Option<BotStatusRow>> {
    sqlx::query_as::<_, BotStatusRow>(
        "SELECT process_user, pid, ppid, c, stime, tty, cpu_time, cmd
         FROM status ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

pub async fn fetch_command_categories(pool: &PgPool) -> sqlx::Result<Vec<CommandCategoryRow>> {
    sqlx::query_as::<_, CommandCategoryRow>(
        "SELECT id_public_commands_category, description
         FROM public_commands_categories ORDER BY id_public_commands_category",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_public_commands(
    pool: &PgPool,
    id_category: i32,
) -> sqlx::Result<Vec<PublicCommandRow>> {
    sqlx::query_as::<_, PublicCommandRow>(
        "SELECT command, description, action
         FROM public_commands WHERE id_public_commands_category = $1
         ORDER BY command",
    )
    .bind(id_category)
    .fetch_all(pool)
    .await
}
