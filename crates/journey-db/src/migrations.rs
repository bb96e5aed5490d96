use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Timestamps are RFC 3339 UTC text with millisecond precision, so string
/// order is time order.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            login           TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trip_groups (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            leader_login    TEXT NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    TEXT NOT NULL REFERENCES trip_groups(id),
            login       TEXT NOT NULL,
            PRIMARY KEY (group_id, login)
        );

        CREATE INDEX IF NOT EXISTS idx_group_members_login
            ON group_members(login);

        CREATE TABLE IF NOT EXISTS blacklists (
            group_id    TEXT PRIMARY KEY REFERENCES trip_groups(id)
        );

        CREATE TABLE IF NOT EXISTS blacklist_entries (
            group_id    TEXT NOT NULL REFERENCES blacklists(group_id),
            login       TEXT NOT NULL,
            PRIMARY KEY (group_id, login)
        );

        CREATE TABLE IF NOT EXISTS invites (
            id          TEXT PRIMARY KEY,
            sender      TEXT NOT NULL,
            receiver    TEXT NOT NULL,
            group_id    TEXT NOT NULL REFERENCES trip_groups(id),
            group_name  TEXT NOT NULL,
            token       TEXT NOT NULL UNIQUE,
            is_used     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_invites_receiver
            ON invites(receiver, is_used);

        CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES trip_groups(id),
            title       TEXT NOT NULL,
            start_time  TEXT NOT NULL,
            duration    INTEGER NOT NULL,
            end_time    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_group
            ON tasks(group_id, start_time);

        CREATE TABLE IF NOT EXISTS polls (
            id              TEXT PRIMARY KEY,
            group_id        TEXT NOT NULL REFERENCES trip_groups(id),
            creator         TEXT NOT NULL,
            title           TEXT NOT NULL,
            first_option    TEXT NOT NULL,
            second_option   TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            is_early_closed INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_polls_group
            ON polls(group_id, created_at);

        -- One row per voter makes a second vote in the same poll impossible.
        CREATE TABLE IF NOT EXISTS poll_votes (
            poll_id     TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
            login       TEXT NOT NULL,
            choice      TEXT NOT NULL CHECK (choice IN ('firstOption', 'secondOption')),
            PRIMARY KEY (poll_id, login)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES trip_groups(id),
            author      TEXT NOT NULL,
            content     TEXT NOT NULL,
            sent_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_group
            ON messages(group_id, sent_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
