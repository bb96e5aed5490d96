use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, named_params, params};

use journey_core::StoreError;
use journey_core::repository::{
    BlacklistRepository, ChatRepository, GroupRepository, InviteRepository, PollRepository,
    TaskRepository, UserRepository,
};
use journey_types::models::{
    Blacklist, Group, GroupId, Invitation, InviteId, Message, NewInvitation, NewPoll, NewTask,
    NewUser, Poll, PollId, PollOption, Task, TaskId, User, UserId,
};

use crate::Database;
use crate::columns::{get_parsed, get_ts, ts};

// -- Users --

impl UserRepository for Database {
    fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError> {
        let id = UserId::new();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, login, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    user.login,
                    user.email,
                    user.password_hash,
                    ts(&Utc::now())
                ],
            )?;
            Ok(id)
        })
    }

    fn get_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| query_user(conn, "login", login))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<User>> {
    let sql = format!(
        "SELECT id, login, email, password_hash, created_at FROM users WHERE {} = ?1",
        column
    );
    conn.query_row(&sql, [value], |row| {
        Ok(User {
            id: get_parsed(row, 0)?,
            login: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: get_ts(row, 4)?,
        })
    })
    .optional()
}

// -- Groups --

impl GroupRepository for Database {
    fn create_group(&self, name: &str, leader_login: &str) -> Result<GroupId, StoreError> {
        let id = GroupId::new();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO trip_groups (id, name, leader_login, is_active, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![id.to_string(), name, leader_login, ts(&Utc::now())],
            )?;
            tx.execute(
                "INSERT INTO group_members (group_id, login) VALUES (?1, ?2)",
                params![id.to_string(), leader_login],
            )?;
            tx.commit()?;
            Ok(id)
        })
    }

    fn list_groups_for_member(&self, login: &str) -> Result<Vec<Group>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.leader_login, g.is_active
                 FROM trip_groups g
                 JOIN group_members m ON m.group_id = g.id
                 WHERE m.login = ?1 AND g.is_active = 1
                 ORDER BY g.created_at",
            )?;
            let rows = stmt
                .query_map([login], group_header)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|mut group| {
                    group.members = query_members(conn, &group.id)?;
                    Ok(group)
                })
                .collect()
        })
    }

    fn get_active_group(&self, group_id: &GroupId) -> Result<Option<Group>, StoreError> {
        self.with_conn(|conn| {
            let group = conn
                .query_row(
                    "SELECT id, name, leader_login, is_active
                     FROM trip_groups WHERE id = ?1 AND is_active = 1",
                    [group_id.to_string()],
                    group_header,
                )
                .optional()?;
            match group {
                Some(mut group) => {
                    group.members = query_members(conn, group_id)?;
                    Ok(Some(group))
                }
                None => Ok(None),
            }
        })
    }

    fn change_leader(&self, group_id: &GroupId, new_leader: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE trip_groups SET leader_login = ?2 WHERE id = ?1",
                params![group_id.to_string(), new_leader],
            )?;
            Ok(())
        })
    }

    fn add_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_members (group_id, login) VALUES (?1, ?2)",
                params![group_id.to_string(), login],
            )?;
            Ok(())
        })
    }

    fn remove_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND login = ?2",
                params![group_id.to_string(), login],
            )?;
            Ok(())
        })
    }

    fn deactivate(&self, group_id: &GroupId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE trip_groups SET is_active = 0 WHERE id = ?1",
                [group_id.to_string()],
            )?;
            Ok(())
        })
    }
}

/// Group row without its members.
fn group_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: get_parsed(row, 0)?,
        name: row.get(1)?,
        leader_login: row.get(2)?,
        members: Vec::new(),
        is_active: row.get(3)?,
    })
}

/// Members in join order.
fn query_members(conn: &Connection, group_id: &GroupId) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT login FROM group_members WHERE group_id = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map([group_id.to_string()], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

// -- Blacklists --

impl BlacklistRepository for Database {
    fn create_blacklist(&self, group_id: &GroupId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blacklists (group_id) VALUES (?1)",
                [group_id.to_string()],
            )?;
            Ok(())
        })
    }

    fn get_blacklist(&self, group_id: &GroupId) -> Result<Blacklist, StoreError> {
        self.with_conn(|conn| {
            // QueryReturnedNoRows surfaces as StoreError::NotFound.
            conn.query_row(
                "SELECT group_id FROM blacklists WHERE group_id = ?1",
                [group_id.to_string()],
                |row| row.get::<_, String>(0),
            )?;
            let mut stmt = conn.prepare(
                "SELECT login FROM blacklist_entries WHERE group_id = ?1 ORDER BY rowid",
            )?;
            let logins = stmt
                .query_map([group_id.to_string()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(Blacklist {
                group_id: *group_id,
                logins,
            })
        })
    }

    fn ban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blacklist_entries (group_id, login) VALUES (?1, ?2)",
                params![group_id.to_string(), login],
            )?;
            Ok(())
        })
    }

    fn unban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM blacklist_entries WHERE group_id = ?1 AND login = ?2",
                params![group_id.to_string(), login],
            )?;
            Ok(())
        })
    }
}

// -- Invites --

const INVITE_COLUMNS: &str =
    "id, sender, receiver, group_id, group_name, token, is_used, created_at";

fn invite_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invitation> {
    Ok(Invitation {
        id: get_parsed(row, 0)?,
        sender: row.get(1)?,
        receiver: row.get(2)?,
        group_id: get_parsed(row, 3)?,
        group_name: row.get(4)?,
        token: row.get(5)?,
        is_used: row.get(6)?,
        created_at: get_ts(row, 7)?,
    })
}

impl InviteRepository for Database {
    fn add_invitation(&self, invite: &NewInvitation) -> Result<InviteId, StoreError> {
        let id = InviteId::new();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO invites
                     (id, sender, receiver, group_id, group_name, token, is_used, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    id.to_string(),
                    invite.sender,
                    invite.receiver,
                    invite.group_id.to_string(),
                    invite.group_name,
                    invite.token,
                    ts(&Utc::now())
                ],
            )?;
            Ok(id)
        })
    }

    fn list_pending(&self, receiver: &str) -> Result<Vec<Invitation>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM invites WHERE receiver = ?1 AND is_used = 0 ORDER BY created_at",
                INVITE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([receiver], invite_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn has_pending(&self, group_id: &GroupId, receiver: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM invites WHERE group_id = ?1 AND receiver = ?2 AND is_used = 0
                 )",
                params![group_id.to_string(), receiver],
                |row| row.get(0),
            )
        })
    }

    fn get_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM invites WHERE token = ?1 AND is_used = 0",
                INVITE_COLUMNS
            );
            conn.query_row(&sql, [token], invite_row).optional()
        })
    }

    fn mark_used_by_token(&self, token: &str) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE invites SET is_used = 1 WHERE token = ?1 AND is_used = 0",
                [token],
            )?;
            Ok(n as u64)
        })
    }

    fn mark_used_by_id(&self, invite_id: &InviteId, receiver: &str) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE invites SET is_used = 1 WHERE id = ?1 AND receiver = ?2 AND is_used = 0",
                params![invite_id.to_string(), receiver],
            )?;
            Ok(n as u64)
        })
    }
}

// -- Tasks --

fn task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: get_parsed(row, 0)?,
        group_id: get_parsed(row, 1)?,
        title: row.get(2)?,
        start_time: get_ts(row, 3)?,
        duration: row.get(4)?,
        end_time: get_ts(row, 5)?,
    })
}

impl TaskRepository for Database {
    fn add_task(&self, task: &NewTask) -> Result<TaskId, StoreError> {
        let id = TaskId::new();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, group_id, title, start_time, duration, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    task.group_id.to_string(),
                    task.title,
                    ts(&task.start_time),
                    task.duration,
                    ts(&task.end_time)
                ],
            )?;
            Ok(id)
        })
    }

    fn list_tasks(&self, group_id: &GroupId) -> Result<Vec<Task>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, title, start_time, duration, end_time
                 FROM tasks WHERE group_id = ?1 ORDER BY start_time",
            )?;
            let rows = stmt
                .query_map([group_id.to_string()], task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn get_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<Option<Task>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, group_id, title, start_time, duration, end_time
                 FROM tasks WHERE id = ?1 AND group_id = ?2",
                params![task_id.to_string(), group_id.to_string()],
                task_row,
            )
            .optional()
        })
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE tasks SET title = ?3, start_time = ?4, duration = ?5, end_time = ?6
                 WHERE id = ?1 AND group_id = ?2",
                params![
                    task.id.to_string(),
                    task.group_id.to_string(),
                    task.title,
                    ts(&task.start_time),
                    task.duration,
                    ts(&task.end_time)
                ],
            )?;
            if n == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
    }

    fn delete_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND group_id = ?2",
                params![task_id.to_string(), group_id.to_string()],
            )?;
            Ok(n as u64)
        })
    }
}

// -- Polls --

/// The poll exists and is open at `:now`.
const POLL_OPEN: &str =
    "EXISTS (SELECT 1 FROM polls WHERE id = :poll AND is_early_closed = 0 AND end_time > :now)";

fn poll_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<Poll> {
    Ok(Poll {
        id: get_parsed(row, 0)?,
        group_id: get_parsed(row, 1)?,
        creator: row.get(2)?,
        title: row.get(3)?,
        first_option: row.get(4)?,
        first_votes: Vec::new(),
        second_option: row.get(5)?,
        second_votes: Vec::new(),
        end_time: get_ts(row, 6)?,
        is_early_closed: row.get(7)?,
    })
}

fn fill_votes(conn: &Connection, poll: &mut Poll) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare("SELECT login, choice FROM poll_votes WHERE poll_id = ?1 ORDER BY rowid")?;
    let votes = stmt
        .query_map([poll.id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (login, choice) in votes {
        if choice == PollOption::First.as_str() {
            poll.first_votes.push(login);
        } else {
            poll.second_votes.push(login);
        }
    }
    Ok(())
}

impl PollRepository for Database {
    fn create_poll(&self, poll: &NewPoll) -> Result<PollId, StoreError> {
        let id = PollId::new();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO polls (id, group_id, creator, title, first_option, second_option,
                                    end_time, is_early_closed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
                params![
                    id.to_string(),
                    poll.group_id.to_string(),
                    poll.creator,
                    poll.title,
                    poll.first_option,
                    poll.second_option,
                    ts(&poll.end_time),
                    ts(&Utc::now())
                ],
            )?;
            Ok(id)
        })
    }

    fn list_polls(&self, group_id: &GroupId) -> Result<Vec<Poll>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, creator, title, first_option, second_option, end_time,
                        is_early_closed
                 FROM polls WHERE group_id = ?1 ORDER BY created_at, rowid",
            )?;
            let mut polls = stmt
                .query_map([group_id.to_string()], poll_header)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for poll in &mut polls {
                fill_votes(conn, poll)?;
            }
            Ok(polls)
        })
    }

    fn get_poll(&self, poll_id: &PollId, group_id: &GroupId) -> Result<Option<Poll>, StoreError> {
        self.with_conn(|conn| {
            let poll = conn
                .query_row(
                    "SELECT id, group_id, creator, title, first_option, second_option, end_time,
                            is_early_closed
                     FROM polls WHERE id = ?1 AND group_id = ?2",
                    params![poll_id.to_string(), group_id.to_string()],
                    poll_header,
                )
                .optional()?;
            match poll {
                Some(mut poll) => {
                    fill_votes(conn, &mut poll)?;
                    Ok(Some(poll))
                }
                None => Ok(None),
            }
        })
    }

    fn close_poll(&self, poll_id: &PollId) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE polls SET is_early_closed = 1 WHERE id = ?1 AND is_early_closed = 0",
                [poll_id.to_string()],
            )?;
            Ok(n as u64)
        })
    }

    fn delete_poll(&self, poll_id: &PollId) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM polls WHERE id = ?1", [poll_id.to_string()])?;
            Ok(n as u64)
        })
    }

    fn cast_vote(
        &self,
        poll_id: &PollId,
        option: PollOption,
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let open: bool = tx.query_row(
                &format!("SELECT {}", POLL_OPEN),
                named_params! { ":poll": poll_id.to_string(), ":now": ts(&now) },
                |row| row.get(0),
            )?;
            if !open {
                return Ok(0);
            }

            tx.execute(
                "DELETE FROM poll_votes WHERE poll_id = ?1 AND login = ?2",
                params![poll_id.to_string(), login],
            )?;
            tx.execute(
                "INSERT INTO poll_votes (poll_id, login, choice) VALUES (?1, ?2, ?3)",
                params![poll_id.to_string(), login, option.as_str()],
            )?;
            tx.commit()?;
            Ok(1)
        })
    }
}

// -- Chat --

impl ChatRepository for Database {
    fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, group_id, author, content, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id.to_string(),
                    message.group_id.to_string(),
                    message.author,
                    message.content,
                    ts(&message.sent_at)
                ],
            )?;
            Ok(())
        })
    }

    fn messages_for_group(&self, group_id: &GroupId) -> Result<Vec<Message>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, author, content, sent_at
                 FROM messages WHERE group_id = ?1
                 ORDER BY sent_at, rowid",
            )?;
            let rows = stmt
                .query_map([group_id.to_string()], |row| {
                    Ok(Message {
                        id: get_parsed(row, 0)?,
                        group_id: get_parsed(row, 1)?,
                        author: row.get(2)?,
                        content: row.get(3)?,
                        sent_at: get_ts(row, 4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
