//! In-memory store and notifier for service tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use journey_types::models::{
    Blacklist, Group, GroupId, Invitation, InviteId, Message, NewInvitation, NewPoll, NewTask,
    NewUser, Poll, PollId, PollOption, Task, TaskId, User, UserId,
};

use crate::group::DisconnectNotifier;
use crate::repository::{
    BlacklistRepository, ChatRepository, GroupRepository, InviteRepository, PollRepository,
    StoreError, TaskRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: HashMap<GroupId, Group>,
    blacklists: HashMap<GroupId, Vec<String>>,
    invites: Vec<Invitation>,
    tasks: Vec<Task>,
    polls: Vec<Poll>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_blacklist: AtomicBool,
}

impl MemoryStore {
    pub fn fail_blacklist_creation(&self) {
        self.fail_blacklist.store(true, Ordering::SeqCst);
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }
}

impl UserRepository for MemoryStore {
    fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError> {
        self.with(|t| {
            if t.users.iter().any(|u| u.login == user.login || u.email == user.email) {
                return Err(StoreError::AlreadyExists);
            }
            let id = UserId::new();
            t.users.push(User {
                id,
                login: user.login.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                created_at: Utc::now(),
            });
            Ok(id)
        })
    }

    fn get_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.login == login).cloned()))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.email == email).cloned()))
    }
}

impl GroupRepository for MemoryStore {
    fn create_group(&self, name: &str, leader_login: &str) -> Result<GroupId, StoreError> {
        let id = GroupId::new();
        self.with(|t| {
            t.groups.insert(
                id,
                Group {
                    id,
                    name: name.to_string(),
                    leader_login: leader_login.to_string(),
                    members: vec![leader_login.to_string()],
                    is_active: true,
                },
            )
        });
        Ok(id)
    }

    fn list_groups_for_member(&self, login: &str) -> Result<Vec<Group>, StoreError> {
        Ok(self.with(|t| {
            t.groups
                .values()
                .filter(|g| g.is_active && g.is_member(login))
                .cloned()
                .collect()
        }))
    }

    fn get_active_group(&self, group_id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.with(|t| t.groups.get(group_id).filter(|g| g.is_active).cloned()))
    }

    fn change_leader(&self, group_id: &GroupId, new_leader: &str) -> Result<(), StoreError> {
        self.with(|t| {
            let group = t.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;
            group.leader_login = new_leader.to_string();
            Ok(())
        })
    }

    fn add_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with(|t| {
            let group = t.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;
            if group.is_member(login) {
                return Err(StoreError::AlreadyExists);
            }
            group.members.push(login.to_string());
            Ok(())
        })
    }

    fn remove_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with(|t| {
            let group = t.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;
            group.members.retain(|m| m != login);
            Ok(())
        })
    }

    fn deactivate(&self, group_id: &GroupId) -> Result<(), StoreError> {
        self.with(|t| {
            let group = t.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;
            group.is_active = false;
            Ok(())
        })
    }
}

impl BlacklistRepository for MemoryStore {
    fn create_blacklist(&self, group_id: &GroupId) -> Result<(), StoreError> {
        if self.fail_blacklist.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("blacklist insert failed".into()));
        }
        self.with(|t| t.blacklists.insert(*group_id, Vec::new()));
        Ok(())
    }

    fn get_blacklist(&self, group_id: &GroupId) -> Result<Blacklist, StoreError> {
        self.with(|t| {
            t.blacklists
                .get(group_id)
                .map(|logins| Blacklist { group_id: *group_id, logins: logins.clone() })
                .ok_or(StoreError::NotFound)
        })
    }

    fn ban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with(|t| {
            let list = t.blacklists.get_mut(group_id).ok_or(StoreError::NotFound)?;
            if !list.iter().any(|l| l == login) {
                list.push(login.to_string());
            }
            Ok(())
        })
    }

    fn unban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError> {
        self.with(|t| {
            let list = t.blacklists.get_mut(group_id).ok_or(StoreError::NotFound)?;
            list.retain(|l| l != login);
            Ok(())
        })
    }
}

impl InviteRepository for MemoryStore {
    fn add_invitation(&self, invite: &NewInvitation) -> Result<InviteId, StoreError> {
        let id = InviteId::new();
        self.with(|t| {
            t.invites.push(Invitation {
                id,
                sender: invite.sender.clone(),
                receiver: invite.receiver.clone(),
                group_id: invite.group_id,
                group_name: invite.group_name.clone(),
                token: invite.token.clone(),
                is_used: false,
                created_at: Utc::now(),
            })
        });
        Ok(id)
    }

    fn list_pending(&self, receiver: &str) -> Result<Vec<Invitation>, StoreError> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .filter(|i| !i.is_used && i.receiver == receiver)
                .cloned()
                .collect()
        }))
    }

    fn has_pending(&self, group_id: &GroupId, receiver: &str) -> Result<bool, StoreError> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .any(|i| !i.is_used && i.receiver == receiver && i.group_id == *group_id)
        }))
    }

    fn get_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .find(|i| !i.is_used && i.token == token)
                .cloned()
        }))
    }

    fn mark_used_by_token(&self, token: &str) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            let mut n = 0;
            for invite in t.invites.iter_mut().filter(|i| !i.is_used && i.token == token) {
                invite.is_used = true;
                n += 1;
            }
            n
        }))
    }

    fn mark_used_by_id(&self, invite_id: &InviteId, receiver: &str) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            match t
                .invites
                .iter_mut()
                .find(|i| !i.is_used && i.id == *invite_id && i.receiver == receiver)
            {
                Some(invite) => {
                    invite.is_used = true;
                    1
                }
                None => 0,
            }
        }))
    }
}

impl TaskRepository for MemoryStore {
    fn add_task(&self, task: &NewTask) -> Result<TaskId, StoreError> {
        let id = TaskId::new();
        self.with(|t| {
            t.tasks.push(Task {
                id,
                group_id: task.group_id,
                title: task.title.clone(),
                start_time: task.start_time,
                duration: task.duration,
                end_time: task.end_time,
            })
        });
        Ok(id)
    }

    fn list_tasks(&self, group_id: &GroupId) -> Result<Vec<Task>, StoreError> {
        Ok(self.with(|t| t.tasks.iter().filter(|x| x.group_id == *group_id).cloned().collect()))
    }

    fn get_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<Option<Task>, StoreError> {
        Ok(self.with(|t| {
            t.tasks
                .iter()
                .find(|x| x.id == *task_id && x.group_id == *group_id)
                .cloned()
        }))
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.with(|t| {
            let slot = t
                .tasks
                .iter_mut()
                .find(|x| x.id == task.id)
                .ok_or(StoreError::NotFound)?;
            *slot = task.clone();
            Ok(())
        })
    }

    fn delete_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            let before = t.tasks.len();
            t.tasks.retain(|x| !(x.id == *task_id && x.group_id == *group_id));
            (before - t.tasks.len()) as u64
        }))
    }
}

impl PollRepository for MemoryStore {
    fn create_poll(&self, poll: &NewPoll) -> Result<PollId, StoreError> {
        let id = PollId::new();
        self.with(|t| {
            t.polls.push(Poll {
                id,
                group_id: poll.group_id,
                creator: poll.creator.clone(),
                title: poll.title.clone(),
                first_option: poll.first_option.clone(),
                first_votes: Vec::new(),
                second_option: poll.second_option.clone(),
                second_votes: Vec::new(),
                end_time: poll.end_time,
                is_early_closed: false,
            })
        });
        Ok(id)
    }

    fn list_polls(&self, group_id: &GroupId) -> Result<Vec<Poll>, StoreError> {
        Ok(self.with(|t| t.polls.iter().filter(|p| p.group_id == *group_id).cloned().collect()))
    }

    fn get_poll(&self, poll_id: &PollId, group_id: &GroupId) -> Result<Option<Poll>, StoreError> {
        Ok(self.with(|t| {
            t.polls
                .iter()
                .find(|p| p.id == *poll_id && p.group_id == *group_id)
                .cloned()
        }))
    }

    fn close_poll(&self, poll_id: &PollId) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            match t.polls.iter_mut().find(|p| p.id == *poll_id && !p.is_early_closed) {
                Some(poll) => {
                    poll.is_early_closed = true;
                    1
                }
                None => 0,
            }
        }))
    }

    fn delete_poll(&self, poll_id: &PollId) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            let before = t.polls.len();
            t.polls.retain(|p| p.id != *poll_id);
            (before - t.polls.len()) as u64
        }))
    }

    fn cast_vote(
        &self,
        poll_id: &PollId,
        option: PollOption,
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            match t.polls.iter_mut().find(|p| p.id == *poll_id && !p.is_closed(now)) {
                Some(poll) => {
                    poll.first_votes.retain(|v| v != login);
                    poll.second_votes.retain(|v| v != login);
                    match option {
                        PollOption::First => poll.first_votes.push(login.to_string()),
                        PollOption::Second => poll.second_votes.push(login.to_string()),
                    }
                    1
                }
                None => 0,
            }
        }))
    }
}

impl ChatRepository for MemoryStore {
    fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.with(|t| t.messages.push(message.clone()));
        Ok(())
    }

    fn messages_for_group(&self, group_id: &GroupId) -> Result<Vec<Message>, StoreError> {
        Ok(self.with(|t| {
            t.messages
                .iter()
                .filter(|m| m.group_id == *group_id)
                .cloned()
                .collect()
        }))
    }
}

/// Records every forced disconnect instead of touching sockets.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, GroupId)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, GroupId)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DisconnectNotifier for RecordingNotifier {
    fn disconnect(&self, login: &str, group_id: &GroupId) {
        self.calls.lock().unwrap().push((login.to_string(), *group_id));
    }
}
