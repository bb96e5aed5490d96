use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

use journey_types::api::InvitationView;
use journey_types::models::{Group, GroupId, GroupSummary, InviteId, NewInvitation};

use crate::error::{ServiceError, internal, parse_id};
use crate::repository::{
    BlacklistRepository, GroupRepository, InviteRepository, StoreError, UserRepository,
};
use crate::tokens::InviteTokens;

/// Lets the group service kick a user off a group's live chat connection
/// without knowing anything about sockets.
pub trait DisconnectNotifier: Send + Sync {
    fn disconnect(&self, login: &str, group_id: &GroupId);
}

/// Loads an active group and checks that `login` belongs to it. Absent,
/// inactive and foreign groups are indistinguishable to the caller.
pub(crate) fn member_group(
    groups: &dyn GroupRepository,
    group_id: &GroupId,
    login: &str,
) -> Result<Group, ServiceError> {
    let group = groups
        .get_active_group(group_id)
        .map_err(internal("failed to load group"))?
        .ok_or_else(ServiceError::group_not_found)?;
    if !group.is_member(login) {
        return Err(ServiceError::group_not_found());
    }
    Ok(group)
}

/// Stores the group service reads and writes.
#[derive(Clone)]
pub struct GroupRepos {
    pub groups: Arc<dyn GroupRepository>,
    pub users: Arc<dyn UserRepository>,
    pub invites: Arc<dyn InviteRepository>,
    pub blacklists: Arc<dyn BlacklistRepository>,
}

pub struct GroupService {
    repos: GroupRepos,
    tokens: InviteTokens,
    notifier: Arc<dyn DisconnectNotifier>,
    rng: Mutex<StdRng>,
    public_url: String,
}

impl GroupService {
    pub fn new(
        repos: GroupRepos,
        tokens: InviteTokens,
        notifier: Arc<dyn DisconnectNotifier>,
    ) -> Self {
        Self {
            repos,
            tokens,
            notifier,
            rng: Mutex::new(StdRng::from_os_rng()),
            public_url: "http://localhost:8080".to_string(),
        }
    }

    /// Fixes the source used to pick a new leader.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Base of the accept links handed out with invitations.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn led_group(&self, group_id: &GroupId, login: &str) -> Result<Group, ServiceError> {
        let group = member_group(self.repos.groups.as_ref(), group_id, login)?;
        if !group.is_leader(login) {
            return Err(ServiceError::no_permission());
        }
        Ok(group)
    }

    pub fn create_group(&self, name: &str, creator: &str) -> Result<GroupId, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("group name is required".into()));
        }

        let group_id = self
            .repos
            .groups
            .create_group(name, creator)
            .map_err(internal("failed to create group"))?;

        if let Err(e) = self.repos.blacklists.create_blacklist(&group_id) {
            error!("failed to create blacklist for group {}: {}", group_id, e);
            if let Err(e) = self.repos.groups.deactivate(&group_id) {
                error!("failed to roll back group {}: {}", group_id, e);
            }
            return Err(ServiceError::Internal("failed to create group".into()));
        }

        info!("user {} created group {} ({})", creator, name, group_id);
        Ok(group_id)
    }

    pub fn list_groups(&self, login: &str) -> Result<Vec<GroupSummary>, ServiceError> {
        let groups = self
            .repos
            .groups
            .list_groups_for_member(login)
            .map_err(internal("failed to load groups"))?;
        Ok(groups.iter().map(GroupSummary::from).collect())
    }

    pub fn get_group(&self, raw_group_id: &str, login: &str) -> Result<Group, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        member_group(self.repos.groups.as_ref(), &group_id, login)
    }

    pub fn get_blacklist(
        &self,
        raw_group_id: &str,
        login: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        self.led_group(&group_id, login)?;
        let blacklist = self
            .repos
            .blacklists
            .get_blacklist(&group_id)
            .map_err(internal("failed to load blacklist"))?;
        Ok(blacklist.logins)
    }

    pub fn leave_group(&self, raw_group_id: &str, login: &str) -> Result<(), ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        let group = member_group(self.repos.groups.as_ref(), &group_id, login)?;

        if group.members.len() == 1 {
            self.repos
                .groups
                .deactivate(&group_id)
                .map_err(internal("failed to leave group"))?;
            info!("last member {} left group {}, group deactivated", login, group_id);
            return Ok(());
        }

        if group.is_leader(login) {
            let remaining: Vec<&String> = group.members.iter().filter(|m| *m != login).collect();
            let pick = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                rng.random_range(0..remaining.len())
            };
            let heir = remaining[pick];
            self.repos
                .groups
                .change_leader(&group_id, heir)
                .map_err(internal("failed to leave group"))?;
            info!("leadership of group {} passed from {} to {}", group_id, login, heir);
        }

        self.repos
            .groups
            .remove_member(&group_id, login)
            .map_err(internal("failed to leave group"))?;
        self.notifier.disconnect(login, &group_id);

        info!("user {} left group {}", login, group_id);
        Ok(())
    }

    pub fn ban_member(
        &self,
        raw_group_id: &str,
        target: &str,
        acting: &str,
    ) -> Result<(), ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        let group = self.led_group(&group_id, acting)?;
        if target == acting {
            return Err(ServiceError::Forbidden("you can't ban yourself".into()));
        }
        if !group.is_member(target) {
            return Err(ServiceError::NotFound("no such member".into()));
        }

        self.repos
            .groups
            .remove_member(&group_id, target)
            .map_err(internal("failed to ban user"))?;
        self.repos
            .blacklists
            .ban(&group_id, target)
            .map_err(internal("failed to ban user"))?;
        self.notifier.disconnect(target, &group_id);

        info!("user {} banned {} from group {}", acting, target, group_id);
        Ok(())
    }

    pub fn unban_member(
        &self,
        raw_group_id: &str,
        target: &str,
        acting: &str,
    ) -> Result<(), ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        self.led_group(&group_id, acting)?;

        let blacklist = self
            .repos
            .blacklists
            .get_blacklist(&group_id)
            .map_err(internal("failed to unban user"))?;
        if !blacklist.contains(target) {
            return Err(ServiceError::Conflict("this user is not banned in this group".into()));
        }
        self.repos
            .blacklists
            .unban(&group_id, target)
            .map_err(internal("failed to unban user"))?;

        info!("user {} unbanned {} in group {}", acting, target, group_id);
        Ok(())
    }

    pub fn give_leader_role(
        &self,
        raw_group_id: &str,
        acting: &str,
        target: &str,
    ) -> Result<(), ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        let group = self.led_group(&group_id, acting)?;
        if !group.is_member(target) {
            return Err(ServiceError::NotFound("no such member".into()));
        }
        self.repos
            .groups
            .change_leader(&group_id, target)
            .map_err(internal("failed to change leader"))?;

        info!("user {} handed leadership of group {} to {}", acting, group_id, target);
        Ok(())
    }

    pub fn delete_group(&self, raw_group_id: &str, acting: &str) -> Result<(), ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        self.led_group(&group_id, acting)?;
        self.repos
            .groups
            .deactivate(&group_id)
            .map_err(internal("failed to delete group"))?;

        info!("user {} deleted group {}", acting, group_id);
        Ok(())
    }

    pub fn invite_user(
        &self,
        raw_group_id: &str,
        acting: &str,
        invited: &str,
    ) -> Result<InviteId, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        let invited = invited.trim();
        let group = member_group(self.repos.groups.as_ref(), &group_id, acting)?;

        self.repos
            .users
            .get_user_by_login(invited)
            .map_err(internal("failed to invite user"))?
            .ok_or_else(|| ServiceError::NotFound("user not found".into()))?;

        if group.is_member(invited) {
            return Err(ServiceError::Conflict("user is already a member of this group".into()));
        }
        let blacklist = self
            .repos
            .blacklists
            .get_blacklist(&group_id)
            .map_err(internal("failed to invite user"))?;
        if blacklist.contains(invited) {
            return Err(ServiceError::Conflict("this user has been banned from this group".into()));
        }
        if self
            .repos
            .invites
            .has_pending(&group_id, invited)
            .map_err(internal("failed to invite user"))?
        {
            return Err(ServiceError::Conflict("this user is already invited to this group".into()));
        }

        let token = self.tokens.issue(invited, &group_id).map_err(|e| {
            error!("failed to sign invitation token: {}", e);
            ServiceError::Internal("failed to invite user".into())
        })?;
        let invite_id = self
            .repos
            .invites
            .add_invitation(&NewInvitation {
                sender: acting.to_string(),
                receiver: invited.to_string(),
                group_id,
                group_name: group.name.clone(),
                token,
            })
            .map_err(internal("failed to invite user"))?;

        info!("user {} invited {} to group {}", acting, invited, group_id);
        Ok(invite_id)
    }

    /// Redeems an invitation token. The token must verify and its record must
    /// still be unused.
    pub fn join_group(&self, token: &str) -> Result<GroupId, ServiceError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            warn!("rejected invitation token: {}", e);
            ServiceError::Unauthorized("invalid or expired invitation".into())
        })?;
        let group_id: GroupId = parse_id(&claims.group_id, "group")?;

        self.repos
            .invites
            .get_pending_by_token(token)
            .map_err(internal("failed to join group"))?
            .ok_or_else(|| ServiceError::NotFound("invite wasn't found".into()))?;

        self.repos
            .users
            .get_user_by_login(&claims.login)
            .map_err(internal("failed to join group"))?
            .ok_or_else(|| ServiceError::NotFound("user not found".into()))?;

        let group = self
            .repos
            .groups
            .get_active_group(&group_id)
            .map_err(internal("failed to join group"))?
            .ok_or_else(|| ServiceError::NotFound("group not found".into()))?;
        if group.is_member(&claims.login) {
            return Err(ServiceError::Conflict("you are already a member of this group".into()));
        }

        let blacklist = self
            .repos
            .blacklists
            .get_blacklist(&group_id)
            .map_err(internal("failed to join group"))?;
        if blacklist.contains(&claims.login) {
            return Err(ServiceError::Forbidden("you have been banned from this group".into()));
        }

        self.repos
            .groups
            .add_member(&group_id, &claims.login)
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    ServiceError::Conflict("you are already a member of this group".into())
                }
                other => internal("failed to join group")(other),
            })?;

        match self.repos.invites.mark_used_by_token(token) {
            Ok(0) => warn!("invitation for {} vanished before it was marked used", claims.login),
            Ok(_) => {}
            Err(e) => error!("failed to mark invitation used for {}: {}", claims.login, e),
        }

        info!("user {} joined group {}", claims.login, group_id);
        Ok(group_id)
    }

    pub fn list_invites(&self, login: &str) -> Result<Vec<InvitationView>, ServiceError> {
        let invites = self
            .repos
            .invites
            .list_pending(login)
            .map_err(internal("failed to load invites"))?;
        Ok(invites
            .into_iter()
            .map(|inv| InvitationView {
                id: inv.id,
                text: format!("User {} invited you to the group {}", inv.sender, inv.group_name),
                link: format!("{}/join-group?token={}", self.public_url, inv.token),
            })
            .collect())
    }

    pub fn decline_invite(&self, login: &str, raw_invite_id: &str) -> Result<(), ServiceError> {
        let invite_id = parse_id(raw_invite_id, "invite")?;
        let modified = self
            .repos
            .invites
            .mark_used_by_id(&invite_id, login)
            .map_err(internal("failed to decline invite"))?;
        if modified == 0 {
            return Err(ServiceError::NotFound("invite wasn't found".into()));
        }
        info!("user {} declined invite {}", login, invite_id);
        Ok(())
    }

    /// Membership check used by the chat upgrade.
    pub fn is_member(&self, group_id: &GroupId, login: &str) -> Result<bool, ServiceError> {
        match member_group(self.repos.groups.as_ref(), group_id, login) {
            Ok(_) => Ok(true),
            Err(ServiceError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
