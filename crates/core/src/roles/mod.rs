//! Bookkeeping for bulk role assignment sessions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::ids::{GuildId, UserId};
use crate::domain::member::{GuildRole, Member};
use crate::errors::DomainError;

/// Platform limit on entries in a single select menu.
pub const SELECT_BATCH_SIZE: usize = 25;
/// Member selects shown at once; one row stays free for the buttons.
pub const SELECTS_PER_PAGE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Add,
    Remove,
}

impl BulkAction {
    pub fn key(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Roles a moderator may pick from: no `@everyone`, no integration-managed
/// roles, highest first, capped at one select menu.
pub fn manageable_roles(roles: &[GuildRole], guild_id: GuildId) -> Vec<GuildRole> {
    let mut candidates: Vec<GuildRole> = roles
        .iter()
        .filter(|role| !role.is_default_for(guild_id) && !role.managed)
        .cloned()
        .collect();
    candidates.sort_by(|left, right| right.position.cmp(&left.position));
    candidates.truncate(SELECT_BATCH_SIZE);
    candidates
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hierarchy {
    pub actor_top_position: i64,
    pub actor_is_owner: bool,
    pub bot_top_position: i64,
}

/// A role can only be edited by someone, bot included, whose highest role sits above it.
pub fn ensure_can_manage(role: &GuildRole, hierarchy: Hierarchy) -> Result<(), DomainError> {
    if role.position >= hierarchy.actor_top_position && !hierarchy.actor_is_owner {
        return Err(DomainError::PermissionDenied(format!(
            "You cannot manage {} because it is above your highest role.",
            role.mention()
        )));
    }
    if role.position >= hierarchy.bot_top_position {
        return Err(DomainError::PermissionDenied(format!(
            "I cannot manage {} because it is above my highest role (position {} vs {}). \
             Move my role above it in Server Settings → Roles.",
            role.mention(),
            role.position,
            hierarchy.bot_top_position
        )));
    }
    Ok(())
}

/// Non-bot members split by whether they hold the role, each side sorted by
/// case-insensitive display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleRoster {
    role: GuildRole,
    with_role: Vec<Member>,
    without_role: Vec<Member>,
}

impl RoleRoster {
    pub fn split(role: GuildRole, members: impl IntoIterator<Item = Member>) -> Self {
        let (mut with_role, mut without_role): (Vec<_>, Vec<_>) = members
            .into_iter()
            .filter(|member| !member.bot)
            .partition(|member| member.has_role(role.id));
        with_role.sort_by_key(|member| member.display_name().to_lowercase());
        without_role.sort_by_key(|member| member.display_name().to_lowercase());
        Self { role, with_role, without_role }
    }

    pub fn role(&self) -> &GuildRole {
        &self.role
    }

    pub fn with_role(&self) -> &[Member] {
        &self.with_role
    }

    pub fn without_role(&self) -> &[Member] {
        &self.without_role
    }

    pub fn total(&self) -> usize {
        self.with_role.len() + self.without_role.len()
    }

    /// Members an action can apply to.
    pub fn candidates(&self, action: BulkAction) -> &[Member] {
        match action {
            BulkAction::Add => &self.without_role,
            BulkAction::Remove => &self.with_role,
        }
    }

    pub fn batches(&self, action: BulkAction) -> std::slice::Chunks<'_, Member> {
        self.candidates(action).chunks(SELECT_BATCH_SIZE)
    }

    pub fn find(&self, id: UserId) -> Option<&Member> {
        self.with_role.iter().chain(self.without_role.iter()).find(|member| member.id == id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    to_add: BTreeSet<UserId>,
    to_remove: BTreeSet<UserId>,
}

impl Selection {
    pub fn selected(&self, action: BulkAction) -> &BTreeSet<UserId> {
        match action {
            BulkAction::Add => &self.to_add,
            BulkAction::Remove => &self.to_remove,
        }
    }

    fn selected_mut(&mut self, action: BulkAction) -> &mut BTreeSet<UserId> {
        match action {
            BulkAction::Add => &mut self.to_add,
            BulkAction::Remove => &mut self.to_remove,
        }
    }

    /// Picking an already selected member in a menu unselects them.
    pub fn toggle(&mut self, action: BulkAction, ids: impl IntoIterator<Item = UserId>) {
        let selected = self.selected_mut(action);
        for id in ids {
            if !selected.remove(&id) {
                selected.insert(id);
            }
        }
    }

    pub fn select_all(&mut self, action: BulkAction, roster: &RoleRoster) {
        let ids: Vec<UserId> = roster.candidates(action).iter().map(|member| member.id).collect();
        self.selected_mut(action).extend(ids);
    }

    pub fn clear(&mut self, action: BulkAction) {
        self.selected_mut(action).clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionView {
    Overview,
    Selecting(BulkAction),
    Confirming(BulkAction),
}

/// One moderator's in-progress bulk edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSession {
    pub roster: RoleRoster,
    pub selection: Selection,
    pub view: SessionView,
    pub page: usize,
}

impl RoleSession {
    pub fn new(roster: RoleRoster) -> Self {
        Self { roster, selection: Selection::default(), view: SessionView::Overview, page: 0 }
    }

    pub fn page_count(&self, action: BulkAction) -> usize {
        self.roster.candidates(action).len().div_ceil(SELECT_BATCH_SIZE * SELECTS_PER_PAGE).max(1)
    }

    /// Moves to another page of member selects, wrapping around at either end.
    pub fn turn_page(&mut self, action: BulkAction, forward: bool) {
        let pages = self.page_count(action);
        self.page = if forward { (self.page + 1) % pages } else { (self.page + pages - 1) % pages };
    }

    /// Batches shown on the current page, each paired with its overall index.
    pub fn visible_batches(&self, action: BulkAction) -> Vec<(usize, &[Member])> {
        self.roster
            .batches(action)
            .enumerate()
            .skip(self.page * SELECTS_PER_PAGE)
            .take(SELECTS_PER_PAGE)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberOutcome {
    Applied,
    AlreadyHasRole,
    LacksRole,
    NotFound,
    Forbidden,
    HttpError,
    Unexpected,
}

impl MemberOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NotFound | Self::Forbidden | Self::HttpError | Self::Unexpected)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Applied => "done",
            Self::AlreadyHasRole => "already has the role",
            Self::LacksRole => "does not have the role",
            Self::NotFound => "member not found",
            Self::Forbidden => "missing permission",
            Self::HttpError => "HTTP error",
            Self::Unexpected => "unexpected error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkEntry {
    pub member_id: UserId,
    pub name: String,
    pub outcome: MemberOutcome,
}

/// Per-member results of applying a bulk action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkReport {
    pub action: BulkAction,
    pub entries: Vec<BulkEntry>,
}

impl BulkReport {
    pub fn new(action: BulkAction) -> Self {
        Self { action, entries: Vec::new() }
    }

    pub fn record(&mut self, member_id: UserId, name: impl Into<String>, outcome: MemberOutcome) {
        self.entries.push(BulkEntry { member_id, name: name.into(), outcome });
    }

    pub fn successes(&self) -> impl Iterator<Item = &BulkEntry> {
        self.entries.iter().filter(|entry| entry.outcome == MemberOutcome::Applied)
    }

    /// Failures and warnings, in processing order.
    pub fn problems(&self) -> impl Iterator<Item = &BulkEntry> {
        self.entries.iter().filter(|entry| entry.outcome != MemberOutcome::Applied)
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.outcome.is_failure()).count()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::ids::{GuildId, RoleId, UserId};
    use crate::domain::member::{GuildRole, Member, Permissions};
    use crate::errors::DomainError;

    use super::{
        ensure_can_manage, manageable_roles, BulkAction, BulkReport, Hierarchy, MemberOutcome,
        RoleRoster, RoleSession, Selection,
    };

    fn role(id: u64, name: &str, position: i64) -> GuildRole {
        GuildRole {
            id: RoleId(id),
            name: name.to_owned(),
            position,
            managed: false,
            color: 0,
            permissions: Permissions::default(),
        }
    }

    fn member(id: u64, name: &str, roles: &[u64], bot: bool) -> Member {
        Member {
            id: UserId(id),
            username: name.to_owned(),
            global_name: None,
            nickname: None,
            role_ids: roles.iter().copied().map(RoleId).collect(),
            bot,
        }
    }

    #[test]
    fn picker_skips_default_and_managed_roles() {
        let mut bot_role = role(4, "Integration", 8);
        bot_role.managed = true;
        let roles = vec![role(100, "@everyone", 0), role(2, "EK", 3), role(3, "Raid", 6), bot_role];

        let picked = manageable_roles(&roles, GuildId(100));

        let names: Vec<_> = picked.iter().map(|role| role.name.as_str()).collect();
        assert_eq!(names, vec!["Raid", "EK"]);
    }

    #[test]
    fn picker_is_capped_at_one_menu() {
        let roles: Vec<_> = (1..=40).map(|id| role(id, &format!("r{id}"), id as i64)).collect();
        let picked = manageable_roles(&roles, GuildId(999));
        assert_eq!(picked.len(), 25);
        assert_eq!(picked[0].position, 40);
    }

    #[test]
    fn hierarchy_blocks_roles_at_or_above_the_actor_unless_owner() {
        let target = role(2, "Raid", 5);
        let blocked = ensure_can_manage(
            &target,
            Hierarchy { actor_top_position: 5, actor_is_owner: false, bot_top_position: 9 },
        );
        assert!(matches!(blocked, Err(DomainError::PermissionDenied(message)) if message.contains("your highest role")));

        let owner = ensure_can_manage(
            &target,
            Hierarchy { actor_top_position: 1, actor_is_owner: true, bot_top_position: 9 },
        );
        assert!(owner.is_ok());

        let bot_blocked = ensure_can_manage(
            &target,
            Hierarchy { actor_top_position: 9, actor_is_owner: false, bot_top_position: 5 },
        );
        assert!(matches!(bot_blocked, Err(DomainError::PermissionDenied(message)) if message.contains("my highest role")));
    }

    #[test]
    fn roster_excludes_bots_and_sorts_case_insensitively() {
        let roster = RoleRoster::split(
            role(2, "EK", 3),
            vec![
                member(1, "zed", &[2], false),
                member(2, "Alice", &[], false),
                member(3, "bob", &[], false),
                member(4, "helper-bot", &[], true),
                member(5, "amy", &[2], false),
            ],
        );

        let with: Vec<_> = roster.with_role().iter().map(|m| m.username.as_str()).collect();
        let without: Vec<_> = roster.without_role().iter().map(|m| m.username.as_str()).collect();
        assert_eq!(with, vec!["amy", "zed"]);
        assert_eq!(without, vec!["Alice", "bob"]);
        assert_eq!(roster.total(), 4);
        assert_eq!(roster.candidates(BulkAction::Add).len(), 2);
    }

    #[test]
    fn selection_toggles_and_bulk_selects() {
        let roster = RoleRoster::split(
            role(2, "EK", 3),
            (1..=30).map(|id| member(id, &format!("m{id:02}"), &[], false)),
        );
        assert_eq!(roster.batches(BulkAction::Add).count(), 2);

        let mut selection = Selection::default();
        selection.toggle(BulkAction::Add, [UserId(1), UserId(2)]);
        selection.toggle(BulkAction::Add, [UserId(2)]);
        assert_eq!(selection.selected(BulkAction::Add).len(), 1);

        selection.select_all(BulkAction::Add, &roster);
        assert_eq!(selection.selected(BulkAction::Add).len(), 30);
        assert!(selection.selected(BulkAction::Remove).is_empty());

        selection.clear(BulkAction::Add);
        assert!(selection.selected(BulkAction::Add).is_empty());
    }

    #[test]
    fn report_separates_warnings_from_failures() {
        let mut report = BulkReport::new(BulkAction::Add);
        report.record(UserId(1), "a", MemberOutcome::Applied);
        report.record(UserId(2), "b", MemberOutcome::AlreadyHasRole);
        report.record(UserId(3), "c", MemberOutcome::Forbidden);

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.problems().count(), 2);
    }

    #[test]
    fn session_pages_through_member_batches() {
        let roster = RoleRoster::split(
            role(2, "EK", 3),
            (1..=130).map(|id| member(id, &format!("m{id:03}"), &[], false)),
        );
        let mut session = RoleSession::new(roster);

        assert_eq!(session.page_count(BulkAction::Add), 2);
        assert_eq!(session.page_count(BulkAction::Remove), 1);
        assert_eq!(session.visible_batches(BulkAction::Add).len(), 4);

        session.turn_page(BulkAction::Add, true);
        let second = session.visible_batches(BulkAction::Add);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].0, 4);
        assert_eq!(second[1].1.len(), 5);

        session.turn_page(BulkAction::Add, true);
        assert_eq!(session.page, 0);
        session.turn_page(BulkAction::Add, false);
        assert_eq!(session.page, 1);
    }
}
