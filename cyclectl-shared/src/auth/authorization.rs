/// Project authorization matrix
///
/// Every mutation in CycleCtl is gated on the actor's role in the project's
/// roster. The functions here are pure: they take a [`Roster`] that the caller
/// has already loaded and answer allow or deny. Callers apply a mutation only
/// after an `Ok`.
///
/// # Permission Model
///
/// | Action                         | Roles                  |
/// |--------------------------------|------------------------|
/// | View project and tasks         | owner, editor, viewer  |
/// | Create or edit a task          | owner, editor          |
/// | Move a task to another month   | owner                  |
/// | Delete, clear, import, export  | owner                  |
/// | Invite a member                | any member (role capped) |
/// | Change a role, remove a member | owner                  |
///
/// A project always keeps at least one owner: demoting or removing the sole
/// owner fails with [`AuthzError::LastOwner`], even when the owner acts on
/// themself.
///
/// Member mutations check, in order: actor membership, actor role, target
/// lookup, then the last-owner rule.
///
/// # Example
///
/// ```
/// use cyclectl_shared::auth::authorization::{authorize, Action, AuthzError, Roster};
/// use cyclectl_shared::models::team_member::{ProjectRole, TeamMember};
/// use uuid::Uuid;
///
/// let project = Uuid::new_v4();
/// let (owner, editor) = (Uuid::new_v4(), Uuid::new_v4());
/// let roster = Roster::new(vec![
///     TeamMember::new(project, owner, "owner@example.com", ProjectRole::Owner),
///     TeamMember::new(project, editor, "editor@example.com", ProjectRole::Editor),
/// ]);
///
/// assert_eq!(authorize(&roster, editor, Action::CreateTask), Ok(ProjectRole::Editor));
/// assert!(matches!(
///     authorize(&roster, editor, Action::DeleteTask),
///     Err(AuthzError::InsufficientRole { .. })
/// ));
/// ```

use std::fmt;

use uuid::Uuid;

use crate::models::team_member::{ProjectRole, TeamMember};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor is not on the project's roster
    #[error("Not a member of this project")]
    NotMember,

    /// Actor's role does not allow the action
    #[error("Role {actual} is not allowed to {action}")]
    InsufficientRole { action: Action, actual: ProjectRole },

    /// The change would leave the project without an owner
    #[error("A project must keep at least one owner")]
    LastOwner,

    /// Target user is not on the roster
    #[error("User {0} is not a member of this project")]
    MemberNotFound(Uuid),

    /// Invitee is already on the roster
    #[error("User {0} is already a member of this project")]
    AlreadyMember(Uuid),

    /// An owner invited someone without naming a role
    #[error("A role must be specified when an owner invites a member")]
    RoleRequired,
}

/// Something an actor may try to do in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewProject,
    CreateTask,
    EditTask,
    MoveTaskMonth,
    DeleteTask,
    ClearTasks,
    ImportTasks,
    ExportTasks,
    InviteMember,
    ChangeMemberRole,
    RemoveMember,
}

impl Action {
    /// Roles that may perform this action
    pub fn allowed_roles(&self) -> &'static [ProjectRole] {
        const ANY: &[ProjectRole] = &[ProjectRole::Owner, ProjectRole::Editor, ProjectRole::Viewer];
        const WRITERS: &[ProjectRole] = &[ProjectRole::Owner, ProjectRole::Editor];
        const OWNERS: &[ProjectRole] = &[ProjectRole::Owner];

        match self {
            Action::ViewProject | Action::InviteMember => ANY,
            Action::CreateTask | Action::EditTask => WRITERS,
            Action::MoveTaskMonth
            | Action::DeleteTask
            | Action::ClearTasks
            | Action::ImportTasks
            | Action::ExportTasks
            | Action::ChangeMemberRole
            | Action::RemoveMember => OWNERS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewProject => "view the project",
            Action::CreateTask => "create tasks",
            Action::EditTask => "edit tasks",
            Action::MoveTaskMonth => "move tasks between months",
            Action::DeleteTask => "delete tasks",
            Action::ClearTasks => "clear the board",
            Action::ImportTasks => "import tasks",
            Action::ExportTasks => "export tasks",
            Action::InviteMember => "invite members",
            Action::ChangeMemberRole => "change member roles",
            Action::RemoveMember => "remove members",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project's team in insertion order
///
/// Lookups are linear; rosters are small.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<TeamMember>,
}

impl Roster {
    pub fn new(members: Vec<TeamMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn into_members(self) -> Vec<TeamMember> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, user_id: Uuid) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<ProjectRole> {
        self.member(user_id).map(|m| m.role)
    }

    pub fn owner_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.role == ProjectRole::Owner)
            .count()
    }

    /// True if `user_id` is an owner and nobody else is
    pub fn is_sole_owner(&self, user_id: Uuid) -> bool {
        self.role_of(user_id) == Some(ProjectRole::Owner) && self.owner_count() == 1
    }
}

/// Checks that `actor` may perform `action`, returning the actor's role
pub fn authorize(roster: &Roster, actor: Uuid, action: Action) -> Result<ProjectRole, AuthzError> {
    let role = roster.role_of(actor).ok_or(AuthzError::NotMember)?;

    if action.allowed_roles().contains(&role) {
        Ok(role)
    } else {
        Err(AuthzError::InsufficientRole {
            action,
            actual: role,
        })
    }
}

/// Checks a task update
///
/// Any edit needs a writer; moving the task to another month or year
/// additionally needs an owner.
pub fn authorize_task_update(
    roster: &Roster,
    actor: Uuid,
    moves_month: bool,
) -> Result<ProjectRole, AuthzError> {
    let role = authorize(roster, actor, Action::EditTask)?;

    if moves_month {
        authorize(roster, actor, Action::MoveTaskMonth)?;
    }

    Ok(role)
}

/// Checks an invitation and returns the role the invitee gets
///
/// Owners must name the role. Editors always invite editors and viewers
/// always invite viewers, whatever was requested.
pub fn authorize_invite(
    roster: &Roster,
    actor: Uuid,
    invitee: Uuid,
    requested: Option<ProjectRole>,
) -> Result<ProjectRole, AuthzError> {
    let actor_role = authorize(roster, actor, Action::InviteMember)?;

    let assigned = match actor_role {
        ProjectRole::Owner => requested.ok_or(AuthzError::RoleRequired)?,
        ProjectRole::Editor => ProjectRole::Editor,
        ProjectRole::Viewer => ProjectRole::Viewer,
    };

    if roster.member(invitee).is_some() {
        return Err(AuthzError::AlreadyMember(invitee));
    }

    Ok(assigned)
}

/// Checks a role change of `target` to `new_role`
pub fn authorize_role_change(
    roster: &Roster,
    actor: Uuid,
    target: Uuid,
    new_role: ProjectRole,
) -> Result<(), AuthzError> {
    authorize(roster, actor, Action::ChangeMemberRole)?;

    let current = roster
        .role_of(target)
        .ok_or(AuthzError::MemberNotFound(target))?;

    if current == ProjectRole::Owner && new_role != ProjectRole::Owner && roster.owner_count() <= 1 {
        return Err(AuthzError::LastOwner);
    }

    Ok(())
}

/// Checks removal of `target` from the roster
pub fn authorize_removal(roster: &Roster, actor: Uuid, target: Uuid) -> Result<(), AuthzError> {
    authorize(roster, actor, Action::RemoveMember)?;

    if roster.member(target).is_none() {
        return Err(AuthzError::MemberNotFound(target));
    }

    if roster.is_sole_owner(target) {
        return Err(AuthzError::LastOwner);
    }

    Ok(())
}
