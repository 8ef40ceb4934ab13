use serde::{Deserialize, Serialize};

use crate::domain::ids::{GuildId, RoleId, UserId};

/// Guild permission bits as reported by the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

impl Permissions {
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_ROLES: Self = Self(1 << 28);

    pub fn contains(self, other: Self) -> bool {
        self.0 & Self::ADMINISTRATOR.0 != 0 || self.0 & other.0 == other.0
    }

    pub fn is_admin(self) -> bool {
        self.0 & Self::ADMINISTRATOR.0 != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
    pub position: i64,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub permissions: Permissions,
}

impl GuildRole {
    /// The implicit `@everyone` role shares its id with the guild.
    pub fn is_default_for(&self, guild_id: GuildId) -> bool {
        self.id.0 == guild_id.0 || self.name == "@everyone"
    }

    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub bot: bool,
}

impl Member {
    /// Server nickname first, then the global display name, then the username.
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.global_name.as_deref())
            .unwrap_or(&self.username)
    }

    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Highest position among the member's roles; 0 is the `@everyone` floor.
    pub fn top_role_position(&self, roles: &[GuildRole]) -> i64 {
        roles
            .iter()
            .filter(|role| self.has_role(role.id))
            .map(|role| role.position)
            .max()
            .unwrap_or(0)
    }

    pub fn permissions(&self, guild_id: GuildId, roles: &[GuildRole]) -> Permissions {
        roles
            .iter()
            .filter(|role| role.is_default_for(guild_id) || self.has_role(role.id))
            .fold(Permissions::default(), |acc, role| acc.union(role.permissions))
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

pub fn find_role_by_name<'a>(roles: &'a [GuildRole], name: &str) -> Option<&'a GuildRole> {
    roles.iter().find(|role| role.name == name)
}

#[cfg(test)]
mod tests {
    use crate::domain::ids::{GuildId, RoleId, UserId};

    use super::{GuildRole, Member, Permissions};

    fn role(id: u64, name: &str, position: i64, permissions: Permissions) -> GuildRole {
        GuildRole { id: RoleId(id), name: name.to_owned(), position, managed: false, color: 0, permissions }
    }

    #[test]
    fn display_name_prefers_nickname_then_global_name() {
        let mut member = Member {
            id: UserId(1),
            username: "noctiis".to_owned(),
            global_name: Some("Noctiis".to_owned()),
            nickname: None,
            role_ids: vec![],
            bot: false,
        };
        assert_eq!(member.display_name(), "Noctiis");
        member.nickname = Some("[EK 900+] Noctiis".to_owned());
        assert_eq!(member.display_name(), "[EK 900+] Noctiis");
    }

    #[test]
    fn permissions_include_default_role_and_admin_implies_everything() {
        let guild = GuildId(100);
        let roles = vec![
            role(100, "@everyone", 0, Permissions::default()),
            role(2, "Mods", 5, Permissions::MANAGE_ROLES),
            role(3, "Admins", 9, Permissions::ADMINISTRATOR),
        ];
        let moderator = Member {
            id: UserId(1),
            username: "mod".to_owned(),
            global_name: None,
            nickname: None,
            role_ids: vec![RoleId(2)],
            bot: false,
        };
        let admin = Member { role_ids: vec![RoleId(3)], ..moderator.clone() };

        assert!(moderator.permissions(guild, &roles).contains(Permissions::MANAGE_ROLES));
        assert!(!moderator.permissions(guild, &roles).is_admin());
        assert!(admin.permissions(guild, &roles).contains(Permissions::MANAGE_ROLES));
        assert_eq!(admin.top_role_position(&roles), 9);
    }
}
