//! Role checks

use storage::Role;

pub fn has_role(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

pub fn is_super_admin(role: Role) -> bool {
    role == Role::SuperAdmin
}

pub fn is_org_admin(role: Role) -> bool {
    has_role(role, &[Role::SuperAdmin, Role::OrgAdmin])
}

pub fn is_fleet_manager(role: Role) -> bool {
    has_role(role, &[Role::SuperAdmin, Role::OrgAdmin, Role::FleetManager])
}

pub fn can_manage_vehicles(role: Role) -> bool {
    is_fleet_manager(role)
}

pub fn can_view_all_vehicles(role: Role) -> bool {
    has_role(
        role,
        &[
            Role::SuperAdmin,
            Role::OrgAdmin,
            Role::FleetManager,
            Role::Customer,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_matrix() {
        assert!(is_super_admin(Role::SuperAdmin));
        assert!(!is_super_admin(Role::OrgAdmin));

        assert!(is_org_admin(Role::OrgAdmin));
        assert!(!is_org_admin(Role::FleetManager));

        assert!(can_manage_vehicles(Role::FleetManager));
        assert!(!can_manage_vehicles(Role::Customer));
        assert!(!can_manage_vehicles(Role::Driver));

        assert!(can_view_all_vehicles(Role::Customer));
        assert!(!can_view_all_vehicles(Role::Driver));
    }
}
