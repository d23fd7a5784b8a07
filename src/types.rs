use serde::Serialize;
use uuid::Uuid;

use crate::auth::{Role, RoleSet};

/// Which program studi rows a caller may see and touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "program_studi_id", rename_all = "snake_case")]
pub enum TenantScope {
    All,
    ProgramStudi(Uuid),
}

impl TenantScope {
    /// A prodi binding wins over admin; anyone else has no scope
    pub fn resolve(roles: &RoleSet, program_studi_id: Option<Uuid>) -> Option<Self> {
        match program_studi_id {
            Some(id) if roles.contains(Role::Prodi) => Some(TenantScope::ProgramStudi(id)),
            _ if roles.contains(Role::Admin) => Some(TenantScope::All),
            _ => None,
        }
    }

    pub fn tenant(&self) -> Option<Uuid> {
        match self {
            TenantScope::All => None,
            TenantScope::ProgramStudi(id) => Some(*id),
        }
    }

    pub fn includes(&self, program_studi_id: Uuid) -> bool {
        match self {
            TenantScope::All => true,
            TenantScope::ProgramStudi(id) => *id == program_studi_id,
        }
    }

    /// Narrow `All` to an explicit filter; a fixed scope ignores the filter
    pub fn narrowed(self, filter: Option<Uuid>) -> Self {
        match (self, filter) {
            (TenantScope::All, Some(id)) => TenantScope::ProgramStudi(id),
            (scope, _) => scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[Role]) -> RoleSet {
        list.iter().copied().collect()
    }

    #[test]
    fn prodi_with_binding_is_scoped() {
        let ps = Uuid::new_v4();
        assert_eq!(TenantScope::resolve(&roles(&[Role::Prodi]), Some(ps)), Some(TenantScope::ProgramStudi(ps)));
        assert_eq!(
            TenantScope::resolve(&roles(&[Role::Admin, Role::Prodi]), Some(ps)),
            Some(TenantScope::ProgramStudi(ps))
        );
    }

    #[test]
    fn admin_without_binding_sees_all() {
        assert_eq!(TenantScope::resolve(&roles(&[Role::Admin]), None), Some(TenantScope::All));
        assert_eq!(TenantScope::resolve(&roles(&[Role::Admin]), Some(Uuid::new_v4())), Some(TenantScope::All));
    }

    #[test]
    fn prodi_without_binding_has_no_scope() {
        assert_eq!(TenantScope::resolve(&roles(&[Role::Prodi]), None), None);
        assert_eq!(TenantScope::resolve(&roles(&[Role::Dosen]), Some(Uuid::new_v4())), None);
    }

    #[test]
    fn narrowing_only_applies_to_all() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(TenantScope::All.narrowed(Some(a)), TenantScope::ProgramStudi(a));
        assert_eq!(TenantScope::ProgramStudi(a).narrowed(Some(b)), TenantScope::ProgramStudi(a));
        assert!(TenantScope::All.includes(b));
        assert!(!TenantScope::ProgramStudi(a).includes(b));
    }
}
