use std::collections::BTreeSet;

/// RPC operations exposed by the vault. `name()` is the stable identifier
/// used by the protected-operation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    RegisterUser,
    LoginUser,
    SaveCredential,
    LoadCredentials,
    SaveCreditCard,
    LoadCreditCards,
    SaveTextData,
    LoadTextData,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::RegisterUser,
        Operation::LoginUser,
        Operation::SaveCredential,
        Operation::LoadCredentials,
        Operation::SaveCreditCard,
        Operation::LoadCreditCards,
        Operation::SaveTextData,
        Operation::LoadTextData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::RegisterUser => "RegisterUser",
            Operation::LoginUser => "LoginUser",
            Operation::SaveCredential => "SaveCredential",
            Operation::LoadCredentials => "LoadCredentials",
            Operation::SaveCreditCard => "SaveCreditCard",
            Operation::LoadCreditCards => "LoadCreditCards",
            Operation::SaveTextData => "SaveTextData",
            Operation::LoadTextData => "LoadTextData",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Operation::RegisterUser => "/v1/users/register",
            Operation::LoginUser => "/v1/users/login",
            Operation::SaveCredential => "/v1/credentials/save",
            Operation::LoadCredentials => "/v1/credentials/load",
            Operation::SaveCreditCard => "/v1/credit-cards/save",
            Operation::LoadCreditCards => "/v1/credit-cards/load",
            Operation::SaveTextData => "/v1/text-data/save",
            Operation::LoadTextData => "/v1/text-data/load",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.path() == path)
    }

    /// Operations that read or write records of the calling user.
    pub fn is_owner_scoped(self) -> bool {
        !matches!(self, Operation::RegisterUser | Operation::LoginUser)
    }

    pub fn default_protected() -> BTreeSet<Operation> {
        Self::ALL
            .into_iter()
            .filter(|op| op.is_owner_scoped())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_paths_resolve_back_to_the_operation() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
            assert_eq!(Operation::from_path(op.path()), Some(op));
        }
        assert_eq!(Operation::from_name("DeleteCredential"), None);
        assert_eq!(Operation::from_path("/healthz"), None);
    }

    #[test]
    fn default_protection_excludes_only_register_and_login() {
        let protected = Operation::default_protected();
        assert_eq!(protected.len(), 6);
        assert!(!protected.contains(&Operation::RegisterUser));
        assert!(!protected.contains(&Operation::LoginUser));
    }
}
