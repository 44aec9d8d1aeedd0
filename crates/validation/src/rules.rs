use infokeeper_contracts::{
    CredentialFilter, CreditCardFilter, LoginUserRequest, RegisterUserRequest,
    SaveCredentialRequest, SaveCreditCardRequest, SaveTextDataRequest, TextDataFilter,
};

use crate::{FieldRules, Rule, Validate};

const fn row(field: &'static str, rules: &'static [Rule]) -> FieldRules {
    FieldRules { field, rules }
}

impl Validate for RegisterUserRequest {
    const RESOURCE: &'static str = "user";
    const RULES: &'static [FieldRules] = &[
        row("id", &[Rule::Uuid]),
        row("login", &[Rule::Email]),
        row("password", &[Rule::Required]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "login" => Some(&self.login),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

impl Validate for LoginUserRequest {
    const RESOURCE: &'static str = "user";
    const RULES: &'static [FieldRules] = &[
        row("login", &[Rule::Email]),
        row("password", &[Rule::Required]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "login" => Some(&self.login),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

impl Validate for SaveCredentialRequest {
    const RESOURCE: &'static str = "credential";
    const RULES: &'static [FieldRules] = &[
        row("id", &[Rule::Uuid]),
        row("login", &[Rule::Required]),
        row("password", &[Rule::Required]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "login" => Some(&self.login),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

impl Validate for SaveCreditCardRequest {
    const RESOURCE: &'static str = "credit card";
    const RULES: &'static [FieldRules] = &[
        row("id", &[Rule::Uuid]),
        row("number", &[Rule::Required, Rule::CardNumber]),
        row("owner_name", &[Rule::Required, Rule::OwnerName]),
        row("expires_at", &[Rule::Required, Rule::Date]),
        row("cvv_code", &[Rule::Required, Rule::Cvv]),
        row("pin_code", &[Rule::Required, Rule::Pin]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "number" => Some(&self.number),
            "owner_name" => Some(&self.owner_name),
            "expires_at" => Some(&self.expires_at),
            "cvv_code" => Some(&self.cvv_code),
            "pin_code" => Some(&self.pin_code),
            _ => None,
        }
    }
}

impl Validate for SaveTextDataRequest {
    const RESOURCE: &'static str = "text data";
    const RULES: &'static [FieldRules] = &[
        row("id", &[Rule::Uuid]),
        row("data", &[Rule::Required]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "data" => Some(&self.data),
            _ => None,
        }
    }
}

impl Validate for CredentialFilter {
    const RESOURCE: &'static str = "credential";
    const RULES: &'static [FieldRules] = &[
        row("created_after", &[Rule::Date]),
        row("created_before", &[Rule::Date]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "created_after" => Some(&self.created_after),
            "created_before" => Some(&self.created_before),
            _ => None,
        }
    }
}

impl Validate for CreditCardFilter {
    const RESOURCE: &'static str = "credit card";
    const RULES: &'static [FieldRules] = &[
        row("expires_after", &[Rule::Date]),
        row("expires_before", &[Rule::Date]),
        row("created_after", &[Rule::Date]),
        row("created_before", &[Rule::Date]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "expires_after" => Some(&self.expires_after),
            "expires_before" => Some(&self.expires_before),
            "created_after" => Some(&self.created_after),
            "created_before" => Some(&self.created_before),
            _ => None,
        }
    }
}

impl Validate for TextDataFilter {
    const RESOURCE: &'static str = "text data";
    const RULES: &'static [FieldRules] = &[
        row("created_after", &[Rule::Date]),
        row("created_before", &[Rule::Date]),
    ];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "created_after" => Some(&self.created_after),
            "created_before" => Some(&self.created_before),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_table_resolves<T: Validate + Default>() {
        let value = T::default();
        for row in T::RULES {
            assert!(
                value.field(row.field).is_some(),
                "{} has no accessor for {}",
                T::RESOURCE,
                row.field
            );
        }
    }

    #[test]
    fn every_rule_row_names_a_real_field() {
        assert_table_resolves::<RegisterUserRequest>();
        assert_table_resolves::<LoginUserRequest>();
        assert_table_resolves::<SaveCredentialRequest>();
        assert_table_resolves::<SaveCreditCardRequest>();
        assert_table_resolves::<SaveTextDataRequest>();
        assert_table_resolves::<CredentialFilter>();
        assert_table_resolves::<CreditCardFilter>();
        assert_table_resolves::<TextDataFilter>();
    }
}
