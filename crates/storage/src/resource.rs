use chrono::{DateTime, Utc};
use infokeeper_contracts::{
    Credential, CredentialFilter, CreditCard, CreditCardFilter, TextData, TextDataFilter,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::specification::{ColumnType, Filter, FilterField, QueryArg};

/// Storage descriptor for an owner-scoped record kind.
pub trait Resource: Clone + Send + Sync + Sized + 'static {
    const KIND: &'static str;
    const TABLE: &'static str;
    /// Select list without a `WHERE`; a specification appends one.
    const SELECT: &'static str;
    /// Placeholders bind [`Resource::insert_args`] in order.
    const INSERT: &'static str;
    /// Named unique constraints beyond the primary key, as `(name, columns)`.
    const UNIQUE: &'static [(&'static str, &'static [&'static str])] = &[];

    type Filter: Filter + Send + Sync;

    fn id(&self) -> &str;
    fn owner_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn insert_args(&self) -> Vec<QueryArg>;
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;
    /// Column value used when a specification is evaluated outside SQL.
    fn column(&self, name: &str) -> Option<QueryArg>;
}

fn text(value: &str) -> QueryArg {
    QueryArg::Text(value.to_string())
}

impl Filter for CredentialFilter {
    const FIELDS: &'static [FilterField] = &[
        FilterField::contains("login", "login"),
        FilterField::contains("password", "password"),
        FilterField::contains("metadata", "metadata"),
        FilterField::after("created_after", "created_at", ColumnType::Timestamp),
        FilterField::before("created_before", "created_at", ColumnType::Timestamp),
    ];

    fn value(&self, param: &str) -> &str {
        match param {
            "login" => &self.login,
            "password" => &self.password,
            "metadata" => &self.metadata,
            "created_after" => &self.created_after,
            "created_before" => &self.created_before,
            _ => "",
        }
    }
}

impl Resource for Credential {
    const KIND: &'static str = "credential";
    const TABLE: &'static str = "credentials";
    const SELECT: &'static str =
        "SELECT id, owner_id, login, password, metadata, created_at FROM credentials";
    const INSERT: &'static str = "INSERT INTO credentials (id, owner_id, login, password, metadata, created_at) VALUES ($1, $2, $3, $4, $5, $6)";

    type Filter = CredentialFilter;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn insert_args(&self) -> Vec<QueryArg> {
        vec![
            text(&self.id),
            text(&self.owner_id),
            text(&self.login),
            text(&self.password),
            text(&self.metadata),
            QueryArg::Timestamp(self.created_at),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            login: row.try_get("login")?,
            password: row.try_get("password")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn column(&self, name: &str) -> Option<QueryArg> {
        match name {
            "login" => Some(text(&self.login)),
            "password" => Some(text(&self.password)),
            "metadata" => Some(text(&self.metadata)),
            "created_at" => Some(QueryArg::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

impl Filter for CreditCardFilter {
    const FIELDS: &'static [FilterField] = &[
        FilterField::contains("number", "number"),
        FilterField::contains("owner_name", "owner_name"),
        FilterField::after("expires_after", "expires_at", ColumnType::Date),
        FilterField::before("expires_before", "expires_at", ColumnType::Date),
        FilterField::contains("cvv_code", "cvv_code"),
        FilterField::contains("pin_code", "pin_code"),
        FilterField::contains("metadata", "metadata"),
        FilterField::after("created_after", "created_at", ColumnType::Timestamp),
        FilterField::before("created_before", "created_at", ColumnType::Timestamp),
    ];

    fn value(&self, param: &str) -> &str {
        match param {
            "number" => &self.number,
            "owner_name" => &self.owner_name,
            "expires_after" => &self.expires_after,
            "expires_before" => &self.expires_before,
            "cvv_code" => &self.cvv_code,
            "pin_code" => &self.pin_code,
            "metadata" => &self.metadata,
            "created_after" => &self.created_after,
            "created_before" => &self.created_before,
            _ => "",
        }
    }
}

impl Resource for CreditCard {
    const KIND: &'static str = "credit card";
    const TABLE: &'static str = "credit_cards";
    const SELECT: &'static str = "SELECT id, owner_id, number, owner_name, expires_at, cvv_code, pin_code, metadata, created_at FROM credit_cards";
    const INSERT: &'static str = "INSERT INTO credit_cards (id, owner_id, number, owner_name, expires_at, cvv_code, pin_code, metadata, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
    const UNIQUE: &'static [(&'static str, &'static [&'static str])] =
        &[("unique_number", &["owner_id", "number"])];

    type Filter = CreditCardFilter;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn insert_args(&self) -> Vec<QueryArg> {
        vec![
            text(&self.id),
            text(&self.owner_id),
            text(&self.number),
            text(&self.owner_name),
            QueryArg::Date(self.expires_at),
            text(&self.cvv_code),
            text(&self.pin_code),
            text(&self.metadata),
            QueryArg::Timestamp(self.created_at),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            number: row.try_get("number")?,
            owner_name: row.try_get("owner_name")?,
            expires_at: row.try_get("expires_at")?,
            cvv_code: row.try_get("cvv_code")?,
            pin_code: row.try_get("pin_code")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn column(&self, name: &str) -> Option<QueryArg> {
        match name {
            "owner_id" => Some(text(&self.owner_id)),
            "number" => Some(text(&self.number)),
            "owner_name" => Some(text(&self.owner_name)),
            "expires_at" => Some(QueryArg::Date(self.expires_at)),
            "cvv_code" => Some(text(&self.cvv_code)),
            "pin_code" => Some(text(&self.pin_code)),
            "metadata" => Some(text(&self.metadata)),
            "created_at" => Some(QueryArg::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

impl Filter for TextDataFilter {
    const FIELDS: &'static [FilterField] = &[
        FilterField::contains("data", "data"),
        FilterField::contains("metadata", "metadata"),
        FilterField::after("created_after", "created_at", ColumnType::Timestamp),
        FilterField::before("created_before", "created_at", ColumnType::Timestamp),
    ];

    fn value(&self, param: &str) -> &str {
        match param {
            "data" => &self.data,
            "metadata" => &self.metadata,
            "created_after" => &self.created_after,
            "created_before" => &self.created_before,
            _ => "",
        }
    }
}

impl Resource for TextData {
    const KIND: &'static str = "text data";
    const TABLE: &'static str = "text_data";
    const SELECT: &'static str =
        "SELECT id, owner_id, data, metadata, created_at FROM text_data";
    const INSERT: &'static str = "INSERT INTO text_data (id, owner_id, data, metadata, created_at) VALUES ($1, $2, $3, $4, $5)";

    type Filter = TextDataFilter;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn insert_args(&self) -> Vec<QueryArg> {
        vec![
            text(&self.id),
            text(&self.owner_id),
            text(&self.data),
            text(&self.metadata),
            QueryArg::Timestamp(self.created_at),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            data: row.try_get("data")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn column(&self, name: &str) -> Option<QueryArg> {
        match name {
            "data" => Some(text(&self.data)),
            "metadata" => Some(text(&self.metadata)),
            "created_at" => Some(QueryArg::Timestamp(self.created_at)),
            _ => None,
        }
    }
}
