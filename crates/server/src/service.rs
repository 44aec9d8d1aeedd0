use std::time::Duration;

use chrono::{DateTime, Utc};
use infokeeper_auth::secret::{hash_secret, reject_unknown, verify_secret};
use infokeeper_auth::{Principal, TokenManager};
use infokeeper_contracts::{
    Credential, CredentialFilter, CredentialView, CreditCard, CreditCardFilter, CreditCardView,
    ErrorCode, LoadCredentialsResponse, LoadCreditCardsResponse, LoadTextDataResponse,
    LoginUserRequest, RegisterUserRequest, SaveCredentialRequest, SaveCreditCardRequest,
    SaveTextDataRequest, TextData, TextDataFilter, TextDataView, User, parse_date,
};
use infokeeper_storage::{
    ConstraintKind, Filter, Resource, Specification, SpecificationError, StorageError,
    VaultStore,
};
use infokeeper_validation::{Rule, Validate, ViolationReport, check};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::operation::Operation;

#[derive(Debug)]
pub enum ServiceError {
    InvalidBody,
    InvalidArgument {
        resource: &'static str,
        report: ViolationReport,
    },
    Unauthenticated(&'static str),
    AlreadyExists(String),
    NotFound(String),
    DeadlineExceeded,
    Internal,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::InvalidBody | ServiceError::InvalidArgument { .. } => {
                ErrorCode::InvalidArgument
            }
            ServiceError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            ServiceError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            ServiceError::NotFound(_) => ErrorCode::NotFound,
            ServiceError::DeadlineExceeded => ErrorCode::DeadlineExceeded,
            ServiceError::Internal => ErrorCode::Internal,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidBody => write!(f, "invalid JSON body"),
            ServiceError::InvalidArgument { resource, .. } => {
                write!(f, "invalid {} request", resource)
            }
            ServiceError::Unauthenticated(message) => write!(f, "{}", message),
            ServiceError::AlreadyExists(message) | ServiceError::NotFound(message) => {
                write!(f, "{}", message)
            }
            ServiceError::DeadlineExceeded => write!(f, "deadline exceeded"),
            ServiceError::Internal => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Inbound record for a `Save<Resource>` operation.
pub trait SaveRequest: Validate + DeserializeOwned + Send + Sync + 'static {
    const OPERATION: Operation;
    type Record: Resource;

    /// Called only after validation passed.
    fn into_record(
        self,
        owner_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self::Record, ViolationReport>;
}

/// Filter for a `Load<Resource>` operation.
pub trait LoadRequest: Validate + Filter + DeserializeOwned + Send + Sync + 'static {
    const OPERATION: Operation;
    type Record: Resource<Filter = Self>;
    type Response: Serialize + Send + 'static;

    fn respond(records: Vec<Self::Record>) -> Self::Response;
}

impl SaveRequest for SaveCredentialRequest {
    const OPERATION: Operation = Operation::SaveCredential;
    type Record = Credential;

    fn into_record(
        self,
        owner_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Credential, ViolationReport> {
        Ok(Credential {
            id: self.id,
            owner_id: owner_id.to_string(),
            login: self.login,
            password: self.password,
            metadata: self.metadata,
            created_at,
        })
    }
}

impl SaveRequest for SaveCreditCardRequest {
    const OPERATION: Operation = Operation::SaveCreditCard;
    type Record = CreditCard;

    fn into_record(
        self,
        owner_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<CreditCard, ViolationReport> {
        let Some(expires_at) = parse_date(&self.expires_at) else {
            let mut report = ViolationReport::default();
            report.add("expires_at", Rule::Date.message());
            return Err(report);
        };

        Ok(CreditCard {
            id: self.id,
            owner_id: owner_id.to_string(),
            number: self.number,
            owner_name: self.owner_name,
            expires_at,
            cvv_code: self.cvv_code,
            pin_code: self.pin_code,
            metadata: self.metadata,
            created_at,
        })
    }
}

impl SaveRequest for SaveTextDataRequest {
    const OPERATION: Operation = Operation::SaveTextData;
    type Record = TextData;

    fn into_record(
        self,
        owner_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<TextData, ViolationReport> {
        Ok(TextData {
            id: self.id,
            owner_id: owner_id.to_string(),
            data: self.data,
            metadata: self.metadata,
            created_at,
        })
    }
}

impl LoadRequest for CredentialFilter {
    const OPERATION: Operation = Operation::LoadCredentials;
    type Record = Credential;
    type Response = LoadCredentialsResponse;

    fn respond(records: Vec<Credential>) -> LoadCredentialsResponse {
        LoadCredentialsResponse {
            credentials: records.into_iter().map(CredentialView::from).collect(),
        }
    }
}

impl LoadRequest for CreditCardFilter {
    const OPERATION: Operation = Operation::LoadCreditCards;
    type Record = CreditCard;
    type Response = LoadCreditCardsResponse;

    fn respond(records: Vec<CreditCard>) -> LoadCreditCardsResponse {
        LoadCreditCardsResponse {
            credit_cards: records.into_iter().map(CreditCardView::from).collect(),
        }
    }
}

impl LoadRequest for TextDataFilter {
    const OPERATION: Operation = Operation::LoadTextData;
    type Record = TextData;
    type Response = LoadTextDataResponse;

    fn respond(records: Vec<TextData>) -> LoadTextDataResponse {
        LoadTextDataResponse {
            text_data: records.into_iter().map(TextDataView::from).collect(),
        }
    }
}

/// Resource services over a storage backend.
#[derive(Clone)]
pub struct VaultService<S> {
    store: S,
    tokens: TokenManager,
}

impl<S: VaultStore> VaultService<S> {
    pub fn new(store: S, tokens: TokenManager) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn save<Q: SaveRequest>(
        &self,
        caller: Option<&Principal>,
        request: Q,
        deadline: Option<Duration>,
    ) -> Result<(), ServiceError> {
        let principal = require_principal(caller, Q::OPERATION)?;
        validated(&request, Q::OPERATION)?;

        let record = request
            .into_record(&principal.user_id, Utc::now())
            .map_err(|report| invalid::<Q>(report, Q::OPERATION))?;

        self.store
            .insert(&record, deadline)
            .await
            .map_err(|err| storage_failure(<Q::Record as Resource>::KIND, err))
    }

    pub async fn load<Q: LoadRequest>(
        &self,
        caller: Option<&Principal>,
        filter: &Q,
        deadline: Option<Duration>,
    ) -> Result<Vec<Q::Record>, ServiceError> {
        let principal = require_principal(caller, Q::OPERATION)?;
        validated(filter, Q::OPERATION)?;

        let spec = Specification::new(&principal.user_id, filter).map_err(|err| match err {
            SpecificationError::InvalidDate { field } => {
                let mut report = ViolationReport::default();
                report.add(field, Rule::Date.message());
                invalid::<Q>(report, Q::OPERATION)
            }
            SpecificationError::MissingOwner => {
                tracing::error!(operation = Q::OPERATION.name(), "empty principal in context");
                ServiceError::Internal
            }
        })?;

        self.store
            .select::<Q::Record>(&spec, deadline)
            .await
            .map_err(|err| storage_failure(<Q::Record as Resource>::KIND, err))
    }

    /// Creates the user and returns a token bound to its id.
    pub async fn register(
        &self,
        request: RegisterUserRequest,
        deadline: Option<Duration>,
    ) -> Result<String, ServiceError> {
        validated(&request, Operation::RegisterUser)?;

        let password = request.password;
        let password_hash = off_runtime(move || hash_secret(&password))
            .await?
            .map_err(|err| {
                tracing::error!(error = %err, "secret hashing failed");
                ServiceError::Internal
            })?;

        let user = User {
            id: request.id,
            login: request.login,
            password_hash,
            created_at: Utc::now(),
        };

        self.store
            .insert_user(&user, deadline)
            .await
            .map_err(|err| storage_failure("user", err))?;

        self.issue(&user.id)
    }

    /// Both an unknown login and a wrong secret answer the same outward error.
    pub async fn login(
        &self,
        request: LoginUserRequest,
        deadline: Option<Duration>,
    ) -> Result<String, ServiceError> {
        validated(&request, Operation::LoginUser)?;

        let user = self
            .store
            .find_user_by_login(&request.login, deadline)
            .await
            .map_err(|err| storage_failure("user", err))?;

        let password = request.password;
        let Some(user) = user else {
            off_runtime(move || reject_unknown(&password)).await?;
            tracing::info!(reason = "user not found", "login rejected");
            return Err(ServiceError::Unauthenticated("authentication failed"));
        };

        let stored = user.password_hash.clone();
        if !off_runtime(move || verify_secret(&password, &stored)).await? {
            tracing::info!(user_id = %user.id, reason = "secret mismatch", "login rejected");
            return Err(ServiceError::Unauthenticated("authentication failed"));
        }

        self.issue(&user.id)
    }

    fn issue(&self, user_id: &str) -> Result<String, ServiceError> {
        self.tokens.issue(user_id).map_err(|err| {
            tracing::error!(error = %err, "token issue failed");
            ServiceError::Internal
        })
    }
}

/// Argon2 work runs on the blocking pool, off the request tasks.
async fn off_runtime<T, F>(work: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        tracing::error!(error = %err, "secret hashing task failed");
        ServiceError::Internal
    })
}

fn require_principal(
    caller: Option<&Principal>,
    operation: Operation,
) -> Result<&Principal, ServiceError> {
    caller.ok_or_else(|| {
        tracing::error!(
            operation = operation.name(),
            "owner-scoped operation reached without a principal"
        );
        ServiceError::Internal
    })
}

fn validated<T: Validate>(input: &T, operation: Operation) -> Result<(), ServiceError> {
    check(input).map_err(|report| invalid::<T>(report, operation))
}

fn invalid<T: Validate>(report: ViolationReport, operation: Operation) -> ServiceError {
    crate::metrics::inc_validation_failure(operation.name());
    ServiceError::InvalidArgument {
        resource: T::RESOURCE,
        report,
    }
}

fn storage_failure(kind: &'static str, err: StorageError) -> ServiceError {
    match err {
        StorageError::Timeout => {
            tracing::warn!(kind, "storage deadline exceeded");
            ServiceError::DeadlineExceeded
        }
        StorageError::Constraint {
            kind: ConstraintKind::Unique,
            constraint,
        } => {
            tracing::info!(kind, constraint = %constraint, "unique constraint violated");
            ServiceError::AlreadyExists(format!("{} already exists", kind))
        }
        StorageError::Constraint {
            kind: ConstraintKind::ForeignKey,
            constraint,
        } => {
            tracing::info!(kind, constraint = %constraint, "referenced owner missing");
            ServiceError::NotFound("owner not found".to_string())
        }
        other => {
            tracing::error!(kind, error = %other, "storage failure");
            ServiceError::Internal
        }
    }
}
