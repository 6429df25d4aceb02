use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use roomlet_accounts_schema::{
    accounts, backup_codes, login_attempts, security_events, trusted_devices,
};
use roomlet_domain::account::{AccountKind, MfaMethod};
use roomlet_domain::event::SecurityAction;
use roomlet_domain::pagination::PageRequest;

use crate::domain::repository::{
    AccountStore, BackupCodeStore, DeviceStore, LoginAttemptStore, SecurityEventStore,
};
use crate::domain::types::{
    Account, EventFilter, LoginAttempt, NewAccount, SecurityEvent, SecurityEventRecord,
    TrustedDevice,
};
use crate::error::AccountsServiceError;

// ── Account store ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountStore {
    pub db: DatabaseConnection,
}

impl AccountStore for DbAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find account by id")?;
        model.map(account_from_model).transpose()
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.db)
            .await
            .context("find account by username")?;
        model.map(account_from_model).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find account by email")?;
        model.map(account_from_model).transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Phone.eq(phone))
            .one(&self.db)
            .await
            .context("find account by phone")?;
        model.map(account_from_model).transpose()
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(
                Condition::any()
                    .add(accounts::Column::Username.eq(identifier))
                    .add(accounts::Column::Email.eq(identifier))
                    .add(accounts::Column::Phone.eq(identifier)),
            )
            .one(&self.db)
            .await
            .context("find account by identifier")?;
        model.map(account_from_model).transpose()
    }

    async fn create(&self, account: &NewAccount) -> Result<Account, AccountsServiceError> {
        let now = Utc::now();
        let model = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(account.username.clone()),
            email: Set(account.email.clone()),
            phone: Set(account.phone.clone()),
            password_hash: Set(account.password_hash.clone()),
            kind: Set(i16::from(account.kind.as_u8())),
            email_verified: Set(false),
            mfa_method: Set(i16::from(MfaMethod::None.as_u8())),
            totp_secret: Set(None),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            last_login_ip: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match model.insert(&self.db).await {
            Ok(created) => account_from_model(created),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AccountsServiceError::AccountExists)
            }
            Err(e) => Err(anyhow::Error::from(e).context("create account").into()),
        }
    }

    async fn set_email_verified(&self, id: Uuid) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            email_verified: Set(true),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set email verified")?;
        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            password_hash: Set(password_hash.to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update password hash")?;
        Ok(())
    }

    async fn increment_failed_logins(&self, id: Uuid) -> Result<u32, AccountsServiceError> {
        use sea_orm::{ConnectionTrait, FromQueryResult, Statement};

        #[derive(Debug, FromQueryResult)]
        struct FailureRow {
            failed_login_attempts: i32,
        }

        // Single UPDATE so concurrent failures cannot lose increments.
        let sql = "UPDATE accounts \
                   SET failed_login_attempts = failed_login_attempts + 1, updated_at = NOW() \
                   WHERE id = $1 \
                   RETURNING failed_login_attempts";
        let row = FailureRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [id.into()],
        ))
        .one(&self.db)
        .await
        .context("increment failed logins")?
        .ok_or_else(|| anyhow::anyhow!("account {id} vanished during failure increment"))?;
        Ok(row.failed_login_attempts.max(0) as u32)
    }

    async fn set_lock(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            locked_until: Set(Some(until)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set account lock")?;
        Ok(())
    }

    async fn clear_expired_lock(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsServiceError> {
        use sea_orm::{ConnectionTrait, Statement};

        // The guard in the WHERE clause makes the first expiry check win;
        // concurrent and later checks see zero rows.
        let sql = "UPDATE accounts \
                   SET failed_login_attempts = 0, locked_until = NULL, updated_at = NOW() \
                   WHERE id = $1 AND locked_until IS NOT NULL AND locked_until <= $2";
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                sql,
                [id.into(), now.into()],
            ))
            .await
            .context("clear expired lock")?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_lockout(&self, id: Uuid) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("reset lockout")?;
        Ok(())
    }

    async fn set_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        ip: &str,
    ) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            last_login_at: Set(Some(at)),
            last_login_ip: Set(Some(ip.to_owned())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set last login")?;
        Ok(())
    }

    async fn set_mfa_method(&self, id: Uuid, method: MfaMethod) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            mfa_method: Set(i16::from(method.as_u8())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set mfa method")?;
        Ok(())
    }

    async fn set_totp_secret(
        &self,
        id: Uuid,
        secret: Option<&str>,
    ) -> Result<(), AccountsServiceError> {
        accounts::ActiveModel {
            id: Set(id),
            totp_secret: Set(secret.map(ToOwned::to_owned)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set totp secret")?;
        Ok(())
    }
}

fn account_from_model(model: accounts::Model) -> Result<Account, AccountsServiceError> {
    let kind = u8::try_from(model.kind)
        .ok()
        .and_then(AccountKind::from_u8)
        .ok_or_else(|| anyhow::anyhow!("unknown account kind {} on {}", model.kind, model.id))?;
    let mfa_method = u8::try_from(model.mfa_method)
        .ok()
        .and_then(MfaMethod::from_u8)
        .ok_or_else(|| anyhow::anyhow!("unknown mfa method {} on {}", model.mfa_method, model.id))?;
    Ok(Account {
        id: model.id,
        username: model.username,
        email: model.email,
        phone: model.phone,
        password_hash: model.password_hash,
        kind,
        email_verified: model.email_verified,
        mfa_method,
        totp_secret: model.totp_secret,
        failed_login_attempts: model.failed_login_attempts.max(0) as u32,
        locked_until: model.locked_until,
        last_login_at: model.last_login_at,
        last_login_ip: model.last_login_ip,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Backup-code store ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbBackupCodeStore {
    pub db: DatabaseConnection,
}

impl BackupCodeStore for DbBackupCodeStore {
    async fn replace_all(
        &self,
        account_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), AccountsServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code_hashes = code_hashes.to_vec();
                Box::pin(async move {
                    delete_codes(txn, account_id).await?;
                    insert_codes(txn, account_id, &code_hashes).await?;
                    Ok(())
                })
            })
            .await
            .context("replace backup codes")?;
        Ok(())
    }

    async fn consume(
        &self,
        account_id: Uuid,
        code_hash: &str,
    ) -> Result<bool, AccountsServiceError> {
        let result = backup_codes::Entity::delete_many()
            .filter(backup_codes::Column::AccountId.eq(account_id))
            .filter(backup_codes::Column::CodeHash.eq(code_hash))
            .exec(&self.db)
            .await
            .context("consume backup code")?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_all(&self, account_id: Uuid) -> Result<(), AccountsServiceError> {
        backup_codes::Entity::delete_many()
            .filter(backup_codes::Column::AccountId.eq(account_id))
            .exec(&self.db)
            .await
            .context("delete backup codes")?;
        Ok(())
    }
}

async fn delete_codes(txn: &DatabaseTransaction, account_id: Uuid) -> Result<(), sea_orm::DbErr> {
    backup_codes::Entity::delete_many()
        .filter(backup_codes::Column::AccountId.eq(account_id))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_codes(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    code_hashes: &[String],
) -> Result<(), sea_orm::DbErr> {
    // insert_many rejects an empty set
    if code_hashes.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let models = code_hashes.iter().map(|hash| backup_codes::ActiveModel {
        id: Set(Uuid::now_v7()),
        account_id: Set(account_id),
        code_hash: Set(hash.clone()),
        created_at: Set(now),
    });
    backup_codes::Entity::insert_many(models).exec(txn).await?;
    Ok(())
}

// ── Trusted-device store ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeviceStore {
    pub db: DatabaseConnection,
}

impl DeviceStore for DbDeviceStore {
    async fn find(
        &self,
        account_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<TrustedDevice>, AccountsServiceError> {
        let model = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::AccountId.eq(account_id))
            .filter(trusted_devices::Column::Fingerprint.eq(fingerprint))
            .one(&self.db)
            .await
            .context("find trusted device")?;
        Ok(model.map(device_from_model))
    }

    async fn upsert_trust(
        &self,
        account_id: Uuid,
        fingerprint: &str,
        label: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsServiceError> {
        // The pre-read only decides the created flag; the write itself is
        // conflict-safe on (account_id, fingerprint).
        let existing = self.find(account_id, fingerprint).await?;
        let device = trusted_devices::ActiveModel {
            id: Set(Uuid::now_v7()),
            account_id: Set(account_id),
            fingerprint: Set(fingerprint.to_owned()),
            label: Set(label.to_owned()),
            last_ip: Set(Some(ip.to_owned())),
            active: Set(true),
            expires_at: Set(None),
            last_used_at: Set(now),
            created_at: Set(now),
        };
        trusted_devices::Entity::insert(device)
            .on_conflict(
                OnConflict::columns([
                    trusted_devices::Column::AccountId,
                    trusted_devices::Column::Fingerprint,
                ])
                .update_columns([
                    trusted_devices::Column::LastIp,
                    trusted_devices::Column::LastUsedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("upsert trusted device")?;
        Ok(existing.is_none())
    }

    async fn list_active(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TrustedDevice>, AccountsServiceError> {
        let models = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::AccountId.eq(account_id))
            .filter(trusted_devices::Column::Active.eq(true))
            .order_by_desc(trusted_devices::Column::LastUsedAt)
            .all(&self.db)
            .await
            .context("list active devices")?;
        Ok(models.into_iter().map(device_from_model).collect())
    }

    async fn deactivate(
        &self,
        account_id: Uuid,
        device_id: Uuid,
    ) -> Result<bool, AccountsServiceError> {
        let Some(device) = trusted_devices::Entity::find_by_id(device_id)
            .one(&self.db)
            .await
            .context("find device for revocation")?
        else {
            return Ok(false);
        };
        if device.account_id != account_id || !device.active {
            return Ok(false);
        }
        trusted_devices::ActiveModel {
            id: Set(device_id),
            active: Set(false),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("deactivate trusted device")?;
        Ok(true)
    }
}

fn device_from_model(model: trusted_devices::Model) -> TrustedDevice {
    TrustedDevice {
        id: model.id,
        account_id: model.account_id,
        fingerprint: model.fingerprint,
        label: model.label,
        last_ip: model.last_ip,
        active: model.active,
        expires_at: model.expires_at,
        last_used_at: model.last_used_at,
        created_at: model.created_at,
    }
}

// ── Security-event store ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSecurityEventStore {
    pub db: DatabaseConnection,
}

impl SecurityEventStore for DbSecurityEventStore {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AccountsServiceError> {
        security_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            account_id: Set(event.account_id),
            action: Set(event.action.as_str().to_owned()),
            ip: Set(event.ip.clone()),
            user_agent: Set(event.user_agent.clone()),
            metadata: Set(event.metadata.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .context("append security event")?;
        Ok(())
    }

    async fn list(
        &self,
        account_id: Uuid,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Vec<SecurityEventRecord>, AccountsServiceError> {
        let page = page.clamped();
        let mut query =
            security_events::Entity::find().filter(security_events::Column::AccountId.eq(account_id));
        if let Some(action) = filter.action {
            query = query.filter(security_events::Column::Action.eq(action.as_str()));
        }
        if let Some(since) = filter.since {
            query = query.filter(security_events::Column::CreatedAt.gte(since));
        }
        if let Some(until) = filter.until {
            query = query.filter(security_events::Column::CreatedAt.lte(until));
        }
        let models = query
            .order_by_desc(security_events::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list security events")?;
        Ok(models.into_iter().map(event_record_from_model).collect())
    }

    async fn distinct_login_ips_since(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, AccountsServiceError> {
        use sea_orm::{ConnectionTrait, FromQueryResult, Statement};

        #[derive(Debug, FromQueryResult)]
        struct IpCountRow {
            ip_count: i64,
        }

        let sql = "SELECT COUNT(DISTINCT ip) AS ip_count \
                   FROM security_events \
                   WHERE account_id = $1 AND action = $2 AND created_at >= $3";
        let row = IpCountRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [
                account_id.into(),
                SecurityAction::Login.as_str().into(),
                since.into(),
            ],
        ))
        .one(&self.db)
        .await
        .context("count distinct login ips")?;
        Ok(row.map(|r| r.ip_count.max(0) as u64).unwrap_or(0))
    }
}

fn event_record_from_model(model: security_events::Model) -> SecurityEventRecord {
    SecurityEventRecord {
        id: model.id,
        account_id: model.account_id,
        action: model.action,
        ip: model.ip,
        user_agent: model.user_agent,
        metadata: model.metadata,
        created_at: model.created_at,
    }
}

// ── Login-attempt store ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLoginAttemptStore {
    pub db: DatabaseConnection,
}

impl LoginAttemptStore for DbLoginAttemptStore {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), AccountsServiceError> {
        login_attempts::ActiveModel {
            id: Set(Uuid::now_v7()),
            identifier: Set(attempt.identifier.clone()),
            ip: Set(attempt.ip.clone()),
            success: Set(attempt.success),
            user_agent: Set(attempt.user_agent.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .context("record login attempt")?;
        Ok(())
    }
}
