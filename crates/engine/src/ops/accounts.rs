use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{Account, Currency, EngineError, ResultEngine, accounts, transactions};

use super::{Engine, normalize_required_name, with_tx};

/// What `delete_account` actually did with the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountRemoval {
    /// The account had transactions and was soft-deleted (`is_active = false`).
    Archived,
    /// The account had no transactions and the row was removed.
    Deleted,
}

impl Engine {
    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    pub(super) async fn require_active_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        let model = self.require_account(db_tx, user_id, account_id).await?;
        if !model.is_active {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        Ok(model)
    }

    /// Opens a new account with a zero balance.
    pub async fn create_account(
        &self,
        user_id: &str,
        name: &str,
        currency: Currency,
    ) -> ResultEngine<Account> {
        let name = normalize_required_name(name, "account")?;
        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name.clone()));
            }

            let account = Account::new(user_id.to_string(), name, currency, Utc::now());
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account)
        })
    }

    /// Return an account snapshot from DB.
    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            Account::try_from(model)
        })
    }

    pub async fn list_accounts(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(accounts::Column::CreatedAt);
        if !include_inactive {
            query = query.filter(accounts::Column::IsActive.eq(true));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Renames an existing account.
    pub async fn rename_account(
        &self,
        user_id: &str,
        account_id: Uuid,
        new_name: &str,
    ) -> ResultEngine<Account> {
        let new_name = normalize_required_name(new_name, "account")?;
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, user_id, account_id).await?;

            let exists = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(new_name.to_lowercase()))
                .filter(accounts::Column::Id.ne(account_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(new_name.clone()));
            }

            let active = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                name: ActiveValue::Set(new_name),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Account::try_from(model)
        })
    }

    /// Removes an account.
    ///
    /// An account that still has transactions is soft-deleted so its history
    /// (and the balance cached for it) stays intact; an untouched account is
    /// hard-deleted.
    pub async fn delete_account(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<AccountRemoval> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;

            let referenced = transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(account_id.to_string()))
                .count(&db_tx)
                .await?
                > 0;

            if referenced {
                let active = accounts::ActiveModel {
                    id: ActiveValue::Set(account_id.to_string()),
                    is_active: ActiveValue::Set(false),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                Ok(AccountRemoval::Archived)
            } else {
                let active: accounts::ActiveModel = model.into();
                active.delete(&db_tx).await?;
                Ok(AccountRemoval::Deleted)
            }
        })
    }
}
