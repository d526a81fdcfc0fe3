use base64::Engine as _;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, TransactionNewCmd,
    TransactionUpdateCmd, transactions, util::parse_uuid,
};

use super::{Engine, ledger, normalize_optional_text, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub account_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
}

/// One page of transactions, newest first.
#[derive(Clone, Debug)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidAmount(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn encode_cursor(occurred_at: DateTime<Utc>, id: Uuid) -> String {
    let raw = format!("{}:{}", occurred_at.timestamp_micros(), id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

fn decode_cursor(cursor: &str) -> ResultEngine<(DateTime<Utc>, Uuid)> {
    let invalid = || EngineError::InvalidId("invalid cursor".to_string());

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor.as_bytes())
        .map_err(|_| invalid())?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (micros, id) = raw.split_once(':').ok_or_else(invalid)?;
    let micros: i64 = micros.parse().map_err(|_| invalid())?;
    let occurred_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
    let id = Uuid::parse_str(id).map_err(|_| invalid())?;
    Ok((occurred_at, id))
}

impl Engine {
    /// Creates a transaction and applies its balance effect in one unit.
    ///
    /// The row takes the **account's** currency; the caller cannot pick one.
    pub async fn create_transaction(&self, cmd: TransactionNewCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let account = self
                .require_active_account(&db_tx, &cmd.user_id, cmd.account_id)
                .await?;

            if let Some(category_id) = cmd.category_id {
                self.require_category(&db_tx, &cmd.user_id, category_id)
                    .await?;
            }

            let tx = Transaction::new(
                cmd.user_id,
                cmd.account_id,
                cmd.category_id,
                cmd.kind,
                cmd.amount_minor,
                crate::Currency::try_from(account.currency.as_str())?,
                cmd.occurred_at,
                normalize_optional_text(cmd.note.as_deref()),
            )?;

            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            ledger::apply_on_create(&db_tx, &tx).await?;
            Ok(tx)
        })
    }

    /// Return a transaction snapshot from DB.
    pub async fn transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Lists transactions newest first, with keyset pagination.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<TransactionPage> {
        validate_list_filter(filter)?;
        let limit = limit.clamp(1, 500);

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit + 1);

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            query = query.filter(
                transactions::Column::Kind
                    .is_in(kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>()),
            );
        }
        if let Some(cursor) = cursor {
            let (occurred_at, id) = decode_cursor(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::OccurredAt.lt(occurred_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::OccurredAt.eq(occurred_at))
                            .add(transactions::Column::Id.lt(id.to_string())),
                    ),
            );
        }

        let mut models = query.all(&self.database).await?;
        let next_cursor = if models.len() as u64 > limit {
            models.truncate(limit as usize);
            models
                .last()
                .map(|m| -> ResultEngine<String> {
                    Ok(encode_cursor(m.occurred_at, parse_uuid(&m.id, "transaction")?))
                })
                .transpose()?
        } else {
            None
        };

        let items = models
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(TransactionPage { items, next_cursor })
    }

    /// Updates a transaction, reverting the old balance contribution and
    /// applying the new one in the same storage transaction.
    ///
    /// A change that touches neither amount, kind nor account leaves balances
    /// alone. Moving the row to an account in another currency is rejected:
    /// the engine performs no conversion, so a cross-currency move would
    /// silently reinterpret the amount.
    ///
    /// Updates are merge-only: an omitted field keeps its stored value, and
    /// there is no explicit-null form, so `note` and `category_id` cannot be
    /// cleared through an update. Delete and recreate the row to drop them.
    pub async fn update_transaction(&self, cmd: TransactionUpdateCmd) -> ResultEngine<Transaction> {
        if let Some(amount_minor) = cmd.amount_minor
            && amount_minor <= 0
        {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let old_model = transactions::Entity::find_by_id(cmd.transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(cmd.user_id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            let old = Transaction::try_from(old_model)?;

            let account_id = cmd.account_id.unwrap_or(old.account_id);
            if account_id != old.account_id {
                let account = self
                    .require_active_account(&db_tx, &cmd.user_id, account_id)
                    .await?;
                let currency = crate::Currency::try_from(account.currency.as_str())?;
                if currency != old.currency {
                    return Err(EngineError::CurrencyMismatch(format!(
                        "cannot move a {} transaction to a {} account",
                        old.currency.code(),
                        currency.code()
                    )));
                }
            }

            let category_id = match cmd.category_id {
                Some(category_id) => {
                    self.require_category(&db_tx, &cmd.user_id, category_id)
                        .await?;
                    Some(category_id)
                }
                None => old.category_id,
            };

            let new = Transaction {
                id: old.id,
                user_id: old.user_id.clone(),
                account_id,
                category_id,
                kind: cmd.kind.unwrap_or(old.kind),
                amount_minor: cmd.amount_minor.unwrap_or(old.amount_minor),
                currency: old.currency,
                occurred_at: cmd.occurred_at.unwrap_or(old.occurred_at),
                note: normalize_optional_text(cmd.note.as_deref()).or_else(|| old.note.clone()),
                subscription_id: old.subscription_id,
            };

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(new.id.to_string()),
                account_id: ActiveValue::Set(new.account_id.to_string()),
                category_id: ActiveValue::Set(new.category_id.map(|id| id.to_string())),
                kind: ActiveValue::Set(new.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(new.amount_minor),
                occurred_at: ActiveValue::Set(new.occurred_at),
                note: ActiveValue::Set(new.note.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            ledger::apply_on_update(&db_tx, &old, &new).await?;
            Ok(new)
        })
    }

    /// Deletes a transaction and reverts its balance effect in one unit.
    pub async fn delete_transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            let tx = Transaction::try_from(model.clone())?;

            let active: transactions::ActiveModel = model.into();
            active.delete(&db_tx).await?;

            ledger::apply_on_delete(&db_tx, &tx).await?;
            Ok(())
        })
    }
}
