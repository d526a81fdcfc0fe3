//! Ledger mutation primitives.
//!
//! Every change to an account's cached `balance_minor` goes through this
//! module, whether it originates from a request handler or from the billing
//! scheduler. The callers run inside a storage transaction that also carries
//! the transaction-row write, so the row and its balance effect commit or
//! roll back as one unit.

use sea_orm::{ConnectionTrait, DatabaseTransaction, Statement};

use crate::{EngineError, ResultEngine, Transaction};

/// Adds `delta_minor` to an account's cached balance with a single atomic
/// `UPDATE`, never a read-modify-write, so concurrent writers against the
/// same account cannot lose updates.
///
/// A zero delta issues no write. If the update matches no account row the
/// ledger would drift from the transaction history, so the error is a
/// reconciliation failure: the surrounding storage transaction must roll
/// back.
pub(super) async fn adjust_balance(
    db_tx: &DatabaseTransaction,
    account_id: &str,
    delta_minor: i64,
) -> ResultEngine<()> {
    if delta_minor == 0 {
        return Ok(());
    }

    let backend = db_tx.get_database_backend();
    let result = db_tx
        .execute(Statement::from_sql_and_values(
            backend,
            "UPDATE accounts SET balance_minor = balance_minor + ? WHERE id = ?",
            [delta_minor.into(), account_id.into()],
        ))
        .await?;

    if result.rows_affected() != 1 {
        return Err(EngineError::Reconciliation(format!(
            "balance adjustment for account {account_id} matched {} rows",
            result.rows_affected()
        )));
    }
    Ok(())
}

/// Applies a freshly inserted transaction's contribution to its account.
pub(super) async fn apply_on_create(
    db_tx: &DatabaseTransaction,
    tx: &Transaction,
) -> ResultEngine<()> {
    adjust_balance(
        db_tx,
        &tx.account_id.to_string(),
        tx.kind.delta_minor(tx.amount_minor),
    )
    .await
}

/// Reverts the old contribution and applies the new one.
///
/// When the transaction moved between accounts both adjustments run, in
/// account-id order so two concurrent moves touching the same pair of
/// accounts acquire their row locks in the same sequence.
pub(super) async fn apply_on_update(
    db_tx: &DatabaseTransaction,
    old: &Transaction,
    new: &Transaction,
) -> ResultEngine<()> {
    let old_delta = old.kind.delta_minor(old.amount_minor);
    let new_delta = new.kind.delta_minor(new.amount_minor);

    if old.account_id == new.account_id {
        return adjust_balance(db_tx, &new.account_id.to_string(), new_delta - old_delta).await;
    }

    let mut adjustments = [
        (old.account_id.to_string(), -old_delta),
        (new.account_id.to_string(), new_delta),
    ];
    adjustments.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (account_id, delta_minor) in &adjustments {
        adjust_balance(db_tx, account_id, *delta_minor).await?;
    }
    Ok(())
}

/// Reverts a deleted transaction's contribution; the exact inverse of
/// [`apply_on_create`].
pub(super) async fn apply_on_delete(
    db_tx: &DatabaseTransaction,
    tx: &Transaction,
) -> ResultEngine<()> {
    adjust_balance(
        db_tx,
        &tx.account_id.to_string(),
        -tx.kind.delta_minor(tx.amount_minor),
    )
    .await
}
