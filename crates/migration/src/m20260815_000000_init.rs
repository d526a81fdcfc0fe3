//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Centavo:
//!
//! - `users`: authentication
//! - `accounts`: money locations (bank, cash, card) with a cached balance
//! - `categories`: transaction labels, including seeded shared defaults
//! - `transactions`: financial events against accounts
//! - `subscriptions`: recurring charges materialized by the billing scheduler
//!
//! Default categories are inserted with a NULL `user_id`; the engine treats
//! them as immutable and visible to every user.

use sea_orm::{ConnectionTrait, Statement, Value};
use sea_orm_migration::prelude::*;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Name,
    Currency,
    BalanceMinor,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Kind,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    AccountId,
    CategoryId,
    Kind,
    AmountMinor,
    Currency,
    OccurredAt,
    Note,
    SubscriptionId,
}

#[derive(Iden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Name,
    AmountMinor,
    BillingCycle,
    NextBillingDate,
    AccountId,
    CategoryId,
    IsActive,
    CreatedAt,
}

/// Shared default categories seeded once, owned by nobody.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Salary", "income"),
    ("Groceries", "expense"),
    ("Rent", "expense"),
    ("Transport", "expense"),
    ("Utilities", "expense"),
    ("Entertainment", "expense"),
    ("Subscriptions", "expense"),
    ("Other", "expense"),
];

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::UserId).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::IsActive).boolean().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-user_id")
                            .from(Accounts::Table, Accounts::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::UserId).string())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-user_id")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // NULL user_id rows (the defaults) compare distinct under SQLite, so
        // this index only enforces per-user uniqueness; defaults are guarded
        // by the engine's visibility-wide name check.
        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Subscriptions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::UserId).string().not_null())
                    .col(ColumnDef::new(Subscriptions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::BillingCycle)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::NextBillingDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::AccountId).string().not_null())
                    .col(ColumnDef::new(Subscriptions::CategoryId).string())
                    .col(ColumnDef::new(Subscriptions::IsActive).boolean().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subscriptions-user_id")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subscriptions-account_id")
                            .from(Subscriptions::Table, Subscriptions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subscriptions-category_id")
                            .from(Subscriptions::Table, Subscriptions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-subscriptions-is_active-next_billing_date")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::IsActive)
                    .col(Subscriptions::NextBillingDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(ColumnDef::new(Transactions::SubscriptionId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-subscription_id")
                            .from(Transactions::Table, Transactions::SubscriptionId)
                            .to(Subscriptions::Table, Subscriptions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-subscription_id")
                    .table(Transactions::Table)
                    .col(Transactions::SubscriptionId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Default categories
        // ───────────────────────────────────────────────────────────────────
        let db = manager.get_connection();
        let backend = db.get_database_backend();
        for (name, kind) in DEFAULT_CATEGORIES {
            let name_norm: String = name.nfkc().collect::<String>().to_lowercase();
            let values = vec![
                Uuid::new_v4().to_string().into(),
                Value::String(None),
                (*name).to_string().into(),
                name_norm.into(),
                (*kind).to_string().into(),
            ];
            db.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO categories (id, user_id, name, name_norm, kind) \
                 VALUES (?, ?, ?, ?, ?);",
                values,
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
