use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, Subscription, SubscriptionNewCmd, SubscriptionUpdateCmd,
    subscriptions,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Registers a recurring subscription against an active account.
    ///
    /// The first billing happens when `next_billing_date` elapses; nothing is
    /// charged at creation time.
    pub async fn create_subscription(&self, cmd: SubscriptionNewCmd) -> ResultEngine<Subscription> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let name = normalize_required_name(&cmd.name, "subscription")?;

        with_tx!(self, |db_tx| {
            self.require_active_account(&db_tx, &cmd.user_id, cmd.account_id)
                .await?;
            if let Some(category_id) = cmd.category_id {
                self.require_category(&db_tx, &cmd.user_id, category_id)
                    .await?;
            }

            let sub = Subscription {
                id: Uuid::new_v4(),
                user_id: cmd.user_id,
                name,
                amount_minor: cmd.amount_minor,
                billing_cycle: cmd.billing_cycle,
                next_billing_date: cmd.next_billing_date,
                account_id: cmd.account_id,
                category_id: cmd.category_id,
                is_active: true,
                created_at: Utc::now(),
            };
            subscriptions::ActiveModel::from(&sub).insert(&db_tx).await?;
            Ok(sub)
        })
    }

    /// Return a subscription snapshot from DB.
    pub async fn subscription(
        &self,
        user_id: &str,
        subscription_id: Uuid,
    ) -> ResultEngine<Subscription> {
        let model = subscriptions::Entity::find_by_id(subscription_id.to_string())
            .filter(subscriptions::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;
        Subscription::try_from(model)
    }

    pub async fn list_subscriptions(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Subscription>> {
        let mut query = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(subscriptions::Column::NextBillingDate);
        if !include_inactive {
            query = query.filter(subscriptions::Column::IsActive.eq(true));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Subscription::try_from).collect()
    }

    /// Updates a subscription definition.
    ///
    /// Changing the amount or cycle affects future billings only; already
    /// materialized transactions are untouched.
    pub async fn update_subscription(
        &self,
        cmd: SubscriptionUpdateCmd,
    ) -> ResultEngine<Subscription> {
        if let Some(amount_minor) = cmd.amount_minor
            && amount_minor <= 0
        {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let name = cmd
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "subscription"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = subscriptions::Entity::find_by_id(cmd.subscription_id.to_string())
                .filter(subscriptions::Column::UserId.eq(cmd.user_id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;
            let old = Subscription::try_from(model)?;

            if let Some(category_id) = cmd.category_id {
                self.require_category(&db_tx, &cmd.user_id, category_id)
                    .await?;
            }

            let mut new = old;
            if let Some(name) = name {
                new.name = name;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                new.amount_minor = amount_minor;
            }
            if let Some(billing_cycle) = cmd.billing_cycle {
                new.billing_cycle = billing_cycle;
            }
            if let Some(next_billing_date) = cmd.next_billing_date {
                new.next_billing_date = next_billing_date;
            }
            if let Some(category_id) = cmd.category_id {
                new.category_id = Some(category_id);
            }
            if let Some(is_active) = cmd.is_active {
                new.is_active = is_active;
            }

            let active = subscriptions::ActiveModel {
                id: ActiveValue::Set(new.id.to_string()),
                name: ActiveValue::Set(new.name.clone()),
                amount_minor: ActiveValue::Set(new.amount_minor),
                billing_cycle: ActiveValue::Set(new.billing_cycle.as_str().to_string()),
                next_billing_date: ActiveValue::Set(new.next_billing_date),
                category_id: ActiveValue::Set(new.category_id.map(|id| id.to_string())),
                is_active: ActiveValue::Set(new.is_active),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(new)
        })
    }

    /// Deletes a subscription definition.
    ///
    /// Transactions it already emitted stay in the ledger; their
    /// back-reference is cleared by the schema (`ON DELETE SET NULL`).
    pub async fn delete_subscription(
        &self,
        user_id: &str,
        subscription_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = subscriptions::Entity::find_by_id(subscription_id.to_string())
                .filter(subscriptions::Column::UserId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;

            let active: subscriptions::ActiveModel = model.into();
            active.delete(&db_tx).await?;
            Ok(())
        })
    }
}
