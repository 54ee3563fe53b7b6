use crate::{
    entities::{stock, stock_transaction, stock_transaction::TransactionType},
    errors::ServiceError,
    services::{
        page_offset,
        references::{dangling, load_by_ids, resolve_stock_id},
        stocks::hydrate_stocks,
    },
    slug::{insert_with_unique_slug, slug_base},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Transaction row with the label of the stock row it was logged against
#[derive(Debug, Clone)]
pub struct TransactionDetail {
    pub transaction: stock_transaction::Model,
    pub stock_label: String,
}

pub(crate) fn transaction_slug_base(
    stock_label: &str,
    transaction_type: TransactionType,
    quantity: i32,
) -> String {
    slug_base(
        &format!("{}-{}-{}", stock_label, transaction_type, quantity),
        "transaction",
    )
}

async fn stock_labels<C: ConnectionTrait>(
    db: &C,
    stock_ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    let stocks = load_by_ids::<stock::Entity, _, _>(db, stock::Column::Id, stock_ids, |s| s.id)
        .await?
        .into_values()
        .collect();

    Ok(hydrate_stocks(db, stocks)
        .await?
        .into_iter()
        .map(|detail| (detail.stock.id, detail.label()))
        .collect())
}

async fn stock_label<C: ConnectionTrait>(
    db: &C,
    stock: stock::Model,
) -> Result<String, ServiceError> {
    let stock_id = stock.id;
    hydrate_stocks(db, vec![stock])
        .await?
        .pop()
        .map(|detail| detail.label())
        .ok_or_else(|| ServiceError::InternalError(format!("Stock {} has no label", stock_id)))
}

/// Append-only stock movement log.
///
/// Nothing here reads or writes the counters on the referenced stock row.
#[derive(Clone)]
pub struct StockTransactionService {
    db: Arc<DatabaseConnection>,
}

impl StockTransactionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Log a signed quantity movement against a stock row
    #[instrument(skip(self))]
    pub async fn create_transaction(
        &self,
        input: CreateStockTransactionInput,
    ) -> Result<TransactionDetail, ServiceError> {
        let stock = resolve_stock_id(&*self.db, input.stock_id).await?;
        let stock_id = stock.id;
        let label = stock_label(&*self.db, stock).await?;

        let transaction_id = Uuid::new_v4();
        let base = transaction_slug_base(&label, input.transaction_type, input.quantity);
        let transaction = insert_with_unique_slug(
            &*self.db,
            stock_transaction::Column::Slug,
            &base,
            |slug| stock_transaction::ActiveModel {
                id: Set(transaction_id),
                slug: Set(slug),
                stock_id: Set(stock_id),
                transaction_type: Set(input.transaction_type),
                quantity: Set(input.quantity),
                note: Set(input.note.clone()),
                reference: Set(input.reference.clone()),
                ..Default::default()
            },
        )
        .await?;

        info!(
            "Logged {} of {} against stock {}",
            transaction.transaction_type, transaction.quantity, stock_id
        );
        Ok(TransactionDetail {
            transaction,
            stock_label: label,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<TransactionDetail, ServiceError> {
        let transaction = self.find_transaction(transaction_id).await?;
        let stock = self.owning_stock(&transaction).await?;
        let label = stock_label(&*self.db, stock).await?;
        Ok(TransactionDetail {
            transaction,
            stock_label: label,
        })
    }

    /// List transactions, newest first
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: StockTransactionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TransactionDetail>, u64), ServiceError> {
        let mut query = stock_transaction::Entity::find();
        if let Some(stock_id) = filter.stock_id {
            query = query.filter(stock_transaction::Column::StockId.eq(stock_id));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(stock_transaction::Column::TransactionType.eq(transaction_type));
        }

        let total = query.clone().count(&*self.db).await?;
        let transactions = query
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .order_by_desc(stock_transaction::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        let labels = stock_labels(&*self.db, transactions.iter().map(|t| t.stock_id)).await?;
        let details = transactions
            .into_iter()
            .map(|transaction| {
                let stock_label = labels
                    .get(&transaction.stock_id)
                    .cloned()
                    .ok_or_else(|| dangling("Transaction", transaction.id, "stock"))?;
                Ok(TransactionDetail {
                    transaction,
                    stock_label,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok((details, total))
    }

    /// Edit a logged transaction. The slug and the stock counters stay as they are.
    #[instrument(skip(self))]
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        input: UpdateStockTransactionInput,
    ) -> Result<TransactionDetail, ServiceError> {
        let transaction = self.find_transaction(transaction_id).await?;
        let stock = match input.stock_id {
            Some(stock_id) => resolve_stock_id(&*self.db, stock_id).await?,
            None => self.owning_stock(&transaction).await?,
        };

        let stock_id = stock.id;
        let mut active: stock_transaction::ActiveModel = transaction.into();
        active.stock_id = Set(stock_id);
        if let Some(transaction_type) = input.transaction_type {
            active.transaction_type = Set(transaction_type);
        }
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(note) = input.note {
            active.note = Set(note);
        }
        if let Some(reference) = input.reference {
            active.reference = Set(reference);
        }

        let transaction = active.update(&*self.db).await?;
        let label = stock_label(&*self.db, stock).await?;

        info!("Updated stock transaction: {}", transaction_id);
        Ok(TransactionDetail {
            transaction,
            stock_label: label,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), ServiceError> {
        let transaction = self.find_transaction(transaction_id).await?;
        transaction.delete(&*self.db).await?;
        info!("Deleted stock transaction: {}", transaction_id);
        Ok(())
    }

    async fn owning_stock(
        &self,
        transaction: &stock_transaction::Model,
    ) -> Result<stock::Model, ServiceError> {
        stock::Entity::find_by_id(transaction.stock_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| dangling("Transaction", transaction.id, "stock"))
    }

    async fn find_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<stock_transaction::Model, ServiceError> {
        stock_transaction::Entity::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock transaction {} not found", transaction_id))
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateStockTransactionInput {
    pub stock_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub note: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateStockTransactionInput {
    pub stock_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub quantity: Option<i32>,
    pub note: Option<Option<String>>,
    pub reference: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StockTransactionFilter {
    pub stock_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_base_includes_type_and_signed_quantity() {
        assert_eq!(
            transaction_slug_base(
                "Widget - Default @ Central",
                TransactionType::Adjustment,
                -3
            ),
            "widget-default-central-adjustment-3"
        );
        assert_eq!(
            transaction_slug_base("Widget - Default @ Central", TransactionType::Sale, 5),
            "widget-default-central-sale-5"
        );
    }
}
