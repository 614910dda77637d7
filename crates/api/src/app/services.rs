use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use stockroom_core::{CategoryId, CustomerId, DomainError, ExpectedRevision, ProductId, Record, StockId};
use stockroom_customers::{CustomerChanges, CustomerRecord, NewCustomer};
use stockroom_infra::store::{gateway, postgres};
use stockroom_infra::{
    DocumentStore, GatewayResult, InMemoryDocumentStore, Page, PostgresDocumentStore, Query, StoreError,
};
use stockroom_inventory::{Adjustment, NewStock, StockRecord, StockSettings, StockStatus};
use stockroom_products::{
    CategoryChanges, CategoryRecord, NewCategory, NewProduct, ProductChanges, ProductRecord,
};

use crate::config::Config;

/// Stock list page size.
pub const STOCK_PAGE_SIZE: u32 = 10;

const MEMBER_NUMBER_TAKEN: &str = "memberNumber already exists";
const STOCK_EXISTS: &str = "stock already exists for this product";

/// A stock record with its product resolved for display.
#[derive(Debug, Clone)]
pub struct StockView {
    pub stock: StockRecord,
    pub product: Option<ProductRecord>,
}

/// A product with its category resolved for display.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub product: ProductRecord,
    pub category: Option<CategoryRecord>,
}

/// Stock list criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockFilter {
    /// 1-based page number. `None` returns every match.
    pub page: Option<u32>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub status: Option<StockStatus>,
}

/// Storage handles shared by every handler. Built once at start-up.
#[derive(Clone)]
pub struct AppServices {
    stock: Arc<dyn DocumentStore<StockRecord>>,
    customers: Arc<dyn DocumentStore<CustomerRecord>>,
    products: Arc<dyn DocumentStore<ProductRecord>>,
    categories: Arc<dyn DocumentStore<CategoryRecord>>,
}

/// Build services from config: Postgres when `DATABASE_URL` is set, otherwise in-memory.
pub async fn build_services(config: &Config) -> Result<AppServices, StoreError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .map_err(|e| StoreError::Backend(format!("connect: {e}")))?;
            postgres::migrate(&pool).await?;
            info!(max_connections = config.database_max_connections, "using postgres document store");
            Ok(AppServices::postgres(Arc::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            Ok(AppServices::in_memory())
        }
    }
}

impl AppServices {
    pub fn in_memory() -> Self {
        Self {
            stock: Arc::new(InMemoryDocumentStore::new()),
            customers: Arc::new(InMemoryDocumentStore::new()),
            products: Arc::new(InMemoryDocumentStore::new()),
            categories: Arc::new(InMemoryDocumentStore::new()),
        }
    }

    pub fn postgres(pool: Arc<sqlx::PgPool>) -> Self {
        Self {
            stock: Arc::new(PostgresDocumentStore::new(pool.clone())),
            customers: Arc::new(PostgresDocumentStore::new(pool.clone())),
            products: Arc::new(PostgresDocumentStore::new(pool.clone())),
            categories: Arc::new(PostgresDocumentStore::new(pool)),
        }
    }

    // -------------------------
    // Customers
    // -------------------------

    pub async fn list_customers(&self) -> GatewayResult<Vec<CustomerRecord>> {
        let query = Query::new().order_by(|a: &CustomerRecord, b: &CustomerRecord| {
            a.member_number().cmp(&b.member_number())
        });
        gateway::find_many(&*self.customers, &query).await
    }

    pub async fn get_customer(&self, id: CustomerId) -> GatewayResult<CustomerRecord> {
        gateway::find_by_id(&*self.customers, id).await
    }

    pub async fn create_customer(&self, input: NewCustomer) -> GatewayResult<CustomerRecord> {
        let record = CustomerRecord::register(CustomerId::new(), input, Utc::now())?;
        let key = record.member_number().to_string();
        if self.customers.find_by_key(&key).await?.is_some() {
            return Err(DomainError::conflict(MEMBER_NUMBER_TAKEN).into());
        }
        gateway::create(&*self.customers, record)
            .await
            .map_err(|e| e.on_duplicate(MEMBER_NUMBER_TAKEN))
    }

    pub async fn update_customer(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
        expected: ExpectedRevision,
    ) -> GatewayResult<CustomerRecord> {
        gateway::update_by_id(&*self.customers, id, expected, |current| {
            current.apply_changes(&changes, Utc::now())
        })
        .await
        .map_err(|e| e.on_duplicate(MEMBER_NUMBER_TAKEN))
    }

    pub async fn delete_customer(&self, id: CustomerId) -> GatewayResult<CustomerRecord> {
        gateway::delete_by_id(&*self.customers, id).await
    }

    // -------------------------
    // Stock
    // -------------------------

    /// Stock newest change first, joined with products; one page when a page is requested.
    pub async fn list_stock(&self, filter: &StockFilter) -> GatewayResult<Vec<StockView>> {
        let page = filter
            .page
            .map(|number| Page::new(number, STOCK_PAGE_SIZE))
            .transpose()?;
        let products = self.product_index().await?;

        let mut query = Query::new()
            .order_by(|a: &StockRecord, b: &StockRecord| {
                b.last_updated()
                    .cmp(&a.last_updated())
                    .then_with(|| b.id().cmp(&a.id()))
            })
            .paginate(page);

        if let Some(needle) = filter.search.as_deref() {
            let matching: HashSet<ProductId> = products
                .values()
                .filter(|p| p.name_contains(needle))
                .map(|p| p.id())
                .collect();
            query = query.filter(move |s: &StockRecord| matching.contains(&s.product()));
        }
        if let Some(status) = filter.status {
            query = query.filter(move |s: &StockRecord| s.status() == status);
        }

        let stock = gateway::find_many(&*self.stock, &query).await?;
        Ok(stock
            .into_iter()
            .map(|stock| {
                let product = products.get(&stock.product()).cloned();
                StockView { stock, product }
            })
            .collect())
    }

    pub async fn get_stock(&self, id: StockId) -> GatewayResult<StockView> {
        let stock = gateway::find_by_id(&*self.stock, id).await?;
        self.join_product(stock).await
    }

    pub async fn create_stock(&self, draft: NewStock) -> GatewayResult<StockView> {
        self.require_product(draft.product).await?;
        if self.stock.find_by_key(&draft.product.to_string()).await?.is_some() {
            return Err(DomainError::conflict(STOCK_EXISTS).into());
        }

        let record = StockRecord::create(StockId::new(), draft, Utc::now()).map_err(DomainError::from)?;
        let saved = gateway::create(&*self.stock, record)
            .await
            .map_err(|e| e.on_duplicate(STOCK_EXISTS))?;
        self.join_product(saved).await
    }

    pub async fn update_stock(
        &self,
        id: StockId,
        settings: StockSettings,
        expected: ExpectedRevision,
    ) -> GatewayResult<StockView> {
        if let Some(product) = settings.product {
            self.require_product(product).await?;
        }
        let saved = gateway::update_by_id(&*self.stock, id, expected, |current| {
            current
                .apply_settings(&settings, Utc::now())
                .map_err(DomainError::from)
        })
        .await
        .map_err(|e| e.on_duplicate(STOCK_EXISTS))?;
        self.join_product(saved).await
    }

    /// Apply an adjustment, re-reading and retrying if a concurrent write wins.
    pub async fn adjust_stock(&self, id: StockId, adjustment: Adjustment) -> GatewayResult<StockView> {
        let saved = gateway::update_by_id(&*self.stock, id, ExpectedRevision::Any, |current| {
            current
                .apply_adjustment(&adjustment, Utc::now())
                .map_err(DomainError::from)
        })
        .await?;
        info!(
            stock_id = %id,
            kind = ?adjustment.kind,
            amount = adjustment.amount,
            quantity = saved.quantity(),
            status = %saved.status(),
            "stock adjusted"
        );
        self.join_product(saved).await
    }

    pub async fn delete_stock(&self, id: StockId) -> GatewayResult<StockRecord> {
        gateway::delete_by_id(&*self.stock, id).await
    }

    async fn join_product(&self, stock: StockRecord) -> GatewayResult<StockView> {
        let product = self.products.get(stock.product()).await?;
        Ok(StockView { stock, product })
    }

    async fn require_product(&self, id: ProductId) -> GatewayResult<ProductRecord> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation(format!("product {id} does not exist")).into())
    }

    async fn product_index(&self) -> GatewayResult<HashMap<ProductId, ProductRecord>> {
        Ok(self.products.list().await?.into_iter().map(|p| (p.id(), p)).collect())
    }

    // -------------------------
    // Products
    // -------------------------

    pub async fn list_products(&self) -> GatewayResult<Vec<ProductView>> {
        let categories: HashMap<CategoryId, CategoryRecord> = self
            .categories
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id(), c))
            .collect();
        let query = Query::new().order_by(|a: &ProductRecord, b: &ProductRecord| a.code().cmp(b.code()));
        let products = gateway::find_many(&*self.products, &query).await?;
        Ok(products
            .into_iter()
            .map(|product| {
                let category = product.category().and_then(|c| categories.get(&c).cloned());
                ProductView { product, category }
            })
            .collect())
    }

    pub async fn get_product(&self, id: ProductId) -> GatewayResult<ProductView> {
        let product = gateway::find_by_id(&*self.products, id).await?;
        self.join_category(product).await
    }

    pub async fn create_product(&self, input: NewProduct) -> GatewayResult<ProductView> {
        if let Some(category) = input.category {
            self.require_category(category).await?;
        }
        let record = ProductRecord::create(ProductId::new(), input, Utc::now())?;
        let saved = gateway::create(&*self.products, record)
            .await
            .map_err(|e| e.on_duplicate("product code already exists"))?;
        self.join_category(saved).await
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
        expected: ExpectedRevision,
    ) -> GatewayResult<ProductView> {
        if let Some(Some(category)) = changes.category {
            self.require_category(category).await?;
        }
        let saved = gateway::update_by_id(&*self.products, id, expected, |current| {
            current.apply_changes(&changes, Utc::now())
        })
        .await
        .map_err(|e| e.on_duplicate("product code already exists"))?;
        self.join_category(saved).await
    }

    /// Delete a product. Refused while a stock record still tracks it.
    pub async fn delete_product(&self, id: ProductId) -> GatewayResult<ProductRecord> {
        if self.stock.find_by_key(&id.to_string()).await?.is_some() {
            return Err(DomainError::conflict("product still has a stock record; delete the stock first").into());
        }
        gateway::delete_by_id(&*self.products, id).await
    }

    async fn join_category(&self, product: ProductRecord) -> GatewayResult<ProductView> {
        let category = match product.category() {
            Some(id) => self.categories.get(id).await?,
            None => None,
        };
        Ok(ProductView { product, category })
    }

    async fn require_category(&self, id: CategoryId) -> GatewayResult<CategoryRecord> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation(format!("category {id} does not exist")).into())
    }

    // -------------------------
    // Categories
    // -------------------------

    pub async fn list_categories(&self) -> GatewayResult<Vec<CategoryRecord>> {
        let query = Query::new().order_by(|a: &CategoryRecord, b: &CategoryRecord| {
            a.name().to_lowercase().cmp(&b.name().to_lowercase())
        });
        gateway::find_many(&*self.categories, &query).await
    }

    pub async fn get_category(&self, id: CategoryId) -> GatewayResult<CategoryRecord> {
        gateway::find_by_id(&*self.categories, id).await
    }

    pub async fn create_category(&self, input: NewCategory) -> GatewayResult<CategoryRecord> {
        let record = CategoryRecord::create(CategoryId::new(), input, Utc::now())?;
        gateway::create(&*self.categories, record)
            .await
            .map_err(|e| e.on_duplicate("category name already exists"))
    }

    pub async fn update_category(
        &self,
        id: CategoryId,
        changes: CategoryChanges,
        expected: ExpectedRevision,
    ) -> GatewayResult<CategoryRecord> {
        gateway::update_by_id(&*self.categories, id, expected, |current| {
            current.apply_changes(&changes, Utc::now())
        })
        .await
        .map_err(|e| e.on_duplicate("category name already exists"))
    }

    /// Delete a category. Refused while any product is filed under it.
    pub async fn delete_category(&self, id: CategoryId) -> GatewayResult<CategoryRecord> {
        let in_use = self
            .products
            .list()
            .await?
            .iter()
            .any(|p| p.category() == Some(id));
        if in_use {
            return Err(DomainError::conflict("category is still assigned to products").into());
        }
        gateway::delete_by_id(&*self.categories, id).await
    }
}
