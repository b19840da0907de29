//! # REST Resources
//!
//! Typed clients for the business collections. [`ResourceClient`] is the
//! generic CRUD half; the services below add what a collection needs on top.
//!
//! ## Endpoints
//! ```text
//! ┌──────────────────┬───────────────┬─────────────────────────────────────┐
//! │ Service          │ Path          │ Extra                               │
//! ├──────────────────┼───────────────┼─────────────────────────────────────┤
//! │ ProductService   │ /produits     │ search + paginate, StockLookup      │
//! │ SaleService      │ /ventes       │ submit(SalePayload)                 │
//! │ ExpenseService   │ /depenses     │ -                                   │
//! │ ClientService    │ /clients      │ -                                   │
//! │ ProformaService  │ /proformas    │ raw JSON documents                  │
//! │ CompanyService   │ /entreprise   │ single record: get / update         │
//! └──────────────────┴───────────────┴─────────────────────────────────────┘
//! ```
//!
//! List endpoints answer either a bare array or `{ "data": [...] }`; both
//! decode to a `Vec<T>`.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use comptoir_core::listing::{filter_by_query, paginate, Page};
use comptoir_core::validation::{validate_reference, validate_search_query};
use comptoir_core::{Client, Company, Expense, Product, SalePayload};

use crate::checkout::StockLookup;
use crate::error::ClientResult;
use crate::gateway::{ApiGateway, EndpointFamily};

// =============================================================================
// Response Envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Many<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> From<Many<T>> for Vec<T> {
    fn from(many: Many<T>) -> Self {
        match many {
            Many::Wrapped { data } => data,
            Many::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum One<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> One<T> {
    fn into_inner(self) -> T {
        match self {
            One::Wrapped { data } => data,
            One::Bare(item) => item,
        }
    }
}

// =============================================================================
// Generic Resource Client
// =============================================================================

/// CRUD over one collection path.
pub struct ResourceClient<T> {
    gateway: ApiGateway,
    path: &'static str,
    family: EndpointFamily,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        ResourceClient {
            gateway: self.gateway.clone(),
            path: self.path,
            family: self.family,
            _marker: PhantomData,
        }
    }
}

impl<T> ResourceClient<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(gateway: ApiGateway, path: &'static str, family: EndpointFamily) -> Self {
        ResourceClient {
            gateway,
            path,
            family,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    /// `GET {path}/{id}`.
    pub async fn get(&self, id: &str) -> ClientResult<T> {
        let url = self.gateway.item_url(self.path, id, self.family)?;
        let one: One<T> = self
            .gateway
            .send_to::<One<T>, ()>(Method::GET, url, None, self.family)
            .await?;
        Ok(one.into_inner())
    }

    /// `POST {path}`. Returns the server's response body.
    pub async fn create(&self, item: &T) -> ClientResult<Value> {
        Ok(self.gateway.post(self.path, item, self.family).await?)
    }

    /// `PUT {path}/{id}`.
    pub async fn update(&self, id: &str, item: &T) -> ClientResult<Value> {
        let url = self.gateway.item_url(self.path, id, self.family)?;
        Ok(self
            .gateway
            .send_to(Method::PUT, url, Some(item), self.family)
            .await?)
    }

    /// `DELETE {path}/{id}`.
    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let url = self.gateway.item_url(self.path, id, self.family)?;
        let _: Value = self
            .gateway
            .send_to::<Value, ()>(Method::DELETE, url, None, self.family)
            .await?;
        Ok(())
    }
}

pub type ExpenseService = ResourceClient<Expense>;
pub type ClientService = ResourceClient<Client>;
pub type ProformaService = ResourceClient<Value>;

pub fn expenses(gateway: ApiGateway) -> ExpenseService {
    ResourceClient::new(gateway, "/depenses", EndpointFamily::Expenses)
}

pub fn clients(gateway: ApiGateway) -> ClientService {
    ResourceClient::new(gateway, "/clients", EndpointFamily::Clients)
}

pub fn proformas(gateway: ApiGateway) -> ProformaService {
    ResourceClient::new(gateway, "/proformas", EndpointFamily::Proforma)
}

// =============================================================================
// Products
// =============================================================================

/// Product catalog, plus the stock source for checkout.
#[derive(Clone)]
pub struct ProductService {
    resource: ResourceClient<Product>,
}

impl ProductService {
    pub fn new(gateway: ApiGateway) -> Self {
        ProductService {
            resource: ResourceClient::new(gateway, "/produits", EndpointFamily::Products),
        }
    }

    pub fn resource(&self) -> &ResourceClient<Product> {
        &self.resource
    }

    pub async fn list(&self) -> ClientResult<Vec<Product>> {
        self.resource.list().await
    }

    pub async fn get(&self, reference: &str) -> ClientResult<Product> {
        validate_reference(reference)?;
        self.resource.get(reference.trim()).await
    }

    /// Fetches the catalog, filters it by `query` and returns one page.
    pub async fn search(&self, query: &str, page: usize, per_page: usize) -> ClientResult<Page<Product>> {
        let query = validate_search_query(query)?;
        let products = self.resource.list().await?;
        let matching: Vec<Product> = filter_by_query(&products, &query)
            .into_iter()
            .cloned()
            .collect();
        Ok(paginate(&matching, page, per_page))
    }
}

#[async_trait]
impl StockLookup for ProductService {
    async fn available_stock(&self, reference: &str) -> ClientResult<i64> {
        Ok(self.get(reference).await?.stock)
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Clone)]
pub struct SaleService {
    gateway: ApiGateway,
}

impl SaleService {
    const PATH: &'static str = "/ventes";

    pub fn new(gateway: ApiGateway) -> Self {
        SaleService { gateway }
    }

    /// `POST /ventes`. Returns the backend's acknowledgement as-is.
    pub async fn submit(&self, payload: &SalePayload) -> ClientResult<Value> {
        Ok(self
            .gateway
            .post(Self::PATH, payload, EndpointFamily::Sales)
            .await?)
    }

    /// `GET /ventes`. Sale history rows are passed through untyped.
    pub async fn list(&self) -> ClientResult<Vec<Value>> {
        let many: Many<Value> = self.gateway.get(Self::PATH, EndpointFamily::Sales).await?;
        Ok(many.into())
    }
}

// =============================================================================
// Company
// =============================================================================

/// The shop's own details, printed on invoices.
#[derive(Clone)]
pub struct CompanyService {
    gateway: ApiGateway,
}

impl CompanyService {
    const PATH: &'static str = "/entreprise";

    pub fn new(gateway: ApiGateway) -> Self {
        CompanyService { gateway }
    }

    pub async fn get(&self) -> ClientResult<Company> {
        let one: One<Company> = self.gateway.get(Self::PATH, EndpointFamily::Company).await?;
        Ok(one.into_inner())
    }

    pub async fn update(&self, company: &Company) -> ClientResult<Value> {
        Ok(self
            .gateway
            .put(Self::PATH, company, EndpointFamily::Company)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiSettings;
    use crate::test_support::{spawn_backend, StaticToken};
    use crate::{ClientError, ErrorKind};
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    fn catalog() -> Value {
        json!([
            { "ref_produit": "RIZ-1", "designation": "Riz blanc", "prix_unitaire": 3000, "quantite": 12, "categorie": "Epicerie" },
            { "ref_produit": "HUI-1", "designation": "Huile 1L", "prix_unitaire": 9000, "quantite": 4, "categorie": "Epicerie" },
            { "ref_produit": "SAV-1", "designation": "Savon", "prix_unitaire": 1500, "quantite": 0 }
        ])
    }

    async fn product_by_ref(Path(reference): Path<String>) -> (StatusCode, Json<Value>) {
        let found = catalog()
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .find(|p| p["ref_produit"] == reference.as_str())
                    .cloned()
            });
        match found {
            Some(product) => (StatusCode::OK, Json(json!({ "data": product }))),
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Produit introuvable" })),
            ),
        }
    }

    async fn gateway(router: Router) -> ApiGateway {
        let base = spawn_backend(router).await;
        ApiGateway::new(&ApiSettings::new(format!("{}/api", base)), StaticToken::shared(Some("abc"))).unwrap()
    }

    #[tokio::test]
    async fn test_list_accepts_bare_and_wrapped_arrays() {
        let router = Router::new()
            .route("/api/produits", get(|| async { Json(catalog()) }))
            .route(
                "/api/clients",
                get(|| async { Json(json!({ "data": [{ "nom": "Rakoto", "telephone": "034" }] })) }),
            );
        let gateway = gateway(router).await;

        let products = ProductService::new(gateway.clone()).list().await.unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].reference, "RIZ-1");

        let customers = clients(gateway).list().await.unwrap();
        assert_eq!(customers[0].name, "Rakoto");
        assert_eq!(customers[0].phone.as_deref(), Some("034"));
    }

    #[tokio::test]
    async fn test_search_filters_then_paginates() {
        let router = Router::new().route("/api/produits", get(|| async { Json(catalog()) }));
        let products = ProductService::new(gateway(router).await);

        let page = products.search("epicerie", 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next);
        assert_eq!(page.items[0].reference, "RIZ-1");

        let everything = products.search("", 1, 20).await.unwrap();
        assert_eq!(everything.total, 3);
    }

    #[tokio::test]
    async fn test_stock_lookup_reads_product_quantity() {
        let router = Router::new().route("/api/produits/{reference}", get(product_by_ref));
        let products = ProductService::new(gateway(router).await);

        assert_eq!(products.available_stock("HUI-1").await.unwrap(), 4);

        let err = products.available_stock("NOPE").await.unwrap_err();
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.user_message(), "Produit introuvable");
    }

    #[tokio::test]
    async fn test_get_rejects_invalid_reference_locally() {
        let products = ProductService::new(gateway(Router::new()).await);
        let err = products.get("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_submit_sale_posts_payload() {
        let router = Router::new().route(
            "/api/ventes",
            axum::routing::post(|Json(body): Json<Value>| async move {
                Json(json!({ "success": true, "ref_facture": body["ref_facture"] }))
            }),
        );
        let sales = SaleService::new(gateway(router).await);
        let payload = SalePayload {
            ref_facture: "20240301090507".to_string(),
            ref_produit: "R1".to_string(),
            qte_vendu: "2".to_string(),
            identifiant: String::new(),
            remise: "ar0".to_string(),
            mode_paiement: Default::default(),
            montant_a_payer: comptoir_core::Money::from_minor(2_000),
            montant_paye: comptoir_core::Money::from_minor(2_000),
            condition_paiement: "comptant".to_string(),
        };

        let response = sales.submit(&payload).await.unwrap();
        assert_eq!(response["ref_facture"], "20240301090507");
    }

    #[tokio::test]
    async fn test_company_get_and_delete_errors() {
        let router = Router::new()
            .route(
                "/api/entreprise",
                get(|| async { Json(json!({ "nom": "Boutique Soa", "adresse": "Antananarivo" })) }),
            )
            .route(
                "/api/depenses/{id}",
                axum::routing::delete(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let gateway = gateway(router).await;

        let company = CompanyService::new(gateway.clone()).get().await.unwrap();
        assert_eq!(company.name, "Boutique Soa");

        let err = expenses(gateway).delete("7").await.unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.user_message(), EndpointFamily::Expenses.default_message());
    }

    #[tokio::test]
    async fn test_reference_with_reserved_characters_stays_one_segment() {
        async fn stock_by_ref(Path(reference): Path<String>) -> Json<Value> {
            let stock = match reference.as_str() {
                "R" => 50,
                "R#1" => 1,
                "R?x=1" => 2,
                "RIZ/1KG" => 7,
                _ => 0,
            };
            Json(json!({
                "ref_produit": reference,
                "designation": "Article",
                "prix_unitaire": 100,
                "quantite": stock
            }))
        }

        let router = Router::new().route("/api/produits/{reference}", get(stock_by_ref));
        let products = ProductService::new(gateway(router).await);

        let product = products.get("R#1").await.unwrap();
        assert_eq!(product.reference, "R#1");
        assert_eq!(product.stock, 1);

        assert_eq!(products.available_stock("R?x=1").await.unwrap(), 2);
        assert_eq!(products.available_stock("RIZ/1KG").await.unwrap(), 7);
        assert_eq!(products.available_stock("R").await.unwrap(), 50);
    }
}
