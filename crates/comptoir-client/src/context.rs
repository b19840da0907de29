//! # Application Context
//!
//! Wires the store, the session and the REST services together.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       AppContext::init                                  │
//! │                                                                         │
//! │  1. Open Store ───────────────────────────────────────────────────────► │
//! │     • [store] in_memory = true → MemoryStore                            │
//! │     • otherwise SQLite at store_path() (WAL, migrations applied)        │
//! │                                                                         │
//! │  2. Restore Session ──────────────────────────────────────────────────► │
//! │     • SessionManager::restore() awaited here                            │
//! │     • no route decision exists before this returns                      │
//! │                                                                         │
//! │  3. Build Gateway ────────────────────────────────────────────────────► │
//! │     • token provider = the session manager                              │
//! │                                                                         │
//! │  4. Build Services ───────────────────────────────────────────────────► │
//! │     • auth, products, sales, expenses, clients, company, proformas      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::info;

use comptoir_core::{Cart, SaleDraft};
use comptoir_store::{KeyValueStore, MemoryStore, SqliteStore, StoreConfig};

use crate::auth::{AuthService, Authenticator};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::gateway::ApiGateway;
use crate::resources::{
    clients, expenses, proformas, ClientService, CompanyService, ExpenseService, ProductService,
    ProformaService, SaleService,
};
use crate::session::{Route, SessionManager, TokenProvider};

/// The store as the rest of the client sees it.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Everything a screen needs, built once at startup.
pub struct AppContext {
    config: ClientConfig,
    session: Arc<SessionManager<SharedStore>>,
    gateway: ApiGateway,
    auth: Authenticator<SharedStore>,
    products: ProductService,
    sales: SaleService,
    expenses: ExpenseService,
    clients: ClientService,
    company: CompanyService,
    proformas: ProformaService,
}

impl AppContext {
    /// Opens the configured store and builds the context on top of it.
    pub async fn init(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let store: SharedStore = if config.store.in_memory {
            info!("Using in-memory session store");
            Arc::new(MemoryStore::new())
        } else {
            let path = config.store_path()?;
            info!(path = %path.display(), "Opening session store");
            Arc::new(SqliteStore::open(StoreConfig::new(path)).await?)
        };

        Self::with_store(config, store).await
    }

    /// Builds the context over an already opened store.
    pub async fn with_store(config: ClientConfig, store: SharedStore) -> ClientResult<Self> {
        let session = Arc::new(SessionManager::new(store));
        let restored = session.restore().await;
        info!(route = %restored.route(), "Session restored");

        let tokens: Arc<dyn TokenProvider> = session.clone();
        let gateway = ApiGateway::new(&config.api, tokens)?;

        Ok(AppContext {
            auth: Authenticator::new(AuthService::new(gateway.clone()), Arc::clone(&session)),
            products: ProductService::new(gateway.clone()),
            sales: SaleService::new(gateway.clone()),
            expenses: expenses(gateway.clone()),
            clients: clients(gateway.clone()),
            company: CompanyService::new(gateway.clone()),
            proformas: proformas(gateway.clone()),
            gateway,
            session,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager<SharedStore>> {
        &self.session
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub fn auth(&self) -> &Authenticator<SharedStore> {
        &self.auth
    }

    pub fn products(&self) -> &ProductService {
        &self.products
    }

    pub fn sales(&self) -> &SaleService {
        &self.sales
    }

    pub fn expenses(&self) -> &ExpenseService {
        &self.expenses
    }

    pub fn clients(&self) -> &ClientService {
        &self.clients
    }

    pub fn company(&self) -> &CompanyService {
        &self.company
    }

    pub fn proformas(&self) -> &ProformaService {
        &self.proformas
    }

    /// Which screen to show.
    pub fn route(&self) -> Route {
        self.session.route()
    }

    /// Starts a sale from `items` with the configured payment defaults.
    pub fn new_sale_draft(&self, items: Cart) -> SaleDraft {
        self.config.sale.new_draft(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiSettings;
    use crate::test_support::spawn_backend;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use comptoir_core::{PaymentMethod, User};
    use comptoir_store::keys;
    use serde_json::{json, Value};

    fn in_memory_config(base_url: &str) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.api = ApiSettings::new(base_url);
        config.store.in_memory = true;
        config
    }

    #[tokio::test]
    async fn test_init_without_session_routes_to_login() {
        let ctx = AppContext::init(in_memory_config("http://127.0.0.1:9/api"))
            .await
            .unwrap();

        assert!(!ctx.session().is_loading());
        assert_eq!(ctx.route(), Route::Login);
    }

    #[tokio::test]
    async fn test_restored_token_reaches_the_gateway() {
        async fn echo(headers: HeaderMap) -> Json<Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Json(json!({ "user": { "id": 1, "email": "a@b.com" }, "auth": auth }))
        }

        let base = spawn_backend(Router::new().route("/api/users/profile", get(echo))).await;
        let store = MemoryStore::with_entries([
            (keys::TOKEN, "abc"),
            (keys::USER, r#"{"id":1,"email":"a@b.com"}"#),
        ]);

        let ctx = AppContext::with_store(in_memory_config(&format!("{}/api", base)), Arc::new(store))
            .await
            .unwrap();

        assert_eq!(ctx.route(), Route::Dashboard);
        let raw: Value = ctx
            .gateway()
            .get("/users/profile", crate::gateway::EndpointFamily::Users)
            .await
            .unwrap();
        assert_eq!(raw["auth"], "Bearer abc");
    }

    #[tokio::test]
    async fn test_sqlite_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.store.path = Some(dir.path().join("session.db"));

        {
            let ctx = AppContext::init(config.clone()).await.unwrap();
            assert_eq!(ctx.route(), Route::Login);
            ctx.session()
                .login(
                    "abc".to_string(),
                    User {
                        id: 3,
                        name: "Hery".to_string(),
                        email: "hery@b.com".to_string(),
                        created_at: None,
                    },
                )
                .await
                .unwrap();
        }

        let ctx = AppContext::init(config).await.unwrap();
        assert_eq!(ctx.route(), Route::Dashboard);
        assert_eq!(ctx.session().current_user().unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let config = in_memory_config("ftp://example.com");
        assert!(AppContext::init(config).await.is_err());
    }

    #[tokio::test]
    async fn test_new_sale_draft_follows_config() {
        let mut config = in_memory_config("http://127.0.0.1:9/api");
        config.sale.default_payment_method = PaymentMethod::Card;
        config.sale.default_payment_condition = "fin de mois".to_string();

        let ctx = AppContext::init(config).await.unwrap();
        let draft = ctx.new_sale_draft(Cart::new());

        assert_eq!(draft.payment_method, PaymentMethod::Card);
        assert_eq!(draft.payment_condition, "fin de mois");
    }
}
