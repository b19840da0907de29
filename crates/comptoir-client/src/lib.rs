//! # comptoir-client: Session, Gateway and Services for Comptoir
//!
//! The layer the screens call. It owns the authenticated session, attaches
//! the bearer token to every REST call and turns backend failures into one
//! error shape.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Lifecycle                                │
//! │                                                                         │
//! │  Screen ──► ProductService::search("riz")                              │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │             ApiGateway::send ◄── TokenProvider (SessionManager)         │
//! │                  │   Authorization: Bearer <token>                      │
//! │                  ▼                                                      │
//! │             GET {base_url}/produits                                     │
//! │                  │                                                      │
//! │        ┌─────────┴──────────┐                                           │
//! │        ▼                    ▼                                           │
//! │     2xx: decode T      error: normalize_error → ApiError{message,code} │
//! │                                                                         │
//! │  Session state (token, user, loading) lives in a watch channel;        │
//! │  subscribers see every change.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - Auth session manager and route decision
//! - [`gateway`] - HTTP client, bearer injection, error normalization
//! - [`auth`] - Login / logout / profile endpoints and the authenticator
//! - [`resources`] - Products, sales, expenses, clients, company, proformas
//! - [`checkout`] - Live stock checks and sale submission
//! - [`context`] - Startup wiring
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Client error types

pub mod auth;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod resources;
pub mod session;

pub use auth::{AuthService, Authenticator, Credentials, RegisterRequest};
pub use checkout::{
    adjust_quantities_by_stock, fetch_stock_levels, submit_sale, validate_stock, SaleReceipt,
    StockLookup,
};
pub use config::{ApiSettings, ClientConfig, CurrencySettings, SaleSettings, StoreSettings};
pub use context::{AppContext, SharedStore};
pub use error::{ApiError, ClientError, ClientResult, ErrorKind, ErrorPayload};
pub use gateway::{normalize_error, ApiGateway, EndpointFamily};
pub use resources::{
    ClientService, CompanyService, ExpenseService, ProductService, ProformaService,
    ResourceClient, SaleService,
};
pub use session::{Route, Session, SessionManager, TokenProvider};
