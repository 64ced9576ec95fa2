#![forbid(unsafe_code)]

use std::sync::Arc;

use lazy_static::lazy_static;
use log::{info, error};
use poem::listener::{Acceptor, Listener, TcpListener};
use poem::middleware::Cors;
use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::OpenApiService;

// Numclass Utilities
use crate::api::classify_number::ClassifyNumberApi;
use crate::api::version::VersionApi;
use crate::utils::config::{init_log, init_runtime_context, RuntimeCtx};
use crate::utils::errors::Errors;
use crate::utils::facts::{FactSource, NumbersApiClient};

// Modules
mod api;
mod classifier;
mod utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "NumclassServer"; // for poem logging
const API_PREFIX  : &str = "/api";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<(), Errors> {
    // --------------- Initialize Server --------------
    // Announce ourselves.
    println!("Starting numclass_server!");

    // Initialize the server.
    numclass_init();
    let config = &RUNTIME_CTX.parms.config;

    // The fact client is shared by all requests.
    let facts = match NumbersApiClient::new(&config.facts_url, config.facts_timeout_secs) {
        Ok(f) => f,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    // --------------- Main Loop Set Up ---------------
    // Assign base URL.
    let server_url = format!("{}:{}{}", config.http_addr, config.http_port, API_PREFIX);
    let app = build_app(Arc::new(facts), &config.title, &server_url);

    // Bind before announcing readiness.
    let addr = format!("{}{}", "0.0.0.0:", config.http_port);
    let acceptor = TcpListener::bind(addr).into_acceptor().await?;
    for local in acceptor.local_addr() {
        info!("Listening on {:?}", local);
    }
    info!("Server is running on {}:{}", config.http_addr, config.http_port);

    // ------------------ Main Loop -------------------
    // Serve failures surface as Errors::IOError.
    poem::Server::new_with_acceptor(acceptor)
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// build_app:
// ---------------------------------------------------------------------------
/** Assemble the API endpoints, the generated openapi documents and the open
 * CORS policy into the application served by main.
 */
pub fn build_app(facts: Arc<dyn FactSource>, title: &str, server_url: &str) -> impl Endpoint {
    let endpoints = (ClassifyNumberApi::new(facts), VersionApi);
    let api_service =
        OpenApiService::new(endpoints, title, env!("CARGO_PKG_VERSION"))
            .server(server_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();

    // Any origin may call us.
    let ui = api_service.swagger_ui();
    Route::new()
        .nest(API_PREFIX, api_service)
        .nest("/", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
        .with(Cors::new())
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// numclass_init:
// ---------------------------------------------------------------------------
/** Initialize logging and the runtime context before the main loop is
 * configured.
 */
fn numclass_init() {
    // Configure our log.
    init_log();

    // Force the reading of input parameters and initialization of runtime context.
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    print_version_info();
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("\n*** Running NUMCLASS={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}.",
          option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
          env!("GIT_BRANCH"),
          env!("GIT_COMMIT_SHORT"),
          env!("GIT_DIRTY"),
          env!("SOURCE_TIMESTAMP"),
          env!("RUSTC_VERSION"));
}
