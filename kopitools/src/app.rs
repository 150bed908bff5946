use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use log::debug;
use pasarkopi_client::{StorefrontApi, StorefrontConfig};
use pasarkopi_engine::{
    storage::JsonFileStore,
    CheckoutOrchestrator,
    CheckoutPolicy,
    CredentialStore,
    OrderTracker,
    WidgetAdapter,
};

use crate::widget::RedirectWidget;

pub type SharedStore = Arc<Mutex<JsonFileStore>>;
pub type Api = StorefrontApi<CredentialStore<SharedStore>>;

/// Everything the subcommands need, wired once per invocation.
///
/// The cart and the credential share one JSON file in the user's data directory, which is the CLI's stand-in for
/// profile-scoped browser storage: a second `kopitools` invocation sees exactly what the previous one persisted.
pub struct App {
    storage: SharedStore,
    storage_path: PathBuf,
    api: Api,
    widget: WidgetAdapter<RedirectWidget>,
}

impl App {
    pub fn new() -> Result<Self> {
        let storage_path = storage_path();
        debug!("🧰️ Using storage file {}", storage_path.display());
        let storage = Arc::new(Mutex::new(JsonFileStore::open(&storage_path)?));
        let config = StorefrontConfig::new_from_env_or_default();
        let api = StorefrontApi::new(config, CredentialStore::new(Arc::clone(&storage)))?;
        let widget = WidgetAdapter::new(RedirectWidget::new_from_env_or_default());
        Ok(Self { storage, storage_path, api, widget })
    }

    pub fn storage_path(&self) -> &PathBuf {
        &self.storage_path
    }

    pub fn cart(&self) -> pasarkopi_engine::CartStore<SharedStore> {
        pasarkopi_engine::CartStore::new(Arc::clone(&self.storage))
    }

    pub fn creds(&self) -> CredentialStore<SharedStore> {
        CredentialStore::new(Arc::clone(&self.storage))
    }

    pub fn widget(&self) -> WidgetAdapter<RedirectWidget> {
        self.widget.clone()
    }

    pub fn tracker(&self) -> OrderTracker {
        OrderTracker::new(self.api.clone())
    }

    /// A terminal cannot keep an abandoned widget session on screen, so this CLI clears the cart on a pending
    /// payment and says so in the checkout output.
    pub fn orchestrator(&self) -> CheckoutOrchestrator<Api, RedirectWidget> {
        CheckoutOrchestrator::new(self.api.clone(), self.widget())
            .with_policy(CheckoutPolicy { clear_cart_on_pending: true })
    }
}

/// `PASAR_DATA_FILE` overrides the default location, which is `kopitools/storefront.json` in the platform data
/// directory.
fn storage_path() -> PathBuf {
    if let Ok(path) = std::env::var("PASAR_DATA_FILE") {
        return PathBuf::from(path);
    }
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("kopitools").join("storefront.json")
}
