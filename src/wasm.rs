//! WebAssembly bindings for running experiments in the browser.
//!
//! # Architecture
//!
//! ```text
//! Browser JS → wasm-bindgen → StorefrontExperiments → PageSession
//!                                   │                    │
//!                              WebDocument          LocalStorageKv
//!                          (web_sys::Document)   (window.localStorage)
//! ```
//!
//! `start()` runs the experiments; `mount_complete()` installs a single
//! delegated click listener on the document.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use js_sys::Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, window, Blob, BlobPropertyBag, HtmlAnchorElement, HtmlElement, Storage, Url};

use crate::analytics::{AnalyticsSnapshot, PageContext};
use crate::catalog::ExperimentCatalog;
use crate::config::EngineConfig;
use crate::dom::Document;
use crate::engine::ExperimentEngine;
use crate::interceptor::tracked_selector;
use crate::kv::KvStore;
use crate::session::PageSession;
use crate::{Error, Result};

/// Initialize WASM module with panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console::log_1(&"storefront-experiments WASM initialized".into());
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn to_js(e: &Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// `window.localStorage` as a [`KvStore`].
///
/// Storage can be missing (privacy modes, sandboxed frames); every call then
/// fails with `Error::StorageError` and callers fall back to defaults.
#[derive(Debug, Clone)]
pub struct LocalStorageKv {
    storage: Option<Storage>,
}

impl LocalStorageKv {
    /// Bind to the window's local storage, if available.
    #[must_use]
    pub fn new() -> Self {
        let storage = window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            console::warn_1(&"localStorage unavailable; experiments will not persist".into());
        }
        Self { storage }
    }

    fn storage(&self) -> Result<&Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| Error::StorageError("localStorage unavailable".to_string()))
    }
}

impl Default for LocalStorageKv {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for LocalStorageKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|e| Error::StorageError(describe(&e)))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.storage()?
            .set_item(key, &value)
            .map_err(|e| Error::StorageError(describe(&e)))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| Error::StorageError(describe(&e)))
    }
}

/// The live browser document as a [`Document`].
#[derive(Debug, Clone)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    /// Bind to `window.document`.
    ///
    /// # Errors
    /// Returns `Error::Dom` outside a window context
    pub fn current() -> Result<Self> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| Error::Dom("no document in this context".to_string()))?;
        Ok(Self { document })
    }

    fn dom(e: &JsValue) -> Error {
        Error::Dom(describe(e))
    }
}

impl Document for WebDocument {
    type Element = web_sys::Element;

    fn query_selector_all(&self, selector: &str) -> Result<Vec<web_sys::Element>> {
        let nodes = self
            .document
            .query_selector_all(selector)
            .map_err(|_| Error::UnsupportedSelector(selector.to_string()))?;
        Ok((0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .collect())
    }

    fn element_id(&self, element: &web_sys::Element) -> Option<String> {
        Some(element.id()).filter(|id| !id.is_empty())
    }

    fn attribute(&self, element: &web_sys::Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn set_style_property(&mut self, element: &web_sys::Element, name: &str, value: &str) -> Result<()> {
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return Ok(());
        };
        html.style()
            .set_property(name, value)
            .map_err(|e| Self::dom(&e))
    }

    fn set_text_content(&mut self, element: &web_sys::Element, text: &str) {
        element.set_text_content(Some(text));
    }

    fn set_attribute(&mut self, element: &web_sys::Element, name: &str, value: &str) -> Result<()> {
        element.set_attribute(name, value).map_err(|e| Self::dom(&e))
    }

    fn add_class(&mut self, element: &web_sys::Element, class: &str) -> Result<()> {
        element.class_list().add_1(class).map_err(|e| Self::dom(&e))
    }

    fn remove_class(&mut self, element: &web_sys::Element, class: &str) -> Result<()> {
        element
            .class_list()
            .remove_1(class)
            .map_err(|e| Self::dom(&e))
    }
}

type BrowserSession = PageSession<Rc<LocalStorageKv>>;

/// Experiments running on the current page
#[wasm_bindgen]
pub struct StorefrontExperiments {
    session: Rc<RefCell<BrowserSession>>,
    store: Rc<LocalStorageKv>,
    document: WebDocument,
    config: EngineConfig,
    listener: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

#[wasm_bindgen]
impl StorefrontExperiments {
    /// Create the experiment runtime.
    ///
    /// `catalog_json` (array of experiments) and `config_json` (partial
    /// engine configuration) are optional; the storefront defaults apply.
    #[wasm_bindgen(constructor)]
    pub fn new(
        catalog_json: Option<String>,
        config_json: Option<String>,
    ) -> std::result::Result<StorefrontExperiments, JsValue> {
        let catalog = match catalog_json {
            Some(json) => ExperimentCatalog::from_json(&json).map_err(|e| to_js(&e))?,
            None => ExperimentCatalog::storefront(),
        };
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(|e| to_js(&e))?,
            None => EngineConfig::default(),
        };
        let document = WebDocument::current().map_err(|e| to_js(&e))?;

        let mut context = PageContext::default();
        if let Some(w) = window() {
            context.url = w.location().href().unwrap_or_default();
            context.user_agent = w.navigator().user_agent().ok();
        }

        let store = Rc::new(LocalStorageKv::new());
        let engine = ExperimentEngine::builder(Rc::clone(&store), catalog)
            .config(config.clone())
            .context(context)
            .build();

        Ok(Self {
            session: Rc::new(RefCell::new(PageSession::new(engine))),
            store,
            document,
            config,
            listener: None,
        })
    }

    /// Resolve and apply every active experiment. Returns the run summary as
    /// JSON.
    pub fn start(&mut self) -> std::result::Result<String, JsValue> {
        let mut session = self.session.borrow_mut();
        let summary = session.load(&mut self.document);
        serde_json::to_string(summary).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Signal that the page has rendered: start tracking clicks.
    ///
    /// Installs one delegated listener on the document; calling again is a
    /// no-op.
    pub fn mount_complete(&mut self) -> std::result::Result<(), JsValue> {
        self.session.borrow_mut().mount_complete();
        if self.listener.is_some() {
            return Ok(());
        }

        let session = Rc::clone(&self.session);
        let document = self.document.clone();
        let selector = tracked_selector(&self.config);
        let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Some(target) = event
                .target()
                .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            else {
                return;
            };
            if let Ok(Some(tracked)) = target.closest(&selector) {
                session.borrow_mut().click(&document, &tracked);
            }
        });

        self.document
            .document
            .add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
        self.listener = Some(listener);
        Ok(())
    }

    /// Current assignments as a JSON object.
    pub fn assignments_json(&self) -> std::result::Result<String, JsValue> {
        let session = self.session.borrow();
        serde_json::to_string(&session.engine().assignments().to_object())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Events recorded on this page as a JSON array.
    pub fn events_json(&self) -> std::result::Result<String, JsValue> {
        let session = self.session.borrow();
        serde_json::to_string(session.engine().recorder().all_events())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Report over the persisted assignments and event log, as JSON.
    pub fn report_json(&self) -> std::result::Result<String, JsValue> {
        AnalyticsSnapshot::load(&self.store, &self.config.storage)
            .report()
            .to_json_pretty()
            .map_err(|e| to_js(&e))
    }

    /// Download the persisted analytics as `ab-test-analytics-YYYY-MM-DD.json`.
    pub fn download_export(&self) -> std::result::Result<(), JsValue> {
        let user_agent = window().and_then(|w| w.navigator().user_agent().ok());
        let export = AnalyticsSnapshot::load(&self.store, &self.config.storage)
            .export(Utc::now(), user_agent);
        let json = export.to_json_pretty().map_err(|e| to_js(&e))?;

        let parts = Array::of1(&JsValue::from_str(&json));
        let options = BlobPropertyBag::new();
        options.set_type("application/json");
        let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let anchor: HtmlAnchorElement = self.document.document.create_element("a")?.dyn_into()?;
        anchor.set_href(&url);
        anchor.set_download(&export.file_name());
        anchor.click();
        Url::revoke_object_url(&url)?;
        Ok(())
    }
}
