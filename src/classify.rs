//! Link classification: maps a candidate address to the hint method used for it.

use url::Url;

use crate::scheduler::Method;

/// Path suffixes treated as script modules.
const SCRIPT_EXTENSIONS: &[&str] = &[".js", ".mjs"];
const STYLESHEET_EXTENSIONS: &[&str] = &[".css"];

/// Classifies `address` relative to the document it was found on.
///
/// Returns `None` for addresses that should be ignored: unparsable ones,
/// non-network schemes (`javascript:`, `mailto:`, ...) and, unless
/// `allow_query_params` is set, anything carrying a query string.
pub fn classify(address: &str, document: &Url, allow_query_params: bool) -> Option<Method> {
    let url = Url::parse(address.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let has_query = url.query().is_some_and(|q| !q.is_empty());
    if has_query {
        return allow_query_params.then_some(Method::Preconnect);
    }

    let path = url.path();
    if SCRIPT_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        Some(Method::ModulePreload)
    } else if STYLESHEET_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        Some(Method::Preload)
    } else if url.host_str().is_some() && url.host_str() == document.host_str() {
        Some(Method::Prefetch)
    } else {
        Some(Method::DnsPrefetch)
    }
}

/// [`classify`] bound to one document and query policy.
#[derive(Debug, Clone)]
pub struct Classifier {
    document: Url,
    allow_query_params: bool,
}

impl Classifier {
    pub fn new(document: Url, allow_query_params: bool) -> Self {
        Self {
            document,
            allow_query_params,
        }
    }

    pub fn document(&self) -> &Url {
        &self.document
    }

    pub fn allow_query_params(&self) -> bool {
        self.allow_query_params
    }

    pub fn classify(&self, address: &str) -> Option<Method> {
        classify(address, &self.document, self.allow_query_params)
    }
}
