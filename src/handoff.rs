//! Web handoff for restaurant details.
//!
//! There is no details API, so selecting a restaurant hands off to a
//! DuckDuckGo search for its name and postcode. The navigation policy mirrors
//! the embedded web view's behaviour: the search itself stays in the view,
//! outbound links open externally, and the search engine's error page maps to
//! a retry.

use reqwest::Url;

const SEARCH_ENDPOINT: &str = "https://duckduckgo.com/";
const SEARCH_HOST: &str = "duckduckgo.com";

/// Path component DuckDuckGo serves when a search fails server-side.
const SEARCH_ERROR_PAGE: &str = "post2.html";

/// What triggered a navigation, as reported by the web view.
///
/// The navigation policy below has no caller in the headless binary; it is
/// the embedded web-view host's half of the handoff, kept alongside the URL
/// builder and exercised by the tests.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    LinkActivated,
    FormSubmitted,
    BackForward,
    Reload,
    FormResubmitted,
    Other,
}

/// Where a navigation request should go.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Load inside the embedded web view.
    WebView,
    /// Refuse the navigation.
    Deny,
    /// Open in the external browser.
    External,
    /// Hand to the operating system (e.g. a phone dialer link).
    App,
    /// The search engine's error page; treat the search as failed.
    Failed,
}

/// Build the search URL for a restaurant.
pub fn search_url(name: &str, postcode: &str) -> Url {
    let query = format!("{name} {postcode}");
    Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query.trim())])
        .expect("search endpoint is a valid base URL")
}

/// Whether a URL points at the search engine itself.
#[allow(dead_code)]
pub fn is_search_url(url: &Url) -> bool {
    url.host_str()
        .map(|host| host.contains(SEARCH_HOST))
        .unwrap_or(false)
}

/// Classify a navigation request from the embedded web view.
#[allow(dead_code)]
pub fn navigation_target(url: &Url, kind: NavigationKind) -> NavigationTarget {
    if url.scheme() == "tel" {
        return NavigationTarget::App;
    }
    // Plain http never loads in the view; escalate to the real browser.
    if url.scheme() == "http" {
        return NavigationTarget::External;
    }
    let last_segment = url.path_segments().and_then(|mut segments| segments.next_back());
    if last_segment == Some(SEARCH_ERROR_PAGE) {
        return NavigationTarget::Failed;
    }
    if url.as_str() == "about:blank" {
        return NavigationTarget::Deny;
    }

    match kind {
        NavigationKind::Other => NavigationTarget::WebView,
        NavigationKind::LinkActivated => NavigationTarget::External,
        _ => NavigationTarget::Deny,
    }
}
