use serde::{Deserialize, Serialize};
use std::fmt;

/// How an element is looked up on the page.
///
/// In TOML a locator is written as an inline table, e.g.
/// `checkout_button = { xpath = "//button[contains(text(), 'Checkout')]" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{}", s),
            Self::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// Every locator the login, polling, checkout and search flows touch.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Selectors {
    pub region_selector: Locator,
    pub policy_accept: Locator,
    pub consent_checkbox: Locator,
    pub email_input: Locator,
    pub continue_button: Locator,
    pub password_input: Locator,
    pub sign_in_button: Locator,
    pub cart_indicator: Locator,

    /// Any element that looks like a product checkbox, selectable or not.
    pub candidates: Locator,
    /// Present only while at least one non-disabled checkbox is rendered.
    pub available_candidate: Locator,
    pub product_name: Locator,

    pub checkout_button: Locator,
    pub confirmation_url_marker: String,
    pub loading_overlay: Locator,
    pub place_order_primary: Locator,
    pub place_order_fallback: Locator,

    pub search_entry: Locator,
    pub search_input: Locator,
    pub search_icon: Locator,

    /// Class fragment marking a checkbox as sold out.
    pub disabled_marker: String,
    /// Class fragment marking a wrapper around the real checkbox.
    pub container_marker: String,
    /// Only childless nodes count as selectable.
    pub require_leaf: bool,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            region_selector: Locator::css("div[class*='index_ipInConutry']"),
            policy_accept: Locator::css("div[class*='policy_acceptBtn']"),
            consent_checkbox: Locator::css("input.ant-checkbox-input[type='checkbox']"),
            email_input: Locator::css("#email"),
            continue_button: Locator::xpath("//button[@type='button' and contains(text(), '続行')]"),
            password_input: Locator::css("#password"),
            sign_in_button: Locator::xpath(
                "//button[@type='submit' and contains(text(), 'サインイン')]",
            ),
            cart_indicator: Locator::css("div[class*='index_cartItem']"),
            candidates: Locator::css("div[class^='product_checkbox']"),
            available_candidate: Locator::css(
                "div[class^='product_checkbox']:not([class*='Disabled'])",
            ),
            product_name: Locator::css("div[class*='product_productName']"),
            checkout_button: Locator::xpath("//button[contains(text(), '購入手続きへ')]"),
            confirmation_url_marker: "order-confirmation".to_string(),
            loading_overlay: Locator::css("div.index_loadingWrapFull__LhIPV"),
            place_order_primary: Locator::xpath(
                "//button[@class='ant-btn ant-btn-primary ant-btn-dangerous index_placeOrderBtn__E2dbt']",
            ),
            place_order_fallback: Locator::xpath("//button[contains(text(), 'レジに進む')]"),
            search_entry: Locator::css("div.header_hotText__xrk9k"),
            search_input: Locator::css("input[class*='search_searchInput']"),
            search_icon: Locator::css("div[class*='search_searchIconContainer']"),
            disabled_marker: "Disabled".to_string(),
            container_marker: "Container".to_string(),
            require_leaf: true,
        }
    }
}
