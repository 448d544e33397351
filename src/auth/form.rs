//! HTML form extraction for the sign-in handshake
//!
//! Each identity-provider hop answers with a page holding a single form. This
//! module pulls out:
//! - The form's `action` attribute
//! - Every named input with its current value, in document order

use crate::auth::AuthError;
use scraper::{Html, Selector};
use url::Url;

/// A form as served by one hop of the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Raw `action` attribute, if the form has one
    pub action: Option<String>,

    /// Named inputs and their values
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Resolves the submission target against the page the form came from
    ///
    /// A form without an action posts back to the page URL.
    pub fn target(&self, page_url: &Url) -> Result<Url, AuthError> {
        match self.action.as_deref().map(str::trim) {
            Some(action) if !action.is_empty() => page_url
                .join(action)
                .map_err(|e| AuthError::InvalidAction(format!("{}: {}", action, e))),
            _ => Ok(page_url.clone()),
        }
    }

    /// Name of the first input whose name contains `needle` (case-sensitive)
    pub fn field_containing(&self, needle: &str) -> Option<&str> {
        self.fields
            .iter()
            .map(|(name, _)| name.as_str())
            .find(|name| name.contains(needle))
    }

    /// Returns the fields with the given names set to new values
    ///
    /// Fields not named in `overrides` keep their current value; overrides
    /// naming an absent field are appended.
    pub fn fields_with(&self, overrides: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut fields = self.fields.clone();
        for (name, value) in overrides {
            match fields.iter_mut().find(|(n, _)| n == name) {
                Some(field) => field.1 = value.to_string(),
                None => fields.push((name.to_string(), value.to_string())),
            }
        }
        fields
    }
}

/// Parses the first form of an HTML page
///
/// Inputs are collected from the whole document, since identity providers
/// occasionally render hidden token fields outside the `<form>` element.
///
/// # Returns
///
/// * `Some(LoginForm)` - The page contains a form
/// * `None` - No form was found
pub fn parse_form(html: &str) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input[name]").ok()?;

    let form = document.select(&form_selector).next()?;
    let action = form.value().attr("action").map(str::to_string);

    let fields = document
        .select(&input_selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Some(LoginForm { action, fields })
}
