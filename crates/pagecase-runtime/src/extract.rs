//! Element extraction from fetched page markup.
//!
//! Walks the parsed document once, in document order, and keeps the nodes a
//! browser-automation script can act on: buttons (including `role="button"`),
//! anchors with an `href`, visible input fields and form containers. Each node
//! becomes a [`PageElement`] carrying the attributes useful for locators.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info};

use pagecase_protocols::error::FetchError;
use pagecase_protocols::types::{ElementKind, PageElement};

static INTERACTIVE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("button, [role=button], a[href], input, form")
        .expect("interactive selector is valid")
});

static LABELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("label[for]").expect("label selector is valid"));

static FORM_FIELDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input, button, select, textarea").expect("form field selector is valid")
});

const BUTTON_ATTRS: &[&str] = &["id", "name", "class", "type", "role", "aria-label", "title"];
const LINK_ATTRS: &[&str] = &["id", "class", "href", "role", "aria-label", "title"];
const INPUT_ATTRS: &[&str] = &[
    "id",
    "name",
    "class",
    "placeholder",
    "value",
    "role",
    "aria-label",
    "title",
];
const FORM_ATTRS: &[&str] = &["id", "name", "class", "action", "method", "role"];

/// Per-category element counts. Every category is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementSummary {
    pub buttons: usize,
    pub links: usize,
    pub inputs: usize,
    pub forms: usize,
}

impl ElementSummary {
    pub fn of(elements: &[PageElement]) -> Self {
        let mut summary = Self::default();
        for element in elements {
            match element.kind {
                ElementKind::Button => summary.buttons += 1,
                ElementKind::Link => summary.links += 1,
                ElementKind::Input => summary.inputs += 1,
                ElementKind::Form => summary.forms += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.buttons + self.links + self.inputs + self.forms
    }
}

/// Extract interactive elements from page markup, in document order.
pub fn extract_elements(markup: &str) -> Vec<PageElement> {
    let document = Html::parse_document(markup);
    let labels = collect_labels(&document);

    document
        .select(&INTERACTIVE)
        .filter_map(|node| to_element(node, &labels))
        .collect()
}

/// Extractor bound to the URL the markup came from.
pub struct ElementExtractor;

impl ElementExtractor {
    /// Extract elements, failing when the page has nothing to ground on.
    pub fn extract(url: &str, markup: &str) -> Result<Vec<PageElement>, FetchError> {
        let elements = extract_elements(markup);
        let summary = ElementSummary::of(&elements);
        info!(
            url = %url,
            buttons = summary.buttons,
            links = summary.links,
            inputs = summary.inputs,
            forms = summary.forms,
            "Extracted page elements"
        );

        if elements.is_empty() {
            return Err(FetchError::NoElements {
                url: url.to_string(),
            });
        }
        Ok(elements)
    }
}

fn to_element(node: ElementRef<'_>, labels: &HashMap<String, String>) -> Option<PageElement> {
    let tag = node.value().name();
    match tag {
        "button" => Some(with_attrs(PageElement::new(ElementKind::Button), node, BUTTON_ATTRS)
            .with_text(visible_text(node))),
        "a" => Some(with_attrs(PageElement::new(ElementKind::Link), node, LINK_ATTRS)
            .with_text(visible_text(node))),
        "input" => input_element(node, labels),
        "form" => Some(form_element(node)),
        _ => {
            debug!(tag, "Treating role=button node as button");
            Some(with_attrs(PageElement::new(ElementKind::Button), node, BUTTON_ATTRS)
                .with_attribute("tag", tag)
                .with_text(visible_text(node)))
        }
    }
}

fn input_element(node: ElementRef<'_>, labels: &HashMap<String, String>) -> Option<PageElement> {
    let input_type = input_type(node.value());
    if input_type == "hidden" {
        return None;
    }

    let mut element = with_attrs(PageElement::new(ElementKind::Input), node, INPUT_ATTRS)
        .with_attribute("type", input_type);

    if let Some(label) = node
        .value()
        .id()
        .and_then(|id| labels.get(id))
        .cloned()
        .or_else(|| wrapping_label(node))
    {
        element = element.with_attribute("label", label);
    }

    Some(element)
}

/// Lowercased `type` of an input, `text` when absent or blank.
fn input_type(value: &Element) -> String {
    value
        .attr("type")
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

fn form_element(node: ElementRef<'_>) -> PageElement {
    let mut fields: Vec<String> = Vec::new();
    for field in node.select(&FORM_FIELDS) {
        let value = field.value();
        if value.name() == "input" && input_type(value) == "hidden" {
            continue;
        }
        let reference = value
            .attr("id")
            .or_else(|| value.attr("name"))
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if let Some(reference) = reference {
            if !fields.iter().any(|f| f == reference) {
                fields.push(reference.to_string());
            }
        }
    }

    with_attrs(PageElement::new(ElementKind::Form), node, FORM_ATTRS).with_fields(fields)
}

fn with_attrs(mut element: PageElement, node: ElementRef<'_>, keys: &[&str]) -> PageElement {
    for key in keys {
        if let Some(value) = node.value().attr(key) {
            element = element.with_attribute(*key, collapse_whitespace(value));
        }
    }
    element
}

fn visible_text(node: ElementRef<'_>) -> String {
    collapse_whitespace(&node.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map `label[for]` targets to their visible text.
fn collect_labels(document: &Html) -> HashMap<String, String> {
    document
        .select(&LABELS)
        .filter_map(|label| {
            let target = label.value().attr("for")?.trim();
            let text = visible_text(label);
            (!target.is_empty() && !text.is_empty()).then(|| (target.to_string(), text))
        })
        .collect()
}

/// Text of a `<label>` that wraps the input directly.
fn wrapping_label(node: ElementRef<'_>) -> Option<String> {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "label")
        .map(visible_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
